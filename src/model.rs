//! The decoded receipt.

use ahash::RandomState;
use hashbrown::HashMap;
use jiff::Timestamp;
use serde::Serialize;
use std::fmt::{self, Display};

/// One in-app purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptEntry {
    pub product_identifier: String,
    /// Expiry of a subscription purchase. Absent for non-subscription products.
    pub expiry_date: Option<Timestamp>,
    pub quantity: Option<i64>,
    pub transaction_identifier: Option<String>,
    pub original_transaction_identifier: Option<String>,
    pub purchase_date: Option<Timestamp>,
    pub original_purchase_date: Option<Timestamp>,
    pub cancellation_date: Option<Timestamp>,
    pub web_order_line_item_id: Option<i64>,
}

impl ReceiptEntry {
    pub fn new(product_identifier: impl Into<String>, expiry_date: Option<Timestamp>) -> Self {
        ReceiptEntry {
            product_identifier: product_identifier.into(),
            expiry_date,
            quantity: None,
            transaction_identifier: None,
            original_transaction_identifier: None,
            purchase_date: None,
            original_purchase_date: None,
            cancellation_date: None,
            web_order_line_item_id: None,
        }
    }
}

impl Display for ReceiptEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[ReceiptEntry productIdentifier: {}, expiryDate: ",
            self.product_identifier
        )?;
        match &self.expiry_date {
            Some(date) => write!(f, "{}]", date),
            None => write!(f, "nil]"),
        }
    }
}

/// Receipt-wide values from the top level attribute set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiptMetadata {
    pub original_application_version: Option<String>,
    pub bundle_identifier: Option<String>,
    pub application_version: Option<String>,
    pub creation_date: Option<Timestamp>,
    pub expiration_date: Option<Timestamp>,
    /// Opaque bytes used in the device hash, kept undecoded.
    pub opaque_value: Option<Vec<u8>>,
    pub sha1_hash: Option<Vec<u8>>,
}

/// A decoded receipt: purchase entries bucketed by product identifier, plus metadata.
///
/// Entries for the same product keep the order in which they appeared in the receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    entries: HashMap<String, Vec<ReceiptEntry>, RandomState>,
    metadata: ReceiptMetadata,
}

impl Receipt {
    pub fn from_entries(
        entries: impl IntoIterator<Item = ReceiptEntry>,
        metadata: ReceiptMetadata,
    ) -> Self {
        let mut buckets: HashMap<String, Vec<ReceiptEntry>, RandomState> =
            HashMap::with_hasher(RandomState::new());

        for entry in entries {
            buckets
                .entry(entry.product_identifier.clone())
                .or_default()
                .push(entry);
        }

        Receipt {
            entries: buckets,
            metadata,
        }
    }

    /// Product identifiers with at least one entry, sorted.
    pub fn product_identifiers(&self) -> Vec<&str> {
        let mut identifiers: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        identifiers.sort_unstable();
        identifiers
    }

    pub fn contains(&self, product_identifier: &str) -> bool {
        self.entries.contains_key(product_identifier)
    }

    /// All entries for `product_identifier`, empty if the product is not in the receipt.
    pub fn entries(&self, product_identifier: &str) -> &[ReceiptEntry] {
        self.entries
            .get(product_identifier)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn metadata(&self) -> &ReceiptMetadata {
        &self.metadata
    }

    /// Total number of entries across all products.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Receipt {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.entries == other.entries
    }
}

impl Eq for Receipt {}

impl Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Receipt")?;

        for product_identifier in self.product_identifiers() {
            let entries = self.entries(product_identifier);
            write!(
                f,
                "\n\n\t- {} ({} entries)",
                product_identifier,
                entries.len()
            )?;
            for entry in entries {
                write!(f, "\n\t\t- {}", entry)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_receipt() {
        let receipt = Receipt::from_entries(vec![], ReceiptMetadata::default());

        assert!(receipt.is_empty());
        assert_eq!(receipt.len(), 0);
        assert!(receipt.product_identifiers().is_empty());
        assert!(receipt.entries("").is_empty());
        assert_eq!(receipt.to_string(), "Receipt");
    }

    #[test]
    fn test_entries_are_bucketed_in_order() {
        let entries = vec![
            ReceiptEntry::new("testProduct2", Some(date("2000-01-01T00:00:00Z"))),
            ReceiptEntry::new("testProduct1", None),
            ReceiptEntry::new("testProduct2", Some(date("2000-01-02T00:00:00Z"))),
        ];

        let receipt = Receipt::from_entries(entries, ReceiptMetadata::default());

        assert_eq!(receipt.len(), 3);
        assert_eq!(
            receipt.product_identifiers(),
            vec!["testProduct1", "testProduct2"]
        );
        assert!(receipt.contains("testProduct1"));
        assert!(!receipt.contains("testProduct3"));

        let second = receipt.entries("testProduct2");
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].expiry_date, Some(date("2000-01-01T00:00:00Z")));
        assert_eq!(second[1].expiry_date, Some(date("2000-01-02T00:00:00Z")));
    }

    #[test]
    fn test_display() {
        let entries = vec![
            ReceiptEntry::new("testProduct1", None),
            ReceiptEntry::new("testProduct2", Some(date("2000-01-01T00:00:00Z"))),
        ];
        let receipt = Receipt::from_entries(entries, ReceiptMetadata::default());

        assert_eq!(
            receipt.to_string(),
            "Receipt\n\n\t- testProduct1 (1 entries)\n\t\t- [ReceiptEntry productIdentifier: testProduct1, expiryDate: nil]\
             \n\n\t- testProduct2 (1 entries)\n\t\t- [ReceiptEntry productIdentifier: testProduct2, expiryDate: 2000-01-01T00:00:00Z]"
        );
    }

    #[test]
    fn test_serialize() {
        let mut entry = ReceiptEntry::new("premiumsubscription", Some(date("2018-04-14T09:26:53Z")));
        entry.quantity = Some(1);
        let metadata = ReceiptMetadata {
            original_application_version: Some("1.0".to_string()),
            ..Default::default()
        };
        let receipt = Receipt::from_entries(vec![entry], metadata);

        let value = serde_json::to_value(&receipt).unwrap();

        assert_eq!(
            value["entries"]["premiumsubscription"][0]["expiry_date"],
            "2018-04-14T09:26:53Z"
        );
        assert_eq!(value["entries"]["premiumsubscription"][0]["quantity"], 1);
        assert_eq!(value["metadata"]["original_application_version"], "1.0");
        assert_eq!(value["metadata"]["creation_date"], serde_json::Value::Null);
    }
}
