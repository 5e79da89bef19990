use crate::asn1::DEFAULT_MAX_DEPTH;
use crate::attribute_set::{Attribute, AttributeSetProcessor};
use crate::err::{DerError, DerResult};
use crate::model::{Receipt, ReceiptEntry, ReceiptMetadata};

use log::{debug, trace, warn};

/// Attribute codes found in the top level receipt set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadAttributeType {
    BundleIdentifier,
    ApplicationVersion,
    OpaqueValue,
    Sha1Hash,
    CreationDate,
    InAppPurchase,
    OriginalApplicationVersion,
    ExpirationDate,
}

impl PayloadAttributeType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(PayloadAttributeType::BundleIdentifier),
            3 => Some(PayloadAttributeType::ApplicationVersion),
            4 => Some(PayloadAttributeType::OpaqueValue),
            5 => Some(PayloadAttributeType::Sha1Hash),
            12 => Some(PayloadAttributeType::CreationDate),
            17 => Some(PayloadAttributeType::InAppPurchase),
            19 => Some(PayloadAttributeType::OriginalApplicationVersion),
            21 => Some(PayloadAttributeType::ExpirationDate),
            _ => None,
        }
    }
}

/// Attribute codes found inside an in-app purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InAppPurchaseAttributeType {
    Quantity,
    ProductIdentifier,
    TransactionIdentifier,
    PurchaseDate,
    OriginalTransactionIdentifier,
    OriginalPurchaseDate,
    SubscriptionExpirationDate,
    WebOrderLineItemIdentifier,
    CancellationDate,
}

impl InAppPurchaseAttributeType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1701 => Some(InAppPurchaseAttributeType::Quantity),
            1702 => Some(InAppPurchaseAttributeType::ProductIdentifier),
            1703 => Some(InAppPurchaseAttributeType::TransactionIdentifier),
            1704 => Some(InAppPurchaseAttributeType::PurchaseDate),
            1705 => Some(InAppPurchaseAttributeType::OriginalTransactionIdentifier),
            1706 => Some(InAppPurchaseAttributeType::OriginalPurchaseDate),
            1708 => Some(InAppPurchaseAttributeType::SubscriptionExpirationDate),
            1711 => Some(InAppPurchaseAttributeType::WebOrderLineItemIdentifier),
            1712 => Some(InAppPurchaseAttributeType::CancellationDate),
            _ => None,
        }
    }
}

/// Fields collected from one in-app purchase set before the product identifier is known.
#[derive(Debug, Default)]
struct PartialEntry {
    product_identifier: Option<String>,
    expiry_date: Option<jiff::Timestamp>,
    quantity: Option<i64>,
    transaction_identifier: Option<String>,
    original_transaction_identifier: Option<String>,
    purchase_date: Option<jiff::Timestamp>,
    original_purchase_date: Option<jiff::Timestamp>,
    cancellation_date: Option<jiff::Timestamp>,
    web_order_line_item_id: Option<i64>,
}

impl PartialEntry {
    fn apply(&mut self, attribute_type: InAppPurchaseAttributeType, attribute: &Attribute<'_>) {
        match attribute_type {
            InAppPurchaseAttributeType::Quantity => self.quantity = attribute.integer_value(),
            InAppPurchaseAttributeType::ProductIdentifier => {
                self.product_identifier = attribute.string_value()
            }
            InAppPurchaseAttributeType::TransactionIdentifier => {
                self.transaction_identifier = attribute.string_value()
            }
            InAppPurchaseAttributeType::PurchaseDate => {
                self.purchase_date = attribute.date_value()
            }
            InAppPurchaseAttributeType::OriginalTransactionIdentifier => {
                self.original_transaction_identifier = attribute.string_value()
            }
            InAppPurchaseAttributeType::OriginalPurchaseDate => {
                self.original_purchase_date = attribute.date_value()
            }
            InAppPurchaseAttributeType::SubscriptionExpirationDate => {
                self.expiry_date = attribute.date_value()
            }
            InAppPurchaseAttributeType::WebOrderLineItemIdentifier => {
                self.web_order_line_item_id = attribute.integer_value()
            }
            InAppPurchaseAttributeType::CancellationDate => {
                self.cancellation_date = attribute.date_value()
            }
        }
    }

    fn into_entry(self) -> Option<ReceiptEntry> {
        let product_identifier = self.product_identifier?;

        let mut entry = ReceiptEntry::new(product_identifier, self.expiry_date);
        entry.quantity = self.quantity;
        entry.transaction_identifier = self.transaction_identifier;
        entry.original_transaction_identifier = self.original_transaction_identifier;
        entry.purchase_date = self.purchase_date;
        entry.original_purchase_date = self.original_purchase_date;
        entry.cancellation_date = self.cancellation_date;
        entry.web_order_line_item_id = self.web_order_line_item_id;

        Some(entry)
    }
}

/// Interprets a receipt payload (the content of the PKCS #7 envelope) as a [`Receipt`].
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPayloadParser {
    max_depth: usize,
    allow_trailing_data: bool,
}

impl Default for ReceiptPayloadParser {
    fn default() -> Self {
        ReceiptPayloadParser::new()
    }
}

impl ReceiptPayloadParser {
    pub fn new() -> Self {
        ReceiptPayloadParser {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_data: false,
        }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn allow_trailing_data(mut self, allow_trailing_data: bool) -> Self {
        self.allow_trailing_data = allow_trailing_data;
        self
    }

    pub fn receipt(&self, payload: &[u8]) -> DerResult<Receipt> {
        let mut processor = AttributeSetProcessor::new(payload).with_max_depth(self.max_depth);
        let mut metadata = ReceiptMetadata::default();
        let mut entries = Vec::new();

        for attribute in processor.by_ref() {
            let attribute = attribute?;

            let Some(attribute_type) = PayloadAttributeType::from_code(attribute.attribute_type())
            else {
                trace!(
                    "ignoring receipt attribute with type {}",
                    attribute.attribute_type()
                );
                continue;
            };

            match attribute_type {
                PayloadAttributeType::InAppPurchase => {
                    if let Some(entry) = self.in_app_purchase(attribute.payload())? {
                        entries.push(entry);
                    }
                }
                PayloadAttributeType::BundleIdentifier => {
                    metadata.bundle_identifier = attribute.string_value()
                }
                PayloadAttributeType::ApplicationVersion => {
                    metadata.application_version = attribute.string_value()
                }
                PayloadAttributeType::OriginalApplicationVersion => {
                    metadata.original_application_version = attribute.string_value()
                }
                PayloadAttributeType::CreationDate => {
                    metadata.creation_date = attribute.date_value()
                }
                PayloadAttributeType::ExpirationDate => {
                    metadata.expiration_date = attribute.date_value()
                }
                PayloadAttributeType::OpaqueValue => {
                    metadata.opaque_value = Some(attribute.payload().to_vec())
                }
                PayloadAttributeType::Sha1Hash => {
                    metadata.sha1_hash = Some(attribute.payload().to_vec())
                }
            }
        }

        let trailing = processor.trailing_len();
        if trailing > 0 {
            if !self.allow_trailing_data {
                return Err(DerError::Malformed {
                    offset: payload.len() - trailing,
                    reason: "unexpected data after the receipt attribute set",
                });
            }
            debug!("ignoring {} bytes after the receipt attribute set", trailing);
        }

        debug!("decoded receipt with {} in-app purchases", entries.len());
        Ok(Receipt::from_entries(entries, metadata))
    }

    /// Parses one nested in-app purchase set. Structural errors propagate unchanged, well-formed
    /// content without a set yields no entry.
    fn in_app_purchase(&self, payload: &[u8]) -> DerResult<Option<ReceiptEntry>> {
        let mut processor = AttributeSetProcessor::new(payload)
            .with_max_depth(self.max_depth)
            .skip_until_set();
        let mut partial = PartialEntry::default();
        let mut attributes = 0;

        for attribute in processor.by_ref() {
            let attribute = attribute?;
            attributes += 1;

            match InAppPurchaseAttributeType::from_code(attribute.attribute_type()) {
                Some(attribute_type) => partial.apply(attribute_type, &attribute),
                None => trace!(
                    "ignoring in-app purchase attribute with type {}",
                    attribute.attribute_type()
                ),
            }
        }

        let trailing = processor.trailing_len();
        if trailing > 0 {
            if !self.allow_trailing_data {
                return Err(DerError::Malformed {
                    offset: payload.len() - trailing,
                    reason: "unexpected data after an in-app purchase attribute set",
                });
            }
            debug!("ignoring {} bytes after an in-app purchase attribute set", trailing);
        }

        let entry = partial.into_entry();
        if entry.is_none() {
            if attributes == 0 {
                debug!("in-app purchase payload holds no attributes");
            } else {
                warn!("dropping in-app purchase record without a product identifier");
            }
        }

        Ok(entry)
    }
}
