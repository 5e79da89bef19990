use fixtures::*;

use pretty_assertions::assert_eq;
use receipt_der::{DecoderSettings, DerError, ReceiptDecoder, ReceiptError};

#[test]
fn test_two_non_consumables() {
    ensure_env_logger_initialized();
    let receipt = receipt_der::decode(&two_non_consumables_receipt()).expect("receipt to decode");

    assert_eq!(
        receipt.product_identifiers(),
        vec!["codeSharingUnlockable", "saveScannedCodeUnlockable"]
    );

    for product_identifier in receipt.product_identifiers() {
        let entries = receipt.entries(product_identifier);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_identifier, product_identifier);
        assert_eq!(entries[0].expiry_date, None);
        assert_eq!(entries[0].cancellation_date, None);
        assert_eq!(entries[0].quantity, Some(1));
    }
}

#[test]
fn test_one_subscription() {
    ensure_env_logger_initialized();
    let receipt = receipt_der::decode(&one_subscription_receipt()).expect("receipt to decode");

    assert_eq!(receipt.product_identifiers(), vec!["premiumsubscription"]);

    let entries = receipt.entries("premiumsubscription");
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|entry| entry.expiry_date.is_some()));
    assert_eq!(
        entries[0].transaction_identifier.as_deref(),
        Some("1000000371045520")
    );
    assert_eq!(
        entries[1].transaction_identifier.as_deref(),
        Some("1000000371045986")
    );
    assert!(entries[0].expiry_date < entries[1].expiry_date);
    assert_eq!(entries[0].web_order_line_item_id, Some(1_000_000_038_000_000));

    let metadata = receipt.metadata();
    assert_eq!(metadata.original_application_version.as_deref(), Some("1.0.21"));
    assert_eq!(metadata.bundle_identifier.as_deref(), Some("com.example.scanner"));
    assert_eq!(metadata.application_version.as_deref(), Some("37"));
    assert!(metadata.creation_date.is_some());
    assert_eq!(metadata.sha1_hash.as_ref().map(Vec::len), Some(20));
}

#[test]
fn test_extracted_payload_is_stable() {
    let bytes = one_subscription_receipt();
    let decoder = ReceiptDecoder::new();

    let first = decoder.extract_payload(&bytes).unwrap();
    let second = decoder.extract_payload(&bytes).unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0], 0x31);
}

#[test]
fn test_payload_without_envelope_is_missing_content() {
    // The bare attribute set holds no `data` content type.
    let payload = set(&[in_app_purchase("codeSharingUnlockable", "1", None)]);

    let err = receipt_der::decode(&payload).unwrap_err();
    assert_eq!(err, ReceiptError::MalformedContainer);
    assert!(err.is_missing_content());
}

#[test]
fn test_truncated_receipt_fails() {
    let bytes = two_non_consumables_receipt();
    let truncated = &bytes[..bytes.len() / 2];

    let err = receipt_der::decode(truncated).unwrap_err();
    assert!(matches!(err, ReceiptError::Der(DerError::InvalidLength { .. })));
    assert!(!err.is_missing_content());
}

#[test]
fn test_trailing_payload_data() {
    let mut payload = set(&[in_app_purchase("codeSharingUnlockable", "1", None)]);
    payload.extend([0xFF; 3]);
    let bytes = signed_receipt(&payload);

    assert!(matches!(
        receipt_der::decode(&bytes),
        Err(ReceiptError::Der(DerError::Malformed { .. }))
    ));

    let lenient = ReceiptDecoder::new()
        .with_configuration(DecoderSettings::new().allow_trailing_data(true));
    let receipt = lenient.decode(&bytes).unwrap();
    assert_eq!(receipt.product_identifiers(), vec!["codeSharingUnlockable"]);
}

#[test]
fn test_depth_limit_applies_to_envelope() {
    let bytes = one_subscription_receipt();
    let shallow = ReceiptDecoder::new().with_configuration(DecoderSettings::new().max_depth(2));

    assert_eq!(
        shallow.decode(&bytes).unwrap_err(),
        ReceiptError::Der(DerError::Malformed {
            offset: 19,
            reason: "containers are nested too deeply",
        })
    );
}

#[test]
fn test_decode_all_matches_sequential_decoding() {
    ensure_env_logger_initialized();
    let receipts = vec![
        two_non_consumables_receipt(),
        vec![],
        one_subscription_receipt(),
        vec![0x30, 0x03, 0x02, 0x01],
    ];

    let decoder =
        ReceiptDecoder::new().with_configuration(DecoderSettings::new().num_threads(4));
    let parallel = decoder.decode_all(&receipts);
    let sequential: Vec<_> = receipts.iter().map(|r| decoder.decode(r)).collect();

    assert_eq!(parallel, sequential);
    assert!(parallel[0].is_ok());
    assert!(parallel[1].is_err());
    assert!(parallel[2].is_ok());
    assert!(parallel[3].is_err());
}
