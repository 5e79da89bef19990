#![deny(unused_must_use)]
#![forbid(unsafe_code)]

//! Decoder for DER encoded, PKCS #7 wrapped in-app purchase receipts.
//!
//! ```no_run
//! # fn main() -> receipt_der::err::Result<()> {
//! let bytes = std::fs::read("receipt").unwrap_or_default();
//! let receipt = receipt_der::decode(&bytes)?;
//!
//! for product_identifier in receipt.product_identifiers() {
//!     println!("{} ({} entries)", product_identifier, receipt.entries(product_identifier).len());
//! }
//! # Ok(())
//! # }
//! ```

pub use attribute_set::{Attribute, AttributeSetProcessor, RawAttribute};
pub use decoder::{DecoderSettings, ReceiptDecoder};
pub use err::{DerError, ReceiptError};
pub use model::{Receipt, ReceiptEntry, ReceiptMetadata};
pub use payload_parser::{InAppPurchaseAttributeType, PayloadAttributeType, ReceiptPayloadParser};
pub use pkcs7::Pkcs7Container;

pub mod asn1;
pub mod attribute_set;
mod decoder;
pub mod err;
pub mod model;
pub mod payload_parser;
pub mod pkcs7;

mod utils;

/// Decodes a receipt with default settings.
pub fn decode(receipt: &[u8]) -> err::Result<Receipt> {
    ReceiptDecoder::new().decode(receipt)
}

#[cfg(test)]
use std::sync::Once;
#[cfg(test)]
static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}
