use crate::asn1::DEFAULT_MAX_DEPTH;
use crate::err::Result;
use crate::model::Receipt;
use crate::payload_parser::ReceiptPayloadParser;
use crate::pkcs7::Pkcs7Container;

use log::{debug, info};

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

/// Options for a [`ReceiptDecoder`], built with chained setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderSettings {
    /// Controls the number of threads used by `decode_all`.
    /// `0` lets rayon decide how many threads to use.
    num_threads: usize,
    /// Containers nested deeper than this are rejected as malformed.
    max_depth: usize,
    /// Accept payloads with bytes after the outermost attribute set.
    allow_trailing_data: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        DecoderSettings {
            num_threads: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_data: false,
        }
    }
}

impl DecoderSettings {
    pub fn new() -> Self {
        DecoderSettings::default()
    }

    /// Sets the number of worker threads.
    /// Without the `multithreading` feature receipts are always decoded on the calling thread.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if cfg!(feature = "multithreading") {
            num_threads
        } else {
            1
        };
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn allow_trailing_data(mut self, allow_trailing_data: bool) -> Self {
        self.allow_trailing_data = allow_trailing_data;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn should_allow_trailing_data(&self) -> bool {
        self.allow_trailing_data
    }
}

/// Decodes PKCS #7 wrapped receipts.
///
/// A decoder holds only its settings, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct ReceiptDecoder {
    config: DecoderSettings,
}

impl ReceiptDecoder {
    pub fn new() -> Self {
        ReceiptDecoder::default()
    }

    pub fn with_configuration(mut self, configuration: DecoderSettings) -> Self {
        self.config = configuration;
        self
    }

    pub fn settings(&self) -> &DecoderSettings {
        &self.config
    }

    /// Returns the receipt payload carried in the envelope, without interpreting it.
    pub fn extract_payload<'a>(&self, receipt: &'a [u8]) -> Result<&'a [u8]> {
        Pkcs7Container::new(receipt)
            .with_max_depth(self.config.max_depth)
            .content()
    }

    pub fn decode(&self, receipt: &[u8]) -> Result<Receipt> {
        let payload = self.extract_payload(receipt)?;
        debug!(
            "receipt payload is {} of {} bytes",
            payload.len(),
            receipt.len()
        );

        let parser = ReceiptPayloadParser::new()
            .max_depth(self.config.max_depth)
            .allow_trailing_data(self.config.allow_trailing_data);

        Ok(parser.receipt(payload)?)
    }

    /// Decodes every receipt, returning results in input order.
    ///
    /// Each receipt succeeds or fails on its own.
    #[cfg(feature = "multithreading")]
    pub fn decode_all<T: AsRef<[u8]> + Sync>(&self, receipts: &[T]) -> Vec<Result<Receipt>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build();

        match pool {
            Ok(pool) => {
                info!(
                    "decoding {} receipts on {} threads",
                    receipts.len(),
                    pool.current_num_threads()
                );
                pool.install(|| {
                    receipts
                        .par_iter()
                        .map(|receipt| self.decode(receipt.as_ref()))
                        .collect()
                })
            }
            Err(e) => {
                info!("failed to build a thread pool ({}), decoding sequentially", e);
                self.decode_sequential(receipts)
            }
        }
    }

    /// Decodes every receipt, returning results in input order.
    ///
    /// Each receipt succeeds or fails on its own.
    #[cfg(not(feature = "multithreading"))]
    pub fn decode_all<T: AsRef<[u8]>>(&self, receipts: &[T]) -> Vec<Result<Receipt>> {
        info!("decoding {} receipts", receipts.len());
        self.decode_sequential(receipts)
    }

    fn decode_sequential<T: AsRef<[u8]>>(&self, receipts: &[T]) -> Vec<Result<Receipt>> {
        receipts
            .iter()
            .map(|receipt| self.decode(receipt.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_env_logger_initialized;
    use crate::err::{DerError, ReceiptError};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_builder() {
        let settings = DecoderSettings::new()
            .max_depth(8)
            .allow_trailing_data(true);

        assert_eq!(settings.get_max_depth(), 8);
        assert!(settings.should_allow_trailing_data());
        assert_eq!(settings.get_num_threads(), 0);
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn test_num_threads() {
        assert_eq!(DecoderSettings::new().num_threads(4).get_num_threads(), 4);
    }

    #[test]
    fn test_empty_input() {
        ensure_env_logger_initialized();
        let decoder = ReceiptDecoder::new();

        assert_eq!(
            decoder.decode(&[]),
            Err(ReceiptError::Der(DerError::ReachedEof { what: "identifier" }))
        );
        assert!(decoder.decode(&[]).unwrap_err().is_missing_content());
    }

    #[test]
    fn test_decode_all_keeps_order() {
        ensure_env_logger_initialized();
        let decoder =
            ReceiptDecoder::new().with_configuration(DecoderSettings::new().num_threads(2));
        let receipts: Vec<Vec<u8>> = vec![vec![], vec![0x05, 0x00], vec![0x30, 0x80]];

        let results = decoder.decode_all(&receipts);

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            Err(ReceiptError::Der(DerError::ReachedEof { what: "identifier" }))
        );
        assert_eq!(results[1], Err(ReceiptError::MalformedContainer));
        assert!(matches!(
            results[2],
            Err(ReceiptError::Der(DerError::InvalidLength { .. }))
        ));
    }
}
