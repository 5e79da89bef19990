use crate::asn1::{BufferValue, DEFAULT_MAX_DEPTH, Token, TokenStream};
use crate::err::{ReceiptError, Result};

use log::{debug, trace};

/// Content type OIDs defined by PKCS #7.
pub mod oids {
    pub const DATA: &str = "1.2.840.113549.1.7.1";
    pub const SIGNED_DATA: &str = "1.2.840.113549.1.7.2";
    pub const ENVELOPED_DATA: &str = "1.2.840.113549.1.7.3";
    pub const SIGNED_AND_ENVELOPED_DATA: &str = "1.2.840.113549.1.7.4";
    pub const DIGESTED_DATA: &str = "1.2.840.113549.1.7.5";
    pub const ENCRYPTED_DATA: &str = "1.2.840.113549.1.7.6";
}

/// Locates the encapsulated `data` payload of a PKCS #7 `SignedData` receipt.
///
/// The signature itself is not checked; only the OCTET STRING that follows the `data` content
/// type is extracted. Certificates and signer infos after the payload are never walked.
#[derive(Debug, Clone, Copy)]
pub struct Pkcs7Container<'a> {
    data: &'a [u8],
    max_depth: usize,
}

impl<'a> Pkcs7Container<'a> {
    pub fn new(receipt: &'a [u8]) -> Self {
        Pkcs7Container {
            data: receipt,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns the payload bytes, borrowed from the receipt.
    ///
    /// Each call walks the receipt from the start, so repeated calls yield identical results.
    pub fn content(&self) -> Result<&'a [u8]> {
        let stream = TokenStream::new(self.data).with_max_depth(self.max_depth);
        let mut after_data_oid = false;

        for token in stream {
            match token? {
                Token::Value {
                    value: BufferValue::ObjectIdentifier(oid),
                    ..
                } => {
                    trace!("content type {}", oid);
                    after_data_oid = oid.matches(oids::DATA);
                }
                Token::Value {
                    value: BufferValue::Data(content),
                    ..
                } if after_data_oid => {
                    debug!("extracted {} bytes of PKCS7 content", content.len());
                    return Ok(content);
                }
                Token::Value { .. } => after_data_oid = false,
                _ => {}
            }
        }

        Err(ReceiptError::MalformedContainer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::err::DerError;
    use pretty_assertions::assert_eq;

    const DATA_OID: [u8; 11] = [
        0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01,
    ];
    const SIGNED_DATA_OID: [u8; 11] = [
        0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02,
    ];

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        assert!(content.len() < 128);
        let mut out = vec![tag, content.len() as u8];
        out.extend_from_slice(content);
        out
    }

    fn signed_data(payload: &[u8]) -> Vec<u8> {
        let content_info = [DATA_OID.to_vec(), tlv(0xA0, &tlv(0x04, payload))].concat();
        let signed = [
            tlv(0x02, &[0x01]),
            tlv(0x31, &[]),
            tlv(0x30, &content_info),
            tlv(0x31, &[]),
        ]
        .concat();
        tlv(
            0x30,
            &[SIGNED_DATA_OID.to_vec(), tlv(0xA0, &tlv(0x30, &signed))].concat(),
        )
    }

    #[test]
    fn test_empty_data() {
        let container = Pkcs7Container::new(&[]);
        assert_eq!(
            container.content(),
            Err(ReceiptError::Der(DerError::ReachedEof { what: "identifier" }))
        );
    }

    #[test]
    fn test_extracts_signed_data_payload() {
        let payload = [0x31, 0x03, 0x05, 0x01, 0x00];
        let receipt = signed_data(&payload);
        let container = Pkcs7Container::new(&receipt);

        let first = container.content().unwrap();
        let second = container.content().unwrap();

        assert_eq!(first, &payload);
        assert_eq!(first, second);
    }

    #[test]
    fn test_container_without_content() {
        let container = Pkcs7Container::new(&[0b1100_0001, 1, 1]);
        assert_eq!(container.content(), Err(ReceiptError::MalformedContainer));
    }

    #[test]
    fn test_early_extraction_ignores_trailing_garbage() {
        let content = [8, 8, 8, 8];
        let mut data = DATA_OID.to_vec();
        data.extend(tlv(0x04, &content));
        data.push(8);
        data.extend([0; 10]);

        let container = Pkcs7Container::new(&data);
        assert_eq!(container.content().unwrap(), &content);
    }

    #[test]
    fn test_value_between_oid_and_payload_clears_match() {
        let mut data = DATA_OID.to_vec();
        data.extend(tlv(0x02, &[0x01]));
        data.extend(tlv(0x04, &[0xAA]));

        let container = Pkcs7Container::new(&data);
        assert_eq!(container.content(), Err(ReceiptError::MalformedContainer));
    }

    #[test]
    fn test_structural_error_before_payload_propagates() {
        let mut data = SIGNED_DATA_OID.to_vec();
        data.extend([0x04, 0x80]);

        let container = Pkcs7Container::new(&data);
        assert!(matches!(
            container.content(),
            Err(ReceiptError::Der(DerError::InvalidLength { .. }))
        ));
    }
}
