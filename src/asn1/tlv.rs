//! Tag-length-value primitives.
//!
//! These functions operate on already-delimited slices: [`consume_length`] reads the length
//! octets that follow an identifier byte, and [`convert_value`] interprets exactly the content
//! octets of one primitive value.

use crate::asn1::{BufferType, BufferValue, ObjectIdentifier};
use crate::err::{DerError, DerResult};

use byteorder::{BigEndian, ByteOrder};
use encoding::all::ASCII;
use encoding::{DecoderTrap, Encoding};
use std::borrow::Cow;

/// Reads a DER length from the start of `data`, returning it with the bytes that follow.
///
/// Only definite lengths are accepted. A long-form length must be positive and fit in a `usize`.
pub fn consume_length(data: &[u8]) -> DerResult<(usize, &[u8])> {
    let (&first, rest) = data
        .split_first()
        .ok_or(DerError::ReachedEof { what: "length" })?;

    if first & 0x80 == 0 {
        return Ok((usize::from(first), rest));
    }

    let byte_count = usize::from(first & 0x7f);

    if byte_count == 0 {
        return Err(DerError::InvalidLength {
            reason: "indefinite length encoding is not DER",
        });
    }

    if rest.len() < byte_count {
        return Err(DerError::InvalidLength {
            reason: "not enough bytes for long form length",
        });
    }

    if byte_count > 8 {
        return Err(DerError::InvalidLength {
            reason: "long form length does not fit in 64 bits",
        });
    }

    let (length_bytes, rest) = rest.split_at(byte_count);
    let length = BigEndian::read_uint(length_bytes, byte_count);

    if length == 0 {
        return Err(DerError::InvalidLength {
            reason: "long form length must be positive",
        });
    }

    let length = usize::try_from(length).map_err(|_| DerError::InvalidLength {
        reason: "long form length does not fit in memory",
    })?;

    Ok((length, rest))
}

/// Reads big-endian content octets as a non-negative integer.
///
/// Leading zero octets are skipped. Values that need more than 63 bits are rejected instead of
/// wrapping around.
pub fn parse_integer(buffer: &[u8]) -> DerResult<i64> {
    let first_significant = buffer
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(buffer.len());
    let significant = &buffer[first_significant..];

    if significant.is_empty() {
        return Ok(0);
    }

    if significant.len() > 8 {
        return Err(DerError::IntegerOverflow {
            significant_bytes: significant.len(),
        });
    }

    let value = BigEndian::read_uint(significant, significant.len());

    i64::try_from(value).map_err(|_| DerError::IntegerOverflow {
        significant_bytes: significant.len(),
    })
}

/// Interprets the content octets of a primitive value as `buffer_type`.
pub fn convert_value(buffer: &[u8], buffer_type: BufferType) -> DerResult<BufferValue<'_>> {
    if buffer.is_empty() && !buffer_type.permits_empty_payload() {
        return Err(DerError::InvalidBufferSize {
            found: 0,
            buffer_type,
        });
    }

    let value = match buffer_type {
        BufferType::Boolean => {
            if buffer.len() != 1 {
                return Err(DerError::InvalidBufferSize {
                    found: buffer.len(),
                    buffer_type,
                });
            }
            BufferValue::Boolean(buffer[0] != 0)
        }
        BufferType::Integer => BufferValue::Integer(parse_integer(buffer)?),
        BufferType::BitString | BufferType::OctetString => BufferValue::Data(buffer),
        BufferType::Null => BufferValue::Null,
        BufferType::ObjectIdentifier | BufferType::RelativeObjectIdentifier => {
            BufferValue::ObjectIdentifier(ObjectIdentifier::new(buffer))
        }
        BufferType::Utf8String | BufferType::TeletexString | BufferType::GraphicString => {
            let s = std::str::from_utf8(buffer)
                .map_err(|_| DerError::UnsupportedBuffer { buffer_type })?;
            BufferValue::String(Cow::Borrowed(s))
        }
        BufferType::Ia5String | BufferType::PrintableString => {
            BufferValue::String(Cow::Owned(decode_ascii(buffer, buffer_type)?))
        }
        BufferType::UtcTime | BufferType::GeneralizedTime => {
            BufferValue::Date(Cow::Owned(decode_ascii(buffer, buffer_type)?))
        }
        _ => return Err(DerError::UnsupportedBuffer { buffer_type }),
    };

    Ok(value)
}

fn decode_ascii(buffer: &[u8], buffer_type: BufferType) -> DerResult<String> {
    ASCII
        .decode(buffer, DecoderTrap::Strict)
        .map_err(|_| DerError::UnsupportedBuffer { buffer_type })
}
