//! Receipt attribute sets.
//!
//! A receipt payload (and every in-app purchase record inside it) is a `SET` of
//! `SEQUENCE { type INTEGER, version INTEGER, value OCTET STRING }`. The OCTET STRING usually
//! holds another DER value, which [`Attribute`] decodes on demand.

use crate::asn1::{
    BufferType, BufferValue, Domain, PayloadDescriptor, Token, TokenStream, ValueKind,
    consume_length, convert_value,
};
use crate::err::{DerError, DerResult};
use crate::utils::timestamp_from_receipt_date;

use jiff::Timestamp;
use log::{debug, trace};
use std::ops::Range;

/// One `(type, version, payload)` triple found in an attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    pub attribute_type: i64,
    pub version: i64,
    pub payload: &'a [u8],
    /// Byte range of the attribute's `SEQUENCE` contents within the parsed buffer.
    pub range: Range<usize>,
}

/// A read-only view over a [`RawAttribute`] with typed accessors.
///
/// Accessors return `None` when the payload is not a well-formed DER value of the requested
/// kind; they never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    raw: RawAttribute<'a>,
}

impl<'a> Attribute<'a> {
    /// Builds an attribute that was not read from a buffer. It has no source range, so
    /// [`Attribute::range`] is empty.
    pub fn new(attribute_type: i64, version: i64, payload: &'a [u8]) -> Self {
        Attribute::from_raw(RawAttribute {
            attribute_type,
            version,
            payload,
            range: 0..0,
        })
    }

    pub fn from_raw(raw: RawAttribute<'a>) -> Self {
        Attribute { raw }
    }

    pub fn attribute_type(&self) -> i64 {
        self.raw.attribute_type
    }

    pub fn version(&self) -> i64 {
        self.raw.version
    }

    /// The undecoded payload bytes.
    pub fn payload(&self) -> &'a [u8] {
        self.raw.payload
    }

    pub fn range(&self) -> Range<usize> {
        self.raw.range.clone()
    }

    pub fn raw(&self) -> &RawAttribute<'a> {
        &self.raw
    }

    fn typed_value(&self) -> Option<BufferValue<'a>> {
        let (&identifier, rest) = self.raw.payload.split_first()?;
        let descriptor = PayloadDescriptor::from_byte(identifier);
        if descriptor.domain != Domain::Universal || descriptor.value_kind != ValueKind::Primitive {
            return None;
        }

        let (length, rest) = consume_length(rest).ok()?;
        let content = rest.get(..length)?;

        convert_value(content, descriptor.tag).ok()
    }

    pub fn string_value(&self) -> Option<String> {
        match self.typed_value()? {
            BufferValue::String(s) => Some(s.into_owned()),
            _ => None,
        }
    }

    pub fn integer_value(&self) -> Option<i64> {
        match self.typed_value()? {
            BufferValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// Parses the payload as a receipt date. Both string and DER time payloads are accepted.
    pub fn date_value(&self) -> Option<Timestamp> {
        match self.typed_value()? {
            BufferValue::String(s) | BufferValue::Date(s) => timestamp_from_receipt_date(&s),
            _ => None,
        }
    }
}

/// Slots of the attribute currently being assembled, filled strictly in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAttribute<'a> {
    AwaitingType,
    AwaitingVersion {
        attribute_type: i64,
    },
    AwaitingData {
        attribute_type: i64,
        version: i64,
    },
    Complete {
        attribute_type: i64,
        version: i64,
        payload: &'a [u8],
    },
}

impl<'a> PendingAttribute<'a> {
    fn accept(self, value: &BufferValue<'a>, raw: &'a [u8]) -> Self {
        match (self, value) {
            (PendingAttribute::AwaitingType, BufferValue::Integer(attribute_type)) => {
                PendingAttribute::AwaitingVersion {
                    attribute_type: *attribute_type,
                }
            }
            (PendingAttribute::AwaitingVersion { attribute_type }, BufferValue::Integer(version)) => {
                PendingAttribute::AwaitingData {
                    attribute_type,
                    version: *version,
                }
            }
            (
                PendingAttribute::AwaitingData {
                    attribute_type,
                    version,
                },
                _,
            ) => PendingAttribute::Complete {
                attribute_type,
                version,
                payload: raw,
            },
            (unchanged, _) => unchanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State<'a> {
    BeforeSet,
    InSet,
    InSequence {
        pending: PendingAttribute<'a>,
        start: usize,
    },
    Done,
}

/// Iterates over the attributes of a DER encoded attribute set.
///
/// The buffer must start with a `SET`. Sequences whose shape does not match an attribute (for
/// example a missing version, or a stray `NULL` in place of an integer) are skipped, as are
/// tokens nested below the attribute sequences. Only structurally invalid DER is an error.
///
/// [`AttributeSetProcessor::skip_until_set`] relaxes the leading `SET` requirement for nested
/// sets: top level values before the set are skipped, and a buffer without one yields nothing.
#[derive(Debug)]
pub struct AttributeSetProcessor<'a> {
    stream: TokenStream<'a>,
    state: State<'a>,
    skip_until_set: bool,
}

impl<'a> AttributeSetProcessor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        AttributeSetProcessor {
            stream: TokenStream::new(data),
            state: State::BeforeSet,
            skip_until_set: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.stream = self.stream.with_max_depth(max_depth);
        self
    }

    pub fn skip_until_set(mut self) -> Self {
        self.skip_until_set = true;
        self
    }

    /// Number of bytes after the end of the set. Only meaningful once iteration has finished.
    pub fn trailing_len(&self) -> usize {
        self.stream.remaining()
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    fn fail(&mut self, err: DerError) -> Option<DerResult<Attribute<'a>>> {
        self.state = State::Done;
        self.stream.abort();
        Some(Err(err))
    }
}

impl<'a> Iterator for AttributeSetProcessor<'a> {
    type Item = DerResult<Attribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == State::Done {
            return None;
        }

        while let Some(token) = self.stream.next() {
            let token = match token {
                Ok(token) => token,
                Err(e) => return self.fail(e),
            };
            let depth = self.stream.depth();

            let state = std::mem::replace(&mut self.state, State::Done);
            self.state = match (state, token) {
                (State::BeforeSet, Token::ContainerStart(BufferType::Set)) if depth == 1 => {
                    State::InSet
                }
                (State::BeforeSet, _) if self.skip_until_set => {
                    trace!("skipping token before the attribute set at depth {}", depth);
                    State::BeforeSet
                }
                (State::BeforeSet, _) => {
                    return self.fail(DerError::Malformed {
                        offset: 0,
                        reason: "attribute set does not start with a SET",
                    });
                }
                (State::InSet, Token::ContainerEnd(BufferType::Set)) if depth == 0 => {
                    trace!("attribute set ended at offset {}", self.stream.position());
                    self.stream.abort();
                    return None;
                }
                (State::InSet, Token::ContainerStart(BufferType::Sequence)) if depth == 2 => {
                    State::InSequence {
                        pending: PendingAttribute::AwaitingType,
                        start: self.stream.position(),
                    }
                }
                (State::InSequence { pending, start }, Token::Value { value, raw })
                    if depth == 2 =>
                {
                    State::InSequence {
                        pending: pending.accept(&value, raw),
                        start,
                    }
                }
                (State::InSequence { pending, start }, Token::ContainerEnd(BufferType::Sequence))
                    if depth == 1 =>
                {
                    self.state = State::InSet;

                    match pending {
                        PendingAttribute::Complete {
                            attribute_type,
                            version,
                            payload,
                        } => {
                            let raw = RawAttribute {
                                attribute_type,
                                version,
                                payload,
                                range: start..self.stream.position(),
                            };
                            trace!(
                                "attribute type {} version {} ({} bytes)",
                                attribute_type,
                                version,
                                payload.len()
                            );
                            return Some(Ok(Attribute::from_raw(raw)));
                        }
                        incomplete => {
                            debug!("skipping incomplete attribute sequence: {:?}", incomplete);
                            State::InSet
                        }
                    }
                }
                (other, _) => other,
            };
        }

        // The stream ended cleanly but the set was never closed.
        let reached_end = std::mem::replace(&mut self.state, State::Done);
        match reached_end {
            State::Done => None,
            State::BeforeSet if self.skip_until_set => {
                debug!("no attribute set found in {} bytes", self.stream.position());
                None
            }
            _ => Some(Err(DerError::Malformed {
                offset: self.stream.position(),
                reason: "attribute set was not closed",
            })),
        }
    }
}
