use crate::asn1::tlv::convert_value;
use crate::asn1::{BufferType, BufferValue, Domain, PayloadDescriptor};
use crate::err::{DerError, DerResult};
use crate::utils::ByteCursor;

use log::trace;
use std::collections::VecDeque;

/// Containers nested deeper than this are rejected unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A structural event produced while walking DER bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Opens a context-specific element, carrying its tag number.
    ContextStart(u8),
    ContextEnd(u8),
    ContainerStart(BufferType),
    ContainerEnd(BufferType),
    /// A primitive value, alongside the content octets it was decoded from.
    Value {
        value: BufferValue<'a>,
        raw: &'a [u8],
    },
}

#[derive(Debug)]
struct Frame {
    end: usize,
    buffer_type: BufferType,
    context_tag: Option<u8>,
}

/// Walks a DER buffer depth first, yielding [`Token`]s.
///
/// Containers are tracked on an explicit stack, so deeply nested input costs heap rather than
/// call stack. Consumers that only need a prefix of the structure stop pulling tokens (or call
/// [`TokenStream::abort`]); nothing past the last yielded token is read. After the first error
/// the stream yields `None`.
#[derive(Debug)]
pub struct TokenStream<'a> {
    cursor: ByteCursor<'a>,
    stack: Vec<Frame>,
    pending: VecDeque<Token<'a>>,
    max_depth: usize,
    started: bool,
    finished: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        TokenStream {
            cursor: ByteCursor::new(data),
            stack: Vec::new(),
            pending: VecDeque::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            started: false,
            finished: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Offset of the next unread byte.
    ///
    /// While a `ContainerStart` is being handled this is the first content byte of that
    /// container; while a `ContainerEnd` is being handled it is the container's end offset.
    pub fn position(&self) -> usize {
        self.cursor.pos()
    }

    /// Number of containers enclosing the most recently yielded token.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bytes of the input not yet consumed by the walk.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Stops the walk. Subsequent calls to `next` yield `None`.
    pub fn abort(&mut self) {
        trace!("token stream aborted at offset {}", self.cursor.pos());
        self.finished = true;
        self.pending.clear();
    }

    fn limit(&self) -> usize {
        self.stack
            .last()
            .map_or(self.cursor.buf().len(), |frame| frame.end)
    }

    fn read_element(&mut self) -> DerResult<()> {
        let offset = self.cursor.pos();
        let limit = self.limit();

        let descriptor = PayloadDescriptor::from_byte(self.cursor.u8_named("identifier")?);

        if descriptor.tag == BufferType::UsesLongForm {
            return Err(DerError::Malformed {
                offset,
                reason: "high tag number form is not supported",
            });
        }

        let length = self.cursor.length(limit)?;
        let start = self.cursor.pos();
        let end = start
            .checked_add(length)
            .filter(|end| *end <= limit)
            .ok_or(DerError::InvalidLength {
                reason: "value overruns its enclosing container",
            })?;

        trace!(
            "offset {}: {} with {} content bytes",
            offset, descriptor, length
        );

        let context_tag =
            (descriptor.domain == Domain::ContextSpecific).then(|| descriptor.tag.as_u8());

        if descriptor.is_constructed() {
            if self.stack.len() >= self.max_depth {
                return Err(DerError::Malformed {
                    offset,
                    reason: "containers are nested too deeply",
                });
            }

            if let Some(tag) = context_tag {
                self.pending.push_back(Token::ContextStart(tag));
            }
            self.pending
                .push_back(Token::ContainerStart(descriptor.tag));
            self.stack.push(Frame {
                end,
                buffer_type: descriptor.tag,
                context_tag,
            });
        } else {
            // Implicitly tagged primitives carry no type information of their own.
            let buffer_type = match context_tag {
                Some(_) => BufferType::OctetString,
                None => descriptor.tag,
            };

            let raw = self.cursor.take_bytes(length, end, "primitive value")?;
            let value = convert_value(raw, buffer_type)?;

            if let Some(tag) = context_tag {
                self.pending.push_back(Token::ContextStart(tag));
            }
            self.pending.push_back(Token::Value { value, raw });
            if let Some(tag) = context_tag {
                self.pending.push_back(Token::ContextEnd(tag));
            }
        }

        Ok(())
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = DerResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }

            if self.finished {
                return None;
            }

            if !self.started {
                self.started = true;
                if self.cursor.is_eof() {
                    self.finished = true;
                    return Some(Err(DerError::ReachedEof { what: "identifier" }));
                }
            }

            let container_done = self
                .stack
                .last()
                .is_some_and(|frame| self.cursor.pos() >= frame.end);

            if container_done {
                if let Some(frame) = self.stack.pop() {
                    self.pending
                        .push_back(Token::ContainerEnd(frame.buffer_type));
                    if let Some(tag) = frame.context_tag {
                        self.pending.push_back(Token::ContextEnd(tag));
                    }
                }
                continue;
            }

            if self.stack.is_empty() && self.cursor.is_eof() {
                self.finished = true;
                return None;
            }

            if let Err(e) = self.read_element() {
                self.finished = true;
                self.pending.clear();
                return Some(Err(e));
            }
        }
    }
}
