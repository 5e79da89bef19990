use std::borrow::Cow;
use std::fmt;

/// A decoded primitive DER value.
///
/// Raw byte payloads and object identifiers borrow from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferValue<'a> {
    Null,
    Boolean(bool),
    Integer(i64),
    String(Cow<'a, str>),
    Data(&'a [u8]),
    /// Raw ASCII text of a `UTCTime` or `GeneralizedTime`, not validated as a calendar date.
    Date(Cow<'a, str>),
    ObjectIdentifier(ObjectIdentifier<'a>),
}

impl fmt::Display for BufferValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferValue::Null => write!(f, "null"),
            BufferValue::Boolean(b) => write!(f, "{}", b),
            BufferValue::Integer(i) => write!(f, "{}", i),
            BufferValue::String(s) => write!(f, "'{}'", s),
            BufferValue::Data(bytes) => write!(f, "{} bytes", bytes.len()),
            BufferValue::Date(s) => write!(f, "'{}'", s),
            BufferValue::ObjectIdentifier(oid) => write!(f, "{}", oid),
        }
    }
}

/// Content bytes of an `OBJECT IDENTIFIER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier<'a> {
    bytes: &'a [u8],
}

impl<'a> ObjectIdentifier<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ObjectIdentifier { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The arcs of this identifier, or `None` if the encoding is truncated or an arc overflows.
    pub fn components(&self) -> Option<Vec<u64>> {
        let (&first, rest) = self.bytes.split_first()?;

        let mut components = vec![u64::from(first / 40), u64::from(first % 40)];

        let mut arc: u64 = 0;
        let mut in_arc = false;
        for &byte in rest {
            // Seven more bits must fit.
            if arc > (u64::MAX >> 7) {
                return None;
            }
            arc = (arc << 7) | u64::from(byte & 0x7f);
            in_arc = true;

            if byte & 0x80 == 0 {
                components.push(arc);
                arc = 0;
                in_arc = false;
            }
        }

        if in_arc {
            return None;
        }

        Some(components)
    }

    /// Dotted decimal form, e.g. `1.2.840.113549.1.7.1`.
    pub fn dotted(&self) -> Option<String> {
        let components = self.components()?;
        let parts: Vec<String> = components.iter().map(u64::to_string).collect();
        Some(parts.join("."))
    }

    pub fn matches(&self, dotted: &str) -> bool {
        self.dotted().is_some_and(|d| d == dotted)
    }
}

impl fmt::Display for ObjectIdentifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dotted() {
            Some(dotted) => write!(f, "{}", dotted),
            None => write!(f, "<invalid oid {:02x?}>", self.bytes),
        }
    }
}
