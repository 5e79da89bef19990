use std::fmt;

/// DER universal tag numbers.
///
/// Every tag number maps to exactly one variant; numbers without a universal meaning are kept as
/// [`BufferType::Custom`] so context-specific and application tags survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    Eoc,
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    ObjectDescriptor,
    ExternalReference,
    Real,
    Enumerated,
    EmbeddedPdv,
    Utf8String,
    RelativeObjectIdentifier,
    Sequence,
    Set,
    NumericString,
    PrintableString,
    TeletexString,
    VideotexString,
    Ia5String,
    UtcTime,
    GeneralizedTime,
    GraphicString,
    VisibleString,
    GeneralString,
    UniversalString,
    BmpString,
    /// Tag number 31: the real tag follows in subsequent bytes (unsupported).
    UsesLongForm,
    Custom(u8),
}

impl BufferType {
    /// Maps a 5-bit tag number to its type. Only the low 5 bits of `tag` are considered.
    pub fn from_u8(tag: u8) -> BufferType {
        match tag & 0x1f {
            0x00 => BufferType::Eoc,
            0x01 => BufferType::Boolean,
            0x02 => BufferType::Integer,
            0x03 => BufferType::BitString,
            0x04 => BufferType::OctetString,
            0x05 => BufferType::Null,
            0x06 => BufferType::ObjectIdentifier,
            0x07 => BufferType::ObjectDescriptor,
            0x08 => BufferType::ExternalReference,
            0x09 => BufferType::Real,
            0x0a => BufferType::Enumerated,
            0x0b => BufferType::EmbeddedPdv,
            0x0c => BufferType::Utf8String,
            0x0d => BufferType::RelativeObjectIdentifier,
            0x10 => BufferType::Sequence,
            0x11 => BufferType::Set,
            0x12 => BufferType::NumericString,
            0x13 => BufferType::PrintableString,
            0x14 => BufferType::TeletexString,
            0x15 => BufferType::VideotexString,
            0x16 => BufferType::Ia5String,
            0x17 => BufferType::UtcTime,
            0x18 => BufferType::GeneralizedTime,
            0x19 => BufferType::GraphicString,
            0x1a => BufferType::VisibleString,
            0x1b => BufferType::GeneralString,
            0x1c => BufferType::UniversalString,
            0x1e => BufferType::BmpString,
            0x1f => BufferType::UsesLongForm,
            other => BufferType::Custom(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            BufferType::Eoc => 0x00,
            BufferType::Boolean => 0x01,
            BufferType::Integer => 0x02,
            BufferType::BitString => 0x03,
            BufferType::OctetString => 0x04,
            BufferType::Null => 0x05,
            BufferType::ObjectIdentifier => 0x06,
            BufferType::ObjectDescriptor => 0x07,
            BufferType::ExternalReference => 0x08,
            BufferType::Real => 0x09,
            BufferType::Enumerated => 0x0a,
            BufferType::EmbeddedPdv => 0x0b,
            BufferType::Utf8String => 0x0c,
            BufferType::RelativeObjectIdentifier => 0x0d,
            BufferType::Sequence => 0x10,
            BufferType::Set => 0x11,
            BufferType::NumericString => 0x12,
            BufferType::PrintableString => 0x13,
            BufferType::TeletexString => 0x14,
            BufferType::VideotexString => 0x15,
            BufferType::Ia5String => 0x16,
            BufferType::UtcTime => 0x17,
            BufferType::GeneralizedTime => 0x18,
            BufferType::GraphicString => 0x19,
            BufferType::VisibleString => 0x1a,
            BufferType::GeneralString => 0x1b,
            BufferType::UniversalString => 0x1c,
            BufferType::BmpString => 0x1e,
            BufferType::UsesLongForm => 0x1f,
            BufferType::Custom(tag) => tag,
        }
    }

    /// Types whose payload may legitimately be zero bytes long.
    pub fn permits_empty_payload(self) -> bool {
        matches!(
            self,
            BufferType::Null
                | BufferType::TeletexString
                | BufferType::GraphicString
                | BufferType::PrintableString
                | BufferType::Utf8String
                | BufferType::Ia5String
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive,
    Constructed,
}

/// The decoded form of a single DER identifier octet.
///
/// ```text
/// | 8 | 7 | 6 | 5 | 4 | 3 | 2 | 1 |
/// | domain| C |       tag         |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayloadDescriptor {
    pub domain: Domain,
    pub value_kind: ValueKind,
    pub tag: BufferType,
}

impl PayloadDescriptor {
    pub fn new(domain: Domain, value_kind: ValueKind, tag: BufferType) -> Self {
        PayloadDescriptor {
            domain,
            value_kind,
            tag,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        let domain = match byte >> 6 {
            0 => Domain::Universal,
            1 => Domain::Application,
            2 => Domain::ContextSpecific,
            _ => Domain::Private,
        };

        let value_kind = if (byte >> 5) & 1 == 1 {
            ValueKind::Constructed
        } else {
            ValueKind::Primitive
        };

        PayloadDescriptor::new(domain, value_kind, BufferType::from_u8(byte))
    }

    pub fn to_byte(self) -> u8 {
        let domain: u8 = match self.domain {
            Domain::Universal => 0,
            Domain::Application => 1,
            Domain::ContextSpecific => 2,
            Domain::Private => 3,
        };
        let constructed: u8 = match self.value_kind {
            ValueKind::Primitive => 0,
            ValueKind::Constructed => 1,
        };

        (domain << 6) | (constructed << 5) | (self.tag.as_u8() & 0x1f)
    }

    pub fn with_tag(self, tag: BufferType) -> Self {
        PayloadDescriptor { tag, ..self }
    }

    pub fn is_constructed(&self) -> bool {
        self.value_kind == ValueKind::Constructed
    }
}

impl fmt::Display for PayloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {:?} {:?} (0x{:02x})",
            self.domain,
            self.value_kind,
            self.tag,
            self.to_byte()
        )
    }
}
