//! ASN.1 DER walking: identifier octets, lengths, primitive values and a depth-first token stream.

mod buffer_type;
pub mod tlv;
mod token_stream;
mod value;

pub use self::buffer_type::{BufferType, Domain, PayloadDescriptor, ValueKind};
pub use self::tlv::{consume_length, convert_value, parse_integer};
pub use self::token_stream::{DEFAULT_MAX_DEPTH, Token, TokenStream};
pub use self::value::{BufferValue, ObjectIdentifier};
