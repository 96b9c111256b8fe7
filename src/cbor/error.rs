use core::fmt;
#[cfg(feature = "std")]
use std::error;

/// The error type for the `cbor` module.
// TODO: Derive PartialEq as soon as serde_cbor does for its error type
#[derive(Debug)]
pub enum CborError {
    /// Wraps errors from `serde_cbor`.
    SerdeCbor(serde_cbor::Error),
    /// The input ended in the middle of a data item.
    Truncated,
    /// There are bytes left after the top-level data item.
    TrailingBytes(usize),
    /// An indefinite-length string, array or map was found.
    IndefiniteLength,
    /// A length or integer argument is not in its shortest form.
    NonCanonical,
    /// A reserved additional information value (28 to 30) was found.
    Reserved(u8),
    /// A break stop code appeared outside of an indefinite-length item.
    UnexpectedBreak,
    /// A tag was found where none is allowed.
    UnexpectedTag(u64),
    /// The data items are nested deeper than allowed.
    TooDeep,
}

impl From<serde_cbor::Error> for CborError {
    fn from(e: serde_cbor::Error) -> CborError {
        CborError::SerdeCbor(e)
    }
}

impl fmt::Display for CborError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CborError::SerdeCbor(e) => write!(f, "CBOR error: {}", e),
            CborError::Truncated => write!(f, "CBOR error: truncated item"),
            CborError::TrailingBytes(n) => {
                write!(f, "CBOR error: {} trailing bytes", n)
            }
            CborError::IndefiniteLength => {
                write!(f, "CBOR error: indefinite-length item")
            }
            CborError::NonCanonical => {
                write!(f, "CBOR error: argument not in shortest form")
            }
            CborError::Reserved(ai) => write!(
                f,
                "CBOR error: reserved additional information {}",
                ai
            ),
            CborError::UnexpectedBreak => {
                write!(f, "CBOR error: unexpected break")
            }
            CborError::UnexpectedTag(tag) => {
                write!(f, "CBOR error: unexpected tag {}", tag)
            }
            CborError::TooDeep => write!(f, "CBOR error: nesting too deep"),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for CborError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CborError::SerdeCbor(e) => Some(e),
            _ => None,
        }
    }
}
