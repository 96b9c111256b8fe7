//! The errors of the crate.

use core::fmt;
#[cfg(feature = "std")]
use std::error;

use crate::{cbor, ecdh::AgreementError, kdf::KdfError};

/// The catch-all error type for this crate.
///
/// The variants distinguish the stage of the pipeline that failed. Tooling
/// that reports failures to untrusted parties should call
/// [`Error::redacted`], so that the authentication failures of the
/// different stages can't be told apart.
// TODO: Derive PartialEq as soon as serde_cbor does for its error type
#[derive(Debug)]
pub enum Error {
    /// The structure is not a well-formed `COSE_Encrypt`.
    Structural(StructuralError),
    /// An algorithm identifier or curve is unknown or not supported.
    UnsupportedAlgorithm(i64),
    /// Key agreement or key validation failed.
    Agreement(AgreementError),
    /// Key derivation failed.
    Kdf(KdfError),
    /// The integrity check of AES Key Wrap failed.
    UnwrapAuthentication,
    /// The AEAD authentication tag didn't verify.
    AeadAuthentication,
    /// The CBC padding of the decrypted content is malformed.
    InvalidPadding,
    /// No recipient could be paired with any of the given keys.
    NoMatchingRecipient,
    /// Redacted form of every authentication failure.
    DecryptionFailed,
}

impl Error {
    /// Returns the error with all failures that could serve as a decryption
    /// oracle collapsed into [`Error::DecryptionFailed`].
    pub fn redacted(self) -> Error {
        match self {
            Error::Agreement(_)
            | Error::UnwrapAuthentication
            | Error::AeadAuthentication
            | Error::InvalidPadding => Error::DecryptionFailed,
            e => e,
        }
    }

    /// Whether the failure was caused by a failed authentication check.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::UnwrapAuthentication
                | Error::AeadAuthentication
                | Error::DecryptionFailed
        )
    }
}

impl From<StructuralError> for Error {
    fn from(e: StructuralError) -> Error {
        Error::Structural(e)
    }
}

impl From<cbor::CborError> for Error {
    fn from(e: cbor::CborError) -> Error {
        Error::Structural(StructuralError::Cbor(e))
    }
}

impl From<AgreementError> for Error {
    fn from(e: AgreementError) -> Error {
        match e {
            AgreementError::UnsupportedCurve(crv) => {
                Error::UnsupportedAlgorithm(crv)
            }
            e => Error::Agreement(e),
        }
    }
}

impl From<KdfError> for Error {
    fn from(e: KdfError) -> Error {
        Error::Kdf(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Structural(e) => write!(f, "Malformed structure: {}", e),
            Error::UnsupportedAlgorithm(alg) => {
                write!(f, "Algorithm {} unsupported", alg)
            }
            Error::Agreement(e) => write!(f, "Key agreement error: {}", e),
            Error::Kdf(e) => write!(f, "Key derivation error: {}", e),
            Error::UnwrapAuthentication => {
                write!(f, "Key unwrap integrity check failed")
            }
            Error::AeadAuthentication => {
                write!(f, "Authentication tag mismatch")
            }
            Error::InvalidPadding => write!(f, "Invalid content padding"),
            Error::NoMatchingRecipient => {
                write!(f, "No recipient matches the given keys")
            }
            Error::DecryptionFailed => write!(f, "Decryption failed"),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Structural(e) => Some(e),
            Error::Agreement(e) => Some(e),
            Error::Kdf(e) => Some(e),
            // Other errors that don't wrap anything
            _ => None,
        }
    }
}

/// The ways a structure can fail to be a valid `COSE_Encrypt`.
#[derive(Debug)]
pub enum StructuralError {
    /// Wraps errors from the `cbor` module.
    Cbor(cbor::CborError),
    /// The recipient array is empty.
    NoRecipients,
    /// More recipients than the configuration allows.
    TooManyRecipients(usize),
    /// The data items don't have the shape of a `COSE_Encrypt`.
    Shape(&'static str),
    /// A recipient carries another layer of recipients.
    NestedRecipients,
    /// A label is present in both the protected and unprotected bucket.
    DuplicateLabel(i64),
    /// A mandatory header parameter is absent.
    MissingHeader(i64),
    /// A header parameter has the wrong type or shape.
    InvalidHeader(i64),
    /// A critical header parameter is not understood.
    UnsupportedCritical(i64),
    /// The IV doesn't have the nonce length of the algorithm.
    InvalidIvLength(usize),
    /// The ciphertext is detached but no payload was supplied.
    MissingPayload,
    /// The ciphertext is inline and a detached payload was supplied as well.
    UnexpectedPayload,
    /// The ciphertext is too short to hold an authentication tag, or a
    /// block of padding.
    CiphertextTooShort(usize),
    /// The ciphertext isn't a whole number of cipher blocks.
    InvalidCiphertextLength(usize),
    /// The content algorithm has no integrity protection, so the structure
    /// can't carry data that would need it.
    UnprotectedContent(&'static str),
    /// The content encryption key doesn't fit the content algorithm.
    InvalidKeyLength(usize),
    /// The wrapped key isn't a whole number of at least two 64-bit blocks.
    InvalidWrappedKeyLength(usize),
}

impl From<cbor::CborError> for StructuralError {
    fn from(e: cbor::CborError) -> StructuralError {
        StructuralError::Cbor(e)
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StructuralError::Cbor(e) => e.fmt(f),
            StructuralError::NoRecipients => {
                write!(f, "Recipient array is empty")
            }
            StructuralError::TooManyRecipients(n) => {
                write!(f, "Too many recipients: {}", n)
            }
            StructuralError::Shape(expected) => {
                write!(f, "Expected {}", expected)
            }
            StructuralError::NestedRecipients => {
                write!(f, "Nested recipient layers are unsupported")
            }
            StructuralError::DuplicateLabel(l) => {
                write!(f, "Label {} is both protected and unprotected", l)
            }
            StructuralError::MissingHeader(l) => {
                write!(f, "Header parameter {} is missing", l)
            }
            StructuralError::InvalidHeader(l) => {
                write!(f, "Header parameter {} is invalid", l)
            }
            StructuralError::UnsupportedCritical(l) => {
                write!(f, "Critical header parameter {} not understood", l)
            }
            StructuralError::InvalidIvLength(n) => {
                write!(f, "IV of {} bytes has the wrong length", n)
            }
            StructuralError::MissingPayload => {
                write!(f, "Ciphertext is detached but no payload was given")
            }
            StructuralError::UnexpectedPayload => {
                write!(f, "Ciphertext is inline but a payload was given")
            }
            StructuralError::CiphertextTooShort(n) => {
                write!(f, "Ciphertext of {} bytes is too short", n)
            }
            StructuralError::InvalidCiphertextLength(n) => {
                write!(f, "Ciphertext of {} bytes isn't block aligned", n)
            }
            StructuralError::UnprotectedContent(what) => {
                write!(f, "No {} without authenticated encryption", what)
            }
            StructuralError::InvalidKeyLength(n) => {
                write!(f, "Content key of {} bytes has the wrong length", n)
            }
            StructuralError::InvalidWrappedKeyLength(n) => {
                write!(f, "Wrapped key of {} bytes has the wrong length", n)
            }
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for StructuralError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            StructuralError::Cbor(e) => Some(e),
            _ => None,
        }
    }
}
