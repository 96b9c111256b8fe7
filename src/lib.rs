//! Decryption of
//! [SUIT](https://datatracker.ietf.org/doc/draft-ietf-suit-firmware-encryption)
//! encrypted payloads, protected with `COSE_Encrypt` structures using
//! ECDH-ES key agreement as specified in
//! [RFC 9052](https://tools.ietf.org/html/rfc9052) and
//! [RFC 9053](https://tools.ietf.org/html/rfc9053), intended for embedded
//! devices.
//!
//! The pipeline parses the structure, agrees on a shared secret with the
//! ephemeral key of a recipient, derives a key with HKDF over the
//! `COSE_KDF_Context`, optionally unwraps the content encryption key with
//! AES Key Wrap and finally decrypts the payload. The supported
//! combinations are
//!
//! * ECDH-ES + HKDF-256 / HKDF-512 (direct key agreement)
//! * ECDH-ES + A128KW / A192KW / A256KW
//!
//! on the P-256 and P-384 curves, with A128GCM, A192GCM or A256GCM as the
//! content encryption algorithm. The non-AEAD modes of
//! [RFC 9459](https://tools.ietf.org/html/rfc9459), AES-CTR and AES-CBC, are
//! supported as well, for payloads whose integrity is protected otherwise.
//!
//! ```ignore
//! use suit_cose::{decode, kdf::KdfContext, algorithm::SymmetricAlgorithm};
//!
//! let context = KdfContext::new(SymmetricAlgorithm::A128Kw, 128)
//!     .with_other(b"SUIT Payload Encryption");
//! let firmware =
//!     decode(&encryption_info, &[receiver_key], &context, Some(&payload))?;
//! ```
//!
//! ## Security
//! All functions are pure and keep no state between calls. Key material
//! derived during a call is zeroized when it goes out of scope.

#![no_std]
#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

// Unusual byte groupings are used for consistency with RFC.
#[allow(clippy::unusual_byte_groupings)]
pub mod cbor;

pub mod aead;
pub mod algorithm;
pub mod content;
pub mod cose;
pub mod decoder;
pub mod ecdh;
pub mod encoder;
mod error;
pub mod kdf;
pub mod key;
pub mod key_wrap;

#[cfg(test)]
mod test_vectors;

pub use decoder::{decode, Decoder, DecoderConfig};
pub use encoder::{Encrypted, Encryptor};
pub use error::{Error, StructuralError};
pub use key::{AsymmetricKeyPair, Curve, PublicPoint};

/// The result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;
