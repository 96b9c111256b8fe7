//! Key derivation with HKDF over the `COSE_KDF_Context` (RFC 9053 §5).

use alloc::vec::Vec;
use core::{convert::TryFrom, fmt, str::FromStr};
use hkdf::Hkdf;
use serde::{Serialize, Serializer};
use serde_bytes::Bytes;
use sha2::{Sha256, Sha512};
#[cfg(feature = "std")]
use std::error;
use zeroize::Zeroizing;

use crate::{
    algorithm::{Prf, SymmetricAlgorithm},
    cbor,
    cose::header::HeaderMap,
    ecdh::SharedSecret,
};

/// The `PartyUInfo` or `PartyVInfo` of the context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartyInfo {
    pub identity: Option<Vec<u8>>,
    pub nonce: Option<Vec<u8>>,
    pub other: Option<Vec<u8>>,
}

impl PartyInfo {
    /// Fills every field that is not set with the one from `fallback`.
    pub fn or(self, fallback: PartyInfo) -> PartyInfo {
        PartyInfo {
            identity: self.identity.or(fallback.identity),
            nonce: self.nonce.or(fallback.nonce),
            other: self.other.or(fallback.other),
        }
    }
}

impl Serialize for PartyInfo {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        (
            self.identity.as_deref().map(Bytes::new),
            self.nonce.as_deref().map(Bytes::new),
            self.other.as_deref().map(Bytes::new),
        )
            .serialize(s)
    }
}

/// The `SuppPubInfo` of the context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuppPubInfo {
    /// Length of the derived key in bits.
    pub key_data_length: u32,
    /// Serialized protected header map, empty if there is none.
    pub protected: Vec<u8>,
    /// Protocol specific label, left out of the encoding if empty.
    pub other: Vec<u8>,
}

impl Serialize for SuppPubInfo {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let protected = Bytes::new(&self.protected);
        if self.other.is_empty() {
            (self.key_data_length, protected).serialize(s)
        } else {
            (self.key_data_length, protected, Bytes::new(&self.other))
                .serialize(s)
        }
    }
}

/// The caller's configuration of the key derivation.
///
/// Fields of the party information that aren't set are taken from the
/// recipient headers during a decode. The protected header is likewise
/// taken verbatim from the recipient if the context doesn't set one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfContext {
    alg: SymmetricAlgorithm,
    prf: Prf,
    party_u: PartyInfo,
    party_v: PartyInfo,
    supp_pub: SuppPubInfo,
    supp_priv: Option<Vec<u8>>,
}

impl KdfContext {
    /// Creates a context for a key of `key_data_length` bits used with `alg`.
    ///
    /// The length isn't checked here, see [`KdfContext::validate`].
    pub fn new(alg: SymmetricAlgorithm, key_data_length: u32) -> KdfContext {
        KdfContext {
            alg,
            prf: Prf::HmacSha256,
            party_u: PartyInfo::default(),
            party_v: PartyInfo::default(),
            supp_pub: SuppPubInfo {
                key_data_length,
                ..SuppPubInfo::default()
            },
            supp_priv: None,
        }
    }

    /// Creates a context from the COSE identifier of the algorithm.
    pub fn from_id(
        alg: i64,
        key_data_length: u32,
    ) -> Result<KdfContext, KdfError> {
        let alg = SymmetricAlgorithm::try_from(alg)
            .map_err(|_| KdfError::UnsupportedAlgorithm(alg))?;
        Ok(KdfContext::new(alg, key_data_length))
    }

    /// Creates a context from the name of the algorithm, like `"A128KW"`.
    pub fn from_name(
        alg: &str,
        key_data_length: u32,
    ) -> Result<KdfContext, KdfError> {
        let alg = SymmetricAlgorithm::from_str(alg)
            .map_err(|_| KdfError::UnknownAlgorithmName)?;
        Ok(KdfContext::new(alg, key_data_length))
    }

    /// Sets `SuppPubInfo.other`.
    pub fn with_other(mut self, other: &[u8]) -> KdfContext {
        self.supp_pub.other = other.to_vec();
        self
    }

    /// Sets `SuppPubInfo.protected` to the serialization of `protected`.
    pub fn with_protected(
        mut self,
        protected: &HeaderMap,
    ) -> Result<KdfContext, KdfError> {
        self.supp_pub.protected = protected
            .to_protected_bytes()
            .map_err(|_| KdfError::Encoding)?;
        Ok(self)
    }

    pub fn with_supp_priv(mut self, supp_priv: &[u8]) -> KdfContext {
        self.supp_priv = Some(supp_priv.to_vec());
        self
    }

    pub fn with_party_u(mut self, party_u: PartyInfo) -> KdfContext {
        self.party_u = party_u;
        self
    }

    pub fn with_party_v(mut self, party_v: PartyInfo) -> KdfContext {
        self.party_v = party_v;
        self
    }

    pub fn with_prf(mut self, prf: Prf) -> KdfContext {
        self.prf = prf;
        self
    }

    pub fn alg(&self) -> SymmetricAlgorithm {
        self.alg
    }

    pub fn prf(&self) -> Prf {
        self.prf
    }

    pub fn key_data_length(&self) -> u32 {
        self.supp_pub.key_data_length
    }

    pub fn supp_pub(&self) -> &SuppPubInfo {
        &self.supp_pub
    }

    /// Checks that the key length is a positive multiple of 8 and fits the
    /// algorithm.
    pub fn validate(&self) -> Result<(), KdfError> {
        let bits = self.supp_pub.key_data_length;
        if bits == 0 || bits % 8 != 0 {
            return Err(KdfError::InvalidLength(bits));
        }
        if bits != self.alg.key_bits() {
            return Err(KdfError::LengthMismatch {
                expected: self.alg.key_bits(),
                actual: bits,
            });
        }

        Ok(())
    }

    /// Returns the context to use for a single recipient.
    ///
    /// # Arguments
    /// * `prf` - The PRF of the recipient's algorithm.
    /// * `protected` - The serialized protected header of the recipient.
    /// * `party_u` - PartyU information from the recipient's headers.
    /// * `party_v` - PartyV information from the recipient's headers.
    pub fn for_recipient(
        &self,
        prf: Prf,
        protected: &[u8],
        party_u: PartyInfo,
        party_v: PartyInfo,
    ) -> KdfContext {
        let mut context = self.clone().with_prf(prf);
        context.party_u = context.party_u.or(party_u);
        context.party_v = context.party_v.or(party_v);
        if context.supp_pub.protected.is_empty() {
            context.supp_pub.protected = protected.to_vec();
        }

        context
    }
}

/// Returns the CBOR encoding of the `COSE_KDF_Context`, the `info` input of
/// HKDF.
pub fn build_context_info(context: &KdfContext) -> Result<Vec<u8>, KdfError> {
    let alg = context.alg.id();
    let info = match &context.supp_priv {
        Some(supp_priv) => cbor::encode((
            alg,
            &context.party_u,
            &context.party_v,
            &context.supp_pub,
            Bytes::new(supp_priv),
        )),
        None => cbor::encode((
            alg,
            &context.party_u,
            &context.party_v,
            &context.supp_pub,
        )),
    };

    info.map_err(|_| KdfError::Encoding)
}

/// Key material derived from a shared secret. Zeroized on drop.
pub struct DerivedKey(Zeroizing<Vec<u8>>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DerivedKey({} bytes)", self.0.len())
    }
}

/// Derives `key_data_length / 8` bytes from the shared secret with HKDF,
/// using no salt and the encoded context as `info`.
pub fn derive_key(
    secret: &SharedSecret,
    context: &KdfContext,
) -> Result<DerivedKey, KdfError> {
    context.validate()?;
    let info = build_context_info(context)?;
    let mut okm =
        Zeroizing::new(vec![0; context.key_data_length() as usize / 8]);
    match context.prf {
        Prf::HmacSha256 => Hkdf::<Sha256>::new(None, secret.as_bytes())
            .expand(&info, okm.as_mut_slice()),
        Prf::HmacSha512 => Hkdf::<Sha512>::new(None, secret.as_bytes())
            .expand(&info, okm.as_mut_slice()),
    }
    .map_err(|_| KdfError::OutputTooLong(context.key_data_length()))?;

    Ok(DerivedKey(okm))
}

/// The ways key derivation can fail.
#[derive(Debug, PartialEq, Eq)]
pub enum KdfError {
    /// The key length is zero or not a multiple of 8.
    InvalidLength(u32),
    /// The key length doesn't match the algorithm of the context.
    LengthMismatch { expected: u32, actual: u32 },
    /// The algorithm identifier isn't a supported symmetric algorithm.
    UnsupportedAlgorithm(i64),
    /// The algorithm name isn't a supported symmetric algorithm.
    UnknownAlgorithmName,
    /// The context names a different algorithm than the recipient uses.
    AlgorithmMismatch { context: i64, recipient: i64 },
    /// More output was requested than HKDF can produce.
    OutputTooLong(u32),
    /// The context couldn't be serialized.
    Encoding,
}

impl fmt::Display for KdfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KdfError::InvalidLength(bits) => {
                write!(f, "Key length of {} bits is invalid", bits)
            }
            KdfError::LengthMismatch { expected, actual } => write!(
                f,
                "Key length of {} bits, but the algorithm needs {}",
                actual, expected
            ),
            KdfError::UnsupportedAlgorithm(alg) => {
                write!(f, "Algorithm {} unsupported for key derivation", alg)
            }
            KdfError::UnknownAlgorithmName => {
                write!(f, "Unknown algorithm name")
            }
            KdfError::AlgorithmMismatch { context, recipient } => write!(
                f,
                "Context is for algorithm {}, but the recipient needs {}",
                context, recipient
            ),
            KdfError::OutputTooLong(bits) => {
                write!(f, "HKDF can't produce {} bits", bits)
            }
            KdfError::Encoding => write!(f, "Context encoding failed"),
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for KdfError {}
