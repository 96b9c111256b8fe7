//! The `COSE_Encrypt` structure (RFC 9052 §5.1) and its recipients.

use alloc::vec::Vec;
use core::convert::{TryFrom, TryInto};
use serde_bytes::Bytes;

use crate::{
    algorithm::{ContentAlgorithm, KeyAgreement},
    cbor,
    error::StructuralError,
    kdf::PartyInfo,
    key::PublicPoint,
    Result,
};

pub mod header;
pub mod key;

use header::{
    HeaderMap, HeaderValue, ALG, CRIT, EPHEMERAL_KEY, IV, KID, PARTIAL_IV,
    PARTY_U, PARTY_V,
};

/// Header parameters this crate acts on, and which may therefore be marked
/// critical.
const UNDERSTOOD: [i64; 11] = [
    ALG, CRIT, KID, IV, EPHEMERAL_KEY, -21, -22, -23, -24, -25, -26,
];

/// The content of a `COSE_Encrypt`.
#[derive(Clone, Debug, PartialEq)]
pub enum Ciphertext {
    Inline(Vec<u8>),
    /// The ciphertext is transported separately and supplied on decryption.
    Detached,
}

/// A single layer `COSE_recipient`.
#[derive(Clone, Debug, PartialEq)]
pub struct Recipient {
    /// The protected header as it was sent, since it's authenticated as is.
    pub protected_bytes: Vec<u8>,
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    /// The wrapped content key, empty for direct key agreement.
    pub encrypted_key: Vec<u8>,
}

impl Recipient {
    pub fn new(
        protected: HeaderMap,
        unprotected: HeaderMap,
        encrypted_key: Vec<u8>,
    ) -> Result<Recipient> {
        Ok(Recipient {
            protected_bytes: protected.to_protected_bytes()?,
            protected,
            unprotected,
            encrypted_key,
        })
    }

    /// Returns a header parameter from either bucket.
    pub fn header(&self, label: i64) -> Option<&HeaderValue> {
        self.protected
            .get(label)
            .or_else(|| self.unprotected.get(label))
    }

    pub fn algorithm(&self) -> Result<KeyAgreement> {
        KeyAgreement::try_from(required_int(self.header(ALG), ALG)?)
    }

    pub fn kid(&self) -> Result<Option<&[u8]>> {
        optional_bytes(self.header(KID), KID)
    }

    /// Returns the public point of the sender's ephemeral key.
    pub fn ephemeral_key(&self) -> Result<PublicPoint> {
        match self.header(EPHEMERAL_KEY) {
            Some(HeaderValue::Map(key)) => {
                key::decode_public(key, EPHEMERAL_KEY)
            }
            Some(_) => {
                Err(StructuralError::InvalidHeader(EPHEMERAL_KEY).into())
            }
            None => Err(StructuralError::MissingHeader(EPHEMERAL_KEY).into()),
        }
    }

    /// Returns the PartyU or PartyV information from the header parameters
    /// `-21` to `-26`.
    pub fn party_info(&self, labels: [i64; 3]) -> Result<PartyInfo> {
        let field = |label: i64| {
            optional_bytes(self.header(label), label)
                .map(|value| value.map(<[u8]>::to_vec))
        };

        Ok(PartyInfo {
            identity: field(labels[0])?,
            nonce: field(labels[1])?,
            other: field(labels[2])?,
        })
    }

    pub fn party_u(&self) -> Result<PartyInfo> {
        self.party_info(PARTY_U)
    }

    pub fn party_v(&self) -> Result<PartyInfo> {
        self.party_info(PARTY_V)
    }
}

/// A `COSE_Encrypt` structure.
#[derive(Clone, Debug, PartialEq)]
pub struct EncryptionStructure {
    /// The protected header as it was sent, since it's authenticated as is.
    pub protected_bytes: Vec<u8>,
    pub protected: HeaderMap,
    pub unprotected: HeaderMap,
    pub ciphertext: Ciphertext,
    pub recipients: Vec<Recipient>,
}

impl EncryptionStructure {
    pub fn new(
        protected: HeaderMap,
        unprotected: HeaderMap,
        ciphertext: Ciphertext,
        recipients: Vec<Recipient>,
    ) -> Result<EncryptionStructure> {
        Ok(EncryptionStructure {
            protected_bytes: protected.to_protected_bytes()?,
            protected,
            unprotected,
            ciphertext,
            recipients,
        })
    }

    /// Returns a header parameter from either bucket.
    pub fn header(&self, label: i64) -> Option<&HeaderValue> {
        self.protected
            .get(label)
            .or_else(|| self.unprotected.get(label))
    }

    pub fn content_algorithm(&self) -> Result<ContentAlgorithm> {
        ContentAlgorithm::try_from(required_int(self.header(ALG), ALG)?)
    }

    /// Returns the IV, which has to have the nonce length of `alg`.
    pub fn iv(&self, alg: ContentAlgorithm) -> Result<&[u8]> {
        let iv = match self.header(IV) {
            Some(HeaderValue::Bytes(iv)) => iv,
            Some(_) => return Err(StructuralError::InvalidHeader(IV).into()),
            None => return Err(StructuralError::MissingHeader(IV).into()),
        };
        if iv.len() != alg.nonce_len() {
            return Err(StructuralError::InvalidIvLength(iv.len()).into());
        }

        Ok(iv)
    }

    /// Returns the ciphertext to decrypt, which is either the inline one or
    /// the detached one given by the caller, but never both.
    pub fn payload<'a>(
        &'a self,
        detached: Option<&'a [u8]>,
    ) -> Result<&'a [u8]> {
        match (&self.ciphertext, detached) {
            (Ciphertext::Inline(ciphertext), None) => Ok(ciphertext),
            (Ciphertext::Detached, Some(ciphertext)) => Ok(ciphertext),
            (Ciphertext::Inline(_), Some(_)) => {
                Err(StructuralError::UnexpectedPayload.into())
            }
            (Ciphertext::Detached, None) => {
                Err(StructuralError::MissingPayload.into())
            }
        }
    }
}

fn required_int(value: Option<&HeaderValue>, label: i64) -> Result<i64> {
    match value {
        Some(HeaderValue::Int(i)) => Ok(*i),
        Some(_) => Err(StructuralError::InvalidHeader(label).into()),
        None => Err(StructuralError::MissingHeader(label).into()),
    }
}

fn optional_bytes(
    value: Option<&HeaderValue>,
    label: i64,
) -> Result<Option<&[u8]>> {
    match value {
        Some(HeaderValue::Bytes(b)) => Ok(Some(b)),
        Some(_) => Err(StructuralError::InvalidHeader(label).into()),
        None => Ok(None),
    }
}

/// Parses the two header buckets of a layer and checks them together.
fn headers(
    protected: HeaderValue,
    unprotected: HeaderValue,
    max_depth: usize,
) -> Result<(Vec<u8>, HeaderMap, HeaderMap)> {
    let protected_bytes = match protected {
        HeaderValue::Bytes(b) => b,
        _ => {
            return Err(StructuralError::Shape(
                "protected header in a byte string",
            )
            .into())
        }
    };
    let protected =
        HeaderMap::from_protected_bytes(&protected_bytes, max_depth)?;
    let unprotected = match unprotected {
        HeaderValue::Map(m) => m,
        _ => {
            return Err(StructuralError::Shape("unprotected header map").into())
        }
    };

    if let Some(label) = protected
        .int_labels()
        .find(|l| unprotected.get(*l).is_some())
    {
        return Err(StructuralError::DuplicateLabel(label).into());
    }
    check_critical(&protected, &unprotected)?;
    // A Partial IV needs a base IV from a context this crate doesn't have
    if protected.get(PARTIAL_IV).is_some()
        || unprotected.get(PARTIAL_IV).is_some()
    {
        return Err(StructuralError::InvalidHeader(PARTIAL_IV).into());
    }

    Ok((protected_bytes, protected, unprotected))
}

fn check_critical(
    protected: &HeaderMap,
    unprotected: &HeaderMap,
) -> Result<()> {
    // crit is only valid in the protected bucket
    if unprotected.get(CRIT).is_some() {
        return Err(StructuralError::InvalidHeader(CRIT).into());
    }
    let labels = match protected.get(CRIT) {
        None => return Ok(()),
        Some(HeaderValue::Array(labels)) if !labels.is_empty() => labels,
        Some(_) => return Err(StructuralError::InvalidHeader(CRIT).into()),
    };
    for label in labels {
        let label = label
            .as_int()
            .ok_or(StructuralError::InvalidHeader(CRIT))?;
        // Critical parameters have to be present in the protected bucket
        if protected.get(label).is_none() {
            return Err(StructuralError::InvalidHeader(CRIT).into());
        }
        if !UNDERSTOOD.contains(&label) {
            return Err(StructuralError::UnsupportedCritical(label).into());
        }
    }

    Ok(())
}

fn recipient(item: HeaderValue, max_depth: usize) -> Result<Recipient> {
    let fields = match item {
        HeaderValue::Array(fields) => fields,
        _ => return Err(StructuralError::Shape("recipient array").into()),
    };
    if fields.len() == 4 {
        return Err(StructuralError::NestedRecipients.into());
    }
    let [protected, unprotected, encrypted_key]: [HeaderValue; 3] = fields
        .try_into()
        .map_err(|_| StructuralError::Shape("recipient of 3 items"))?;

    let (protected_bytes, protected, unprotected) =
        headers(protected, unprotected, max_depth)?;
    let encrypted_key = match encrypted_key {
        HeaderValue::Bytes(b) => b,
        HeaderValue::Null => Vec::new(),
        _ => {
            return Err(StructuralError::Shape(
                "encrypted key in a byte string",
            )
            .into())
        }
    };

    Ok(Recipient {
        protected_bytes,
        protected,
        unprotected,
        encrypted_key,
    })
}

/// Parses a `COSE_Encrypt`, which may carry tag 96.
///
/// # Arguments
/// * `bytes` - The encoded structure.
/// * `max_depth` - The deepest nesting of arrays and maps allowed.
pub fn parse(bytes: &[u8], max_depth: usize) -> Result<EncryptionStructure> {
    let untagged = cbor::untag(bytes, cbor::TAG_COSE_ENCRYPT)?;
    let fields = match cbor::decode::<HeaderValue>(untagged, max_depth)? {
        HeaderValue::Array(fields) => fields,
        _ => return Err(StructuralError::Shape("COSE_Encrypt array").into()),
    };
    let [protected, unprotected, ciphertext, recipients]: [HeaderValue; 4] =
        fields
            .try_into()
            .map_err(|_| StructuralError::Shape("COSE_Encrypt of 4 items"))?;

    let (protected_bytes, protected, unprotected) =
        headers(protected, unprotected, max_depth)?;
    let ciphertext = match ciphertext {
        HeaderValue::Bytes(b) => Ciphertext::Inline(b),
        HeaderValue::Null => Ciphertext::Detached,
        _ => {
            return Err(StructuralError::Shape(
                "ciphertext in a byte string or nil",
            )
            .into())
        }
    };
    let recipients = match recipients {
        HeaderValue::Array(r) if r.is_empty() => {
            return Err(StructuralError::NoRecipients.into())
        }
        HeaderValue::Array(r) => r
            .into_iter()
            .map(|item| recipient(item, max_depth))
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(StructuralError::Shape("recipient array").into()),
    };

    Ok(EncryptionStructure {
        protected_bytes,
        protected,
        unprotected,
        ciphertext,
        recipients,
    })
}

/// Encodes a `COSE_Encrypt`, optionally with tag 96.
pub fn serialize(
    structure: &EncryptionStructure,
    tagged: bool,
) -> Result<Vec<u8>> {
    let recipients: Vec<_> = structure
        .recipients
        .iter()
        .map(|r| {
            (
                Bytes::new(&r.protected_bytes),
                &r.unprotected,
                Bytes::new(&r.encrypted_key),
            )
        })
        .collect();
    let ciphertext = match &structure.ciphertext {
        Ciphertext::Inline(c) => Some(Bytes::new(c)),
        Ciphertext::Detached => None,
    };
    let encoded = cbor::encode((
        Bytes::new(&structure.protected_bytes),
        &structure.unprotected,
        ciphertext,
        recipients,
    ))?;

    if tagged {
        Ok(cbor::tag(cbor::TAG_COSE_ENCRYPT, &encoded)?)
    } else {
        Ok(encoded)
    }
}
