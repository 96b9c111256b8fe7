//! The COSE algorithms this crate understands, as closed enums.
//!
//! A decode resolves the header algorithms once into a [`Suite`], which then
//! drives every later stage.

use core::{convert::TryFrom, fmt, str::FromStr};

use crate::Error;

/// Content encryption algorithms, the AEADs of RFC 9053 §4.1 and the
/// non-AEAD modes of RFC 9459.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentAlgorithm {
    A128Gcm,
    A192Gcm,
    A256Gcm,
    A128Ctr,
    A192Ctr,
    A256Ctr,
    /// AES-CBC with PKCS#7 padding.
    A128Cbc,
    A192Cbc,
    A256Cbc,
}

impl ContentAlgorithm {
    /// The COSE algorithm identifier.
    pub fn id(self) -> i64 {
        match self {
            ContentAlgorithm::A128Gcm => 1,
            ContentAlgorithm::A192Gcm => 2,
            ContentAlgorithm::A256Gcm => 3,
            ContentAlgorithm::A128Ctr => -65534,
            ContentAlgorithm::A192Ctr => -65533,
            ContentAlgorithm::A256Ctr => -65532,
            ContentAlgorithm::A128Cbc => -65531,
            ContentAlgorithm::A192Cbc => -65530,
            ContentAlgorithm::A256Cbc => -65529,
        }
    }

    /// The key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            ContentAlgorithm::A128Gcm
            | ContentAlgorithm::A128Ctr
            | ContentAlgorithm::A128Cbc => 16,
            ContentAlgorithm::A192Gcm
            | ContentAlgorithm::A192Ctr
            | ContentAlgorithm::A192Cbc => 24,
            ContentAlgorithm::A256Gcm
            | ContentAlgorithm::A256Ctr
            | ContentAlgorithm::A256Cbc => 32,
        }
    }

    /// Whether the algorithm authenticates the ciphertext and the
    /// `Enc_structure`.
    pub fn is_aead(self) -> bool {
        matches!(
            self,
            ContentAlgorithm::A128Gcm
                | ContentAlgorithm::A192Gcm
                | ContentAlgorithm::A256Gcm
        )
    }

    /// The nonce length in bytes, which for CTR is the initial counter
    /// block.
    pub fn nonce_len(self) -> usize {
        if self.is_aead() {
            12
        } else {
            16
        }
    }

    /// The authentication tag length in bytes, zero without AEAD.
    pub fn tag_len(self) -> usize {
        if self.is_aead() {
            16
        } else {
            0
        }
    }
}

impl TryFrom<i64> for ContentAlgorithm {
    type Error = Error;

    fn try_from(id: i64) -> Result<ContentAlgorithm, Error> {
        match id {
            1 => Ok(ContentAlgorithm::A128Gcm),
            2 => Ok(ContentAlgorithm::A192Gcm),
            3 => Ok(ContentAlgorithm::A256Gcm),
            -65534 => Ok(ContentAlgorithm::A128Ctr),
            -65533 => Ok(ContentAlgorithm::A192Ctr),
            -65532 => Ok(ContentAlgorithm::A256Ctr),
            -65531 => Ok(ContentAlgorithm::A128Cbc),
            -65530 => Ok(ContentAlgorithm::A192Cbc),
            -65529 => Ok(ContentAlgorithm::A256Cbc),
            _ => Err(Error::UnsupportedAlgorithm(id)),
        }
    }
}

/// AES Key Wrap algorithms (RFC 9053 §6.2.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyWrapAlgorithm {
    A128Kw,
    A192Kw,
    A256Kw,
}

impl KeyWrapAlgorithm {
    /// The COSE algorithm identifier.
    pub fn id(self) -> i64 {
        match self {
            KeyWrapAlgorithm::A128Kw => -3,
            KeyWrapAlgorithm::A192Kw => -4,
            KeyWrapAlgorithm::A256Kw => -5,
        }
    }

    /// The length of the key encryption key in bytes.
    pub fn key_len(self) -> usize {
        match self {
            KeyWrapAlgorithm::A128Kw => 16,
            KeyWrapAlgorithm::A192Kw => 24,
            KeyWrapAlgorithm::A256Kw => 32,
        }
    }
}

/// The hash function behind HKDF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prf {
    HmacSha256,
    HmacSha512,
}

/// ECDH-ES key agreement algorithms (RFC 9053 §6.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAgreement {
    /// ECDH-ES + HKDF-256, the derived key is the content key.
    EcdhEsHkdf256,
    /// ECDH-ES + HKDF-512, the derived key is the content key.
    EcdhEsHkdf512,
    /// ECDH-ES + A128KW, the derived key wraps the content key.
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
}

impl KeyAgreement {
    /// The COSE algorithm identifier.
    pub fn id(self) -> i64 {
        match self {
            KeyAgreement::EcdhEsHkdf256 => -25,
            KeyAgreement::EcdhEsHkdf512 => -26,
            KeyAgreement::EcdhEsA128Kw => -29,
            KeyAgreement::EcdhEsA192Kw => -30,
            KeyAgreement::EcdhEsA256Kw => -31,
        }
    }

    /// The key wrap algorithm, if the agreement isn't direct.
    pub fn key_wrap(self) -> Option<KeyWrapAlgorithm> {
        match self {
            KeyAgreement::EcdhEsHkdf256 | KeyAgreement::EcdhEsHkdf512 => None,
            KeyAgreement::EcdhEsA128Kw => Some(KeyWrapAlgorithm::A128Kw),
            KeyAgreement::EcdhEsA192Kw => Some(KeyWrapAlgorithm::A192Kw),
            KeyAgreement::EcdhEsA256Kw => Some(KeyWrapAlgorithm::A256Kw),
        }
    }

    pub fn prf(self) -> Prf {
        match self {
            KeyAgreement::EcdhEsHkdf512 => Prf::HmacSha512,
            _ => Prf::HmacSha256,
        }
    }
}

impl TryFrom<i64> for KeyAgreement {
    type Error = Error;

    fn try_from(id: i64) -> Result<KeyAgreement, Error> {
        match id {
            -25 => Ok(KeyAgreement::EcdhEsHkdf256),
            -26 => Ok(KeyAgreement::EcdhEsHkdf512),
            -29 => Ok(KeyAgreement::EcdhEsA128Kw),
            -30 => Ok(KeyAgreement::EcdhEsA192Kw),
            -31 => Ok(KeyAgreement::EcdhEsA256Kw),
            _ => Err(Error::UnsupportedAlgorithm(id)),
        }
    }
}

impl FromStr for KeyAgreement {
    type Err = Error;

    fn from_str(name: &str) -> Result<KeyAgreement, Error> {
        match name {
            "ECDH-ES+HKDF-256" => Ok(KeyAgreement::EcdhEsHkdf256),
            "ECDH-ES+HKDF-512" => Ok(KeyAgreement::EcdhEsHkdf512),
            "ECDH-ES+A128KW" => Ok(KeyAgreement::EcdhEsA128Kw),
            "ECDH-ES+A192KW" => Ok(KeyAgreement::EcdhEsA192Kw),
            "ECDH-ES+A256KW" => Ok(KeyAgreement::EcdhEsA256Kw),
            _ => Err(Error::UnsupportedAlgorithm(0)),
        }
    }
}

/// The algorithm a derived key is meant for, which is the `AlgorithmID` of
/// the `COSE_KDF_Context`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymmetricAlgorithm {
    A128Kw,
    A192Kw,
    A256Kw,
    A128Gcm,
    A192Gcm,
    A256Gcm,
    A128Ctr,
    A192Ctr,
    A256Ctr,
    A128Cbc,
    A192Cbc,
    A256Cbc,
}

impl SymmetricAlgorithm {
    /// The COSE algorithm identifier.
    pub fn id(self) -> i64 {
        match self {
            SymmetricAlgorithm::A128Kw => -3,
            SymmetricAlgorithm::A192Kw => -4,
            SymmetricAlgorithm::A256Kw => -5,
            SymmetricAlgorithm::A128Gcm => 1,
            SymmetricAlgorithm::A192Gcm => 2,
            SymmetricAlgorithm::A256Gcm => 3,
            SymmetricAlgorithm::A128Ctr => -65534,
            SymmetricAlgorithm::A192Ctr => -65533,
            SymmetricAlgorithm::A256Ctr => -65532,
            SymmetricAlgorithm::A128Cbc => -65531,
            SymmetricAlgorithm::A192Cbc => -65530,
            SymmetricAlgorithm::A256Cbc => -65529,
        }
    }

    /// The key length in bits.
    pub fn key_bits(self) -> u32 {
        use SymmetricAlgorithm::*;
        match self {
            A128Kw | A128Gcm | A128Ctr | A128Cbc => 128,
            A192Kw | A192Gcm | A192Ctr | A192Cbc => 192,
            A256Kw | A256Gcm | A256Ctr | A256Cbc => 256,
        }
    }
}

impl From<KeyWrapAlgorithm> for SymmetricAlgorithm {
    fn from(alg: KeyWrapAlgorithm) -> SymmetricAlgorithm {
        match alg {
            KeyWrapAlgorithm::A128Kw => SymmetricAlgorithm::A128Kw,
            KeyWrapAlgorithm::A192Kw => SymmetricAlgorithm::A192Kw,
            KeyWrapAlgorithm::A256Kw => SymmetricAlgorithm::A256Kw,
        }
    }
}

impl From<ContentAlgorithm> for SymmetricAlgorithm {
    fn from(alg: ContentAlgorithm) -> SymmetricAlgorithm {
        match alg {
            ContentAlgorithm::A128Gcm => SymmetricAlgorithm::A128Gcm,
            ContentAlgorithm::A192Gcm => SymmetricAlgorithm::A192Gcm,
            ContentAlgorithm::A256Gcm => SymmetricAlgorithm::A256Gcm,
            ContentAlgorithm::A128Ctr => SymmetricAlgorithm::A128Ctr,
            ContentAlgorithm::A192Ctr => SymmetricAlgorithm::A192Ctr,
            ContentAlgorithm::A256Ctr => SymmetricAlgorithm::A256Ctr,
            ContentAlgorithm::A128Cbc => SymmetricAlgorithm::A128Cbc,
            ContentAlgorithm::A192Cbc => SymmetricAlgorithm::A192Cbc,
            ContentAlgorithm::A256Cbc => SymmetricAlgorithm::A256Cbc,
        }
    }
}

impl TryFrom<i64> for SymmetricAlgorithm {
    type Error = Error;

    fn try_from(id: i64) -> Result<SymmetricAlgorithm, Error> {
        match id {
            -3 => Ok(SymmetricAlgorithm::A128Kw),
            -4 => Ok(SymmetricAlgorithm::A192Kw),
            -5 => Ok(SymmetricAlgorithm::A256Kw),
            1 => Ok(SymmetricAlgorithm::A128Gcm),
            2 => Ok(SymmetricAlgorithm::A192Gcm),
            3 => Ok(SymmetricAlgorithm::A256Gcm),
            -65534 => Ok(SymmetricAlgorithm::A128Ctr),
            -65533 => Ok(SymmetricAlgorithm::A192Ctr),
            -65532 => Ok(SymmetricAlgorithm::A256Ctr),
            -65531 => Ok(SymmetricAlgorithm::A128Cbc),
            -65530 => Ok(SymmetricAlgorithm::A192Cbc),
            -65529 => Ok(SymmetricAlgorithm::A256Cbc),
            _ => Err(Error::UnsupportedAlgorithm(id)),
        }
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<SymmetricAlgorithm, Error> {
        match name {
            "A128KW" => Ok(SymmetricAlgorithm::A128Kw),
            "A192KW" => Ok(SymmetricAlgorithm::A192Kw),
            "A256KW" => Ok(SymmetricAlgorithm::A256Kw),
            "A128GCM" => Ok(SymmetricAlgorithm::A128Gcm),
            "A192GCM" => Ok(SymmetricAlgorithm::A192Gcm),
            "A256GCM" => Ok(SymmetricAlgorithm::A256Gcm),
            "A128CTR" => Ok(SymmetricAlgorithm::A128Ctr),
            "A192CTR" => Ok(SymmetricAlgorithm::A192Ctr),
            "A256CTR" => Ok(SymmetricAlgorithm::A256Ctr),
            "A128CBC" => Ok(SymmetricAlgorithm::A128Cbc),
            "A192CBC" => Ok(SymmetricAlgorithm::A192Cbc),
            "A256CBC" => Ok(SymmetricAlgorithm::A256Cbc),
            _ => Err(Error::UnsupportedAlgorithm(0)),
        }
    }
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SymmetricAlgorithm::A128Kw => "A128KW",
            SymmetricAlgorithm::A192Kw => "A192KW",
            SymmetricAlgorithm::A256Kw => "A256KW",
            SymmetricAlgorithm::A128Gcm => "A128GCM",
            SymmetricAlgorithm::A192Gcm => "A192GCM",
            SymmetricAlgorithm::A256Gcm => "A256GCM",
            SymmetricAlgorithm::A128Ctr => "A128CTR",
            SymmetricAlgorithm::A192Ctr => "A192CTR",
            SymmetricAlgorithm::A256Ctr => "A256CTR",
            SymmetricAlgorithm::A128Cbc => "A128CBC",
            SymmetricAlgorithm::A192Cbc => "A192CBC",
            SymmetricAlgorithm::A256Cbc => "A256CBC",
        };
        f.write_str(name)
    }
}

/// A complete, supported combination of key agreement, optional key wrap
/// and content encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suite {
    /// The derived key is used as the content key.
    EcdhEsHkdf {
        prf: Prf,
        content: ContentAlgorithm,
    },
    /// The derived key unwraps the content key.
    EcdhEsAesKw {
        wrap: KeyWrapAlgorithm,
        content: ContentAlgorithm,
    },
}

impl Suite {
    /// Resolves the suite of a recipient.
    pub fn resolve(
        agreement: KeyAgreement,
        content: ContentAlgorithm,
    ) -> Suite {
        match agreement.key_wrap() {
            Some(wrap) => Suite::EcdhEsAesKw { wrap, content },
            None => Suite::EcdhEsHkdf {
                prf: agreement.prf(),
                content,
            },
        }
    }

    pub fn content(self) -> ContentAlgorithm {
        match self {
            Suite::EcdhEsHkdf { content, .. }
            | Suite::EcdhEsAesKw { content, .. } => content,
        }
    }

    pub fn prf(self) -> Prf {
        match self {
            Suite::EcdhEsHkdf { prf, .. } => prf,
            Suite::EcdhEsAesKw { .. } => Prf::HmacSha256,
        }
    }

    /// The algorithm the derived key is used with, which has to be the one
    /// named in the `COSE_KDF_Context`.
    pub fn derived_key_algorithm(self) -> SymmetricAlgorithm {
        match self {
            Suite::EcdhEsHkdf { content, .. } => content.into(),
            Suite::EcdhEsAesKw { wrap, .. } => wrap.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        for id in &[1, 2, 3, -65534, -65533, -65532, -65531, -65530, -65529] {
            assert_eq!(*id, ContentAlgorithm::try_from(*id).unwrap().id());
            assert_eq!(
                *id,
                SymmetricAlgorithm::try_from(*id).unwrap().id()
            );
        }
        for id in &[-25, -26, -29, -30, -31] {
            assert_eq!(*id, KeyAgreement::try_from(*id).unwrap().id());
        }
        for id in &[-3, -4, -5, 1, 2, 3] {
            assert_eq!(*id, SymmetricAlgorithm::try_from(*id).unwrap().id());
        }
        assert!(matches!(
            KeyAgreement::try_from(-27),
            Err(Error::UnsupportedAlgorithm(-27))
        ));
        assert!(ContentAlgorithm::try_from(10).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(
            KeyAgreement::EcdhEsA128Kw,
            "ECDH-ES+A128KW".parse().unwrap()
        );
        assert_eq!(SymmetricAlgorithm::A128Kw, "A128KW".parse().unwrap());
        assert_eq!("A256GCM", format!("{}", SymmetricAlgorithm::A256Gcm));
        assert!("A128CCM".parse::<SymmetricAlgorithm>().is_err());
        assert_eq!(SymmetricAlgorithm::A192Cbc, "A192CBC".parse().unwrap());
        assert_eq!("A128CTR", format!("{}", SymmetricAlgorithm::A128Ctr));
    }

    #[test]
    fn content_modes() {
        let ctr = ContentAlgorithm::A256Ctr;
        assert!(!ctr.is_aead());
        assert_eq!(
            (32, 16, 0),
            (ctr.key_len(), ctr.nonce_len(), ctr.tag_len())
        );
        let gcm = ContentAlgorithm::A192Gcm;
        assert!(gcm.is_aead());
        assert_eq!(
            (24, 12, 16),
            (gcm.key_len(), gcm.nonce_len(), gcm.tag_len())
        );
        assert_eq!(
            SymmetricAlgorithm::A128Cbc,
            SymmetricAlgorithm::from(ContentAlgorithm::A128Cbc)
        );
        assert_eq!(128, SymmetricAlgorithm::A128Cbc.key_bits());
    }

    #[test]
    fn suites() {
        let suite = Suite::resolve(
            KeyAgreement::EcdhEsA128Kw,
            ContentAlgorithm::A128Gcm,
        );
        assert_eq!(
            Suite::EcdhEsAesKw {
                wrap: KeyWrapAlgorithm::A128Kw,
                content: ContentAlgorithm::A128Gcm
            },
            suite
        );
        assert_eq!(SymmetricAlgorithm::A128Kw, suite.derived_key_algorithm());
        assert_eq!(Prf::HmacSha256, suite.prf());

        let suite = Suite::resolve(
            KeyAgreement::EcdhEsHkdf512,
            ContentAlgorithm::A256Gcm,
        );
        assert_eq!(SymmetricAlgorithm::A256Gcm, suite.derived_key_algorithm());
        assert_eq!(Prf::HmacSha512, suite.prf());
        assert_eq!(ContentAlgorithm::A256Gcm, suite.content());
    }
}
