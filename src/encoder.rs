//! Producing `COSE_Encrypt` structures the [`Decoder`](crate::Decoder)
//! accepts.

use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::{
    aead,
    algorithm::{ContentAlgorithm, KeyAgreement, Suite},
    content,
    cose::{
        self,
        header::{HeaderMap, HeaderValue, ALG, EPHEMERAL_KEY, IV, KID},
        Ciphertext, EncryptionStructure, Recipient,
    },
    ecdh,
    error::StructuralError,
    kdf::{self, KdfContext, KdfError, PartyInfo},
    key::{AsymmetricKeyPair, PublicPoint},
    key_wrap, Result,
};

/// The output of an [`Encryptor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encrypted {
    /// The encoded `COSE_Encrypt`.
    pub structure: Vec<u8>,
    /// The ciphertext, if it's detached from the structure.
    pub detached: Option<Vec<u8>>,
}

/// Encrypts payloads for recipients with a fixed choice of algorithms.
#[derive(Clone, Debug)]
pub struct Encryptor {
    agreement: KeyAgreement,
    content: ContentAlgorithm,
    detached: bool,
    tagged: bool,
    kid: Option<Vec<u8>>,
    external_aad: Vec<u8>,
}

impl Encryptor {
    pub fn new(
        agreement: KeyAgreement,
        content: ContentAlgorithm,
    ) -> Encryptor {
        Encryptor {
            agreement,
            content,
            detached: false,
            tagged: true,
            kid: None,
            external_aad: Vec::new(),
        }
    }

    /// Whether the ciphertext is returned separately instead of being part of
    /// the structure.
    pub fn with_detached(mut self, detached: bool) -> Encryptor {
        self.detached = detached;
        self
    }

    /// Whether the structure carries the `COSE_Encrypt` tag.
    pub fn with_tag(mut self, tagged: bool) -> Encryptor {
        self.tagged = tagged;
        self
    }

    /// Sets the key ID the single recipient of [`Encryptor::encrypt`] gets.
    pub fn with_kid(mut self, kid: &[u8]) -> Encryptor {
        self.kid = Some(kid.to_vec());
        self
    }

    pub fn with_external_aad(mut self, external_aad: &[u8]) -> Encryptor {
        self.external_aad = external_aad.to_vec();
        self
    }

    /// Encrypts `plaintext` for the owner of `recipient`.
    pub fn encrypt(
        &self,
        rng: &mut impl CryptoRngCore,
        recipient: &PublicPoint,
        context: &KdfContext,
        plaintext: &[u8],
    ) -> Result<Encrypted> {
        self.encrypt_for(
            rng,
            &[(recipient, self.kid.as_deref())],
            context,
            plaintext,
        )
    }

    /// Encrypts `plaintext` for several recipients, each given by its public
    /// point and optional key ID.
    ///
    /// Only key wrapping allows more than one recipient, since with direct
    /// key agreement every recipient would need its own content key.
    pub fn encrypt_for(
        &self,
        rng: &mut impl CryptoRngCore,
        recipients: &[(&PublicPoint, Option<&[u8]>)],
        context: &KdfContext,
        plaintext: &[u8],
    ) -> Result<Encrypted> {
        context.validate()?;
        let suite = Suite::resolve(self.agreement, self.content);
        let derived = suite.derived_key_algorithm();
        if context.alg() != derived {
            return Err(KdfError::AlgorithmMismatch {
                context: context.alg().id(),
                recipient: derived.id(),
            }
            .into());
        }
        if !self.content.is_aead() && !self.external_aad.is_empty() {
            let e = StructuralError::UnprotectedContent("external AAD");
            return Err(e.into());
        }
        match (suite, recipients.len()) {
            (_, 0) => return Err(StructuralError::NoRecipients.into()),
            (Suite::EcdhEsHkdf { .. }, n) if n > 1 => {
                return Err(StructuralError::TooManyRecipients(n).into())
            }
            _ => (),
        }

        // For key wrapping, one random content key is wrapped for everybody
        let mut cek = Zeroizing::new(vec![0; self.content.key_len()]);
        rng.fill_bytes(cek.as_mut_slice());
        let mut layers = Vec::with_capacity(recipients.len());
        for (point, kid) in recipients {
            let (layer, derived) = self.recipient(rng, point, *kid, context)?;
            let layer = match suite {
                Suite::EcdhEsHkdf { .. } => {
                    cek = derived;
                    layer
                }
                Suite::EcdhEsAesKw { .. } => Recipient {
                    encrypted_key: key_wrap::wrap(&derived, &cek)?,
                    ..layer
                },
            };
            layers.push(layer);
        }

        let mut iv = vec![0; self.content.nonce_len()];
        rng.fill_bytes(&mut iv);
        let alg = HeaderValue::Int(self.content.id());
        let mut unprotected =
            HeaderMap::new().with(IV, HeaderValue::Bytes(iv.clone()));
        // Without AEAD the protected bucket has to stay empty
        let protected = if self.content.is_aead() {
            HeaderMap::new().with(ALG, alg)
        } else {
            unprotected.insert(ALG, alg);
            HeaderMap::new()
        };
        let aad = aead::build_enc_structure(
            &protected.to_protected_bytes()?,
            &self.external_aad,
        )?;
        let ciphertext =
            content::encrypt(self.content, &cek, &iv, plaintext, &aad)?;

        let (ciphertext, detached) = if self.detached {
            (Ciphertext::Detached, Some(ciphertext))
        } else {
            (Ciphertext::Inline(ciphertext), None)
        };
        let structure = EncryptionStructure::new(
            protected,
            unprotected,
            ciphertext,
            layers,
        )?;

        Ok(Encrypted {
            structure: cose::serialize(&structure, self.tagged)?,
            detached,
        })
    }

    /// Builds the layer of one recipient, without encrypted key, and returns
    /// it along with the key derived for it.
    fn recipient(
        &self,
        rng: &mut impl CryptoRngCore,
        point: &PublicPoint,
        kid: Option<&[u8]>,
        context: &KdfContext,
    ) -> Result<(Recipient, Zeroizing<Vec<u8>>)> {
        let ephemeral = AsymmetricKeyPair::generate(point.curve(), rng);
        let secret = ecdh::agree(&ephemeral, point)?;

        let protected =
            HeaderMap::new().with(ALG, HeaderValue::Int(self.agreement.id()));
        let mut unprotected = HeaderMap::new().with(
            EPHEMERAL_KEY,
            HeaderValue::Map(cose::key::encode_public(ephemeral.public())),
        );
        if let Some(kid) = kid {
            unprotected.insert(KID, HeaderValue::Bytes(kid.to_vec()));
        }
        let layer = Recipient::new(protected, unprotected, Vec::new())?;

        let context = context.for_recipient(
            self.agreement.prf(),
            &layer.protected_bytes,
            PartyInfo::default(),
            PartyInfo::default(),
        );
        let derived = kdf::derive_key(&secret, &context)?;

        Ok((layer, Zeroizing::new(derived.as_bytes().to_vec())))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{algorithm::SymmetricAlgorithm, key::Curve, Error};

    #[test]
    fn structure_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let receiver = AsymmetricKeyPair::generate(Curve::P256, &mut rng);
        let context = KdfContext::new(SymmetricAlgorithm::A256Kw, 256);
        let encrypted = Encryptor::new(
            KeyAgreement::EcdhEsA256Kw,
            ContentAlgorithm::A256Gcm,
        )
        .with_kid(b"kid")
        .encrypt(&mut rng, receiver.public(), &context, b"payload")
        .unwrap();
        assert!(encrypted.detached.is_none());

        let structure = cose::parse(&encrypted.structure, 8).unwrap();
        // Tag 96
        assert_eq!(&[0xD8, 0x60][..], &encrypted.structure[..2]);
        assert_eq!(&[0xA1, 0x01, 0x03][..], &structure.protected_bytes[..]);
        assert_eq!(12, structure.iv(ContentAlgorithm::A256Gcm).unwrap().len());
        let recipient = &structure.recipients[0];
        // { 1: -31 }
        assert_eq!(
            &[0xA1, 0x01, 0x38, 0x1E][..],
            &recipient.protected_bytes[..]
        );
        assert_eq!(Some(&b"kid"[..]), recipient.kid().unwrap());
        // 32 byte key plus the integrity block
        assert_eq!(40, recipient.encrypted_key.len());
        assert_eq!(Curve::P256, recipient.ephemeral_key().unwrap().curve());
        match structure.ciphertext {
            Ciphertext::Inline(c) => assert_eq!(7 + 16, c.len()),
            Ciphertext::Detached => panic!("ciphertext should be inline"),
        }
    }

    #[test]
    fn direct_agreement() {
        let mut rng = StdRng::seed_from_u64(1);
        let receiver = AsymmetricKeyPair::generate(Curve::P384, &mut rng);
        let context = KdfContext::new(SymmetricAlgorithm::A128Gcm, 128);
        let encryptor = Encryptor::new(
            KeyAgreement::EcdhEsHkdf256,
            ContentAlgorithm::A128Gcm,
        )
        .with_detached(true)
        .with_tag(false);
        let encrypted = encryptor
            .encrypt(&mut rng, receiver.public(), &context, b"payload")
            .unwrap();
        assert_eq!(Some(7 + 16), encrypted.detached.as_ref().map(Vec::len));

        let structure = cose::parse(&encrypted.structure, 8).unwrap();
        assert_eq!(Ciphertext::Detached, structure.ciphertext);
        assert!(structure.recipients[0].encrypted_key.is_empty());

        // Every recipient would need its own content key
        let other = AsymmetricKeyPair::generate(Curve::P384, &mut rng);
        assert!(matches!(
            encryptor.encrypt_for(
                &mut rng,
                &[(receiver.public(), None), (other.public(), None)],
                &context,
                b"payload"
            ),
            Err(Error::Structural(StructuralError::TooManyRecipients(2)))
        ));
    }

    #[test]
    fn unprotected_content() {
        let mut rng = StdRng::seed_from_u64(3);
        let receiver = AsymmetricKeyPair::generate(Curve::P256, &mut rng);
        let context = KdfContext::new(SymmetricAlgorithm::A128Cbc, 128);
        let encryptor = Encryptor::new(
            KeyAgreement::EcdhEsHkdf256,
            ContentAlgorithm::A128Cbc,
        );
        let encrypted = encryptor
            .encrypt(&mut rng, receiver.public(), &context, b"payload")
            .unwrap();

        let structure = cose::parse(&encrypted.structure, 8).unwrap();
        assert!(structure.protected_bytes.is_empty());
        assert_eq!(
            ContentAlgorithm::A128Cbc,
            structure.content_algorithm().unwrap()
        );
        assert_eq!(16, structure.iv(ContentAlgorithm::A128Cbc).unwrap().len());
        match structure.ciphertext {
            // One block, padded
            Ciphertext::Inline(c) => assert_eq!(16, c.len()),
            Ciphertext::Detached => panic!("ciphertext should be inline"),
        }

        assert!(matches!(
            encryptor.with_external_aad(b"digest").encrypt(
                &mut rng,
                receiver.public(),
                &context,
                b"payload"
            ),
            Err(Error::Structural(StructuralError::UnprotectedContent(_)))
        ));
    }

    #[test]
    fn context_mismatch() {
        let mut rng = StdRng::seed_from_u64(2);
        let receiver = AsymmetricKeyPair::generate(Curve::P256, &mut rng);
        let context = KdfContext::new(SymmetricAlgorithm::A128Kw, 128);
        let encryptor = Encryptor::new(
            KeyAgreement::EcdhEsA192Kw,
            ContentAlgorithm::A128Gcm,
        );
        let point = receiver.public();
        assert!(matches!(
            encryptor.encrypt(&mut rng, point, &context, b"payload"),
            Err(Error::Kdf(KdfError::AlgorithmMismatch {
                context: -3,
                recipient: -4
            }))
        ));
    }
}
