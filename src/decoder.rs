//! The decryption pipeline.
//!
//! A decode moves through the states
//! `StructureParsed -> RecipientSelected -> SecretAgreed -> KeyDerived ->
//! Unwrapped`, each a type of its own that is consumed by the transition to
//! the next one. Secrets held by a state are zeroized when it's consumed,
//! whether the transition succeeds or not.

use alloc::vec::Vec;
use log::{debug, trace};
use zeroize::Zeroizing;

use crate::{
    aead,
    algorithm::{ContentAlgorithm, KeyAgreement, Suite},
    content,
    cose::{self, EncryptionStructure, Recipient},
    ecdh::{self, SharedSecret},
    error::StructuralError,
    kdf::{self, DerivedKey, KdfContext, KdfError},
    key::{AsymmetricKeyPair, PublicPoint},
    key_wrap, Error, Result,
};

/// The explicit configuration of a [`Decoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Externally supplied data that is authenticated along with the
    /// protected header.
    pub external_aad: Vec<u8>,
    /// The largest number of recipients a structure may have.
    pub max_recipients: usize,
    /// The deepest nesting of CBOR arrays and maps accepted.
    pub max_depth: usize,
    /// Whether authentication failures are reported as
    /// [`Error::DecryptionFailed`].
    pub redact_errors: bool,
}

impl Default for DecoderConfig {
    fn default() -> DecoderConfig {
        DecoderConfig {
            external_aad: Vec::new(),
            max_recipients: 16,
            max_depth: 16,
            redact_errors: false,
        }
    }
}

impl DecoderConfig {
    pub fn with_external_aad(mut self, external_aad: &[u8]) -> DecoderConfig {
        self.external_aad = external_aad.to_vec();
        self
    }

    pub fn with_max_recipients(
        mut self,
        max_recipients: usize,
    ) -> DecoderConfig {
        self.max_recipients = max_recipients;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> DecoderConfig {
        self.max_depth = max_depth;
        self
    }

    pub fn with_redacted_errors(mut self) -> DecoderConfig {
        self.redact_errors = true;
        self
    }
}

/// Decrypts `COSE_Encrypt` structures with a fixed configuration.
///
/// It keeps no state between calls and can be shared between threads.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Decoder {
        Decoder { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the plaintext of an encrypted structure.
    ///
    /// The recipients are tried in order, and for every recipient the keys
    /// that are compatible with it, again in order. The first pair that
    /// decrypts wins. If there's no compatible pair,
    /// [`Error::NoMatchingRecipient`] is returned, otherwise the first
    /// failure. A recipient this crate can't use, because of its algorithm
    /// or its headers, has no compatible keys.
    ///
    /// # Arguments
    /// * `structure` - The encoded `COSE_Encrypt`, with or without tag.
    /// * `keys` - The key pairs of the receiver.
    /// * `context` - The configuration of the key derivation.
    /// * `detached` - The ciphertext, if it's not part of the structure.
    pub fn decode(
        &self,
        structure: &[u8],
        keys: &[AsymmetricKeyPair],
        context: &KdfContext,
        detached: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let result = self.run(structure, keys, context, detached);
        if self.config.redact_errors {
            result.map_err(Error::redacted)
        } else {
            result
        }
    }

    fn run(
        &self,
        structure: &[u8],
        keys: &[AsymmetricKeyPair],
        context: &KdfContext,
        detached: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        // The context doesn't depend on the structure, so check it first
        context.validate()?;
        let parsed = StructureParsed::new(&self.config, structure, detached)?;

        let mut failure = None;
        for (index, recipient) in parsed.structure.recipients.iter().enumerate()
        {
            let candidate = match Candidate::new(&parsed, recipient, context) {
                Ok(candidate) => candidate,
                Err(e) => {
                    debug!("Recipient {} is unusable: {}", index, e);
                    continue;
                }
            };

            for key in keys.iter().filter(|key| candidate.accepts(key)) {
                debug!("Trying recipient {} with {:?}", index, key);
                let plaintext = RecipientSelected {
                    parsed: &parsed,
                    candidate: &candidate,
                    key,
                }
                .agree()
                .and_then(SecretAgreed::derive)
                .and_then(KeyDerived::unwrap_key)
                .and_then(Unwrapped::decrypt);

                match plaintext {
                    Ok(plaintext) => {
                        debug!("Decrypted with recipient {}", index);
                        return Ok(plaintext);
                    }
                    Err(e) => {
                        debug!("Recipient {} failed: {}", index, e);
                        failure.get_or_insert(e);
                    }
                }
            }
        }

        Err(failure.unwrap_or(Error::NoMatchingRecipient))
    }
}

/// Returns the plaintext of an encrypted structure, using the default
/// configuration.
///
/// See [`Decoder::decode`].
pub fn decode(
    structure: &[u8],
    keys: &[AsymmetricKeyPair],
    context: &KdfContext,
    detached: Option<&[u8]>,
) -> Result<Vec<u8>> {
    Decoder::default().decode(structure, keys, context, detached)
}

/// The structure is well-formed and its content layer is usable.
struct StructureParsed<'a> {
    structure: EncryptionStructure,
    content: ContentAlgorithm,
    /// The encoded `Enc_structure`.
    aad: Vec<u8>,
    detached: Option<&'a [u8]>,
}

impl<'a> StructureParsed<'a> {
    fn new(
        config: &DecoderConfig,
        bytes: &[u8],
        detached: Option<&'a [u8]>,
    ) -> Result<StructureParsed<'a>> {
        let structure = cose::parse(bytes, config.max_depth)?;
        let recipients = structure.recipients.len();
        if recipients > config.max_recipients {
            return Err(StructuralError::TooManyRecipients(recipients).into());
        }
        let content = structure.content_algorithm()?;
        structure.iv(content)?;
        let payload = structure.payload(detached)?;
        content::check_ciphertext_len(content, payload.len())?;
        // Without AEAD nothing would authenticate these
        if !content.is_aead() {
            if !structure.protected_bytes.is_empty() {
                let e = StructuralError::UnprotectedContent("protected header");
                return Err(e.into());
            }
            if !config.external_aad.is_empty() {
                let e = StructuralError::UnprotectedContent("external AAD");
                return Err(e.into());
            }
        }
        let aad = aead::build_enc_structure(
            &structure.protected_bytes,
            &config.external_aad,
        )?;
        debug!(
            "Parsed structure with {:?} and {} recipients",
            content, recipients
        );

        Ok(StructureParsed {
            structure,
            content,
            aad,
            detached,
        })
    }
}

/// What's needed of a recipient to try keys on it.
struct Candidate<'a> {
    recipient: &'a Recipient,
    agreement: KeyAgreement,
    suite: Suite,
    kid: Option<&'a [u8]>,
    ephemeral: PublicPoint,
    /// The caller's context, completed with the recipient's headers.
    context: KdfContext,
}

impl<'a> Candidate<'a> {
    fn new(
        parsed: &StructureParsed,
        recipient: &'a Recipient,
        context: &KdfContext,
    ) -> Result<Candidate<'a>> {
        let agreement = recipient.algorithm()?;
        let suite = Suite::resolve(agreement, parsed.content);
        let derived = suite.derived_key_algorithm();
        if context.alg() != derived {
            return Err(KdfError::AlgorithmMismatch {
                context: context.alg().id(),
                recipient: derived.id(),
            }
            .into());
        }
        let direct = matches!(suite, Suite::EcdhEsHkdf { .. });
        if direct && !recipient.encrypted_key.is_empty() {
            return Err(StructuralError::Shape(
                "empty encrypted key for direct key agreement",
            )
            .into());
        }

        Ok(Candidate {
            recipient,
            agreement,
            suite,
            kid: recipient.kid()?,
            ephemeral: recipient.ephemeral_key()?,
            context: context.for_recipient(
                suite.prf(),
                &recipient.protected_bytes,
                recipient.party_u()?,
                recipient.party_v()?,
            ),
        })
    }

    /// Whether the key can be used with this recipient.
    fn accepts(&self, key: &AsymmetricKeyPair) -> bool {
        if key.curve() != self.ephemeral.curve() {
            trace!("Skipping {:?}, needs {}", key, self.ephemeral.curve());
            return false;
        }
        if let (Some(ours), Some(theirs)) = (key.kid(), self.kid) {
            if ours != theirs {
                trace!("Skipping {:?}, kid differs", key);
                return false;
            }
        }
        if let Some(alg) = key.algorithm() {
            if alg != self.agreement {
                trace!("Skipping {:?}, needs {:?}", key, self.agreement);
                return false;
            }
        }

        true
    }
}

/// A recipient and a compatible key were chosen.
struct RecipientSelected<'a> {
    parsed: &'a StructureParsed<'a>,
    candidate: &'a Candidate<'a>,
    key: &'a AsymmetricKeyPair,
}

impl<'a> RecipientSelected<'a> {
    fn agree(self) -> Result<SecretAgreed<'a>> {
        let secret = ecdh::agree(self.key, &self.candidate.ephemeral)?;
        trace!("Agreed on shared secret");

        Ok(SecretAgreed {
            selected: self,
            secret,
        })
    }
}

struct SecretAgreed<'a> {
    selected: RecipientSelected<'a>,
    secret: SharedSecret,
}

impl<'a> SecretAgreed<'a> {
    fn derive(self) -> Result<KeyDerived<'a>> {
        let candidate = self.selected.candidate;
        let key = kdf::derive_key(&self.secret, &candidate.context)?;
        trace!("Derived key for {:?}", candidate.suite);

        Ok(KeyDerived {
            selected: self.selected,
            key,
        })
    }
}

struct KeyDerived<'a> {
    selected: RecipientSelected<'a>,
    key: DerivedKey,
}

impl<'a> KeyDerived<'a> {
    /// Recovers the content key, which is the derived key itself for direct
    /// key agreement.
    fn unwrap_key(self) -> Result<Unwrapped<'a>> {
        let candidate = self.selected.candidate;
        let cek = match candidate.suite {
            Suite::EcdhEsHkdf { .. } => {
                Zeroizing::new(self.key.as_bytes().to_vec())
            }
            Suite::EcdhEsAesKw { .. } => key_wrap::unwrap(
                self.key.as_bytes(),
                &candidate.recipient.encrypted_key,
            )?,
        };
        let content = self.selected.parsed.content;
        if cek.len() != content.key_len() {
            return Err(StructuralError::InvalidKeyLength(cek.len()).into());
        }
        trace!("Recovered content key");

        Ok(Unwrapped {
            selected: self.selected,
            cek,
        })
    }
}

struct Unwrapped<'a> {
    selected: RecipientSelected<'a>,
    cek: Zeroizing<Vec<u8>>,
}

impl<'a> Unwrapped<'a> {
    fn decrypt(self) -> Result<Vec<u8>> {
        let parsed = self.selected.parsed;
        let iv = parsed.structure.iv(parsed.content)?;
        let ciphertext = parsed.structure.payload(parsed.detached)?;

        content::decrypt(parsed.content, &self.cek, iv, ciphertext, &parsed.aad)
    }
}
