//! AES-GCM content encryption with the COSE `Enc_structure` as AAD.

use aes_gcm::{
    aead::{consts::U12, generic_array::GenericArray, Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, AesGcm,
};
use alloc::vec::Vec;
use serde_bytes::Bytes;

use crate::{
    algorithm::ContentAlgorithm, cbor, error::StructuralError, Error, Result,
};

type Aes192Gcm = AesGcm<aes::Aes192, U12>;

/// The context string of the `Enc_structure` of a `COSE_Encrypt`.
const CONTEXT: &str = "Encrypt";

/// Returns the CBOR encoding of the `Enc_structure`
/// `["Encrypt", protected, external_aad]`, which is the AAD of the AEAD.
pub fn build_enc_structure(
    protected: &[u8],
    external_aad: &[u8],
) -> Result<Vec<u8>> {
    Ok(cbor::encode((
        CONTEXT,
        Bytes::new(protected),
        Bytes::new(external_aad),
    ))?)
}

fn check_inputs(alg: ContentAlgorithm, key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != alg.key_len() {
        return Err(StructuralError::InvalidKeyLength(key.len()).into());
    }
    if nonce.len() != alg.nonce_len() {
        return Err(StructuralError::InvalidIvLength(nonce.len()).into());
    }
    Ok(())
}

/// Decrypts and authenticates `ciphertext`, which ends with the tag.
///
/// On a tag mismatch [`Error::AeadAuthentication`] is returned and no part
/// of the plaintext is released.
pub fn decrypt(
    alg: ContentAlgorithm,
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    check_inputs(alg, key, nonce)?;
    if ciphertext.len() < alg.tag_len() {
        let len = ciphertext.len();
        return Err(StructuralError::CiphertextTooShort(len).into());
    }

    match alg {
        ContentAlgorithm::A128Gcm => {
            open::<Aes128Gcm>(key, nonce, ciphertext, aad)
        }
        ContentAlgorithm::A192Gcm => {
            open::<Aes192Gcm>(key, nonce, ciphertext, aad)
        }
        ContentAlgorithm::A256Gcm => {
            open::<Aes256Gcm>(key, nonce, ciphertext, aad)
        }
        alg => Err(Error::UnsupportedAlgorithm(alg.id())),
    }
}

/// Encrypts `plaintext` and appends the tag.
pub fn encrypt(
    alg: ContentAlgorithm,
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    check_inputs(alg, key, nonce)?;

    match alg {
        ContentAlgorithm::A128Gcm => {
            seal::<Aes128Gcm>(key, nonce, plaintext, aad)
        }
        ContentAlgorithm::A192Gcm => {
            seal::<Aes192Gcm>(key, nonce, plaintext, aad)
        }
        ContentAlgorithm::A256Gcm => {
            seal::<Aes256Gcm>(key, nonce, plaintext, aad)
        }
        alg => Err(Error::UnsupportedAlgorithm(alg.id())),
    }
}

fn open<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;
    cipher
        .decrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::AeadAuthentication)
}

fn seal<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = C::new_from_slice(key)
        .map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;
    cipher
        .encrypt(
            GenericArray::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        // Only fails for plaintexts beyond the GCM limit of 64 GiB
        .map_err(|_| {
            StructuralError::CiphertextTooShort(plaintext.len()).into()
        })
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    // Test cases 1, 2, 7 and 13 of the GCM specification
    const ZERO: [u8; 32] = [0; 32];
    const TAG_1: [u8; 16] = hex!("58e2fccefa7e3061367f1d57a4e7455a");
    const CIPHERTEXT_2: [u8; 32] = hex!(
        "0388dace60b6a392f328c2b971b2fe78ab6e47d42cec13bdf53a67b21257bddf"
    );
    const TAG_7: [u8; 16] = hex!("cd33b28ac773f74ba00ed1f312572435");
    const TAG_13: [u8; 16] = hex!("530f8afbc74536b9a963b4f1c4cb738b");

    #[test]
    fn gcm_vectors() {
        let alg = ContentAlgorithm::A128Gcm;
        assert_eq!(
            &TAG_1[..],
            &encrypt(alg, &ZERO[..16], &ZERO[..12], &[], &[]).unwrap()[..]
        );
        let (key, nonce) = (&ZERO[..16], &ZERO[..12]);
        assert_eq!(
            &CIPHERTEXT_2[..],
            &encrypt(alg, key, nonce, &ZERO[..16], &[]).unwrap()[..]
        );
        assert_eq!(
            &ZERO[..16],
            &decrypt(alg, key, nonce, &CIPHERTEXT_2, &[]).unwrap()[..]
        );

        let alg = ContentAlgorithm::A192Gcm;
        assert_eq!(
            &TAG_7[..],
            &encrypt(alg, &ZERO[..24], &ZERO[..12], &[], &[]).unwrap()[..]
        );
        let alg = ContentAlgorithm::A256Gcm;
        assert_eq!(
            &TAG_13[..],
            &encrypt(alg, &ZERO, &ZERO[..12], &[], &[]).unwrap()[..]
        );
        assert!(decrypt(alg, &ZERO, &ZERO[..12], &TAG_13, &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn enc_structure() {
        // ["Encrypt", h'A10101', h'']
        assert_eq!(
            &hex!("83 67 456E6372797074 43 A10101 40")[..],
            &build_enc_structure(&hex!("A10101"), &[]).unwrap()[..]
        );
    }

    #[test]
    fn tampered_aad() {
        let alg = ContentAlgorithm::A128Gcm;
        let key = [0x5A; 16];
        let nonce = [0xA5; 12];
        let protected = hex!("A10101");
        let external = b"external";
        let aad = build_enc_structure(&protected, external).unwrap();
        let ciphertext =
            encrypt(alg, &key, &nonce, b"firmware", &aad).unwrap();

        for i in 0..protected.len() {
            let mut tampered = protected;
            tampered[i] ^= 0x01;
            let aad = build_enc_structure(&tampered, external).unwrap();
            assert!(matches!(
                decrypt(alg, &key, &nonce, &ciphertext, &aad),
                Err(Error::AeadAuthentication)
            ));
        }
        for i in 0..external.len() {
            let mut tampered = *external;
            tampered[i] ^= 0x01;
            let aad = build_enc_structure(&protected, &tampered).unwrap();
            assert!(matches!(
                decrypt(alg, &key, &nonce, &ciphertext, &aad),
                Err(Error::AeadAuthentication)
            ));
        }
    }

    #[test]
    fn invalid_inputs() {
        let alg = ContentAlgorithm::A128Gcm;
        assert!(matches!(
            decrypt(alg, &ZERO, &ZERO[..12], &CIPHERTEXT_2, &[]),
            Err(Error::Structural(StructuralError::InvalidKeyLength(32)))
        ));
        assert!(matches!(
            decrypt(alg, &ZERO[..16], &ZERO[..13], &CIPHERTEXT_2, &[]),
            Err(Error::Structural(StructuralError::InvalidIvLength(13)))
        ));
        assert!(matches!(
            decrypt(alg, &ZERO[..16], &ZERO[..12], &TAG_1[..15], &[]),
            Err(Error::Structural(StructuralError::CiphertextTooShort(15)))
        ));
        // Modes without authentication aren't handled here
        let alg = ContentAlgorithm::A128Ctr;
        assert!(matches!(
            decrypt(alg, &ZERO[..16], &ZERO[..16], &TAG_1, &[]),
            Err(Error::UnsupportedAlgorithm(-65534))
        ));
    }
}
