//! Encryption of the content layer.
//!
//! AEAD algorithms are handed to [`aead`](crate::aead). AES-CTR and AES-CBC
//! (RFC 9459) provide neither integrity nor authentication of additional
//! data, so with them a payload is only as trustworthy as the channel it
//! came through.

use aes::{Aes128, Aes192, Aes256};
use alloc::vec::Vec;
use cbc::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    StreamCipher,
};

use crate::{
    aead, algorithm::ContentAlgorithm, error::StructuralError, Error, Result,
};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes192Ctr = ctr::Ctr128BE<Aes192>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Size of an AES block, and of the padding CBC adds at most.
const BLOCK: usize = 16;

/// Checks that a ciphertext of `len` bytes can be decrypted with `alg`.
pub fn check_ciphertext_len(alg: ContentAlgorithm, len: usize) -> Result<()> {
    match alg {
        ContentAlgorithm::A128Cbc
        | ContentAlgorithm::A192Cbc
        | ContentAlgorithm::A256Cbc => {
            // There's always at least one byte of padding
            if len < BLOCK {
                return Err(StructuralError::CiphertextTooShort(len).into());
            }
            if len % BLOCK != 0 {
                let e = StructuralError::InvalidCiphertextLength(len);
                return Err(e.into());
            }
        }
        _ if len < alg.tag_len() => {
            return Err(StructuralError::CiphertextTooShort(len).into());
        }
        _ => (),
    }
    Ok(())
}

fn check_inputs(alg: ContentAlgorithm, key: &[u8], iv: &[u8]) -> Result<()> {
    if key.len() != alg.key_len() {
        return Err(StructuralError::InvalidKeyLength(key.len()).into());
    }
    if iv.len() != alg.nonce_len() {
        return Err(StructuralError::InvalidIvLength(iv.len()).into());
    }
    Ok(())
}

/// Decrypts the content. The AAD is only used by AEAD algorithms.
///
/// A bad CBC padding is reported as [`Error::InvalidPadding`].
pub fn decrypt(
    alg: ContentAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    if alg.is_aead() {
        return aead::decrypt(alg, key, iv, ciphertext, aad);
    }
    check_inputs(alg, key, iv)?;
    check_ciphertext_len(alg, ciphertext.len())?;

    match alg {
        ContentAlgorithm::A128Ctr => {
            apply_ctr::<Aes128Ctr>(key, iv, ciphertext)
        }
        ContentAlgorithm::A192Ctr => {
            apply_ctr::<Aes192Ctr>(key, iv, ciphertext)
        }
        ContentAlgorithm::A256Ctr => {
            apply_ctr::<Aes256Ctr>(key, iv, ciphertext)
        }
        ContentAlgorithm::A128Cbc => {
            cbc_decrypt::<cbc::Decryptor<Aes128>>(key, iv, ciphertext)
        }
        ContentAlgorithm::A192Cbc => {
            cbc_decrypt::<cbc::Decryptor<Aes192>>(key, iv, ciphertext)
        }
        ContentAlgorithm::A256Cbc => {
            cbc_decrypt::<cbc::Decryptor<Aes256>>(key, iv, ciphertext)
        }
        alg => Err(Error::UnsupportedAlgorithm(alg.id())),
    }
}

/// Encrypts the content. The AAD is only used by AEAD algorithms.
pub fn encrypt(
    alg: ContentAlgorithm,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    if alg.is_aead() {
        return aead::encrypt(alg, key, iv, plaintext, aad);
    }
    check_inputs(alg, key, iv)?;

    match alg {
        ContentAlgorithm::A128Ctr => apply_ctr::<Aes128Ctr>(key, iv, plaintext),
        ContentAlgorithm::A192Ctr => apply_ctr::<Aes192Ctr>(key, iv, plaintext),
        ContentAlgorithm::A256Ctr => apply_ctr::<Aes256Ctr>(key, iv, plaintext),
        ContentAlgorithm::A128Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes128>>(key, iv, plaintext)
        }
        ContentAlgorithm::A192Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes192>>(key, iv, plaintext)
        }
        ContentAlgorithm::A256Cbc => {
            cbc_encrypt::<cbc::Encryptor<Aes256>>(key, iv, plaintext)
        }
        alg => Err(Error::UnsupportedAlgorithm(alg.id())),
    }
}

/// Applies the keystream, which is the same operation in both directions.
fn apply_ctr<C: KeyIvInit + StreamCipher>(
    key: &[u8],
    iv: &[u8],
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut cipher = C::new_from_slices(key, iv)
        .map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;
    let mut buffer = data.to_vec();
    cipher.apply_keystream(&mut buffer);

    Ok(buffer)
}

fn cbc_decrypt<C: KeyIvInit + BlockDecryptMut>(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;
    let mut buffer = ciphertext.to_vec();
    let len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| Error::InvalidPadding)?
        .len();
    buffer.truncate(len);

    Ok(buffer)
}

fn cbc_encrypt<C: KeyIvInit + BlockEncryptMut>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = C::new_from_slices(key, iv)
        .map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;
    let capacity = plaintext.len() + BLOCK;
    let mut buffer = vec![0; capacity];
    buffer[..plaintext.len()].copy_from_slice(plaintext);
    let len = cipher
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        // The buffer always has room for a full block of padding
        .map_err(|_| StructuralError::InvalidCiphertextLength(capacity))?
        .len();
    buffer.truncate(len);

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    // NIST SP 800-38A F.5.1 and F.2.1, first two blocks
    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const COUNTER: [u8; 16] = hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
    const IV: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");
    const PLAINTEXT: [u8; 32] = hex!(
        "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51"
    );
    const CTR_CIPHERTEXT: [u8; 32] = hex!(
        "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff"
    );
    const CBC_CIPHERTEXT: [u8; 32] = hex!(
        "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
    );

    #[test]
    fn ctr_vectors() {
        let alg = ContentAlgorithm::A128Ctr;
        assert_eq!(
            &CTR_CIPHERTEXT[..],
            &encrypt(alg, &KEY, &COUNTER, &PLAINTEXT, &[]).unwrap()[..]
        );
        assert_eq!(
            &PLAINTEXT[..],
            &decrypt(alg, &KEY, &COUNTER, &CTR_CIPHERTEXT, &[]).unwrap()[..]
        );
        // No expansion, and any length works
        assert_eq!(
            &PLAINTEXT[..5],
            &decrypt(alg, &KEY, &COUNTER, &CTR_CIPHERTEXT[..5], &[])
                .unwrap()[..]
        );
    }

    #[test]
    fn cbc_padding() {
        let alg = ContentAlgorithm::A128Cbc;
        let ciphertext = encrypt(alg, &KEY, &IV, &PLAINTEXT, &[]).unwrap();
        // A whole block of padding after block aligned plaintext
        assert_eq!(48, ciphertext.len());
        assert_eq!(&CBC_CIPHERTEXT[..], &ciphertext[..32]);
        assert_eq!(
            &PLAINTEXT[..],
            &decrypt(alg, &KEY, &IV, &ciphertext, &[]).unwrap()[..]
        );

        let ciphertext = encrypt(alg, &KEY, &IV, b"firmware", &[]).unwrap();
        assert_eq!(16, ciphertext.len());
        assert_eq!(
            b"firmware",
            &decrypt(alg, &KEY, &IV, &ciphertext, &[]).unwrap()[..]
        );

        // The vector has no padding
        assert!(matches!(
            decrypt(alg, &KEY, &IV, &CBC_CIPHERTEXT, &[]),
            Err(Error::InvalidPadding)
        ));
    }

    #[test]
    fn wider_keys() {
        let key = [0x42; 32];
        let iv = [0x24; 16];
        for alg in &[
            ContentAlgorithm::A192Ctr,
            ContentAlgorithm::A256Ctr,
            ContentAlgorithm::A192Cbc,
            ContentAlgorithm::A256Cbc,
        ] {
            let key = &key[..alg.key_len()];
            let ciphertext =
                encrypt(*alg, key, &iv, b"firmware image", &[]).unwrap();
            assert_ne!(&b"firmware image"[..], &ciphertext[..14]);
            assert_eq!(
                b"firmware image",
                &decrypt(*alg, key, &iv, &ciphertext, &[]).unwrap()[..]
            );
        }
    }

    #[test]
    fn lengths() {
        let alg = ContentAlgorithm::A128Cbc;
        assert!(matches!(
            decrypt(alg, &KEY, &IV, &CBC_CIPHERTEXT[..20], &[]),
            Err(Error::Structural(
                StructuralError::InvalidCiphertextLength(20)
            ))
        ));
        assert!(matches!(
            decrypt(alg, &KEY, &IV, &[], &[]),
            Err(Error::Structural(StructuralError::CiphertextTooShort(0)))
        ));
        assert!(matches!(
            decrypt(alg, &KEY, &IV[..12], &CBC_CIPHERTEXT, &[]),
            Err(Error::Structural(StructuralError::InvalidIvLength(12)))
        ));
        assert!(matches!(
            decrypt(ContentAlgorithm::A256Ctr, &KEY, &IV, &[], &[]),
            Err(Error::Structural(StructuralError::InvalidKeyLength(16)))
        ));
        assert!(decrypt(ContentAlgorithm::A128Ctr, &KEY, &IV, &[], &[])
            .unwrap()
            .is_empty());
    }
}
