//! AES Key Wrap (RFC 3394) of content encryption keys.

use aes::{
    cipher::{
        consts::U16, generic_array::GenericArray, BlockDecrypt,
        BlockSizeUser, KeyInit,
    },
    Aes128, Aes192, Aes256,
};
use aes_kw::{KekAes128, KekAes192, KekAes256};
use alloc::vec::Vec;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::{error::StructuralError, Error, Result};

/// Size of a semiblock, the unit of AES Key Wrap.
const SEMIBLOCK: usize = 8;
/// The initial value of RFC 3394 §2.2.3.1.
const INTEGRITY_CHECK: [u8; SEMIBLOCK] = [0xA6; SEMIBLOCK];

fn check_wrapped_len(len: usize) -> Result<()> {
    // The integrity block plus at least one block of key
    if len % SEMIBLOCK != 0 || len < 2 * SEMIBLOCK {
        return Err(StructuralError::InvalidWrappedKeyLength(len).into());
    }
    Ok(())
}

/// Unwraps a key with the key encryption key `kek`, whose length of 16, 24
/// or 32 bytes selects A128KW, A192KW or A256KW.
///
/// A failed integrity check is reported as
/// [`Error::UnwrapAuthentication`], and nothing of the key is returned.
pub fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    check_wrapped_len(wrapped.len())?;
    let mut key = Zeroizing::new(vec![0; wrapped.len() - SEMIBLOCK]);
    match kek.len() {
        16 => unwrap_with::<Aes128>(kek, wrapped, &mut key)?,
        24 => unwrap_with::<Aes192>(kek, wrapped, &mut key)?,
        32 => unwrap_with::<Aes256>(kek, wrapped, &mut key)?,
        n => return Err(StructuralError::InvalidKeyLength(n).into()),
    }

    Ok(key)
}

/// The inverse rounds of RFC 3394 §2.2.2, writing the key data to `key`.
fn unwrap_with<C>(kek: &[u8], wrapped: &[u8], key: &mut [u8]) -> Result<()>
where
    C: BlockDecrypt + BlockSizeUser<BlockSize = U16> + KeyInit,
{
    let cipher = C::new_from_slice(kek)
        .map_err(|_| StructuralError::InvalidKeyLength(kek.len()))?;
    let n = key.len() / SEMIBLOCK;
    let mut a = [0; SEMIBLOCK];
    a.copy_from_slice(&wrapped[..SEMIBLOCK]);
    key.copy_from_slice(&wrapped[SEMIBLOCK..]);

    let mut block = Zeroizing::new([0; 2 * SEMIBLOCK]);
    for j in (0..6).rev() {
        for i in (1..=n).rev() {
            let t = ((n * j + i) as u64).to_be_bytes();
            let r = &mut key[(i - 1) * SEMIBLOCK..i * SEMIBLOCK];
            let msb = a.iter().zip(&t).map(|(a, t)| a ^ t);
            for (b, x) in block[..SEMIBLOCK].iter_mut().zip(msb) {
                *b = x;
            }
            block[SEMIBLOCK..].copy_from_slice(r);
            cipher.decrypt_block(GenericArray::from_mut_slice(&mut block[..]));
            a.copy_from_slice(&block[..SEMIBLOCK]);
            r.copy_from_slice(&block[SEMIBLOCK..]);
        }
    }

    if bool::from(a[..].ct_eq(&INTEGRITY_CHECK[..])) {
        Ok(())
    } else {
        key.zeroize();
        Err(Error::UnwrapAuthentication)
    }
}

/// Wraps `key` with the key encryption key `kek`.
pub fn wrap(kek: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    // Wrapping needs two blocks of key
    if key.len() % SEMIBLOCK != 0 || key.len() < 2 * SEMIBLOCK {
        let len = key.len() + SEMIBLOCK;
        return Err(StructuralError::InvalidWrappedKeyLength(len).into());
    }
    let mut wrapped = vec![0; key.len() + SEMIBLOCK];
    let result = match kek.len() {
        16 => KekAes128::new(GenericArray::from_slice(kek))
            .wrap(key, &mut wrapped),
        24 => KekAes192::new(GenericArray::from_slice(kek))
            .wrap(key, &mut wrapped),
        32 => KekAes256::new(GenericArray::from_slice(kek))
            .wrap(key, &mut wrapped),
        n => return Err(StructuralError::InvalidKeyLength(n).into()),
    };
    result.map_err(|_| StructuralError::InvalidKeyLength(key.len()))?;

    Ok(wrapped)
}
