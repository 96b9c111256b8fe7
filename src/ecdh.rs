//! ECDH-ES key agreement.

use alloc::vec::Vec;
use core::fmt;
use p256::elliptic_curve::{
    group::{Curve as _, Group},
    point::AffineCoordinates,
    CurveArithmetic, PublicKey, SecretKey,
};
#[cfg(feature = "std")]
use std::error;
use zeroize::{Zeroize, Zeroizing};

use crate::key::{AsymmetricKeyPair, Curve, PublicPoint, SecretScalar};

/// The x-coordinate of the agreed point, big-endian and of the fixed width
/// of the curve. Zeroized on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn from_bytes(bytes: &[u8]) -> SharedSecret {
        SharedSecret(Zeroizing::new(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SharedSecret({} bytes)", self.0.len())
    }
}

/// Computes the shared secret of our key pair and the peer's public point.
///
/// # Arguments
/// * `local` - Our static key pair.
/// * `remote` - The ephemeral public point of the sender.
pub fn agree(
    local: &AsymmetricKeyPair,
    remote: &PublicPoint,
) -> Result<SharedSecret, AgreementError> {
    match (local.secret(), remote) {
        (SecretScalar::P256(d), PublicPoint::P256(q)) => diffie_hellman(d, q),
        (SecretScalar::P384(d), PublicPoint::P384(q)) => diffie_hellman(d, q),
        _ => Err(AgreementError::CurveMismatch {
            local: local.curve(),
            remote: remote.curve(),
        }),
    }
}

fn diffie_hellman<C: CurveArithmetic>(
    secret: &SecretKey<C>,
    public: &PublicKey<C>,
) -> Result<SharedSecret, AgreementError> {
    let product = public.to_projective() * *secret.to_nonzero_scalar();
    // Can't happen for a valid point of prime order, but refuse to continue
    // with the point at infinity if it ever does
    if bool::from(product.is_identity()) {
        return Err(AgreementError::IdentityPoint);
    }
    let mut x = product.to_affine().x();
    let shared = SharedSecret::from_bytes(&x);
    x.as_mut_slice().zeroize();

    Ok(shared)
}

/// The ways key validation and agreement can fail.
#[derive(Debug, PartialEq, Eq)]
pub enum AgreementError {
    /// The curve identifier is unknown or not supported.
    UnsupportedCurve(i64),
    /// The COSE key type is not EC2.
    UnsupportedKeyType(i64),
    /// Our key and the peer's point are on different curves.
    CurveMismatch { local: Curve, remote: Curve },
    /// The point is not on the curve or has malformed coordinates.
    InvalidPoint,
    /// The private scalar is not in `[1, n - 1]`.
    InvalidScalar,
    /// The private scalar doesn't belong to the given public point.
    KeyMismatch,
    /// The agreement resulted in the point at infinity.
    IdentityPoint,
}

impl fmt::Display for AgreementError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AgreementError::UnsupportedCurve(crv) => {
                write!(f, "Curve {} unsupported", crv)
            }
            AgreementError::UnsupportedKeyType(kty) => {
                write!(f, "Key type {} unsupported", kty)
            }
            AgreementError::CurveMismatch { local, remote } => write!(
                f,
                "Key on {} can't agree with point on {}",
                local, remote
            ),
            AgreementError::InvalidPoint => write!(f, "Point not on curve"),
            AgreementError::InvalidScalar => {
                write!(f, "Private scalar out of range")
            }
            AgreementError::KeyMismatch => {
                write!(f, "Private scalar doesn't match public point")
            }
            AgreementError::IdentityPoint => {
                write!(f, "Agreement resulted in the point at infinity")
            }
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for AgreementError {}
