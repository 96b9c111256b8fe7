//! EC2 key material.

use alloc::vec::Vec;
use core::{convert::TryFrom, fmt};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand_core::CryptoRngCore;

use crate::{algorithm::KeyAgreement, ecdh::AgreementError};

/// The named curves usable for ECDH-ES.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    P256,
    P384,
}

impl Curve {
    /// The COSE curve identifier.
    pub fn id(self) -> i64 {
        match self {
            Curve::P256 => 1,
            Curve::P384 => 2,
        }
    }

    /// The length of a coordinate or scalar in bytes, which is also the
    /// length of the shared secret.
    pub fn coordinate_len(self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
        }
    }
}

impl TryFrom<i64> for Curve {
    type Error = AgreementError;

    fn try_from(id: i64) -> Result<Curve, AgreementError> {
        match id {
            1 => Ok(Curve::P256),
            2 => Ok(Curve::P384),
            // P-521 and the OKP curves are valid, but not supported here
            _ => Err(AgreementError::UnsupportedCurve(id)),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Curve::P256 => f.write_str("P-256"),
            Curve::P384 => f.write_str("P-384"),
        }
    }
}

/// A validated public point on one of the supported curves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicPoint {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl PublicPoint {
    /// Returns the point with the given big-endian affine coordinates.
    ///
    /// Fails if a coordinate doesn't have the length of the curve, or if the
    /// point is not on the curve.
    pub fn from_coordinates(
        curve: Curve,
        x: &[u8],
        y: &[u8],
    ) -> Result<PublicPoint, AgreementError> {
        let len = curve.coordinate_len();
        if x.len() != len || y.len() != len {
            return Err(AgreementError::InvalidPoint);
        }

        let point = match curve {
            Curve::P256 => {
                let encoded = p256::EncodedPoint::from_affine_coordinates(
                    p256::FieldBytes::from_slice(x),
                    p256::FieldBytes::from_slice(y),
                    false,
                );
                let key: Option<p256::PublicKey> =
                    p256::PublicKey::from_encoded_point(&encoded).into();
                key.map(PublicPoint::P256)
            }
            Curve::P384 => {
                let encoded = p384::EncodedPoint::from_affine_coordinates(
                    p384::FieldBytes::from_slice(x),
                    p384::FieldBytes::from_slice(y),
                    false,
                );
                let key: Option<p384::PublicKey> =
                    p384::PublicKey::from_encoded_point(&encoded).into();
                key.map(PublicPoint::P384)
            }
        };

        point.ok_or(AgreementError::InvalidPoint)
    }

    /// Returns the point with the given x-coordinate and the sign bit of y,
    /// as sent in the compressed form of a `COSE_Key`.
    pub fn from_compressed(
        curve: Curve,
        x: &[u8],
        y_is_odd: bool,
    ) -> Result<PublicPoint, AgreementError> {
        if x.len() != curve.coordinate_len() {
            return Err(AgreementError::InvalidPoint);
        }
        // SEC1 compressed form: 0x02 or 0x03 depending on the sign, then x
        let mut sec1 = Vec::with_capacity(1 + x.len());
        sec1.push(if y_is_odd { 0x03 } else { 0x02 });
        sec1.extend_from_slice(x);

        match curve {
            Curve::P256 => p256::PublicKey::from_sec1_bytes(&sec1)
                .map(PublicPoint::P256)
                .map_err(|_| AgreementError::InvalidPoint),
            Curve::P384 => p384::PublicKey::from_sec1_bytes(&sec1)
                .map(PublicPoint::P384)
                .map_err(|_| AgreementError::InvalidPoint),
        }
    }

    pub fn curve(&self) -> Curve {
        match self {
            PublicPoint::P256(_) => Curve::P256,
            PublicPoint::P384(_) => Curve::P384,
        }
    }

    /// Returns the big-endian affine coordinates `(x, y)`.
    pub fn coordinates(&self) -> (Vec<u8>, Vec<u8>) {
        let sec1 = match self {
            PublicPoint::P256(key) => {
                key.to_encoded_point(false).as_bytes().to_vec()
            }
            PublicPoint::P384(key) => {
                key.to_encoded_point(false).as_bytes().to_vec()
            }
        };
        // Uncompressed SEC1 is the tag byte 0x04 followed by x and y
        let len = self.curve().coordinate_len();

        (sec1[1..=len].to_vec(), sec1[1 + len..].to_vec())
    }
}

/// The private scalar of a key pair, zeroized on drop by the curve crates.
#[derive(Clone)]
pub(crate) enum SecretScalar {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

/// An EC2 key pair, as held by the recipient of an encrypted payload.
#[derive(Clone)]
pub struct AsymmetricKeyPair {
    secret: SecretScalar,
    public: PublicPoint,
    kid: Option<Vec<u8>>,
    algorithm: Option<KeyAgreement>,
}

impl AsymmetricKeyPair {
    /// Builds a key pair from its `COSE_Key` components.
    ///
    /// # Arguments
    /// * `curve` - The named curve.
    /// * `x` - The big-endian x-coordinate of the public point.
    /// * `y` - The big-endian y-coordinate of the public point.
    /// * `d` - The big-endian private scalar, which has to be in
    ///   `[1, n - 1]` and belong to the public point.
    pub fn from_components(
        curve: Curve,
        x: &[u8],
        y: &[u8],
        d: &[u8],
    ) -> Result<AsymmetricKeyPair, AgreementError> {
        let public = PublicPoint::from_coordinates(curve, x, y)?;
        let pair = AsymmetricKeyPair::from_secret(curve, d)?;
        if pair.public != public {
            return Err(AgreementError::KeyMismatch);
        }

        Ok(pair)
    }

    /// Builds a key pair from the private scalar alone.
    pub fn from_secret(
        curve: Curve,
        d: &[u8],
    ) -> Result<AsymmetricKeyPair, AgreementError> {
        if d.len() != curve.coordinate_len() {
            return Err(AgreementError::InvalidScalar);
        }
        let secret = match curve {
            Curve::P256 => {
                p256::SecretKey::from_bytes(p256::FieldBytes::from_slice(d))
                    .map(SecretScalar::P256)
            }
            Curve::P384 => {
                p384::SecretKey::from_bytes(p384::FieldBytes::from_slice(d))
                    .map(SecretScalar::P384)
            }
        }
        .map_err(|_| AgreementError::InvalidScalar)?;

        Ok(AsymmetricKeyPair::from_scalar(secret))
    }

    /// Generates a fresh key pair on the given curve.
    pub fn generate(
        curve: Curve,
        rng: &mut impl CryptoRngCore,
    ) -> AsymmetricKeyPair {
        let secret = match curve {
            Curve::P256 => SecretScalar::P256(p256::SecretKey::random(rng)),
            Curve::P384 => SecretScalar::P384(p384::SecretKey::random(rng)),
        };

        AsymmetricKeyPair::from_scalar(secret)
    }

    fn from_scalar(secret: SecretScalar) -> AsymmetricKeyPair {
        let public = match &secret {
            SecretScalar::P256(d) => PublicPoint::P256(d.public_key()),
            SecretScalar::P384(d) => PublicPoint::P384(d.public_key()),
        };

        AsymmetricKeyPair {
            secret,
            public,
            kid: None,
            algorithm: None,
        }
    }

    /// Sets the key ID, which has to match the `kid` of a recipient for the
    /// key to be tried on it.
    pub fn with_kid(mut self, kid: &[u8]) -> AsymmetricKeyPair {
        self.kid = Some(kid.to_vec());
        self
    }

    /// Restricts the key to recipients using the given algorithm.
    pub fn with_algorithm(mut self, alg: KeyAgreement) -> AsymmetricKeyPair {
        self.algorithm = Some(alg);
        self
    }

    pub fn curve(&self) -> Curve {
        self.public.curve()
    }

    pub fn public(&self) -> &PublicPoint {
        &self.public
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.kid.as_deref()
    }

    pub fn algorithm(&self) -> Option<KeyAgreement> {
        self.algorithm
    }

    pub(crate) fn secret(&self) -> &SecretScalar {
        &self.secret
    }
}

impl fmt::Debug for AsymmetricKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AsymmetricKeyPair")
            .field("curve", &self.curve())
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_vectors::*;

    #[test]
    fn receiver_key() {
        let pair = AsymmetricKeyPair::from_components(
            Curve::P256,
            &RECEIVER_X,
            &RECEIVER_Y,
            &RECEIVER_D,
        )
        .unwrap();
        assert_eq!(Curve::P256, pair.curve());
        let (x, y) = pair.public().coordinates();
        assert_eq!(&RECEIVER_X[..], &x[..]);
        assert_eq!(&RECEIVER_Y[..], &y[..]);

        // The secret alone yields the same public point
        let derived = AsymmetricKeyPair::from_secret(Curve::P256, &RECEIVER_D)
            .unwrap();
        assert_eq!(pair.public(), derived.public());
    }

    #[test]
    fn mismatched_components() {
        let mut d = RECEIVER_D;
        d[31] ^= 0x01;
        assert_eq!(
            AgreementError::KeyMismatch,
            AsymmetricKeyPair::from_components(
                Curve::P256,
                &RECEIVER_X,
                &RECEIVER_Y,
                &d
            )
            .unwrap_err()
        );
    }

    #[test]
    fn off_curve_point() {
        let mut y = RECEIVER_Y;
        y[31] ^= 0x01;
        assert_eq!(
            AgreementError::InvalidPoint,
            PublicPoint::from_coordinates(Curve::P256, &RECEIVER_X, &y)
                .unwrap_err()
        );
        // Wrong coordinate length for the curve
        assert_eq!(
            AgreementError::InvalidPoint,
            PublicPoint::from_coordinates(Curve::P384, &RECEIVER_X, &RECEIVER_Y)
                .unwrap_err()
        );
    }

    #[test]
    fn scalar_range() {
        assert_eq!(
            AgreementError::InvalidScalar,
            AsymmetricKeyPair::from_secret(Curve::P256, &[0; 32]).unwrap_err()
        );
        // The group order n itself is out of range
        assert_eq!(
            AgreementError::InvalidScalar,
            AsymmetricKeyPair::from_secret(Curve::P256, &P256_ORDER)
                .unwrap_err()
        );
        assert_eq!(
            AgreementError::InvalidScalar,
            AsymmetricKeyPair::from_secret(Curve::P256, &RECEIVER_D[1..])
                .unwrap_err()
        );
    }

    #[test]
    fn compressed_point() {
        let full = PublicPoint::from_coordinates(
            Curve::P256,
            &RECEIVER_X,
            &RECEIVER_Y,
        )
        .unwrap();
        let y_is_odd = RECEIVER_Y[31] & 1 == 1;
        let compressed =
            PublicPoint::from_compressed(Curve::P256, &RECEIVER_X, y_is_odd)
                .unwrap();
        assert_eq!(full, compressed);
        let other =
            PublicPoint::from_compressed(Curve::P256, &RECEIVER_X, !y_is_odd)
                .unwrap();
        assert_ne!(full, other);
    }

    #[test]
    fn curve_ids() {
        assert_eq!(Curve::P256, Curve::try_from(1).unwrap());
        assert_eq!(Curve::P384, Curve::try_from(2).unwrap());
        assert_eq!(
            AgreementError::UnsupportedCurve(3),
            Curve::try_from(3).unwrap_err()
        );
    }

    #[test]
    fn generated_p384() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(384);
        let pair = AsymmetricKeyPair::generate(Curve::P384, &mut rng)
            .with_kid(b"kid-384");
        let (x, y) = pair.public().coordinates();
        assert_eq!(48, x.len());
        assert_eq!(
            pair.public(),
            &PublicPoint::from_coordinates(Curve::P384, &x, &y).unwrap()
        );
        assert_eq!(Some(&b"kid-384"[..]), pair.kid());
    }
}
