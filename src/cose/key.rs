//! `COSE_Key` objects of type EC2 (RFC 9053 §7.1).

use core::convert::TryFrom;

use super::header::{HeaderMap, HeaderValue};
use crate::{
    algorithm::KeyAgreement,
    ecdh::AgreementError,
    error::StructuralError,
    key::{AsymmetricKeyPair, Curve, PublicPoint},
    Result,
};

const KTY: i64 = 1;
const KID: i64 = 2;
const ALG: i64 = 3;
const CRV: i64 = -1;
const X: i64 = -2;
const Y: i64 = -3;
const D: i64 = -4;

/// Key type EC2.
const KTY_EC2: i64 = 2;

fn int(key: &HeaderMap, label: i64, context: i64) -> Result<i64> {
    key.get(label)
        .and_then(HeaderValue::as_int)
        .ok_or_else(|| StructuralError::InvalidHeader(context).into())
}

fn bytes<'a>(key: &'a HeaderMap, label: i64, context: i64) -> Result<&'a [u8]> {
    key.get(label)
        .and_then(HeaderValue::as_bytes)
        .ok_or_else(|| StructuralError::InvalidHeader(context).into())
}

fn curve(key: &HeaderMap, context: i64) -> Result<Curve> {
    let kty = int(key, KTY, context)?;
    if kty != KTY_EC2 {
        return Err(AgreementError::UnsupportedKeyType(kty).into());
    }

    Ok(Curve::try_from(int(key, CRV, context)?)?)
}

/// Returns the public point of an EC2 key, which may use point compression.
///
/// # Arguments
/// * `key` - The key map.
/// * `context` - The header label the key was found under, used in errors.
pub fn decode_public(key: &HeaderMap, context: i64) -> Result<PublicPoint> {
    let curve = curve(key, context)?;
    let x = bytes(key, X, context)?;
    let point = match key.get(Y) {
        Some(HeaderValue::Bytes(y)) => {
            PublicPoint::from_coordinates(curve, x, y)
        }
        Some(HeaderValue::Bool(y_is_odd)) => {
            PublicPoint::from_compressed(curve, x, *y_is_odd)
        }
        _ => return Err(StructuralError::InvalidHeader(context).into()),
    }?;

    Ok(point)
}

/// Returns the `COSE_Key` map of a public point, with uncompressed
/// coordinates.
pub fn encode_public(point: &PublicPoint) -> HeaderMap {
    let (x, y) = point.coordinates();

    HeaderMap::new()
        .with(KTY, HeaderValue::Int(KTY_EC2))
        .with(CRV, HeaderValue::Int(point.curve().id()))
        .with(X, HeaderValue::Bytes(x))
        .with(Y, HeaderValue::Bytes(y))
}

/// Parses an encoded EC2 `COSE_Key` holding a private key.
///
/// The optional `kid` and `alg` of the key are kept, so the key is only
/// tried on matching recipients.
pub fn decode_key_pair(
    encoded: &[u8],
    max_depth: usize,
) -> Result<AsymmetricKeyPair> {
    let key: HeaderMap = crate::cbor::decode(encoded, max_depth)?;
    let curve = curve(&key, D)?;
    let d = bytes(&key, D, D)?;
    let pair = match key.get(X) {
        Some(_) => {
            let public = decode_public(&key, D)?;
            let (x, y) = public.coordinates();
            AsymmetricKeyPair::from_components(curve, &x, &y, d)?
        }
        None => AsymmetricKeyPair::from_secret(curve, d)?,
    };
    let pair = match key.get(KID) {
        Some(HeaderValue::Bytes(kid)) => pair.with_kid(kid),
        None => pair,
        Some(_) => return Err(StructuralError::InvalidHeader(KID).into()),
    };
    let pair = match key.get(ALG) {
        Some(HeaderValue::Int(alg)) => {
            pair.with_algorithm(KeyAgreement::try_from(*alg)?)
        }
        None => pair,
        Some(_) => return Err(StructuralError::InvalidHeader(ALG).into()),
    };

    Ok(pair)
}
