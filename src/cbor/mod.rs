//! Helpful functionality around the `serde_cbor` crate.
//!
//! `serde_cbor` is lenient about what it accepts, so everything coming from
//! the outside passes [`check_canonical`] before it's deserialized.

use alloc::vec::Vec;
use core::{cmp, result};
use serde::{de::DeserializeOwned, Serialize};
use serde_cbor::{de, ser::Write, Serializer};

#[cfg_attr(tarpaulin, skip)]
mod error;
pub use error::CborError;

/// The result type for the `cbor` module.
pub type Result<T> = core::result::Result<T, CborError>;

/// The tag of a `COSE_Encrypt` structure.
pub const TAG_COSE_ENCRYPT: u64 = 96;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// Implements the `Write` trait from `serde_cbor` using a `Vec<u8>`.
///
/// It allocates when necessary, so can be used for data of any size,
/// unlike `SliceWrite`.
struct VecWrite {
    vec: Vec<u8>,
}

impl VecWrite {
    /// Constructs a new `VecWrite` based on a 128 byte `Vec<u8>`.
    pub fn new() -> VecWrite {
        VecWrite::with_capacity(128)
    }

    /// Constructs a new `VecWrite` based on a `Vec<u8>` of specified capacity.
    pub fn with_capacity(capacity: usize) -> VecWrite {
        VecWrite {
            vec: Vec::with_capacity(capacity),
        }
    }

    /// Returns the underlying vector.
    pub fn into_inner(self) -> Vec<u8> {
        self.vec
    }
}

impl Write for VecWrite {
    type Error = serde_cbor::Error;

    fn write_all(&mut self, buf: &[u8]) -> result::Result<(), Self::Error> {
        if self.vec.capacity() - self.vec.len() < buf.len() {
            // Allocate to make sure we have either at least 128 bytes free
            // space, or if what we're trying to insert is larger than that,
            // make room for it and 8 additional bytes (for later inserts).
            self.vec.reserve(cmp::max(128, buf.len() + 8));
        }
        self.vec.extend_from_slice(buf);

        Ok(())
    }
}

/// Serializes an object into CBOR.
pub fn encode(object: impl Serialize) -> Result<Vec<u8>> {
    let writer = VecWrite::new();
    let mut serializer = Serializer::new(writer);
    object.serialize(&mut serializer)?;

    Ok(serializer.into_inner().into_inner())
}

/// Prefixes an encoded data item with a tag.
pub fn tag(tag: u64, item: &[u8]) -> Result<Vec<u8>> {
    let mut writer = VecWrite::with_capacity(item.len() + 9);
    let initial = MAJOR_TAG << 5;
    match tag {
        0..=23 => writer.write_all(&[initial | tag as u8])?,
        24..=0xFF => writer.write_all(&[initial | 24, tag as u8])?,
        0x100..=0xFFFF => {
            writer.write_all(&[initial | 25])?;
            writer.write_all(&(tag as u16).to_be_bytes())?;
        }
        0x1_0000..=0xFFFF_FFFF => {
            writer.write_all(&[initial | 26])?;
            writer.write_all(&(tag as u32).to_be_bytes())?;
        }
        _ => {
            writer.write_all(&[initial | 27])?;
            writer.write_all(&tag.to_be_bytes())?;
        }
    }
    writer.write_all(item)?;

    Ok(writer.into_inner())
}

/// Deserializes a CBOR encoded object, after checking that the bytes hold
/// exactly one data item in preferred serialization.
///
/// # Arguments
/// * `bytes` - The encoded data item.
/// * `max_depth` - The deepest nesting of arrays and maps allowed.
pub fn decode<T>(bytes: &[u8], max_depth: usize) -> Result<T>
where
    T: DeserializeOwned,
{
    check_canonical(bytes, max_depth)?;
    // serde_cbor wants a mutable buffer for no_std deserialization
    let mut buf = bytes.to_vec();

    Ok(de::from_mut_slice(&mut buf)?)
}

/// Returns the bytes of the tagged item if `bytes` starts with the given tag,
/// otherwise the untouched input.
///
/// Any tag other than `expected` is an error.
pub fn untag(bytes: &[u8], expected: u64) -> Result<&[u8]> {
    let mut scanner = Scanner::new(bytes, 0);
    match bytes.first() {
        Some(b) if b >> 5 == MAJOR_TAG => {
            let head = scanner.head()?;
            match head.argument {
                Some(tag) if tag == expected => Ok(&bytes[scanner.pos..]),
                Some(tag) => Err(CborError::UnexpectedTag(tag)),
                None => Err(CborError::IndefiniteLength),
            }
        }
        _ => Ok(bytes),
    }
}

/// Checks that `bytes` consists of exactly one well-formed data item that
/// uses definite lengths and the shortest form for every argument.
///
/// Tags are not allowed anywhere in the item.
pub fn check_canonical(bytes: &[u8], max_depth: usize) -> Result<()> {
    let mut scanner = Scanner::new(bytes, max_depth);
    scanner.item(0)?;

    match bytes.len() - scanner.pos {
        0 => Ok(()),
        n => Err(CborError::TrailingBytes(n)),
    }
}

/// The initial byte of a data item and its argument.
#[derive(Debug)]
struct Head {
    major: u8,
    /// `None` for indefinite lengths and the break code.
    argument: Option<u64>,
}

/// Walks over the data items of a byte slice without decoding them.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    max_depth: usize,
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8], max_depth: usize) -> Scanner<'a> {
        Scanner {
            bytes,
            pos: 0,
            max_depth,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CborError::Truncated);
        }
        let taken = &self.bytes[self.pos..self.pos + n];
        self.pos += n;

        Ok(taken)
    }

    /// Reads an unsigned big-endian integer of `n` bytes.
    fn uint(&mut self, n: usize) -> Result<u64> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0, |acc, &b| (acc << 8) | u64::from(b)))
    }

    fn head(&mut self) -> Result<Head> {
        let initial = self.take(1)?[0];
        // The major type is in the three leftmost bits, the additional
        // information in the remaining five
        let major = initial >> 5;
        let info = initial & 0b000_11111;
        // Simple values and floats don't carry a length argument
        if major == MAJOR_SIMPLE {
            return self.simple_head(info);
        }

        let argument = match info {
            0..=23 => Some(u64::from(info)),
            24 => Some(self.minimal(1, 24)?),
            25 => Some(self.minimal(2, 0xFF)?),
            26 => Some(self.minimal(4, 0xFFFF)?),
            27 => Some(self.minimal(8, 0xFFFF_FFFF)?),
            28..=30 => return Err(CborError::Reserved(info)),
            _ => None,
        };

        Ok(Head { major, argument })
    }

    /// Reads an argument of `n` bytes that has to be larger than `floor`.
    fn minimal(&mut self, n: usize, floor: u64) -> Result<u64> {
        let value = self.uint(n)?;
        if (n == 1 && value < floor) || (n > 1 && value <= floor) {
            return Err(CborError::NonCanonical);
        }

        Ok(value)
    }

    fn simple_head(&mut self, info: u8) -> Result<Head> {
        let argument = match info {
            0..=23 => Some(u64::from(info)),
            // Simple values below 32 have to be encoded in the initial byte
            24 => Some(self.minimal(1, 32)?),
            // Half, single and double precision floats
            25 => Some(self.uint(2)?),
            26 => Some(self.uint(4)?),
            27 => Some(self.uint(8)?),
            28..=30 => return Err(CborError::Reserved(info)),
            _ => None,
        };

        Ok(Head {
            major: MAJOR_SIMPLE,
            argument,
        })
    }

    fn item(&mut self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(CborError::TooDeep);
        }
        let head = self.head()?;
        let argument = match (head.major, head.argument) {
            (MAJOR_SIMPLE, None) => return Err(CborError::UnexpectedBreak),
            (_, None) => return Err(CborError::IndefiniteLength),
            (_, Some(argument)) => argument,
        };

        match head.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE | MAJOR_SIMPLE => Ok(()),
            MAJOR_BYTES | MAJOR_TEXT => {
                self.take(self.length(argument)?)?;
                Ok(())
            }
            MAJOR_ARRAY => {
                for _ in 0..self.length(argument)? {
                    self.item(depth + 1)?;
                }
                Ok(())
            }
            MAJOR_MAP => {
                // Every pair takes at least two bytes
                let pairs = self.length(argument)?;
                if pairs > self.remaining() / 2 {
                    return Err(CborError::Truncated);
                }
                for _ in 0..pairs * 2 {
                    self.item(depth + 1)?;
                }
                Ok(())
            }
            _ => Err(CborError::UnexpectedTag(argument)),
        }
    }

    /// Converts a length argument, making sure it could fit the input.
    ///
    /// Every item takes at least one byte, so no length larger than the
    /// number of remaining bytes can be valid.
    fn length(&self, argument: u64) -> Result<usize> {
        match usize::try_from(argument) {
            Ok(n) if n <= self.remaining() => Ok(n),
            _ => Err(CborError::Truncated),
        }
    }
}
