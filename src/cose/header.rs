//! COSE header maps.

use alloc::{string::String, vec::Vec};
use core::fmt;
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::cbor;

/// Header parameter `alg`.
pub const ALG: i64 = 1;
/// Header parameter `crit`.
pub const CRIT: i64 = 2;
/// Header parameter `kid`.
pub const KID: i64 = 4;
/// Header parameter `IV`.
pub const IV: i64 = 5;
/// Header parameter `Partial IV`.
pub const PARTIAL_IV: i64 = 6;
/// Header parameter `ephemeral key`.
pub const EPHEMERAL_KEY: i64 = -1;
/// Header parameters `PartyU identity`, `PartyU nonce`, `PartyU other`.
pub const PARTY_U: [i64; 3] = [-21, -22, -23];
/// Header parameters `PartyV identity`, `PartyV nonce`, `PartyV other`.
pub const PARTY_V: [i64; 3] = [-24, -25, -26];

/// A header label, which is either an integer or a text string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Label {
    Int(i64),
    Text(String),
}

/// The value of a header parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Bool(bool),
    Null,
    Array(Vec<HeaderValue>),
    Map(HeaderMap),
}

impl HeaderValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HeaderValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HeaderMap> {
        match self {
            HeaderValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// A header map, keeping its entries in the order they were inserted or
/// decoded.
///
/// Serialization always sorts the entries by the bytewise order of their
/// encoded labels, which is the deterministic encoding of RFC 8949.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(Label, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> HeaderMap {
        HeaderMap::default()
    }

    /// Inserts the value, replacing any previous value of the label.
    pub fn insert(&mut self, label: i64, value: HeaderValue) {
        match self.entries.iter_mut().find(|(l, _)| *l == Label::Int(label)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((Label::Int(label), value)),
        }
    }

    /// Builder flavor of [`HeaderMap::insert`].
    pub fn with(mut self, label: i64, value: HeaderValue) -> HeaderMap {
        self.insert(label, value);
        self
    }

    /// Removes the label and returns its value.
    pub fn remove(&mut self, label: i64) -> Option<HeaderValue> {
        let index = self
            .entries
            .iter()
            .position(|(l, _)| *l == Label::Int(label))?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, label: i64) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(l, _)| *l == Label::Int(label))
            .map(|(_, v)| v)
    }

    /// Returns the integer labels of this map.
    pub fn int_labels(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().filter_map(|(l, _)| match l {
            Label::Int(i) => Some(*i),
            Label::Text(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the encoding used inside a protected header bucket.
    ///
    /// An empty map is encoded as a zero-length byte string, not as an empty
    /// CBOR map.
    pub fn to_protected_bytes(&self) -> cbor::Result<Vec<u8>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        cbor::encode(self)
    }

    /// Parses the content of a protected header bucket.
    pub fn from_protected_bytes(
        bytes: &[u8],
        max_depth: usize,
    ) -> cbor::Result<HeaderMap> {
        if bytes.is_empty() {
            return Ok(HeaderMap::new());
        }
        cbor::decode(bytes, max_depth)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match self {
            Label::Int(i) => serializer.serialize_i64(*i),
            Label::Text(t) => serializer.serialize_str(t),
        }
    }
}

impl Serialize for HeaderValue {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match self {
            HeaderValue::Int(i) => serializer.serialize_i64(*i),
            HeaderValue::Bytes(b) => serializer.serialize_bytes(b),
            HeaderValue::Text(t) => serializer.serialize_str(t),
            HeaderValue::Bool(b) => serializer.serialize_bool(*b),
            HeaderValue::Null => serializer.serialize_unit(),
            HeaderValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HeaderValue::Map(map) => map.serialize(serializer),
        }
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        // Pair every entry with its encoded label to sort by it
        let mut sorted = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let key = cbor::encode(&entry.0)
                .map_err(<S::Error as serde::ser::Error>::custom)?;
            sorted.push((key, entry));
        }
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (_, (label, value)) in sorted {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

struct LabelVisitor;

impl<'de> Visitor<'de> for LabelVisitor {
    type Value = Label;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an integer or text label")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Label, E> {
        Ok(Label::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Label, E> {
        i64::try_from(v)
            .map(Label::Int)
            .map_err(|_| E::custom("label out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Label, E> {
        Ok(Label::Text(String::from(v)))
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Label, D::Error> {
        deserializer.deserialize_any(LabelVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = HeaderValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a header parameter value")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<HeaderValue, E> {
        i64::try_from(v)
            .map(HeaderValue::Int)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Bytes(v.to_vec()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Text(String::from(v)))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Bool(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<HeaderValue, E> {
        Ok(HeaderValue::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(
        self,
        mut seq: A,
    ) -> Result<HeaderValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }

        Ok(HeaderValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        map: A,
    ) -> Result<HeaderValue, A::Error> {
        MapVisitor.visit_map(map).map(HeaderValue::Map)
    }
}

impl<'de> Deserialize<'de> for HeaderValue {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HeaderValue, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct MapVisitor;

impl<'de> Visitor<'de> for MapVisitor {
    type Value = HeaderMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a header map")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> Result<HeaderMap, A::Error> {
        let mut entries: Vec<(Label, HeaderValue)> = Vec::new();
        while let Some((label, value)) = access.next_entry()? {
            // Duplicate keys make a map invalid in CBOR
            if entries.iter().any(|(l, _)| *l == label) {
                return Err(de::Error::custom("duplicate label"));
            }
            entries.push((label, value));
        }

        Ok(HeaderMap { entries })
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HeaderMap, D::Error> {
        deserializer.deserialize_map(MapVisitor)
    }
}
