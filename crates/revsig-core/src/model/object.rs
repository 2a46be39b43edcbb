//! Object-graph node types.
//!
//! `PdfObject` is a closed tagged variant. Everything that walks or compares the
//! graph matches on it exhaustively, so adding a node kind is a compile error
//! everywhere that needs to learn about it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::errors::{RevsigError, RevsigResult};

#[cfg(feature = "json")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable `(object number, generation number)` identity of an indirect object.
///
/// Identities are compared across snapshots purely by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjRef {
    pub num: u32,
    pub gen: u16,
}

impl ObjRef {
    /// Highest generation number a cross-reference entry can carry.
    pub const MAX_GENERATION: u16 = 65535;

    pub const fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }

    /// The `0 65535` head of the free list, present in every cross-reference table.
    pub fn is_max_generation_sentinel(&self) -> bool {
        self.num == 0 && self.gen == Self::MAX_GENERATION
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

impl FromStr for ObjRef {
    type Err = RevsigError;

    /// Accepts `"5 0 R"` and `"5 0"`.
    fn from_str(s: &str) -> RevsigResult<Self> {
        let mut parts = s.split_whitespace();
        let num = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| RevsigError::invalid_argument(format!("invalid object number in {s:?}")))?;
        let gen = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(|| RevsigError::invalid_argument(format!("invalid generation in {s:?}")))?;
        match parts.next() {
            None | Some("R") => {}
            Some(other) => {
                return Err(RevsigError::invalid_argument(format!(
                    "unexpected token {other:?} in reference {s:?}"
                )))
            }
        }
        if parts.next().is_some() {
            return Err(RevsigError::invalid_argument(format!("trailing tokens in reference {s:?}")));
        }
        Ok(Self { num, gen })
    }
}

#[cfg(feature = "json")]
impl Serialize for ObjRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "json")]
impl<'de> Deserialize<'de> for ObjRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Structural kind of a node, used for the "kinds must match" rule.
///
/// Integers and reals share the `Number` kind; they compare by numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Null,
    Bool,
    Number,
    Text,
    Name,
    Array,
    Dict,
    Stream,
    Ref,
}

/// A node of the object graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
pub enum PdfObject {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Name(String),
    Array(Vec<PdfObject>),
    Dict(Dictionary),
    Stream(Stream),
    Ref(ObjRef),
}

impl PdfObject {
    pub fn name(n: impl Into<String>) -> Self {
        Self::Name(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Null => ObjectKind::Null,
            Self::Bool(_) => ObjectKind::Bool,
            Self::Int(_) | Self::Real(_) => ObjectKind::Number,
            Self::Text(_) => ObjectKind::Text,
            Self::Name(_) => ObjectKind::Name,
            Self::Array(_) => ObjectKind::Array,
            Self::Dict(_) => ObjectKind::Dict,
            Self::Stream(_) => ObjectKind::Stream,
            Self::Ref(_) => ObjectKind::Ref,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an `Int` or `Real`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<ObjRef> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Dictionary of a `Dict` or the dictionary part of a `Stream`.
    pub fn dict_part(&self) -> Option<&Dictionary> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Collect every reference reachable without leaving this object.
    pub fn direct_refs(&self, out: &mut Vec<ObjRef>) {
        match self {
            Self::Ref(r) => out.push(*r),
            Self::Array(items) => items.iter().for_each(|i| i.direct_refs(out)),
            Self::Dict(d) => d.values().for_each(|v| v.direct_refs(out)),
            Self::Stream(s) => s.dict.values().for_each(|v| v.direct_refs(out)),
            Self::Null
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Real(_)
            | Self::Text(_)
            | Self::Name(_) => {}
        }
    }
}

impl From<Dictionary> for PdfObject {
    fn from(d: Dictionary) -> Self {
        Self::Dict(d)
    }
}

impl From<ObjRef> for PdfObject {
    fn from(r: ObjRef) -> Self {
        Self::Ref(r)
    }
}

impl From<i64> for PdfObject {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for PdfObject {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(items: Vec<PdfObject>) -> Self {
        Self::Array(items)
    }
}

/// Unordered key/value node. Key order never matters for equality.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
pub struct Dictionary(BTreeMap<String, PdfObject>);

impl Dictionary {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Dictionary with a `/Type` entry.
    pub fn typed(type_name: &str) -> Self {
        Self::new().with(crate::names::TYPE, PdfObject::name(type_name))
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PdfObject>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Copy of this dictionary with the given keys stripped.
    pub fn without(&self, keys: &[&str]) -> Self {
        let mut copy = self.clone();
        for k in keys {
            copy.0.remove(*k);
        }
        copy
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PdfObject>) -> Option<PdfObject> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<PdfObject> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PdfObject> {
        self.0.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PdfObject)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &PdfObject> {
        self.0.values()
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfObject::as_name)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfObject::as_text)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PdfObject::as_int)
    }

    pub fn get_ref(&self, key: &str) -> Option<ObjRef> {
        self.get(key).and_then(PdfObject::as_ref_id)
    }

    /// Direct dictionary value (does not follow references).
    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(PdfObject::as_dict)
    }

    /// Direct array value (does not follow references).
    pub fn get_array(&self, key: &str) -> Option<&[PdfObject]> {
        self.get(key).and_then(PdfObject::as_array)
    }

    /// True when `/Type` equals `type_name`.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.get_name(crate::names::TYPE) == Some(type_name)
    }
}

impl FromIterator<(String, PdfObject)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, PdfObject)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Dictionary plus raw, undecoded bytes.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
pub struct Stream {
    pub dict: Dictionary,
    #[cfg_attr(feature = "json", serde(with = "hex_bytes"))]
    pub data: Bytes,
}

impl Stream {
    pub fn new(dict: Dictionary, data: impl Into<Bytes>) -> Self {
        Self {
            dict,
            data: data.into(),
        }
    }
}

#[cfg(feature = "json")]
mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map(Bytes::from).map_err(serde::de::Error::custom)
    }
}
