use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};


/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a field inside form data, such as `tags[0]` or `address.street`.
///
/// The empty path refers to the whole form.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Segment>);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty segment at offset {0}")]
    EmptySegment(usize),
    #[error("unterminated index at offset {0}")]
    UnterminatedIndex(usize),
    #[error("invalid index `{0}`")]
    InvalidIndex(String),
    #[error("expected `.` or `[` at offset {0}")]
    MissingSeparator(usize),
}

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses dotted keys and bracketed indices.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let bytes = s.as_bytes();
        let mut segments = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'[' {
                let end = s[i..].find(']').ok_or(PathError::UnterminatedIndex(i))? + i;
                let text = &s[i + 1..end];
                let index = text
                    .parse::<usize>()
                    .map_err(|_| PathError::InvalidIndex(text.to_string()))?;
                segments.push(Segment::Index(index));
                i = end + 1;
                match bytes.get(i) {
                    None | Some(b'[') => {}
                    Some(b'.') => i = skip_dot(bytes, i)?,
                    Some(_) => return Err(PathError::MissingSeparator(i)),
                }
            } else {
                let end = s[i..].find(['.', '[']).map_or(s.len(), |n| n + i);
                if end == i {
                    return Err(PathError::EmptySegment(i));
                }
                segments.push(Segment::Key(s[i..end].to_string()));
                i = end;
                if bytes.get(i) == Some(&b'.') {
                    i = skip_dot(bytes, i)?;
                }
            }
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }
    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// Returns whether `self` equals `other` or lies below it.
    pub fn starts_with(&self, other: &FieldPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Reads the value at this path.
    ///
    /// A numeric key also addresses an array element, so `tags.0` and `tags[0]` agree.
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(value, |value, segment| match segment {
            Segment::Key(key) => match value {
                Value::Object(map) => map.get(key),
                Value::Array(items) => items.get(key.parse::<usize>().ok()?),
                _ => None,
            },
            Segment::Index(index) => value.as_array()?.get(*index),
        })
    }

    /// Writes `value` at this path, creating objects and arrays on the way.
    ///
    /// Arrays shorter than an index are padded with `null`.
    pub fn set(&self, target: &mut Value, value: Value) {
        let mut slot = target;
        for segment in &self.0 {
            slot = match segment {
                Segment::Key(key) => object_mut(slot).entry(key.clone()).or_insert(Value::Null),
                Segment::Index(index) => {
                    let items = array_mut(slot);
                    if items.len() <= *index {
                        items.resize(*index + 1, Value::Null);
                    }
                    &mut items[*index]
                }
            };
        }
        *slot = value;
    }
}

fn skip_dot(bytes: &[u8], i: usize) -> Result<usize, PathError> {
    let next = i + 1;
    if next == bytes.len() {
        Err(PathError::EmptySegment(next))
    } else {
        Ok(next)
    }
}

fn object_mut(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
fn array_mut(slot: &mut Value) -> &mut Vec<Value> {
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!(),
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
impl FromStr for FieldPath {
    type Err = PathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
impl From<Vec<Segment>> for FieldPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}
impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Values accepted wherever a field path is expected.
pub trait IntoFieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError>;
}
impl IntoFieldPath for &str {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        FieldPath::parse(self)
    }
}
impl IntoFieldPath for &String {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        FieldPath::parse(self)
    }
}
impl IntoFieldPath for FieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        Ok(self)
    }
}
impl IntoFieldPath for &FieldPath {
    fn into_field_path(self) -> Result<FieldPath, PathError> {
        Ok(self.clone())
    }
}
