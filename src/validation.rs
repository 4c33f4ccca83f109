use std::{
    collections::{btree_map, hash_map::DefaultHasher, BTreeMap},
    hash::{Hash, Hasher},
};

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{FieldPath, IntoFieldPath};

#[cfg(test)]
mod tests;

/// Error messages per field, in the order the validator reported them.
///
/// A field without an entry, or with an empty entry, has no errors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<FieldPath, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the messages for `path`, or `None` if the field has no errors.
    pub fn get(&self, path: impl IntoFieldPath) -> Option<&[String]> {
        let path = path.into_field_path().ok()?;
        self.0
            .get(&path)
            .map(Vec::as_slice)
            .filter(|messages| !messages.is_empty())
    }

    /// Replaces the messages for `path`. An empty list removes the entry.
    pub fn insert(&mut self, path: FieldPath, messages: Vec<String>) {
        if messages.is_empty() {
            self.0.remove(&path);
        } else {
            self.0.insert(path, messages);
        }
    }

    /// Appends one message to `path`.
    pub fn push(&mut self, path: FieldPath, message: impl Into<String>) {
        self.0.entry(path).or_default().push(message.into());
    }

    pub fn iter(&self) -> btree_map::Iter<'_, FieldPath, Vec<String>> {
        self.0.iter()
    }
}
impl FromIterator<(FieldPath, Vec<String>)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (FieldPath, Vec<String>)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (path, messages) in iter {
            errors.insert(path, messages);
        }
        errors
    }
}
impl IntoIterator for ValidationErrors {
    type Item = (FieldPath, Vec<String>);
    type IntoIter = btree_map::IntoIter<FieldPath, Vec<String>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = (&'a FieldPath, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, FieldPath, Vec<String>>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of running a validator over form data.
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    /// The data is valid. Holds the data after defaults and coercions were applied.
    Valid(Value),
    Invalid(ValidationErrors),
}
impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            Validation::Valid(_) => None,
            Validation::Invalid(errors) => Some(errors),
        }
    }
}

/// Boundary between the form controller and a schema validation library.
///
/// `validate` may complete later than it is called, so schema checks backed by a worker
/// or a remote service can implement it directly.
pub trait ValidationAdapter {
    /// Data a new, empty form starts with.
    fn defaults(&self) -> Value;

    fn validate(&self, data: Value) -> LocalBoxFuture<'_, Validation>;

    /// Token identifying forms built from this schema.
    fn id(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.defaults().to_string().hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

/// A snapshot of validated form data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Validated {
    pub id: String,
    pub valid: bool,
    pub data: Value,
    pub errors: ValidationErrors,
}

impl Validated {
    /// Creates the initial state of an empty form: schema defaults and no errors.
    pub fn from_defaults<A: ValidationAdapter + ?Sized>(adapter: &A) -> Self {
        Self {
            id: adapter.id(),
            valid: false,
            data: adapter.defaults(),
            errors: ValidationErrors::new(),
        }
    }

    /// Validates `data` after filling missing fields from the schema defaults.
    pub async fn validate<A: ValidationAdapter + ?Sized>(adapter: &A, data: Value) -> Self {
        let data = merge_defaults(adapter.defaults(), data);
        let id = adapter.id();
        match adapter.validate(data.clone()).await {
            Validation::Valid(data) => Self {
                id,
                valid: true,
                data,
                errors: ValidationErrors::new(),
            },
            Validation::Invalid(errors) => Self {
                id,
                valid: false,
                data,
                errors,
            },
        }
    }
}

/// Fills fields missing from `data` with the values in `defaults`, recursing into objects.
pub fn merge_defaults(defaults: Value, data: Value) -> Value {
    match (defaults, data) {
        (Value::Object(defaults), Value::Object(mut data)) => {
            for (key, default) in defaults {
                let merged = match data.remove(&key) {
                    Some(value) => merge_defaults(default, value),
                    None => default,
                };
                data.insert(key, merged);
            }
            Value::Object(data)
        }
        (_, data) => data,
    }
}
