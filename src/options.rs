use std::rc::Rc;

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{TaintMode, TaintNode, ValidationAdapter};

/// How form data is encoded when the form is submitted.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, FromStr, Serialize, Deserialize,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Flat key/value pairs. Top-level fields may hold primitives or arrays of primitives only.
    #[default]
    Form,
    /// Structured data; nested objects and arrays of objects are allowed.
    Json,
}

/// Configuration of a [`Form`](crate::Form).
///
/// Everything except the validators can be read from a configuration file:
///
/// ```
/// use sigform::{DataType, FormOptions};
///
/// let options: FormOptions = serde_json::from_str(r#"{ "dataType": "json" }"#).unwrap();
/// assert_eq!(options.data_type, DataType::Json);
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormOptions {
    pub data_type: DataType,
    /// Overrides the id of the validated data.
    pub id: Option<String>,
    /// Initial taint state.
    pub tainted: Option<TaintNode>,
    #[serde(skip)]
    pub validators: Option<Rc<dyn ValidationAdapter>>,
}
impl FormOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn validators(mut self, validators: impl ValidationAdapter + 'static) -> Self {
        self.validators = Some(Rc::new(validators));
        self
    }
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }
    pub fn tainted(mut self, tainted: TaintNode) -> Self {
        self.tainted = Some(tainted);
        self
    }
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
impl std::fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormOptions")
            .field("data_type", &self.data_type)
            .field("id", &self.id)
            .field("tainted", &self.tainted)
            .field("validators", &self.validators.is_some())
            .finish()
    }
}

/// Options of a data update made through [`FormData`](crate::FormData) or a [`FieldProxy`](crate::FieldProxy).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub taint: TaintMode,
}
impl From<TaintMode> for UpdateOptions {
    fn from(taint: TaintMode) -> Self {
        Self { taint }
    }
}
impl From<bool> for UpdateOptions {
    fn from(taint: bool) -> Self {
        Self {
            taint: taint.into(),
        }
    }
}

/// Which stores [`Form::validate`](crate::Form::validate) writes back to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "lowercase")]
pub enum UpdateTarget {
    #[default]
    All,
    Value,
    Errors,
    None,
}
impl UpdateTarget {
    pub fn writes_value(self) -> bool {
        matches!(self, UpdateTarget::All | UpdateTarget::Value)
    }
    pub fn writes_errors(self) -> bool {
        matches!(self, UpdateTarget::All | UpdateTarget::Errors)
    }
}

/// Options of [`Form::validate`](crate::Form::validate).
#[derive(Clone, Debug, PartialEq)]
pub struct ValidateOptions {
    /// Value to validate instead of the current field value.
    pub value: Option<Value>,
    pub update: UpdateTarget,
    /// Taint mode used when `value` is written to the form.
    pub taint: TaintMode,
    /// Messages reported instead of the validator's when the field is invalid.
    pub errors: Option<Vec<String>>,
}
impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            value: None,
            update: UpdateTarget::All,
            taint: TaintMode::Keep,
            errors: None,
        }
    }
}
impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
    pub fn update(mut self, update: UpdateTarget) -> Self {
        self.update = update;
        self
    }
    pub fn taint(mut self, taint: impl Into<TaintMode>) -> Self {
        self.taint = taint.into();
        self
    }
    pub fn errors<S: Into<String>>(mut self, errors: impl IntoIterator<Item = S>) -> Self {
        self.errors = Some(errors.into_iter().map(Into::into).collect());
        self
    }
}

/// Options of [`Form::validate_form`](crate::Form::validate_form).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidateFormOptions {
    /// Write the resulting errors to the errors store.
    pub update: bool,
}

/// Options of [`Form::reset`](crate::Form::reset).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResetOptions {
    /// Data to reset to. Missing fields are taken from the clean data.
    pub data: Option<Value>,
    /// Make the reset data the new clean state that taint is measured against.
    pub new_state: bool,
    pub keep_errors: bool,
}
