use std::sync::LazyLock;

use futures::future::{ready, LocalBoxFuture};
use regex::Regex;
use serde_json::{Map, Value};

use crate::{FieldPath, Segment, Validation, ValidationAdapter, ValidationErrors};


static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap()
});

/// Declarative description of form data, usable as a [`ValidationAdapter`].
///
/// ```
/// use sigform::Schema;
///
/// let schema: Schema = Schema::object()
///     .field("name", Schema::string().default("Unknown"))
///     .field("email", Schema::string().email())
///     .field("tags", Schema::array(Schema::string().min(2)).min(3))
///     .field("score", Schema::number().int().min(0.0))
///     .into();
/// ```
#[derive(Clone, Debug)]
pub enum Schema {
    String(StringSchema),
    Number(NumberSchema),
    Boolean(BooleanSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
}

impl Schema {
    pub fn string() -> StringSchema {
        Default::default()
    }
    pub fn number() -> NumberSchema {
        Default::default()
    }
    pub fn boolean() -> BooleanSchema {
        Default::default()
    }
    pub fn array(item: impl Into<Schema>) -> ArraySchema {
        ArraySchema {
            item: Box::new(item.into()),
            min: None,
            max: None,
            default: None,
        }
    }
    pub fn object() -> ObjectSchema {
        Default::default()
    }

    /// Value used for a field the data does not contain.
    pub fn defaults(&self) -> Value {
        match self {
            Schema::String(s) => s.default.clone().map_or_else(|| Value::from(""), Value::from),
            Schema::Number(s) => number_value(s.default.unwrap_or(0.0)),
            Schema::Boolean(s) => Value::from(s.default.unwrap_or(false)),
            Schema::Array(s) => s.default.clone().unwrap_or_else(|| Value::Array(Vec::new())),
            Schema::Object(s) => Value::Object(
                s.fields
                    .iter()
                    .map(|(key, schema)| (key.clone(), schema.defaults()))
                    .collect(),
            ),
        }
    }

    /// Checks `data` and returns either the coerced data or every error found.
    pub fn parse(&self, data: &Value) -> Validation {
        let mut errors = ValidationErrors::new();
        let value = self.check(Some(data), &mut FieldPath::root(), &mut errors);
        if errors.is_empty() {
            Validation::Valid(value.unwrap_or(Value::Null))
        } else {
            Validation::Invalid(errors)
        }
    }

    fn default_value(&self) -> Option<Value> {
        match self {
            Schema::String(s) => s.default.clone().map(Value::from),
            Schema::Number(s) => s.default.map(number_value),
            Schema::Boolean(s) => s.default.map(Value::from),
            Schema::Array(s) => s.default.clone(),
            Schema::Object(_) => None,
        }
    }

    fn check(
        &self,
        value: Option<&Value>,
        path: &mut FieldPath,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        let Some(value) = value else {
            let default = self.default_value();
            if default.is_none() {
                errors.push(path.clone(), "Required");
            }
            return default;
        };
        let expected = match self {
            Schema::String(_) => "string",
            Schema::Number(_) => "number",
            Schema::Boolean(_) => "boolean",
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
        };
        if expected != type_name(value) {
            errors.push(
                path.clone(),
                format!("Expected {expected}, received {}", type_name(value)),
            );
            return None;
        }
        match self {
            Schema::String(s) => s.check(value, path, errors),
            Schema::Number(s) => s.check(value, path, errors),
            Schema::Boolean(_) => {}
            Schema::Array(s) => return Some(s.check(value, path, errors)),
            Schema::Object(s) => return Some(s.check(value, path, errors)),
        }
        Some(value.clone())
    }
}

impl ValidationAdapter for Schema {
    fn defaults(&self) -> Value {
        Schema::defaults(self)
    }
    fn validate(&self, data: Value) -> LocalBoxFuture<'_, Validation> {
        Box::pin(ready(self.parse(&data)))
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Debug)]
enum StringCheck {
    Min(usize),
    Max(usize),
    Email,
}

#[derive(Clone, Debug, Default)]
pub struct StringSchema {
    checks: Vec<StringCheck>,
    default: Option<String>,
}
impl StringSchema {
    pub fn min(mut self, len: usize) -> Self {
        self.checks.push(StringCheck::Min(len));
        self
    }
    pub fn max(mut self, len: usize) -> Self {
        self.checks.push(StringCheck::Max(len));
        self
    }
    pub fn email(mut self) -> Self {
        self.checks.push(StringCheck::Email);
        self
    }
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn check(&self, value: &Value, path: &FieldPath, errors: &mut ValidationErrors) {
        let s = value.as_str().unwrap_or_default();
        let len = s.chars().count();
        for check in &self.checks {
            match *check {
                StringCheck::Min(min) if len < min => errors.push(
                    path.clone(),
                    format!("String must contain at least {min} character(s)"),
                ),
                StringCheck::Max(max) if len > max => errors.push(
                    path.clone(),
                    format!("String must contain at most {max} character(s)"),
                ),
                StringCheck::Email if !EMAIL.is_match(s) => {
                    errors.push(path.clone(), "Invalid email")
                }
                _ => {}
            }
        }
    }
}

#[derive(Clone, Debug)]
enum NumberCheck {
    Int,
    Min(f64),
    Max(f64),
}

#[derive(Clone, Debug, Default)]
pub struct NumberSchema {
    checks: Vec<NumberCheck>,
    default: Option<f64>,
}
impl NumberSchema {
    pub fn int(mut self) -> Self {
        self.checks.push(NumberCheck::Int);
        self
    }
    pub fn min(mut self, min: f64) -> Self {
        self.checks.push(NumberCheck::Min(min));
        self
    }
    pub fn max(mut self, max: f64) -> Self {
        self.checks.push(NumberCheck::Max(max));
        self
    }
    pub fn default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    fn check(&self, value: &Value, path: &FieldPath, errors: &mut ValidationErrors) {
        let n = value.as_f64().unwrap_or_default();
        for check in &self.checks {
            match *check {
                NumberCheck::Int if n.fract() != 0.0 => {
                    errors.push(path.clone(), "Expected integer, received float")
                }
                NumberCheck::Min(min) if n < min => errors.push(
                    path.clone(),
                    format!("Number must be greater than or equal to {min}"),
                ),
                NumberCheck::Max(max) if n > max => errors.push(
                    path.clone(),
                    format!("Number must be less than or equal to {max}"),
                ),
                _ => {}
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BooleanSchema {
    default: Option<bool>,
}
impl BooleanSchema {
    pub fn default(mut self, value: bool) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ArraySchema {
    item: Box<Schema>,
    min: Option<usize>,
    max: Option<usize>,
    default: Option<Value>,
}
impl ArraySchema {
    pub fn min(mut self, len: usize) -> Self {
        self.min = Some(len);
        self
    }
    pub fn max(mut self, len: usize) -> Self {
        self.max = Some(len);
        self
    }
    pub fn default(mut self, value: Vec<Value>) -> Self {
        self.default = Some(Value::Array(value));
        self
    }

    fn check(&self, value: &Value, path: &mut FieldPath, errors: &mut ValidationErrors) -> Value {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        if let Some(min) = self.min {
            if items.len() < min {
                errors.push(
                    path.clone(),
                    format!("Array must contain at least {min} element(s)"),
                );
            }
        }
        if let Some(max) = self.max {
            if items.len() > max {
                errors.push(
                    path.clone(),
                    format!("Array must contain at most {max} element(s)"),
                );
            }
        }
        let mut output = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            path.push(Segment::Index(index));
            let checked = self.item.check(Some(item), path, errors);
            output.push(checked.unwrap_or_else(|| item.clone()));
            path.pop();
        }
        Value::Array(output)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Schema)>,
}
impl ObjectSchema {
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.fields.push((name.into(), schema.into()));
        self
    }

    fn check(&self, value: &Value, path: &mut FieldPath, errors: &mut ValidationErrors) -> Value {
        let mut output = Map::new();
        for (key, schema) in &self.fields {
            path.push(Segment::Key(key.clone()));
            let field = value.get(key);
            if let Some(checked) = schema.check(field, path, errors).or_else(|| field.cloned()) {
                output.insert(key.clone(), checked);
            }
            path.pop();
        }
        Value::Object(output)
    }
}

macro_rules! impl_into_schema {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Schema {
                fn from(schema: $ty) -> Self {
                    Schema::$variant(schema)
                }
            }
        )*
    };
}
impl_into_schema!(
    StringSchema => String,
    NumberSchema => Number,
    BooleanSchema => Boolean,
    ArraySchema => Array,
    ObjectSchema => Object,
);
