use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    merge_defaults, taint, DataType, Error, FieldPath, FieldProxy, FormOptions, IntoFieldPath,
    ResetOptions, Result, Store, Subscription, TaintMode, TaintNode, UpdateOptions,
    ValidateFormOptions, ValidateOptions, Validated, Validation, ValidationAdapter,
    ValidationErrors,
};

/// Client-side state of one form: data, validation errors and taint.
///
/// `Form` is a handle; clones share the same state.
#[derive(Clone)]
pub struct Form(Rc<FormNode>);

struct FormNode {
    id: String,
    data_type: DataType,
    validators: Option<Rc<dyn ValidationAdapter>>,
    data: Store<Value>,
    errors: Store<ValidationErrors>,
    tainted: Store<Option<TaintNode>>,
    clean: RefCell<Rc<Value>>,
}

impl Form {
    /// Creates a form from previously validated data.
    ///
    /// Fails with [`Error::UnsupportedShape`] if the data holds nested objects
    /// and `options.data_type` is [`DataType::Form`].
    pub fn new(validated: Validated, options: FormOptions) -> Result<Self> {
        let FormOptions {
            data_type,
            id,
            tainted,
            validators,
        } = options;
        if data_type == DataType::Form {
            check_flat(&validated.data)?;
        }
        let id = id.unwrap_or(validated.id);
        debug!(%id, %data_type, valid = validated.valid, "create form");
        Ok(Self(Rc::new(FormNode {
            id,
            data_type,
            validators,
            clean: RefCell::new(Rc::new(validated.data.clone())),
            data: Store::new(validated.data),
            errors: Store::new(validated.errors),
            tainted: Store::new(tainted),
        })))
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }
    pub fn data_type(&self) -> DataType {
        self.0.data_type
    }

    /// The form data. Updates made through it are tracked for taint.
    pub fn data(&self) -> FormData {
        FormData(self.clone())
    }
    pub fn errors(&self) -> &Store<ValidationErrors> {
        &self.0.errors
    }
    pub fn tainted(&self) -> &Store<Option<TaintNode>> {
        &self.0.tainted
    }

    /// Returns a proxy reading and writing the field at `path`.
    pub fn field(
        &self,
        path: impl IntoFieldPath,
        options: impl Into<UpdateOptions>,
    ) -> Result<FieldProxy> {
        FieldProxy::new(self, path, options)
    }

    /// Returns whether any field is tainted.
    pub fn is_tainted(&self) -> bool {
        self.0
            .tainted
            .with(|tainted| tainted.as_ref().is_some_and(TaintNode::is_tainted))
    }

    /// Returns whether the field at `path`, one of its ancestors, or one of its descendants is tainted.
    pub fn is_tainted_path(&self, path: impl IntoFieldPath) -> bool {
        match path.into_field_path() {
            Ok(path) => self
                .0
                .tainted
                .with(|tainted| taint::is_path_tainted(tainted.as_ref(), &path)),
            Err(e) => {
                warn!(error = %e, "invalid path in taint query");
                false
            }
        }
    }

    /// Evaluates `tree` instead of the current taint state.
    ///
    /// `None` falls back to the current state, like [`is_tainted`](Self::is_tainted).
    pub fn is_tainted_in(&self, tree: Option<&TaintNode>) -> bool {
        match tree {
            Some(tree) => tree.is_tainted(),
            None => self.is_tainted(),
        }
    }

    /// Validates a single field and returns its error messages, or `None` if it is valid.
    ///
    /// The whole form is validated, with `options.value` substituted for the field value when given.
    /// Depending on `options.update` the supplied value and the field errors are written back.
    /// When several validations of the same field overlap, the one that completes last wins.
    pub async fn validate(
        &self,
        path: impl IntoFieldPath,
        options: ValidateOptions,
    ) -> Result<Option<Vec<String>>> {
        let path = path.into_field_path()?;
        let validators = self.validators()?;
        let ValidateOptions {
            value,
            update,
            taint,
            errors: custom_errors,
        } = options;

        let mut data = self.0.data.get();
        if let Some(value) = &value {
            path.set(&mut data, value.clone());
        }
        let validation = validators.validate(data).await;
        let mut messages = validation
            .errors()
            .and_then(|errors| errors.get(&path))
            .map(<[String]>::to_vec);
        if messages.is_some() {
            if let Some(custom_errors) = custom_errors.filter(|e| !e.is_empty()) {
                messages = Some(custom_errors);
            }
        }
        debug!(
            %path,
            %update,
            valid = validation.is_valid(),
            errors = messages.as_ref().map_or(0, Vec::len),
            "validate field"
        );

        if update.writes_value() {
            if let Some(value) = value {
                let target = path.clone();
                self.update_data(
                    move |mut data| {
                        target.set(&mut data, value);
                        data
                    },
                    taint,
                    vec![path.clone()],
                );
            }
        }
        if update.writes_errors() {
            let field_errors = messages.clone().unwrap_or_default();
            self.0.errors.update(|mut errors| {
                errors.insert(path, field_errors);
                errors
            });
        }
        Ok(messages)
    }

    /// Validates the current form data.
    ///
    /// The returned data is the coerced data when valid, the current data otherwise.
    pub async fn validate_form(&self, options: ValidateFormOptions) -> Result<Validated> {
        let validators = self.validators()?;
        let data = self.0.data.get();
        let validated = match validators.validate(data.clone()).await {
            Validation::Valid(data) => Validated {
                id: self.0.id.clone(),
                valid: true,
                data,
                errors: ValidationErrors::new(),
            },
            Validation::Invalid(errors) => Validated {
                id: self.0.id.clone(),
                valid: false,
                data,
                errors,
            },
        };
        debug!(valid = validated.valid, errors = validated.errors.len(), "validate form");
        if options.update {
            self.0.errors.set(validated.errors.clone());
        }
        Ok(validated)
    }

    /// Validates the form and refreshes the errors of every tainted field.
    ///
    /// Returns whether all tainted fields are valid.
    pub async fn validate_tainted(&self) -> Result<bool> {
        let validators = self.validators()?;
        let paths = self.0.tainted.with(|tainted| {
            tainted
                .as_ref()
                .map(TaintNode::tainted_paths)
                .unwrap_or_default()
        });
        if paths.is_empty() {
            return Ok(true);
        }
        let validation = validators.validate(self.0.data.get()).await;
        let found = validation.errors().cloned().unwrap_or_default();
        let mut valid = true;
        self.0.errors.update(|mut errors| {
            for path in paths {
                let messages = found.get(&path).map(<[String]>::to_vec).unwrap_or_default();
                valid &= messages.is_empty();
                errors.insert(path, messages);
            }
            errors
        });
        debug!(valid, "validate tainted fields");
        Ok(valid)
    }

    /// Restores the clean data, clears the taint state and, unless kept, the errors.
    pub fn reset(&self, options: ResetOptions) {
        let node = &self.0;
        let clean = node.clean.borrow().clone();
        let data = match options.data {
            Some(data) => merge_defaults(Value::clone(&clean), data),
            None => Value::clone(&clean),
        };
        if options.new_state {
            *node.clean.borrow_mut() = Rc::new(data.clone());
        }
        debug!(new_state = options.new_state, "reset form");
        node.tainted.set(None);
        node.data.set(data);
        if !options.keep_errors {
            node.errors.set(ValidationErrors::new());
        }
    }

    /// Captures the current state so it can be restored later.
    pub fn capture(&self) -> FormSnapshot {
        FormSnapshot {
            id: self.0.id.clone(),
            data: self.0.data.get(),
            errors: self.0.errors.get(),
            tainted: self.0.tainted.get(),
        }
    }

    /// Replaces the current state with a captured one, without recomputing taint.
    pub fn restore(&self, snapshot: FormSnapshot) {
        if snapshot.id != self.0.id {
            warn!(id = %self.0.id, snapshot = %snapshot.id, "restore snapshot of another form");
        }
        self.0.tainted.set(snapshot.tainted);
        self.0.data.set(snapshot.data);
        self.0.errors.set(snapshot.errors);
    }

    pub(crate) fn data_store(&self) -> &Store<Value> {
        &self.0.data
    }

    fn validators(&self) -> Result<Rc<dyn ValidationAdapter>> {
        self.0.validators.clone().ok_or(Error::NoValidators)
    }

    /// Applies `f` to the data and updates taint for the changed paths.
    ///
    /// `touched` lists paths written by the caller; `untaint` clears them even when their
    /// values did not change.
    pub(crate) fn update_data(
        &self,
        f: impl FnOnce(Value) -> Value,
        taint: TaintMode,
        touched: Vec<FieldPath>,
    ) {
        let node = &self.0;
        let old = node.data.snapshot();
        let new = Rc::new(f(Value::clone(&old)));
        let mut paths = taint::changed_paths(&old, &new);
        if taint == TaintMode::Untaint {
            for path in touched {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        debug!(changed = paths.len(), %taint, "update form data");
        node.data.set_rc(new.clone());
        if paths.is_empty() && taint != TaintMode::UntaintAll {
            return;
        }
        let clean = node.clean.borrow().clone();
        let tainted = taint::apply(node.tainted.get(), &paths, taint, &new, &clean);
        if node.tainted.with(|current| current != &tainted) {
            node.tainted.set(tainted);
        }
    }
}

/// Rejects objects in top-level fields, directly or as the elements of an array.
fn check_flat(data: &Value) -> Result<()> {
    if let Value::Object(fields) = data {
        for (key, value) in fields {
            check_field(key, value)?;
        }
    }
    Ok(())
}
fn check_field(key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Object(_) => Err(Error::UnsupportedShape {
            field: key.to_string(),
        }),
        Value::Array(items) => items.first().map_or(Ok(()), |first| check_field(key, first)),
        _ => Ok(()),
    }
}

/// The data store of a [`Form`].
#[derive(Clone)]
pub struct FormData(Form);

impl FormData {
    pub fn get(&self) -> Value {
        self.0.data_store().get()
    }
    pub fn snapshot(&self) -> Rc<Value> {
        self.0.data_store().snapshot()
    }
    pub fn with<U>(&self, f: impl FnOnce(&Value) -> U) -> U {
        self.0.data_store().with(f)
    }
    pub fn subscribe(&self, f: impl Fn(&Value) + 'static) -> Subscription {
        self.0.data_store().subscribe(f)
    }

    /// Replaces the data, updating taint according to `options`.
    ///
    /// With `untaint` every field of `value` is cleared, changed or not.
    pub fn set(&self, value: Value, options: impl Into<UpdateOptions>) {
        let touched = taint::leaf_paths(&value);
        self.0.update_data(|_| value, options.into().taint, touched);
    }

    /// Replaces the data with the result of `f`, which receives a copy of the current data.
    ///
    /// Only the fields whose values changed count as written.
    pub fn update(&self, f: impl FnOnce(Value) -> Value, options: impl Into<UpdateOptions>) {
        self.0.update_data(f, options.into().taint, Vec::new());
    }
}

/// Captured state of a [`Form`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub id: String,
    pub data: Value,
    pub errors: ValidationErrors,
    pub tainted: Option<TaintNode>,
}

