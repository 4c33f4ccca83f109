use std::cell::RefCell;

use serde_json::Value;

use crate::{FieldPath, Form, IntoFieldPath, Result, Subscription, UpdateOptions};

/// Read/write access to one field of a [`Form`].
///
/// Writes go through the same taint tracking as whole-form updates, using the proxy's
/// [`UpdateOptions`].
#[derive(Clone)]
pub struct FieldProxy {
    form: Form,
    path: FieldPath,
    options: UpdateOptions,
}

impl FieldProxy {
    pub fn new(
        form: &Form,
        path: impl IntoFieldPath,
        options: impl Into<UpdateOptions>,
    ) -> Result<Self> {
        Ok(Self {
            form: form.clone(),
            path: path.into_field_path()?,
            options: options.into(),
        })
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Current value of the field, or `None` if the data has no such field.
    pub fn get(&self) -> Option<Value> {
        self.form
            .data_store()
            .with(|data| self.path.get(data).cloned())
    }

    pub fn set(&self, value: Value) {
        let path = self.path.clone();
        self.form.update_data(
            move |mut data| {
                path.set(&mut data, value);
                data
            },
            self.options.taint,
            vec![self.path.clone()],
        );
    }

    pub fn update(&self, f: impl FnOnce(Option<Value>) -> Value) {
        let path = self.path.clone();
        self.form.update_data(
            move |mut data| {
                let value = f(path.get(&data).cloned());
                path.set(&mut data, value);
                data
            },
            self.options.taint,
            vec![self.path.clone()],
        );
    }

    /// Calls `f` with the field value now and whenever it changes.
    ///
    /// Changes to other fields do not call `f`.
    pub fn subscribe(&self, f: impl Fn(Option<&Value>) + 'static) -> Subscription {
        let path = self.path.clone();
        let last: RefCell<Option<Option<Value>>> = RefCell::new(None);
        self.form.data_store().subscribe(move |data| {
            let value = path.get(data);
            {
                let mut last = last.borrow_mut();
                if last.as_ref().is_some_and(|last| last.as_ref() == value) {
                    return;
                }
                *last = Some(value.cloned());
            }
            f(value);
        })
    }
}
