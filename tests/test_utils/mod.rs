#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future::LocalBoxFuture;
use serde_json::Value;
use sigform::{
    FieldPath, Form, FormOptions, Schema, TaintNode, UpdateOptions, Validated, Validation,
    ValidationAdapter,
};

pub const SCORE_ERROR: &str = "Number must be greater than or equal to 0";

pub fn schema() -> Schema {
    Schema::object()
        .field("name", Schema::string().default("Unknown"))
        .field("email", Schema::string().email())
        .field("tags", Schema::array(Schema::string().min(2)).min(3))
        .field("score", Schema::number().int().min(0.0))
        .into()
}

pub fn form() -> Form {
    Form::new(
        Validated::from_defaults(&schema()),
        FormOptions::new().validators(schema()),
    )
    .unwrap()
}

/// Merges `patch` into the current data and writes it back with the given taint option.
pub fn update_form(form: &Form, patch: Value, options: impl Into<UpdateOptions>) {
    form.data().update(|data| merge(data, patch), options);
}

pub fn merge(target: Value, patch: Value) -> Value {
    match (target, patch) {
        (Value::Object(mut target), Value::Object(patch)) => {
            for (key, value) in patch {
                let merged = match target.remove(&key) {
                    Some(current) => merge(current, value),
                    None => value,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (_, patch) => patch,
    }
}

pub fn tree(value: Value) -> TaintNode {
    TaintNode::from(value)
}

pub fn path(s: &str) -> FieldPath {
    FieldPath::parse(s).unwrap()
}

pub fn errors(messages: &[&str]) -> Option<Vec<String>> {
    Some(messages.iter().map(|s| s.to_string()).collect())
}

/// Validator that completes each call after a configurable number of polls.
pub struct DelayedSchema {
    pub schema: Schema,
    pub delays: RefCell<VecDeque<usize>>,
}
impl ValidationAdapter for DelayedSchema {
    fn defaults(&self) -> Value {
        self.schema.defaults()
    }
    fn validate(&self, data: Value) -> LocalBoxFuture<'_, Validation> {
        let delay = self.delays.borrow_mut().pop_front().unwrap_or(0);
        Box::pin(async move {
            YieldTimes(delay).await;
            self.schema.parse(&data)
        })
    }
}

struct YieldTimes(usize);
impl Future for YieldTimes {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 == 0 {
            Poll::Ready(())
        } else {
            self.0 -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
