use std::{cell::RefCell, collections::VecDeque};

use futures::{executor::block_on, future::join};
use serde_json::{json, Value};
use sigform::{
    Error, Form, FormOptions, TaintMode, UpdateTarget, ValidateFormOptions, ValidateOptions,
    Validated,
};

mod test_utils;
use test_utils::*;

fn set_score(form: &Form, score: Value, taint: TaintMode) {
    form.data().update(
        |mut data| {
            data["score"] = score;
            data
        },
        taint,
    );
}

#[test]
fn default_options_update_errors_but_not_taint() {
    let form = form();
    set_score(&form, json!(-1), TaintMode::Keep);
    assert!(!form.is_tainted());

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new())).unwrap(),
        errors(&[SCORE_ERROR])
    );

    assert_eq!(
        form.errors().get().get("score"),
        Some(&[SCORE_ERROR.to_string()][..])
    );
    assert_eq!(form.data().get()["score"], json!(-1));
    assert!(!form.is_tainted());
}

#[test]
fn testing_a_value_updates_errors_but_not_taint() {
    let form = form();
    assert!(!form.is_tainted());

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().value(-10))).unwrap(),
        errors(&[SCORE_ERROR])
    );

    assert_eq!(
        form.errors().get().get("score"),
        Some(&[SCORE_ERROR.to_string()][..])
    );
    assert_eq!(form.data().get()["score"], json!(-10));
    assert!(!form.is_tainted());
}

#[test]
fn custom_error_replaces_validator_messages() {
    let form = form();
    let score_error = "Score cannot be negative.";

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().errors([score_error]))).unwrap(),
        None
    );

    set_score(&form, json!(-1), TaintMode::Keep);

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().errors([score_error]))).unwrap(),
        errors(&[score_error])
    );
    assert_eq!(
        form.errors().get().get("score"),
        Some(&[score_error.to_string()][..])
    );
}

#[test]
fn setting_a_value_can_taint_the_field() {
    let form = form();
    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().value(10).taint(true))).unwrap(),
        None
    );
    assert_eq!(form.errors().get().get("score"), None);
    assert_eq!(form.data().get()["score"], json!(10));
    assert!(form.is_tainted_path("score"));
}

#[test]
fn update_value_only() {
    let form = form();
    assert_eq!(
        block_on(form.validate(
            "score",
            ValidateOptions::new().value(-10).update(UpdateTarget::Value)
        ))
        .unwrap(),
        errors(&[SCORE_ERROR])
    );
    assert_eq!(form.errors().get().get("score"), None);
    assert_eq!(form.data().get()["score"], json!(-10));
    assert!(!form.is_tainted_path("score"));
}

#[test]
fn update_errors_only() {
    let form = form();
    assert_eq!(
        block_on(form.validate(
            "score",
            ValidateOptions::new().value(-10).update(UpdateTarget::Errors)
        ))
        .unwrap(),
        errors(&[SCORE_ERROR])
    );
    assert_eq!(
        form.errors().get().get("score"),
        Some(&[SCORE_ERROR.to_string()][..])
    );
    assert_eq!(form.data().get()["score"], json!(0));
    assert!(!form.is_tainted_path("score"));
}

#[test]
fn update_nothing() {
    let form = form();
    assert_eq!(
        block_on(form.validate(
            "score",
            ValidateOptions::new().value(-10).update(UpdateTarget::None)
        ))
        .unwrap(),
        errors(&[SCORE_ERROR])
    );
    assert!(form.errors().get().is_empty());
    assert_eq!(form.data().get()["score"], json!(0));
}

#[test]
fn should_return_the_errors_for_a_form_field() {
    let form = form();
    set_score(&form, json!(-1), TaintMode::Taint);

    assert_eq!(
        block_on(form.validate("name", ValidateOptions::new())).unwrap(),
        None
    );
    assert_eq!(form.errors().get().get("score"), None);
    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new())).unwrap(),
        errors(&[SCORE_ERROR])
    );
    assert_eq!(
        form.errors().get().get("score"),
        Some(&[SCORE_ERROR.to_string()][..])
    );

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().value("test"))).unwrap(),
        errors(&["Expected number, received string"])
    );

    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new().value(1))).unwrap(),
        None
    );
    assert_eq!(form.errors().get().get("score"), None);

    let validated = block_on(form.validate_form(ValidateFormOptions::default())).unwrap();
    assert_eq!(validated.data, form.data().get());
}

#[test]
fn array_errors_are_reported_per_path() {
    let form = form();
    update_form(&form, json!({ "tags": ["A"] }), TaintMode::Taint);
    assert_eq!(
        block_on(form.validate("tags", ValidateOptions::new())).unwrap(),
        errors(&["Array must contain at least 3 element(s)"])
    );
    assert_eq!(
        block_on(form.validate("tags[0]", ValidateOptions::new())).unwrap(),
        errors(&["String must contain at least 2 character(s)"])
    );
}

#[test]
fn validate_form_reports_all_errors() {
    let form = form();
    let validated = block_on(form.validate_form(ValidateFormOptions::default())).unwrap();
    assert!(!validated.valid);
    assert_eq!(validated.id, form.id());
    assert_eq!(
        validated.errors.get("email"),
        Some(&["Invalid email".to_string()][..])
    );
    assert_eq!(
        validated.errors.get("tags"),
        Some(&["Array must contain at least 3 element(s)".to_string()][..])
    );
    assert!(form.errors().get().is_empty());

    block_on(form.validate_form(ValidateFormOptions { update: true })).unwrap();
    assert_eq!(form.errors().get(), validated.errors);
}

#[test]
fn validate_form_returns_coerced_data_when_valid() {
    let form = form();
    update_form(
        &form,
        json!({ "email": "a@example.com", "tags": ["ab", "cd", "ef"], "score": 2 }),
        TaintMode::Taint,
    );
    let validated = block_on(form.validate_form(ValidateFormOptions { update: true })).unwrap();
    assert!(validated.valid);
    assert_eq!(validated.data, form.data().get());
    assert!(form.errors().get().is_empty());
}

#[test]
fn validate_tainted_refreshes_tainted_fields_only() {
    let form = form();
    assert!(block_on(form.validate_tainted()).unwrap());

    update_form(&form, json!({ "email": "nope", "score": -3 }), TaintMode::Taint);
    assert!(!block_on(form.validate_tainted()).unwrap());
    let errors = form.errors().get();
    assert_eq!(errors.get("email"), Some(&["Invalid email".to_string()][..]));
    assert_eq!(errors.get("score"), Some(&[SCORE_ERROR.to_string()][..]));
    assert_eq!(errors.get("tags"), None);

    update_form(&form, json!({ "email": "a@b.io", "score": 3 }), TaintMode::Taint);
    assert!(block_on(form.validate_tainted()).unwrap());
    assert!(form.errors().get().is_empty());
}

#[test]
fn validate_without_validators_fails() {
    let form = Form::new(Validated::from_defaults(&schema()), FormOptions::new()).unwrap();
    assert_eq!(
        block_on(form.validate("score", ValidateOptions::new())),
        Err(Error::NoValidators)
    );
    assert_eq!(
        block_on(form.validate_form(ValidateFormOptions::default())),
        Err(Error::NoValidators)
    );
}

#[test]
fn validate_invalid_path_fails() {
    let form = form();
    assert!(matches!(
        block_on(form.validate("score[", ValidateOptions::new())),
        Err(Error::InvalidPath(_))
    ));
}

#[test]
fn overlapping_validations_last_completion_wins() {
    let adapter = DelayedSchema {
        schema: schema(),
        delays: RefCell::new(VecDeque::from([5, 0])),
    };
    let form = Form::new(
        Validated::from_defaults(&schema()),
        FormOptions::new().validators(adapter),
    )
    .unwrap();

    let (slow, fast) = block_on(join(
        form.validate("score", ValidateOptions::new().value(-1)),
        form.validate("score", ValidateOptions::new().value(2)),
    ));
    assert_eq!(slow.unwrap(), errors(&[SCORE_ERROR]));
    assert_eq!(fast.unwrap(), None);

    assert_eq!(form.data().get()["score"], json!(-1));
    assert_eq!(
        form.errors().get().get("score"),
        Some(&[SCORE_ERROR.to_string()][..])
    );
}
