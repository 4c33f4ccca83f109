use futures::executor::block_on;
use serde_json::json;

use super::{merge_defaults, Validated, ValidationErrors};
use crate::{FieldPath, Schema, ValidationAdapter};

fn schema() -> Schema {
    Schema::object()
        .field("name", Schema::string().default("Unknown"))
        .field("score", Schema::number().int().min(0.0))
        .into()
}

#[test]
fn errors_get_ignores_empty_entries() {
    let mut errors = ValidationErrors::new();
    errors.push(FieldPath::parse("score").unwrap(), "too low");
    assert_eq!(errors.get("score"), Some(&["too low".to_string()][..]));
    assert_eq!(errors.get("name"), None);
    assert_eq!(errors.get("a..b"), None);

    errors.insert(FieldPath::parse("score").unwrap(), Vec::new());
    assert!(errors.is_empty());
}

#[test]
fn errors_serialize_as_path_map() {
    let errors: ValidationErrors = [(
        FieldPath::parse("tags[0]").unwrap(),
        vec!["short".to_string()],
    )]
    .into_iter()
    .collect();
    assert_eq!(
        serde_json::to_value(&errors).unwrap(),
        json!({ "tags[0]": ["short"] })
    );
}

#[test]
fn from_defaults() {
    let v = Validated::from_defaults(&schema());
    assert!(!v.valid);
    assert_eq!(v.data, json!({ "name": "Unknown", "score": 0 }));
    assert!(v.errors.is_empty());
    assert_eq!(v.id, schema().id());
}

#[test]
fn validate_merges_defaults() {
    let v = block_on(Validated::validate(&schema(), json!({ "score": 2 })));
    assert!(v.valid);
    assert_eq!(v.data, json!({ "name": "Unknown", "score": 2 }));
}

#[test]
fn validate_reports_errors() {
    let v = block_on(Validated::validate(&schema(), json!({ "score": -1 })));
    assert!(!v.valid);
    assert_eq!(
        v.errors.get("score"),
        Some(&["Number must be greater than or equal to 0".to_string()][..])
    );
    assert_eq!(v.data, json!({ "name": "Unknown", "score": -1 }));
}

#[test]
fn merge_defaults_recurses() {
    let merged = merge_defaults(
        json!({ "a": { "b": 1, "c": 2 }, "d": [] }),
        json!({ "a": { "b": 5 }, "e": true }),
    );
    assert_eq!(merged, json!({ "a": { "b": 5, "c": 2 }, "d": [], "e": true }));
}

#[test]
fn id_depends_on_defaults() {
    let other: Schema = Schema::object().field("x", Schema::boolean()).into();
    assert_ne!(schema().id(), other.id());
}
