//! Client-side form state: a reactive wrapper around validated form data that tracks which
//! fields the user has modified ("taint"), runs schema validation per field or for the whole
//! form, and exposes proxies for individual fields.
//!
//! ```
//! use futures::executor::block_on;
//! use serde_json::json;
//! use sigform::{Form, FormOptions, Schema, TaintMode, ValidateOptions, Validated};
//!
//! let schema: Schema = Schema::object()
//!     .field("name", Schema::string().default("Unknown"))
//!     .field("score", Schema::number().int().min(0.0))
//!     .into();
//! let form = Form::new(
//!     Validated::from_defaults(&schema),
//!     FormOptions::new().validators(schema),
//! )
//! .unwrap();
//!
//! form.data().update(
//!     |mut data| {
//!         data["name"] = json!("Test");
//!         data
//!     },
//!     TaintMode::Taint,
//! );
//! assert!(form.is_tainted_path("name"));
//!
//! let errors = block_on(form.validate("score", ValidateOptions::new().value(-10))).unwrap();
//! assert_eq!(
//!     errors,
//!     Some(vec!["Number must be greater than or equal to 0".to_string()])
//! );
//! ```

mod error;
mod form;
mod options;
mod path;
mod proxy;
mod schema;
mod store;
mod subscription;
pub mod taint;
mod validation;

pub use error::*;
pub use form::*;
pub use options::*;
pub use path::*;
pub use proxy::*;
pub use schema::*;
pub use store::*;
pub use subscription::*;
pub use taint::{TaintMode, TaintNode};
pub use validation::*;
