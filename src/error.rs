use crate::PathError;

/// Errors raised by the form controller.
///
/// Validation failures are not errors; they are reported as [`ValidationErrors`](crate::ValidationErrors).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Form data contains nested objects while the data type is [`DataType::Form`](crate::DataType::Form).
    #[error(
        "object found in form field \"{field}\"; set the data type to `json` to use nested data structures"
    )]
    UnsupportedShape { field: String },

    #[error("invalid field path: {0}")]
    InvalidPath(#[from] PathError),

    /// A validation was requested on a form that was created without validators.
    #[error("validators must be set to validate the form")]
    NoValidators,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
