//! Error types for form-state derivation.
//!
//! Only contract violations and configuration problems are reported here.
//! A document that does not match its schema is not an error: those cases
//! become error members inside the form tree.

use thiserror::Error;

/// Error returned by a user-authored conditional callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FormStateError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unexpected non-object value at {path} (found {found})")]
    UnexpectedNonObjectValue { path: String, found: String },

    #[error("Conditional `{property}` callback failed at {path}: {source}")]
    ConditionalCallback {
        property: &'static str,
        path: String,
        #[source]
        source: CallbackError,
    },

    #[error("Schema error at {path}: {message}")]
    SchemaError { path: String, message: String },

    #[error("Unknown schema type `{name}` referenced at {path}")]
    UnknownType { path: String, name: String },

    #[error("Invalid path `{input}`: {message}")]
    InvalidPath { input: String, message: String },
}
