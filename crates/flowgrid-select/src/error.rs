//! Selection error types.

use thiserror::Error;

/// Errors that can occur while constructing or invoking a selector.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The candidate-connection list was empty. A message with no
    /// delivery target is a correctness violation the caller must
    /// observe.
    #[error("no target connections to select from")]
    EmptyTarget,

    /// The fields selector found no string value under its field name;
    /// no deterministic target exists.
    #[error("message is missing routing field: {0}")]
    MissingField(String),

    /// No selector is registered under the requested grouping.
    #[error("unknown selector grouping: {0}")]
    UnknownGrouping(String),

    /// The selector configuration is missing a required parameter.
    #[error("invalid selector config: {0}")]
    InvalidConfig(String),
}

pub type SelectResult<T> = Result<T, SelectError>;
