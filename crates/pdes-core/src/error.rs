//! Core error type.
//!
//! Sub-crates define their own error enums and either convert into their
//! parent's error via `From` impls or wrap `CoreError` as one variant.

use thiserror::Error;

/// Errors from core value-type validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `pdes-core`.
pub type CoreResult<T> = Result<T, CoreError>;
