//! Core error type.
//!
//! Sub-crates define their own error enums and either convert `CoreError`
//! via `From` or wrap it as one variant.  Both patterns are acceptable;
//! prefer whichever keeps error sites clean.

use thiserror::Error;

/// Errors from interpreting backend wire codes.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {what} code {code}")]
    UnknownCode { what: &'static str, code: u8 },
}

/// Shorthand result type for `agv-core`.
pub type CoreResult<T> = Result<T, CoreError>;
