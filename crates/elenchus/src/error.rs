//! Subject construction errors.

use thiserror::Error;

/// Errors that can occur while building assertion subjects.
///
/// Assertion failures themselves do not go through this type; they panic
/// through the engine so the test runner reports them at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectError {
    /// Header name rejected by the HTTP vocabulary.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Header value rejected by the HTTP vocabulary.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// A raw cookie string failed to parse.
    #[error("invalid cookie string: {0}")]
    Cookie(#[from] cookie::ParseError),
}
