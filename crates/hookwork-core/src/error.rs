use thiserror::Error;

/// Errors raised by structural writes and configuration parsing.
///
/// Reads never fail: a missing path segment resolves to `None`. Panics inside
/// scheduled callbacks or selectors are not caught and are not represented here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("path is empty")]
    EmptyPath,

    #[error("cannot write through `{segment}` in `{path}`: not an object or array")]
    NotAContainer { path: String, segment: String },

    #[error("index `{segment}` is out of bounds in `{path}`")]
    IndexOutOfBounds { path: String, segment: String },

    #[error("invalid frame rate `{value}` in {var}: expected a positive number")]
    InvalidFrameRate { var: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
