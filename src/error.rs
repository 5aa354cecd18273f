use std::path::PathBuf;

use thiserror::Error;

/// Terminal failure of a load run. Nothing is applied when one of these is
/// returned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

/// A single assignment rejected by the target environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot set `{key}`: {kind}")]
pub struct SetVarError {
    pub key: String,
    pub kind: SetVarErrorKind,
}

impl SetVarError {
    pub(crate) fn new(key: &str, kind: SetVarErrorKind) -> Self {
        Self {
            key: key.to_owned(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetVarErrorKind {
    #[error("empty key")]
    EmptyKey,
    #[error("key contains `=`")]
    KeyContainsEquals,
    #[error("key contains NUL")]
    KeyContainsNul,
    #[error("value contains NUL")]
    ValueContainsNul,
}
