use thiserror::Error;

/// Core error type shared across Cartograph crates.
///
/// Validation findings are never reported through this type; they live in
/// the validator's report. An `Error` means the input could not be read at
/// all, or the compiler broke one of its own invariants.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not shaped like a mapping document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// The document format could not be inferred or is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// An internal invariant of the canonical graph was violated.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// True when the failure is a compiler bug rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}

/// Convenience alias for results returned by Cartograph crates.
pub type Result<T> = std::result::Result<T, Error>;
