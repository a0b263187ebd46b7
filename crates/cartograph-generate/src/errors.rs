use thiserror::Error;

/// Errors emitted while rendering artifacts.
///
/// Renderers never fail because of validation findings; these cover the
/// writer plumbing only.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("unknown engine: {0}")]
    UnknownEngine(String),
}
