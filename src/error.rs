use thiserror::Error;

/// Errors raised for structurally unusable input. Recoverable conditions such
/// as empty node lists or dangling references never surface here.
#[derive(Debug, Error)]
pub enum OdysseyError {
    #[error("career nodes must be a JSON array or an object with a 'nodes' array, found {found}")]
    InvalidInput { found: &'static str },

    #[error("career node id '{0}' is declared more than once")]
    DuplicateId(String),

    #[error("failed to parse career nodes: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write svg output")]
    Render(#[from] std::fmt::Error),
}

pub type Result<T, E = OdysseyError> = std::result::Result<T, E>;
