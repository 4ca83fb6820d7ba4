use std::path::PathBuf;

/// Low-level failure inside a store file.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render JSON: {0}")]
    Render(#[source] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors surfaced by task, template and scheduling operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A referenced task or template does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The request was malformed; the message says how to fix it.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store failed. The source is logged, never shown.
    #[error("storage operation failed")]
    Storage(#[from] StorageError),
}

impl TrackerError {
    pub fn task_not_found(id: &str) -> Self {
        TrackerError::NotFound { kind: "task", id: id.to_string() }
    }

    pub fn template_not_found(id: &str) -> Self {
        TrackerError::NotFound { kind: "template", id: id.to_string() }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        TrackerError::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
