use thiserror::Error;

/// Failure to turn a model path into a scene node.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("model {path} not found")]
    NotFound { path: String },
    #[error("failed to read model {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("model {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

impl AssetLoadError {
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path } | Self::Io { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    #[error("navigation destination must not be empty")]
    Empty,
}
