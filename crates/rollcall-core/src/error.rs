use thiserror::Error;

#[derive(Debug, Error)]
pub enum RollcallError {
    #[error("scan root does not exist: {0}")]
    RootNotFound(String),

    #[error("scan root is not a directory: {0}")]
    RootNotDirectory(String),

    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid confidence {0}: must be 0-100")]
    InvalidConfidence(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RollcallError>;
