use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(
        "malformed stay point {}: {reason}",
        .id.map_or_else(|| "<missing id>".to_string(), |id| id.to_string())
    )]
    MalformedStayPoint { id: Option<u64>, reason: String },

    #[error("invalid purpose label: {0:?}")]
    InvalidPurpose(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("reading config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config JSON error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
