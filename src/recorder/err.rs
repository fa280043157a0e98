#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("git: {0}")]
    Git(#[from] git2::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: String,
        source: serde_yaml::Error,
    },
    #[error("{0} has no name")]
    MissingName(String),
    #[error("repository at {0} has no working tree")]
    BareRepository(String),
    #[error("recording task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
