#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: String,
        source: serde_json::Error,
    },
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: String,
        source: serde_json::Error,
    },
}
