/// Core error type for the agent.
///
/// Adapter crates map their transport-specific errors into this type so the
/// agent can treat every send failure the same way (isolated, logged, reported).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session is not connected")]
    NotConnected,

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
