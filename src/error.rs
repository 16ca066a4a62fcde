use thiserror::Error;

/// Errors surfaced by the decision core and its collaborators
#[derive(Debug, Error)]
pub enum BotError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// An exchange query or command failed at the transport/API level
    #[error("exchange request failed: {0:#}")]
    Exchange(#[from] anyhow::Error),

    /// The market data window is unusable (empty, unsorted)
    #[error("invalid market data window: {0}")]
    InvalidWindow(String),

    /// The strategy engine could not classify the frame
    #[error("strategy failed: {0}")]
    Strategy(String),

    /// The risk engine produced degenerate or wrong-side bounds
    #[error("risk bounds rejected: {0}")]
    RiskBounds(String),
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}
