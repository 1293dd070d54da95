use thiserror::Error;

#[derive(Debug, Error)]
pub enum RidehubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),
}

impl RidehubError {
    /// Short error code string returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            RidehubError::Config(_) => "CONFIG_ERROR",
            RidehubError::Timestamp(_) => "INVALID_TIMESTAMP",
        }
    }
}

pub type Result<T> = std::result::Result<T, RidehubError>;
