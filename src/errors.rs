use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error reported by a remote collaborator (aggregator proxy or wallet).
    #[error("{message}")]
    Remote {
        message: String,
        code: Option<String>,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Other: {0}")]
    Other(String),
}

impl AppError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            code: None,
        }
    }

    pub fn remote_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Machine-readable code attached by the remote side, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
