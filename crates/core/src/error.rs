#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{status} {status_text}: {detail}")]
    Domain {
        status: u16,
        status_text: String,
        detail: String,
    },
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("failed to (de)serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// True for failures where the request never produced a usable response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConsoleError::Transport(_) | ConsoleError::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::Transport(err.to_string())
    }
}

pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;
