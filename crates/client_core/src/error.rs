use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("tracker api rejected request: {0}")]
    Api(#[from] ApiError),
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0} controller is no longer running")]
    ControllerStopped(&'static str),
}

impl ClientError {
    /// Text suitable for an inline status label.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(err) => err.message.clone(),
            ClientError::Transport(err) if err.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ClientError::Transport(err) if err.is_connect() => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
