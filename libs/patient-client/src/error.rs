use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with an error body `{"error", "code"}`.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Booking draft is incomplete: {0}")]
    IncompleteDraft(String),
}

impl ClientError {
    /// The chosen slot was taken by someone else.
    pub fn is_slot_conflict(&self) -> bool {
        matches!(
            self,
            ClientError::Api { status: 409, code: Some(code), .. } if code == "CONFLICT"
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. } | ClientError::NotAuthenticated)
    }
}
