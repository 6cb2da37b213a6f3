use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The service could not be reached at all.
    #[error("could not reach server: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("local cache error: {0}")]
    Cache(String),

    #[error("not signed in")]
    NotSignedIn,
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Http { status: 401, .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
