use thiserror::Error;

/// Everything the storefront can report back to the shopper.
///
/// The `Display` text is what gets shown, so `Api` renders as the bare detail
/// returned by the service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Please log in first")]
    NotLoggedIn,

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Session file error: {0}")]
    SessionIo(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    SessionFormat(#[from] serde_json::Error),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    /// True when the shopper has to log in (again) before retrying.
    pub fn needs_login(&self) -> bool {
        matches!(self, ClientError::NotLoggedIn | ClientError::SessionExpired)
    }
}
