use thiserror::Error;

pub type Result<T> = std::result::Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    /// Credentials were rejected or cannot be refreshed. Never retried.
    #[error("mailbox authentication failed: {0}")]
    Auth(String),

    /// The mail API answered with a non-success status.
    #[error("mail API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Could not reach the mail server.
    #[error("mail connection failed: {0}")]
    Connect(String),

    /// IMAP protocol error.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// A message body or header could not be decoded.
    #[error("message decode failed: {0}")]
    Decode(String),

    /// Polling exhausted without a qualifying message.
    #[error("no verification code arrived")]
    CodeNotFound,

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl MailError {
    /// Whether another poll attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Decode(_) | Self::CodeNotFound => false,
            Self::Connect(_) | Self::Imap(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
        }
    }
}
