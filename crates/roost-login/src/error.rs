use roost_browser::BrowserError;
use roost_mail::MailError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoginError>;

#[derive(Debug, Error)]
pub enum LoginError {
    /// The login page never rendered its entry point.
    #[error("login page failed to load: {0}")]
    PageLoad(String),

    /// A required element never appeared within its window.
    #[error("expected element missing: {0}")]
    ElementMissing(String),

    /// Transport-level browser failure.
    #[error("browser failure: {0}")]
    Browser(#[from] BrowserError),

    /// The platform rejected the username/password pair.
    #[error("credentials rejected")]
    CredentialsRejected,

    /// The mailbox channel could not authenticate or be configured.
    #[error("email channel failed: {0}")]
    EmailAuth(String),

    /// Polling the mailbox never produced a code.
    #[error("verification code never arrived")]
    CodeNotFound,

    /// The platform asked for a TOTP but the account has no seed.
    #[error("account has no MFA seed")]
    MfaSeedMissing,

    /// The stored MFA seed could not be used.
    #[error("invalid MFA seed: {0}")]
    InvalidMfaSeed(String),
}

impl LoginError {
    /// Whether a fresh attempt on a new surface could plausibly succeed.
    ///
    /// Rejected credentials and mailbox problems will not improve by
    /// reloading the page, so they short-circuit.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PageLoad(_) | Self::ElementMissing(_) | Self::Browser(_)
        )
    }
}

impl From<MailError> for LoginError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::Auth(message) => Self::EmailAuth(message),
            MailError::CodeNotFound => Self::CodeNotFound,
            other => Self::EmailAuth(other.to_string()),
        }
    }
}
