use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timeout waiting for: {0}")]
    Timeout(String),

    #[error("session artifact capture failed: {0}")]
    CaptureError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
