//! The automation surface: the capability the login orchestrator drives.
//!
//! A [`Surface`] is one isolated browser session. The orchestrator never
//! touches a browser type directly; it works through this trait so tests can
//! substitute a scripted page.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// How an element is addressed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector.
    Css(String),
    /// Visible text, placeholder, or accessible label containing the string.
    Text(String),
}

impl Locator {
    /// CSS selector locator.
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Text-content locator.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(sel) => write!(f, "css={sel}"),
            Self::Text(text) => write!(f, "text={text}"),
        }
    }
}

/// One isolated, drivable browser session.
///
/// `wait_for` returning `Ok(false)` is the ordinary signal that an optional
/// page element never appeared; only transport-level failures are errors.
#[async_trait::async_trait]
pub trait Surface: Send + Sync {
    /// Navigate to a URL and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Poll for an element until it appears or `timeout` elapses.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool>;

    /// Click an element. Errors if it is not present.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Type text into an element. Errors if it is not present.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Move the pointer over an element without clicking.
    async fn hover(&self, locator: &Locator) -> Result<()>;

    /// Cookies currently held by the session, as name/value pairs.
    async fn cookies(&self) -> Result<HashMap<String, String>>;

    /// Request headers the session has been observed sending.
    async fn headers(&self) -> Result<HashMap<String, String>>;

    /// Write a screenshot of the current viewport to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Tear the session down. Must be called even after failures.
    async fn close(&self) -> Result<()>;
}

/// Opens fresh surfaces. Each login attempt gets its own.
#[async_trait::async_trait]
pub trait SurfaceFactory: Send + Sync {
    /// Open a new session with its own profile directory and user agent.
    async fn open(
        &self,
        profile_dir: &Path,
        user_agent: &str,
        headless: bool,
    ) -> Result<Box<dyn Surface>>;
}
