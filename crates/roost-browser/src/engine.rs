//! Chromium-backed implementation of the automation surface.
//!
//! Each surface owns a dedicated browser process with its own user data
//! directory, so concurrent logins never share state. Request headers are
//! captured off the CDP network event stream as the page makes requests.

use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use crate::surface::{Locator, Surface, SurfaceFactory};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Opens Chromium surfaces.
#[derive(Debug, Clone)]
pub struct ChromiumFactory {
    fingerprint: FingerprintConfig,
}

impl ChromiumFactory {
    /// Factory with a randomized fingerprint shared by its surfaces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fingerprint: FingerprintConfig::randomized(),
        }
    }

    /// Factory with a specific fingerprint.
    #[must_use]
    pub fn with_fingerprint(fingerprint: FingerprintConfig) -> Self {
        Self { fingerprint }
    }
}

impl Default for ChromiumFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SurfaceFactory for ChromiumFactory {
    async fn open(
        &self,
        profile_dir: &Path,
        user_agent: &str,
        headless: bool,
    ) -> Result<Box<dyn Surface>> {
        let surface =
            ChromiumSurface::launch(&self.fingerprint, profile_dir, user_agent, headless).await?;
        Ok(Box::new(surface))
    }
}

/// One Chromium session.
pub struct ChromiumSurface {
    browser: Mutex<Browser>,
    page: Page,
    captured_headers: Arc<RwLock<HashMap<String, String>>>,
    handler_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
}

impl ChromiumSurface {
    async fn launch(
        fingerprint: &FingerprintConfig,
        profile_dir: &Path,
        user_agent: &str,
        headless: bool,
    ) -> Result<Self> {
        let window_size = format!(
            "--window-size={},{}",
            fingerprint.viewport_width, fingerprint.viewport_height
        );
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .args(vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                window_size,
            ]);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP connection until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        page.set_user_agent(user_agent)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        page.execute(SetTimezoneOverrideParams::new(fingerprint.timezone.clone()))
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("timezone override: {e}")))?;

        let captured_headers = Arc::new(RwLock::new(HashMap::new()));
        let listener_task = spawn_header_capture(&page, Arc::clone(&captured_headers)).await?;

        tracing::debug!(profile = %profile_dir.display(), headless, "Chromium surface opened");

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            captured_headers,
            handler_task,
            listener_task,
        })
    }

    /// Resolve a locator to a live element handle.
    async fn locate(&self, locator: &Locator) -> Result<Element> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::Text(text) => {
                let needle = text.replace('\'', "\\'");
                let xpath = format!(
                    "//*[contains(text(), '{needle}') \
                     or contains(@placeholder, '{needle}') \
                     or contains(@aria-label, '{needle}')]"
                );
                self.page.find_xpath(xpath).await
            }
        };

        found.map_err(|_| BrowserError::ElementNotFound(locator.to_string()))
    }
}

#[async_trait::async_trait]
impl Surface for ChromiumSurface {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.locate(locator).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::debug!(%locator, ?timeout, "Element did not appear");
                return Ok(false);
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.locate(locator).await?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("click {locator}: {e}")))?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.locate(locator).await?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("focus {locator}: {e}")))?;
        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("type into {locator}: {e}")))?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        let element = self.locate(locator).await?;
        let point = element
            .clickable_point()
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("hover {locator}: {e}")))?;

        let cmd = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(point.x)
            .y(point.y)
            .build()
            .map_err(BrowserError::ChromiumError)?;
        self.page
            .execute(cmd)
            .await
            .map_err(|e| BrowserError::ChromiumError(format!("hover {locator}: {e}")))?;
        Ok(())
    }

    async fn cookies(&self) -> Result<HashMap<String, String>> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::CaptureError(format!("cookies: {e}")))?;

        Ok(cookies
            .into_iter()
            .map(|cookie| (cookie.name, cookie.value))
            .collect())
    }

    async fn headers(&self) -> Result<HashMap<String, String>> {
        Ok(self.captured_headers.read().await.clone())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::CaptureError(format!("screenshot: {e}")))?;

        tokio::fs::write(path, bytes).await?;
        tracing::debug!(path = %path.display(), "Screenshot written");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.listener_task.abort();
        let result = self.browser.lock().await.close().await;
        self.handler_task.abort();
        result.map_err(|e| BrowserError::ChromiumError(format!("close: {e}")))?;
        Ok(())
    }
}

/// Subscribe to outgoing-request events and fold their headers into `sink`.
///
/// Later requests overwrite earlier values, so the map converges on the
/// headers the page sends once a session is established.
async fn spawn_header_capture(
    page: &Page,
    sink: Arc<RwLock<HashMap<String, String>>>,
) -> Result<JoinHandle<()>> {
    let mut events = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| BrowserError::CaptureError(format!("header listener: {e}")))?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let Ok(serde_json::Value::Object(header_map)) =
                serde_json::to_value(&event.request.headers)
            else {
                continue;
            };
            let mut captured = sink.write().await;
            for (name, value) in header_map {
                if let Some(value) = value.as_str() {
                    captured.insert(name.to_lowercase(), value.to_string());
                }
            }
        }
    }))
}
