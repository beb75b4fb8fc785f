//! End-to-end login flow tests over a scripted surface.

use async_trait::async_trait;
use roost_browser::{BrowserError, Locator, Surface, SurfaceFactory};
use roost_core::{Account, AppConfig};
use roost_login::login;
use roost_mail::{CodeSource, MailError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A page whose elements are a fixed set; wait_for is instant membership.
#[derive(Default)]
struct ScriptedPage {
    elements: Vec<String>,
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
    actions: Mutex<Vec<String>>,
    screenshots: Mutex<Vec<PathBuf>>,
    closed: Arc<AtomicUsize>,
}

impl ScriptedPage {
    fn has(&self, locator: &Locator) -> bool {
        self.elements.contains(&locator.to_string())
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl Surface for ScriptedPage {
    async fn navigate(&self, url: &str) -> roost_browser::Result<()> {
        self.record(format!("navigate {url}"));
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, _timeout: Duration) -> roost_browser::Result<bool> {
        Ok(self.has(locator))
    }

    async fn click(&self, locator: &Locator) -> roost_browser::Result<()> {
        if !self.has(locator) {
            return Err(BrowserError::ElementNotFound(locator.to_string()));
        }
        self.record(format!("click {locator}"));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> roost_browser::Result<()> {
        if !self.has(locator) {
            return Err(BrowserError::ElementNotFound(locator.to_string()));
        }
        self.record(format!("type {locator} = {text}"));
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> roost_browser::Result<()> {
        if !self.has(locator) {
            return Err(BrowserError::ElementNotFound(locator.to_string()));
        }
        self.record(format!("hover {locator}"));
        Ok(())
    }

    async fn cookies(&self) -> roost_browser::Result<HashMap<String, String>> {
        Ok(self.cookies.clone())
    }

    async fn headers(&self) -> roost_browser::Result<HashMap<String, String>> {
        Ok(self.headers.clone())
    }

    async fn screenshot(&self, path: &Path) -> roost_browser::Result<()> {
        self.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> roost_browser::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out scripted pages and counts opens/closes.
struct ScriptedFactory {
    elements: Vec<String>,
    cookies: HashMap<String, String>,
    headers: HashMap<String, String>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    last_actions: Arc<Mutex<Vec<String>>>,
    last_screenshots: Arc<Mutex<Vec<PathBuf>>>,
    user_agents: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    fn new(elements: &[&str]) -> Self {
        let mut cookies = HashMap::new();
        cookies.insert("auth_token".to_string(), "tok".to_string());
        cookies.insert("ct0".to_string(), "csrf".to_string());

        let mut headers = HashMap::new();
        headers.insert("authorization".to_string(), "Bearer abc".to_string());

        Self {
            elements: elements.iter().map(ToString::to_string).collect(),
            cookies,
            headers,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            last_actions: Arc::new(Mutex::new(Vec::new())),
            last_screenshots: Arc::new(Mutex::new(Vec::new())),
            user_agents: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn actions(&self) -> Vec<String> {
        self.last_actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SurfaceFactory for ScriptedFactory {
    async fn open(
        &self,
        _profile_dir: &Path,
        user_agent: &str,
        _headless: bool,
    ) -> roost_browser::Result<Box<dyn Surface>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.user_agents.lock().unwrap().push(user_agent.to_string());
        Ok(Box::new(RecordingPage {
            inner: ScriptedPage {
                elements: self.elements.clone(),
                cookies: self.cookies.clone(),
                headers: self.headers.clone(),
                closed: Arc::clone(&self.closed),
                ..Default::default()
            },
            sink: Arc::clone(&self.last_actions),
            screenshot_sink: Arc::clone(&self.last_screenshots),
        }))
    }
}

/// Forwards to a scripted page while mirroring actions into the factory.
struct RecordingPage {
    inner: ScriptedPage,
    sink: Arc<Mutex<Vec<String>>>,
    screenshot_sink: Arc<Mutex<Vec<PathBuf>>>,
}

#[async_trait]
impl Surface for RecordingPage {
    async fn navigate(&self, url: &str) -> roost_browser::Result<()> {
        self.inner.navigate(url).await?;
        self.sink.lock().unwrap().push(format!("navigate {url}"));
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> roost_browser::Result<bool> {
        self.inner.wait_for(locator, timeout).await
    }

    async fn click(&self, locator: &Locator) -> roost_browser::Result<()> {
        self.inner.click(locator).await?;
        self.sink.lock().unwrap().push(format!("click {locator}"));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> roost_browser::Result<()> {
        self.inner.type_text(locator, text).await?;
        self.sink
            .lock()
            .unwrap()
            .push(format!("type {locator} = {text}"));
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> roost_browser::Result<()> {
        self.inner.hover(locator).await
    }

    async fn cookies(&self) -> roost_browser::Result<HashMap<String, String>> {
        self.inner.cookies().await
    }

    async fn headers(&self) -> roost_browser::Result<HashMap<String, String>> {
        self.inner.headers().await
    }

    async fn screenshot(&self, path: &Path) -> roost_browser::Result<()> {
        self.inner.screenshot(path).await?;
        self.screenshot_sink.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> roost_browser::Result<()> {
        self.inner.close().await
    }
}

/// A mailbox that always yields the same code.
struct FixedCode(&'static str);

#[async_trait]
impl CodeSource for FixedCode {
    async fn fetch_code(&self) -> roost_mail::Result<String> {
        Ok(self.0.to_string())
    }
}

/// A mailbox whose polling always comes up empty.
struct EmptyMailbox;

#[async_trait]
impl CodeSource for EmptyMailbox {
    async fn fetch_code(&self) -> roost_mail::Result<String> {
        Err(MailError::CodeNotFound)
    }
}

const USERNAME_INPUT: &str = "text=Phone, email, or username";
const NEXT_BUTTON: &str = "text=Next";
const CODE_INPUT: &str = "css=input[data-testid='ocfEnterTextTextInput']";
const EMAIL_CHALLENGE: &str = "text=Check your email";
const PASSWORD_INPUT: &str = "css=input[type='password']";
const LOGIN_BUTTON: &str = "css=button[data-testid='LoginForm_Login_Button']";
const WRONG_PASSWORD: &str = "text=Wrong password";
const MFA_CHALLENGE: &str = "text=Enter your verification code";
const MFA_INPUT: &str = "css=input[data-testid='ocfEnterTextTextInput'][inputmode='numeric']";
const LANDMARK: &str = "text=What is happening?!";

const HAPPY_PATH: &[&str] = &[
    USERNAME_INPUT,
    NEXT_BUTTON,
    PASSWORD_INPUT,
    LOGIN_BUTTON,
    LANDMARK,
];

fn test_config(tmp: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.login.retry_delay_secs = 0;
    config.login.profile_dir = Some(tmp.path().join("profiles"));
    config.login.screenshot_dir = Some(tmp.path().join("shots"));
    config
}

fn test_account() -> Account {
    Account::new("alice", "hunter2", "alice@example.org", "mail-pw", "test-ua")
}

#[tokio::test]
async fn login_without_challenges_activates_account() {
    let tmp = tempfile::TempDir::new().unwrap();
    let factory = ScriptedFactory::new(HAPPY_PATH);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(account.active);
    assert!(account.error_msg.is_none());
    assert_eq!(account.cookies["auth_token"], "tok");
    assert_eq!(account.headers["authorization"], "Bearer abc");
    assert_eq!(factory.opened(), 1);
    assert_eq!(factory.closed(), 1);

    let actions = factory.actions();
    assert!(actions.iter().any(|a| a == "type text=Phone, email, or username = alice"));
    assert!(actions
        .iter()
        .any(|a| a == "type css=input[type='password'] = hunter2"));
}

#[tokio::test]
async fn already_active_account_is_left_alone() {
    let tmp = tempfile::TempDir::new().unwrap();
    let factory = ScriptedFactory::new(&[]);

    let mut acc = test_account();
    acc.active = true;
    let account = login(&factory, acc, &test_config(&tmp)).await;

    assert!(account.active);
    assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn email_challenge_submits_retrieved_code() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(CODE_INPUT);
    let factory = ScriptedFactory::new(&elements);

    // Exercise the flow directly so the code source can be substituted
    let surface = factory
        .open(tmp.path(), "test-ua", true)
        .await
        .expect("open surface");
    let mailbox = FixedCode("907712");
    let flow = roost_login::LoginFlow::new(
        surface.as_ref(),
        Some(&mailbox),
        "alice",
        "hunter2",
        "alice@example.org",
    );

    let artifacts = flow.run().await.expect("login flow");
    assert!(artifacts.cookies.contains_key("auth_token"));

    let actions = factory.actions();
    assert!(actions
        .iter()
        .any(|a| a == "type css=input[data-testid='ocfEnterTextTextInput'] = 907712"));
}

#[tokio::test]
async fn email_challenge_without_channel_fails_hard() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(CODE_INPUT);
    let factory = ScriptedFactory::new(&elements);

    let surface = factory.open(tmp.path(), "test-ua", true).await.unwrap();
    let flow = roost_login::LoginFlow::new(
        surface.as_ref(),
        None,
        "alice",
        "hunter2",
        "alice@example.org",
    );

    let err = flow.run().await.unwrap_err();
    assert!(matches!(err, roost_login::LoginError::EmailAuth(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn empty_mailbox_surfaces_code_not_found() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(CODE_INPUT);
    let factory = ScriptedFactory::new(&elements);

    let surface = factory.open(tmp.path(), "test-ua", true).await.unwrap();
    let mailbox = EmptyMailbox;
    let flow = roost_login::LoginFlow::new(
        surface.as_ref(),
        Some(&mailbox),
        "alice",
        "hunter2",
        "alice@example.org",
    );

    let err = flow.run().await.unwrap_err();
    assert!(matches!(err, roost_login::LoginError::CodeNotFound));
}

#[tokio::test]
async fn empty_user_agent_gets_a_generated_one() {
    let tmp = tempfile::TempDir::new().unwrap();
    let factory = ScriptedFactory::new(HAPPY_PATH);

    let mut acc = test_account();
    acc.user_agent = String::new();
    let account = login(&factory, acc, &test_config(&tmp)).await;

    assert!(account.active);
    assert!(account.user_agent.contains("Mozilla"));
    let agents = factory.user_agents.lock().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0], account.user_agent);
}

#[tokio::test]
async fn wrong_password_is_not_retried() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(WRONG_PASSWORD);
    let factory = ScriptedFactory::new(&elements);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert_eq!(account.error_msg.as_deref(), Some("credentials rejected"));
    assert_eq!(factory.opened(), 1, "rejection must not burn more attempts");
    assert_eq!(factory.closed(), 1);
}

#[tokio::test]
async fn rejection_wins_over_simultaneous_challenge() {
    let tmp = tempfile::TempDir::new().unwrap();
    // Both the rejection banner and a challenge heading are visible at once
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(WRONG_PASSWORD);
    elements.push(EMAIL_CHALLENGE);
    let factory = ScriptedFactory::new(&elements);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert_eq!(account.error_msg.as_deref(), Some("credentials rejected"));
    assert_eq!(factory.opened(), 1);
}

#[tokio::test]
async fn page_load_failure_retries_with_fresh_surfaces() {
    let tmp = tempfile::TempDir::new().unwrap();
    // No username input: every attempt dies at page load
    let factory = ScriptedFactory::new(&[NEXT_BUTTON]);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert!(account.error_msg.unwrap().contains("failed to load"));
    assert_eq!(factory.opened(), 3);
    assert_eq!(factory.closed(), 3, "every surface must be torn down");
}

#[tokio::test]
async fn password_input_timeout_exhausts_attempt_budget() {
    let tmp = tempfile::TempDir::new().unwrap();
    // Username step works, the password form never renders
    let factory = ScriptedFactory::new(&[USERNAME_INPUT, NEXT_BUTTON]);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert!(account.error_msg.unwrap().contains("password input"));
    assert_eq!(factory.opened(), 3);
    assert_eq!(factory.closed(), 3);
}

#[tokio::test]
async fn mfa_challenge_without_seed_fails_hard() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(MFA_CHALLENGE);
    elements.push(MFA_INPUT);
    let factory = ScriptedFactory::new(&elements);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert_eq!(account.error_msg.as_deref(), Some("account has no MFA seed"));
    assert_eq!(factory.opened(), 1);
}

#[tokio::test]
async fn mfa_challenge_submits_totp() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(MFA_CHALLENGE);
    elements.push(MFA_INPUT);
    let factory = ScriptedFactory::new(&elements);

    let mut acc = test_account();
    acc.mfa_seed = Some("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".to_string());
    let account = login(&factory, acc, &test_config(&tmp)).await;

    assert!(account.active);
    let mfa_prefix = format!("type {MFA_INPUT} = ");
    let typed_code = factory
        .actions()
        .iter()
        .find_map(|a| a.strip_prefix(&mfa_prefix).map(ToString::to_string))
        .expect("a code was typed");
    assert_eq!(typed_code.len(), 6);
    assert!(typed_code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn landmark_missing_captures_screenshot_and_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    // Everything works until the home timeline never shows up
    let factory = ScriptedFactory::new(&[
        USERNAME_INPUT,
        NEXT_BUTTON,
        PASSWORD_INPUT,
        LOGIN_BUTTON,
    ]);

    let account = login(&factory, test_account(), &test_config(&tmp)).await;

    assert!(!account.active);
    assert!(account.error_msg.unwrap().contains("landmark"));
    let shots = factory.last_screenshots.lock().unwrap();
    assert!(!shots.is_empty(), "diagnostic screenshot expected");
    assert!(shots[0].to_string_lossy().contains("alice"));
}

#[tokio::test]
async fn post_password_email_challenge_is_solved() {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut elements = HAPPY_PATH.to_vec();
    elements.push(EMAIL_CHALLENGE);
    elements.push(CODE_INPUT);
    let factory = ScriptedFactory::new(&elements);

    let surface = factory.open(tmp.path(), "test-ua", true).await.unwrap();
    let mailbox = FixedCode("118822");
    let flow = roost_login::LoginFlow::new(
        surface.as_ref(),
        Some(&mailbox),
        "alice",
        "hunter2",
        "alice@example.org",
    );

    let artifacts = flow.run().await.expect("login flow");
    assert!(artifacts.headers.contains_key("authorization"));
    assert!(factory
        .actions()
        .iter()
        .any(|a| a.ends_with("= 118822")));
}
