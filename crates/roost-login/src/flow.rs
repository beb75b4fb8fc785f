//! The login state machine.
//!
//! Drives one attempt across the platform's challenge flow. Challenges are
//! optional and may appear in any order the platform chooses; each is probed
//! with a short wait and skipped when absent. Required steps use longer
//! waits and fail the attempt when they never appear.

use crate::error::{LoginError, Result};
use crate::totp::totp_now;
use roost_browser::{Locator, Surface};
use roost_mail::CodeSource;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const LOGIN_URL: &str = "https://x.com/i/flow/login";

const USERNAME_INPUT_TEXT: &str = "Phone, email, or username";
const NEXT_BUTTON_TEXT: &str = "Next";
const CODE_INPUT_CSS: &str = "input[data-testid='ocfEnterTextTextInput']";
const EMAIL_CHALLENGE_TEXT: &str = "Check your email";
const PASSWORD_INPUT_CSS: &str = "input[type='password']";
const LOGIN_BUTTON_CSS: &str = "button[data-testid='LoginForm_Login_Button']";
const WRONG_PASSWORD_TEXT: &str = "Wrong password";
const MFA_CHALLENGE_TEXT: &str = "Enter your verification code";
const MFA_INPUT_CSS: &str = "input[data-testid='ocfEnterTextTextInput'][inputmode='numeric']";
const LANDMARK_TEXT: &str = "What is happening?!";

const PAGE_LOAD_WINDOW: Duration = Duration::from_secs(30);
const CHALLENGE_PROBE_WINDOW: Duration = Duration::from_secs(5);
const PASSWORD_WINDOW: Duration = Duration::from_secs(10);
const REJECTION_PROBE_WINDOW: Duration = Duration::from_secs(3);
const LANDMARK_WINDOW: Duration = Duration::from_secs(30);

/// Where one attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Start,
    UsernameEntered,
    EmailChallenge,
    PasswordEntered,
    PostPasswordEmailChallenge,
    MfaChallenge,
    Authenticated,
}

/// What a successful attempt yields: the replayable session.
#[derive(Debug, Clone, Default)]
pub struct SessionArtifacts {
    pub cookies: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

/// One login attempt over a surface.
pub struct LoginFlow<'a> {
    surface: &'a dyn Surface,
    code_source: Option<&'a dyn CodeSource>,
    username: &'a str,
    password: &'a str,
    email: &'a str,
    mfa_seed: Option<&'a str>,
    failure_screenshot: Option<PathBuf>,
}

impl<'a> LoginFlow<'a> {
    pub fn new(
        surface: &'a dyn Surface,
        code_source: Option<&'a dyn CodeSource>,
        username: &'a str,
        password: &'a str,
        email: &'a str,
    ) -> Self {
        Self {
            surface,
            code_source,
            username,
            password,
            email,
            mfa_seed: None,
            failure_screenshot: None,
        }
    }

    /// Seed for the TOTP challenge, when the account has one.
    #[must_use]
    pub fn with_mfa_seed(mut self, seed: Option<&'a str>) -> Self {
        self.mfa_seed = seed;
        self
    }

    /// Where to drop a diagnostic screenshot when the final landmark never
    /// appears.
    #[must_use]
    pub fn with_failure_screenshot(mut self, path: Option<PathBuf>) -> Self {
        self.failure_screenshot = path;
        self
    }

    /// Drive the machine from `Start` to `Authenticated`.
    pub async fn run(&self) -> Result<SessionArtifacts> {
        let mut state = LoginState::Start;
        loop {
            tracing::debug!(username = self.username, ?state, "Login state");
            state = match state {
                LoginState::Start => self.enter_username().await?,
                LoginState::UsernameEntered => {
                    if self.probe(Locator::css(CODE_INPUT_CSS)).await? {
                        LoginState::EmailChallenge
                    } else {
                        self.enter_password().await?
                    }
                }
                LoginState::EmailChallenge => {
                    self.solve_email_challenge().await?;
                    self.enter_password().await?
                }
                LoginState::PasswordEntered => {
                    // The rejection probe rides alongside the first challenge
                    // probe, so a clean login pays no extra wait for it.
                    let rejection_locator = Locator::text(WRONG_PASSWORD_TEXT);
                    let challenge_locator = Locator::text(EMAIL_CHALLENGE_TEXT);
                    let (rejected, email_challenge) = tokio::join!(
                        self.surface.wait_for(
                            &rejection_locator,
                            REJECTION_PROBE_WINDOW,
                        ),
                        self.surface.wait_for(
                            &challenge_locator,
                            CHALLENGE_PROBE_WINDOW,
                        ),
                    );
                    if rejected? {
                        tracing::warn!(username = self.username, "Password rejected");
                        return Err(LoginError::CredentialsRejected);
                    }
                    if email_challenge? {
                        LoginState::PostPasswordEmailChallenge
                    } else if self.probe(Locator::text(MFA_CHALLENGE_TEXT)).await? {
                        LoginState::MfaChallenge
                    } else {
                        self.await_landmark().await?
                    }
                }
                LoginState::PostPasswordEmailChallenge => {
                    self.solve_email_challenge().await?;
                    if self.probe(Locator::text(MFA_CHALLENGE_TEXT)).await? {
                        LoginState::MfaChallenge
                    } else {
                        self.await_landmark().await?
                    }
                }
                LoginState::MfaChallenge => {
                    self.solve_mfa_challenge().await?;
                    self.await_landmark().await?
                }
                LoginState::Authenticated => break,
            };
        }

        let cookies = self.surface.cookies().await?;
        let headers = self.surface.headers().await?;
        tracing::info!(
            username = self.username,
            cookies = cookies.len(),
            headers = headers.len(),
            "Session artifacts captured"
        );
        Ok(SessionArtifacts { cookies, headers })
    }

    /// Short wait for an optional challenge marker.
    async fn probe(&self, locator: Locator) -> Result<bool> {
        Ok(self.surface.wait_for(&locator, CHALLENGE_PROBE_WINDOW).await?)
    }

    async fn enter_username(&self) -> Result<LoginState> {
        self.surface.navigate(LOGIN_URL).await?;

        let username_input = Locator::text(USERNAME_INPUT_TEXT);
        if !self.surface.wait_for(&username_input, PAGE_LOAD_WINDOW).await? {
            return Err(LoginError::PageLoad(
                "username input never rendered".to_string(),
            ));
        }

        self.surface.type_text(&username_input, self.username).await?;
        self.surface.click(&Locator::text(NEXT_BUTTON_TEXT)).await?;
        Ok(LoginState::UsernameEntered)
    }

    async fn enter_password(&self) -> Result<LoginState> {
        let password_input = Locator::css(PASSWORD_INPUT_CSS);
        if !self.surface.wait_for(&password_input, PASSWORD_WINDOW).await? {
            return Err(LoginError::ElementMissing("password input".to_string()));
        }

        self.surface.type_text(&password_input, self.password).await?;

        let login_button = Locator::css(LOGIN_BUTTON_CSS);
        self.surface.hover(&login_button).await?;
        self.surface.click(&login_button).await?;
        Ok(LoginState::PasswordEntered)
    }

    /// Fetch a confirmation code from the mailbox and submit it.
    ///
    /// Safe to hit twice in one attempt: every call is an independent poll.
    async fn solve_email_challenge(&self) -> Result<()> {
        let source = self.code_source.ok_or_else(|| {
            LoginError::EmailAuth(format!(
                "challenge for {} but no retrieval channel configured",
                self.email
            ))
        })?;

        tracing::info!(username = self.username, "Email challenge, polling mailbox");
        let code = source.fetch_code().await?;

        let code_input = Locator::css(CODE_INPUT_CSS);
        if !self.surface.wait_for(&code_input, CHALLENGE_PROBE_WINDOW).await? {
            return Err(LoginError::ElementMissing(
                "confirmation code input".to_string(),
            ));
        }
        self.surface.type_text(&code_input, &code).await?;
        self.surface.click(&Locator::text(NEXT_BUTTON_TEXT)).await?;
        Ok(())
    }

    async fn solve_mfa_challenge(&self) -> Result<()> {
        let seed = self.mfa_seed.ok_or(LoginError::MfaSeedMissing)?;
        // Derive at submission time so the window matches
        let code = totp_now(seed)?;

        tracing::info!(username = self.username, "MFA challenge, submitting TOTP");
        let code_input = Locator::css(MFA_INPUT_CSS);
        if !self.surface.wait_for(&code_input, CHALLENGE_PROBE_WINDOW).await? {
            return Err(LoginError::ElementMissing("TOTP input".to_string()));
        }
        self.surface.type_text(&code_input, &code).await?;
        self.surface.click(&Locator::text(NEXT_BUTTON_TEXT)).await?;
        Ok(())
    }

    async fn await_landmark(&self) -> Result<LoginState> {
        let landmark = Locator::text(LANDMARK_TEXT);
        if self.surface.wait_for(&landmark, LANDMARK_WINDOW).await? {
            return Ok(LoginState::Authenticated);
        }

        if let Some(path) = &self.failure_screenshot {
            if let Err(e) = self.surface.screenshot(path).await {
                tracing::warn!("Failed to capture diagnostic screenshot: {e}");
            } else {
                tracing::info!(path = %path.display(), "Diagnostic screenshot captured");
            }
        }
        Err(LoginError::ElementMissing(
            "home timeline landmark".to_string(),
        ))
    }
}
