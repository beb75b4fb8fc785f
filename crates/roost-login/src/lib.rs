//! Login orchestration.
//!
//! Repairs an account's session by driving the platform's login flow over
//! an automation surface: username, optional email challenges answered from
//! the account's mailbox, optional TOTP, then capture of the cookies and
//! headers that make the session replayable.
//!
//! The entry point is [`login`], which never returns an error: the account
//! comes back either active with fresh session artifacts or inactive with a
//! diagnostic in `error_msg`.

pub mod error;
pub mod flow;
pub mod retry;
pub mod totp;

pub use error::{LoginError, Result};
pub use flow::{LoginFlow, LoginState, SessionArtifacts, LOGIN_URL};
pub use retry::RetryPolicy;

use roost_browser::{FingerprintConfig, SurfaceFactory};
use roost_core::{Account, AppConfig};
use roost_mail::{CodeRetriever, CodeSource};
use std::path::PathBuf;

/// Log an account in, retrying per the configured policy.
///
/// No-op when the account is already active. Each attempt opens a fresh
/// surface scoped to the account's own profile directory and always closes
/// it. Failures never propagate; they land in `error_msg`.
pub async fn login(
    factory: &dyn SurfaceFactory,
    mut account: Account,
    config: &AppConfig,
) -> Account {
    if account.active {
        tracing::info!(username = %account.username, "Account already active, skipping login");
        return account;
    }

    // Accounts enrolled without a user agent get a plausible one, which
    // then travels with the account for session replay.
    if account.user_agent.is_empty() {
        account.user_agent = FingerprintConfig::random_user_agent();
        tracing::debug!(username = %account.username, "Assigned a generated user agent");
    }

    let retriever = match CodeRetriever::for_account(&account, &config.mail) {
        Ok(retriever) => Some(retriever),
        Err(e) => {
            tracing::warn!(
                username = %account.username,
                "No usable code retrieval channel: {e}"
            );
            None
        }
    };
    let code_source: Option<&dyn CodeSource> =
        retriever.as_ref().map(|r| r as &dyn CodeSource);

    let profile = profile_dir(config).join(&account.username);
    if let Err(e) = std::fs::create_dir_all(&profile) {
        tracing::warn!("Could not create profile directory: {e}");
    }
    let screenshot = screenshot_dir(config).join(format!("{}-login-failure.png", account.username));

    let policy = RetryPolicy::from_settings(&config.login);
    let outcome = policy
        .run(|attempt| {
            let profile = profile.clone();
            let screenshot = screenshot.clone();
            let account = &account;
            async move {
                tracing::info!(username = %account.username, attempt, "Starting login attempt");

                let surface = factory
                    .open(&profile, &account.user_agent, config.login.headless)
                    .await?;

                let flow = LoginFlow::new(
                    surface.as_ref(),
                    code_source,
                    &account.username,
                    &account.password,
                    &account.email,
                )
                .with_mfa_seed(account.mfa_seed.as_deref())
                .with_failure_screenshot(Some(screenshot));

                let result = flow.run().await;

                if let Err(e) = surface.close().await {
                    tracing::warn!("Surface teardown failed: {e}");
                }
                result
            }
        })
        .await;

    match outcome {
        Ok(artifacts) => {
            tracing::info!(username = %account.username, "Login succeeded");
            account.active = true;
            account.cookies = artifacts.cookies;
            account.headers = artifacts.headers;
            account.error_msg = None;
        }
        Err(e) => {
            tracing::warn!(username = %account.username, "Login failed: {e}");
            account.active = false;
            account.error_msg = Some(e.to_string());
        }
    }

    account
}

fn profile_dir(config: &AppConfig) -> PathBuf {
    match &config.login.profile_dir {
        Some(dir) => dir.clone(),
        None => AppConfig::data_dir()
            .map(|d| d.join("profiles"))
            .unwrap_or_else(|_| std::env::temp_dir().join("roost-profiles")),
    }
}

fn screenshot_dir(config: &AppConfig) -> PathBuf {
    match &config.login.screenshot_dir {
        Some(dir) => dir.clone(),
        None => AppConfig::data_dir().unwrap_or_else(|_| std::env::temp_dir().join("roost")),
    }
}
