//! The account record: credentials, session artifacts, and per-queue
//! rate-limit bookkeeping.
//!
//! An [`Account`] is the unit the pool gate hands out and the login
//! orchestrator repairs. Lock and stat mutation happens here; callers are
//! responsible for serializing access (the pool wraps each account in its
//! own mutex).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bearer token the platform issues to its own web client; replayed on
/// every authenticated request.
pub const BEARER_TOKEN: &str = "Bearer AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

/// OAuth credential bundle for the Gmail REST retrieval channel.
///
/// Present on an account only when mailbox-API retrieval is usable for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmailCredentials {
    /// Current access token (may be expired; refreshed on demand)
    pub token: String,
    /// Long-lived refresh token; without it retrieval fails permanently
    pub refresh_token: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Granted scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Access token expiry, informational
    #[serde(default)]
    pub expiry: String,
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/gmail.readonly".to_string()]
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// A pooled platform account.
///
/// Persisted by `roost-db`; `locks` and `stats` are keyed by logical request
/// queue (one per scraped endpoint category). A `locks` entry whose timestamp
/// is in the past counts as released; expiry is equivalent to deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Platform username
    pub username: String,
    /// Platform password
    pub password: String,
    /// Mailbox address used for verification challenges
    pub email: String,
    /// Mailbox password (IMAP channel)
    pub email_password: String,
    /// User agent the account's sessions present
    pub user_agent: String,
    /// Whether the account currently holds a usable authenticated session
    pub active: bool,
    /// Per-queue busy-until markers
    #[serde(default)]
    pub locks: HashMap<String, DateTime<Utc>>,
    /// Cumulative successful request count per queue
    #[serde(default)]
    pub stats: HashMap<String, i64>,
    /// Session headers captured at login
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Session cookies captured at login
    #[serde(default)]
    pub cookies: HashMap<String, String>,
    /// OAuth bundle for the Gmail retrieval channel, if configured
    pub gmail_credentials: Option<GmailCredentials>,
    /// Base32 TOTP seed, present only when MFA is configured
    pub mfa_seed: Option<String>,
    /// Optional per-account proxy URL
    pub proxy: Option<String>,
    /// Diagnostic from the last failed login
    pub error_msg: Option<String>,
    /// Last successful request, used for least-recently-used selection
    pub last_used: Option<DateTime<Utc>>,
}

impl Account {
    /// Enroll a new account: inactive, no session artifacts.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
        email_password: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            email_password: email_password.into(),
            user_agent: user_agent.into(),
            active: false,
            locks: HashMap::new(),
            stats: HashMap::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            gmail_credentials: None,
            mfa_seed: None,
            proxy: None,
            error_msg: None,
            last_used: None,
        }
    }

    /// Whether `queue` holds an unexpired lock at `now`.
    #[must_use]
    pub fn is_locked(&self, queue: &str, now: DateTime<Utc>) -> bool {
        self.locks.get(queue).is_some_and(|until| *until > now)
    }

    /// Mark `queue` busy until `until`. Used both for checkout cooldowns and
    /// for server-provided rate-limit reset hints.
    pub fn lock_until(&mut self, queue: &str, until: DateTime<Utc>) {
        self.locks.insert(queue.to_string(), until);
    }

    /// Release the lock on `queue` immediately.
    pub fn unlock(&mut self, queue: &str) {
        self.locks.remove(queue);
    }

    /// Drop all lock entries that have already expired.
    pub fn purge_expired_locks(&mut self, now: DateTime<Utc>) {
        self.locks.retain(|_, until| *until > now);
    }

    /// Record a successful request on `queue` at `now`.
    pub fn record_success(&mut self, queue: &str, now: DateTime<Utc>) {
        *self.stats.entry(queue.to_string()).or_insert(0) += 1;
        self.last_used = Some(now);
    }

    /// Whether the stored session artifacts look replayable.
    ///
    /// `active == true` implies non-empty headers and cookies carrying the
    /// platform session token.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.active
            && !self.headers.is_empty()
            && !self.cookies.is_empty()
            && self.cookies.contains_key("auth_token")
    }

    /// Headers sufficient to replay authenticated requests with the stored
    /// session: captured headers overlaid with the client defaults, plus the
    /// CSRF token mirrored from the `ct0` cookie.
    #[must_use]
    pub fn client_headers(&self) -> HashMap<String, String> {
        let mut headers = self.headers.clone();
        headers.insert("user-agent".to_string(), self.user_agent.clone());
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("authorization".to_string(), BEARER_TOKEN.to_string());
        headers.insert("x-twitter-active-user".to_string(), "yes".to_string());
        headers.insert("x-twitter-client-language".to_string(), "en".to_string());
        if let Some(ct0) = self.cookies.get("ct0") {
            headers.insert("x-csrf-token".to_string(), ct0.clone());
        }
        headers
    }
}
