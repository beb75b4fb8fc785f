//! Channel selection.
//!
//! The login flow consumes [`CodeSource`]; at configuration time the
//! concrete channel is picked per account: Gmail REST when an OAuth
//! bundle is stored, IMAP otherwise.

use crate::error::Result;
use crate::gmail::GmailClient;
use crate::imap::ImapPoller;
use roost_core::{Account, MailSettings};
use std::time::Duration;

/// Anything that can produce a verification code on demand.
///
/// Each call is an independent mailbox poll; a login may invoke it more
/// than once when the platform challenges twice.
#[async_trait::async_trait]
pub trait CodeSource: Send + Sync {
    /// Poll until a code arrives or polling is exhausted.
    async fn fetch_code(&self) -> Result<String>;
}

/// The configured retrieval channel for one account.
pub enum CodeRetriever {
    /// Gmail REST API with OAuth refresh.
    Gmail(GmailClient),
    /// Plain IMAP with mailbox credentials.
    Imap(ImapPoller),
}

impl CodeRetriever {
    /// Pick the channel for an account: Gmail when OAuth credentials are
    /// stored, IMAP from the mailbox password otherwise.
    pub fn for_account(account: &Account, settings: &MailSettings) -> Result<Self> {
        let base_delay = Duration::from_secs(settings.poll_base_delay_secs);

        match &account.gmail_credentials {
            Some(credentials) => {
                tracing::debug!(username = %account.username, "Using gmail code retrieval");
                Ok(Self::Gmail(GmailClient::new(
                    credentials.clone(),
                    settings.poll_attempts,
                    base_delay,
                )?))
            }
            None => {
                tracing::debug!(username = %account.username, "Using IMAP code retrieval");
                Ok(Self::Imap(ImapPoller::new(
                    &account.email,
                    &account.email_password,
                    settings.poll_attempts,
                    base_delay,
                    Duration::from_secs(settings.imap_timeout_secs),
                )))
            }
        }
    }
}

#[async_trait::async_trait]
impl CodeSource for CodeRetriever {
    async fn fetch_code(&self) -> Result<String> {
        match self {
            Self::Gmail(client) => client.fetch_code().await,
            Self::Imap(poller) => poller.fetch_code().await,
        }
    }
}
