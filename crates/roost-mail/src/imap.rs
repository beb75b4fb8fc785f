//! IMAP retrieval channel.
//!
//! The `imap` crate is synchronous, so each polling pass runs inside
//! `spawn_blocking`. One pass is connect → login → SELECT INBOX →
//! SEARCH UNSEEN → fetch headers → scan.

use crate::code::{extract_code, header_value};
use crate::error::{MailError, Result};
use crate::poll_backoff;

const IMAP_PORT: u16 = 993;

/// Map a mailbox domain to its IMAP host.
///
/// Covers the common providers; anything else falls back to the
/// `imap.<domain>` convention.
#[must_use]
pub fn imap_host_for(email: &str) -> String {
    let domain = email
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_lowercase())
        .unwrap_or_default();

    match domain.as_str() {
        "gmail.com" | "googlemail.com" => "imap.gmail.com".to_string(),
        "outlook.com" | "hotmail.com" | "live.com" => "outlook.office365.com".to_string(),
        "yahoo.com" => "imap.mail.yahoo.com".to_string(),
        "icloud.com" | "me.com" => "imap.mail.me.com".to_string(),
        "gmx.com" | "gmx.net" => "imap.gmx.net".to_string(),
        _ => format!("imap.{domain}"),
    }
}

/// IMAP poller for one account's mailbox.
#[derive(Debug, Clone)]
pub struct ImapPoller {
    host: String,
    username: String,
    password: String,
    poll_attempts: u32,
    poll_base_delay: std::time::Duration,
    poll_timeout: std::time::Duration,
}

impl ImapPoller {
    /// Build a poller from mailbox credentials, deriving the host from the
    /// address domain.
    #[must_use]
    pub fn new(
        email: &str,
        password: &str,
        poll_attempts: u32,
        poll_base_delay: std::time::Duration,
        poll_timeout: std::time::Duration,
    ) -> Self {
        Self {
            host: imap_host_for(email),
            username: email.to_string(),
            password: password.to_string(),
            poll_attempts,
            poll_base_delay,
            poll_timeout,
        }
    }

    /// One synchronous polling pass over unseen messages.
    fn poll_once(&self) -> Result<Option<String>> {
        let client = imap::ClientBuilder::new(&self.host, IMAP_PORT)
            .connect()
            .map_err(|e| MailError::Connect(format!("{}: {e}", self.host)))?;

        let mut session = client
            .login(&self.username, &self.password)
            .map_err(|(e, _)| MailError::Auth(format!("IMAP login rejected: {e}")))?;

        let mut scan = || -> Result<Option<String>> {
            session
                .select("INBOX")
                .map_err(|e| MailError::Imap(format!("select INBOX: {e}")))?;

            let uids = session
                .search("UNSEEN")
                .map_err(|e| MailError::Imap(format!("search UNSEEN: {e}")))?;

            if uids.is_empty() {
                return Ok(None);
            }

            let set = uids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let messages = session
                .fetch(&set, "RFC822.HEADER")
                .map_err(|e| MailError::Imap(format!("fetch headers: {e}")))?;

            for message in messages.iter() {
                let Some(raw) = message.header() else {
                    continue;
                };
                let text = String::from_utf8_lossy(raw);
                let (Some(from), Some(subject)) =
                    (header_value(&text, "From"), header_value(&text, "Subject"))
                else {
                    continue;
                };
                if let Some(code) = extract_code(&from, &subject) {
                    return Ok(Some(code));
                }
            }
            Ok(None)
        };

        let result = scan();
        let _ = session.logout();
        result
    }

    /// Poll the mailbox until a confirmation code shows up.
    ///
    /// Same retry shape as the Gmail channel: transient faults and empty
    /// inboxes back off and retry, login rejection aborts.
    pub async fn fetch_code(&self) -> Result<String> {
        for attempt in 1..=self.poll_attempts {
            tracing::debug!(attempt, total = self.poll_attempts, "Polling IMAP inbox");

            let poller = self.clone();
            let pass = tokio::task::spawn_blocking(move || poller.poll_once());
            // spawn_blocking cannot be cancelled; the timeout just stops
            // the login from waiting on a wedged connection
            let outcome = match tokio::time::timeout(self.poll_timeout, pass).await {
                Ok(joined) => {
                    joined.map_err(|e| MailError::Imap(format!("poll task failed: {e}")))?
                }
                Err(_) => Err(MailError::Connect(format!("{}: poll timed out", self.host))),
            };

            match outcome {
                Ok(Some(code)) => {
                    tracing::info!("Confirmation code found over IMAP");
                    return Ok(code);
                }
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    tracing::warn!("Transient IMAP error on attempt {attempt}: {e}");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.poll_attempts {
                tokio::time::sleep(poll_backoff(self.poll_base_delay, attempt)).await;
            }
        }

        Err(MailError::CodeNotFound)
    }
}
