//! Gmail REST retrieval channel.
//!
//! Refreshes the OAuth access token, lists unread messages, and scans
//! each raw message's headers for the confirmation-code pattern.

use crate::code::{extract_code, header_value, parse_message_date};
use crate::error::{MailError, Result};
use crate::poll_backoff;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use roost_core::GmailCredentials;
use serde::Deserialize;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const LIST_PAGE_SIZE: u32 = 5;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    raw: String,
}

/// Gmail API client for one account's mailbox.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    credentials: GmailCredentials,
    poll_attempts: u32,
    poll_base_delay: std::time::Duration,
}

impl GmailClient {
    /// Build a client from an account's stored OAuth bundle.
    ///
    /// # Errors
    /// Returns `MailError::Auth` when the bundle has no refresh token, since
    /// the access token cannot be renewed without one.
    pub fn new(
        credentials: GmailCredentials,
        poll_attempts: u32,
        poll_base_delay: std::time::Duration,
    ) -> Result<Self> {
        if credentials.refresh_token.is_empty() {
            return Err(MailError::Auth(
                "gmail credentials carry no refresh token".to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            credentials,
            poll_attempts,
            poll_base_delay,
        })
    }

    /// Exchange the refresh token for a fresh access token.
    async fn refresh_access_token(&self) -> Result<String> {
        tracing::debug!("Refreshing gmail access token");

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Auth(format!(
                "token refresh rejected ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// List unread message ids, newest first, bounded to one small page.
    async fn list_unread(&self, access_token: &str) -> Result<Vec<String>> {
        let url = format!("{API_BASE}/messages?labelIds=UNREAD&maxResults={LIST_PAGE_SIZE}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let list: MessageList = check_response(response).await?.json().await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    /// Fetch one message in raw form and decode its RFC 822 bytes.
    async fn get_raw(&self, access_token: &str, id: &str) -> Result<Vec<u8>> {
        let url = format!("{API_BASE}/messages/{id}?format=raw");
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let message: RawMessage = check_response(response).await?.json().await?;

        // Gmail emits base64url; padding presence varies
        URL_SAFE_NO_PAD
            .decode(&message.raw)
            .or_else(|_| URL_SAFE.decode(&message.raw))
            .map_err(|e| MailError::Decode(format!("message {id}: {e}")))
    }

    /// Scan one raw message for a confirmation code.
    fn scan_message(id: &str, raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let from = header_value(&text, "From")?;
        let subject = header_value(&text, "Subject")?;

        if let Some(date) = header_value(&text, "Date") {
            if let Some(parsed) = parse_message_date(&date) {
                tracing::trace!(message = id, date = %parsed, "Candidate message");
            }
        }

        extract_code(&from, &subject)
    }

    /// Poll the mailbox until a confirmation code shows up.
    ///
    /// Transient API failures and empty inboxes are retried with jittered
    /// exponential backoff; auth failures abort immediately.
    pub async fn fetch_code(&self) -> Result<String> {
        let access_token = self.refresh_access_token().await?;

        for attempt in 1..=self.poll_attempts {
            tracing::debug!(attempt, total = self.poll_attempts, "Polling gmail inbox");

            match self.poll_once(&access_token).await {
                Ok(Some(code)) => return Ok(code),
                Ok(None) => {}
                Err(e) if e.is_transient() => {
                    tracing::warn!("Transient gmail error on attempt {attempt}: {e}");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.poll_attempts {
                tokio::time::sleep(poll_backoff(self.poll_base_delay, attempt)).await;
            }
        }

        Err(MailError::CodeNotFound)
    }

    async fn poll_once(&self, access_token: &str) -> Result<Option<String>> {
        for id in self.list_unread(access_token).await? {
            let raw = self.get_raw(access_token, &id).await?;
            if let Some(code) = Self::scan_message(&id, &raw) {
                tracing::info!("Confirmation code found in gmail message {id}");
                return Ok(Some(code));
            }
        }
        Ok(None)
    }
}

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(MailError::Auth(format!("gmail API ({status}): {message}")));
    }
    Err(MailError::Api {
        status: status.as_u16(),
        message,
    })
}
