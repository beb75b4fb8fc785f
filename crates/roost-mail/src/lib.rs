//! Verification-code retrieval.
//!
//! Login challenges are answered with a code mailed to the account's
//! address. Two channels recover it: the Gmail REST API (when the account
//! carries an OAuth bundle) and plain IMAP. Both apply the same message
//! heuristic and the same bounded, jittered polling.

pub mod code;
pub mod error;
pub mod gmail;
pub mod imap;
pub mod retriever;

pub use code::{extract_code, parse_message_date};
pub use error::{MailError, Result};
pub use gmail::GmailClient;
pub use imap::ImapPoller;
pub use retriever::{CodeRetriever, CodeSource};

use rand::Rng;
use std::time::Duration;

/// Delay before the next poll: exponential in the attempt number with up to
/// a second of jitter, capped so late attempts don't stall a login.
pub(crate) fn poll_backoff(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1 << attempt.saturating_sub(1).min(4));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..1000));
    (exp + jitter).min(Duration::from_secs(60))
}
