//! Shared verification-email heuristic.
//!
//! Both retrieval channels apply the same test: a message from the
//! platform's notification address whose subject announces a confirmation
//! code, with the code as the final word of the subject.

use chrono::{DateTime, FixedOffset};

const EXPECTED_SENDER: &str = "info@x.com";
const SUBJECT_MARKER: &str = "confirmation code is";

/// Extract a verification code from a message's From and Subject headers.
///
/// Returns `None` when the message is not a confirmation email.
pub fn extract_code(from: &str, subject: &str) -> Option<String> {
    if !from.to_lowercase().contains(EXPECTED_SENDER) {
        return None;
    }
    if !subject.to_lowercase().contains(SUBJECT_MARKER) {
        return None;
    }
    // e.g. "Your X confirmation code is h8k3mq"
    subject
        .split_whitespace()
        .last()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
}

/// Parse a message Date header leniently.
///
/// Mail providers append comments like `(UTC)` and some omit the weekday;
/// the value is informational only, so failures are logged and swallowed.
pub fn parse_message_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = match raw.find('(') {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    };

    DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, "%d %b %Y %H:%M:%S %z"))
        .map_err(|e| {
            tracing::debug!("Unparseable message date {raw:?}: {e}");
            e
        })
        .ok()
}

/// Pull one header value out of a raw RFC 822 header block, unfolding
/// continuation lines.
pub fn header_value(raw_headers: &str, name: &str) -> Option<String> {
    let prefix = format!("{}:", name.to_lowercase());
    let mut lines = raw_headers.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            // end of header block
            return None;
        }
        if !line.to_lowercase().starts_with(&prefix) {
            continue;
        }

        let mut value = line[prefix.len()..].trim().to_string();
        while let Some(next) = lines.peek() {
            if next.starts_with(' ') || next.starts_with('\t') {
                value.push(' ');
                value.push_str(next.trim());
                lines.next();
            } else {
                break;
            }
        }
        return Some(value);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_from_confirmation_subject() {
        let code = extract_code(
            "X <info@x.com>",
            "Your X confirmation code is h8k3mq",
        );
        assert_eq!(code.as_deref(), Some("h8k3mq"));
    }

    #[test]
    fn test_extract_code_is_case_insensitive_on_markers() {
        let code = extract_code("INFO@X.COM", "Your X Confirmation Code is 928411");
        assert_eq!(code.as_deref(), Some("928411"));
    }

    #[test]
    fn test_extract_code_rejects_other_senders() {
        assert!(extract_code("noreply@example.com", "Your confirmation code is 123").is_none());
    }

    #[test]
    fn test_extract_code_rejects_other_subjects() {
        assert!(extract_code("info@x.com", "Welcome to X").is_none());
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let date = parse_message_date("Tue, 02 Jan 2024 10:30:00 +0000").expect("parse");
        assert_eq!(date.timestamp(), 1_704_191_400);
    }

    #[test]
    fn test_parse_date_strips_trailing_comment() {
        assert!(parse_message_date("Tue, 02 Jan 2024 10:30:00 +0000 (UTC)").is_some());
    }

    #[test]
    fn test_parse_date_without_weekday() {
        assert!(parse_message_date("02 Jan 2024 10:30:00 +0000").is_some());
    }

    #[test]
    fn test_parse_date_garbage_is_none() {
        assert!(parse_message_date("not a date").is_none());
    }

    #[test]
    fn test_header_value_unfolds_continuations() {
        let raw = "From: X <info@x.com>\r\nSubject: Your X confirmation\r\n code is 42\r\n\r\nbody";
        // lines() splits on \n and keeps no \r issues for startswith checks
        let raw = raw.replace("\r\n", "\n");
        assert_eq!(
            header_value(&raw, "Subject").as_deref(),
            Some("Your X confirmation code is 42")
        );
        assert_eq!(header_value(&raw, "From").as_deref(), Some("X <info@x.com>"));
        assert!(header_value(&raw, "Date").is_none());
    }
}
