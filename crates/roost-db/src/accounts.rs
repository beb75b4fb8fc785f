//! Account row storage.
//!
//! Map-valued fields (locks, stats, headers, cookies) are stored as JSON
//! text; timestamps as RFC 3339 strings. Loading is deliberately lenient:
//! a map entry that fails to parse is dropped rather than failing the row,
//! so one corrupt value never takes the whole pool down.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use roost_core::{Account, GmailCredentials};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Insert or replace an account row keyed by username.
pub async fn save_account(pool: &SqlitePool, account: &Account) -> Result<()> {
    let locks = to_json(&lock_strings(&account.locks))?;
    let stats = to_json(&account.stats)?;
    let headers = to_json(&account.headers)?;
    let cookies = to_json(&account.cookies)?;
    let gmail = account
        .gmail_credentials
        .as_ref()
        .map(to_json)
        .transpose()?;

    sqlx::query(
        r"
        INSERT INTO accounts (
            username, password, email, email_password, user_agent, active,
            locks, stats, headers, cookies,
            gmail_credentials, mfa_seed, proxy, error_msg, last_used
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(username) DO UPDATE SET
            password = excluded.password,
            email = excluded.email,
            email_password = excluded.email_password,
            user_agent = excluded.user_agent,
            active = excluded.active,
            locks = excluded.locks,
            stats = excluded.stats,
            headers = excluded.headers,
            cookies = excluded.cookies,
            gmail_credentials = excluded.gmail_credentials,
            mfa_seed = excluded.mfa_seed,
            proxy = excluded.proxy,
            error_msg = excluded.error_msg,
            last_used = excluded.last_used
        ",
    )
    .bind(&account.username)
    .bind(&account.password)
    .bind(&account.email)
    .bind(&account.email_password)
    .bind(&account.user_agent)
    .bind(i64::from(account.active))
    .bind(locks)
    .bind(stats)
    .bind(headers)
    .bind(cookies)
    .bind(gmail)
    .bind(&account.mfa_seed)
    .bind(&account.proxy)
    .bind(&account.error_msg)
    .bind(account.last_used.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch one account by username.
pub async fn get_account(pool: &SqlitePool, username: &str) -> Result<Option<Account>> {
    let row = sqlx::query("SELECT * FROM accounts WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_account(&r)).transpose()
}

/// Fetch every stored account.
pub async fn get_all_accounts(pool: &SqlitePool) -> Result<Vec<Account>> {
    let rows = sqlx::query("SELECT * FROM accounts ORDER BY username")
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_account).collect()
}

/// Delete an account. Returns whether a row was removed.
pub async fn delete_account(pool: &SqlitePool, username: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM accounts WHERE username = ?")
        .bind(username)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Flip the active flag, optionally recording a failure diagnostic.
pub async fn set_active(
    pool: &SqlitePool,
    username: &str,
    active: bool,
    error_msg: Option<&str>,
) -> Result<()> {
    let result = sqlx::query("UPDATE accounts SET active = ?, error_msg = ? WHERE username = ?")
        .bind(i64::from(active))
        .bind(error_msg)
        .bind(username)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::AccountNotFound(username.to_string()));
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| DatabaseError::SerializationError(e.to_string()))
}

fn lock_strings(locks: &HashMap<String, DateTime<Utc>>) -> HashMap<String, String> {
    locks
        .iter()
        .map(|(queue, until)| (queue.clone(), until.to_rfc3339()))
        .collect()
}

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let username: String = row.try_get("username")?;

    let gmail_credentials = row
        .try_get::<Option<String>, _>("gmail_credentials")?
        .and_then(|raw| match serde_json::from_str::<GmailCredentials>(&raw) {
            Ok(creds) => Some(creds),
            Err(e) => {
                tracing::warn!(username = %username, "Dropping unreadable gmail credentials: {e}");
                None
            }
        });

    let last_used = row
        .try_get::<Option<String>, _>("last_used")?
        .and_then(|raw| parse_timestamp(&raw));

    Ok(Account {
        username,
        password: row.try_get("password")?,
        email: row.try_get("email")?,
        email_password: row.try_get("email_password")?,
        user_agent: row.try_get("user_agent")?,
        active: row.try_get::<i64, _>("active")? != 0,
        locks: parse_locks(&row.try_get::<String, _>("locks")?),
        stats: parse_stats(&row.try_get::<String, _>("stats")?),
        headers: parse_string_map(&row.try_get::<String, _>("headers")?),
        cookies: parse_string_map(&row.try_get::<String, _>("cookies")?),
        gmail_credentials,
        mfa_seed: row.try_get("mfa_seed")?,
        proxy: row.try_get("proxy")?,
        error_msg: row.try_get("error_msg")?,
        last_used,
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Dropping unparseable timestamp {raw:?}: {e}");
            None
        }
    }
}

fn parse_locks(raw: &str) -> HashMap<String, DateTime<Utc>> {
    let map: HashMap<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Dropping unreadable locks column: {e}");
            return HashMap::new();
        }
    };

    map.into_iter()
        .filter_map(|(queue, value)| {
            let until = value.as_str().and_then(parse_timestamp)?;
            Some((queue, until))
        })
        .collect()
}

fn parse_stats(raw: &str) -> HashMap<String, i64> {
    let map: HashMap<String, serde_json::Value> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Dropping unreadable stats column: {e}");
            return HashMap::new();
        }
    };

    map.into_iter()
        .filter_map(|(queue, value)| value.as_i64().map(|count| (queue, count)))
        .collect()
}

fn parse_string_map(raw: &str) -> HashMap<String, String> {
    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!("Dropping unreadable map column: {e}");
            HashMap::new()
        }
    }
}
