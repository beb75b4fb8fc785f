//! Roost account store.
//!
//! `SQLite` persistence for the account pool, using `SQLx` with embedded
//! migrations. Accounts are plain rows keyed by username; the map-valued
//! fields travel as JSON text columns.
//!
//! # Example
//!
//! ```ignore
//! use roost_db::Database;
//!
//! let db = Database::open("accounts.db").await?;
//! let accounts = db.all_accounts().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod accounts;
pub mod connection;
pub mod error;
pub mod migrations;

pub use error::{DatabaseError, Result};

use roost_core::Account;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level store interface: opens the pool and runs migrations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (or create) the account database at `path` and apply pending
    /// migrations. Pass `:memory:` for a throwaway in-memory store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// The underlying `SQLx` pool, for direct queries.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Insert or replace an account.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        accounts::save_account(&self.pool, account).await
    }

    /// Fetch one account by username.
    pub async fn get_account(&self, username: &str) -> Result<Option<Account>> {
        accounts::get_account(&self.pool, username).await
    }

    /// Fetch every stored account.
    pub async fn all_accounts(&self) -> Result<Vec<Account>> {
        accounts::get_all_accounts(&self.pool).await
    }

    /// Delete an account. Returns whether a row was removed.
    pub async fn delete_account(&self, username: &str) -> Result<bool> {
        accounts::delete_account(&self.pool, username).await
    }

    /// Flip the active flag, optionally recording a failure diagnostic.
    pub async fn set_active(
        &self,
        username: &str,
        active: bool,
        error_msg: Option<&str>,
    ) -> Result<()> {
        accounts::set_active(&self.pool, username, active, error_msg).await
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
