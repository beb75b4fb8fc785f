//! The pool gate.
//!
//! Every account lives behind its own mutex, so callers working different
//! accounts never contend. A separate per-account guard serializes logins:
//! an account is never driven through the login flow twice at once, while
//! logins for different accounts proceed in parallel.
//!
//! Every mutation is written through to the store before the call returns.

use crate::error::{PoolError, Result};
use chrono::{DateTime, Duration, Utc};
use roost_browser::SurfaceFactory;
use roost_core::{Account, AppConfig, PoolSettings};
use roost_db::Database;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

struct PoolEntry {
    account: Mutex<Account>,
    login_guard: Mutex<()>,
}

/// Rate-limit-aware pool of accounts over a shared store.
pub struct AccountPool {
    db: Arc<Database>,
    cooldown: Duration,
    wait_poll: std::time::Duration,
    entries: RwLock<HashMap<String, Arc<PoolEntry>>>,
}

impl AccountPool {
    /// Load every stored account into the pool.
    pub async fn open(db: Arc<Database>, settings: &PoolSettings) -> Result<Self> {
        let mut entries = HashMap::new();
        for account in db.all_accounts().await? {
            entries.insert(
                account.username.clone(),
                Arc::new(PoolEntry {
                    account: Mutex::new(account),
                    login_guard: Mutex::new(()),
                }),
            );
        }

        tracing::info!(accounts = entries.len(), "Account pool loaded");
        Ok(Self {
            db,
            cooldown: Duration::seconds(settings.cooldown_secs.min(i64::MAX as u64) as i64),
            wait_poll: std::time::Duration::from_secs(settings.wait_poll_secs),
            entries: RwLock::new(entries),
        })
    }

    /// Enroll an account (stored as-is; typically inactive until login).
    pub async fn add_account(&self, account: Account) -> Result<()> {
        self.db.save_account(&account).await?;
        self.entries.write().await.insert(
            account.username.clone(),
            Arc::new(PoolEntry {
                account: Mutex::new(account),
                login_guard: Mutex::new(()),
            }),
        );
        Ok(())
    }

    /// Snapshot of every account in the pool.
    pub async fn accounts(&self) -> Vec<Account> {
        let entries = self.entries.read().await;
        let mut snapshot = Vec::with_capacity(entries.len());
        for entry in entries.values() {
            snapshot.push(entry.account.lock().await.clone());
        }
        snapshot.sort_by(|a, b| a.username.cmp(&b.username));
        snapshot
    }

    async fn entry(&self, username: &str) -> Result<Arc<PoolEntry>> {
        self.entries
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| PoolError::UnknownAccount(username.to_string()))
    }

    /// Try to take `queue` on one account. Returns true and starts the
    /// cooldown only when no unexpired lock exists; never blocks or waits.
    pub async fn acquire(&self, username: &str, queue: &str, now: DateTime<Utc>) -> Result<bool> {
        let entry = self.entry(username).await?;
        let mut account = entry.account.lock().await;

        if account.is_locked(queue, now) {
            return Ok(false);
        }

        account.lock_until(queue, now + self.cooldown);
        self.db.save_account(&account).await?;
        Ok(true)
    }

    /// Release `queue` on an account immediately.
    pub async fn release(&self, username: &str, queue: &str) -> Result<()> {
        let entry = self.entry(username).await?;
        let mut account = entry.account.lock().await;
        account.unlock(queue);
        self.db.save_account(&account).await?;
        Ok(())
    }

    /// Pin `queue` busy until a server-provided reset instant.
    pub async fn lock_until(
        &self,
        username: &str,
        queue: &str,
        until: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self.entry(username).await?;
        let mut account = entry.account.lock().await;
        account.lock_until(queue, until);
        self.db.save_account(&account).await?;
        Ok(())
    }

    /// Count a successful request against `queue`.
    pub async fn record_success(
        &self,
        username: &str,
        queue: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self.entry(username).await?;
        let mut account = entry.account.lock().await;
        account.record_success(queue, now);
        self.db.save_account(&account).await?;
        Ok(())
    }

    /// Least-recently-used active account with `queue` free, without taking
    /// the lock. Never-used accounts sort first.
    pub async fn pick(&self, queue: &str, now: DateTime<Utc>) -> Option<Account> {
        let mut best: Option<Account> = None;
        let entries = self.entries.read().await;
        for entry in entries.values() {
            let account = entry.account.lock().await;
            if !account.active || account.is_locked(queue, now) {
                continue;
            }
            let beats_current = match &best {
                None => true,
                Some(current) => account.last_used < current.last_used,
            };
            if beats_current {
                best = Some(account.clone());
            }
        }
        best
    }

    /// Pick and acquire in one step.
    pub async fn checkout(&self, queue: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        loop {
            let Some(candidate) = self.pick(queue, now).await else {
                return Ok(None);
            };
            // The account may have been taken between pick and acquire;
            // if so, go around again.
            if self.acquire(&candidate.username, queue, now).await? {
                let entry = self.entry(&candidate.username).await?;
                let account = entry.account.lock().await.clone();
                return Ok(Some(account));
            }
        }
    }

    /// Checkout, polling until some account frees up.
    pub async fn checkout_or_wait(&self, queue: &str) -> Result<Account> {
        loop {
            if let Some(account) = self.checkout(queue, Utc::now()).await? {
                return Ok(account);
            }
            tracing::debug!(queue, "All accounts busy, waiting");
            tokio::time::sleep(self.wait_poll).await;
        }
    }

    /// Run the login flow for one account under its login guard and persist
    /// the result.
    pub async fn relogin(
        &self,
        username: &str,
        factory: &dyn SurfaceFactory,
        config: &AppConfig,
    ) -> Result<Account> {
        let entry = self.entry(username).await?;
        let _guard = entry.login_guard.lock().await;

        let snapshot = entry.account.lock().await.clone();
        let updated = roost_login::login(factory, snapshot, config).await;

        // Pool traffic may have touched locks and stats while the login ran;
        // take back only the fields the login owns.
        let merged = {
            let mut account = entry.account.lock().await;
            account.active = updated.active;
            account.user_agent = updated.user_agent;
            account.headers = updated.headers;
            account.cookies = updated.cookies;
            account.error_msg = updated.error_msg;
            account.clone()
        };
        self.db.save_account(&merged).await?;
        Ok(merged)
    }

    /// Log in every inactive account, accounts in parallel.
    pub async fn login_all(
        &self,
        factory: &dyn SurfaceFactory,
        config: &AppConfig,
    ) -> Result<Vec<Account>> {
        let usernames: Vec<String> = {
            let entries = self.entries.read().await;
            entries.keys().cloned().collect()
        };

        let jobs = usernames
            .iter()
            .map(|username| self.relogin(username, factory, config));
        let results = futures_util::future::join_all(jobs).await;

        let mut accounts = Vec::with_capacity(results.len());
        for result in results {
            accounts.push(result?);
        }
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }
}
