//! Account pool gate.
//!
//! Hands accounts out under per-queue rate-limit locks and keeps their
//! session state repaired through the login orchestrator. All state changes
//! are written through to the `roost-db` store.

pub mod error;
pub mod pool;

pub use error::{PoolError, Result};
pub use pool::AccountPool;
