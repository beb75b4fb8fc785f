use roost_db::DatabaseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoolError>;

#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool holds no account with that username.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// Persistence failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
