use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("message {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
