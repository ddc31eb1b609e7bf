//! Store Errors

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the ledger stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated (e.g. duplicate snapshot period)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored row cannot be mapped back to a domain value
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Backend temporarily unusable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Map unique violations to `Conflict`, everything else to `Database`
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("{} already exists", what))
            }
            _ => StoreError::Database(err),
        }
    }
}
