use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A column validator rejected the value before the write was issued.
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{field} must be unique")]
    UniquenessViolation { field: String },

    #[error("foreign key constraint failed: {0}")]
    ReferentialViolation(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable kind name, serialized into error responses.
    pub fn name(&self) -> &'static str {
        match self {
            StoreError::Validation { .. } => "ValidationError",
            StoreError::UniquenessViolation { .. } => "UniqueConstraintError",
            StoreError::ReferentialViolation(_) => "ForeignKeyConstraintError",
            StoreError::Hashing(_) => "HashingError",
            StoreError::Sqlite(_) | StoreError::LockPoisoned(_) => "DatabaseError",
        }
    }

    /// The offending column, when the failure is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            StoreError::Validation { field, .. } | StoreError::UniquenessViolation { field } => {
                Some(field)
            }
            _ => None,
        }
    }
}

/// Constraint failures are classified by SQLite's extended result code so
/// callers can tell a duplicate email from a dangling foreign key.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            if failure.code == ErrorCode::ConstraintViolation {
                let message = message.clone().unwrap_or_default();
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        return StoreError::UniquenessViolation {
                            field: constrained_columns(&message),
                        };
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                        return StoreError::ReferentialViolation(message);
                    }
                    ffi::SQLITE_CONSTRAINT_NOTNULL => {
                        let field = constrained_columns(&message);
                        return StoreError::Validation {
                            message: format!("{} cannot be null", field),
                            field,
                        };
                    }
                    _ => {}
                }
            }
        }
        StoreError::Sqlite(err)
    }
}

/// "UNIQUE constraint failed: votes.user_id, votes.post_id" -> "user_id, post_id"
fn constrained_columns(message: &str) -> String {
    let columns = message.rsplit_once(": ").map_or(message, |(_, cols)| cols);
    columns
        .split(", ")
        .map(|col| col.rsplit_once('.').map_or(col, |(_, name)| name))
        .collect::<Vec<_>>()
        .join(", ")
}
