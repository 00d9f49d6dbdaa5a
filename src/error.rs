use rusqlite::ErrorCode;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field is missing or a uniqueness/type rule is broken
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The store rejected a read, write, commit or rollback
    #[error("transaction error: {0}")]
    Transaction(#[source] rusqlite::Error),

    /// The caller used a table, column or record the schema does not allow
    #[error("schema error: {0}")]
    Schema(String),
}

impl Error {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::ConstraintViolation(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            other => Error::Transaction(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn sqlite_constraint_failures_map_to_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT NOT NULL UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: Error = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_constraint_violation(), "{err}");
    }

    #[test]
    fn other_sqlite_failures_map_to_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        let err: Error = conn.execute("COMMIT", []).unwrap_err().into();
        assert!(matches!(err, Error::Transaction(_)), "{err}");
    }
}
