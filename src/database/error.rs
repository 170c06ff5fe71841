use sqlx::error::{DatabaseError, ErrorKind};

/// Failure outcomes of the store layer.
///
/// `NotFound` and `Conflict` are the only kinds the stores classify themselves;
/// every other engine failure is carried through unchanged as `Storage`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no such row")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage fault: {0}")]
    Storage(#[from] sqlx::Error),
}

impl StoreError {
    /// Reclassifies a unique-key violation as `Conflict`, leaving other faults as they are.
    pub fn unique_as_conflict(error: sqlx::Error, info: &str) -> Self {
        match database_error_kind(&error) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict(info.to_string()),
            _ => Self::Storage(error),
        }
    }

    /// True when the fault is a reference to a catalog row that does not exist.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::Storage(e) => matches!(
                database_error_kind(e),
                Some(ErrorKind::ForeignKeyViolation)
            ),
            _ => false,
        }
    }

    /// True for a unique-key violation that was not reclassified as `Conflict`.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Storage(e) => matches!(database_error_kind(e), Some(ErrorKind::UniqueViolation)),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

fn database_error_kind(error: &sqlx::Error) -> Option<ErrorKind> {
    match error {
        sqlx::Error::Database(e) => Some(DatabaseError::kind(e.as_ref())),
        _ => None,
    }
}
