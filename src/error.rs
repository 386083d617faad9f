// Copyright 2024 Meal Planner Authors

use crate::validation::ValidationError;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Connection(diesel::ConnectionError),
    Database(diesel::result::Error),
    Migration(Box<dyn std::error::Error + Send + Sync + 'static>),
    Validation(ValidationError),
    NotFound {
        entity: &'static str,
        id: i32,
    },
    /// The row is still referenced by rows that forbid its deletion.
    Protected {
        entity: &'static str,
        id: i32,
        dependent: &'static str,
        count: i64,
    },
    Io(std::io::Error),
}

impl Error {
    /// True for failures the database raised while enforcing a constraint, such as a foreign key
    /// pointing at a missing row.
    pub fn is_integrity_violation(&self) -> bool {
        use diesel::result::DatabaseErrorKind::*;

        match self {
            Self::Database(diesel::result::Error::DatabaseError(kind, info)) => {
                matches!(
                    kind,
                    ForeignKeyViolation | UniqueViolation | NotNullViolation | CheckViolation
                ) || info.message().contains("constraint failed")
            }
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Database(e) => write!(f, "database error: {e}"),
            Self::Migration(e) => write!(f, "migration error: {e}"),
            Self::Validation(e) => write!(f, "{e}"),
            Self::NotFound { entity, id } => write!(f, "no {entity} with id {id}"),
            Self::Protected {
                entity,
                id,
                dependent,
                count,
            } => write!(
                f,
                "cannot delete {entity} {id}: referenced by {count} {dependent} row(s)"
            ),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Database(e) => Some(e),
            Self::Migration(e) => Some(&**e),
            Self::Validation(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::NotFound { .. } | Self::Protected { .. } => None,
        }
    }
}

impl From<diesel::ConnectionError> for Error {
    fn from(e: diesel::ConnectionError) -> Self {
        Self::Connection(e)
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Self::Database(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
