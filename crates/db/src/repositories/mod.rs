use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;

use letterflow_core::StoreError;

pub mod actor;
pub mod college;
pub mod message;
pub mod request;

pub use actor::SqlActorRepository;
pub use college::SqlCollegeRepository;
pub use message::SqlMessageRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` is not at version {expected}")]
    VersionConflict { entity: &'static str, id: String, expected: u32 },
    #[error("{entity} `{id}` does not exist")]
    Missing { entity: &'static str, id: String },
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(sqlx::Error::Database(ref error))
                if error.is_unique_violation() =>
            {
                StoreError::Duplicate(error.message().to_string())
            }
            RepositoryError::VersionConflict { .. } => StoreError::Conflict(value.to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{value}`: {error}")))
}

pub(crate) fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|error| RepositoryError::Decode(error.to_string()))
}
