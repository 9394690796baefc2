//! SQLite-backed implementations of the core repository ports.

pub mod employee_repository;
pub mod identity_repository;
pub mod license_repository;
pub mod manager;
pub mod pattern_repository;
pub mod price_repository;
pub mod vendor_repository;

pub use employee_repository::SqliteEmployeeRepository;
pub use identity_repository::SqliteIdentityLinkRepository;
pub use license_repository::SqliteLicenseRepository;
pub use manager::{DbConnection, DbManager};
pub use pattern_repository::SqlitePatternRepository;
pub use price_repository::SqlitePriceRepository;
pub use vendor_repository::SqliteVendorRepository;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

/// Read a UUID stored as TEXT.
pub(crate) fn uuid_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Read an optional UUID stored as TEXT.
pub(crate) fn opt_uuid_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        Uuid::parse_str(&text).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
        })
    })
    .transpose()
}

/// Parse an enum stored as TEXT, failing loudly on unknown values.
pub(crate) fn enum_from_row<T>(
    idx: usize,
    value: Option<String>,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(text) => parse(&text).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Text,
                format!("unknown enum value '{text}'").into(),
            )
        }),
    }
}

/// Unix-seconds representation for storage.
pub(crate) fn to_ts(value: Option<DateTime<Utc>>) -> Option<i64> {
    value.map(|dt| dt.timestamp())
}

/// Restore a timestamp stored as unix seconds.
pub(crate) fn from_ts(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(|secs| DateTime::from_timestamp(secs, 0))
}
