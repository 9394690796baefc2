//! Conversions from external infrastructure errors into domain errors.

use rusqlite::Error as SqlError;
use seatsync_domain::SeatSyncError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SeatSyncError);

impl From<InfraError> for SeatSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SeatSyncError> for InfraError {
    fn from(value: SeatSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSeatSyncError {
    fn into_seatsync(self) -> SeatSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SeatSyncError */
/* -------------------------------------------------------------------------- */

impl IntoSeatSyncError for SqlError {
    fn into_seatsync(self) -> SeatSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        SeatSyncError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        SeatSyncError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        SeatSyncError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SeatSyncError::Database("foreign key constraint violation".into())
                    }
                    _ => SeatSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => SeatSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                SeatSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                SeatSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => {
                SeatSyncError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidParameterName(parameter_name) => {
                SeatSyncError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => SeatSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => SeatSyncError::Database("invalid SQL query".into()),
            other => SeatSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_seatsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SeatSyncError */
/* -------------------------------------------------------------------------- */

impl IntoSeatSyncError for r2d2::Error {
    fn into_seatsync(self) -> SeatSyncError {
        SeatSyncError::Database(format!("connection pool error: {self}"))
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(value.into_seatsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: SeatSyncError = InfraError::from(err).into();
        match mapped {
            SeatSyncError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn unique_violation_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::ConstraintViolation, extended_code: 2067 },
            Some("UNIQUE constraint failed: licenses.vendor_id, licenses.external_id".into()),
        );

        let mapped: SeatSyncError = InfraError::from(err).into();
        match mapped {
            SeatSyncError::Database(msg) => assert!(msg.contains("unique")),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: SeatSyncError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, SeatSyncError::NotFound(_)));
    }
}
