//! SQLite-backed implementation of the DirectoryRepository port.
//!
//! The employee table is owned by the HRIS directory sync; the engine reads
//! snapshots from it. The upsert surface exists for the sync collaborator
//! and for test seeding.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use seatsync_core::DirectoryRepository;
use seatsync_domain::{Employee, EmploymentStatus, Result};
use tracing::instrument;

use super::manager::{map_sql_error, DbManager};
use super::uuid_from_row;

/// SQLite implementation of DirectoryRepository
pub struct SqliteEmployeeRepository {
    db: Arc<DbManager>,
}

impl SqliteEmployeeRepository {
    /// Create a new employee repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or refresh one directory row. Emails are case-folded on write
    /// to keep the unique index canonical.
    pub async fn upsert_employee(&self, employee: &Employee) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO employees (id, email, display_name, department, status, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                department = excluded.department,
                status = excluded.status,
                source = excluded.source",
            params![
                employee.id.to_string(),
                employee.email_key(),
                employee.display_name,
                employee.department,
                employee.status.as_str(),
                employee.source,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryRepository for SqliteEmployeeRepository {
    #[instrument(skip(self))]
    async fn employees(&self) -> Result<Vec<Employee>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, email, display_name, department, status, source
                 FROM employees ORDER BY email",
            )
            .map_err(map_sql_error)?;

        let rows = stmt.query_map([], map_employee_row).map_err(map_sql_error)?;

        let mut employees = Vec::new();
        for row in rows {
            employees.push(row.map_err(map_sql_error)?);
        }
        Ok(employees)
    }
}

fn map_employee_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    let status_text: String = row.get(4)?;
    let status = EmploymentStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown employment status '{status_text}'").into(),
        )
    })?;

    Ok(Employee {
        id: uuid_from_row(row, 0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        department: row.get(3)?,
        status,
        source: row.get(5)?,
    })
}
