//! SQLite-backed implementation of the PatternRepository port.
//!
//! Pattern tables are maintained by administrators; the engine loads them
//! once per run. The insert helpers exist for admin tooling and test seeding.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use seatsync_core::PatternRepository;
use seatsync_domain::{AccountPattern, LicenseTypeRule, Result};
use tracing::instrument;

use super::manager::{map_sql_error, DbManager};
use super::{opt_uuid_from_row, uuid_from_row};

/// SQLite implementation of PatternRepository
pub struct SqlitePatternRepository {
    db: Arc<DbManager>,
}

impl SqlitePatternRepository {
    /// Create a new pattern repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register a service-account email pattern.
    pub async fn add_service_pattern(&self, pattern: &AccountPattern) -> Result<()> {
        self.insert_pattern("service_account_patterns", pattern).await
    }

    /// Register an admin-account email pattern.
    pub async fn add_admin_pattern(&self, pattern: &AccountPattern) -> Result<()> {
        self.insert_pattern("admin_account_patterns", pattern).await
    }

    /// Register a service-account license-type rule.
    pub async fn add_license_type_rule(&self, rule: &LicenseTypeRule) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO service_license_type_rules (id, license_type, owner_employee_id)
             VALUES (?1, ?2, ?3)",
            params![
                rule.id.to_string(),
                rule.license_type,
                rule.owner_employee_id.map(|id| id.to_string()),
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    async fn insert_pattern(&self, table: &str, pattern: &AccountPattern) -> Result<()> {
        let conn = self.db.get_connection()?;
        let sql = format!(
            "INSERT INTO {table} (id, pattern, owner_employee_id, display_name)
             VALUES (?1, ?2, ?3, ?4)"
        );
        conn.execute(
            &sql,
            params![
                pattern.id.to_string(),
                pattern.pattern,
                pattern.owner_employee_id.map(|id| id.to_string()),
                pattern.display_name,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    async fn load_patterns(&self, table: &str) -> Result<Vec<AccountPattern>> {
        let conn = self.db.get_connection()?;
        let sql = format!(
            "SELECT id, pattern, owner_employee_id, display_name FROM {table} ORDER BY pattern"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;

        let rows = stmt.query_map([], map_pattern_row).map_err(map_sql_error)?;

        let mut patterns = Vec::new();
        for row in rows {
            patterns.push(row.map_err(map_sql_error)?);
        }
        Ok(patterns)
    }
}

#[async_trait]
impl PatternRepository for SqlitePatternRepository {
    #[instrument(skip(self))]
    async fn service_account_patterns(&self) -> Result<Vec<AccountPattern>> {
        self.load_patterns("service_account_patterns").await
    }

    #[instrument(skip(self))]
    async fn admin_account_patterns(&self) -> Result<Vec<AccountPattern>> {
        self.load_patterns("admin_account_patterns").await
    }

    #[instrument(skip(self))]
    async fn license_type_rules(&self) -> Result<Vec<LicenseTypeRule>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, license_type, owner_employee_id
                 FROM service_license_type_rules ORDER BY license_type",
            )
            .map_err(map_sql_error)?;

        let rows = stmt
            .query_map([], |row: &Row<'_>| {
                Ok(LicenseTypeRule {
                    id: uuid_from_row(row, 0)?,
                    license_type: row.get(1)?,
                    owner_employee_id: opt_uuid_from_row(row, 2)?,
                })
            })
            .map_err(map_sql_error)?;

        let mut rules = Vec::new();
        for row in rows {
            rules.push(row.map_err(map_sql_error)?);
        }
        Ok(rules)
    }
}

fn map_pattern_row(row: &Row<'_>) -> rusqlite::Result<AccountPattern> {
    Ok(AccountPattern {
        id: uuid_from_row(row, 0)?,
        pattern: row.get(1)?,
        owner_employee_id: opt_uuid_from_row(row, 2)?,
        display_name: row.get(3)?,
    })
}
