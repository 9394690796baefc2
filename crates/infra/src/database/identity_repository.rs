//! SQLite-backed implementation of the IdentityLinkRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use seatsync_core::IdentityLinkRepository;
use seatsync_domain::{ExternalIdentityLink, Result};
use tracing::instrument;

use super::manager::{map_sql_error, DbManager};
use super::uuid_from_row;

/// SQLite implementation of IdentityLinkRepository
pub struct SqliteIdentityLinkRepository {
    db: Arc<DbManager>,
}

impl SqliteIdentityLinkRepository {
    /// Create a new identity link repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Register one manual link. Usernames are case-folded on write so the
    /// uniqueness constraint matches lookup semantics.
    pub async fn add_link(&self, link: &ExternalIdentityLink) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO external_identity_links (id, vendor_type, external_username, employee_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                link.id.to_string(),
                link.vendor_type.to_lowercase(),
                link.external_username.trim().to_lowercase(),
                link.employee_id.to_string(),
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl IdentityLinkRepository for SqliteIdentityLinkRepository {
    #[instrument(skip(self))]
    async fn links_for_vendor_type(
        &self,
        vendor_type: &str,
    ) -> Result<Vec<ExternalIdentityLink>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, vendor_type, external_username, employee_id
                 FROM external_identity_links
                 WHERE vendor_type = ?1 ORDER BY external_username",
            )
            .map_err(map_sql_error)?;

        let rows = stmt
            .query_map(params![vendor_type.to_lowercase()], map_link_row)
            .map_err(map_sql_error)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row.map_err(map_sql_error)?);
        }
        Ok(links)
    }
}

fn map_link_row(row: &Row<'_>) -> rusqlite::Result<ExternalIdentityLink> {
    Ok(ExternalIdentityLink {
        id: uuid_from_row(row, 0)?,
        vendor_type: row.get(1)?,
        external_username: row.get(2)?,
        employee_id: uuid_from_row(row, 3)?,
    })
}
