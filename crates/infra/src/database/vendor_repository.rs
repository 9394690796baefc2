//! SQLite-backed implementation of the VendorRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Row};
use seatsync_core::VendorRepository;
use seatsync_domain::{Result, Vendor};
use tracing::instrument;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::uuid_from_row;

/// SQLite implementation of VendorRepository
pub struct SqliteVendorRepository {
    db: Arc<DbManager>,
}

impl SqliteVendorRepository {
    /// Create a new vendor repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or refresh one vendor row.
    pub async fn upsert_vendor(&self, vendor: &Vendor) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO vendors (id, name, vendor_type, enabled)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                vendor_type = excluded.vendor_type,
                enabled = excluded.enabled",
            params![
                vendor.id.to_string(),
                vendor.name,
                vendor.vendor_type,
                vendor.enabled,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl VendorRepository for SqliteVendorRepository {
    #[instrument(skip(self))]
    async fn enabled_vendors(&self) -> Result<Vec<Vendor>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, vendor_type, enabled FROM vendors
                 WHERE enabled = 1 ORDER BY name",
            )
            .map_err(map_sql_error)?;

        let rows = stmt.query_map([], map_vendor_row).map_err(map_sql_error)?;

        let mut vendors = Vec::new();
        for row in rows {
            vendors.push(row.map_err(map_sql_error)?);
        }
        Ok(vendors)
    }

    async fn vendor(&self, vendor_id: Uuid) -> Result<Option<Vendor>> {
        let conn = self.db.get_connection()?;
        let result = conn.query_row(
            "SELECT id, name, vendor_type, enabled FROM vendors WHERE id = ?1",
            params![vendor_id.to_string()],
            map_vendor_row,
        );

        match result {
            Ok(vendor) => Ok(Some(vendor)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(map_sql_error(err)),
        }
    }
}

fn map_vendor_row(row: &Row<'_>) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: uuid_from_row(row, 0)?,
        name: row.get(1)?,
        vendor_type: row.get(2)?,
        enabled: row.get(3)?,
    })
}
