//! SQLite-backed implementation of the PriceRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::params;
use seatsync_core::PriceRepository;
use seatsync_domain::Result;
use tracing::instrument;
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};

/// SQLite implementation of PriceRepository
pub struct SqlitePriceRepository {
    db: Arc<DbManager>,
}

impl SqlitePriceRepository {
    /// Create a new price repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Set the monthly price of one license-type component for a vendor.
    pub async fn set_price(&self, vendor_id: Uuid, component: &str, monthly_price: f64) -> Result<()> {
        let conn = self.db.get_connection()?;
        conn.execute(
            "INSERT INTO license_type_prices (id, vendor_id, component, monthly_price)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(vendor_id, component) DO UPDATE SET
                monthly_price = excluded.monthly_price",
            params![
                Uuid::new_v4().to_string(),
                vendor_id.to_string(),
                component.trim(),
                monthly_price,
            ],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }
}

#[async_trait]
impl PriceRepository for SqlitePriceRepository {
    #[instrument(skip(self))]
    async fn prices_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<(String, f64)>> {
        let conn = self.db.get_connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT component, monthly_price FROM license_type_prices
                 WHERE vendor_id = ?1 ORDER BY component",
            )
            .map_err(map_sql_error)?;

        let rows = stmt
            .query_map(params![vendor_id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(map_sql_error)?;

        let mut prices = Vec::new();
        for row in rows {
            prices.push(row.map_err(map_sql_error)?);
        }
        Ok(prices)
    }
}
