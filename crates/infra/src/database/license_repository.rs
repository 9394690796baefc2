//! SQLite-backed implementation of the LicenseRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use seatsync_core::reconcile::plan::ReconcilePlan;
use seatsync_core::LicenseRepository;
use seatsync_domain::{
    License, LicenseStatus, MatchMethod, MatchStatus, Result, SeatSyncError,
};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::{map_sql_error, DbManager};
use super::{enum_from_row, from_ts, opt_uuid_from_row, to_ts, uuid_from_row};

const LICENSE_COLUMNS: &str = "id, vendor_id, external_id, status, \
     employee_id, is_service_account, service_account_owner_id, \
     is_admin_account, admin_account_owner_id, \
     suggested_employee_id, match_confidence, match_status, match_method, is_external_email, \
     expires_at, cancelled_at, cancellation_effective_date, cancellation_reason, \
     monthly_cost, currency, email, display_name, license_type, last_activity, metadata, synced_at";

/// SQLite implementation of LicenseRepository
pub struct SqliteLicenseRepository {
    db: Arc<DbManager>,
}

impl SqliteLicenseRepository {
    /// Create a new license repository.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Look up one license by its vendor-scoped key.
    pub async fn find_by_external_id(
        &self,
        vendor_id: Uuid,
        external_id: &str,
    ) -> Result<Option<License>> {
        let conn = self.db.get_connection()?;
        let sql = format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE vendor_id = ?1 AND external_id = ?2"
        );

        let result = conn.query_row(
            &sql,
            params![vendor_id.to_string(), external_id],
            map_license_row,
        );

        match result {
            Ok(license) => Ok(Some(license)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(map_sql_error(err)),
        }
    }

    /// Record a reviewer decision on a license.
    ///
    /// Only `confirmed`/`rejected` are reviewer decisions; once written, the
    /// engine treats the row's matching fields as immutable.
    pub async fn mark_reviewed(
        &self,
        license_id: Uuid,
        status: MatchStatus,
        employee_id: Option<Uuid>,
    ) -> Result<()> {
        if !status.is_reviewed() {
            return Err(SeatSyncError::InvalidInput(format!(
                "'{}' is not a reviewer decision",
                status.as_str()
            )));
        }

        let conn = self.db.get_connection()?;
        let changed = conn
            .execute(
                "UPDATE licenses SET match_status = ?1, employee_id = ?2 WHERE id = ?3",
                params![
                    status.as_str(),
                    employee_id.map(|id| id.to_string()),
                    license_id.to_string()
                ],
            )
            .map_err(map_sql_error)?;

        if changed == 0 {
            return Err(SeatSyncError::NotFound(format!("license {license_id}")));
        }
        Ok(())
    }

    /// Sum of monthly cost across a vendor's active seats.
    pub async fn active_monthly_cost(&self, vendor_id: Uuid) -> Result<f64> {
        let conn = self.db.get_connection()?;
        conn.query_row(
            "SELECT COALESCE(SUM(monthly_cost), 0.0) FROM licenses
             WHERE vendor_id = ?1 AND status = 'active'",
            params![vendor_id.to_string()],
            |row| row.get(0),
        )
        .map_err(map_sql_error)
    }
}

#[async_trait]
impl LicenseRepository for SqliteLicenseRepository {
    #[instrument(skip(self))]
    async fn licenses_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<License>> {
        let conn = self.db.get_connection()?;
        let sql = format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE vendor_id = ?1 ORDER BY external_id"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;

        let rows = stmt
            .query_map(params![vendor_id.to_string()], map_license_row)
            .map_err(map_sql_error)?;

        let mut licenses = Vec::new();
        for row in rows {
            licenses.push(row.map_err(map_sql_error)?);
        }
        Ok(licenses)
    }

    #[instrument(skip(self, plan), fields(
        creates = plan.creates.len(),
        updates = plan.updates.len(),
        expirations = plan.expirations.len(),
    ))]
    async fn apply_plan(&self, vendor_id: Uuid, plan: &ReconcilePlan) -> Result<()> {
        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction().map_err(map_sql_error)?;

        for license in &plan.creates {
            insert_license(&tx, license)?;
        }
        for license in plan.updates.iter().chain(plan.expirations.iter()) {
            update_license(&tx, license)?;
        }

        tx.commit().map_err(map_sql_error)?;

        debug!(%vendor_id, "reconciliation plan committed");
        Ok(())
    }
}

fn insert_license(conn: &Connection, license: &License) -> Result<()> {
    let sql = format!(
        "INSERT INTO licenses ({LICENSE_COLUMNS}) VALUES (\
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
            ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
    );

    conn.execute(
        &sql,
        params![
            license.id.to_string(),
            license.vendor_id.to_string(),
            license.external_id,
            license.status.as_str(),
            license.employee_id.map(|id| id.to_string()),
            license.is_service_account,
            license.service_account_owner_id.map(|id| id.to_string()),
            license.is_admin_account,
            license.admin_account_owner_id.map(|id| id.to_string()),
            license.suggested_employee_id.map(|id| id.to_string()),
            license.match_confidence.map(f64::from),
            license.match_status.map(|status| status.as_str()),
            license.match_method.map(|method| method.as_str()),
            license.is_external_email,
            to_ts(license.expires_at),
            to_ts(license.cancelled_at),
            license.cancellation_effective_date.map(|date| date.to_string()),
            license.cancellation_reason,
            license.monthly_cost,
            license.currency,
            license.email,
            license.display_name,
            license.license_type,
            to_ts(license.last_activity),
            metadata_to_sql(&license.metadata),
            to_ts(license.synced_at),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn update_license(conn: &Connection, license: &License) -> Result<()> {
    conn.execute(
        "UPDATE licenses SET
            status = ?1,
            employee_id = ?2,
            is_service_account = ?3,
            service_account_owner_id = ?4,
            is_admin_account = ?5,
            admin_account_owner_id = ?6,
            suggested_employee_id = ?7,
            match_confidence = ?8,
            match_status = ?9,
            match_method = ?10,
            is_external_email = ?11,
            expires_at = ?12,
            cancelled_at = ?13,
            cancellation_effective_date = ?14,
            cancellation_reason = ?15,
            monthly_cost = ?16,
            currency = ?17,
            email = ?18,
            display_name = ?19,
            license_type = ?20,
            last_activity = ?21,
            metadata = ?22,
            synced_at = ?23
         WHERE id = ?24",
        params![
            license.status.as_str(),
            license.employee_id.map(|id| id.to_string()),
            license.is_service_account,
            license.service_account_owner_id.map(|id| id.to_string()),
            license.is_admin_account,
            license.admin_account_owner_id.map(|id| id.to_string()),
            license.suggested_employee_id.map(|id| id.to_string()),
            license.match_confidence.map(f64::from),
            license.match_status.map(|status| status.as_str()),
            license.match_method.map(|method| method.as_str()),
            license.is_external_email,
            to_ts(license.expires_at),
            to_ts(license.cancelled_at),
            license.cancellation_effective_date.map(|date| date.to_string()),
            license.cancellation_reason,
            license.monthly_cost,
            license.currency,
            license.email,
            license.display_name,
            license.license_type,
            to_ts(license.last_activity),
            metadata_to_sql(&license.metadata),
            to_ts(license.synced_at),
            license.id.to_string(),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn metadata_to_sql(metadata: &Value) -> Option<String> {
    if *metadata == Value::Null {
        None
    } else {
        serde_json::to_string(metadata).ok()
    }
}

fn map_license_row(row: &Row<'_>) -> rusqlite::Result<License> {
    let status_text: String = row.get(3)?;
    let status = LicenseStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown license status '{status_text}'").into(),
        )
    })?;

    let metadata: Option<String> = row.get(24)?;
    let metadata = match metadata {
        Some(text) => serde_json::from_str(&text).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(24, Type::Text, Box::new(err))
        })?,
        None => Value::Null,
    };

    let effective_date: Option<String> = row.get(16)?;
    let cancellation_effective_date = effective_date
        .map(|text| {
            NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(err))
            })
        })
        .transpose()?;

    Ok(License {
        id: uuid_from_row(row, 0)?,
        vendor_id: uuid_from_row(row, 1)?,
        external_id: row.get(2)?,
        status,
        employee_id: opt_uuid_from_row(row, 4)?,
        is_service_account: row.get(5)?,
        service_account_owner_id: opt_uuid_from_row(row, 6)?,
        is_admin_account: row.get(7)?,
        admin_account_owner_id: opt_uuid_from_row(row, 8)?,
        suggested_employee_id: opt_uuid_from_row(row, 9)?,
        match_confidence: row.get::<_, Option<f64>>(10)?.map(|value| value as f32),
        match_status: enum_from_row(11, row.get(11)?, MatchStatus::parse)?,
        match_method: enum_from_row(12, row.get(12)?, MatchMethod::parse)?,
        is_external_email: row.get(13)?,
        expires_at: from_ts(row.get(14)?),
        cancelled_at: from_ts(row.get(15)?),
        cancellation_effective_date,
        cancellation_reason: row.get(17)?,
        monthly_cost: row.get(18)?,
        currency: row.get(19)?,
        email: row.get(20)?,
        display_name: row.get(21)?,
        license_type: row.get(22)?,
        last_activity: from_ts(row.get(23)?),
        metadata,
        synced_at: from_ts(row.get(25)?),
    })
}
