//! Reconciliation run reporting types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-vendor counts for one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub expired: usize,
    pub needs_review: usize,
    /// Records skipped for missing `external_id`
    pub skipped: usize,
}

impl RunSummary {
    /// Total rows written by the run.
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.expired
    }
}

/// Outcome of reconciling one vendor
///
/// Exactly one of `summary`/`error` is set: a failed vendor rolls back and
/// reports its error without affecting the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRunReport {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl VendorRunReport {
    pub fn succeeded(vendor_id: Uuid, vendor_name: impl Into<String>, summary: RunSummary) -> Self {
        Self {
            vendor_id,
            vendor_name: vendor_name.into(),
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failed(vendor_id: Uuid, vendor_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            vendor_id,
            vendor_name: vendor_name.into(),
            summary: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Full report for one `reconcile_all` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub vendors: Vec<VendorRunReport>,
}

impl ReconcileReport {
    pub fn failed_vendors(&self) -> impl Iterator<Item = &VendorRunReport> {
        self.vendors.iter().filter(|report| report.is_failure())
    }
}
