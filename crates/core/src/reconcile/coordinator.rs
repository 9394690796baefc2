//! Reconciliation coordinator
//!
//! Drives one reconciliation run: per vendor, fetch current records through
//! the provider adapter, diff them against persisted state with the matching
//! engine and cost normalizer, and commit the diff atomically. Vendors run
//! concurrently but each vendor has at most one run in flight, and one
//! vendor's failure never touches another's result.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use seatsync_domain::{
    MatchingConfig, ReconcileReport, Result, RunSummary, SeatSyncError, Vendor, VendorRunReport,
};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::plan::{build_plan, VendorRunContext};
use super::ports::{
    DirectoryRepository, IdentityLinkRepository, LicenseRepository, PatternRepository,
    PriceRepository, ProviderRegistry, VendorRepository,
};
use crate::costs::PriceBook;
use crate::directory::DirectorySnapshot;
use crate::matching::registry::{ExternalIdentityMap, PatternSnapshot};

/// Ports the coordinator drives, grouped to keep construction flat
pub struct ReconcileDeps {
    pub vendors: Arc<dyn VendorRepository>,
    pub licenses: Arc<dyn LicenseRepository>,
    pub directory: Arc<dyn DirectoryRepository>,
    pub patterns: Arc<dyn PatternRepository>,
    pub identity_links: Arc<dyn IdentityLinkRepository>,
    pub prices: Arc<dyn PriceRepository>,
    pub providers: Arc<dyn ProviderRegistry>,
}

/// Per-vendor reconciliation service
pub struct ReconcileService {
    deps: ReconcileDeps,
    matching: MatchingConfig,
    vendor_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ReconcileService {
    pub fn new(deps: ReconcileDeps, matching: MatchingConfig) -> Self {
        Self { deps, matching, vendor_locks: DashMap::new() }
    }

    /// Reconcile every enabled vendor concurrently.
    ///
    /// Always returns a report; individual vendor failures are recorded in
    /// it, never propagated.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let started_at = Utc::now();
        let vendors = self.deps.vendors.enabled_vendors().await?;

        info!(vendor_count = vendors.len(), "starting reconciliation run");

        let reports =
            join_all(vendors.iter().map(|vendor| self.reconcile_vendor_report(vendor))).await;

        Ok(ReconcileReport { started_at, finished_at: Utc::now(), vendors: reports })
    }

    /// Reconcile a single vendor by id (administrative trigger).
    pub async fn reconcile_by_id(&self, vendor_id: Uuid) -> Result<RunSummary> {
        let vendor = self
            .deps
            .vendors
            .vendor(vendor_id)
            .await?
            .ok_or_else(|| SeatSyncError::NotFound(format!("vendor {vendor_id}")))?;
        self.reconcile_vendor(&vendor).await
    }

    async fn reconcile_vendor_report(&self, vendor: &Vendor) -> VendorRunReport {
        match self.reconcile_vendor(vendor).await {
            Ok(summary) => VendorRunReport::succeeded(vendor.id, &vendor.name, summary),
            Err(error) => {
                warn!(vendor = %vendor.name, %error, "vendor reconciliation failed");
                VendorRunReport::failed(vendor.id, &vendor.name, error.to_string())
            }
        }
    }

    /// Run one vendor's fetch + diff + commit under its run lock.
    #[instrument(skip(self, vendor), fields(vendor = %vendor.name))]
    pub async fn reconcile_vendor(&self, vendor: &Vendor) -> Result<RunSummary> {
        let lock = self.run_lock(vendor.id);
        let _guard = lock.lock().await;

        let adapter = self.deps.providers.adapter_for(&vendor.vendor_type).ok_or_else(|| {
            SeatSyncError::Config(format!(
                "no provider adapter registered for vendor type '{}'",
                vendor.vendor_type
            ))
        })?;

        let records = adapter.fetch_licenses().await?;
        let context = self.load_context(vendor).await?;
        let existing = self.deps.licenses.licenses_for_vendor(vendor.id).await?;

        let (plan, summary) = build_plan(vendor.id, &records, &existing, &context, Utc::now());

        if plan.is_empty() {
            info!(vendor = %vendor.name, "no changes to commit");
        } else {
            self.deps.licenses.apply_plan(vendor.id, &plan).await?;
        }

        info!(
            vendor = %vendor.name,
            created = summary.created,
            updated = summary.updated,
            expired = summary.expired,
            needs_review = summary.needs_review,
            skipped = summary.skipped,
            "vendor reconciled"
        );

        Ok(summary)
    }

    /// Load the shared read-only snapshots for one vendor run.
    async fn load_context(&self, vendor: &Vendor) -> Result<VendorRunContext> {
        let employees = self.deps.directory.employees().await?;
        let service = self.deps.patterns.service_account_patterns().await?;
        let admin = self.deps.patterns.admin_account_patterns().await?;
        let rules = self.deps.patterns.license_type_rules().await?;
        let links = self.deps.identity_links.links_for_vendor_type(&vendor.vendor_type).await?;
        let prices = self.deps.prices.prices_for_vendor(vendor.id).await?;

        Ok(VendorRunContext {
            directory: DirectorySnapshot::new(employees),
            patterns: PatternSnapshot::new(service, admin, rules),
            links: ExternalIdentityMap::for_vendor_type(&vendor.vendor_type, &links),
            prices: PriceBook::new(prices),
            matching: self.matching.clone(),
        })
    }

    fn run_lock(&self, vendor_id: Uuid) -> Arc<Mutex<()>> {
        self.vendor_locks
            .entry(vendor_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
