//! Port interfaces for license reconciliation
//!
//! The coordinator drives everything through these traits; infrastructure
//! provides SQLite-backed implementations, tests provide in-memory ones.

use std::sync::Arc;

use async_trait::async_trait;
use seatsync_domain::{
    AccountPattern, Employee, ExternalIdentityLink, License, LicenseTypeRule, RawRecord, Result,
    Vendor,
};
use uuid::Uuid;

use super::plan::ReconcilePlan;

/// One vendor's API client, normalized to the common raw-record shape
///
/// Implementations live outside this engine; the coordinator only consumes
/// the contract. Transport failures surface as `SeatSyncError::Provider` and
/// abort that vendor's run only.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Fetch the vendor's current seat records.
    async fn fetch_licenses(&self) -> Result<Vec<RawRecord>>;
}

/// Adapter lookup by vendor type key
///
/// The coordinator selects an adapter per vendor at run start and never
/// branches on vendor identity internally.
pub trait ProviderRegistry: Send + Sync {
    fn adapter_for(&self, vendor_type: &str) -> Option<Arc<dyn ProviderAdapter>>;
}

/// Persistence for license rows
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// All persisted licenses for one vendor.
    async fn licenses_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<License>>;

    /// Apply a full reconciliation diff atomically: either every row in the
    /// plan lands, or none of it does.
    async fn apply_plan(&self, vendor_id: Uuid, plan: &ReconcilePlan) -> Result<()>;
}

/// Read-only employee directory access
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Full directory snapshot for the current run.
    async fn employees(&self) -> Result<Vec<Employee>>;
}

/// Read-only access to the administrator-managed rule sets
#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn service_account_patterns(&self) -> Result<Vec<AccountPattern>>;

    async fn admin_account_patterns(&self) -> Result<Vec<AccountPattern>>;

    async fn license_type_rules(&self) -> Result<Vec<LicenseTypeRule>>;
}

/// Read-only access to manual external-identity links
#[async_trait]
pub trait IdentityLinkRepository: Send + Sync {
    /// All links for one vendor type.
    async fn links_for_vendor_type(&self, vendor_type: &str)
        -> Result<Vec<ExternalIdentityLink>>;
}

/// Read-only access to per-vendor component prices
#[async_trait]
pub trait PriceRepository: Send + Sync {
    /// `(component, monthly price)` rows for one vendor.
    async fn prices_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<(String, f64)>>;
}

/// Vendor registry access
#[async_trait]
pub trait VendorRepository: Send + Sync {
    /// Vendors included in `reconcile_all`.
    async fn enabled_vendors(&self) -> Result<Vec<Vendor>>;

    async fn vendor(&self, vendor_id: Uuid) -> Result<Option<Vendor>>;
}
