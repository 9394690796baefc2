//! License reconciliation domain

pub mod coordinator;
pub mod plan;
pub mod ports;

pub use coordinator::{ReconcileDeps, ReconcileService};
pub use plan::{build_plan, ReconcilePlan, VendorRunContext};
pub use ports::{
    DirectoryRepository, IdentityLinkRepository, LicenseRepository, PatternRepository,
    PriceRepository, ProviderAdapter, ProviderRegistry, VendorRepository,
};
