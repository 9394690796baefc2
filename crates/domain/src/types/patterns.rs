//! Administrator-managed matching rules
//!
//! Pattern entries and identity links are created through the admin surface
//! and consumed read-only by the engine, loaded once per reconciliation run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Email pattern marking service or admin accounts
///
/// `pattern` is either an exact email or a glob (`*`/`?`). The optional owner
/// attributes the account to a human for accountability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPattern {
    pub id: Uuid,
    pub pattern: String,
    pub owner_employee_id: Option<Uuid>,
    pub display_name: Option<String>,
}

/// Exact (case-insensitive) license-type string marking service accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseTypeRule {
    pub id: Uuid,
    pub license_type: String,
    pub owner_employee_id: Option<Uuid>,
}

/// Manual `(vendor_type, external_username) -> employee` link
///
/// Populated for vendors whose records carry no email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIdentityLink {
    pub id: Uuid,
    pub vendor_type: String,
    pub external_username: String,
    pub employee_id: Uuid,
}
