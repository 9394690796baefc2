//! Raw per-seat records produced by vendor provider adapters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::license::{BillingCycle, LicenseStatus};

/// One raw seat record as normalized by a provider adapter
///
/// `external_id` and `status` are mandatory; everything else depends on what
/// the vendor API exposes. `metadata` is an opaque key/value bag carried
/// through to the persisted row untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub external_id: String,
    pub status: LicenseStatus,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub license_type: Option<String>,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Value,
}

impl RawRecord {
    /// Minimal record with just the mandatory fields.
    pub fn new(external_id: impl Into<String>, status: LicenseStatus) -> Self {
        Self {
            external_id: external_id.into(),
            status,
            email: None,
            display_name: None,
            license_type: None,
            cost: None,
            currency: None,
            billing_cycle: None,
            last_activity: None,
            metadata: Value::Null,
        }
    }

    /// Email to run pattern checks against: the record email, or the
    /// external id when the vendor uses email addresses as user ids.
    pub fn pattern_email(&self) -> Option<&str> {
        self.email.as_deref().or_else(|| {
            let candidate = self.external_id.as_str();
            looks_like_email(candidate).then_some(candidate)
        })
    }
}

/// Loose email shape check: one '@' with a dotted domain after it.
pub fn looks_like_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    match parts.next() {
        Some(domain) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
