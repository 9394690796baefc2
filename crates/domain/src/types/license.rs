//! Persisted license (seat) types
//!
//! A `License` is one persisted vendor seat, unique on
//! `(vendor_id, external_id)`. Rows are created on first sighting, updated on
//! every later sighting, and never hard-deleted: disappearance from the
//! vendor fetch is a status transition.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Seat lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Suspended,
    Pending,
    Unassigned,
    Expired,
    Cancelled,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Pending => "pending",
            Self::Unassigned => "unassigned",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "pending" => Some(Self::Pending),
            "unassigned" => Some(Self::Unassigned),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses are not re-expired when a seat stops appearing
    /// upstream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled)
    }
}

/// Outcome of identity matching for a license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    AutoMatched,
    Suggested,
    Confirmed,
    Rejected,
    ExternalGuest,
    ExternalReview,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoMatched => "auto_matched",
            Self::Suggested => "suggested",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::ExternalGuest => "external_guest",
            Self::ExternalReview => "external_review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto_matched" => Some(Self::AutoMatched),
            "suggested" => Some(Self::Suggested),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "external_guest" => Some(Self::ExternalGuest),
            "external_review" => Some(Self::ExternalReview),
            _ => None,
        }
    }

    /// A human reviewer has decided; the engine must not overwrite the
    /// assignment or matching fields.
    pub fn is_reviewed(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Rejected)
    }

    /// Statuses that surface in the review queue.
    pub fn needs_review(&self) -> bool {
        matches!(self, Self::Suggested | Self::ExternalReview | Self::ExternalGuest)
    }
}

/// Which matching strategy produced an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactEmail,
    LocalPart,
    FuzzyName,
    ExternalAccount,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactEmail => "exact_email",
            Self::LocalPart => "local_part",
            Self::FuzzyName => "fuzzy_name",
            Self::ExternalAccount => "external_account",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exact_email" => Some(Self::ExactEmail),
            "local_part" => Some(Self::LocalPart),
            "fuzzy_name" => Some(Self::FuzzyName),
            "external_account" => Some(Self::ExternalAccount),
            _ => None,
        }
    }
}

/// Vendor billing cycle for a reported cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
    Perpetual,
    OneTime,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Perpetual => "perpetual",
            Self::OneTime => "one_time",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "yearly" => Some(Self::Yearly),
            "perpetual" => Some(Self::Perpetual),
            "one_time" => Some(Self::OneTime),
            _ => None,
        }
    }
}

/// One persisted seat/account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    pub vendor_id: Uuid,
    /// Vendor-native user id; unique per vendor
    pub external_id: String,
    pub status: LicenseStatus,

    // Assignment
    pub employee_id: Option<Uuid>,
    pub is_service_account: bool,
    pub service_account_owner_id: Option<Uuid>,
    pub is_admin_account: bool,
    pub admin_account_owner_id: Option<Uuid>,

    // Matching
    pub suggested_employee_id: Option<Uuid>,
    pub match_confidence: Option<f32>,
    pub match_status: Option<MatchStatus>,
    pub match_method: Option<MatchMethod>,
    pub is_external_email: bool,

    // Lifecycle
    pub expires_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_effective_date: Option<NaiveDate>,
    pub cancellation_reason: Option<String>,

    // Cost
    pub monthly_cost: Option<f64>,
    pub currency: Option<String>,

    // Operational
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub license_type: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub metadata: Value,
    pub synced_at: Option<DateTime<Utc>>,
}

impl License {
    /// Whether a reviewer decision locks the matching fields on this row.
    pub fn is_review_locked(&self) -> bool {
        self.match_status.is_some_and(|status| status.is_reviewed())
    }
}
