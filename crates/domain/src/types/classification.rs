//! Matching engine output

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::license::{MatchMethod, MatchStatus};

/// Result of classifying one raw record
///
/// Service/admin flags and the external-email flag are independent of the
/// identity-matching fields: a service-flagged record carries no
/// `match_status` because it never enters the employee-matching pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classification {
    pub employee_id: Option<Uuid>,
    pub suggested_employee_id: Option<Uuid>,
    pub match_confidence: Option<f32>,
    pub match_status: Option<MatchStatus>,
    pub match_method: Option<MatchMethod>,

    pub is_service_account: bool,
    pub service_account_owner_id: Option<Uuid>,
    pub is_admin_account: bool,
    pub admin_account_owner_id: Option<Uuid>,

    pub is_external_email: bool,
}

impl Classification {
    /// Whether the record was flagged as a non-personal account and skipped
    /// the identity-matching pipeline.
    pub fn is_flagged_account(&self) -> bool {
        self.is_service_account || self.is_admin_account
    }

    /// Whether this outcome lands in the review queue.
    pub fn needs_review(&self) -> bool {
        self.match_status.is_some_and(|status| status.needs_review())
    }
}
