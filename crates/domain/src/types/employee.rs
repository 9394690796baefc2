//! Employee directory types
//!
//! Employees are owned by the HRIS directory sync and read-only inside the
//! reconciliation engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Employment status as reported by the directory sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Offboarded,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Offboarded => "offboarded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "offboarded" => Some(Self::Offboarded),
            _ => None,
        }
    }
}

/// Canonical employee identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    /// Primary email, unique and case-folded on write
    pub email: String,
    pub display_name: String,
    pub department: Option<String>,
    pub status: EmploymentStatus,
    /// Source system the row was synced from (e.g. "workday")
    pub source: Option<String>,
}

impl Employee {
    /// Case-folded email, the canonical lookup key.
    pub fn email_key(&self) -> String {
        self.email.trim().to_lowercase()
    }

    pub fn is_active(&self) -> bool {
        self.status == EmploymentStatus::Active
    }
}
