//! Vendor registry types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One configured software vendor
///
/// `vendor_type` selects the provider adapter; the engine never branches on
/// vendor identity beyond that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub vendor_type: String,
    pub enabled: bool,
}
