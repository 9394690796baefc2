//! Reconciliation diff planning
//!
//! `build_plan` is the pure heart of the coordinator: current raw records
//! plus the persisted rows and the run snapshots in, an atomic write plan
//! plus per-run counts out. Only rows whose persisted image would actually
//! change are emitted, which is what makes repeated runs over identical
//! upstream data write nothing.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use seatsync_domain::{
    Classification, License, LicenseStatus, MatchingConfig, RawRecord, RunSummary,
};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::costs::{canonical_license_type, resolve_monthly_cost, PriceBook};
use crate::directory::DirectorySnapshot;
use crate::matching::engine::classify;
use crate::matching::registry::{ExternalIdentityMap, PatternSnapshot};

/// Read-only snapshots shared by every record in one vendor run
pub struct VendorRunContext {
    pub directory: DirectorySnapshot,
    pub patterns: PatternSnapshot,
    pub links: ExternalIdentityMap,
    pub prices: PriceBook,
    pub matching: MatchingConfig,
}

/// Atomic write plan for one vendor run
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub creates: Vec<License>,
    pub updates: Vec<License>,
    /// Rows absent from the fetch, transitioning to `expired`
    pub expirations: Vec<License>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.expirations.is_empty()
    }
}

/// Diff freshly fetched records against the persisted rows.
pub fn build_plan(
    vendor_id: Uuid,
    records: &[RawRecord],
    existing: &[License],
    context: &VendorRunContext,
    now: DateTime<Utc>,
) -> (ReconcilePlan, RunSummary) {
    let mut plan = ReconcilePlan::default();
    let mut summary = RunSummary::default();

    let persisted: HashMap<&str, &License> =
        existing.iter().map(|license| (license.external_id.as_str(), license)).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());

    for record in records {
        let external_id = record.external_id.trim();
        if external_id.is_empty() {
            // Malformed upstream row: counted, never an error.
            summary.skipped += 1;
            continue;
        }
        seen.insert(external_id);

        match persisted.get(external_id) {
            None => {
                let classification = classify(
                    record,
                    &context.directory,
                    &context.patterns,
                    &context.links,
                    &context.matching,
                );
                let license = new_license(vendor_id, record, &classification, context, now);
                if license.match_status.is_some_and(|status| status.needs_review()) {
                    summary.needs_review += 1;
                }
                plan.creates.push(license);
                summary.created += 1;
            }
            Some(current) => {
                let mut updated = merge_operational(current, record, context);

                if !current.is_review_locked() {
                    // Upstream data or patterns may have changed; recompute
                    // and overwrite the previous suggestion.
                    let classification = classify(
                        record,
                        &context.directory,
                        &context.patterns,
                        &context.links,
                        &context.matching,
                    );
                    apply_classification(&mut updated, &classification);
                }

                if updated.match_status.is_some_and(|status| status.needs_review()) {
                    summary.needs_review += 1;
                }

                if materially_differs(current, &updated) {
                    updated.synced_at = Some(now);
                    plan.updates.push(updated);
                    summary.updated += 1;
                }
            }
        }
    }

    // Rows the vendor stopped returning expire; they are never deleted, cost
    // history and the audit trail hang off them.
    for license in existing {
        if seen.contains(license.external_id.as_str()) || license.status.is_terminal() {
            continue;
        }
        let mut expired = license.clone();
        expired.status = LicenseStatus::Expired;
        expired.expires_at = Some(now);
        expired.synced_at = Some(now);
        plan.expirations.push(expired);
        summary.expired += 1;
    }

    debug!(
        %vendor_id,
        created = summary.created,
        updated = summary.updated,
        expired = summary.expired,
        skipped = summary.skipped,
        "reconciliation plan built"
    );

    (plan, summary)
}

/// First sighting of an `(vendor, external_id)` pair.
fn new_license(
    vendor_id: Uuid,
    record: &RawRecord,
    classification: &Classification,
    context: &VendorRunContext,
    now: DateTime<Utc>,
) -> License {
    let mut license = License {
        id: Uuid::new_v4(),
        vendor_id,
        external_id: record.external_id.trim().to_string(),
        status: record.status,
        employee_id: None,
        is_service_account: false,
        service_account_owner_id: None,
        is_admin_account: false,
        admin_account_owner_id: None,
        suggested_employee_id: None,
        match_confidence: None,
        match_status: None,
        match_method: None,
        is_external_email: false,
        expires_at: None,
        cancelled_at: None,
        cancellation_effective_date: None,
        cancellation_reason: None,
        monthly_cost: resolve_monthly_cost(record, &context.prices),
        currency: record.currency.clone(),
        email: record.email.clone(),
        display_name: record.display_name.clone(),
        license_type: record.license_type.as_deref().map(canonical_license_type),
        last_activity: record.last_activity.and_then(truncate_to_seconds),
        metadata: record.metadata.clone(),
        synced_at: Some(now),
    };
    apply_classification(&mut license, classification);
    license
}

/// Copy the mutable operational fields of a fresh record onto a persisted
/// row. Assignment and matching fields are left alone.
fn merge_operational(current: &License, record: &RawRecord, context: &VendorRunContext) -> License {
    let mut updated = current.clone();
    updated.status = record.status;
    updated.monthly_cost = resolve_monthly_cost(record, &context.prices).or(current.monthly_cost);
    if record.currency.is_some() {
        updated.currency = record.currency.clone();
    }
    if record.email.is_some() {
        updated.email = record.email.clone();
    }
    if record.display_name.is_some() {
        updated.display_name = record.display_name.clone();
    }
    if let Some(license_type) = record.license_type.as_deref() {
        updated.license_type = Some(canonical_license_type(license_type));
    }
    if record.last_activity.is_some() {
        updated.last_activity = record.last_activity.and_then(truncate_to_seconds);
    }
    if record.metadata != Value::Null {
        updated.metadata = record.metadata.clone();
    }
    // A seat the vendor reports again is no longer expired by absence.
    if current.status == LicenseStatus::Expired && record.status != LicenseStatus::Expired {
        updated.expires_at = None;
    }
    updated
}

/// Write a classification onto a license row.
///
/// Flagged service/admin accounts never entered the matching pipeline, so
/// their matching fields stay exactly as they were.
fn apply_classification(license: &mut License, classification: &Classification) {
    license.is_external_email = classification.is_external_email;
    license.is_service_account = classification.is_service_account;
    license.service_account_owner_id = classification.service_account_owner_id;
    license.is_admin_account = classification.is_admin_account;
    license.admin_account_owner_id = classification.admin_account_owner_id;

    if classification.is_flagged_account() {
        return;
    }

    license.employee_id = classification.employee_id;
    license.suggested_employee_id = classification.suggested_employee_id;
    license.match_confidence = classification.match_confidence;
    license.match_status = classification.match_status;
    license.match_method = classification.match_method;
}

/// Storage keeps timestamps at second precision; comparing a fresh
/// sub-second value against a persisted one would make every run look like a
/// change.
fn truncate_to_seconds(value: DateTime<Utc>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.timestamp(), 0)
}

/// Whether two row images differ in anything except `synced_at`.
fn materially_differs(current: &License, candidate: &License) -> bool {
    let mut normalized = candidate.clone();
    normalized.synced_at = current.synced_at;
    normalized != *current
}

#[cfg(test)]
mod tests {
    use seatsync_domain::{Employee, EmploymentStatus, MatchStatus};

    use super::*;

    fn context(domains: &[&str]) -> VendorRunContext {
        VendorRunContext {
            directory: DirectorySnapshot::new(vec![Employee {
                id: Uuid::from_u128(10),
                email: "ada@co.com".to_string(),
                display_name: "Ada Lovelace".to_string(),
                department: None,
                status: EmploymentStatus::Active,
                source: None,
            }]),
            patterns: PatternSnapshot::new(Vec::new(), Vec::new(), Vec::new()),
            links: ExternalIdentityMap::default(),
            prices: PriceBook::default(),
            matching: MatchingConfig {
                company_domains: domains.iter().map(ToString::to_string).collect(),
            },
        }
    }

    fn record(external_id: &str, email: Option<&str>) -> RawRecord {
        let mut record = RawRecord::new(external_id, LicenseStatus::Active);
        record.email = email.map(ToString::to_string);
        record
    }

    #[test]
    fn first_sighting_creates_and_classifies() {
        let ctx = context(&["co.com"]);
        let records = vec![record("ada@co.com", Some("ada@co.com"))];

        let (plan, summary) =
            build_plan(Uuid::from_u128(1), &records, &[], &ctx, Utc::now());

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(plan.creates.len(), 1);
        let created = &plan.creates[0];
        assert_eq!(created.employee_id, Some(Uuid::from_u128(10)));
        assert_eq!(created.match_status, Some(MatchStatus::AutoMatched));
    }

    #[test]
    fn malformed_records_are_skipped_and_counted() {
        let ctx = context(&["co.com"]);
        let records = vec![record("   ", Some("ada@co.com"))];

        let (plan, summary) =
            build_plan(Uuid::from_u128(1), &records, &[], &ctx, Utc::now());

        assert!(plan.is_empty());
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 0);
    }

    #[test]
    fn identical_rerun_writes_nothing() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);
        let records = vec![record("ada@co.com", Some("ada@co.com"))];

        let (first_plan, _) = build_plan(vendor_id, &records, &[], &ctx, Utc::now());
        let persisted = first_plan.creates;

        let (second_plan, summary) =
            build_plan(vendor_id, &records, &persisted, &ctx, Utc::now());

        assert!(second_plan.is_empty(), "identical rerun must not write");
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.expired, 0);
    }

    #[test]
    fn reviewed_rows_keep_assignment_but_track_operational_fields() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);

        let (plan, _) = build_plan(
            vendor_id,
            &[record("ext1", Some("x@gmail.com"))],
            &[],
            &ctx,
            Utc::now(),
        );
        let mut persisted = plan.creates;
        // Reviewer confirms the guest seat belongs to Ada.
        persisted[0].match_status = Some(MatchStatus::Confirmed);
        persisted[0].employee_id = Some(Uuid::from_u128(10));

        let mut changed = record("ext1", Some("x@gmail.com"));
        changed.status = LicenseStatus::Suspended;

        let (second_plan, summary) =
            build_plan(vendor_id, &[changed], &persisted, &ctx, Utc::now());

        assert_eq!(summary.updated, 1);
        let updated = &second_plan.updates[0];
        assert_eq!(updated.status, LicenseStatus::Suspended);
        // The reviewer decision survives untouched.
        assert_eq!(updated.match_status, Some(MatchStatus::Confirmed));
        assert_eq!(updated.employee_id, Some(Uuid::from_u128(10)));
    }

    #[test]
    fn unreviewed_rows_are_reclassified() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);

        // Persisted as needing review against an empty link map.
        let (plan, _) = build_plan(
            vendor_id,
            &[record("u-777", None)],
            &[],
            &ctx,
            Utc::now(),
        );
        let persisted = plan.creates;
        assert_eq!(persisted[0].match_status, Some(MatchStatus::ExternalReview));

        // An admin has since linked the account.
        let mut relinked = context(&["co.com"]);
        relinked.links = ExternalIdentityMap::for_vendor_type(
            "vendor",
            &[seatsync_domain::ExternalIdentityLink {
                id: Uuid::new_v4(),
                vendor_type: "vendor".to_string(),
                external_username: "u-777".to_string(),
                employee_id: Uuid::from_u128(10),
            }],
        );

        let (second_plan, _) =
            build_plan(vendor_id, &[record("u-777", None)], &persisted, &relinked, Utc::now());

        assert_eq!(second_plan.updates.len(), 1);
        let updated = &second_plan.updates[0];
        assert_eq!(updated.employee_id, Some(Uuid::from_u128(10)));
        assert_eq!(updated.match_status, Some(MatchStatus::AutoMatched));
    }

    #[test]
    fn absent_rows_expire_once() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);

        let (plan, _) = build_plan(
            vendor_id,
            &[record("gone@co.com", Some("gone@co.com"))],
            &[],
            &ctx,
            Utc::now(),
        );
        let persisted = plan.creates;

        let (second_plan, summary) = build_plan(vendor_id, &[], &persisted, &ctx, Utc::now());
        assert_eq!(summary.expired, 1);
        assert_eq!(second_plan.expirations.len(), 1);
        assert_eq!(second_plan.expirations[0].status, LicenseStatus::Expired);
        assert!(second_plan.expirations[0].expires_at.is_some());

        // Already expired: the third run leaves it alone.
        let expired = second_plan.expirations;
        let (third_plan, summary) = build_plan(vendor_id, &[], &expired, &ctx, Utc::now());
        assert!(third_plan.is_empty());
        assert_eq!(summary.expired, 0);
    }

    #[test]
    fn cancelled_rows_do_not_expire() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);

        let (plan, _) = build_plan(
            vendor_id,
            &[record("c@co.com", Some("c@co.com"))],
            &[],
            &ctx,
            Utc::now(),
        );
        let mut persisted = plan.creates;
        persisted[0].status = LicenseStatus::Cancelled;

        let (second_plan, summary) = build_plan(vendor_id, &[], &persisted, &ctx, Utc::now());
        assert!(second_plan.is_empty());
        assert_eq!(summary.expired, 0);
    }

    #[test]
    fn reappearing_seat_clears_absence_expiry() {
        let ctx = context(&["co.com"]);
        let vendor_id = Uuid::from_u128(1);

        let (plan, _) = build_plan(
            vendor_id,
            &[record("back@co.com", Some("back@co.com"))],
            &[],
            &ctx,
            Utc::now(),
        );
        let persisted = plan.creates;

        let (expired_plan, _) = build_plan(vendor_id, &[], &persisted, &ctx, Utc::now());
        let expired = expired_plan.expirations;

        let (revived_plan, summary) = build_plan(
            vendor_id,
            &[record("back@co.com", Some("back@co.com"))],
            &expired,
            &ctx,
            Utc::now(),
        );

        assert_eq!(summary.updated, 1);
        let revived = &revived_plan.updates[0];
        assert_eq!(revived.status, LicenseStatus::Active);
        assert_eq!(revived.expires_at, None);
    }

    #[test]
    fn license_type_is_canonicalized_on_write() {
        let ctx = context(&["co.com"]);
        let mut raw = record("u1", None);
        raw.license_type = Some("Power BI, E5".to_string());

        let (plan, _) = build_plan(Uuid::from_u128(1), &[raw], &[], &ctx, Utc::now());
        assert_eq!(plan.creates[0].license_type.as_deref(), Some("E5, Power BI"));
    }
}
