//! End-to-end reconciliation tests over a real SQLite database.
//!
//! Each test builds a temp-dir database, seeds the directory and rule
//! tables through the repositories, and drives the coordinator with a
//! programmable provider adapter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seatsync_core::{
    DirectoryRepository, IdentityLinkRepository, LicenseRepository, PatternRepository,
    PriceRepository, ProviderAdapter, ProviderRegistry, ReconcileDeps, ReconcileService,
    VendorRepository,
};
use seatsync_domain::{
    AccountPattern, Employee, EmploymentStatus, ExternalIdentityLink, LicenseStatus,
    MatchMethod, MatchStatus, MatchingConfig, RawRecord, Result as DomainResult, Vendor,
};
use seatsync_infra::{
    DbManager, SqliteEmployeeRepository, SqliteIdentityLinkRepository, SqliteLicenseRepository,
    SqlitePatternRepository, SqlitePriceRepository, SqliteVendorRepository,
};
use tempfile::TempDir;
use uuid::Uuid;

/// Adapter whose upstream records can be swapped between runs.
struct MutableAdapter {
    records: Mutex<Vec<RawRecord>>,
}

impl MutableAdapter {
    fn new(records: Vec<RawRecord>) -> Self {
        Self { records: Mutex::new(records) }
    }

    fn set_records(&self, records: Vec<RawRecord>) {
        *self.records.lock().unwrap() = records;
    }
}

#[async_trait]
impl ProviderAdapter for MutableAdapter {
    async fn fetch_licenses(&self) -> DomainResult<Vec<RawRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }
}

struct SingleAdapterRegistry {
    vendor_type: String,
    adapter: Arc<MutableAdapter>,
}

impl ProviderRegistry for SingleAdapterRegistry {
    fn adapter_for(&self, vendor_type: &str) -> Option<Arc<dyn ProviderAdapter>> {
        (vendor_type == self.vendor_type)
            .then(|| Arc::clone(&self.adapter) as Arc<dyn ProviderAdapter>)
    }
}

struct Harness {
    _temp_dir: TempDir,
    vendor: Vendor,
    adapter: Arc<MutableAdapter>,
    licenses: Arc<SqliteLicenseRepository>,
    patterns: Arc<SqlitePatternRepository>,
    identity_links: Arc<SqliteIdentityLinkRepository>,
    prices: Arc<SqlitePriceRepository>,
    employees: Arc<SqliteEmployeeRepository>,
    service: ReconcileService,
}

async fn harness(vendor_type: &str) -> Harness {
    let temp_dir = TempDir::new().expect("temp dir created");
    let db = Arc::new(
        DbManager::new(temp_dir.path().join("seatsync.db"), 4).expect("manager created"),
    );
    db.run_migrations().expect("migrations run");

    let vendor = Vendor {
        id: Uuid::new_v4(),
        name: "Test Vendor".to_string(),
        vendor_type: vendor_type.to_string(),
        enabled: true,
    };

    let vendors = Arc::new(SqliteVendorRepository::new(Arc::clone(&db)));
    vendors.upsert_vendor(&vendor).await.expect("vendor seeded");

    let employees = Arc::new(SqliteEmployeeRepository::new(Arc::clone(&db)));
    let licenses = Arc::new(SqliteLicenseRepository::new(Arc::clone(&db)));
    let patterns = Arc::new(SqlitePatternRepository::new(Arc::clone(&db)));
    let identity_links = Arc::new(SqliteIdentityLinkRepository::new(Arc::clone(&db)));
    let prices = Arc::new(SqlitePriceRepository::new(Arc::clone(&db)));

    let adapter = Arc::new(MutableAdapter::new(Vec::new()));

    let service = ReconcileService::new(
        ReconcileDeps {
            vendors: Arc::clone(&vendors) as Arc<dyn VendorRepository>,
            licenses: Arc::clone(&licenses) as Arc<dyn LicenseRepository>,
            directory: Arc::clone(&employees) as Arc<dyn DirectoryRepository>,
            patterns: Arc::clone(&patterns) as Arc<dyn PatternRepository>,
            identity_links: Arc::clone(&identity_links) as Arc<dyn IdentityLinkRepository>,
            prices: Arc::clone(&prices) as Arc<dyn PriceRepository>,
            providers: Arc::new(SingleAdapterRegistry {
                vendor_type: vendor_type.to_string(),
                adapter: Arc::clone(&adapter),
            }),
        },
        MatchingConfig { company_domains: vec!["co.com".to_string()] },
    );

    Harness {
        _temp_dir: temp_dir,
        vendor,
        adapter,
        licenses,
        patterns,
        identity_links,
        prices,
        employees,
        service,
    }
}

async fn seed_employee(harness: &Harness, email: &str, name: &str) -> Employee {
    let employee = Employee {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: name.to_string(),
        department: None,
        status: EmploymentStatus::Active,
        source: Some("hris".to_string()),
    };
    harness.employees.upsert_employee(&employee).await.expect("employee seeded");
    employee
}

fn record(external_id: &str, email: Option<&str>) -> RawRecord {
    let mut record = RawRecord::new(external_id, LicenseStatus::Active);
    record.email = email.map(ToString::to_string);
    record
}

#[tokio::test(flavor = "multi_thread")]
async fn initial_fetch_matches_and_flags_guests() {
    let harness = harness("saas").await;
    seed_employee(&harness, "a@co.com", "A Person").await;
    seed_employee(&harness, "b@co.com", "B Person").await;

    harness.adapter.set_records(vec![
        record("a@co.com", Some("a@co.com")),
        record("b@co.com", Some("b@co.com")),
        record("ext1", Some("x@gmail.com")),
    ]);

    let summary = harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    assert_eq!(summary.created, 3);
    assert_eq!(summary.needs_review, 1);

    let a = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "a@co.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a.match_status, Some(MatchStatus::AutoMatched));
    assert_eq!(a.match_method, Some(MatchMethod::ExactEmail));
    assert_eq!(a.status, LicenseStatus::Active);
    assert!(a.employee_id.is_some());

    let ext = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ext1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ext.match_status, Some(MatchStatus::ExternalGuest));
    assert!(ext.is_external_email);
    assert_eq!(ext.employee_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_with_identical_data_modifies_nothing() {
    let harness = harness("saas").await;
    seed_employee(&harness, "a@co.com", "A Person").await;

    harness.adapter.set_records(vec![
        record("a@co.com", Some("a@co.com")),
        record("ext1", Some("x@gmail.com")),
    ]);

    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    let first_rows = harness.licenses.licenses_for_vendor(harness.vendor.id).await.unwrap();

    let summary = harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    assert_eq!(summary.writes(), 0, "identical rerun must not write");

    let second_rows = harness.licenses.licenses_for_vendor(harness.vendor.id).await.unwrap();
    assert_eq!(first_rows, second_rows, "persisted rows must be unchanged");
}

#[tokio::test(flavor = "multi_thread")]
async fn reviewer_decision_survives_reruns() {
    let harness = harness("saas").await;
    let reviewer_pick = seed_employee(&harness, "e@co.com", "E Person").await;

    harness.adapter.set_records(vec![record("ext1", Some("x@gmail.com"))]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let guest = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ext1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(guest.match_status, Some(MatchStatus::ExternalGuest));

    // Admin confirms the seat belongs to E.
    harness
        .licenses
        .mark_reviewed(guest.id, MatchStatus::Confirmed, Some(reviewer_pick.id))
        .await
        .unwrap();

    // Several subsequent runs with the same upstream record.
    for _ in 0..3 {
        harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    }

    let after = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ext1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.match_status, Some(MatchStatus::Confirmed));
    assert_eq!(after.employee_id, Some(reviewer_pick.id));

    // Operational changes still land on the confirmed row.
    let mut suspended = record("ext1", Some("x@gmail.com"));
    suspended.status = LicenseStatus::Suspended;
    harness.adapter.set_records(vec![suspended]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let after_suspend = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ext1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_suspend.status, LicenseStatus::Suspended);
    assert_eq!(after_suspend.match_status, Some(MatchStatus::Confirmed));
    assert_eq!(after_suspend.employee_id, Some(reviewer_pick.id));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_decision_survives_reclassification_triggers() {
    let harness = harness("saas").await;
    seed_employee(&harness, "ada@co.com", "Ada Lovelace").await;

    harness.adapter.set_records(vec![record("ada@co.com", Some("ada@co.com"))]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let matched = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ada@co.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(matched.match_status, Some(MatchStatus::AutoMatched));

    // Reviewer rejects the automatic match.
    harness.licenses.mark_reviewed(matched.id, MatchStatus::Rejected, None).await.unwrap();

    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let after = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "ada@co.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.match_status, Some(MatchStatus::Rejected));
    assert_eq!(after.employee_id, None);
    // The engine did not resurrect the old suggestion either.
    assert_eq!(after.match_method, matched.match_method);
    assert_eq!(after.match_confidence, matched.match_confidence);
}

#[tokio::test(flavor = "multi_thread")]
async fn disappeared_seat_expires_and_leaves_cost_totals() {
    let harness = harness("saas").await;
    seed_employee(&harness, "a@co.com", "A Person").await;
    seed_employee(&harness, "b@co.com", "B Person").await;

    let mut a = record("a@co.com", Some("a@co.com"));
    a.cost = Some(10.0);
    let mut b = record("b@co.com", Some("b@co.com"));
    b.cost = Some(15.0);

    harness.adapter.set_records(vec![a.clone(), b]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let total = harness.licenses.active_monthly_cost(harness.vendor.id).await.unwrap();
    assert!((total - 25.0).abs() < 1e-9);

    // Vendor stops returning b.
    harness.adapter.set_records(vec![a]);
    let summary = harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    assert_eq!(summary.expired, 1);

    let b_row = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "b@co.com")
        .await
        .unwrap()
        .expect("row must not be deleted");
    assert_eq!(b_row.status, LicenseStatus::Expired);
    assert!(b_row.expires_at.is_some());
    // Cost is retained on the row for history, but excluded from active totals.
    assert_eq!(b_row.monthly_cost, Some(15.0));

    let total = harness.licenses.active_monthly_cost(harness.vendor.id).await.unwrap();
    assert!((total - 10.0).abs() < 1e-9);

    // A third run does not expire it again.
    let summary = harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    assert_eq!(summary.expired, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn service_pattern_attributes_owner_and_skips_matching() {
    let harness = harness("saas").await;
    let owner = seed_employee(&harness, "e2@co.com", "E Two").await;

    harness
        .patterns
        .add_service_pattern(&AccountPattern {
            id: Uuid::new_v4(),
            pattern: "svc-*@co.com".to_string(),
            owner_employee_id: Some(owner.id),
            display_name: Some("CI automation".to_string()),
        })
        .await
        .unwrap();

    harness.adapter.set_records(vec![record("svc-ci@co.com", None)]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let row = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "svc-ci@co.com")
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_service_account);
    assert_eq!(row.service_account_owner_id, Some(owner.id));
    // Never entered the matching pipeline.
    assert_eq!(row.match_status, None);
    assert_eq!(row.match_method, None);
    assert_eq!(row.employee_id, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn combined_license_type_prices_per_component() {
    let harness = harness("saas").await;

    harness.prices.set_price(harness.vendor.id, "E5", 30.0).await.unwrap();
    harness.prices.set_price(harness.vendor.id, "Power BI", 10.0).await.unwrap();

    let mut seat = record("u1", None);
    seat.license_type = Some("E5, Power BI".to_string());
    harness.adapter.set_records(vec![seat]);

    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let row = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "u1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.monthly_cost, Some(40.0));
    // Stored canonically, component-sorted.
    assert_eq!(row.license_type.as_deref(), Some("E5, Power BI"));
}

#[tokio::test(flavor = "multi_thread")]
async fn external_identity_link_matches_opaque_usernames() {
    let harness = harness("github").await;
    let linked = seed_employee(&harness, "dev@co.com", "Dev Person").await;

    harness
        .identity_links
        .add_link(&ExternalIdentityLink {
            id: Uuid::new_v4(),
            vendor_type: "github".to_string(),
            external_username: "OctoCat".to_string(),
            employee_id: linked.id,
        })
        .await
        .unwrap();

    harness.adapter.set_records(vec![record("octocat", None)]);
    harness.service.reconcile_vendor(&harness.vendor).await.unwrap();

    let row = harness
        .licenses
        .find_by_external_id(harness.vendor.id, "octocat")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.employee_id, Some(linked.id));
    assert_eq!(row.match_method, Some(MatchMethod::ExternalAccount));
    assert_eq!(row.match_status, Some(MatchStatus::AutoMatched));
    assert_eq!(row.match_confidence, Some(1.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_records_are_counted_not_fatal() {
    let harness = harness("saas").await;
    seed_employee(&harness, "a@co.com", "A Person").await;

    harness.adapter.set_records(vec![
        record("", Some("ghost@co.com")),
        record("a@co.com", Some("a@co.com")),
    ]);

    let summary = harness.service.reconcile_vendor(&harness.vendor).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.created, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn reconcile_all_reports_per_vendor_counts() {
    let harness = harness("saas").await;
    seed_employee(&harness, "a@co.com", "A Person").await;
    harness.adapter.set_records(vec![record("a@co.com", Some("a@co.com"))]);

    let report = harness.service.reconcile_all().await.unwrap();
    assert_eq!(report.vendors.len(), 1);
    let vendor_report = &report.vendors[0];
    assert_eq!(vendor_report.vendor_id, harness.vendor.id);
    assert!(!vendor_report.is_failure());
    assert_eq!(vendor_report.summary.unwrap().created, 1);
}
