//! Cost normalization
//!
//! Converts vendor-reported amounts and billing cycles into one canonical
//! monthly figure, and prices combined license-type strings component by
//! component from a per-vendor price book.

use std::collections::HashMap;

use seatsync_domain::constants::{LICENSE_TYPE_SEPARATOR, MONTHS_PER_QUARTER, MONTHS_PER_YEAR};
use seatsync_domain::{BillingCycle, RawRecord};

/// Convert an amount for the given billing cycle to a monthly figure.
///
/// Perpetual and one-time purchases carry no recurring cost.
pub fn monthly_amount(amount: f64, cycle: BillingCycle) -> f64 {
    match cycle {
        BillingCycle::Monthly => amount,
        BillingCycle::Quarterly => amount / MONTHS_PER_QUARTER,
        BillingCycle::Yearly => amount / MONTHS_PER_YEAR,
        BillingCycle::Perpetual | BillingCycle::OneTime => 0.0,
    }
}

/// Canonical form of a (possibly combined) license-type string.
///
/// Components are trimmed, empties dropped, and sorted case-insensitively so
/// "Power BI, E5" and "E5, Power BI" store as the same key.
pub fn canonical_license_type(raw: &str) -> String {
    let mut components: Vec<&str> = raw
        .split(LICENSE_TYPE_SEPARATOR)
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .collect();
    components.sort_by_key(|component| component.to_lowercase());
    components.join(", ")
}

/// Per-vendor component prices, loaded once per run
#[derive(Debug, Default)]
pub struct PriceBook {
    prices: HashMap<String, f64>,
}

impl PriceBook {
    /// Build the book from `(component, monthly price)` rows; component
    /// lookup is case-insensitive.
    pub fn new(prices: impl IntoIterator<Item = (String, f64)>) -> Self {
        let prices = prices
            .into_iter()
            .map(|(component, price)| (component.trim().to_lowercase(), price))
            .collect();
        Self { prices }
    }

    /// Monthly cost of a license-type string: the sum of its components'
    /// configured prices. Components with no configured price cost 0.
    pub fn monthly_cost(&self, license_type: &str) -> f64 {
        license_type
            .split(LICENSE_TYPE_SEPARATOR)
            .map(str::trim)
            .filter(|component| !component.is_empty())
            .map(|component| {
                self.prices.get(&component.to_lowercase()).copied().unwrap_or(0.0)
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Monthly cost for one raw record.
///
/// A vendor-reported amount (normalized by its billing cycle) wins; otherwise
/// the license type is priced from the book. Records with neither carry no
/// cost.
pub fn resolve_monthly_cost(record: &RawRecord, prices: &PriceBook) -> Option<f64> {
    if let Some(amount) = record.cost {
        let cycle = record.billing_cycle.unwrap_or(BillingCycle::Monthly);
        return Some(monthly_amount(amount, cycle));
    }

    record
        .license_type
        .as_deref()
        .map(str::trim)
        .filter(|license_type| !license_type.is_empty())
        .map(|license_type| prices.monthly_cost(license_type))
}

#[cfg(test)]
mod tests {
    use seatsync_domain::LicenseStatus;

    use super::*;

    #[test]
    fn cycle_conversions() {
        assert!((monthly_amount(120.0, BillingCycle::Yearly) - 10.0).abs() < 1e-9);
        assert!((monthly_amount(30.0, BillingCycle::Quarterly) - 10.0).abs() < 1e-9);
        assert!((monthly_amount(10.0, BillingCycle::Monthly) - 10.0).abs() < 1e-9);
        assert_eq!(monthly_amount(499.0, BillingCycle::Perpetual), 0.0);
        assert_eq!(monthly_amount(499.0, BillingCycle::OneTime), 0.0);
    }

    #[test]
    fn yearly_round_trip() {
        let amount = 1234.56;
        let monthly = monthly_amount(amount, BillingCycle::Yearly);
        assert!((monthly * 12.0 - amount).abs() < 1e-9);
    }

    #[test]
    fn canonical_license_type_sorts_components() {
        assert_eq!(canonical_license_type("Power BI, E5"), "E5, Power BI");
        assert_eq!(canonical_license_type("E5, Power BI"), "E5, Power BI");
        assert_eq!(canonical_license_type("  E5 , ,Power BI  "), "E5, Power BI");
        assert_eq!(canonical_license_type("E5"), "E5");
    }

    #[test]
    fn component_pricing_sums_and_defaults_missing_to_zero() {
        let book = PriceBook::new(vec![
            ("E5".to_string(), 30.0),
            ("Power BI".to_string(), 10.0),
        ]);

        assert!((book.monthly_cost("E5, Power BI") - 40.0).abs() < 1e-9);
        assert!((book.monthly_cost("power bi, e5") - 40.0).abs() < 1e-9);
        // "Teams" is not priced: 0, not an error.
        assert!((book.monthly_cost("E5, Power BI, Teams") - 40.0).abs() < 1e-9);
        assert_eq!(book.monthly_cost("Unknown"), 0.0);
    }

    #[test]
    fn vendor_reported_cost_wins_over_price_book() {
        let book = PriceBook::new(vec![("E5".to_string(), 30.0)]);

        let mut record = RawRecord::new("u1", LicenseStatus::Active);
        record.license_type = Some("E5".to_string());
        record.cost = Some(600.0);
        record.billing_cycle = Some(BillingCycle::Yearly);

        let monthly = resolve_monthly_cost(&record, &book).unwrap();
        assert!((monthly - 50.0).abs() < 1e-9);
    }

    #[test]
    fn price_book_used_when_vendor_reports_nothing() {
        let book = PriceBook::new(vec![
            ("E5".to_string(), 30.0),
            ("Power BI".to_string(), 10.0),
        ]);

        let mut record = RawRecord::new("u1", LicenseStatus::Active);
        record.license_type = Some("E5, Power BI".to_string());

        let monthly = resolve_monthly_cost(&record, &book).unwrap();
        assert!((monthly - 40.0).abs() < 1e-9);
    }

    #[test]
    fn no_cost_signal_resolves_to_none() {
        let record = RawRecord::new("u1", LicenseStatus::Active);
        assert_eq!(resolve_monthly_cost(&record, &PriceBook::default()), None);
    }
}
