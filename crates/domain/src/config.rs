//! Configuration management

use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub reconcile: ReconcileConfig,
    pub matching: MatchingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Reconciliation run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub interval_seconds: u64,
    pub enabled: bool,
}

/// Identity-matching configuration
///
/// Passed explicitly into `classify()`; the engine never reads ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Email domains considered internal. Sub-domains of a listed domain are
    /// internal too ("mail.co.com" is internal when "co.com" is listed).
    pub company_domains: Vec<String>,
}

impl MatchingConfig {
    /// Whether the given email domain belongs to the company.
    pub fn is_company_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.company_domains.iter().any(|configured| {
            let configured = configured.to_lowercase();
            domain == configured || domain.ends_with(&format!(".{configured}"))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "seatsync.db".to_string(),
                pool_size: 8,
            },
            reconcile: ReconcileConfig {
                interval_seconds: 3600,
                enabled: true,
            },
            matching: MatchingConfig {
                company_domains: Vec::new(),
            },
        }
    }
}
