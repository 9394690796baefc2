//! In-memory pattern registries and the external identity map
//!
//! Loaded once per run so that a batch of tens of thousands of licenses never
//! pays a database round-trip per record. Exact patterns are a case-folded
//! lookup table; globs (`*`/`?`) are precompiled to anchored regexes at load
//! and scanned linearly. Exact entries are always checked before globs,
//! independent of registration order, so a precise pattern wins over an
//! accidental wildcard overlap.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use seatsync_domain::{AccountPattern, ExternalIdentityLink, LicenseTypeRule};
use tracing::warn;
use uuid::Uuid;

/// Compiled matcher over one set of account patterns
#[derive(Debug, Default)]
pub struct PatternMatcher {
    entries: Vec<AccountPattern>,
    exact: HashMap<String, usize>,
    globs: Vec<(usize, Regex)>,
}

impl PatternMatcher {
    /// Compile the pattern set. Invalid globs are skipped with a warning
    /// rather than failing the run.
    pub fn new(entries: Vec<AccountPattern>) -> Self {
        let mut exact = HashMap::new();
        let mut globs = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            let pattern = entry.pattern.trim().to_lowercase();
            if pattern.is_empty() {
                continue;
            }

            if pattern.contains('*') || pattern.contains('?') {
                match compile_glob(&pattern) {
                    Ok(regex) => globs.push((idx, regex)),
                    Err(error) => {
                        warn!(pattern = %entry.pattern, %error, "skipping unparseable account pattern");
                    }
                }
            } else {
                exact.entry(pattern).or_insert(idx);
            }
        }

        Self { entries, exact, globs }
    }

    /// Find the matching pattern for an email, exact entries first.
    pub fn find(&self, email: &str) -> Option<&AccountPattern> {
        let key = email.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        if let Some(&idx) = self.exact.get(&key) {
            return Some(&self.entries[idx]);
        }

        self.globs
            .iter()
            .find(|(_, regex)| regex.is_match(&key))
            .map(|&(idx, _)| &self.entries[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.globs.is_empty()
    }
}

/// Translate a glob (`*`/`?`) into an anchored, case-insensitive regex.
fn compile_glob(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expression.push_str(".*"),
            '?' => expression.push('.'),
            other => expression.push_str(&regex::escape(&other.to_string())),
        }
    }
    expression.push('$');

    RegexBuilder::new(&expression).case_insensitive(true).build()
}

/// All per-run rule sets the matching engine consults
#[derive(Debug, Default)]
pub struct PatternSnapshot {
    pub service: PatternMatcher,
    pub admin: PatternMatcher,
    license_rules: HashMap<String, LicenseTypeRule>,
}

impl PatternSnapshot {
    pub fn new(
        service_patterns: Vec<AccountPattern>,
        admin_patterns: Vec<AccountPattern>,
        license_rules: Vec<LicenseTypeRule>,
    ) -> Self {
        let license_rules = license_rules
            .into_iter()
            .map(|rule| (rule.license_type.trim().to_lowercase(), rule))
            .collect();

        Self {
            service: PatternMatcher::new(service_patterns),
            admin: PatternMatcher::new(admin_patterns),
            license_rules,
        }
    }

    /// Exact, case-insensitive license-type rule lookup.
    pub fn license_rule(&self, license_type: &str) -> Option<&LicenseTypeRule> {
        self.license_rules.get(&license_type.trim().to_lowercase())
    }
}

/// Case-folded `(external username) -> employee` map for one vendor type
#[derive(Debug, Default)]
pub struct ExternalIdentityMap {
    by_username: HashMap<String, Uuid>,
}

impl ExternalIdentityMap {
    /// Build the map from persisted links, keeping only the given vendor
    /// type.
    pub fn for_vendor_type(vendor_type: &str, links: &[ExternalIdentityLink]) -> Self {
        let by_username = links
            .iter()
            .filter(|link| link.vendor_type.eq_ignore_ascii_case(vendor_type))
            .map(|link| (link.external_username.trim().to_lowercase(), link.employee_id))
            .collect();

        Self { by_username }
    }

    pub fn lookup(&self, external_username: &str) -> Option<Uuid> {
        self.by_username.get(&external_username.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_username.is_empty()
    }
}
