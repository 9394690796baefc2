//! Identity-matching engine
//!
//! `classify` is a pure decision function: one raw record plus the read-only
//! run snapshots in, one [`Classification`] out. Strategies run in fixed
//! priority order and the first success wins; each strategy carries a fixed
//! confidence. Configuration (company domains) is passed in explicitly so the
//! engine never reads ambient state.

use seatsync_domain::constants::{
    EXACT_EMAIL_CONFIDENCE, EXTERNAL_ACCOUNT_CONFIDENCE, FUZZY_MIN_SCORE, LOCAL_PART_CONFIDENCE,
};
use seatsync_domain::{Classification, MatchMethod, MatchStatus, MatchingConfig, RawRecord};
use uuid::Uuid;

use super::fuzzy::name_similarity;
use super::registry::{ExternalIdentityMap, PatternSnapshot};
use crate::directory::DirectorySnapshot;

/// Classify one raw record against the run snapshots.
///
/// Strategy order: service/admin flagging (short-circuits identity matching),
/// external identity map, exact email, unique local-part, fuzzy display name.
/// The company-domain check is independent and only decides between
/// `external_guest` and `external_review` when nothing matched.
pub fn classify(
    record: &RawRecord,
    directory: &DirectorySnapshot,
    patterns: &PatternSnapshot,
    links: &ExternalIdentityMap,
    config: &MatchingConfig,
) -> Classification {
    let mut result = Classification::default();

    if let Some(email) = record.email.as_deref().or_else(|| record.pattern_email()) {
        if let Some(domain) = email_domain(email) {
            result.is_external_email = !config.is_company_domain(domain);
        }
    }

    // 1. Service/admin account flagging. Flagged records never enter the
    //    employee-matching pipeline; match_status stays untouched.
    apply_account_flags(record, patterns, &mut result);
    if result.is_flagged_account() {
        return result;
    }

    // 2. Manually linked external account.
    if let Some(employee_id) = links.lookup(&record.external_id) {
        result.employee_id = Some(employee_id);
        result.match_confidence = Some(EXTERNAL_ACCOUNT_CONFIDENCE);
        result.match_method = Some(MatchMethod::ExternalAccount);
        result.match_status = Some(MatchStatus::AutoMatched);
        return result;
    }

    let email = record.email.as_deref().map(str::trim).filter(|email| !email.is_empty());

    if let Some(email) = email {
        // 3. Exact case-folded email.
        if let Some(employee) = directory.by_email(email) {
            result.employee_id = Some(employee.id);
            result.match_confidence = Some(EXACT_EMAIL_CONFIDENCE);
            result.match_method = Some(MatchMethod::ExactEmail);
            result.match_status = Some(MatchStatus::AutoMatched);
            return result;
        }

        // 4. Local-part match, only when unambiguous.
        if let Some(local_part) = email.split('@').next().filter(|part| !part.is_empty()) {
            let candidates = directory.by_local_part(local_part);
            if candidates.len() == 1 {
                result.suggested_employee_id = Some(candidates[0].id);
                result.match_confidence = Some(LOCAL_PART_CONFIDENCE);
                result.match_method = Some(MatchMethod::LocalPart);
                result.match_status = Some(MatchStatus::Suggested);
                return result;
            }
            // Two or more candidates: ambiguous, leave unsuggested for review.
        }
    } else if let Some(display_name) = record.display_name.as_deref() {
        // 5. Fuzzy display-name scoring; only runs when no email is usable.
        if let Some((employee_id, score)) = best_fuzzy_candidate(display_name, directory) {
            result.suggested_employee_id = Some(employee_id);
            result.match_confidence = Some(score);
            result.match_method = Some(MatchMethod::FuzzyName);
            result.match_status = Some(MatchStatus::Suggested);
            return result;
        }
    }

    // 6. No internal match: guests from outside the company domains are
    //    classified as such instead of entering the review queue.
    result.match_status = Some(if result.is_external_email {
        MatchStatus::ExternalGuest
    } else {
        MatchStatus::ExternalReview
    });
    result
}

fn apply_account_flags(
    record: &RawRecord,
    patterns: &PatternSnapshot,
    result: &mut Classification,
) {
    if let Some(email) = record.pattern_email() {
        if let Some(hit) = patterns.service.find(email) {
            result.is_service_account = true;
            result.service_account_owner_id = hit.owner_employee_id;
        }
        if let Some(hit) = patterns.admin.find(email) {
            result.is_admin_account = true;
            result.admin_account_owner_id = hit.owner_employee_id;
        }
    }

    if let Some(license_type) = record.license_type.as_deref() {
        if let Some(rule) = patterns.license_rule(license_type) {
            result.is_service_account = true;
            if result.service_account_owner_id.is_none() {
                result.service_account_owner_id = rule.owner_employee_id;
            }
        }
    }
}

/// Best-scoring active employee at or above the fuzzy threshold.
///
/// Ties on score break deterministically by employee id order.
fn best_fuzzy_candidate(
    display_name: &str,
    directory: &DirectorySnapshot,
) -> Option<(Uuid, f32)> {
    let mut candidates: Vec<(Uuid, f32)> = directory
        .active()
        .map(|employee| (employee.id, name_similarity(display_name, &employee.display_name)))
        .filter(|&(_, score)| score >= FUZZY_MIN_SCORE)
        .collect();

    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
    });

    candidates.first().copied()
}

fn email_domain(email: &str) -> Option<&str> {
    email.rsplit_once('@').map(|(_, domain)| domain).filter(|domain| !domain.is_empty())
}
