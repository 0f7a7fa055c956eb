//! Skip-rule evaluation: which tests are disabled for a runtime context.
//!
//! Stateless and read-only. Candidate tests come from the repository
//! (minus soft-deleted ones); each test's active rules are scanned in
//! creation order and the first matching rule wins.

use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use crate::db;
use crate::entity::skip_rule;
use crate::error::{AppError, AppResult};
use crate::models::{DisabledTest, DisabledTestsResponse, EvaluateDisabledRequest};
use crate::services::glob;

/// Evaluate which tests are disabled for the given runtime context.
///
/// Tests with no matching rule are absent from the map (treated as
/// enabled). The response key is the test key from `db::test_cases`.
pub async fn evaluate_disabled(
    conn: &DatabaseConnection,
    request: &EvaluateDisabledRequest,
) -> AppResult<DisabledTestsResponse> {
    let repository = request
        .repository
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::InvalidInput("repository is required".to_string()))?;

    let candidates = db::test_cases::find_candidates(
        conn,
        repository,
        request.test_ids.as_deref(),
        request.project_name.as_deref(),
    )
    .await?;

    let candidate_ids: Vec<Uuid> = candidates.iter().map(|t| t.id).collect();
    let rules = db::skip_rules::active_rules_for_tests(conn, &candidate_ids).await?;

    // Group preserving the retrieval order, which is the evaluation order
    let mut rules_by_test: HashMap<Uuid, Vec<skip_rule::Model>> = HashMap::new();
    for rule in rules {
        rules_by_test.entry(rule.test_case_id).or_default().push(rule);
    }

    let host = request.base_url.as_deref().and_then(host_of);
    let branch = request.branch.as_deref();

    let mut disabled_tests = HashMap::new();
    for test in &candidates {
        let Some(test_rules) = rules_by_test.get(&test.id) else {
            continue;
        };
        if let Some(rule) = first_matching_rule(test_rules, branch, host.as_deref()) {
            let key = db::test_cases::test_key(&test.file_path, &test.project_name, &test.title);
            disabled_tests.insert(
                key,
                DisabledTest {
                    reason: rule.reason.clone(),
                    rule_id: rule.id,
                    matched_branch: rule.branch_pattern.clone(),
                    matched_env: rule.env_pattern.clone(),
                },
            );
        }
    }

    Ok(DisabledTestsResponse {
        disabled_tests,
        timestamp: Utc::now(),
    })
}

/// Host component of a base URL, lowercased.
///
/// An unparseable URL degrades to "no host" so environment-patterned rules
/// simply fail to match; evaluation never raises on bad input.
fn host_of(base_url: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
}

/// Ordered scan over a test's rules; the first satisfying rule wins and
/// the remaining rules are not evaluated.
fn first_matching_rule<'a>(
    rules: &'a [skip_rule::Model],
    branch: Option<&str>,
    host: Option<&str>,
) -> Option<&'a skip_rule::Model> {
    rules.iter().find(|rule| rule_matches(rule, branch, host))
}

/// Matching semantics for one rule.
///
/// No patterns at all is a global rule. A branch pattern requires the
/// branch to be supplied and to match; an environment pattern requires a
/// resolvable host that matches. Both present means both must match.
fn rule_matches(rule: &skip_rule::Model, branch: Option<&str>, host: Option<&str>) -> bool {
    if rule.branch_pattern.is_none() && rule.env_pattern.is_none() {
        return true;
    }

    if let Some(ref pattern) = rule.branch_pattern {
        match branch {
            Some(branch) if glob::matches_pattern(pattern, branch) => {}
            _ => return false,
        }
    }

    if let Some(ref pattern) = rule.env_pattern {
        match host {
            Some(host) if glob::matches_pattern(pattern, host) => {}
            _ => return false,
        }
    }

    true
}
