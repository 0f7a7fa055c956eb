//! Wire format for skip-rule management and disablement evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::skip_rule;

/// Request body for the disablement evaluation entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateDisabledRequest {
    pub repository: Option<String>,
    /// Restrict evaluation to these test ids (all repository tests otherwise).
    pub test_ids: Option<Vec<Uuid>>,
    pub project_name: Option<String>,
    pub branch: Option<String>,
    pub base_url: Option<String>,
}

/// A disabled test: the first rule that matched the runtime context.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisabledTest {
    pub reason: String,
    pub rule_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_env: Option<String>,
}

/// Response for the disablement evaluation entrypoint.
///
/// Keyed by test key (`file_path::project_name::title`) so a runner checking
/// many tests against one response gets O(1) lookups. Tests with no matching
/// rule are absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisabledTestsResponse {
    pub disabled_tests: HashMap<String, DisabledTest>,
    pub timestamp: DateTime<Utc>,
}

impl DisabledTestsResponse {
    /// An empty response (nothing disabled); used by fail-open clients.
    pub fn empty() -> Self {
        Self {
            disabled_tests: HashMap::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Request body for creating a skip rule.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSkipRuleRequest {
    pub branch_pattern: Option<String>,
    pub env_pattern: Option<String>,
    pub reason: String,
}

/// A skip rule as returned by the management endpoints.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkipRuleResponse {
    pub id: Uuid,
    pub test_case_id: Uuid,
    pub branch_pattern: Option<String>,
    pub env_pattern: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl From<skip_rule::Model> for SkipRuleResponse {
    fn from(model: skip_rule::Model) -> Self {
        Self {
            id: model.id,
            test_case_id: model.test_case_id,
            branch_pattern: model.branch_pattern,
            env_pattern: model.env_pattern,
            reason: model.reason,
            created_at: model.created_at,
        }
    }
}
