//! Wildcard-aware comparison of granted and required action lists.
//!
//! Only a trailing `*` is a wildcard. Matching is tried in both directions
//! when classifying grants, so a broad grant that covers any required action
//! is never reported as excessive, even if it also covers unrelated actions.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::policy::IamPolicy;

/// Exit status for a report with missing actions.
pub const EXIT_MISSING: i32 = 1;
/// Exit status for a report with only excessive actions.
pub const EXIT_EXCESSIVE: i32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComplianceReport {
    /// Required but not granted.
    pub missing: Vec<String>,
    /// Granted but not required.
    pub excessive: Vec<String>,
    /// Required and granted.
    pub matched: Vec<String>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.missing.is_empty() && self.excessive.is_empty()
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn has_excessive(&self) -> bool {
        !self.excessive.is_empty()
    }

    /// 0 when compliant, 1 when anything is missing, 2 when only excessive.
    pub fn exit_code(&self) -> i32 {
        if self.has_missing() {
            EXIT_MISSING
        } else if self.has_excessive() {
            EXIT_EXCESSIVE
        } else {
            0
        }
    }
}

/// Whether `pattern` covers `action`.
///
/// A pattern ending in `*` matches by prefix. Otherwise an action ending in
/// `*` matches when the pattern starts with the action's prefix.
pub fn action_matches(pattern: &str, action: &str) -> bool {
    if pattern == action {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return action.starts_with(prefix);
    }
    if let Some(prefix) = action.strip_suffix('*') {
        return pattern.starts_with(prefix);
    }
    false
}

pub fn diff<G, R>(granted: G, required: R) -> ComplianceReport
where
    G: IntoIterator,
    G::Item: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    let granted: Vec<String> = normalize(granted);
    let required: Vec<String> = normalize(required);

    let (matched, missing): (Vec<String>, Vec<String>) = required
        .iter()
        .cloned()
        .partition(|r| granted.iter().any(|g| action_matches(g, r)));

    let excessive = granted
        .iter()
        .filter(|g| {
            !required
                .iter()
                .any(|r| action_matches(g, r) || action_matches(r, g))
        })
        .cloned()
        .collect();

    ComplianceReport {
        missing,
        excessive,
        matched,
    }
}

/// Compare the Allow actions of two policies.
pub fn check(existing: &IamPolicy, required: &IamPolicy) -> ComplianceReport {
    diff(existing.granted_actions(), required.granted_actions())
}

fn normalize<I>(actions: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    actions
        .into_iter()
        .map(|a| a.as_ref().to_string())
        .sorted()
        .dedup()
        .collect()
}
