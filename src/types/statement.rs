//! IAM policy statements declared inside a configuration tree.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use super::resource::Location;

/// Statement effect. Parsing is case-insensitive; rendering is canonical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Effect::from_str(raw.trim())
            .map_err(|_| serde::de::Error::custom(format!("unknown effect '{raw}'")))
    }
}

/// One statement of a declared policy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Default)]
pub struct DeclaredStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl DeclaredStatement {
    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }
}

/// A policy document found in the configuration: an IAM policy resource, an
/// inline role policy or an `aws_iam_policy_document` data source.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DeclaredPolicy {
    pub name: String,
    pub location: Location,
    pub statements: Vec<DeclaredStatement>,
}

impl DeclaredPolicy {
    /// Actions granted by Allow statements. Deny statements never add grants.
    pub fn allowed_actions(&self) -> impl Iterator<Item = &str> {
        self.statements
            .iter()
            .filter(|s| s.is_allow())
            .flat_map(|s| s.actions.iter().map(String::as_str))
    }
}
