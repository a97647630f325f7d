//! IAM policy documents: the generated least-privilege policy, its JSON and
//! Terraform renderings, and reading existing policies back in.

use std::collections::HashMap;

use itertools::Itertools;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::catalog::ActionSet;
use crate::error::LeastError;
use crate::resolver::ActionResolver;
use crate::template::{self, RenderContext};
use crate::types::{DeclaredPolicy, DeclaredResource, Effect};

pub const POLICY_VERSION: &str = "2012-10-17";

/// Name of the generated `aws_iam_policy_document` data source.
pub const DOCUMENT_NAME: &str = "least_privilege";

/// Sid of the statement built by [`IamPolicy::from_declared`].
pub const COMBINED_SID: &str = "CombinedPolicy";

/// A JSON value that may be a single string or a list of strings. Always
/// serialized as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StringListVisitor;

        impl<'de> Visitor<'de> for StringListVisitor {
            type Value = StringList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string or a list of strings")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(StringList(vec![v.to_string()]))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some(item) = seq.next_element::<String>()? {
                    out.push(item);
                }
                Ok(StringList(out))
            }
        }

        deserializer.deserialize_any(StringListVisitor)
    }
}

impl From<Vec<String>> for StringList {
    fn from(v: Vec<String>) -> Self {
        StringList(v)
    }
}

impl StringList {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Statement {
    #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(rename = "Effect")]
    pub effect: Effect,
    #[serde(rename = "Action", default)]
    pub action: StringList,
    #[serde(rename = "Resource", default)]
    pub resource: StringList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IamPolicy {
    #[serde(rename = "Version", default = "default_version")]
    pub version: String,
    #[serde(rename = "Statement", default, deserialize_with = "one_or_many")]
    pub statement: Vec<Statement>,
}

fn default_version() -> String {
    POLICY_VERSION.to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Statement),
        Many(Vec<Statement>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

impl Default for IamPolicy {
    fn default() -> Self {
        Self {
            version: default_version(),
            statement: Vec::new(),
        }
    }
}

/// Which data sources the Terraform rendering declares ahead of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerraformOptions {
    pub caller_identity: bool,
    pub region: bool,
}

impl TerraformOptions {
    /// Declare exactly the data sources the policy's resources reference.
    pub fn for_policy(policy: &IamPolicy) -> Self {
        let references = |needle: &str| {
            policy
                .statement
                .iter()
                .flat_map(|s| s.resource.iter())
                .any(|r| r.contains(needle))
        };
        Self {
            caller_identity: references("data.aws_caller_identity.current"),
            region: references("data.aws_region.current"),
        }
    }
}

impl IamPolicy {
    pub fn is_empty(&self) -> bool {
        self.statement.is_empty()
    }

    pub fn to_json(&self) -> Result<String, LeastError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_terraform(&self) -> String {
        self.to_terraform_with(TerraformOptions::for_policy(self))
    }

    pub fn to_terraform_with(&self, opts: TerraformOptions) -> String {
        let mut b = String::new();

        if opts.caller_identity {
            b.push_str("data \"aws_caller_identity\" \"current\" {}\n\n");
        }
        if opts.region {
            b.push_str("data \"aws_region\" \"current\" {}\n\n");
        }

        b.push_str(&format!("data \"aws_iam_policy_document\" \"{DOCUMENT_NAME}\" {{\n"));
        for stmt in &self.statement {
            b.push_str("  statement {\n");
            if let Some(sid) = &stmt.sid {
                b.push_str(&format!("    sid    = \"{sid}\"\n"));
            }
            b.push_str(&format!("    effect = \"{}\"\n", stmt.effect));

            b.push_str("\n    actions = [\n");
            for action in stmt.action.iter() {
                b.push_str(&format!("      \"{action}\",\n"));
            }
            b.push_str("    ]\n");

            b.push_str("\n    resources = [\n");
            for resource in stmt.resource.iter() {
                b.push_str(&format!("      \"{resource}\",\n"));
            }
            b.push_str("    ]\n");
            b.push_str("  }\n");
        }
        b.push_str("}\n");
        b
    }

    /// Actions granted by Allow statements, deduplicated and sorted.
    pub fn granted_actions(&self) -> Vec<String> {
        self.statement
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .flat_map(|s| s.action.iter().cloned())
            .sorted()
            .dedup()
            .collect()
    }

    /// One Allow statement over `*` holding every action the declared
    /// policies allow. Deny statements are not carried over.
    pub fn from_declared(policies: &[DeclaredPolicy]) -> Self {
        let actions: Vec<String> = policies
            .iter()
            .flat_map(|p| p.allowed_actions())
            .map(str::to_string)
            .sorted()
            .dedup()
            .collect();

        Self {
            version: default_version(),
            statement: vec![Statement {
                sid: Some(COMBINED_SID.to_string()),
                effect: Effect::Allow,
                action: actions.into(),
                resource: vec!["*".to_string()].into(),
            }],
        }
    }
}

/// Parse a JSON policy document.
pub fn parse_policy(data: &[u8]) -> Result<IamPolicy, LeastError> {
    serde_json::from_slice(data)
        .map_err(|e| LeastError::InvalidFormat(format!("invalid IAM policy document: {e}")))
}

/// `aws_s3_bucket` + `data` -> `AwsS3BucketData`.
pub fn statement_sid(kind: &str, name: &str) -> String {
    kind.split('_')
        .chain(name.split(['_', '-']))
        .map(|part| {
            let part: String = part.chars().filter(char::is_ascii_alphanumeric).collect();
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Generated policy together with the kinds nothing could resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct GeneratedPolicy {
    pub policy: IamPolicy,
    /// Resource kinds skipped for lack of known actions, sorted.
    pub unresolved_kinds: Vec<String>,
}

pub struct PolicyGenerator<'a> {
    resolver: &'a dyn ActionResolver,
    ctx: RenderContext,
}

impl<'a> PolicyGenerator<'a> {
    pub fn new(resolver: &'a dyn ActionResolver, ctx: RenderContext) -> Self {
        Self { resolver, ctx }
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// One Allow statement per resource with a non-empty action set.
    pub fn generate(&self, resources: &[DeclaredResource]) -> GeneratedPolicy {
        let mut statements = Vec::new();
        let mut unresolved: Vec<String> = Vec::new();
        let mut sid_counts: HashMap<String, usize> = HashMap::new();

        for resource in resources {
            let actions: ActionSet = self.resolver.resolve(resource.kind());
            if actions.is_empty() {
                debug!(
                    event = "Generate",
                    phase = "Skip",
                    resource = %resource.address(),
                    "no known actions"
                );
                unresolved.push(resource.kind().to_string());
                continue;
            }

            let base = statement_sid(resource.kind(), resource.name());
            let seen = sid_counts.entry(base.clone()).or_insert(0);
            *seen += 1;
            let sid = if *seen == 1 {
                base
            } else {
                format!("{base}{seen}")
            };

            statements.push(Statement {
                sid: Some(sid),
                effect: Effect::Allow,
                action: actions.into_iter().collect::<Vec<_>>().into(),
                resource: template::render(resource, &self.ctx).into(),
            });
        }

        GeneratedPolicy {
            policy: IamPolicy {
                version: default_version(),
                statement: statements,
            },
            unresolved_kinds: unresolved.into_iter().sorted().dedup().collect(),
        }
    }
}
