//! Attribute values captured from resource declarations.

use std::fmt::{Display, Formatter, Result as FmtResult};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Matches a single `${ ... }` interpolation sequence.
pub(crate) static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{[^}]*\}").expect("interpolation regex is valid"));

/// The value of a resource attribute, as far as it can be known without
/// evaluating the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "value")]
pub enum AttrValue {
    /// A constant, rendered to its string form (`"my-bucket"`, `42`, `true`).
    Literal(String),
    /// A bare reference to another value, e.g. `var.bucket_name` or
    /// `aws_s3_bucket.logs.id`.
    Reference(String),
    /// A string template mixing literal text and references,
    /// e.g. `${var.prefix}-logs`.
    Interpolation(String),
}

impl AttrValue {
    pub fn literal(&self) -> Option<&str> {
        match self {
            AttrValue::Literal(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        !matches!(self, AttrValue::Literal(_))
    }

    /// The form used when the output can defer to a later evaluation stage.
    pub fn deferred(&self) -> String {
        match self {
            AttrValue::Literal(s) => s.clone(),
            AttrValue::Reference(r) => format!("${{{r}}}"),
            AttrValue::Interpolation(t) => t.clone(),
        }
    }

    /// The form used when nothing can be deferred: every unknown part
    /// collapses to `*`.
    pub fn wildcarded(&self) -> String {
        match self {
            AttrValue::Literal(s) => s.clone(),
            AttrValue::Reference(_) => "*".to_string(),
            AttrValue::Interpolation(t) => INTERPOLATION.replace_all(t, "*").into_owned(),
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.deferred())
    }
}
