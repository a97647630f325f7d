//! Rendering resource ARNs from catalog templates.
//!
//! A template such as `arn:aws:sqs:{region}:{account}:{name}` is filled from
//! the resource's attributes. What an unknown value becomes depends on the
//! [`RenderMode`]: a wildcard, or a Terraform expression left for a later
//! evaluation stage. Rendering never fails and never leaves a placeholder.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::catalog::{self, LocatorTemplate};
use crate::types::DeclaredResource;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder regex is valid"));

pub const ACCOUNT: &str = "account";
pub const REGION: &str = "region";

/// Reference to the current account id, as emitted by the Terraform renderer.
pub const CALLER_IDENTITY_REF: &str = "data.aws_caller_identity.current.account_id";
/// Reference to the current region name.
pub const REGION_REF: &str = "data.aws_region.current.name";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Unknown values become `*`; the output is a standalone document.
    #[default]
    Static,
    /// Unknown values become `${...}` expressions for Terraform to fill in.
    Templated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RenderContext {
    pub mode: RenderMode,
    pub account_ref: Option<String>,
    pub region_ref: Option<String>,
}

impl RenderContext {
    pub fn static_mode() -> Self {
        Self::default()
    }

    /// Templated output wired to the caller identity and region data sources.
    pub fn templated() -> Self {
        Self {
            mode: RenderMode::Templated,
            account_ref: Some(CALLER_IDENTITY_REF.to_string()),
            region_ref: Some(REGION_REF.to_string()),
        }
    }

    pub fn with_account_ref(mut self, reference: impl Into<String>) -> Self {
        self.account_ref = Some(reference.into());
        self
    }

    pub fn with_region_ref(mut self, reference: impl Into<String>) -> Self {
        self.region_ref = Some(reference.into());
        self
    }

    fn contextual(&self, reference: Option<&String>) -> String {
        match (self.mode, reference) {
            (RenderMode::Templated, Some(r)) => format!("${{{r}}}"),
            _ => "*".to_string(),
        }
    }

    pub fn account(&self) -> String {
        self.contextual(self.account_ref.as_ref())
    }

    pub fn region(&self) -> String {
        self.contextual(self.region_ref.as_ref())
    }

    pub fn injects_account(&self) -> bool {
        self.mode == RenderMode::Templated && self.account_ref.is_some()
    }

    pub fn injects_region(&self) -> bool {
        self.mode == RenderMode::Templated && self.region_ref.is_some()
    }
}

/// Placeholder names in `pattern`, in order of appearance.
pub fn placeholders(pattern: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(pattern)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// ARNs for `resource`: the primary template followed by its children,
/// deduplicated. Kinds without a template render as `["*"]`.
pub fn render(resource: &DeclaredResource, ctx: &RenderContext) -> Vec<String> {
    match catalog::locator_for(resource.kind()) {
        Some(locator) => render_locator(locator, resource, ctx),
        None => vec!["*".to_string()],
    }
}

pub fn render_locator(
    locator: &LocatorTemplate,
    resource: &DeclaredResource,
    ctx: &RenderContext,
) -> Vec<String> {
    std::iter::once(&locator.pattern)
        .chain(locator.children.iter())
        .map(|pattern| render_pattern(pattern, resource, ctx))
        .unique()
        .collect()
}

fn render_pattern(pattern: &str, resource: &DeclaredResource, ctx: &RenderContext) -> String {
    PLACEHOLDER
        .replace_all(pattern, |caps: &Captures| match &caps[1] {
            ACCOUNT => ctx.account(),
            REGION => ctx.region(),
            attr => match resource.attr(attr) {
                Some(value) => match ctx.mode {
                    RenderMode::Static => value.wildcarded(),
                    RenderMode::Templated => value.deferred(),
                },
                None => "*".to_string(),
            },
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttrValue, Location};
    use yare::parameterized;

    fn bucket(value: Option<AttrValue>) -> DeclaredResource {
        let r = DeclaredResource::new("aws_s3_bucket", "data", Location::new("main.tf"));
        match value {
            Some(v) => r.with_attr("bucket", v),
            None => r,
        }
    }

    #[parameterized(
        literal_static = { Some(AttrValue::Literal("my-bucket".into())), RenderMode::Static, "arn:aws:s3:::my-bucket" },
        literal_templated = { Some(AttrValue::Literal("my-bucket".into())), RenderMode::Templated, "arn:aws:s3:::my-bucket" },
        reference_static = { Some(AttrValue::Reference("var.name".into())), RenderMode::Static, "arn:aws:s3:::*" },
        reference_templated = { Some(AttrValue::Reference("var.name".into())), RenderMode::Templated, "arn:aws:s3:::${var.name}" },
        interpolation_static = { Some(AttrValue::Interpolation("${var.env}-logs".into())), RenderMode::Static, "arn:aws:s3:::*-logs" },
        interpolation_templated = { Some(AttrValue::Interpolation("${var.env}-logs".into())), RenderMode::Templated, "arn:aws:s3:::${var.env}-logs" },
        absent_static = { None, RenderMode::Static, "arn:aws:s3:::*" },
        absent_templated = { None, RenderMode::Templated, "arn:aws:s3:::*" },
    )]
    fn test_bucket_rendering(value: Option<AttrValue>, mode: RenderMode, primary: &str) {
        let ctx = RenderContext {
            mode,
            ..Default::default()
        };
        let arns = render(&bucket(value), &ctx);
        assert_eq!(arns[0], primary);
        assert_eq!(arns[1], format!("{primary}/*"));
    }

    #[test]
    fn test_account_and_region_static() {
        let queue = DeclaredResource::new("aws_sqs_queue", "jobs", Location::new("main.tf"))
            .with_attr("name", AttrValue::Literal("jobs".into()));
        assert_eq!(
            render(&queue, &RenderContext::static_mode()),
            vec!["arn:aws:sqs:*:*:jobs"]
        );
    }

    #[test]
    fn test_account_and_region_templated() {
        let queue = DeclaredResource::new("aws_sqs_queue", "jobs", Location::new("main.tf"))
            .with_attr("name", AttrValue::Literal("jobs".into()));
        assert_eq!(
            render(&queue, &RenderContext::templated()),
            vec!["arn:aws:sqs:${data.aws_region.current.name}:${data.aws_caller_identity.current.account_id}:jobs"]
        );

        // Templated without references still wildcards the context.
        let bare = RenderContext {
            mode: RenderMode::Templated,
            ..Default::default()
        };
        assert_eq!(render(&queue, &bare), vec!["arn:aws:sqs:*:*:jobs"]);
    }

    #[test]
    fn test_unknown_kind_is_wildcard() {
        let r = DeclaredResource::new("aws_made_up", "x", Location::new("main.tf"));
        assert_eq!(render(&r, &RenderContext::templated()), vec!["*"]);
    }

    #[test]
    fn test_placeholder_names_the_attribute() {
        let function = DeclaredResource::new("aws_lambda_function", "f", Location::new("main.tf"))
            .with_attr("function_name", AttrValue::Literal("worker".into()))
            .with_attr("name", AttrValue::Literal("ignored".into()));
        assert_eq!(
            render(&function, &RenderContext::static_mode()),
            vec!["arn:aws:lambda:*:*:function:worker"]
        );
    }

    #[test]
    fn test_children_deduplicated() {
        let locator = LocatorTemplate::new("arn:aws:x:::{name}").with_child("arn:aws:x:::{name}");
        let r = DeclaredResource::new("aws_x", "x", Location::new("main.tf"));
        assert_eq!(
            render_locator(&locator, &r, &RenderContext::static_mode()),
            vec!["arn:aws:x:::*"]
        );
    }

    #[test]
    fn test_no_placeholder_survives() {
        let ctx = RenderContext::static_mode();
        for kind in ["aws_lambda_function", "aws_ecs_service", "aws_wafv2_web_acl", "aws_eip"] {
            let r = DeclaredResource::new(kind, "x", Location::new("main.tf"));
            for arn in render(&r, &ctx) {
                assert!(placeholders(&arn).is_empty(), "{kind}: {arn}");
            }
        }
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("arn:aws:ecs:{region}:{account}:service/{cluster}/*"),
            vec!["region", "account", "cluster"]
        );
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!("Templated".parse::<RenderMode>().unwrap(), RenderMode::Templated);
        assert_eq!(RenderMode::Static.to_string(), "static");
    }
}
