//! Policy statements embedded in configuration.
//!
//! Two shapes are recognized: `statement` blocks of an
//! `aws_iam_policy_document` data source, and a `policy` attribute holding a
//! JSON document (a literal string, a heredoc, or `jsonencode(...)`).
//! Anything that would need evaluation contributes nothing.

use serde_json::Value;
use tracing::debug;

use crate::error::LeastError;
use crate::syntax::{Expr, SyntaxBody};
use crate::types::{DeclaredPolicy, DeclaredStatement, Effect, INTERPOLATION, Location};

/// Resource kinds whose `policy` attribute is an IAM policy document.
pub const POLICY_RESOURCE_KINDS: &[&str] = &[
    "aws_iam_policy",
    "aws_iam_role_policy",
    "aws_iam_user_policy",
    "aws_iam_group_policy",
];

pub const POLICY_DOCUMENT_KIND: &str = "aws_iam_policy_document";

pub fn is_policy_resource(kind: &str) -> bool {
    POLICY_RESOURCE_KINDS.contains(&kind)
}

/// Policies carried by a `resource` block: the `policy` attribute of a
/// policy-bearing kind, plus `inline_policy` blocks of roles.
pub fn resource_policies(
    kind: &str,
    name: &str,
    body: &SyntaxBody,
    location: &Location,
) -> Vec<DeclaredPolicy> {
    let address = format!("{kind}.{name}");
    let mut out = Vec::new();

    if is_policy_resource(kind) {
        if let Some(policy) = body
            .attr("policy")
            .and_then(|expr| policy_from_expr(&address, expr, location))
        {
            out.push(policy);
        }
    }

    if kind == "aws_iam_role" {
        for (idx, inline) in body.blocks_of("inline_policy").enumerate() {
            let inline_name = inline
                .body
                .attr("name")
                .and_then(Expr::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| idx.to_string());
            if let Some(policy) = inline.body.attr("policy").and_then(|expr| {
                policy_from_expr(&format!("{address}/{inline_name}"), expr, location)
            }) {
                out.push(policy);
            }
        }
    }

    out
}

/// A `data "aws_iam_policy_document"` block.
pub fn policy_document(name: &str, body: &SyntaxBody, location: &Location) -> DeclaredPolicy {
    DeclaredPolicy {
        name: format!("data.{POLICY_DOCUMENT_KIND}.{name}"),
        location: location.clone(),
        statements: body
            .blocks_of("statement")
            .map(|block| statement_from_block(&block.body))
            .collect(),
    }
}

/// One `statement { ... }` block. Effect defaults to Allow; non-literal list
/// elements are skipped.
pub fn statement_from_block(body: &SyntaxBody) -> DeclaredStatement {
    let effect = body
        .attr("effect")
        .and_then(Expr::as_str)
        .and_then(|e| e.parse::<Effect>().ok())
        .unwrap_or_default();

    DeclaredStatement {
        sid: body.attr("sid").and_then(Expr::as_str).map(str::to_string),
        effect,
        actions: body.attr("actions").map(Expr::string_list).unwrap_or_default(),
        resources: body
            .attr("resources")
            .map(Expr::string_list)
            .unwrap_or_default(),
    }
}

/// Reduce a `policy = ...` value to statements, if it is literal enough.
pub fn policy_from_expr(name: &str, expr: &Expr, location: &Location) -> Option<DeclaredPolicy> {
    let statements = match expr {
        Expr::Literal(Value::String(text)) => parse_json_statements(text).ok()?,
        Expr::Template(text) => {
            debug!(
                event = "Extract",
                phase = "Policy",
                policy = %name,
                references = INTERPOLATION.find_iter(text).count(),
                "interpolated policy skipped"
            );
            return None;
        }
        Expr::Call { name: func, args } if func == "jsonencode" => {
            let arg = args.first()?;
            if !matches!(arg, Expr::Object(_)) {
                return None;
            }
            statements_from_value(&arg.to_json_lossy())
        }
        _ => {
            debug!(
                event = "Extract",
                phase = "Policy",
                policy = %name,
                "dynamic policy value skipped"
            );
            return None;
        }
    };

    Some(DeclaredPolicy {
        name: name.to_string(),
        location: location.clone(),
        statements,
    })
}

/// Parse a JSON policy document into statements.
pub fn parse_json_statements(text: &str) -> Result<Vec<DeclaredStatement>, LeastError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(LeastError::InvalidFormat(
            "policy document must be a JSON object".to_string(),
        ));
    }
    Ok(statements_from_value(&value))
}

/// `Statement` may be one object or a list. A missing `Effect` means Allow;
/// statements with an unreadable one are dropped.
pub fn statements_from_value(doc: &Value) -> Vec<DeclaredStatement> {
    let raw: Vec<&Value> = match doc.get("Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };

    raw.into_iter()
        .filter_map(|stmt| {
            let effect = match stmt.get("Effect") {
                None | Some(Value::Null) => Effect::Allow,
                Some(value) => value.as_str().and_then(|e| e.parse::<Effect>().ok())?,
            };
            Some(DeclaredStatement {
                sid: stmt
                    .get("Sid")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                effect,
                actions: string_or_list(stmt.get("Action")),
                resources: string_or_list(stmt.get("Resource")),
            })
        })
        .collect()
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_hcl;

    fn loc() -> Location {
        Location::new("iam.tf")
    }

    #[test]
    fn test_policy_document_statements() {
        let body = parse_hcl(
            r#"
data "aws_iam_policy_document" "doc" {
  statement {
    sid       = "Read"
    actions   = ["s3:GetObject", "s3:ListBucket"]
    resources = ["*"]
  }
  statement {
    effect    = "deny"
    actions   = ["s3:DeleteObject"]
    resources = [aws_s3_bucket.b.arn]
  }
}
"#,
        )
        .unwrap();
        let block = &body.blocks[0];
        let policy = policy_document("doc", &block.body, &loc());
        assert_eq!(policy.name, "data.aws_iam_policy_document.doc");
        assert_eq!(policy.statements.len(), 2);
        assert_eq!(policy.statements[0].sid.as_deref(), Some("Read"));
        assert_eq!(policy.statements[0].effect, Effect::Allow);
        assert_eq!(policy.statements[1].effect, Effect::Deny);
        // the reference is not a literal and is skipped
        assert!(policy.statements[1].resources.is_empty());
    }

    #[test]
    fn test_literal_json_policy() {
        let body = parse_hcl(
            r#"
resource "aws_iam_policy" "p" {
  name   = "p"
  policy = "{\"Version\":\"2012-10-17\",\"Statement\":{\"Effect\":\"Allow\",\"Action\":\"sqs:SendMessage\",\"Resource\":\"*\"}}"
}
"#,
        )
        .unwrap();
        let policies = resource_policies("aws_iam_policy", "p", &body.blocks[0].body, &loc());
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, "aws_iam_policy.p");
        assert_eq!(policies[0].statements[0].actions, vec!["sqs:SendMessage"]);
        assert_eq!(policies[0].statements[0].resources, vec!["*"]);
    }

    #[test]
    fn test_jsonencode_policy_drops_references() {
        let body = parse_hcl(
            r#"
resource "aws_iam_role_policy" "rp" {
  role = aws_iam_role.r.id
  policy = jsonencode({
    Version = "2012-10-17"
    Statement = [
      {
        Effect   = "Allow"
        Action   = ["s3:GetObject", "s3:PutObject"]
        Resource = "${aws_s3_bucket.b.arn}/*"
      },
      {
        Effect   = "Allow"
        Action   = "logs:PutLogEvents"
        Resource = aws_cloudwatch_log_group.g.arn
      }
    ]
  })
}
"#,
        )
        .unwrap();
        let policies =
            resource_policies("aws_iam_role_policy", "rp", &body.blocks[0].body, &loc());
        let stmts = &policies[0].statements;
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].actions, vec!["s3:GetObject", "s3:PutObject"]);
        assert!(stmts[0].resources.is_empty());
        assert_eq!(stmts[1].actions, vec!["logs:PutLogEvents"]);
    }

    #[test]
    fn test_dynamic_policy_yields_nothing() {
        let body = parse_hcl(
            r#"
resource "aws_iam_policy" "p" {
  policy = data.aws_iam_policy_document.doc.json
}
"#,
        )
        .unwrap();
        assert!(resource_policies("aws_iam_policy", "p", &body.blocks[0].body, &loc()).is_empty());
    }

    #[test]
    fn test_heredoc_with_interpolation_yields_nothing() {
        let body = parse_hcl(
            r#"
resource "aws_iam_user_policy" "u" {
  policy = <<EOF
{
  "Version": "2012-10-17",
  "Statement": [
    {
      "Effect": "Allow",
      "Action": ["dynamodb:GetItem"],
      "Resource": "${aws_dynamodb_table.t.arn}"
    }
  ]
}
EOF
}
"#,
        )
        .unwrap();
        assert!(
            resource_policies("aws_iam_user_policy", "u", &body.blocks[0].body, &loc()).is_empty()
        );
    }

    #[test]
    fn test_literal_heredoc_policy() {
        let body = parse_hcl(
            r#"
resource "aws_iam_user_policy" "u" {
  policy = <<EOF
{"Statement": [{"Effect": "Allow", "Action": ["dynamodb:GetItem"], "Resource": "*"}]}
EOF
}
"#,
        )
        .unwrap();
        let policies =
            resource_policies("aws_iam_user_policy", "u", &body.blocks[0].body, &loc());
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].statements[0].actions, vec!["dynamodb:GetItem"]);
    }

    #[test]
    fn test_jsonencode_without_effect_is_allow() {
        let body = parse_hcl(
            r#"
resource "aws_iam_policy" "p" {
  policy = jsonencode({
    Statement = [{ Action = ["s3:GetObject"], Resource = "*" }]
  })
}
"#,
        )
        .unwrap();
        let policies = resource_policies("aws_iam_policy", "p", &body.blocks[0].body, &loc());
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].statements[0].effect, Effect::Allow);
        assert_eq!(policies[0].statements[0].actions, vec!["s3:GetObject"]);
    }

    #[test]
    fn test_role_inline_policy_blocks() {
        let body = parse_hcl(
            r#"
resource "aws_iam_role" "r" {
  name = "r"
  inline_policy {
    name   = "logs"
    policy = jsonencode({
      Statement = [{ Effect = "Allow", Action = ["logs:CreateLogStream"], Resource = "*" }]
    })
  }
}
"#,
        )
        .unwrap();
        let policies = resource_policies("aws_iam_role", "r", &body.blocks[0].body, &loc());
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].name, "aws_iam_role.r/logs");
    }

    #[test]
    fn test_non_policy_kind_has_no_policies() {
        let body = parse_hcl("resource \"aws_s3_bucket\" \"b\" {\n  policy = \"{}\"\n}\n").unwrap();
        assert!(resource_policies("aws_s3_bucket", "b", &body.blocks[0].body, &loc()).is_empty());
    }

    #[test]
    fn test_missing_effect_defaults_to_allow() {
        let stmts = parse_json_statements(
            r#"{"Statement":[{"Action":"s3:*"},{"Effect":"DENY","Action":["s3:Delete*"]},{"Effect":"Maybe","Action":"s3:PutObject"}]}"#,
        )
        .unwrap();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].effect, Effect::Allow);
        assert_eq!(stmts[0].actions, vec!["s3:*"]);
        assert_eq!(stmts[1].effect, Effect::Deny);
    }

    #[test]
    fn test_parse_json_statements_rejects_non_object() {
        assert!(parse_json_statements("[]").is_err());
        assert!(parse_json_statements("not json").is_err());
    }
}
