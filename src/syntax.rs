//! A small, evaluation-free view of Terraform configuration files.
//!
//! Native syntax (`.tf`) is parsed with `hcl-rs`; JSON syntax (`.tf.json`) with
//! `serde_json`. Both are lowered to the same tree of blocks, attributes and
//! [`Expr`] values. Expressions are never evaluated: the tree only tells
//! literals apart from references, and keeps enough structure to read
//! `jsonencode(...)` arguments.

use std::path::Path;

use hcl::{Block, Body, Expression, ObjectKey, Structure, TemplateExpr, Traversal, TraversalOperator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::LeastError;
use crate::types::{AttrValue, INTERPOLATION};

/// Matches a template that is nothing but one `${reference}`.
static SOLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{\s*([A-Za-z_][A-Za-z0-9_\-]*(?:(?:\.[A-Za-z0-9_\-\*]+)|(?:\[[^\]]*\]))*)\s*\}$")
        .expect("sole reference regex is valid")
});

/// Blocks that may nest inside a JSON-syntax body. Everything else is an
/// attribute, even when its value is an object.
const JSON_NESTED_BLOCKS: &[&str] = &["statement", "principals", "condition", "inline_policy"];

/// Number of labels each top-level block type carries in JSON syntax.
const JSON_TOP_LEVEL_LABELS: &[(&str, usize)] = &[
    ("resource", 2),
    ("data", 2),
    ("module", 1),
    ("variable", 1),
    ("output", 1),
    ("provider", 1),
    ("locals", 0),
    ("terraform", 0),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`, a boolean, a number or a plain string.
    Literal(Value),
    /// A string template containing at least one interpolation.
    Template(String),
    /// A bare traversal such as `var.name` or `aws_s3_bucket.b.arn`.
    Reference(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Call { name: String, args: Vec<Expr> },
    /// Conditionals, operators, `for` expressions and the like.
    Dynamic,
}

impl Expr {
    fn from_string(s: &str) -> Expr {
        if s.contains("${") || s.contains("%{") {
            Expr::Template(s.to_string())
        } else {
            Expr::Literal(Value::String(s.to_string()))
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Classify the expression as an attribute value. Shapes that are neither
    /// literal scalars nor references yield `None`.
    pub fn to_attr_value(&self) -> Option<AttrValue> {
        match self {
            Expr::Literal(Value::String(s)) => Some(AttrValue::Literal(s.clone())),
            Expr::Literal(Value::Number(n)) => Some(AttrValue::Literal(n.to_string())),
            Expr::Literal(Value::Bool(b)) => Some(AttrValue::Literal(b.to_string())),
            Expr::Reference(r) => Some(AttrValue::Reference(r.clone())),
            Expr::Template(t) => match SOLE_REFERENCE.captures(t) {
                Some(caps) => Some(AttrValue::Reference(caps[1].to_string())),
                None => Some(AttrValue::Interpolation(t.clone())),
            },
            _ => None,
        }
    }

    /// A single string or a list of strings. Non-literal elements are skipped.
    pub fn string_list(&self) -> Vec<String> {
        match self {
            Expr::Literal(Value::String(s)) => vec![s.clone()],
            Expr::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Reduce to a JSON value. Anything that would need evaluation becomes
    /// `null`.
    pub fn to_json_lossy(&self) -> Value {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Array(items) => Value::Array(items.iter().map(Expr::to_json_lossy).collect()),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json_lossy());
                }
                Value::Object(map)
            }
            _ => Value::Null,
        }
    }

    /// Free variables referenced anywhere in the expression.
    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Expr::Reference(r) => out.push(r.clone()),
            Expr::Template(t) => {
                for m in INTERPOLATION.find_iter(t) {
                    let inner = m.as_str().trim_start_matches("${").trim_end_matches('}');
                    out.push(inner.trim().to_string());
                }
            }
            Expr::Array(items) => items.iter().for_each(|i| i.collect_references(out)),
            Expr::Object(entries) => entries.iter().for_each(|(_, v)| v.collect_references(out)),
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_references(out)),
            Expr::Literal(_) | Expr::Dynamic => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntaxBody {
    pub attributes: Vec<(String, Expr)>,
    pub blocks: Vec<SyntaxBlock>,
}

impl SyntaxBody {
    pub fn attr(&self, key: &str) -> Option<&Expr> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn blocks_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a SyntaxBlock> + 'a {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxBlock {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: SyntaxBody,
}

impl SyntaxBlock {
    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }
}

/// Parse a configuration file, choosing the syntax from its name.
pub fn parse_source(path: &Path, src: &str) -> Result<SyntaxBody, LeastError> {
    let is_json = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".tf.json"));
    if is_json {
        parse_json(src)
    } else {
        parse_hcl(src)
    }
}

pub fn parse_hcl(src: &str) -> Result<SyntaxBody, LeastError> {
    let body: Body = hcl::parse(src)?;
    Ok(lower_body(&body))
}

fn lower_body(body: &Body) -> SyntaxBody {
    let mut out = SyntaxBody::default();
    for structure in body.iter() {
        match structure {
            Structure::Attribute(attr) => {
                out.attributes
                    .push((attr.key().to_string(), lower_expr(attr.expr())));
            }
            Structure::Block(block) => out.blocks.push(lower_block(block)),
        }
    }
    out
}

fn lower_block(block: &Block) -> SyntaxBlock {
    SyntaxBlock {
        kind: block.identifier().to_string(),
        labels: block.labels().iter().map(|l| l.as_str().to_string()).collect(),
        body: lower_body(block.body()),
    }
}

fn lower_expr(expr: &Expression) -> Expr {
    match expr {
        Expression::Null => Expr::Literal(Value::Null),
        Expression::Bool(b) => Expr::Literal(Value::Bool(*b)),
        Expression::Number(n) => Expr::Literal(serde_json::to_value(n).unwrap_or(Value::Null)),
        Expression::String(s) => Expr::from_string(s),
        Expression::TemplateExpr(t) => lower_template(t),
        Expression::Array(items) => Expr::Array(items.iter().map(lower_expr).collect()),
        Expression::Object(obj) => Expr::Object(
            obj.iter()
                .filter_map(|(k, v)| object_key(k).map(|k| (k, lower_expr(v))))
                .collect(),
        ),
        Expression::Variable(v) => Expr::Reference(v.as_str().to_string()),
        Expression::Traversal(t) => traversal_path(t)
            .map(Expr::Reference)
            .unwrap_or(Expr::Dynamic),
        Expression::FuncCall(call) => Expr::Call {
            name: call.name.name.as_str().to_string(),
            args: call.args.iter().map(lower_expr).collect(),
        },
        Expression::Parenthesis(inner) => lower_expr(inner),
        _ => Expr::Dynamic,
    }
}

fn template_text(t: &TemplateExpr) -> &str {
    match t {
        TemplateExpr::QuotedString(s) => s,
        TemplateExpr::Heredoc(h) => &h.template,
    }
}

fn lower_template(t: &TemplateExpr) -> Expr {
    Expr::from_string(template_text(t))
}

fn object_key(key: &ObjectKey) -> Option<String> {
    match key {
        ObjectKey::Identifier(id) => Some(id.as_str().to_string()),
        ObjectKey::Expression(Expression::String(s)) => Some(s.clone()),
        ObjectKey::Expression(Expression::TemplateExpr(t)) => Some(template_text(t).to_string()),
        _ => None,
    }
}

/// Render a traversal as the dotted path Terraform users write.
fn traversal_path(t: &Traversal) -> Option<String> {
    let mut path = match &t.expr {
        Expression::Variable(v) => v.as_str().to_string(),
        Expression::Traversal(inner) => traversal_path(inner)?,
        _ => return None,
    };
    for op in &t.operators {
        match op {
            TraversalOperator::GetAttr(id) => {
                path.push('.');
                path.push_str(id.as_str());
            }
            TraversalOperator::LegacyIndex(idx) => {
                path.push('.');
                path.push_str(&idx.to_string());
            }
            TraversalOperator::AttrSplat => path.push_str(".*"),
            TraversalOperator::FullSplat => path.push_str("[*]"),
            TraversalOperator::Index(idx) => match idx {
                Expression::Number(n) => path.push_str(&format!("[{n}]")),
                Expression::String(s) => path.push_str(&format!("[\"{s}\"]")),
                Expression::Variable(v) => path.push_str(&format!("[{}]", v.as_str())),
                Expression::Traversal(inner) => path.push_str(&format!("[{}]", traversal_path(inner)?)),
                _ => return None,
            },
        }
    }
    Some(path)
}

pub fn parse_json(src: &str) -> Result<SyntaxBody, LeastError> {
    let root: Value = serde_json::from_str(src)?;
    let Value::Object(top) = root else {
        return Err(LeastError::InvalidFormat(
            "JSON configuration must be an object at the top level".to_string(),
        ));
    };

    let mut out = SyntaxBody::default();
    for (kind, value) in &top {
        let depth = JSON_TOP_LEVEL_LABELS
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, d)| *d)
            .unwrap_or(0);
        json_blocks(kind, value, depth, &mut Vec::new(), &mut out.blocks);
    }
    Ok(out)
}

/// Peel `depth` levels of object keys off as labels, then lower the remaining
/// object (or each object of an array) as a block body.
fn json_blocks(
    kind: &str,
    value: &Value,
    depth: usize,
    labels: &mut Vec<String>,
    out: &mut Vec<SyntaxBlock>,
) {
    if depth == 0 {
        match value {
            Value::Object(body) => out.push(SyntaxBlock {
                kind: kind.to_string(),
                labels: labels.clone(),
                body: json_body(body),
            }),
            Value::Array(items) => {
                for item in items {
                    json_blocks(kind, item, 0, labels, out);
                }
            }
            _ => {}
        }
        return;
    }

    if let Value::Object(map) = value {
        for (label, inner) in map {
            labels.push(label.clone());
            json_blocks(kind, inner, depth - 1, labels, out);
            labels.pop();
        }
    }
}

fn json_body(map: &Map<String, Value>) -> SyntaxBody {
    let mut out = SyntaxBody::default();
    for (key, value) in map {
        if JSON_NESTED_BLOCKS.contains(&key.as_str()) {
            json_blocks(key, value, 0, &mut Vec::new(), &mut out.blocks);
        } else {
            out.attributes.push((key.clone(), json_expr(value)));
        }
    }
    out
}

fn json_expr(value: &Value) -> Expr {
    match value {
        Value::String(s) => match SOLE_REFERENCE.captures(s) {
            // `"${jsonencode(...)}"` and friends are not plain references.
            Some(caps) => Expr::Reference(caps[1].to_string()),
            None if s.contains("${") => Expr::Template(s.clone()),
            None => Expr::Literal(value.clone()),
        },
        Value::Array(items) => Expr::Array(items.iter().map(json_expr).collect()),
        Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_expr(v)))
                .collect(),
        ),
        other => Expr::Literal(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAIN_TF: &str = r#"
variable "bucket_name" {
  type = string
}

resource "aws_s3_bucket" "data" {
  bucket = var.bucket_name
  tags = {
    Name = "data"
  }
}

resource "aws_s3_bucket" "logs" {
  bucket        = "${var.prefix}-logs"
  force_destroy = true
}

module "network" {
  source = "./modules/network"
  cidr   = "10.0.0.0/16"
}
"#;

    #[test]
    fn test_parse_hcl_blocks_in_order() {
        let body = parse_hcl(MAIN_TF).unwrap();
        let kinds: Vec<&str> = body.blocks.iter().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, vec!["variable", "resource", "resource", "module"]);
        assert_eq!(body.blocks[1].labels, vec!["aws_s3_bucket", "data"]);
    }

    #[test]
    fn test_reference_and_interpolation() {
        let body = parse_hcl(MAIN_TF).unwrap();
        let data = &body.blocks[1];
        assert_eq!(
            data.body.attr("bucket").and_then(Expr::to_attr_value),
            Some(AttrValue::Reference("var.bucket_name".into()))
        );
        let logs = &body.blocks[2];
        assert_eq!(
            logs.body.attr("bucket").and_then(Expr::to_attr_value),
            Some(AttrValue::Interpolation("${var.prefix}-logs".into()))
        );
        assert_eq!(
            logs.body.attr("force_destroy").and_then(Expr::to_attr_value),
            Some(AttrValue::Literal("true".into()))
        );
    }

    #[test]
    fn test_sole_interpolation_is_reference() {
        let body = parse_hcl("resource \"aws_sqs_queue\" \"q\" {\n  name = \"${var.queue}\"\n}\n").unwrap();
        assert_eq!(
            body.blocks[0].body.attr("name").and_then(Expr::to_attr_value),
            Some(AttrValue::Reference("var.queue".into()))
        );
    }

    #[test]
    fn test_object_attribute_is_not_an_attr_value() {
        let body = parse_hcl(MAIN_TF).unwrap();
        let tags = body.blocks[1].body.attr("tags").unwrap();
        assert_eq!(tags.to_attr_value(), None);
        assert_eq!(tags.to_json_lossy(), json!({"Name": "data"}));
    }

    #[test]
    fn test_module_source_literal() {
        let body = parse_hcl(MAIN_TF).unwrap();
        let module = body.blocks_of("module").next().unwrap();
        assert_eq!(module.label(0), Some("network"));
        assert_eq!(
            module.body.attr("source").and_then(Expr::as_str),
            Some("./modules/network")
        );
    }

    #[test]
    fn test_jsonencode_call_lowering() {
        let src = r#"
resource "aws_iam_policy" "p" {
  policy = jsonencode({
    Version = "2012-10-17"
    Statement = [{
      Effect   = "Allow"
      Action   = ["s3:GetObject"]
      Resource = aws_s3_bucket.b.arn
    }]
  })
}
"#;
        let body = parse_hcl(src).unwrap();
        let policy = body.blocks[0].body.attr("policy").unwrap();
        let Expr::Call { name, args } = policy else {
            panic!("expected a function call, got {policy:?}");
        };
        assert_eq!(name, "jsonencode");
        assert_eq!(policy.references(), vec!["aws_s3_bucket.b.arn".to_string()]);
        assert_eq!(
            args[0].to_json_lossy(),
            json!({
                "Version": "2012-10-17",
                "Statement": [{"Effect": "Allow", "Action": ["s3:GetObject"], "Resource": null}]
            })
        );
    }

    #[test]
    fn test_heredoc_lowering() {
        let body = parse_hcl(
            "locals {\n  plain = <<EOT\nno refs here\nEOT\n  dynamic = <<-EOT\n    ${var.name}-suffix\n  EOT\n}\n",
        )
        .unwrap();
        let locals = &body.blocks[0].body;
        assert_eq!(
            locals.attr("plain").and_then(Expr::as_str).map(str::trim),
            Some("no refs here")
        );
        assert!(matches!(
            locals.attr("dynamic"),
            Some(Expr::Template(t)) if t.contains("${var.name}")
        ));
    }

    #[test]
    fn test_parse_hcl_rejects_garbage() {
        assert!(matches!(
            parse_hcl("resource \"aws_vpc\" {{{"),
            Err(LeastError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_json_syntax() {
        let src = r#"{
  "resource": {
    "aws_s3_bucket": {
      "data": { "bucket": "my-bucket" },
      "logs": { "bucket": "${var.prefix}-logs" }
    }
  },
  "module": {
    "net": { "source": "./net" }
  },
  "data": {
    "aws_iam_policy_document": {
      "doc": {
        "statement": [
          { "actions": ["s3:GetObject"], "resources": ["*"] }
        ]
      }
    }
  }
}"#;
        let body = parse_json(src).unwrap();
        let resources: Vec<_> = body.blocks_of("resource").collect();
        assert_eq!(resources.len(), 2);
        assert_eq!(
            resources[0].body.attr("bucket").and_then(Expr::to_attr_value),
            Some(AttrValue::Literal("my-bucket".into()))
        );
        let doc = body.blocks_of("data").next().unwrap();
        assert_eq!(doc.labels, vec!["aws_iam_policy_document", "doc"]);
        assert_eq!(doc.body.blocks_of("statement").count(), 1);
        let module = body.blocks_of("module").next().unwrap();
        assert_eq!(module.labels, vec!["net"]);
    }

    #[test]
    fn test_parse_source_dispatches_on_name() {
        assert!(parse_source(Path::new("main.tf.json"), "{}").is_ok());
        assert!(parse_source(Path::new("main.tf"), "{}").is_err());
    }
}
