//! Resources declared in a configuration tree.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attr_value::AttrValue;

/// Where a declaration was found. Advisory only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Default)]
pub struct Location {
    #[schema(value_type = String)]
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// Maps a resource kind to the cloud platform it belongs to.
const CLOUD_PREFIXES: &[(&str, &str)] = &[
    ("aws_", "aws"),
    ("azurerm_", "azure"),
    ("google_", "gcp"),
    ("oci_", "oci"),
    ("digitalocean_", "digitalocean"),
    ("linode_", "linode"),
    ("alicloud_", "alicloud"),
];

pub fn cloud_of(kind: &str) -> &'static str {
    CLOUD_PREFIXES
        .iter()
        .find(|(prefix, _)| kind.starts_with(prefix))
        .map(|(_, cloud)| *cloud)
        .unwrap_or("unknown")
}

/// A `resource "<kind>" "<name>"` block.
///
/// Identity is `(kind, name, defining file)`; the line number and the
/// attributes take no part in equality.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeclaredResource {
    kind: String,
    name: String,
    location: Location,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, AttrValue>,
}

impl DeclaredResource {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, location: Location) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            location,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn file(&self) -> &Path {
        &self.location.file
    }

    pub fn cloud(&self) -> &'static str {
        cloud_of(&self.kind)
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }

    /// `kind.name`, the address Terraform uses for the resource.
    pub fn address(&self) -> String {
        format!("{}.{}", self.kind, self.name)
    }
}

impl PartialEq for DeclaredResource {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.location.file == other.location.file
    }
}

impl Eq for DeclaredResource {}

impl Hash for DeclaredResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.name.hash(state);
        self.location.file.hash(state);
    }
}

impl Display for DeclaredResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.address(), self.location)
    }
}
