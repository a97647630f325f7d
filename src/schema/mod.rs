//! CloudFormation resource schemas as a source of IAM permissions.
//!
//! Each schema lists, per lifecycle handler, the IAM actions the provider
//! needs. The [`SchemaStore`] keeps parsed schemas in memory and mirrors them
//! to an on-disk cache directory.

mod canonical;
mod fetcher;

pub use canonical::{cache_file_name, canonical_type_name, terraform_type_name};
pub use fetcher::{AwsCliFetcher, SchemaFetcher};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::catalog::{ActionSet, PhaseActions};
use crate::error::LeastError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Handler {
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Handlers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Handler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Handler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Handler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Handler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Handler>,
}

/// The subset of a CloudFormation resource schema this crate reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub handlers: Handlers,
}

impl ResourceSchema {
    pub fn from_slice(data: &[u8]) -> Result<Self, LeastError> {
        let schema: ResourceSchema = serde_json::from_slice(data)
            .map_err(|e| LeastError::SchemaError(format!("parsing schema: {e}")))?;
        if schema.type_name.is_empty() {
            return Err(LeastError::SchemaError(
                "schema has no typeName".to_string(),
            ));
        }
        Ok(schema)
    }

    /// Handler permissions grouped by phase.
    pub fn permissions(&self) -> Permissions {
        let take = |h: &Option<Handler>| {
            h.as_ref()
                .map(|h| h.permissions.clone())
                .unwrap_or_default()
        };
        Permissions {
            phases: PhaseActions {
                create: take(&self.handlers.create),
                read: take(&self.handlers.read),
                update: take(&self.handlers.update),
                delete: take(&self.handlers.delete),
                list: take(&self.handlers.list),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Permissions {
    pub phases: PhaseActions,
}

impl Permissions {
    /// Deduplicated union of every phase.
    pub fn all(&self) -> ActionSet {
        self.phases.union()
    }
}

/// Schemas keyed by canonical type name, with an optional disk cache.
///
/// The map sits behind a lock so a store can be shared between resolvers.
#[derive(Debug, Default)]
pub struct SchemaStore {
    schemas: RwLock<HashMap<String, ResourceSchema>>,
    cache_dir: Option<PathBuf>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            cache_dir: Some(cache_dir.into()),
        }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Permissions for a canonical type, consulting memory first and then the
    /// cache directory. A cache hit is kept in memory.
    pub fn permissions(&self, canonical: &str) -> Result<Permissions, LeastError> {
        if let Some(schema) = self.get(canonical) {
            return Ok(schema.permissions());
        }

        let schema = self.load_from_cache(canonical)?;
        let permissions = schema.permissions();
        self.insert(schema);
        Ok(permissions)
    }

    pub fn get(&self, canonical: &str) -> Option<ResourceSchema> {
        self.schemas
            .read()
            .ok()
            .and_then(|map| map.get(canonical).cloned())
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.schemas
            .read()
            .map(|map| map.contains_key(canonical))
            .unwrap_or(false)
    }

    pub fn insert(&self, schema: ResourceSchema) {
        match self.schemas.write() {
            Ok(mut map) => {
                map.insert(schema.type_name.clone(), schema);
            }
            Err(_) => warn!(event = "SchemaStore", phase = "Insert", "schema map lock poisoned"),
        }
    }

    /// Parse and register a schema document; returns its type name.
    pub fn load_schema(&self, data: &[u8]) -> Result<String, LeastError> {
        let schema = ResourceSchema::from_slice(data)?;
        let type_name = schema.type_name.clone();
        self.insert(schema);
        debug!(event = "SchemaStore", phase = "Load", type_name = %type_name);
        Ok(type_name)
    }

    pub fn load_schema_file(&self, path: &Path) -> Result<String, LeastError> {
        let data = fs::read(path).map_err(|e| {
            LeastError::SchemaError(format!("reading schema file {}: {e}", path.display()))
        })?;
        self.load_schema(&data)
    }

    /// Load every `*.json` file in `dir`. Unreadable or malformed files are
    /// skipped; the number of schemas loaded is returned.
    pub fn load_schema_dir(&self, dir: &Path) -> Result<usize, LeastError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            LeastError::SchemaError(format!("reading schema directory {}: {e}", dir.display()))
        })?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_schema_file(&path) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    debug!(
                        event = "SchemaStore",
                        phase = "LoadDir",
                        file = %path.display(),
                        error = %e,
                        "skipping schema file"
                    );
                }
            }
        }
        Ok(loaded)
    }

    /// Write a schema to the cache directory, creating it if needed.
    pub fn save_to_cache(&self, schema: &ResourceSchema) -> Result<PathBuf, LeastError> {
        let dir = self.cache_dir.as_ref().ok_or_else(|| {
            LeastError::SchemaError("no cache directory configured".to_string())
        })?;
        fs::create_dir_all(dir)?;
        let path = dir.join(cache_file_name(&schema.type_name));
        let data = serde_json::to_vec_pretty(schema)?;
        fs::write(&path, data)?;
        debug!(event = "SchemaStore", phase = "Save", file = %path.display());
        Ok(path)
    }

    /// Loaded type names, sorted.
    pub fn loaded_types(&self) -> Vec<String> {
        self.schemas
            .read()
            .map(|map| map.keys().cloned().sorted().collect())
            .unwrap_or_default()
    }

    fn load_from_cache(&self, canonical: &str) -> Result<ResourceSchema, LeastError> {
        let dir = self.cache_dir.as_ref().ok_or_else(|| {
            LeastError::SchemaError(format!(
                "schema not found for {canonical}: no cache directory configured"
            ))
        })?;
        let path = dir.join(cache_file_name(canonical));
        let data = fs::read(&path).map_err(|e| {
            LeastError::SchemaError(format!("schema not found for {canonical}: {e}"))
        })?;
        ResourceSchema::from_slice(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET_SCHEMA: &str = r#"{
  "typeName": "AWS::S3::Bucket",
  "description": "Resource Type definition for AWS::S3::Bucket",
  "handlers": {
    "create": { "permissions": ["s3:CreateBucket", "s3:PutBucketTagging"] },
    "read": { "permissions": ["s3:GetBucketTagging", "s3:GetBucketLocation"] },
    "update": { "permissions": ["s3:PutBucketTagging"] },
    "delete": { "permissions": ["s3:DeleteBucket"] },
    "list": { "permissions": ["s3:ListAllMyBuckets"] }
  }
}"#;

    #[test]
    fn test_permissions_union_is_deduplicated() {
        let store = SchemaStore::new();
        assert_eq!(
            store.load_schema(BUCKET_SCHEMA.as_bytes()).unwrap(),
            "AWS::S3::Bucket"
        );
        let perms = store.permissions("AWS::S3::Bucket").unwrap();
        assert_eq!(perms.phases.create.len(), 2);
        let all: Vec<String> = perms.all().into_iter().collect();
        assert_eq!(
            all,
            vec![
                "s3:CreateBucket",
                "s3:DeleteBucket",
                "s3:GetBucketLocation",
                "s3:GetBucketTagging",
                "s3:ListAllMyBuckets",
                "s3:PutBucketTagging",
            ]
        );
    }

    #[test]
    fn test_missing_handlers_are_empty() {
        let store = SchemaStore::new();
        store
            .load_schema(br#"{"typeName": "AWS::X::Y", "handlers": {"read": {"permissions": ["x:Get"]}}}"#)
            .unwrap();
        let perms = store.permissions("AWS::X::Y").unwrap();
        assert!(perms.phases.create.is_empty());
        assert_eq!(perms.all().len(), 1);
    }

    #[test]
    fn test_unknown_type_without_cache_is_error() {
        let store = SchemaStore::new();
        assert!(matches!(
            store.permissions("AWS::S3::Bucket"),
            Err(LeastError::SchemaError(_))
        ));
    }

    #[test]
    fn test_rejects_schema_without_type_name() {
        let store = SchemaStore::new();
        assert!(store.load_schema(br#"{"handlers": {}}"#).is_err());
        assert!(store.load_schema(b"not json").is_err());
    }

    #[test]
    fn test_save_and_reload_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SchemaStore::with_cache_dir(dir.path());
        writer.load_schema(BUCKET_SCHEMA.as_bytes()).unwrap();
        let schema = writer.get("AWS::S3::Bucket").unwrap();
        let path = writer.save_to_cache(&schema).unwrap();
        assert_eq!(path.file_name().unwrap(), "aws-s3-bucket.json");

        let reader = SchemaStore::with_cache_dir(dir.path());
        assert!(!reader.contains("AWS::S3::Bucket"));
        let perms = reader.permissions("AWS::S3::Bucket").unwrap();
        assert!(perms.all().contains("s3:DeleteBucket"));
        assert!(reader.contains("AWS::S3::Bucket"));
    }

    #[test]
    fn test_save_without_cache_dir_fails() {
        let store = SchemaStore::new();
        let schema = ResourceSchema {
            type_name: "AWS::S3::Bucket".into(),
            ..Default::default()
        };
        assert!(store.save_to_cache(&schema).is_err());
    }

    #[test]
    fn test_load_schema_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("aws-s3-bucket.json"), BUCKET_SCHEMA).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(
            dir.path().join("aws-sqs-queue.json"),
            r#"{"typeName": "AWS::SQS::Queue", "handlers": {}}"#,
        )
        .unwrap();

        let store = SchemaStore::new();
        assert_eq!(store.load_schema_dir(dir.path()).unwrap(), 2);
        assert_eq!(
            store.loaded_types(),
            vec!["AWS::S3::Bucket".to_string(), "AWS::SQS::Queue".to_string()]
        );
    }

    #[test]
    fn test_load_schema_dir_missing_dir() {
        let store = SchemaStore::new();
        assert!(store.load_schema_dir(Path::new("/definitely/not/here")).is_err());
    }
}
