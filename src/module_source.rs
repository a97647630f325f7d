//! Mapping `module` blocks to the directories they expand into.
//!
//! Three address forms are understood:
//! - `./x` and `../x`, relative to the declaring directory;
//! - absolute paths;
//! - anything else is remote, and is looked up by exact source string in
//!   `.terraform/modules/modules.json` next to the declaring configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Manifest written by `terraform init`, relative to the declaring directory.
pub const MANIFEST_PATH: &str = ".terraform/modules/modules.json";

/// A `module "<name>" { source = "..." }` block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ModuleReference {
    pub name: String,
    pub source: String,
    #[schema(value_type = String)]
    pub declared_in: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleResolution {
    /// An existing directory to walk.
    Resolved(PathBuf),
    /// A remote module that has not been downloaded yet. Not an error.
    NotMaterialized,
    /// The source points nowhere.
    Failed(String),
}

#[derive(Debug, Default, Deserialize)]
struct ModuleManifest {
    #[serde(rename = "Modules", default)]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Source", default)]
    source: String,
    #[serde(rename = "Dir", default)]
    dir: String,
}

impl ModuleReference {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        declared_in: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            declared_in: declared_in.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.source.starts_with("./")
            || self.source.starts_with("../")
            || Path::new(&self.source).is_absolute()
    }

    pub fn resolve(&self) -> ModuleResolution {
        let source = self.source.as_str();

        if source.starts_with("./") || source.starts_with("../") {
            let path = self.declared_in.join(source);
            return if path.is_dir() {
                ModuleResolution::Resolved(path)
            } else {
                ModuleResolution::Failed(format!("local module path not found: {}", path.display()))
            };
        }

        if Path::new(source).is_absolute() {
            let path = PathBuf::from(source);
            return if path.is_dir() {
                ModuleResolution::Resolved(path)
            } else {
                ModuleResolution::Failed(format!(
                    "absolute module path not found: {}",
                    path.display()
                ))
            };
        }

        self.resolve_remote()
    }

    fn resolve_remote(&self) -> ModuleResolution {
        let manifest_path = self.declared_in.join(MANIFEST_PATH);
        let data = match fs::read(&manifest_path) {
            Ok(data) => data,
            Err(_) => {
                debug!(
                    event = "ModuleSource",
                    phase = "Manifest",
                    module = %self.name,
                    source = %self.source,
                    "no module manifest"
                );
                return ModuleResolution::NotMaterialized;
            }
        };

        let manifest: ModuleManifest = match serde_json::from_slice(&data) {
            Ok(manifest) => manifest,
            Err(e) => {
                return ModuleResolution::Failed(format!(
                    "unreadable module manifest {}: {e}",
                    manifest_path.display()
                ));
            }
        };

        let Some(entry) = manifest.modules.iter().find(|m| m.source == self.source) else {
            return ModuleResolution::NotMaterialized;
        };

        let path = self.declared_in.join(&entry.dir);
        if path.is_dir() {
            ModuleResolution::Resolved(path)
        } else {
            ModuleResolution::Failed(format!(
                "materialized module directory not found: {}",
                path.display()
            ))
        }
    }
}
