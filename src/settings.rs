//! Runtime settings: built-in defaults, an optional file, then environment
//! overrides such as `LEAST__SCHEMA__FETCH=true`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::LeastError;
use crate::template::{CALLER_IDENTITY_REF, REGION_REF, RenderContext, RenderMode};

pub const ENV_PREFIX: &str = "LEAST";

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    /// Provider name; detected from the root path when unset.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SchemaSettings {
    /// Where fetched schemas are cached, and read back from.
    #[schema(value_type = Option<String>)]
    pub cache_dir: Option<PathBuf>,
    /// Directory of schema documents loaded up front.
    #[schema(value_type = Option<String>)]
    pub preload_dir: Option<PathBuf>,
    /// Fetch missing schemas from the CloudFormation registry.
    #[serde(default)]
    pub fetch: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[strum(serialize = "terraform", serialize = "tf")]
    #[serde(alias = "tf")]
    Terraform,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    /// Emit `${...}` references instead of wildcards in Terraform output.
    #[serde(default)]
    pub templated: bool,
    #[serde(default = "default_account_ref")]
    pub account_ref: String,
    #[serde(default = "default_region_ref")]
    pub region_ref: String,
}

fn default_account_ref() -> String {
    CALLER_IDENTITY_REF.to_string()
}

fn default_region_ref() -> String {
    REGION_REF.to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            templated: false,
            account_ref: default_account_ref(),
            region_ref: default_region_ref(),
        }
    }
}

impl OutputSettings {
    /// JSON output is always static; Terraform output is templated on request.
    pub fn render_context(&self) -> RenderContext {
        match (self.format, self.templated) {
            (OutputFormat::Terraform, true) => RenderContext {
                mode: RenderMode::Templated,
                account_ref: Some(self.account_ref.clone()),
                region_ref: Some(self.region_ref.clone()),
            },
            _ => RenderContext::static_mode(),
        }
    }
}

impl Settings {
    /// Defaults, then `path` if it exists, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, LeastError> {
        let defaults = OutputSettings::default();
        let mut builder = config::Config::builder()
            .set_default("schema.fetch", false)?
            .set_default("output.format", defaults.format.to_string())?
            .set_default("output.templated", defaults.templated)?
            .set_default("output.account_ref", defaults.account_ref)?
            .set_default("output.region_ref", defaults.region_ref)?;

        if let Some(path) = path.filter(|p| p.exists()) {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn render_context(&self) -> RenderContext {
        self.output.render_context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&tmp.path().join("missing.toml"))).unwrap();
        assert!(!settings.schema.fetch);
        assert_eq!(settings.output.format, OutputFormat::Terraform);
        assert!(!settings.output.templated);
        assert_eq!(settings.output.account_ref, CALLER_IDENTITY_REF);
        assert_eq!(settings.render_context(), RenderContext::static_mode());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("least.toml");
        fs::write(
            &path,
            r#"
provider = "terraform"

[schema]
cache_dir = "/tmp/least-schemas"
fetch = true

[output]
format = "tf"
templated = true
account_ref = "var.account_id"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.provider.as_deref(), Some("terraform"));
        assert!(settings.schema.fetch);
        assert_eq!(
            settings.schema.cache_dir.as_deref(),
            Some(Path::new("/tmp/least-schemas"))
        );
        assert_eq!(settings.output.format, OutputFormat::Terraform);

        let ctx = settings.render_context();
        assert_eq!(ctx.mode, RenderMode::Templated);
        assert_eq!(ctx.account_ref.as_deref(), Some("var.account_id"));
        assert_eq!(ctx.region_ref.as_deref(), Some(REGION_REF));
    }

    #[test]
    fn test_json_output_is_static() {
        let output = OutputSettings {
            format: OutputFormat::Json,
            templated: true,
            ..Default::default()
        };
        assert_eq!(output.render_context().mode, RenderMode::Static);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("tf".parse::<OutputFormat>().unwrap(), OutputFormat::Terraform);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Terraform.to_string(), "terraform");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("least.toml");
        fs::write(&path, "[output]\nformat = \"yaml\"\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(LeastError::ConfigError(_))
        ));
    }
}
