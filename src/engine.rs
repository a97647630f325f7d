use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::differ::{self, ComplianceReport};
use crate::error::LeastError;
use crate::module_source::ModuleReference;
use crate::policy::{IamPolicy, PolicyGenerator, parse_policy};
use crate::provider::{IacProvider, ProviderRegistry};
use crate::resolver::{ResolvedActions, SchemaResolver, TieredResolver};
use crate::schema::{AwsCliFetcher, SchemaStore};
use crate::settings::{OutputFormat, Settings};
use crate::template::RenderContext;
use crate::timers::{PhaseTimer, PhaseTimings};
use crate::types::Diagnostic;
use crate::walker::WalkOutcome;

/// The policy a configuration is checked against.
#[derive(Debug, Clone)]
pub enum ExistingPolicy {
    /// An already parsed document.
    Document(IamPolicy),
    /// A JSON policy file.
    JsonFile(PathBuf),
    /// A configuration tree whose declared policies are combined.
    Tree(PathBuf),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenerateOutcome {
    pub policy: IamPolicy,
    /// Resource kinds with no known actions, sorted.
    pub unresolved_kinds: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub pending_modules: Vec<ModuleReference>,
    pub phases: PhaseTimings,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckOutcome {
    pub report: ComplianceReport,
    /// Diagnostics from walking the checked configuration, then the existing
    /// tree if there is one.
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutcome {
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// The main engine handle. Cloneable and thread-safe.
#[derive(Clone)]
pub struct LeastEngine {
    registry: Arc<ProviderRegistry>,
    resolver: Arc<TieredResolver>,
    ctx: Arc<RwLock<RenderContext>>,
    provider: Option<String>,
    format: OutputFormat,
}

impl Default for LeastEngine {
    /// Built-in providers, catalog-only resolution, static output.
    fn default() -> Self {
        Self::new(
            ProviderRegistry::default(),
            TieredResolver::catalog_only(),
            RenderContext::static_mode(),
        )
    }
}

impl LeastEngine {
    pub fn new(registry: ProviderRegistry, resolver: TieredResolver, ctx: RenderContext) -> Self {
        Self {
            registry: Arc::new(registry),
            resolver: Arc::new(resolver),
            ctx: Arc::new(RwLock::new(ctx)),
            provider: None,
            format: OutputFormat::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LeastError> {
        let store = match &settings.schema.cache_dir {
            Some(dir) => SchemaStore::with_cache_dir(dir),
            None => SchemaStore::new(),
        };
        if let Some(dir) = &settings.schema.preload_dir {
            let loaded = store.load_schema_dir(dir)?;
            info!(
                event = "Engine",
                phase = "Schemas",
                dir = %dir.display(),
                loaded
            );
        }

        let mut schema = SchemaResolver::new(Arc::new(store));
        if settings.schema.fetch {
            let fetcher = AwsCliFetcher::new();
            if !fetcher.is_available() {
                warn!(
                    event = "Engine",
                    phase = "Schemas",
                    "aws cli not found, schema fetches will fail"
                );
            }
            schema = schema.with_fetcher(Box::new(fetcher));
        }

        let registry = ProviderRegistry::default();
        if let Some(name) = &settings.provider {
            if registry.get(name).is_none() {
                return Err(LeastError::UnknownProvider(name.clone()));
            }
        }

        let mut engine = Self::new(
            registry,
            TieredResolver::standard(schema),
            settings.render_context(),
        );
        engine.provider = settings.provider.clone();
        engine.format = settings.output.format;
        Ok(engine)
    }

    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render_context(&self) -> Result<RenderContext, LeastError> {
        Ok(self.ctx.read()?.clone())
    }

    /// Swap the render context for every clone of this engine.
    pub fn set_render_context(&self, ctx: RenderContext) -> Result<(), LeastError> {
        *self.ctx.write()? = ctx;
        Ok(())
    }

    /// The configured provider, or the first one recognising `path`.
    pub fn provider_for(&self, path: &Path) -> Result<&dyn IacProvider, LeastError> {
        if let Some(name) = &self.provider {
            return self
                .registry
                .get(name)
                .ok_or_else(|| LeastError::UnknownProvider(name.clone()));
        }

        let detected = self.registry.detect(path)?;
        if detected.len() > 1 {
            let names: Vec<&str> = detected.iter().map(|p| p.name()).collect();
            warn!(
                event = "Engine",
                phase = "Detect",
                path = %path.display(),
                providers = ?names,
                "several providers match, using the first"
            );
        }
        detected
            .into_iter()
            .next()
            .ok_or_else(|| LeastError::NoProviderDetected(path.display().to_string()))
    }

    /// Walk `path` without generating anything.
    pub fn analyze(&self, path: &Path) -> Result<WalkOutcome, LeastError> {
        let provider = self.provider_for(path)?;
        debug!(
            event = "Engine",
            phase = "Analyze",
            provider = provider.name(),
            path = %path.display()
        );
        provider.parse(path)
    }

    pub fn generate(&self, path: &Path) -> Result<GenerateOutcome, LeastError> {
        let mut phases = PhaseTimings::default();

        let walked = {
            let _t = PhaseTimer::new(&mut phases.walk);
            self.analyze(path)?
        };

        let resolved = {
            let _t = PhaseTimer::new(&mut phases.resolve);
            ResolvedActions::collect(&self.resolver, walked.resources.iter().map(|r| r.kind()))
        };
        debug!(
            event = "Engine",
            phase = "Resolve",
            kinds = resolved.len(),
            unresolved = resolved.unresolved().count()
        );

        let generated = {
            let _t = PhaseTimer::new(&mut phases.render);
            let ctx = self.render_context()?;
            PolicyGenerator::new(&resolved, ctx).generate(&walked.resources)
        };

        if !generated.unresolved_kinds.is_empty() {
            warn!(
                event = "Engine",
                phase = "Generate",
                unresolved = ?generated.unresolved_kinds,
                "resource kinds without known actions were skipped"
            );
        }
        info!(
            event = "Engine",
            phase = "Generate",
            statements = generated.policy.statement.len(),
            diagnostics = walked.diagnostics.len(),
            elapsed_us = phases.total().as_micros() as u64
        );

        Ok(GenerateOutcome {
            policy: generated.policy,
            unresolved_kinds: generated.unresolved_kinds,
            diagnostics: walked.diagnostics,
            pending_modules: walked.pending_modules,
            phases,
        })
    }

    /// Compare what `path` needs against `existing`.
    pub fn check(&self, path: &Path, existing: ExistingPolicy) -> Result<CheckOutcome, LeastError> {
        let (existing, existing_diagnostics) = self.read_existing(existing)?;
        let mut generated = self.generate(path)?;
        let report = differ::check(&existing, &generated.policy);

        info!(
            event = "Engine",
            phase = "Check",
            missing = report.missing.len(),
            excessive = report.excessive.len(),
            matched = report.matched.len()
        );

        generated.diagnostics.extend(existing_diagnostics);
        Ok(CheckOutcome {
            report,
            diagnostics: generated.diagnostics,
        })
    }

    pub fn load_existing(&self, existing: ExistingPolicy) -> Result<IamPolicy, LeastError> {
        self.read_existing(existing).map(|(policy, _)| policy)
    }

    /// The existing policy, plus diagnostics from walking it when it is a tree.
    fn read_existing(
        &self,
        existing: ExistingPolicy,
    ) -> Result<(IamPolicy, Vec<Diagnostic>), LeastError> {
        match existing {
            ExistingPolicy::Document(policy) => Ok((policy, Vec::new())),
            ExistingPolicy::JsonFile(path) => Ok((parse_policy(&fs::read(&path)?)?, Vec::new())),
            ExistingPolicy::Tree(path) => {
                let walked = self.analyze(&path)?;
                if walked.policies.is_empty() {
                    return Err(LeastError::NoPoliciesFound(path.display().to_string()));
                }
                debug!(
                    event = "Engine",
                    phase = "Existing",
                    path = %path.display(),
                    policies = walked.policies.len(),
                    diagnostics = walked.diagnostics.len()
                );
                Ok((IamPolicy::from_declared(&walked.policies), walked.diagnostics))
            }
        }
    }

    /// Render `policy` in the engine's output format.
    pub fn render(&self, policy: &IamPolicy) -> Result<String, LeastError> {
        match self.format {
            OutputFormat::Json => policy.to_json(),
            OutputFormat::Terraform => Ok(policy.to_terraform()),
        }
    }
}

#[cfg(test)]
mod tests;
