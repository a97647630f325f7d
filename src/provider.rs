//! Infrastructure-as-code front ends.
//!
//! A provider knows how to recognise its files and how to turn a root path
//! into a [`WalkOutcome`]. Terraform (and OpenTofu, which shares the syntax)
//! is the only one built in.

use std::fs;
use std::path::Path;

use crate::error::LeastError;
use crate::walker::{CONFIG_SUFFIXES, ConfigWalker, WalkOutcome, is_config_file};

pub trait IacProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// File name suffixes this provider reads.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Whether `path` is, or directly contains, a file this provider reads.
    fn detect(&self, path: &Path) -> Result<bool, LeastError>;

    fn parse(&self, path: &Path) -> Result<WalkOutcome, LeastError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TerraformProvider {
    walker: ConfigWalker,
}

impl TerraformProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IacProvider for TerraformProvider {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        CONFIG_SUFFIXES
    }

    fn detect(&self, path: &Path) -> Result<bool, LeastError> {
        let meta = fs::metadata(path)
            .map_err(|e| LeastError::RootNotFound(format!("{}: {e}", path.display())))?;
        if !meta.is_dir() {
            return Ok(is_config_file(path));
        }
        Ok(fs::read_dir(path)?
            .filter_map(Result::ok)
            .any(|entry| entry.path().is_file() && is_config_file(&entry.path())))
    }

    fn parse(&self, path: &Path) -> Result<WalkOutcome, LeastError> {
        self.walker.walk(path)
    }
}

pub struct ProviderRegistry {
    providers: Vec<Box<dyn IacProvider>>,
}

impl Default for ProviderRegistry {
    /// A registry with every built-in provider.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(TerraformProvider::new()));
        registry
    }
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: Box<dyn IacProvider>) {
        self.providers.push(provider);
    }

    /// Providers that recognise `path`, in registration order.
    pub fn detect(&self, path: &Path) -> Result<Vec<&dyn IacProvider>, LeastError> {
        let mut matched = Vec::new();
        for provider in &self.providers {
            if provider.detect(path)? {
                matched.push(provider.as_ref());
            }
        }
        Ok(matched)
    }

    /// The first provider that recognises `path`.
    pub fn detect_one(&self, path: &Path) -> Result<&dyn IacProvider, LeastError> {
        self.detect(path)?
            .into_iter()
            .next()
            .ok_or_else(|| LeastError::NoProviderDetected(path.display().to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&dyn IacProvider> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn IacProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }
}
