//! Discovery of every resource and policy reachable from a root path.
//!
//! Directories are processed depth-first in module declaration order using an
//! explicit stack. Each canonical directory is processed at most once, which
//! makes cyclic and repeated module references terminate. Everything short of
//! a missing root is recorded as a [`Diagnostic`] and the walk moves on.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::LeastError;
use crate::extract::{self, POLICY_DOCUMENT_KIND};
use crate::module_source::{ModuleReference, ModuleResolution};
use crate::syntax::{self, Expr, SyntaxBlock};
use crate::types::{DeclaredPolicy, DeclaredResource, Diagnostic, Location};

/// File name suffixes read as configuration.
pub const CONFIG_SUFFIXES: &[&str] = &[".tf", ".tf.json"];

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct WalkOutcome {
    pub resources: Vec<DeclaredResource>,
    pub policies: Vec<DeclaredPolicy>,
    pub diagnostics: Vec<Diagnostic>,
    /// Remote modules that have not been downloaded yet.
    pub pending_modules: Vec<ModuleReference>,
    /// Canonical directories, in the order they were processed.
    #[schema(value_type = Vec<String>)]
    pub visited: Vec<PathBuf>,
}

impl WalkOutcome {
    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }
}

struct Target {
    dir: PathBuf,
    /// Set when the root is a single file.
    only: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigWalker;

impl ConfigWalker {
    pub fn new() -> Self {
        Self
    }

    /// Walk from `root`, a directory or a single configuration file.
    ///
    /// Fails only when the root itself cannot be read.
    pub fn walk(&self, root: &Path) -> Result<WalkOutcome, LeastError> {
        let root = fs::canonicalize(root)
            .map_err(|e| LeastError::RootNotFound(format!("{}: {e}", root.display())))?;

        let first = if root.is_dir() {
            // Surface an unreadable root before anything is recorded.
            fs::read_dir(&root)
                .map_err(|e| LeastError::RootNotFound(format!("{}: {e}", root.display())))?;
            Target {
                dir: root.clone(),
                only: None,
            }
        } else {
            let dir = root
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| LeastError::RootNotFound(root.display().to_string()))?;
            Target {
                dir,
                only: Some(root.clone()),
            }
        };

        info!(event = "Walk", phase = "Start", root = %root.display());

        let mut outcome = WalkOutcome::default();
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![first];

        while let Some(target) = stack.pop() {
            let dir = match fs::canonicalize(&target.dir) {
                Ok(dir) => dir,
                Err(e) => {
                    outcome.diagnostics.push(Diagnostic::unresolvable_module(
                        &target.dir,
                        format!("cannot access module directory: {e}"),
                    ));
                    continue;
                }
            };
            if !visited.insert(dir.clone()) {
                debug!(event = "Walk", phase = "Skip", dir = %dir.display(), "already visited");
                continue;
            }
            outcome.visited.push(dir.clone());

            let files = match target.only {
                Some(file) => vec![file],
                None => match config_files(&dir) {
                    Ok(files) => files,
                    Err(e) => {
                        outcome
                            .diagnostics
                            .push(Diagnostic::parse_failure(&dir, e.to_string()));
                        continue;
                    }
                },
            };

            let mut modules = Vec::new();
            for file in &files {
                self.scan_file(file, &dir, &mut outcome, &mut modules);
            }

            // Reverse so the first declared module is expanded first.
            let mut expansions = Vec::new();
            for module in modules {
                match module.resolve() {
                    ModuleResolution::Resolved(path) => {
                        debug!(
                            event = "Walk",
                            phase = "Module",
                            module = %module.name,
                            target = %path.display()
                        );
                        expansions.push(Target {
                            dir: path,
                            only: None,
                        });
                    }
                    ModuleResolution::NotMaterialized => {
                        debug!(
                            event = "Walk",
                            phase = "Module",
                            module = %module.name,
                            source = %module.source,
                            "remote module not materialized"
                        );
                        outcome.pending_modules.push(module);
                    }
                    ModuleResolution::Failed(reason) => {
                        outcome.diagnostics.push(Diagnostic::unresolvable_module(
                            &module.declared_in,
                            format!("module \"{}\": {reason}", module.name),
                        ));
                    }
                }
            }
            stack.extend(expansions.into_iter().rev());
        }

        info!(
            event = "Walk",
            phase = "Complete",
            resources = outcome.resources.len(),
            policies = outcome.policies.len(),
            diagnostics = outcome.diagnostics.len(),
            directories = outcome.visited.len()
        );

        Ok(outcome)
    }

    fn scan_file(
        &self,
        file: &Path,
        dir: &Path,
        outcome: &mut WalkOutcome,
        modules: &mut Vec<ModuleReference>,
    ) {
        let src = match fs::read_to_string(file) {
            Ok(src) => src,
            Err(e) => {
                outcome
                    .diagnostics
                    .push(Diagnostic::parse_failure(file, e.to_string()));
                return;
            }
        };

        let body = match syntax::parse_source(file, &src) {
            Ok(body) => body,
            Err(e) => {
                debug!(event = "Walk", phase = "Parse", file = %file.display(), error = %e);
                outcome
                    .diagnostics
                    .push(Diagnostic::parse_failure(file, e.to_string()));
                return;
            }
        };

        for block in &body.blocks {
            match block.kind.as_str() {
                "resource" => {
                    let (Some(kind), Some(name)) = (block.label(0), block.label(1)) else {
                        continue;
                    };
                    let location = Location {
                        file: file.to_path_buf(),
                        line: header_line(&src, block),
                    };
                    outcome
                        .policies
                        .extend(extract::resource_policies(kind, name, &block.body, &location));

                    let mut resource = DeclaredResource::new(kind, name, location);
                    for (key, expr) in &block.body.attributes {
                        if let Some(value) = expr.to_attr_value() {
                            resource = resource.with_attr(key, value);
                        }
                    }
                    outcome.resources.push(resource);
                }
                "data" if block.label(0) == Some(POLICY_DOCUMENT_KIND) => {
                    let Some(name) = block.label(1) else {
                        continue;
                    };
                    let location = Location {
                        file: file.to_path_buf(),
                        line: header_line(&src, block),
                    };
                    outcome
                        .policies
                        .push(extract::policy_document(name, &block.body, &location));
                }
                "module" => {
                    let Some(name) = block.label(0) else {
                        continue;
                    };
                    match block.body.attr("source").and_then(Expr::as_str) {
                        Some(source) => modules.push(ModuleReference::new(name, source, dir)),
                        None => outcome.diagnostics.push(Diagnostic::unresolvable_module(
                            file,
                            format!("module \"{name}\": source is not a literal string"),
                        )),
                    }
                }
                _ => {}
            }
        }
    }
}

/// Configuration files directly inside `dir`, sorted by name.
fn config_files(dir: &Path) -> Result<Vec<PathBuf>, LeastError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_config_file(path))
        .collect();
    files.sort();
    Ok(files)
}

pub fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| CONFIG_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// 1-based line of a block header. Best effort; `None` when not found.
fn header_line(src: &str, block: &SyntaxBlock) -> Option<usize> {
    let quoted: Vec<String> = block.labels.iter().map(|l| format!("\"{l}\"")).collect();

    let native = src.lines().position(|line| {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix(block.kind.as_str()) else {
            return false;
        };
        let mut rest = rest.trim_start();
        for label in &quoted {
            match rest.strip_prefix(label.as_str()) {
                Some(tail) => rest = tail.trim_start(),
                None => return false,
            }
        }
        rest.starts_with('{')
    });
    if let Some(idx) = native {
        return Some(idx + 1);
    }

    // JSON syntax: the last label is the object key that opens the body.
    let mut offset = src.find(&format!("\"{}\"", block.kind))?;
    for label in &quoted {
        offset += src[offset..].find(label.as_str())?;
    }
    Some(src[..offset].matches('\n').count() + 1)
}
