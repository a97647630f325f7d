//! Resource kind -> IAM action set resolution.
//!
//! Each source of truth is an [`ActionResolver`]. The [`TieredResolver`] asks
//! them in order and keeps the first non-empty answer, so the authoritative
//! schema tier wins and the static catalog fills the gaps.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::catalog::{self, ActionSet};
use crate::schema::{SchemaFetcher, SchemaStore, canonical_type_name};

pub trait ActionResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Actions needed to manage `kind` across its lifecycle. A miss is an
    /// empty set, never an error.
    fn resolve(&self, kind: &str) -> ActionSet;
}

/// Resolves through CloudFormation resource schemas.
///
/// Lookups go memory -> disk cache -> fetcher. A successful fetch is stored
/// in memory and written to the cache; a failed fetch is remembered and not
/// attempted again by this resolver.
pub struct SchemaResolver {
    store: Arc<SchemaStore>,
    fetcher: Option<Box<dyn SchemaFetcher>>,
    failed: RwLock<HashSet<String>>,
}

impl SchemaResolver {
    pub fn new(store: Arc<SchemaStore>) -> Self {
        Self {
            store,
            fetcher: None,
            failed: RwLock::new(HashSet::new()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn SchemaFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    fn fetch(&self, canonical: &str) -> Option<ActionSet> {
        let fetcher = self.fetcher.as_ref()?;
        if self
            .failed
            .read()
            .map(|f| f.contains(canonical))
            .unwrap_or(false)
        {
            return None;
        }

        match fetcher.fetch(canonical) {
            Ok(schema) => {
                let actions = schema.permissions().all();
                if self.store.cache_dir().is_some() {
                    if let Err(e) = self.store.save_to_cache(&schema) {
                        debug!(
                            event = "Resolve",
                            phase = "CacheWrite",
                            type_name = %canonical,
                            error = %e
                        );
                    }
                }
                self.store.insert(schema);
                Some(actions)
            }
            Err(e) => {
                debug!(
                    event = "Resolve",
                    phase = "Fetch",
                    type_name = %canonical,
                    error = %e,
                    "schema fetch failed"
                );
                if let Ok(mut failed) = self.failed.write() {
                    failed.insert(canonical.to_string());
                }
                None
            }
        }
    }
}

impl ActionResolver for SchemaResolver {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn resolve(&self, kind: &str) -> ActionSet {
        let Some(canonical) = canonical_type_name(kind) else {
            return ActionSet::new();
        };

        match self.store.permissions(&canonical) {
            Ok(perms) => perms.all(),
            Err(_) => self.fetch(&canonical).unwrap_or_default(),
        }
    }
}

/// Resolves through the built-in catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogResolver;

impl ActionResolver for CatalogResolver {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn resolve(&self, kind: &str) -> ActionSet {
        catalog::actions_for(kind)
    }
}

/// Ordered fallback over several resolvers.
#[derive(Default)]
pub struct TieredResolver {
    tiers: Vec<Box<dyn ActionResolver>>,
}

impl TieredResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema tier first, catalog second.
    pub fn standard(schema: SchemaResolver) -> Self {
        Self::new().with_tier(schema).with_tier(CatalogResolver)
    }

    /// Catalog only.
    pub fn catalog_only() -> Self {
        Self::new().with_tier(CatalogResolver)
    }

    pub fn with_tier(mut self, tier: impl ActionResolver + 'static) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// The first non-empty tier answer, with the tier that produced it.
    pub fn resolve_with_source(&self, kind: &str) -> Option<(&'static str, ActionSet)> {
        self.tiers.iter().find_map(|tier| {
            let actions = tier.resolve(kind);
            (!actions.is_empty()).then(|| (tier.name(), actions))
        })
    }
}

impl ActionResolver for TieredResolver {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn resolve(&self, kind: &str) -> ActionSet {
        match self.resolve_with_source(kind) {
            Some((source, actions)) => {
                debug!(
                    event = "Resolve",
                    phase = "Tier",
                    kind = %kind,
                    source = source,
                    actions = actions.len()
                );
                actions
            }
            None => {
                debug!(event = "Resolve", phase = "Miss", kind = %kind);
                ActionSet::new()
            }
        }
    }
}

/// Action sets resolved up front, one lookup per kind.
#[derive(Debug, Default, Clone)]
pub struct ResolvedActions {
    by_kind: BTreeMap<String, ActionSet>,
}

impl ResolvedActions {
    /// Ask `resolver` once for every distinct kind in `kinds`. Misses are
    /// kept as empty sets.
    pub fn collect<'k>(
        resolver: &TieredResolver,
        kinds: impl IntoIterator<Item = &'k str>,
    ) -> Self {
        let mut by_kind = BTreeMap::new();
        for kind in kinds {
            if by_kind.contains_key(kind) {
                continue;
            }
            let actions = match resolver.resolve_with_source(kind) {
                Some((source, actions)) => {
                    debug!(
                        event = "Resolve",
                        phase = "Tier",
                        kind = %kind,
                        source = source,
                        actions = actions.len()
                    );
                    actions
                }
                None => {
                    debug!(event = "Resolve", phase = "Miss", kind = %kind);
                    ActionSet::new()
                }
            };
            by_kind.insert(kind.to_string(), actions);
        }
        Self { by_kind }
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.by_kind
            .iter()
            .filter(|(_, actions)| actions.is_empty())
            .map(|(kind, _)| kind.as_str())
    }
}

impl ActionResolver for ResolvedActions {
    fn name(&self) -> &'static str {
        "resolved"
    }

    fn resolve(&self, kind: &str) -> ActionSet {
        self.by_kind.get(kind).cloned().unwrap_or_default()
    }
}
