use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::catalog::ActionSet;
use crate::differ::{EXIT_EXCESSIVE, EXIT_MISSING};
use crate::resolver::{ActionResolver, CatalogResolver};
use crate::settings::{OutputSettings, SchemaSettings};
use crate::snapshot_outcome;
use crate::template::RenderMode;
use crate::types::DiagnosticKind;
use yare::parameterized;


fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

fn engine() -> LeastEngine {
    LeastEngine::default()
}

fn templated_engine() -> LeastEngine {
    let settings = Settings {
        output: OutputSettings {
            templated: true,
            ..Default::default()
        },
        ..Default::default()
    };
    LeastEngine::from_settings(&settings).expect("templated settings should build")
}

fn sids(outcome: &GenerateOutcome) -> Vec<String> {
    outcome
        .policy
        .statement
        .iter()
        .filter_map(|s| s.sid.clone())
        .collect()
}

include!("generate.rs");
include!("check.rs");
