pub use differ::{ComplianceReport, diff};
pub use engine::{CheckOutcome, ExistingPolicy, GenerateOutcome, LeastEngine};
pub use error::LeastError;
pub use policy::{IamPolicy, Statement};
pub use settings::{OutputFormat, Settings};
pub use template::{RenderContext, RenderMode};
pub use types::{
    AttrValue, DeclaredPolicy, DeclaredResource, DeclaredStatement, Diagnostic, DiagnosticKind,
    Effect, Location,
};
pub use walker::{ConfigWalker, WalkOutcome};

pub mod catalog;
pub mod differ;
mod engine;
mod error;
pub mod extract;
pub mod module_source;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod syntax;
pub mod template;
pub mod timers;
pub mod types;
pub mod walker;
