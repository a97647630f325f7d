//! Data model for declarations discovered in a configuration tree.
//!
//! - [`DeclaredResource`]: a `resource` block, identified by kind, name and
//!   defining file.
//! - [`AttrValue`]: an attribute that is either a literal, a bare reference or
//!   an interpolated template. Nothing is evaluated.
//! - [`DeclaredPolicy`]: statements extracted from policy-bearing resources and
//!   policy document data sources.
//! - [`Diagnostic`]: a soft failure recorded while walking.

mod attr_value;
mod diagnostic;
mod resource;
mod statement;

pub use attr_value::AttrValue;
pub(crate) use attr_value::INTERPOLATION;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use resource::{DeclaredResource, Location, cloud_of};
pub use statement::{DeclaredPolicy, DeclaredStatement, Effect};
