//! Non-fatal findings collected during a walk.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, StrumDisplay, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A declaration file could not be read or parsed.
    ParseFailure,
    /// A module source could not be mapped to a directory.
    UnresolvableModule,
}

/// A soft failure attached to a run. The walk keeps going after recording one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[schema(value_type = String)]
    pub location: PathBuf,
    pub message: String,
}

impl Diagnostic {
    pub fn parse_failure(location: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::ParseFailure,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn unresolvable_module(location: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvableModule,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "[{}] {}: {}",
            self.kind,
            self.location.display(),
            self.message
        )
    }
}
