//! Wall-clock accounting for the generate pipeline.

use std::time::{Duration, Instant};

use serde::Serialize;
use utoipa::ToSchema;

/// Adds the time between construction and drop to `slot`.
///
/// ```rust,ignore
/// let mut walk = Duration::ZERO;
/// {
///     let _t = PhaseTimer::new(&mut walk);
///     provider.parse(root)?;
/// }
/// ```
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

/// Time spent in each stage of a single generate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PhaseTimings {
    /// Reading and expanding the configuration tree.
    #[schema(value_type = String)]
    pub walk: Duration,
    /// Looking up actions for each resource kind.
    #[schema(value_type = String)]
    pub resolve: Duration,
    /// Building ARNs and the output document.
    #[schema(value_type = String)]
    pub render: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.walk + self.resolve + self.render
    }
}
