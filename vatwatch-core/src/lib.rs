//! vatwatch-core: catalog parsing and change reconciliation for live ATC coverage.
//!
//! No async and no I/O beyond optional file loading, just algorithms. This
//! crate is the shared core used by `vatwatch-server` (scheduler, fan-out,
//! and CLI).

pub mod catalog;
pub mod config;
pub mod domain;
pub mod filter;
pub mod live;
pub mod parser;
pub mod reconcile;
pub mod types;

// Re-export commonly used types at crate root
pub use catalog::{Airport, Catalog, Country, Fir, Uir};
pub use domain::{
    AirportController, Change, ChangeKind, ControllerSet, Payload, Radar, Role, TrackedAirport,
};
pub use filter::{BoxedFilter, ChangeFilter};
pub use live::{Controller, LiveSnapshot};
pub use reconcile::{MissKind, Pass, Reconciler, ResolutionMiss, State};
pub use types::*;
