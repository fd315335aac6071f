//! Change detection and run orchestration.
//!
//! - `diff`: compare a stored entity set with a fresh scrape
//! - `CircuitBreaker`: refuse snapshots that shrank suspiciously
//! - `RunBudget`: wall-clock budget gating detail fetches
//! - `Pipeline`: fetch, diff, notify and commit for every source

mod budget;
mod circuit_breaker;
mod diff;
mod run;

pub use budget::RunBudget;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerResult};
pub use diff::{
    ChangeKind, Changeset, EntryDelta, Field, FieldChange, ModifiedEntry, backfill_degraded,
    collapse_duplicates, diff,
};
pub use run::{Pipeline, RunOptions, RunReport, SourceReport, SourceState, Stage};
