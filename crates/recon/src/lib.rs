//! `plantgeo-recon`: power-plant coordinate reconciliation engine.
//!
//! Pure engine crate: receives a raw reference table through a
//! [`ReferenceSource`], returns crosswalks, name matches and reconciled
//! tables. No file or database IO.

pub mod config;
pub mod coords;
pub mod crosswalk;
pub mod error;
pub mod keys;
pub mod matcher;
pub mod model;
pub mod reconcile;
pub mod schema;
pub mod score;
pub mod store;
pub mod table;

#[cfg(test)]
mod test_fixtures;

pub use config::{MatchingConfig, ReconConfig, RegionConfig, RegionsConfig, ScorerKind};
pub use crosswalk::{build, build_all, BuildOutcome, Crosswalk, CrosswalkKey, CrosswalkSource};
pub use error::ReconError;
pub use matcher::{CoordinateMatcher, MatchOptions};
pub use model::{MatchResult, PlantRecord};
pub use reconcile::{reconcile_table, ReconcileOptions, ReconcileOutput, ReconcileSummary};
pub use schema::{Field, Schema};
pub use score::{NameNormalizer, Scorer};
pub use store::{MemorySource, ReferenceSource, ReferenceStore, ReferenceTable};
pub use table::{Table, Value};
