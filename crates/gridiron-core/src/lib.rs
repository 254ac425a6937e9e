// Shared slate model: player catalog, rule model, lineups, and statistics.
//
// The optimizer and simulator crates both build on these types. Nothing in
// here mutates after construction, so catalogs and validated rules can be
// shared by reference across worker threads.

pub mod cancel;
pub mod catalog;
pub mod error;
pub mod lenient;
pub mod lineup;
pub mod player;
pub mod rules;
pub mod stats;

pub use cancel::CancelFlag;
pub use catalog::PlayerCatalog;
pub use error::{DataError, Error, Result};
pub use lineup::{Lineup, Slot, DK_SALARY_CAP, ROSTER_SIZE};
pub use player::{Player, PlayerId, Position};
pub use rules::{Relation, Rule, RuleConfig, ValidatedRules};
