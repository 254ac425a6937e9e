// Contest simulator: scores candidate lineups against a generated field
// over many correlated draws and reports win, top-percentile, cash and ROI
// rates.

pub mod config;
pub mod contest;
pub mod correlation;
pub mod engine;
pub mod field;
pub mod results;

pub use config::SimulationConfig;
pub use contest::{load_contest, load_contest_from_reader, Contest, PayoutTier};
pub use engine::{build_candidates, Simulator};
pub use results::{Candidate, LineupKind, LineupResult, PlayerRecord, SimulationOutcome};

use gridiron_core::{CancelFlag, Error, Lineup, PlayerCatalog, Result, RuleConfig, ValidatedRules};

/// Simulate `optimizer_lineups` (plus any custom lineups in `config`)
/// against a generated field.
pub fn simulate(
    catalog: &PlayerCatalog,
    config: &SimulationConfig,
    optimizer_lineups: &[Lineup],
    cancel: &CancelFlag,
) -> Result<SimulationOutcome> {
    config.validate()?;

    let rule_config = RuleConfig {
        correlation_rules: config.correlation_rules.clone(),
        ..RuleConfig::default()
    };
    let overrides = ValidatedRules::new(&rule_config.to_rules()?, catalog)?.correlations;
    let candidates = build_candidates(catalog, config, optimizer_lineups)?;

    let workers = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_workers)
        .build()
        .map_err(|e| Error::config("max_workers", e.to_string()))?;

    workers.install(|| Simulator::prepare(catalog, config, &overrides, candidates)?.run(cancel))
}
