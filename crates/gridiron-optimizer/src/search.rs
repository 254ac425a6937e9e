// Wave-based lineup search.
//
// Each wave solves `width` problems against the lineups accepted so far.
// With randomness the problems differ only in their perturbed objectives
// and run in parallel. The width is fixed and results are accepted in
// solve-index order, so a seed replays exactly on any worker count.

use gridiron_core::{
    CancelFlag, Error, Lineup, PlayerCatalog, Result, ValidatedRules, ROSTER_SIZE,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::model::CompiledModel;
use crate::solver::{HighsSolver, LineupSolver, SolveStatus};

/// Perturbation draws are clamped to this many standard deviations.
const Z_CLAMP: f64 = 3.0;

/// Fraction of the projection used as σ when a player has no std-dev.
const FALLBACK_SIGMA_FRACTION: f64 = 0.5;

/// Solves per wave when projections are perturbed.
pub const RANDOM_WAVE_WIDTH: usize = 8;

/// Consecutive waves that may add nothing before the search gives up. Only
/// reachable with `num_uniques = 0`, where solves can repeat a lineup.
const MAX_STALLED_WAVES: usize = 3;

#[derive(Debug, Clone)]
pub struct OptimizerOutcome {
    /// Accepted lineups, best base projection first.
    pub lineups: Vec<Lineup>,
    pub requested: usize,
    /// Fewer lineups than requested.
    pub partial: bool,
    /// The run stopped on the cancel flag.
    pub cancelled: bool,
    /// Uniqueness actually enforced on the last wave (lower than configured
    /// only after relaxation).
    pub effective_uniques: usize,
    pub solves: u64,
}

/// Projections for one solve. With zero randomness these are the base
/// projections; otherwise each player gets `fpts + r·σ·z`, floored at 0.
pub fn perturbed_projections(
    catalog: &PlayerCatalog,
    pool: &[usize],
    randomness: f64,
    seed: u64,
    solve_index: u64,
) -> Vec<f64> {
    if randomness <= 0.0 {
        return pool.iter().map(|&p| catalog.player(p).fpts).collect();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(solve_index));
    pool.iter()
        .map(|&p| {
            let player = catalog.player(p);
            let sigma = if player.std_dev > 0.0 {
                player.std_dev
            } else {
                player.fpts * FALLBACK_SIGMA_FRACTION
            };
            let z: f64 = StandardNormal.sample(&mut rng);
            (player.fpts + randomness * sigma * z.clamp(-Z_CLAMP, Z_CLAMP)).max(0.0)
        })
        .collect()
}

pub struct Optimizer<'a, S> {
    catalog: &'a PlayerCatalog,
    rules: &'a ValidatedRules,
    config: &'a OptimizerConfig,
    solver: S,
}

impl<'a, S: LineupSolver> Optimizer<'a, S> {
    pub fn new(
        catalog: &'a PlayerCatalog,
        rules: &'a ValidatedRules,
        config: &'a OptimizerConfig,
        solver: S,
    ) -> Self {
        Optimizer {
            catalog,
            rules,
            config,
            solver,
        }
    }

    pub fn run(&self, cancel: &CancelFlag) -> Result<OptimizerOutcome> {
        let config = self.config;
        config.validate()?;

        let requested = config.num_lineups;
        let model = CompiledModel::compile(self.catalog, self.rules, config)?;
        if let Some(reason) = model.infeasible_reason() {
            info!("No feasible lineup: {}", reason);
            return Err(Error::NoFeasibleLineup);
        }

        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_workers)
            .build()
            .map_err(|e| Error::config("max_workers", e.to_string()))?;
        let wave_width = if config.randomness > 0.0 {
            RANDOM_WAVE_WIDTH
        } else {
            1
        };

        info!(
            "Optimizing {} lineups with {} (randomness {}, {} uniques, wave width {})",
            requested,
            self.solver.name(),
            config.randomness,
            config.num_uniques,
            wave_width
        );

        let mut accepted: Vec<Lineup> = Vec::with_capacity(requested);
        let mut uniques = config.num_uniques;
        let mut next_solve: u64 = 0;
        let mut cancelled = false;
        let mut stalled = 0;

        'waves: while accepted.len() < requested {
            if cancel.is_cancelled() {
                info!("Optimizer cancelled after {} lineups", accepted.len());
                cancelled = true;
                break;
            }

            let width = wave_width.min(requested - accepted.len());
            let max_shared = ROSTER_SIZE - uniques;
            let first = next_solve;
            next_solve += width as u64;
            let before = accepted.len();

            let results: Vec<Result<SolveStatus>> = workers.install(|| {
                (first..first + width as u64)
                    .into_par_iter()
                    .map(|i| {
                        let objective = perturbed_projections(
                            self.catalog,
                            model.pool(),
                            config.randomness,
                            config.seed,
                            i,
                        );
                        self.solver.solve(&model.problem(objective, &accepted, max_shared))
                    })
                    .collect()
            });

            for (pos, result) in results.into_iter().enumerate() {
                let selected = match result? {
                    SolveStatus::Optimal(selected) => selected,
                    SolveStatus::Infeasible if pos == 0 => {
                        if config.allow_uniques_relaxation && uniques > 1 {
                            uniques -= 1;
                            warn!(
                                "No lineup with {} uniques after {} lineups; relaxing to {}",
                                uniques + 1,
                                accepted.len(),
                                uniques
                            );
                            continue 'waves;
                        }
                        info!("Search exhausted after {} lineups", accepted.len());
                        break 'waves;
                    }
                    SolveStatus::Infeasible => continue,
                };

                let players = model.selection_to_players(&selected);
                let lineup = Lineup::from_players(self.catalog, &players).ok_or_else(|| {
                    Error::Solver(format!(
                        "solution with {} players does not fill the roster",
                        players.len()
                    ))
                })?;
                self.rules
                    .check_lineup(self.catalog, lineup.players())
                    .map_err(|v| Error::Solver(format!("solution violates a rule: {v}")))?;

                if accepted.iter().any(|l| *l == lineup || l.overlap(&lineup) > max_shared) {
                    debug!("dropping solve {} of wave at {}: too similar", pos, first);
                    continue;
                }
                accepted.push(lineup);
            }

            if accepted.len() == before {
                stalled += 1;
                if stalled >= MAX_STALLED_WAVES {
                    info!("No new lineups in {} waves; stopping at {}", stalled, accepted.len());
                    break;
                }
            } else {
                stalled = 0;
            }
        }

        if accepted.is_empty() {
            return Err(if cancelled {
                Error::Cancelled
            } else {
                Error::NoFeasibleLineup
            });
        }

        accepted.sort_by(|a, b| b.fpts(self.catalog).total_cmp(&a.fpts(self.catalog)));
        let partial = accepted.len() < requested;
        if partial {
            warn!("Generated {} of {} requested lineups", accepted.len(), requested);
        } else {
            info!("Generated {} lineups in {} solves", accepted.len(), next_solve);
        }

        Ok(OptimizerOutcome {
            lineups: accepted,
            requested,
            partial,
            cancelled,
            effective_uniques: uniques,
            solves: next_solve,
        })
    }
}

/// Run the optimizer with the HiGHS backend.
pub fn optimize(
    catalog: &PlayerCatalog,
    rules: &ValidatedRules,
    config: &OptimizerConfig,
    cancel: &CancelFlag,
) -> Result<OptimizerOutcome> {
    Optimizer::new(catalog, rules, config, HighsSolver::new()).run(cancel)
}

/// The single highest-projected legal lineup under `salary_cap`, with no
/// user rules or exposure settings.
pub fn best_lineup(catalog: &PlayerCatalog, salary_cap: u32) -> Result<Lineup> {
    let config = OptimizerConfig {
        num_lineups: 1,
        min_salary: 0,
        salary_cap,
        global_team_limit: None,
        projection_minimum: f64::MIN,
        allow_qb_vs_dst: true,
        ..OptimizerConfig::default()
    };
    let rules = ValidatedRules::default();
    let outcome = optimize(catalog, &rules, &config, &CancelFlag::new())?;
    outcome.lineups.into_iter().next().ok_or(Error::NoFeasibleLineup)
}
