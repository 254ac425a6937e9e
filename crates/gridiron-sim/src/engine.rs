// Monte-Carlo contest engine.
//
// Draws are split into fixed-size batches. Batch `b` seeds its RNG from
// `(seed, b)`, batches run in parallel waves, and partial tallies merge in
// batch order, so a seed reproduces the same numbers on any thread count.

use std::collections::HashSet;

use gridiron_core::rules::CorrelationMap;
use gridiron_core::{CancelFlag, Error, Lineup, PlayerCatalog, PlayerId, Result, ROSTER_SIZE};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::contest::Contest;
use crate::correlation::ScoreModel;
use crate::field::FieldGenerator;
use crate::results::{self, Candidate, LineupKind, SimulationOutcome, Tally};

/// Resolve one custom-lineup entry: an ID, a name, or the `Name (ID)` form
/// the lineup export writes.
fn resolve_entry(catalog: &PlayerCatalog, entry: &str) -> Option<usize> {
    if let Some(idx) = catalog.resolve(entry) {
        return Some(idx);
    }
    let (_, rest) = entry.trim().rsplit_once('(')?;
    let id = rest.strip_suffix(')')?.trim().parse::<u64>().ok()?;
    catalog.index_of(PlayerId(id))
}

/// Build the candidate list: optimizer lineups (unless only hand-entered
/// lineups are wanted) followed by the custom lineups.
pub fn build_candidates(
    catalog: &PlayerCatalog,
    config: &SimulationConfig,
    optimizer_lineups: &[Lineup],
) -> Result<Vec<Candidate>> {
    let mut candidates: Vec<Candidate> = Vec::new();
    if !config.use_lineup_input {
        candidates.extend(optimizer_lineups.iter().map(|&lineup| Candidate {
            lineup,
            kind: LineupKind::Optimizer,
        }));
    }

    for (n, entries) in config.custom_lineups.iter().enumerate() {
        let label = n + 1;
        if entries.len() != ROSTER_SIZE {
            return Err(Error::config(
                "custom_lineups",
                format!("lineup {label} has {} players, expected {ROSTER_SIZE}", entries.len()),
            ));
        }
        let players = entries
            .iter()
            .map(|e| {
                resolve_entry(catalog, e).ok_or_else(|| {
                    Error::config("custom_lineups", format!("lineup {label}: unknown player {e:?}"))
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        let lineup = Lineup::from_players(catalog, &players).ok_or_else(|| {
            Error::config(
                "custom_lineups",
                format!("lineup {label} does not fill a legal roster"),
            )
        })?;
        if lineup.salary(catalog) > config.salary_cap {
            return Err(Error::config(
                "custom_lineups",
                format!(
                    "lineup {label} salary {} exceeds the cap of {}",
                    lineup.salary(catalog),
                    config.salary_cap
                ),
            ));
        }
        candidates.push(Candidate {
            lineup,
            kind: LineupKind::Custom,
        });
    }

    if candidates.is_empty() {
        return Err(Error::config("custom_lineups", "no lineups to simulate"));
    }
    Ok(candidates)
}

/// Rank cutoff (0-based, exclusive) for the top `percent`% of `entries`.
pub fn top_cutoff(entries: usize, percent: usize) -> usize {
    (entries * percent).div_ceil(100).max(1)
}

/// Everything a run needs, prepared once and shared by every batch.
pub struct Simulator<'a> {
    catalog: &'a PlayerCatalog,
    config: &'a SimulationConfig,
    model: ScoreModel,
    contest: Contest,
    candidates: Vec<Candidate>,
    field: Vec<Lineup>,
    optimal_fpts: f64,
}

impl<'a> Simulator<'a> {
    pub fn new(
        catalog: &'a PlayerCatalog,
        config: &'a SimulationConfig,
        model: ScoreModel,
        candidates: Vec<Candidate>,
        field: Vec<Lineup>,
        optimal_fpts: f64,
    ) -> Self {
        let contest = config.effective_contest(candidates.len());
        Simulator {
            catalog,
            config,
            model,
            contest,
            candidates,
            field,
            optimal_fpts,
        }
    }

    /// Solve the optimal lineup, generate the field, and factor the score
    /// model for `candidates`.
    pub fn prepare(
        catalog: &'a PlayerCatalog,
        config: &'a SimulationConfig,
        overrides: &CorrelationMap,
        candidates: Vec<Candidate>,
    ) -> Result<Self> {
        let model = ScoreModel::new(catalog, overrides, config);
        let optimal = gridiron_optimizer::best_lineup(catalog, config.salary_cap)?;
        let optimal_fpts = optimal.fpts(catalog);
        let field_size = config.effective_field_size(candidates.len());
        let field = FieldGenerator::new(catalog, config, optimal_fpts).generate(field_size)?;
        Ok(Simulator::new(catalog, config, model, candidates, field, optimal_fpts))
    }

    pub fn num_entries(&self) -> usize {
        self.candidates.len() + self.field.len()
    }

    fn entry(&self, e: usize) -> &Lineup {
        let c = self.candidates.len();
        if e < c {
            &self.candidates[e].lineup
        } else {
            &self.field[e - c]
        }
    }

    /// Run `draws` contests on the stream for `batch`.
    pub fn run_batch(&self, batch: usize, draws: usize, payouts: &[f64]) -> Tally {
        let num_candidates = self.candidates.len();
        let entries = self.num_entries();
        let top1 = top_cutoff(entries, 1);
        let top10 = top_cutoff(entries, 10);
        let fee = self.contest.entry_fee;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(batch as u64));
        let mut tally = Tally::new(num_candidates);
        let mut scores = vec![0.0; self.catalog.len()];
        let mut totals = vec![0.0; entries];
        let mut order: Vec<usize> = (0..entries).collect();

        for _ in 0..draws {
            self.model.draw(&mut rng, &mut scores);
            for (e, total) in totals.iter_mut().enumerate() {
                *total = self.entry(e).players().iter().map(|&p| scores[p]).sum();
            }
            // Ties go to the lower entry index; candidates come first.
            order.sort_unstable_by(|&a, &b| totals[b].total_cmp(&totals[a]).then(a.cmp(&b)));

            tally.draws += 1;
            if order[0] >= num_candidates {
                tally.field_wins += 1;
            }
            for (rank, &e) in order.iter().enumerate() {
                if e >= num_candidates {
                    continue;
                }
                if rank == 0 {
                    tally.wins[e] += 1;
                }
                if rank < top1 {
                    tally.top1[e] += 1;
                }
                if rank < top10 {
                    tally.top10[e] += 1;
                }
                let payout = payouts.get(rank).copied().unwrap_or(0.0);
                if payout > 0.0 {
                    tally.cash[e] += 1;
                }
                tally.profit[e] += payout - fee;
                tally.score[e] += totals[e];
                tally.max_score[e] = tally.max_score[e].max(totals[e]);
            }
        }
        tally
    }

    pub fn run(&self, cancel: &CancelFlag) -> Result<SimulationOutcome> {
        let total = self.config.num_simulations;
        let batch_size = self.config.batch_size;
        let num_batches = total.div_ceil(batch_size);
        let wave = rayon::current_num_threads().max(1);
        let payouts = self.contest.payout_table(self.num_entries());

        info!(
            "Simulating {} contests: {} candidates vs {} field lineups, {} batches",
            total,
            self.candidates.len(),
            self.field.len(),
            num_batches
        );

        let mut tally = Tally::new(self.candidates.len());
        let mut cancelled = false;
        let mut next = 0;
        while next < num_batches {
            if cancel.is_cancelled() {
                cancelled = true;
                warn!("Simulation cancelled after {} draws", tally.draws);
                break;
            }
            let end = (next + wave).min(num_batches);
            let parts: Vec<Tally> = (next..end)
                .into_par_iter()
                .map(|b| {
                    let draws = batch_size.min(total - b * batch_size);
                    self.run_batch(b, draws, &payouts)
                })
                .collect();
            for part in &parts {
                tally.merge(part);
            }
            next = end;
        }

        if tally.draws == 0 {
            return Err(Error::Cancelled);
        }

        let lineups = results::lineup_results(
            self.catalog,
            &self.candidates,
            &self.field,
            &tally,
            self.contest.entry_fee,
        );
        let players = results::player_records(self.catalog, &self.candidates, &self.field);
        let distinct: HashSet<&Lineup> = self.field.iter().collect();
        info!(
            "Simulation done: {} draws, field won {} ({} distinct field lineups)",
            tally.draws,
            tally.field_wins,
            distinct.len()
        );

        Ok(SimulationOutcome {
            lineups,
            players,
            num_simulations: tally.draws,
            requested_simulations: total,
            field_size: self.field.len(),
            field_wins: tally.field_wins,
            optimal_fpts: self.optimal_fpts,
            entry_fee: self.contest.entry_fee,
            cancelled,
        })
    }
}
