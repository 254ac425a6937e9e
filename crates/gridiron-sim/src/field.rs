// Opposing-field generation.
//
// Field lineups are drawn slot by slot, weighting players by projected
// ownership. A share of the field is forced to stack its QB with one or two
// pass catchers. Lineups under the salary floor or too far below the
// optimal projection are redrawn.

use std::collections::HashMap;

use gridiron_core::lineup::Roster;
use gridiron_core::{Error, Lineup, PlayerCatalog, Position, Result};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::SimulationConfig;

/// Mixed into the run seed so field lineups and score batches never share
/// an RNG stream.
const FIELD_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

pub struct FieldGenerator<'a> {
    catalog: &'a PlayerCatalog,
    config: &'a SimulationConfig,
    min_fpts: f64,
    cheapest: u32,
    /// Stack partners (WR/TE) by team.
    pass_catchers: HashMap<&'a str, Vec<usize>>,
}

/// Pick one of `candidates`, weighted by ownership; uniform when nobody in
/// the set carries ownership.
fn pick<R: Rng>(rng: &mut R, catalog: &PlayerCatalog, candidates: &[usize]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let weights = candidates.iter().map(|&p| catalog.player(p).ownership.max(0.0));
    match WeightedIndex::new(weights) {
        Ok(dist) => Some(candidates[dist.sample(rng)]),
        Err(_) => candidates.choose(rng).copied(),
    }
}

impl<'a> FieldGenerator<'a> {
    /// `optimal_fpts` is the projection of the best legal lineup; field
    /// lineups must reach `(1 - max_pct_off_optimal)` of it.
    pub fn new(catalog: &'a PlayerCatalog, config: &'a SimulationConfig, optimal_fpts: f64) -> Self {
        let mut pass_catchers: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, p) in catalog.players().iter().enumerate() {
            if matches!(p.position, Position::WideReceiver | Position::TightEnd) {
                pass_catchers.entry(p.team.as_str()).or_default().push(i);
            }
        }
        let cheapest = catalog.players().iter().map(|p| p.salary).min().unwrap_or(0);
        FieldGenerator {
            catalog,
            config,
            min_fpts: (1.0 - config.max_pct_off_optimal) * optimal_fpts,
            cheapest,
            pass_catchers,
        }
    }

    pub fn min_fpts(&self) -> f64 {
        self.min_fpts
    }

    /// Generate `count` field lineups. Lineup `i` uses its own seeded RNG,
    /// so the field is the same however the work is scheduled.
    pub fn generate(&self, count: usize) -> Result<Vec<Lineup>> {
        let field: Vec<Lineup> = (0..count)
            .into_par_iter()
            .map(|i| self.generate_one(i))
            .collect::<Result<_>>()?;
        info!(
            "Generated {} field lineups (min projection {:.2}, min salary {})",
            field.len(),
            self.min_fpts,
            self.config.min_field_salary
        );
        Ok(field)
    }

    fn generate_one(&self, index: usize) -> Result<Lineup> {
        let seed = (self.config.seed ^ FIELD_SEED_SALT).wrapping_add(index as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let stack = if rng.gen::<f64>() < self.config.pct_field_using_stacks {
            if rng.gen::<f64>() < self.config.pct_field_double_stacks {
                2
            } else {
                1
            }
        } else {
            0
        };

        for attempt in 0..self.config.field_retry_budget {
            if let Some(lineup) = self.build(&mut rng, stack) {
                if attempt > 50 {
                    debug!("field lineup {} took {} attempts", index, attempt + 1);
                }
                return Ok(lineup);
            }
        }
        Err(Error::FieldGeneration(format!(
            "field lineup {index} ({stack}-player stack): no lineup with salary >= {} and \
             projection >= {:.2} in {} attempts",
            self.config.min_field_salary, self.min_fpts, self.config.field_retry_budget
        )))
    }

    /// One attempt. `None` when the draw dead-ends or misses a floor.
    pub fn build<R: Rng>(&self, rng: &mut R, stack: usize) -> Option<Lineup> {
        let catalog = self.catalog;
        let cap = self.config.salary_cap;
        let mut roster = Roster::new();
        let mut salary: u32 = 0;

        let budget = |salary: u32, open_after: usize| {
            cap.saturating_sub(salary)
                .saturating_sub(self.cheapest.saturating_mul(open_after as u32))
        };

        // QB first, then its stack partners.
        let qbs: Vec<usize> = catalog
            .indices_at(Position::Quarterback)
            .filter(|&p| catalog.player(p).salary <= budget(0, 8))
            .collect();
        let qb = pick(rng, catalog, &qbs)?;
        roster.add_player(qb, Position::Quarterback);
        salary += catalog.player(qb).salary;

        let qb_team = catalog.player(qb).team.as_str();
        let mut partners: Vec<usize> = self.pass_catchers.get(qb_team).cloned().unwrap_or_default();
        // A team with too few pass catchers gets the largest stack it can.
        for _ in 0..stack.min(partners.len()) {
            let open = open_slots(&roster);
            partners.retain(|&p| {
                let player = catalog.player(p);
                !roster.contains(p)
                    && roster.has_room_for(player.position)
                    && player.salary <= budget(salary, open - 1)
            });
            let partner = pick(rng, catalog, &partners)?;
            let pos = catalog.player(partner).position;
            roster.add_player(partner, pos);
            salary += catalog.player(partner).salary;
        }

        // Remaining slots in roster order; FLEX comes after every dedicated
        // RB/WR/TE slot.
        for k in 0..roster.slots.len() {
            if roster.slots[k].player.is_some() {
                continue;
            }
            let slot = roster.slots[k].slot;
            let open_after = open_slots(&roster) - 1;
            let limit = budget(salary, open_after);
            let candidates: Vec<usize> = catalog
                .players()
                .iter()
                .enumerate()
                .filter(|(i, p)| slot.accepts(p.position) && p.salary <= limit && !roster.contains(*i))
                .map(|(i, _)| i)
                .collect();
            let chosen = pick(rng, catalog, &candidates)?;
            roster.slots[k].player = Some(chosen);
            salary += catalog.player(chosen).salary;
        }

        let lineup = roster.into_lineup()?;
        let lineup = Lineup::from_players(catalog, lineup.players())?;
        let total = lineup.salary(catalog);
        if total > cap || total < self.config.min_field_salary {
            return None;
        }
        if lineup.fpts(catalog) < self.min_fpts {
            return None;
        }
        Some(lineup)
    }
}

fn open_slots(roster: &Roster) -> usize {
    roster.slots.len() - roster.filled_count()
}
