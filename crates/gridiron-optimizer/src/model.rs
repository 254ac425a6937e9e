// Compile a catalog, validated rules, and optimizer settings into the
// linear constraints every solve shares.
//
// One binary variable per pool player. The pool is the catalog minus
// non-DST players below the projection minimum (rules can pull them back).

use std::collections::HashMap;

use gridiron_core::rules::{team_offense, ResolvedRule};
use gridiron_core::{Error, Lineup, PlayerCatalog, Position, Relation, Result, ValidatedRules, ROSTER_SIZE};
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::solver::{ConstraintSense, LineupProblem, LinearConstraint};

/// Big-M for indicator-style constraints: a lineup never holds more than
/// nine players, so nine relaxes any count row.
const BIG_M: f64 = ROSTER_SIZE as f64;

/// The compiled constraint set plus the variable <-> catalog mapping.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pool: Vec<usize>,
    var_of: HashMap<usize, usize>,
    constraints: Vec<LinearConstraint>,
    infeasible: Option<String>,
}

struct Builder<'a> {
    var_of: &'a HashMap<usize, usize>,
    constraints: Vec<LinearConstraint>,
    infeasible: Option<String>,
}

impl Builder<'_> {
    /// Map catalog indices to variables, dropping players outside the pool.
    fn vars(&self, players: impl IntoIterator<Item = usize>) -> Vec<usize> {
        players
            .into_iter()
            .filter_map(|p| self.var_of.get(&p).copied())
            .collect()
    }

    /// Add a constraint. Rows whose variables all fell out of the pool are
    /// checked as constants instead.
    fn push(&mut self, what: &str, constraint: LinearConstraint) {
        if !constraint.terms.is_empty() {
            self.constraints.push(constraint);
            return;
        }
        let holds = match constraint.sense {
            ConstraintSense::LessEqual => 0.0 <= constraint.rhs,
            ConstraintSense::GreaterEqual => 0.0 >= constraint.rhs,
            ConstraintSense::Equal => constraint.rhs == 0.0,
        };
        if !holds && self.infeasible.is_none() {
            self.infeasible = Some(format!("{what} cannot be met by any eligible player"));
        }
    }

    fn count_range(&mut self, what: &str, vars: Vec<usize>, min: usize, max: usize) {
        if min == max {
            self.push(what, LinearConstraint::eq(LinearConstraint::count(vars), min as f64));
            return;
        }
        self.push(
            what,
            LinearConstraint::geq(LinearConstraint::count(vars.clone()), min as f64),
        );
        self.push(what, LinearConstraint::leq(LinearConstraint::count(vars), max as f64));
    }
}

impl CompiledModel {
    pub fn compile(
        catalog: &PlayerCatalog,
        rules: &ValidatedRules,
        config: &OptimizerConfig,
    ) -> Result<Self> {
        let required = rules.required_players();
        let pool: Vec<usize> = catalog
            .players()
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                p.position == Position::Defense
                    || p.fpts >= config.projection_minimum
                    || required.contains(i)
            })
            .map(|(i, _)| i)
            .collect();
        if pool.is_empty() {
            return Err(Error::NoFeasibleLineup);
        }
        let var_of: HashMap<usize, usize> = pool.iter().enumerate().map(|(v, &p)| (p, v)).collect();

        let mut b = Builder {
            var_of: &var_of,
            constraints: Vec::new(),
            infeasible: None,
        };

        // --- Salary ---
        let salaries: Vec<(usize, f64)> = pool
            .iter()
            .enumerate()
            .map(|(v, &p)| (v, catalog.player(p).salary as f64))
            .collect();
        b.push(
            "salary cap",
            LinearConstraint::leq(salaries.clone(), config.salary_cap as f64),
        );
        b.push(
            "minimum salary",
            LinearConstraint::geq(salaries, config.min_salary as f64),
        );

        // --- Roster shape ---
        b.push(
            "roster size",
            LinearConstraint::eq(LinearConstraint::count(0..pool.len()), ROSTER_SIZE as f64),
        );
        let te_max = if config.use_double_te { 2 } else { 1 };
        let slots = [
            (Position::Quarterback, 1, 1),
            (Position::RunningBack, 2, 3),
            (Position::WideReceiver, 3, 4),
            (Position::TightEnd, 1, te_max),
            (Position::Defense, 1, 1),
        ];
        for (pos, min, max) in slots {
            let vars = b.vars(catalog.indices_at(pos));
            b.count_range(pos.display_str(), vars, min, max);
        }

        // --- Global team limit ---
        if let Some(limit) = config.global_team_limit {
            for team in catalog.teams() {
                let vars = b.vars(team_offense(catalog, team));
                b.push(
                    "global team limit",
                    LinearConstraint::leq(LinearConstraint::count(vars), limit as f64),
                );
            }
        }

        // --- QB vs opposing DST ---
        let qbs = b.vars(catalog.indices_at(Position::Quarterback));
        let dsts = b.vars(catalog.indices_at(Position::Defense));
        if !config.allow_qb_vs_dst {
            for &q in &qbs {
                for &d in &dsts {
                    if catalog.related(Relation::OppTeam, pool[q], pool[d]) {
                        b.push("qb vs dst", LinearConstraint::leq(vec![(q, 1.0), (d, 1.0)], 1.0));
                    }
                }
            }
        }

        // --- Offense facing the lineup's own DST ---
        if let Some(max_vs) = config.num_players_vs_def {
            let offense_slots = (ROSTER_SIZE - 1) as f64;
            for &d in &dsts {
                let mut terms: Vec<(usize, f64)> = (0..pool.len())
                    .filter(|&v| {
                        catalog.player(pool[v]).position != Position::Defense
                            && catalog.related(Relation::OppTeam, pool[d], pool[v])
                    })
                    .map(|v| (v, 1.0))
                    .collect();
                if terms.is_empty() {
                    continue;
                }
                terms.push((d, offense_slots));
                b.push(
                    "players vs def",
                    LinearConstraint::leq(terms, max_vs as f64 + offense_slots),
                );
            }
        }

        // --- User rules ---
        for rule in &rules.rules {
            match rule {
                ResolvedRule::AtLeast { count, .. } => {
                    let vars = b.vars(rule.members(catalog));
                    b.push("at_least", LinearConstraint::geq(LinearConstraint::count(vars), *count as f64));
                }
                ResolvedRule::AtMost { count, .. } => {
                    let vars = b.vars(rule.members(catalog));
                    b.push("at_most", LinearConstraint::leq(LinearConstraint::count(vars), *count as f64));
                }
                ResolvedRule::TeamLimit { max, .. } | ResolvedRule::MatchupLimit { max, .. } => {
                    let vars = b.vars(rule.members(catalog));
                    b.push("limit", LinearConstraint::leq(LinearConstraint::count(vars), *max as f64));
                }
                ResolvedRule::MatchupAtLeast { matchup, min } => {
                    let vars = b.vars(rule.members(catalog));
                    let what = format!("matchup at-least {matchup}");
                    b.push(&what, LinearConstraint::geq(LinearConstraint::count(vars), *min as f64));
                }
                ResolvedRule::PairStack { count, .. } => {
                    for (key, partners) in rule.pair_anchors(catalog) {
                        let Some(&k) = var_of.get(&key) else {
                            continue;
                        };
                        let mut terms = LinearConstraint::count(b.vars(partners));
                        terms.push((k, -(*count as f64)));
                        b.push("pair stack", LinearConstraint::geq(terms, 0.0));
                    }
                }
                ResolvedRule::LimitStack { count, .. } => {
                    for group in rule.limit_groups(catalog) {
                        let mut terms = LinearConstraint::count(b.vars(group.members));
                        if terms.len() <= *count {
                            continue;
                        }
                        terms.extend(b.vars(group.unless).into_iter().map(|v| (v, -BIG_M)));
                        b.push("limit stack", LinearConstraint::leq(terms, *count as f64));
                    }
                }
            }
        }

        let Builder {
            constraints,
            infeasible,
            ..
        } = b;

        info!(
            "Compiled {} constraints over {} of {} players",
            constraints.len(),
            pool.len(),
            catalog.len()
        );
        if let Some(reason) = &infeasible {
            debug!("model is infeasible before solving: {}", reason);
        }

        Ok(CompiledModel {
            pool,
            var_of,
            constraints,
            infeasible,
        })
    }

    pub fn num_vars(&self) -> usize {
        self.pool.len()
    }

    /// Catalog indices of the pool, in variable order.
    pub fn pool(&self) -> &[usize] {
        &self.pool
    }

    pub fn var_of(&self, player: usize) -> Option<usize> {
        self.var_of.get(&player).copied()
    }

    /// Why no lineup can exist, when that is known without solving.
    pub fn infeasible_reason(&self) -> Option<&str> {
        self.infeasible.as_deref()
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Build one solve: the shared constraints plus a uniqueness row per
    /// accepted lineup allowing at most `max_shared` repeated players. A
    /// full roster's worth of sharing adds no rows.
    pub fn problem(&self, objective: Vec<f64>, accepted: &[Lineup], max_shared: usize) -> LineupProblem {
        let mut constraints = self.constraints.clone();
        let limited = if max_shared < ROSTER_SIZE { accepted } else { &[] };
        for lineup in limited {
            let vars: Vec<usize> = lineup.players().iter().filter_map(|&p| self.var_of(p)).collect();
            constraints.push(LinearConstraint::leq(LinearConstraint::count(vars), max_shared as f64));
        }
        LineupProblem {
            objective,
            constraints,
        }
    }

    /// Map a solver selection back to catalog indices.
    pub fn selection_to_players(&self, selected: &[usize]) -> Vec<usize> {
        selected.iter().filter_map(|&v| self.pool.get(v).copied()).collect()
    }
}
