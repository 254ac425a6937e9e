// Descriptive statistics over a lineup pool.
//
// Exposure, stacking, and matchup breakdowns for a set of optimizer
// lineups, in the shape the stats dashboard consumes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::catalog::PlayerCatalog;
use crate::lineup::{Lineup, Slot};
use crate::player::{PlayerId, Position};

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Summary statistics for a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute mean, population standard deviation, min and max.
///
/// Returns all zeros for an empty slice.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

// ---------------------------------------------------------------------------
// Lineup pool breakdowns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlayerExposure {
    pub id: PlayerId,
    pub name: String,
    pub team: String,
    pub position: Position,
    pub salary: u32,
    pub exposures: usize,
    /// Percent of lineups containing the player.
    pub exposure_rate: f64,
    /// Mean projection of the lineups the player appears in.
    pub avg_lineup_fpts: f64,
    pub ownership: f64,
    /// `exposure_rate - ownership`, both in percent.
    pub leverage: f64,
    pub positions_used: BTreeSet<Slot>,
    pub top_lineup_appearances: usize,
    /// Percent of the player's lineups that are in the top 10% of the pool.
    pub top_lineup_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlexDistribution {
    #[serde(rename = "RB")]
    pub rb: usize,
    #[serde(rename = "WR")]
    pub wr: usize,
    #[serde(rename = "TE")]
    pub te: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamStackStats {
    pub team: String,
    /// Lineups whose QB plays for this team.
    pub lineups: usize,
    pub stack_patterns: BTreeMap<String, usize>,
    pub avg_salary: f64,
    pub avg_fpts: f64,
    /// Patterns sorted by frequency.
    pub common_stacks: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerPair {
    pub player1: String,
    pub player2: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchupStats {
    pub matchup: String,
    /// Lineups whose QB plays in this game.
    pub lineups: usize,
    pub avg_fpts: f64,
    /// Up to ten most frequent non-DST player pairs in those lineups.
    pub common_pairs: Vec<PlayerPair>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_lineups: usize,
    pub salary: PoolStats,
    pub fpts: PoolStats,
    /// Stack label -> percent of lineups.
    pub stack_distribution: BTreeMap<String, f64>,
    /// Total projected points per salary dollar.
    pub salary_efficiency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineupPoolStats {
    pub players: Vec<PlayerExposure>,
    pub flex_distribution: FlexDistribution,
    pub teams: Vec<TeamStackStats>,
    pub matchups: Vec<MatchupStats>,
    pub summary: SummaryStats,
}

const TOP_PAIRS: usize = 10;

/// Break down a lineup pool. `lineups` is expected in optimizer order
/// (best first); the first 10% count as top lineups.
pub fn compute_lineup_stats(catalog: &PlayerCatalog, lineups: &[Lineup]) -> LineupPoolStats {
    let total = lineups.len();
    let top_cutoff = total as f64 * 0.1;

    struct Acc {
        exposures: usize,
        total_fpts: f64,
        positions: BTreeSet<Slot>,
        top: usize,
    }
    let mut players: HashMap<usize, Acc> = HashMap::new();
    let mut flex = FlexDistribution::default();
    let mut teams: BTreeMap<String, (usize, BTreeMap<String, usize>, f64, f64)> = BTreeMap::new();
    let mut games: BTreeMap<String, (usize, f64, HashMap<(String, String), usize>)> = BTreeMap::new();
    let mut stack_counts: BTreeMap<String, usize> = BTreeMap::new();

    let mut salaries = Vec::with_capacity(total);
    let mut projections = Vec::with_capacity(total);

    for (i, lineup) in lineups.iter().enumerate() {
        let fpts = lineup.fpts(catalog);
        let salary = lineup.salary(catalog);
        let is_top = (i as f64) < top_cutoff;
        salaries.push(salary as f64);
        projections.push(fpts);

        for (slot, idx) in lineup.slots() {
            let acc = players.entry(idx).or_insert(Acc {
                exposures: 0,
                total_fpts: 0.0,
                positions: BTreeSet::new(),
                top: 0,
            });
            acc.exposures += 1;
            acc.total_fpts += fpts;
            acc.positions.insert(slot);
            if is_top {
                acc.top += 1;
            }
            if slot == Slot::Flex {
                match catalog.player(idx).position {
                    Position::RunningBack => flex.rb += 1,
                    Position::WideReceiver => flex.wr += 1,
                    Position::TightEnd => flex.te += 1,
                    _ => {}
                }
            }
        }

        let label = lineup.stack_label(catalog);
        *stack_counts.entry(label.clone()).or_default() += 1;

        let qb = catalog.player(lineup.qb());
        let team = teams
            .entry(qb.team.clone())
            .or_insert_with(|| (0, BTreeMap::new(), 0.0, 0.0));
        team.0 += 1;
        *team.1.entry(label).or_default() += 1;
        team.2 += salary as f64;
        team.3 += fpts;

        if let Some(matchup) = qb.matchup() {
            let game = games
                .entry(matchup.to_string())
                .or_insert_with(|| (0, 0.0, HashMap::new()));
            game.0 += 1;
            game.1 += fpts;
            let names: Vec<&str> = lineup
                .slots()
                .filter(|(slot, _)| *slot != Slot::Dst)
                .map(|(_, idx)| catalog.player(idx).name.as_str())
                .collect();
            for a in 0..names.len() {
                for b in (a + 1)..names.len() {
                    let (x, y) = if names[a] <= names[b] {
                        (names[a], names[b])
                    } else {
                        (names[b], names[a])
                    };
                    *game.2.entry((x.to_string(), y.to_string())).or_default() += 1;
                }
            }
        }
    }

    let pct = |n: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 / total as f64 * 100.0
        }
    };

    let mut exposures: Vec<PlayerExposure> = players
        .into_iter()
        .map(|(idx, acc)| {
            let p = catalog.player(idx);
            let exposure_rate = pct(acc.exposures);
            PlayerExposure {
                id: p.id,
                name: p.name.clone(),
                team: p.team.clone(),
                position: p.position,
                salary: p.salary,
                exposures: acc.exposures,
                exposure_rate,
                avg_lineup_fpts: acc.total_fpts / acc.exposures as f64,
                ownership: p.ownership,
                leverage: exposure_rate - p.ownership,
                positions_used: acc.positions,
                top_lineup_appearances: acc.top,
                top_lineup_rate: acc.top as f64 / acc.exposures as f64 * 100.0,
            }
        })
        .collect();
    exposures.sort_by(|a, b| b.exposures.cmp(&a.exposures).then_with(|| a.name.cmp(&b.name)));

    let teams: Vec<TeamStackStats> = teams
        .into_iter()
        .map(|(team, (n, patterns, salary, fpts))| {
            let mut common: Vec<(String, usize)> =
                patterns.iter().map(|(k, v)| (k.clone(), *v)).collect();
            common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            TeamStackStats {
                team,
                lineups: n,
                stack_patterns: patterns,
                avg_salary: salary / n as f64,
                avg_fpts: fpts / n as f64,
                common_stacks: common,
            }
        })
        .collect();

    let matchups: Vec<MatchupStats> = games
        .into_iter()
        .map(|(matchup, (n, fpts, pairs))| {
            let mut common: Vec<PlayerPair> = pairs
                .into_iter()
                .map(|((player1, player2), count)| PlayerPair {
                    player1,
                    player2,
                    count,
                })
                .collect();
            common.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.player1.cmp(&b.player1))
                    .then_with(|| a.player2.cmp(&b.player2))
            });
            common.truncate(TOP_PAIRS);
            MatchupStats {
                matchup,
                lineups: n,
                avg_fpts: fpts / n as f64,
                common_pairs: common,
            }
        })
        .collect();

    let total_salary: f64 = salaries.iter().sum();
    let summary = SummaryStats {
        total_lineups: total,
        salary: compute_pool_stats(&salaries),
        fpts: compute_pool_stats(&projections),
        stack_distribution: stack_counts.into_iter().map(|(k, v)| (k, pct(v))).collect(),
        salary_efficiency: if total_salary > 0.0 {
            projections.iter().sum::<f64>() / total_salary
        } else {
            0.0
        },
    };

    LineupPoolStats {
        players: exposures,
        flex_distribution: flex,
        teams,
        matchups,
        summary,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
