// Simulation tallies and the aggregated per-lineup / per-player results.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use gridiron_core::{Lineup, PlayerCatalog, PlayerId, Position};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Where a simulated lineup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineupKind {
    Optimizer,
    Custom,
}

impl fmt::Display for LineupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineupKind::Optimizer => write!(f, "Optimizer"),
            LineupKind::Custom => write!(f, "Custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub lineup: Lineup,
    pub kind: LineupKind,
}

// ---------------------------------------------------------------------------
// Tallies
// ---------------------------------------------------------------------------

/// Raw counters for the candidates over some number of draws. Batches
/// produce one each; they are merged in batch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub draws: u64,
    pub wins: Vec<u64>,
    pub top1: Vec<u64>,
    pub top10: Vec<u64>,
    pub cash: Vec<u64>,
    pub profit: Vec<f64>,
    pub score: Vec<f64>,
    /// Highest total each candidate reached in any draw.
    pub max_score: Vec<f64>,
    /// Draws won by a field lineup.
    pub field_wins: u64,
}

impl Tally {
    pub fn new(candidates: usize) -> Self {
        Tally {
            draws: 0,
            wins: vec![0; candidates],
            top1: vec![0; candidates],
            top10: vec![0; candidates],
            cash: vec![0; candidates],
            profit: vec![0.0; candidates],
            score: vec![0.0; candidates],
            max_score: vec![f64::NEG_INFINITY; candidates],
            field_wins: 0,
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.draws += other.draws;
        self.field_wins += other.field_wins;
        let add = |a: &mut [u64], b: &[u64]| a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
        add(&mut self.wins, &other.wins);
        add(&mut self.top1, &other.top1);
        add(&mut self.top10, &other.top10);
        add(&mut self.cash, &other.cash);
        self.profit
            .iter_mut()
            .zip(&other.profit)
            .for_each(|(x, y)| *x += y);
        self.score
            .iter_mut()
            .zip(&other.score)
            .for_each(|(x, y)| *x += y);
        self.max_score
            .iter_mut()
            .zip(&other.max_score)
            .for_each(|(x, y)| *x = x.max(*y));
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LineupResult {
    pub lineup: Lineup,
    pub kind: LineupKind,
    pub wins: u64,
    pub top1: u64,
    pub top10: u64,
    pub cash: u64,
    pub win_rate: f64,
    pub top1_rate: f64,
    pub top10_rate: f64,
    pub cash_rate: f64,
    pub avg_score: f64,
    /// Mean profit per draw, in dollars.
    pub roi: f64,
    /// Mean profit per draw as a percentage of the entry fee.
    pub roi_pct: f64,
    pub fpts: f64,
    /// Highest simulated score.
    pub ceiling: f64,
    pub salary: u32,
    pub ownership_sum: f64,
    pub stack: String,
    pub stack1: String,
    pub stack2: String,
    /// Field lineups identical to this one.
    pub field_duplicates: usize,
}

/// Per-player exposure across candidates and field. Percentages throughout.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRecord {
    #[serde(rename = "ID")]
    pub id: PlayerId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Position")]
    pub position: Position,
    #[serde(rename = "Salary")]
    pub salary: u32,
    #[serde(rename = "Fpts")]
    pub fpts: f64,
    #[serde(rename = "Ownership")]
    pub ownership: f64,
    #[serde(rename = "Exposure")]
    pub exposure: f64,
    #[serde(rename = "FieldExposure")]
    pub field_exposure: f64,
    /// Candidate exposure minus projected ownership.
    #[serde(rename = "Leverage")]
    pub leverage: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// Most wins first.
    pub lineups: Vec<LineupResult>,
    pub players: BTreeMap<PlayerId, PlayerRecord>,
    /// Draws actually completed.
    pub num_simulations: u64,
    pub requested_simulations: usize,
    pub field_size: usize,
    pub field_wins: u64,
    pub optimal_fpts: f64,
    pub entry_fee: f64,
    pub cancelled: bool,
}

fn rate(count: u64, draws: u64) -> f64 {
    if draws == 0 {
        0.0
    } else {
        count as f64 / draws as f64
    }
}

pub fn lineup_results(
    catalog: &PlayerCatalog,
    candidates: &[Candidate],
    field: &[Lineup],
    tally: &Tally,
    entry_fee: f64,
) -> Vec<LineupResult> {
    let mut field_counts: HashMap<&Lineup, usize> = HashMap::new();
    for lineup in field {
        *field_counts.entry(lineup).or_default() += 1;
    }

    let draws = tally.draws;
    let mut results: Vec<LineupResult> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let roi = if draws == 0 { 0.0 } else { tally.profit[i] / draws as f64 };
            let (stack1, stack2) = c.lineup.team_stacks(catalog);
            LineupResult {
                lineup: c.lineup,
                kind: c.kind,
                wins: tally.wins[i],
                top1: tally.top1[i],
                top10: tally.top10[i],
                cash: tally.cash[i],
                win_rate: rate(tally.wins[i], draws),
                top1_rate: rate(tally.top1[i], draws),
                top10_rate: rate(tally.top10[i], draws),
                cash_rate: rate(tally.cash[i], draws),
                avg_score: if draws == 0 { 0.0 } else { tally.score[i] / draws as f64 },
                roi,
                roi_pct: if entry_fee > 0.0 { roi / entry_fee * 100.0 } else { 0.0 },
                fpts: c.lineup.fpts(catalog),
                ceiling: if draws == 0 { 0.0 } else { tally.max_score[i] },
                salary: c.lineup.salary(catalog),
                ownership_sum: c.lineup.ownership_sum(catalog),
                stack: c.lineup.stack_label(catalog),
                stack1,
                stack2,
                field_duplicates: field_counts.get(&c.lineup).copied().unwrap_or(0),
            }
        })
        .collect();

    results.sort_by(|a, b| b.wins.cmp(&a.wins).then(b.roi.total_cmp(&a.roi)));
    results
}

/// Exposure records for every player used by a candidate or field lineup.
pub fn player_records(
    catalog: &PlayerCatalog,
    candidates: &[Candidate],
    field: &[Lineup],
) -> BTreeMap<PlayerId, PlayerRecord> {
    let mut in_candidates = vec![0usize; catalog.len()];
    let mut in_field = vec![0usize; catalog.len()];
    for c in candidates {
        c.lineup.players().iter().for_each(|&p| in_candidates[p] += 1);
    }
    for lineup in field {
        lineup.players().iter().for_each(|&p| in_field[p] += 1);
    }

    let pct = |count: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        }
    };

    catalog
        .players()
        .iter()
        .enumerate()
        .filter(|(i, _)| in_candidates[*i] > 0 || in_field[*i] > 0)
        .map(|(i, p)| {
            let exposure = pct(in_candidates[i], candidates.len());
            let record = PlayerRecord {
                id: p.id,
                name: p.name.clone(),
                team: p.team.clone(),
                position: p.position,
                salary: p.salary,
                fpts: p.fpts,
                ownership: p.ownership,
                exposure,
                field_exposure: pct(in_field[i], field.len()),
                leverage: exposure - p.ownership,
            };
            (p.id, record)
        })
        .collect()
}
