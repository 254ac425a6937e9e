// Correlated fantasy-score model.
//
// Players in the same game share a Gaussian copula: a correlation matrix
// built from position-pair defaults (plus per-player overrides) is Cholesky
// factorized once, and every draw maps independent normals through the
// factor. Games are independent of each other.

use std::collections::BTreeMap;

use gridiron_core::rules::{CorrelationMap, CorrelationTarget};
use gridiron_core::{PlayerCatalog, Position};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use crate::config::SimulationConfig;

/// Off-diagonals are scaled by this factor until the matrix factorizes.
const SHRINK: f64 = 0.9;
const MAX_SHRINK_STEPS: usize = 60;
const PIVOT_EPS: f64 = 1e-10;

/// Default correlation between two players in the same game.
pub fn default_coefficient(a: Position, b: Position, same_team: bool) -> f64 {
    use Position::*;
    let (a, b) = if a.sort_order() <= b.sort_order() { (a, b) } else { (b, a) };
    if same_team {
        match (a, b) {
            (Quarterback, RunningBack) => 0.10,
            (Quarterback, WideReceiver) => 0.60,
            (Quarterback, TightEnd) => 0.45,
            (RunningBack, RunningBack) => -0.15,
            (RunningBack, WideReceiver) | (RunningBack, TightEnd) => -0.05,
            (RunningBack, Defense) => 0.15,
            (WideReceiver, WideReceiver) => 0.05,
            (WideReceiver, TightEnd) => -0.05,
            (TightEnd, TightEnd) => -0.10,
            _ => 0.0,
        }
    } else {
        match (a, b) {
            (Quarterback, Quarterback) => 0.25,
            (Quarterback, RunningBack) => 0.05,
            (Quarterback, WideReceiver) => 0.20,
            (Quarterback, TightEnd) => 0.10,
            (Quarterback, Defense) => -0.50,
            (RunningBack, RunningBack) => -0.05,
            (RunningBack, WideReceiver) => 0.05,
            (RunningBack, Defense) => -0.25,
            (WideReceiver, WideReceiver) => 0.10,
            (WideReceiver, TightEnd) => 0.05,
            (WideReceiver, Defense) => -0.25,
            (TightEnd, Defense) => -0.20,
            (Defense, Defense) => -0.05,
            _ => 0.0,
        }
    }
}

/// Correlation matrix (row-major) for `players`, all from one game.
/// An override on either player for the other's position wins over the
/// default; the first player's override is checked first.
pub fn correlation_matrix(
    catalog: &PlayerCatalog,
    players: &[usize],
    overrides: &CorrelationMap,
) -> Vec<f64> {
    let n = players.len();
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
        let pi = catalog.player(players[i]);
        for j in (i + 1)..n {
            let pj = catalog.player(players[j]);
            let same_team = pi.team == pj.team;
            let toward_j = CorrelationTarget {
                position: pj.position,
                opponent: !same_team,
            };
            let toward_i = CorrelationTarget {
                position: pi.position,
                opponent: !same_team,
            };
            let rho = overrides
                .get(players[i], toward_j)
                .or_else(|| overrides.get(players[j], toward_i))
                .unwrap_or_else(|| default_coefficient(pi.position, pj.position, same_team));
            m[i * n + j] = rho;
            m[j * n + i] = rho;
        }
    }
    m
}

/// Lower-triangular Cholesky factor of a symmetric `n × n` matrix, or
/// `None` if it is not positive definite.
pub fn cholesky(m: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            if i == j {
                let d = m[i * n + i] - dot;
                if d <= PIVOT_EPS {
                    return None;
                }
                l[i * n + j] = d.sqrt();
            } else {
                l[i * n + j] = (m[i * n + j] - dot) / l[j * n + j];
            }
        }
    }
    Some(l)
}

/// Factorize, shrinking off-diagonals toward zero until the matrix is
/// positive definite. Falls back to independence.
fn factorize(mut m: Vec<f64>, n: usize, label: &str) -> Vec<f64> {
    for step in 0..MAX_SHRINK_STEPS {
        if let Some(l) = cholesky(&m, n) {
            if step > 0 {
                debug!("{}: correlations shrunk {} times to factorize", label, step);
            }
            return l;
        }
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    m[i * n + j] *= SHRINK;
                }
            }
        }
    }
    warn!("{}: correlation matrix never factorized; treating players as independent", label);
    let mut identity = vec![0.0; n * n];
    for i in 0..n {
        identity[i * n + i] = 1.0;
    }
    identity
}

struct GameBlock {
    players: Vec<usize>,
    factor: Vec<f64>,
}

/// Per-player mean and deviation plus per-game factors. Immutable once
/// built and shared by every simulation batch.
pub struct ScoreModel {
    mean: Vec<f64>,
    sigma: Vec<f64>,
    blocks: Vec<GameBlock>,
}

impl ScoreModel {
    pub fn new(catalog: &PlayerCatalog, overrides: &CorrelationMap, config: &SimulationConfig) -> Self {
        let mean: Vec<f64> = catalog.players().iter().map(|p| p.fpts).collect();
        let sigma: Vec<f64> = catalog
            .players()
            .iter()
            .map(|p| {
                let base = if p.std_dev > 0.0 {
                    p.std_dev
                } else {
                    p.fpts.abs() * config.default_var(p.position)
                };
                base * config.randomness
            })
            .collect();

        let mut games: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        let mut blocks = Vec::new();
        for (i, p) in catalog.players().iter().enumerate() {
            match p.matchup() {
                Some(m) => games.entry(m).or_default().push(i),
                None => blocks.push(GameBlock {
                    players: vec![i],
                    factor: vec![1.0],
                }),
            }
        }
        for (matchup, players) in games {
            let n = players.len();
            let factor = factorize(correlation_matrix(catalog, &players, overrides), n, matchup);
            blocks.push(GameBlock { players, factor });
        }

        ScoreModel {
            mean,
            sigma,
            blocks,
        }
    }

    pub fn num_players(&self) -> usize {
        self.mean.len()
    }

    /// Realize one score per catalog player into `scores`.
    pub fn draw<R: Rng>(&self, rng: &mut R, scores: &mut [f64]) {
        let mut z: Vec<f64> = Vec::new();
        for block in &self.blocks {
            let n = block.players.len();
            z.clear();
            z.extend((0..n).map(|_| rng.sample::<f64, _>(StandardNormal)));
            for (i, &p) in block.players.iter().enumerate() {
                let row = &block.factor[i * n..i * n + i + 1];
                let c: f64 = row.iter().zip(&z).map(|(l, z)| l * z).sum();
                scores[p] = self.mean[p] + self.sigma[p] * c;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridiron_core::{Player, PlayerId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn player(id: u64, team: &str, position: Position, fpts: f64, std_dev: f64) -> Player {
        Player {
            id: PlayerId(id),
            name: format!("P{id}"),
            team: team.into(),
            position,
            salary: 5000,
            fpts,
            game_info: "PHI@DAL 10/27/2024 04:25PM ET".into(),
            ownership: 0.0,
            std_dev,
            ceiling: 0.0,
        }
    }

    fn catalog() -> PlayerCatalog {
        PlayerCatalog::new(vec![
            player(1, "PHI", Position::Quarterback, 20.0, 6.0),
            player(2, "PHI", Position::WideReceiver, 15.0, 5.0),
            player(3, "DAL", Position::Defense, 6.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn defaults_are_symmetric() {
        for a in Position::ALL {
            for b in Position::ALL {
                for same in [true, false] {
                    assert_eq!(default_coefficient(a, b, same), default_coefficient(b, a, same));
                }
            }
        }
        assert_eq!(
            default_coefficient(Position::Quarterback, Position::Defense, false),
            -0.5
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let cat = catalog();
        let mut overrides = CorrelationMap::default();
        overrides.insert(
            0,
            CorrelationTarget {
                position: Position::WideReceiver,
                opponent: false,
            },
            0.9,
        );
        let m = correlation_matrix(&cat, &[0, 1, 2], &overrides);
        assert_eq!(m[1], 0.9);
        assert_eq!(m[3], 0.9);
        assert_eq!(m[2], -0.5);
    }

    #[test]
    fn cholesky_reconstructs_matrix() {
        let m = vec![1.0, 0.6, 0.2, 0.6, 1.0, 0.3, 0.2, 0.3, 1.0];
        let l = cholesky(&m, 3).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| l[i * 3 + k] * l[j * 3 + k]).sum();
                assert!((v - m[i * 3 + j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn indefinite_matrix_is_shrunk_until_it_factors() {
        // Three players pairwise correlated at -0.9 cannot all hold.
        let m = vec![1.0, -0.9, -0.9, -0.9, 1.0, -0.9, -0.9, -0.9, 1.0];
        assert!(cholesky(&m, 3).is_none());
        let l = factorize(m, 3, "test");
        assert!(l[0] > 0.0 && l[4] > 0.0 && l[8] > 0.0);
    }

    #[test]
    fn draws_are_correlated_and_seeded() {
        let cat = catalog();
        let config = SimulationConfig::default();
        let model = ScoreModel::new(&cat, &CorrelationMap::default(), &config);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut scores = vec![0.0; 3];
        let n = 20_000;
        let (mut sq, mut sw, mut sqw, mut sqq, mut sww) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for _ in 0..n {
            model.draw(&mut rng, &mut scores);
            let (q, w) = (scores[0] - 20.0, scores[1] - 15.0);
            sq += q;
            sw += w;
            sqw += q * w;
            sqq += q * q;
            sww += w * w;
        }
        let nf = n as f64;
        let cov = sqw / nf - (sq / nf) * (sw / nf);
        let rho = cov / ((sqq / nf).sqrt() * (sww / nf).sqrt());
        assert!((rho - 0.6).abs() < 0.05, "rho {rho}");
        assert!((sq / nf).abs() < 0.2);

        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let (mut x, mut y) = (vec![0.0; 3], vec![0.0; 3]);
        model.draw(&mut a, &mut x);
        model.draw(&mut b, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn zero_randomness_is_deterministic() {
        let cat = catalog();
        let config = SimulationConfig {
            randomness: 0.0,
            ..SimulationConfig::default()
        };
        let model = ScoreModel::new(&cat, &CorrelationMap::default(), &config);
        let mut scores = vec![0.0; 3];
        model.draw(&mut ChaCha8Rng::seed_from_u64(1), &mut scores);
        assert_eq!(scores, vec![20.0, 15.0, 6.0]);
    }
}
