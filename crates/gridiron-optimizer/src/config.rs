// Optimizer run configuration.

use gridiron_core::lenient;
use gridiron_core::{Error, Result, RuleConfig, DK_SALARY_CAP, ROSTER_SIZE};
use serde::{Deserialize, Serialize};

/// Everything one optimizer run needs besides the catalog. Numeric fields
/// accept numbers or numeric strings, as the config form posts both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    #[serde(deserialize_with = "lenient::number")]
    pub num_lineups: usize,
    #[serde(deserialize_with = "lenient::number")]
    pub min_salary: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub salary_cap: u32,
    /// Max non-DST players from any one team.
    #[serde(deserialize_with = "lenient::option_number")]
    pub global_team_limit: Option<usize>,
    /// Non-DST players projected below this are dropped from the pool.
    #[serde(deserialize_with = "lenient::number")]
    pub projection_minimum: f64,
    /// Minimum number of players each lineup must differ from every other.
    /// 0 disables the constraint; identical lineups are still dropped.
    #[serde(deserialize_with = "lenient::number")]
    pub num_uniques: usize,
    /// Projection noise scale in `[0, 1]`; 0 means deterministic solves.
    #[serde(deserialize_with = "lenient::number")]
    pub randomness: f64,
    pub allow_qb_vs_dst: bool,
    pub use_double_te: bool,
    /// Max offensive players facing the lineup's own DST. `None` disables.
    #[serde(deserialize_with = "lenient::option_number")]
    pub num_players_vs_def: Option<usize>,
    #[serde(deserialize_with = "lenient::number")]
    pub seed: u64,
    pub allow_uniques_relaxation: bool,
    /// Worker threads for randomized waves (0 = one per core). Results do
    /// not depend on it.
    #[serde(deserialize_with = "lenient::number")]
    pub max_workers: usize,
    #[serde(flatten)]
    pub rules: RuleConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            num_lineups: 10,
            min_salary: 49_200,
            salary_cap: DK_SALARY_CAP,
            global_team_limit: Some(4),
            projection_minimum: 5.0,
            num_uniques: 1,
            randomness: 0.0,
            allow_qb_vs_dst: false,
            use_double_te: true,
            num_players_vs_def: None,
            seed: 0,
            allow_uniques_relaxation: false,
            max_workers: 0,
            rules: RuleConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Reject settings no run could honor.
    pub fn validate(&self) -> Result<()> {
        if self.num_lineups == 0 {
            return Err(Error::config("num_lineups", "must be greater than 0"));
        }
        if self.salary_cap == 0 {
            return Err(Error::config("salary_cap", "must be greater than 0"));
        }
        if self.min_salary > self.salary_cap {
            return Err(Error::config(
                "min_salary",
                format!(
                    "{} exceeds the salary cap of {}",
                    self.min_salary, self.salary_cap
                ),
            ));
        }
        if !self.randomness.is_finite() || !(0.0..=1.0).contains(&self.randomness) {
            return Err(Error::config(
                "randomness",
                format!("must be between 0.0 and 1.0 inclusive, got {}", self.randomness),
            ));
        }
        if !self.projection_minimum.is_finite() {
            return Err(Error::config("projection_minimum", "must be a finite number"));
        }
        if self.num_uniques > ROSTER_SIZE {
            return Err(Error::config(
                "num_uniques",
                format!("must be between 0 and {ROSTER_SIZE}, got {}", self.num_uniques),
            ));
        }
        if self.global_team_limit == Some(0) {
            return Err(Error::config("global_team_limit", "must be greater than 0"));
        }
        Ok(())
    }
}
