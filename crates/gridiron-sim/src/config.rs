// Simulation run configuration.

use gridiron_core::lenient;
use gridiron_core::rules::CorrelationRules;
use gridiron_core::{Error, Position, Result, DK_SALARY_CAP};
use serde::{Deserialize, Serialize};

use crate::contest::Contest;

/// Settings for one simulation run. Numeric fields accept numbers or
/// numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    #[serde(deserialize_with = "lenient::number")]
    pub num_simulations: usize,
    /// Opposing lineups generated for the contest.
    #[serde(deserialize_with = "lenient::number")]
    pub field_size: usize,
    /// Field lineups projected more than this fraction below the optimal
    /// lineup are rejected.
    #[serde(deserialize_with = "lenient::number")]
    pub max_pct_off_optimal: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub pct_field_using_stacks: f64,
    /// Share of stacked field lineups that pair the QB with two teammates.
    #[serde(deserialize_with = "lenient::number")]
    pub pct_field_double_stacks: f64,
    /// Scale on every player's score deviation; 1.0 simulates as projected.
    #[serde(deserialize_with = "lenient::number")]
    pub randomness: f64,
    pub use_contest_data: bool,
    /// Simulate only `custom_lineups`, ignoring optimizer output.
    pub use_lineup_input: bool,
    /// Lineups entered by hand: nine player IDs or names each.
    pub custom_lineups: Vec<Vec<String>>,
    pub correlation_rules: CorrelationRules,
    #[serde(deserialize_with = "lenient::number")]
    pub seed: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub min_field_salary: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub salary_cap: u32,
    #[serde(deserialize_with = "lenient::number")]
    pub entry_fee: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub default_qb_var: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub default_skillpos_var: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub default_def_var: f64,
    /// Attempts allowed per field lineup before giving up.
    #[serde(deserialize_with = "lenient::number")]
    pub field_retry_budget: usize,
    /// Draws per batch; each batch has its own RNG stream.
    #[serde(deserialize_with = "lenient::number")]
    pub batch_size: usize,
    #[serde(deserialize_with = "lenient::number")]
    pub max_workers: usize,
    /// Loaded payout structure, required when `use_contest_data` is set.
    #[serde(skip)]
    pub contest: Option<Contest>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_simulations: 1000,
            field_size: 1000,
            max_pct_off_optimal: 0.25,
            pct_field_using_stacks: 0.65,
            pct_field_double_stacks: 0.4,
            randomness: 1.0,
            use_contest_data: false,
            use_lineup_input: false,
            custom_lineups: Vec::new(),
            correlation_rules: CorrelationRules::default(),
            seed: 0,
            min_field_salary: 45_000,
            salary_cap: DK_SALARY_CAP,
            entry_fee: 20.0,
            default_qb_var: 0.4,
            default_skillpos_var: 0.5,
            default_def_var: 0.5,
            field_retry_budget: 1000,
            batch_size: 100,
            max_workers: 0,
            contest: None,
        }
    }
}

fn fraction(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::config(
            field,
            format!("must be between 0.0 and 1.0 inclusive, got {value}"),
        ))
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::config(field, format!("must be a non-negative number, got {value}")))
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_simulations == 0 {
            return Err(Error::config("num_simulations", "must be greater than 0"));
        }
        if self.field_size == 0 && !self.use_contest_data {
            return Err(Error::config("field_size", "must be greater than 0"));
        }
        fraction("max_pct_off_optimal", self.max_pct_off_optimal)?;
        fraction("pct_field_using_stacks", self.pct_field_using_stacks)?;
        fraction("pct_field_double_stacks", self.pct_field_double_stacks)?;
        non_negative("randomness", self.randomness)?;
        non_negative("entry_fee", self.entry_fee)?;
        non_negative("default_qb_var", self.default_qb_var)?;
        non_negative("default_skillpos_var", self.default_skillpos_var)?;
        non_negative("default_def_var", self.default_def_var)?;
        if self.min_field_salary > self.salary_cap {
            return Err(Error::config(
                "min_field_salary",
                format!(
                    "{} exceeds the salary cap of {}",
                    self.min_field_salary, self.salary_cap
                ),
            ));
        }
        if self.field_retry_budget == 0 {
            return Err(Error::config("field_retry_budget", "must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size", "must be greater than 0"));
        }
        if self.use_contest_data && self.contest.is_none() {
            return Err(Error::config(
                "use_contest_data",
                "no contest structure was loaded",
            ));
        }
        if self.use_lineup_input && self.custom_lineups.is_empty() {
            return Err(Error::config("custom_lineups", "no lineups were entered"));
        }
        Ok(())
    }

    /// Fallback σ as a fraction of projection for players without a
    /// std-dev.
    pub fn default_var(&self, position: Position) -> f64 {
        match position {
            Position::Quarterback => self.default_qb_var,
            Position::Defense => self.default_def_var,
            _ => self.default_skillpos_var,
        }
    }

    /// The payout structure this run scores against.
    pub fn effective_contest(&self, candidates: usize) -> Contest {
        match (&self.contest, self.use_contest_data) {
            (Some(contest), true) => contest.clone(),
            _ => Contest::synthetic(self.field_size + candidates, self.entry_fee),
        }
    }

    /// Opposing lineups to generate. A loaded contest's size counts the
    /// candidates as entrants.
    pub fn effective_field_size(&self, candidates: usize) -> usize {
        match (&self.contest, self.use_contest_data) {
            (Some(contest), true) => contest.field_size.saturating_sub(candidates).max(1),
            _ => self.field_size,
        }
    }
}
