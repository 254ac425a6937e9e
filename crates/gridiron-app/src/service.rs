// Request handling: loads the slate once, then maps each request to the
// optimizer or simulator and each failure to a `{success: false}` response.

use std::path::PathBuf;

use gridiron_core::catalog::loader;
use gridiron_core::stats::compute_lineup_stats;
use gridiron_core::{CancelFlag, DataError, Lineup, PlayerCatalog, ValidatedRules};
use gridiron_optimizer::OptimizerConfig;
use gridiron_sim::SimulationConfig;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, Settings};
use crate::output;
use crate::protocol::{
    LineupSet, OptimizeResponse, PlayersResponse, SimulateResponse, StatsResponse,
};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] gridiron_core::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write export under {dir}: {source}")]
    Export { dir: PathBuf, source: csv::Error },
}

impl From<DataError> for ServiceError {
    fn from(e: DataError) -> Self {
        ServiceError::Core(e.into())
    }
}

impl ServiceError {
    /// Category reported next to the message in failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Core(e) => e.kind(),
            ServiceError::Config(_) => "ConfigError",
            ServiceError::Export { .. } => "ExportError",
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Service {
    settings: Settings,
    catalog: PlayerCatalog,
}

impl Service {
    pub fn new(settings: Settings, catalog: PlayerCatalog) -> Self {
        Service { settings, catalog }
    }

    /// Load the slate named by `settings.data_paths`: the wire-form catalog
    /// when configured, else the salary export plus optional projections.
    pub fn from_settings(settings: Settings) -> Result<Self, ServiceError> {
        let paths = &settings.data_paths;
        let catalog = match &paths.players_json {
            Some(json) => loader::load_catalog_json(&settings.resolve(json))?,
            None => {
                let projections = paths.projections.as_deref().map(|p| settings.resolve(p));
                loader::load_catalog(&settings.resolve(&paths.salaries), projections.as_deref())?
            }
        };
        Ok(Service::new(settings, catalog))
    }

    pub fn catalog(&self) -> &PlayerCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn players(&self) -> PlayersResponse {
        PlayersResponse {
            players: self.catalog.players().to_vec(),
        }
    }

    pub fn optimize(&self, request: &Value, cancel: &CancelFlag) -> OptimizeResponse {
        self.run_optimize(request, cancel).unwrap_or_else(|e| {
            warn!("Optimizer request failed: {e}");
            OptimizeResponse::failure(e.to_string(), e.kind())
        })
    }

    pub fn simulate(
        &self,
        request: &Value,
        lineups: Option<&LineupSet>,
        cancel: &CancelFlag,
    ) -> SimulateResponse {
        self.run_simulate(request, lineups, cancel)
            .unwrap_or_else(|e| {
                warn!("Simulation request failed: {e}");
                SimulateResponse::failure(e.to_string(), e.kind())
            })
    }

    /// Pool statistics for a saved set of optimizer lineups.
    pub fn stats(&self, lineups: &LineupSet) -> StatsResponse {
        match self.resolve_lineups(lineups) {
            Ok(resolved) => StatsResponse {
                success: true,
                stats: Some(compute_lineup_stats(&self.catalog, &resolved)),
                error: None,
                kind: None,
            },
            Err(e) => StatsResponse {
                success: false,
                stats: None,
                error: Some(e.to_string()),
                kind: Some(e.kind().to_string()),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn run_optimize(
        &self,
        request: &Value,
        cancel: &CancelFlag,
    ) -> Result<OptimizeResponse, ServiceError> {
        let config = self.settings.optimizer_request(request)?;
        let (lineups, mut response) = self.optimize_with(&config, cancel)?;

        response.stats = Some(compute_lineup_stats(&self.catalog, &lineups));
        if self.settings.output.write_csv {
            let dir = self.settings.output_dir();
            let path = output::export_lineups(&dir, &self.catalog, &lineups)
                .map_err(|source| ServiceError::Export { dir, source })?;
            response.download_path = Some(path.display().to_string());
        }
        Ok(response)
    }

    fn optimize_with(
        &self,
        config: &OptimizerConfig,
        cancel: &CancelFlag,
    ) -> Result<(Vec<Lineup>, OptimizeResponse), ServiceError> {
        let rules = ValidatedRules::new(&config.rules.to_rules()?, &self.catalog)?;
        let outcome = gridiron_optimizer::optimize(&self.catalog, &rules, config, cancel)?;
        let response = OptimizeResponse::from_outcome(&self.catalog, &outcome);
        Ok((outcome.lineups, response))
    }

    fn run_simulate(
        &self,
        request: &Value,
        lineups: Option<&LineupSet>,
        cancel: &CancelFlag,
    ) -> Result<SimulateResponse, ServiceError> {
        let mut config = self.settings.simulator_request(request)?;
        if config.use_contest_data {
            config.contest = Some(self.load_contest()?);
        }

        let candidates = match lineups {
            Some(set) => self.resolve_lineups(set)?,
            None if config.use_lineup_input => Vec::new(),
            None => self.candidate_lineups(request, &config, cancel)?,
        };

        let outcome = gridiron_sim::simulate(&self.catalog, &config, &candidates, cancel)?;
        let mut response = SimulateResponse::from_outcome(&self.catalog, &outcome);
        if self.settings.output.write_csv {
            let dir = self.settings.output_dir();
            let path = output::export_sim_results(&dir, &self.catalog, &outcome.lineups)
                .map_err(|source| ServiceError::Export { dir, source })?;
            response.download_path = Some(path.display().to_string());
        }
        Ok(response)
    }

    /// Without saved lineups the simulator runs the optimizer first, using
    /// the settings defaults overlaid with the request's `optimizer` object.
    fn candidate_lineups(
        &self,
        request: &Value,
        sim: &SimulationConfig,
        cancel: &CancelFlag,
    ) -> Result<Vec<Lineup>, ServiceError> {
        let overrides = request.get("optimizer").cloned().unwrap_or(Value::Null);
        let mut config = self.settings.optimizer_request(&overrides)?;
        config.salary_cap = sim.salary_cap;
        info!(
            "No lineups supplied; optimizing {} candidates first",
            config.num_lineups
        );
        let (lineups, _) = self.optimize_with(&config, cancel)?;
        Ok(lineups)
    }

    fn load_contest(&self) -> Result<gridiron_sim::Contest, ServiceError> {
        let path = self.settings.data_paths.contest.as_deref().ok_or_else(|| {
            ConfigError::ValidationError {
                field: "data_paths.contest".into(),
                message: "use_contest_data is set but no contest file is configured".into(),
            }
        })?;
        Ok(gridiron_sim::load_contest(&self.settings.resolve(path))?)
    }

    fn resolve_lineups(&self, set: &LineupSet) -> Result<Vec<Lineup>, ServiceError> {
        set.lineups
            .iter()
            .enumerate()
            .map(|(n, saved)| {
                saved.to_lineup(&self.catalog).ok_or_else(|| {
                    gridiron_core::Error::config(
                        "lineups",
                        format!(
                            "saved lineup {} does not match a legal roster on this slate",
                            n + 1
                        ),
                    )
                    .into()
                })
            })
            .collect()
    }
}
