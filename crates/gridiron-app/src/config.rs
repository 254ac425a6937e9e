// Settings loading (config/settings.toml) and request overlays.

use std::path::{Path, PathBuf};

use gridiron_optimizer::OptimizerConfig;
use gridiron_sim::SimulationConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const SETTINGS_FILE: &str = "settings.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid request: {source}")]
    RequestError { source: serde_json::Error },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    data_paths: DataPaths,
    #[serde(default)]
    output: OutputConfig,
    #[serde(default)]
    optimizer: OptimizerConfig,
    #[serde(default)]
    simulator: SimulationConfig,
}

/// Input files, relative to the directory settings were loaded from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPaths {
    #[serde(default)]
    pub salaries: String,
    #[serde(default)]
    pub projections: Option<String>,
    /// Pre-built catalog in wire form; used instead of the CSVs when set.
    #[serde(default)]
    pub players_json: Option<String>,
    #[serde(default)]
    pub contest: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    /// Write a CSV export alongside each optimizer and simulation response.
    pub write_csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: "output".into(),
            write_csv: true,
        }
    }
}

/// Assembled settings. The `optimizer` and `simulator` sections are the
/// defaults every request is overlaid on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub data_paths: DataPaths,
    pub output: OutputConfig,
    pub optimizer: OptimizerConfig,
    pub simulator: SimulationConfig,
}

impl Settings {
    /// Resolve a configured path against the settings directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output.dir)
    }

    /// Optimizer config for one request: settings defaults with the
    /// request's top-level fields replacing them.
    pub fn optimizer_request(&self, request: &Value) -> Result<OptimizerConfig, ConfigError> {
        overlay(&self.optimizer, request)
    }

    pub fn simulator_request(&self, request: &Value) -> Result<SimulationConfig, ConfigError> {
        overlay(&self.simulator, request)
    }
}

/// Replace each top-level field of `base` present in `request`. Nested
/// tables (rule maps, correlation rules) are replaced whole, never merged.
pub fn overlay<T>(base: &T, request: &Value) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged =
        serde_json::to_value(base).map_err(|e| ConfigError::RequestError { source: e })?;
    match (merged.as_object_mut(), request) {
        (Some(fields), Value::Object(patch)) => {
            for (key, value) in patch {
                fields.insert(key.clone(), value.clone());
            }
        }
        (_, Value::Null) => {}
        _ => {
            return Err(ConfigError::ValidationError {
                field: "request".into(),
                message: "must be a JSON object".into(),
            });
        }
    }
    serde_json::from_value(merged).map_err(|e| ConfigError::RequestError { source: e })
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/settings.toml` under `base_dir`. Does not copy
/// defaults; `load_settings()` does.
pub fn load_settings_from(base_dir: &Path) -> Result<Settings, ConfigError> {
    let path = base_dir.join("config").join(SETTINGS_FILE);
    let text = read_file(&path)?;
    let file: SettingsFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let settings = Settings {
        base_dir: base_dir.to_path_buf(),
        data_paths: file.data_paths,
        output: file.output,
        optimizer: file.optimizer,
        simulator: file.simulator,
    };
    validate(&settings)?;
    Ok(settings)
}

/// Copy every file in `defaults/` that is missing from `config/`. Returns
/// the files copied. `.example` templates are skipped.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load settings relative to the current working directory, copying
/// defaults first.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_settings_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn section_error(section: &str, err: gridiron_core::Error) -> ConfigError {
    match err {
        gridiron_core::Error::Config { field, message } => ConfigError::ValidationError {
            field: format!("{section}.{field}"),
            message,
        },
        other => ConfigError::ValidationError {
            field: section.into(),
            message: other.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let paths = &settings.data_paths;
    if paths.salaries.trim().is_empty() && paths.players_json.is_none() {
        return Err(ConfigError::ValidationError {
            field: "data_paths.salaries".into(),
            message: "set a salary export or data_paths.players_json".into(),
        });
    }

    if settings.output.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "output.dir".into(),
            message: "must not be empty".into(),
        });
    }

    settings
        .optimizer
        .validate()
        .map_err(|e| section_error("optimizer", e))?;

    // Contest files and hand-entered lineups arrive per request.
    let simulator = SimulationConfig {
        use_contest_data: false,
        use_lineup_input: false,
        ..settings.simulator.clone()
    };
    simulator
        .validate()
        .map_err(|e| section_error("simulator", e))?;

    if settings.simulator.use_contest_data && paths.contest.is_none() {
        return Err(ConfigError::ValidationError {
            field: "data_paths.contest".into(),
            message: "simulator.use_contest_data is set but no contest file is configured".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
