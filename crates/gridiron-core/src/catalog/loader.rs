// Slate data loading.
//
// Reads the DraftKings `player_ids.csv` export (the salary file), merges a
// projections CSV onto it by player name, and builds a PlayerCatalog.
// A `players.json` catalog in the Player wire format is also accepted.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::PlayerCatalog;
use crate::error::DataError;
use crate::player::{Player, PlayerId, Position};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One row of a projections file, after numeric cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: String,
    pub fpts: f64,
    pub std_dev: f64,
    pub ceiling: f64,
    pub ownership: f64,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// DraftKings salary export row. Every column is read as text so missing
/// values can be reported with the row number instead of a serde error.
/// Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawDkPlayer {
    #[serde(rename = "Position", default)]
    position: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(rename = "Salary", default)]
    salary: Option<String>,
    #[serde(rename = "Game Info", default)]
    game_info: Option<String>,
    #[serde(rename = "TeamAbbrev", default)]
    team: Option<String>,
    #[serde(rename = "AvgPointsPerGame", default)]
    avg_points: Option<String>,
}

/// Projections row. Headers are lowercased before deserializing.
#[derive(Debug, Deserialize)]
struct RawProjection {
    name: String,
    #[serde(default)]
    fpts: Option<String>,
    #[serde(default)]
    stddev: Option<String>,
    #[serde(default)]
    ceiling: Option<String>,
    #[serde(rename = "own%", default)]
    own: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip thousands separators, currency and percent signs. Blank or
/// non-finite values become `None`.
fn clean_numeric(raw: Option<&str>) -> Option<f64> {
    let cleaned: String = raw?
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn required<'a>(
    value: &'a Option<String>,
    row: usize,
    field: &'static str,
) -> Result<&'a str, DataError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataError::MissingField { row, field }),
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (enable testing without temp files)
// ---------------------------------------------------------------------------

/// Parse a DraftKings salary export. Row numbers in errors are 1-based file
/// lines (the header is line 1).
pub fn load_salaries_from_reader<R: Read>(rdr: R, source: &Path) -> Result<Vec<Player>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let mut players = Vec::new();

    for (i, result) in reader.deserialize::<RawDkPlayer>().enumerate() {
        let row = i + 2;
        let raw = result.map_err(|e| DataError::Csv {
            path: source.to_path_buf(),
            source: e,
        })?;

        let position_raw = required(&raw.position, row, "Position")?;
        let position = Position::from_str_pos(position_raw).ok_or_else(|| DataError::InvalidField {
            row,
            field: "Position",
            value: position_raw.to_string(),
        })?;

        let salary_raw = required(&raw.salary, row, "Salary")?;
        let salary = clean_numeric(Some(salary_raw))
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| DataError::InvalidField {
                row,
                field: "Salary",
                value: salary_raw.to_string(),
            })?;

        let id_raw = required(&raw.id, row, "ID")?;
        let id = id_raw
            .parse::<u64>()
            .map_err(|_| DataError::InvalidField {
                row,
                field: "ID",
                value: id_raw.to_string(),
            })?;

        let name = required(&raw.name, row, "Name")?;
        let team = required(&raw.team, row, "TeamAbbrev")?;

        players.push(Player {
            id: PlayerId(id),
            name: name.to_string(),
            team: team.to_uppercase(),
            position,
            salary: salary.round() as u32,
            fpts: clean_numeric(raw.avg_points.as_deref()).unwrap_or(0.0),
            game_info: raw.game_info.unwrap_or_default().trim().to_string(),
            ownership: 0.0,
            std_dev: 0.0,
            ceiling: 0.0,
        });
    }

    Ok(players)
}

/// Parse a projections CSV. Header matching is case-insensitive; malformed
/// rows are skipped with a warning.
pub fn load_projections_from_reader<R: Read>(
    rdr: R,
    source: &Path,
) -> Result<Vec<Projection>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let csv_err = |e: csv::Error| DataError::Csv {
        path: source.to_path_buf(),
        source: e,
    };

    let lowered: csv::StringRecord = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    reader.set_headers(lowered);

    let mut projections = Vec::new();
    for result in reader.deserialize::<RawProjection>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim();
                if name.is_empty() {
                    warn!("skipping projection row with blank name");
                    continue;
                }
                projections.push(Projection {
                    name: name.to_string(),
                    fpts: clean_numeric(raw.fpts.as_deref()).unwrap_or(0.0),
                    std_dev: clean_numeric(raw.stddev.as_deref()).unwrap_or(0.0),
                    ceiling: clean_numeric(raw.ceiling.as_deref()).unwrap_or(0.0),
                    ownership: clean_numeric(raw.own.as_deref()).unwrap_or(0.0),
                });
            }
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
            }
        }
    }
    Ok(projections)
}

/// Overlay projections onto salary rows by case-insensitive name. Players
/// without a projection keep zero points; projections with no player are
/// logged and dropped.
pub fn merge_projections(players: &mut [Player], projections: &[Projection]) {
    let by_name: HashMap<String, &Projection> = projections
        .iter()
        .map(|p| (p.name.to_lowercase(), p))
        .collect();

    let mut matched = 0usize;
    for player in players.iter_mut() {
        match by_name.get(&player.name.trim().to_lowercase()) {
            Some(proj) => {
                player.fpts = proj.fpts;
                player.std_dev = proj.std_dev;
                player.ceiling = proj.ceiling;
                player.ownership = proj.ownership;
                matched += 1;
            }
            None => {
                player.fpts = 0.0;
            }
        }
    }

    let unmatched = projections.len().saturating_sub(matched);
    if unmatched > 0 {
        warn!("{} projection rows did not match any player", unmatched);
    }
}

// ---------------------------------------------------------------------------
// Path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, DataError> {
    std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a slate from a DraftKings salary export plus an optional
/// projections file.
pub fn load_catalog(
    salaries_path: &Path,
    projections_path: Option<&Path>,
) -> Result<PlayerCatalog, DataError> {
    let mut players = load_salaries_from_reader(open(salaries_path)?, salaries_path)?;
    if let Some(path) = projections_path {
        let projections = load_projections_from_reader(open(path)?, path)?;
        merge_projections(&mut players, &projections);
    }
    info!(
        "Loaded {} players from {}",
        players.len(),
        salaries_path.display()
    );
    PlayerCatalog::new(players)
}

/// Load a `players.json` catalog (array of players in wire form).
pub fn load_catalog_json(path: &Path) -> Result<PlayerCatalog, DataError> {
    let players: Vec<Player> =
        serde_json::from_reader(std::io::BufReader::new(open(path)?)).map_err(|e| {
            DataError::Json {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    info!("Loaded {} players from {}", players.len(), path.display());
    PlayerCatalog::new(players)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
