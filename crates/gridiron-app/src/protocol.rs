// Request/response wire types for the optimizer, simulator, and catalog
// endpoints.
//
// Field names follow what the lineup viewer and rule builder read, so the
// JSON these produce can be fed straight back in (`--lineups`).

use std::collections::BTreeMap;

use gridiron_core::stats::LineupPoolStats;
use gridiron_core::{Lineup, Player, PlayerCatalog, PlayerId, Position};
use gridiron_optimizer::OptimizerOutcome;
use gridiron_sim::{LineupResult, PlayerRecord, SimulationOutcome};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Optimizer lineups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPlayer {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ID")]
    pub id: PlayerId,
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
    /// Roster slot the player fills (`QB`, `RB`, ..., `FLEX`, `DST`).
    #[serde(rename = "LineupPosition")]
    pub lineup_position: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupJson {
    pub players: Vec<LineupPlayer>,
    pub salary: u32,
    pub fpts_proj: f64,
    pub stack: String,
    pub ownership_sum: f64,
}

impl LineupJson {
    pub fn from_lineup(catalog: &PlayerCatalog, lineup: &Lineup) -> Self {
        let players = lineup
            .slots()
            .map(|(slot, idx)| {
                let p = catalog.player(idx);
                LineupPlayer {
                    name: p.name.clone(),
                    id: p.id,
                    team: p.team.clone(),
                    position: p.position,
                    salary: p.salary,
                    fpts: p.fpts,
                    ownership: p.ownership,
                    lineup_position: slot.label().to_string(),
                }
            })
            .collect();
        LineupJson {
            players,
            salary: lineup.salary(catalog),
            fpts_proj: round2(lineup.fpts(catalog)),
            stack: lineup.stack_label(catalog),
            ownership_sum: round2(lineup.ownership_sum(catalog)),
        }
    }

    /// Rebuild the lineup from its player IDs. `None` when an ID is not on
    /// this slate or the players do not fill a legal roster.
    pub fn to_lineup(&self, catalog: &PlayerCatalog) -> Option<Lineup> {
        let ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        Lineup::from_ids(catalog, &ids)
    }
}

/// Any saved response carrying a `lineups` array of optimizer lineups.
#[derive(Debug, Clone, Deserialize)]
pub struct LineupSet {
    pub lineups: Vec<LineupJson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub lineups: Vec<LineupJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub requested: usize,
    pub partial: bool,
    pub cancelled: bool,
    /// Uniques actually enforced; lower than requested after relaxation.
    pub effective_uniques: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LineupPoolStats>,
}

impl OptimizeResponse {
    pub fn from_outcome(catalog: &PlayerCatalog, outcome: &OptimizerOutcome) -> Self {
        OptimizeResponse {
            success: true,
            lineups: outcome
                .lineups
                .iter()
                .map(|l| LineupJson::from_lineup(catalog, l))
                .collect(),
            error: None,
            kind: None,
            requested: outcome.requested,
            partial: outcome.partial,
            cancelled: outcome.cancelled,
            effective_uniques: outcome.effective_uniques,
            download_path: None,
            stats: None,
        }
    }

    pub fn failure(error: String, kind: &str) -> Self {
        OptimizeResponse {
            success: false,
            lineups: Vec::new(),
            error: Some(error),
            kind: Some(kind.to_string()),
            requested: 0,
            partial: false,
            cancelled: false,
            effective_uniques: 0,
            download_path: None,
            stats: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation results
// ---------------------------------------------------------------------------

/// One simulated lineup. Counts are raw; `*Percent` fields are 0-100.
#[derive(Debug, Clone, Serialize)]
pub struct SimLineupJson {
    #[serde(rename = "Lineup")]
    pub lineup: Vec<PlayerId>,
    #[serde(rename = "Wins")]
    pub wins: u64,
    #[serde(rename = "WinPercent")]
    pub win_pct: f64,
    #[serde(rename = "Top1Percent")]
    pub top1_pct: f64,
    #[serde(rename = "Top10Percent")]
    pub top10_pct: f64,
    #[serde(rename = "CashPercent")]
    pub cash_pct: f64,
    #[serde(rename = "ROI")]
    pub roi: f64,
    #[serde(rename = "ROI%")]
    pub roi_pct: f64,
    #[serde(rename = "AvgScore")]
    pub avg_score: f64,
    #[serde(rename = "Fpts Proj")]
    pub fpts: f64,
    #[serde(rename = "Ceiling")]
    pub ceiling: f64,
    #[serde(rename = "Salary")]
    pub salary: u32,
    #[serde(rename = "Own Sum")]
    pub ownership_sum: f64,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Stack")]
    pub stack: String,
    #[serde(rename = "Stack1 Type")]
    pub stack1: String,
    #[serde(rename = "Stack2 Type")]
    pub stack2: String,
    #[serde(rename = "FieldDuplicates")]
    pub field_duplicates: usize,
}

impl SimLineupJson {
    pub fn from_result(catalog: &PlayerCatalog, r: &LineupResult) -> Self {
        SimLineupJson {
            lineup: r.lineup.ids(catalog),
            wins: r.wins,
            win_pct: round2(r.win_rate * 100.0),
            top1_pct: round2(r.top1_rate * 100.0),
            top10_pct: round2(r.top10_rate * 100.0),
            cash_pct: round2(r.cash_rate * 100.0),
            roi: round2(r.roi),
            roi_pct: round2(r.roi_pct),
            avg_score: round2(r.avg_score),
            fpts: round2(r.fpts),
            ceiling: round2(r.ceiling),
            salary: r.salary,
            ownership_sum: round2(r.ownership_sum),
            kind: r.kind.to_string(),
            stack: r.stack.clone(),
            stack1: r.stack1.clone(),
            stack2: r.stack2.clone(),
            field_duplicates: r.field_duplicates,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub success: bool,
    pub lineups: Vec<SimLineupJson>,
    pub players: BTreeMap<PlayerId, PlayerRecord>,
    pub num_simulations: u64,
    pub requested_simulations: usize,
    pub field_size: usize,
    pub field_wins: u64,
    pub optimal_fpts: f64,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

impl SimulateResponse {
    pub fn from_outcome(catalog: &PlayerCatalog, outcome: &SimulationOutcome) -> Self {
        SimulateResponse {
            success: true,
            lineups: outcome
                .lineups
                .iter()
                .map(|r| SimLineupJson::from_result(catalog, r))
                .collect(),
            players: outcome.players.clone(),
            num_simulations: outcome.num_simulations,
            requested_simulations: outcome.requested_simulations,
            field_size: outcome.field_size,
            field_wins: outcome.field_wins,
            optimal_fpts: round2(outcome.optimal_fpts),
            cancelled: outcome.cancelled,
            error: None,
            kind: None,
            download_path: None,
        }
    }

    pub fn failure(error: String, kind: &str) -> Self {
        SimulateResponse {
            success: false,
            lineups: Vec::new(),
            players: BTreeMap::new(),
            num_simulations: 0,
            requested_simulations: 0,
            field_size: 0,
            field_wins: 0,
            optimal_fpts: 0.0,
            cancelled: false,
            error: Some(error),
            kind: Some(kind.to_string()),
            download_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog and stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayersResponse {
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LineupPoolStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlayerCatalog {
        let roster = [
            (Position::Quarterback, "PHI"),
            (Position::RunningBack, "PHI"),
            (Position::RunningBack, "DAL"),
            (Position::WideReceiver, "PHI"),
            (Position::WideReceiver, "DAL"),
            (Position::WideReceiver, "DAL"),
            (Position::TightEnd, "DAL"),
            (Position::RunningBack, "DAL"),
            (Position::Defense, "DAL"),
        ];
        let players = roster
            .iter()
            .enumerate()
            .map(|(i, (pos, team))| Player {
                id: PlayerId(100 + i as u64),
                name: format!("Player {i}"),
                team: team.to_string(),
                position: *pos,
                salary: 5000,
                fpts: 10.0 + i as f64,
                game_info: "PHI@DAL 10/27/2024 04:25PM ET".into(),
                ownership: 5.0,
                std_dev: 0.0,
                ceiling: 0.0,
            })
            .collect();
        PlayerCatalog::new(players).unwrap()
    }

    #[test]
    fn lineup_json_uses_viewer_field_names() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &(0..9).collect::<Vec<_>>()).unwrap();
        let value = serde_json::to_value(LineupJson::from_lineup(&cat, &lineup)).unwrap();

        assert_eq!(value["salary"], 45_000);
        assert_eq!(value["ownership_sum"], 45.0);
        let first = &value["players"][0];
        for key in ["Name", "ID", "Team", "Position", "Salary", "Fpts", "Ownership", "LineupPosition"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert_eq!(first["LineupPosition"], "QB");
        assert_eq!(value["players"][8]["LineupPosition"], "DST");
    }

    #[test]
    fn saved_lineups_rebuild_on_the_same_slate() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &(0..9).collect::<Vec<_>>()).unwrap();
        let response = serde_json::json!({
            "success": true,
            "lineups": [LineupJson::from_lineup(&cat, &lineup)],
        });

        let text = serde_json::to_string(&response).unwrap();
        let saved: LineupSet = serde_json::from_str(&text).unwrap();
        assert_eq!(saved.lineups[0].to_lineup(&cat), Some(lineup));
    }

    #[test]
    fn failure_omits_empty_optionals() {
        let value =
            serde_json::to_value(OptimizeResponse::failure("boom".into(), "ConfigError")).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "boom");
        assert_eq!(value["kind"], "ConfigError");
        assert!(value.get("download_path").is_none());
        assert!(value.get("stats").is_none());
    }
}
