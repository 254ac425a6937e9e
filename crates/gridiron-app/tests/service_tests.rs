// Integration tests for the request service.
//
// Each test lays out a project directory under the system temp dir
// (config/settings.toml plus a DraftKings salary export), loads it the way
// the binary does, and drives requests through `Service`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gridiron_app::protocol::LineupSet;
use gridiron_app::{load_settings_from, Service};
use gridiron_core::CancelFlag;
use serde_json::json;

// ===========================================================================
// Test helpers
// ===========================================================================

const DEPTH: [(&str, u32, f64); 11] = [
    ("QB", 6800, 21.0),
    ("RB", 7200, 17.5),
    ("RB", 5400, 12.0),
    ("RB", 4100, 8.0),
    ("WR", 7600, 18.0),
    ("WR", 5900, 13.5),
    ("WR", 4300, 9.5),
    ("WR", 3400, 6.5),
    ("TE", 5000, 10.5),
    ("TE", 3000, 5.5),
    ("DST", 3100, 7.0),
];

/// DraftKings `player_ids.csv` for two games, eleven players per team.
fn salary_export() -> String {
    let mut csv = String::from(
        "Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame\n",
    );
    let mut id = 9000;
    for (g, (away, home)) in [("PHI", "DAL"), ("NYG", "WAS")].iter().enumerate() {
        for (t, team) in [away, home].iter().enumerate() {
            for (d, (pos, salary, fpts)) in DEPTH.iter().enumerate() {
                id += 1;
                let name = format!("{team} {pos} {d}");
                let roster = if matches!(*pos, "RB" | "WR" | "TE") {
                    format!("{pos}/FLEX")
                } else {
                    pos.to_string()
                };
                csv.push_str(&format!(
                    "{pos},{name} ({id}),{name},{id},{roster},{},{away}@{home} 10/27/2024 01:00PM ET,{team},{:.1}\n",
                    salary + 100 * (g * 2 + t) as u32,
                    fpts + 0.3 * (g * 2 + t) as f64,
                ));
            }
        }
    }
    csv
}

const SETTINGS: &str = r#"
[data_paths]
salaries = "data/player_ids.csv"

[output]
dir = "output"
write_csv = true

[optimizer]
num_lineups = 4
min_salary = 45000
num_uniques = 2
projection_minimum = 0.0

[simulator]
num_simulations = 200
field_size = 40
batch_size = 50
max_pct_off_optimal = 0.5
min_field_salary = 40000
seed = 3
"#;

fn project(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gridiron_service_{name}"));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("config")).unwrap();
    fs::create_dir_all(dir.join("data")).unwrap();
    fs::write(dir.join("config/settings.toml"), SETTINGS).unwrap();
    fs::write(dir.join("data/player_ids.csv"), salary_export()).unwrap();
    dir
}

fn service(dir: &Path) -> Service {
    Service::from_settings(load_settings_from(dir).unwrap()).unwrap()
}

// ===========================================================================
// Catalog
// ===========================================================================

#[test]
fn players_response_round_trips_the_catalog() {
    let dir = project("players");
    let service = service(&dir);

    let value = serde_json::to_value(service.players()).unwrap();
    let players = value["players"].as_array().unwrap();
    assert_eq!(players.len(), 44);
    for key in ["ID", "Name", "Team", "Position", "Salary", "Fpts", "GameInfo"] {
        assert!(players[0].get(key).is_some(), "missing {key}");
    }

    let back: gridiron_app::protocol::PlayersResponse = serde_json::from_value(value).unwrap();
    assert_eq!(back.players, service.catalog().players());

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Optimizer requests
// ===========================================================================

#[test]
fn optimize_returns_lineups_stats_and_export() {
    let dir = project("optimize");
    let service = service(&dir);

    let response = service.optimize(&json!({"num_lineups": 3}), &CancelFlag::new());
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.lineups.len(), 3);
    assert_eq!(response.requested, 3);
    assert!(!response.partial);
    assert!(response.stats.is_some());
    for lineup in &response.lineups {
        assert_eq!(lineup.players.len(), 9);
        assert!((45_000..=50_000).contains(&lineup.salary));
    }

    let path = PathBuf::from(response.download_path.unwrap());
    assert!(path.starts_with(dir.join("output")));
    let csv = fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn invalid_request_becomes_failure_response() {
    let dir = project("optimize_invalid");
    let service = service(&dir);

    let response = service.optimize(&json!({"randomness": 3.0}), &CancelFlag::new());
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("ConfigError"));
    assert!(response.lineups.is_empty());

    let response = service.optimize(
        &json!({"team_limits": {"XYZ": 1}}),
        &CancelFlag::new(),
    );
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("RuleValidationError"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn infeasible_request_reports_no_feasible_lineup() {
    let dir = project("optimize_infeasible");
    let service = service(&dir);

    // Two quarterbacks cannot share a single QB slot.
    let response = service.optimize(
        &json!({"at_least": {"2": [["PHI QB 0", "DAL QB 0"]]}}),
        &CancelFlag::new(),
    );
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("NoFeasibleLineupError"));

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Simulation requests
// ===========================================================================

#[test]
fn simulate_saved_optimizer_response() {
    let dir = project("simulate_saved");
    let service = service(&dir);

    let optimized = service.optimize(&json!({}), &CancelFlag::new());
    let saved: LineupSet =
        serde_json::from_value(serde_json::to_value(&optimized).unwrap()).unwrap();

    let response = service.simulate(&json!({}), Some(&saved), &CancelFlag::new());
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.lineups.len(), 4);
    assert_eq!(response.num_simulations, 200);
    let wins: u64 = response.lineups.iter().map(|l| l.wins).sum();
    assert_eq!(wins + response.field_wins, 200);

    let value = serde_json::to_value(&response).unwrap();
    let first = &value["lineups"][0];
    for key in ["Lineup", "Wins", "Top1Percent", "Ceiling", "Type", "Stack1 Type", "Stack2 Type", "ROI"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(first["Type"], "Optimizer");
    assert!(value["players"].as_object().unwrap().len() >= 9);
    assert!(response.download_path.is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn simulate_runs_the_optimizer_when_no_lineups_are_given() {
    let dir = project("simulate_optimizer_first");
    let service = service(&dir);

    let response = service.simulate(
        &json!({"num_simulations": 100, "optimizer": {"num_lineups": 2}}),
        None,
        &CancelFlag::new(),
    );
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.lineups.len(), 2);
    assert_eq!(response.num_simulations, 100);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn contest_data_without_a_file_is_a_config_failure() {
    let dir = project("simulate_no_contest");
    let service = service(&dir);

    let response = service.simulate(&json!({"use_contest_data": true}), None, &CancelFlag::new());
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("ConfigError"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn contest_file_from_settings_drives_field_size() {
    let dir = project("simulate_contest");
    fs::write(
        dir.join("data/contest.csv"),
        "field_size,entry_fee\n30,3\nplace_lo,place_hi,payout\n1,1,50\n2,6,5\n",
    )
    .unwrap();
    fs::write(
        dir.join("config/settings.toml"),
        SETTINGS.replace(
            "salaries = \"data/player_ids.csv\"",
            "salaries = \"data/player_ids.csv\"\ncontest = \"data/contest.csv\"",
        ),
    )
    .unwrap();
    let service = service(&dir);

    let response = service.simulate(
        &json!({"use_contest_data": true, "optimizer": {"num_lineups": 2}}),
        None,
        &CancelFlag::new(),
    );
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.field_size, 28);

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Stats
// ===========================================================================

#[test]
fn stats_for_saved_lineups() {
    let dir = project("stats");
    let service = service(&dir);

    let optimized = service.optimize(&json!({}), &CancelFlag::new());
    let saved: LineupSet =
        serde_json::from_value(serde_json::to_value(&optimized).unwrap()).unwrap();
    let response = service.stats(&saved);
    assert!(response.success);
    let stats = serde_json::to_value(response.stats.unwrap()).unwrap();
    assert!(stats.get("summary").is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stats_reject_lineups_from_another_slate() {
    let dir = project("stats_foreign");
    let service = service(&dir);

    let saved: LineupSet = serde_json::from_value(json!({
        "lineups": [{
            "players": [{"Name": "Nobody", "ID": 1, "Team": "KC", "Position": "QB",
                         "Salary": 5000, "Fpts": 10.0, "Ownership": 0.0, "LineupPosition": "QB"}],
            "salary": 5000, "fpts_proj": 10.0, "stack": "", "ownership_sum": 0.0
        }]
    }))
    .unwrap();
    let response = service.stats(&saved);
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("ConfigError"));

    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Cancellation
// ===========================================================================

#[tokio::test]
async fn cancelled_blocking_run_reports_cancelled() {
    let dir = project("cancel");
    let service = Arc::new(service(&dir));
    let cancel = CancelFlag::new();
    cancel.cancel();

    let response = tokio::task::spawn_blocking({
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        move || service.optimize(&json!({}), &cancel)
    })
    .await
    .unwrap();
    assert!(!response.success);
    assert_eq!(response.kind.as_deref(), Some("Cancelled"));

    let _ = fs::remove_dir_all(&dir);
}
