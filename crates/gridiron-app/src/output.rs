// CSV exports of optimizer lineups and simulation results.
//
// Player cells use the `Name (ID)` form DraftKings upload templates take;
// the simulator accepts the same form for hand-entered lineups.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use gridiron_core::{Lineup, PlayerCatalog, Slot};
use gridiron_sim::LineupResult;
use tracing::info;

const LINEUP_COLUMNS: [&str; 5] = ["Salary", "Fpts Proj", "Ceiling", "Own. Sum", "Stack"];

const SIM_COLUMNS: [&str; 13] = [
    "Fpts Proj",
    "Ceiling",
    "Salary",
    "Own. Sum",
    "Win %",
    "Top 10%",
    "Top 1%",
    "ROI",
    "Cash %",
    "Avg Score",
    "Type",
    "Stack1 Type",
    "Stack2 Type",
];

fn player_cells(catalog: &PlayerCatalog, lineup: &Lineup) -> Vec<String> {
    lineup
        .players()
        .iter()
        .map(|&idx| {
            let p = catalog.player(idx);
            format!("{} ({})", p.name, p.id)
        })
        .collect()
}

fn header(extra: &[&str]) -> Vec<String> {
    Slot::ALL
        .iter()
        .map(|s| s.label().to_string())
        .chain(extra.iter().map(|c| c.to_string()))
        .collect()
}

/// Write optimizer lineups, one row per lineup in the given order.
pub fn write_lineups<W: Write>(
    writer: W,
    catalog: &PlayerCatalog,
    lineups: &[Lineup],
) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(&LINEUP_COLUMNS))?;
    for lineup in lineups {
        let mut row = player_cells(catalog, lineup);
        row.push(lineup.salary(catalog).to_string());
        row.push(format!("{:.2}", lineup.fpts(catalog)));
        row.push(format!("{:.2}", lineup.ceiling(catalog)));
        row.push(format!("{:.2}", lineup.ownership_sum(catalog)));
        row.push(lineup.stack_label(catalog));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write simulation results. Rates are percentages.
pub fn write_sim_results<W: Write>(
    writer: W,
    catalog: &PlayerCatalog,
    results: &[LineupResult],
) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(&SIM_COLUMNS))?;
    for r in results {
        let mut row = player_cells(catalog, &r.lineup);
        row.push(format!("{:.2}", r.fpts));
        row.push(format!("{:.2}", r.ceiling));
        row.push(r.salary.to_string());
        row.push(format!("{:.2}", r.ownership_sum));
        row.push(format!("{:.2}", r.win_rate * 100.0));
        row.push(format!("{:.2}", r.top10_rate * 100.0));
        row.push(format!("{:.2}", r.top1_rate * 100.0));
        row.push(format!("{:.2}", r.roi));
        row.push(format!("{:.2}", r.cash_rate * 100.0));
        row.push(format!("{:.2}", r.avg_score));
        row.push(r.kind.to_string());
        row.push(r.stack1.clone());
        row.push(r.stack2.clone());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.csv`
pub fn export_path(dir: &Path, prefix: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("{prefix}_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

fn create(path: &Path) -> csv::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::File::create(path)?)
}

pub fn export_lineups(dir: &Path, catalog: &PlayerCatalog, lineups: &[Lineup]) -> csv::Result<PathBuf> {
    let path = export_path(dir, "dk_optimal_lineups", Local::now());
    write_lineups(create(&path)?, catalog, lineups)?;
    info!("Wrote {} lineups to {}", lineups.len(), path.display());
    Ok(path)
}

pub fn export_sim_results(
    dir: &Path,
    catalog: &PlayerCatalog,
    results: &[LineupResult],
) -> csv::Result<PathBuf> {
    let path = export_path(dir, "dk_simulation_results", Local::now());
    write_sim_results(create(&path)?, catalog, results)?;
    info!("Wrote {} simulation results to {}", results.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gridiron_core::{Player, PlayerId, Position};

    fn catalog() -> PlayerCatalog {
        let positions = [
            Position::Quarterback,
            Position::RunningBack,
            Position::RunningBack,
            Position::WideReceiver,
            Position::WideReceiver,
            Position::WideReceiver,
            Position::TightEnd,
            Position::WideReceiver,
            Position::Defense,
        ];
        let players = positions
            .iter()
            .enumerate()
            .map(|(i, pos)| Player {
                id: PlayerId(200 + i as u64),
                name: format!("Name {i}"),
                team: if i < 5 { "NYG".into() } else { "WAS".into() },
                position: *pos,
                salary: 5500,
                fpts: 12.5,
                game_info: "NYG@WAS 10/27/2024 01:00PM ET".into(),
                ownership: 3.0,
                std_dev: 0.0,
                ceiling: 20.0,
            })
            .collect();
        PlayerCatalog::new(players).unwrap()
    }

    #[test]
    fn lineup_rows_follow_roster_columns() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &(0..9).collect::<Vec<_>>()).unwrap();
        let mut buf = Vec::new();
        write_lineups(&mut buf, &cat, &[lineup]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "QB,RB,RB,WR,WR,WR,TE,FLEX,DST,Salary,Fpts Proj,Ceiling,Own. Sum,Stack"
        );
        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row[0], "Name 0 (200)");
        assert_eq!(row[7], "Name 7 (207)");
        assert_eq!(row[9], "49500");
        assert_eq!(row[10], "112.50");
        assert_eq!(row[11], "180.00");
    }

    #[test]
    fn export_names_carry_a_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 10, 27, 13, 5, 9).unwrap();
        let path = export_path(Path::new("out"), "dk_optimal_lineups", now);
        assert_eq!(path, Path::new("out/dk_optimal_lineups_20241027_130509.csv"));
    }

    #[test]
    fn export_creates_the_output_directory() {
        let cat = catalog();
        let lineup = Lineup::from_players(&cat, &(0..9).collect::<Vec<_>>()).unwrap();
        let dir = std::env::temp_dir().join("gridiron_output_export");
        let _ = std::fs::remove_dir_all(&dir);

        let path = export_lineups(&dir, &cat, &[lineup]).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
