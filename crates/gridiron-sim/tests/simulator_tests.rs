// Integration tests for the contest simulator.
//
// Each test builds a small two-game slate, takes candidate lineups from the
// optimizer or by hand, and runs the full simulate pipeline.

use std::path::Path;

use gridiron_core::{CancelFlag, Error, Lineup, Player, PlayerCatalog, PlayerId, Position, ValidatedRules};
use gridiron_optimizer::{best_lineup, optimize, OptimizerConfig};
use gridiron_sim::{load_contest_from_reader, simulate, LineupKind, SimulationConfig};

// ===========================================================================
// Test helpers
// ===========================================================================

const DEPTH: [(Position, u32, f64, f64); 11] = [
    (Position::Quarterback, 6800, 21.0, 12.0),
    (Position::RunningBack, 7200, 17.5, 8.0),
    (Position::RunningBack, 5400, 12.0, 10.0),
    (Position::RunningBack, 4100, 8.0, 6.0),
    (Position::WideReceiver, 7600, 18.0, 15.0),
    (Position::WideReceiver, 5900, 13.5, 10.0),
    (Position::WideReceiver, 4300, 9.5, 7.0),
    (Position::WideReceiver, 3400, 6.5, 4.0),
    (Position::TightEnd, 5000, 10.5, 9.0),
    (Position::TightEnd, 3000, 5.5, 3.0),
    (Position::Defense, 3100, 7.0, 8.0),
];

fn slate() -> PlayerCatalog {
    let mut players = Vec::new();
    let mut id = 5000;
    for (g, (away, home)) in [("PHI", "DAL"), ("NYG", "WAS")].iter().enumerate() {
        for (t, team) in [away, home].iter().enumerate() {
            let offset = (g * 2 + t) as f64;
            for (d, (pos, salary, fpts, own)) in DEPTH.iter().enumerate() {
                id += 1;
                players.push(Player {
                    id: PlayerId(id),
                    name: format!("{team} {} {d}", pos.display_str()),
                    team: team.to_string(),
                    position: *pos,
                    salary: salary + 100 * (g * 2 + t) as u32,
                    fpts: fpts + 0.3 * offset,
                    game_info: format!("{away}@{home} 10/27/2024 01:00PM ET"),
                    ownership: *own,
                    std_dev: fpts * 0.45,
                    ceiling: fpts * 2.0,
                });
            }
        }
    }
    PlayerCatalog::new(players).unwrap()
}

fn config() -> SimulationConfig {
    SimulationConfig {
        num_simulations: 300,
        field_size: 60,
        batch_size: 50,
        max_pct_off_optimal: 0.5,
        min_field_salary: 40_000,
        seed: 17,
        ..SimulationConfig::default()
    }
}

fn optimizer_lineups(catalog: &PlayerCatalog, n: usize) -> Vec<Lineup> {
    let config = OptimizerConfig {
        num_lineups: n,
        num_uniques: 2,
        ..OptimizerConfig::default()
    };
    optimize(catalog, &ValidatedRules::default(), &config, &CancelFlag::new())
        .unwrap()
        .lineups
}

// ===========================================================================
// Aggregation properties
// ===========================================================================

#[test]
fn exactly_one_winner_per_draw() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 5);
    let outcome = simulate(&catalog, &config(), &lineups, &CancelFlag::new()).unwrap();

    assert_eq!(outcome.num_simulations, 300);
    assert_eq!(outcome.field_size, 60);
    let candidate_wins: u64 = outcome.lineups.iter().map(|l| l.wins).sum();
    assert_eq!(candidate_wins + outcome.field_wins, outcome.num_simulations);
}

#[test]
fn rates_are_nested_and_sorted_by_wins() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 5);
    let outcome = simulate(&catalog, &config(), &lineups, &CancelFlag::new()).unwrap();

    for result in &outcome.lineups {
        assert!(result.wins <= result.top1);
        assert!(result.top1 <= result.top10);
        assert!(result.win_rate <= result.top1_rate);
        assert!((0.0..=1.0).contains(&result.cash_rate));
        assert_eq!(result.kind, LineupKind::Optimizer);
        assert!(result.roi >= -outcome.entry_fee - 1e-9);
    }
    assert!(outcome.lineups.windows(2).all(|w| w[0].wins >= w[1].wins));
}

#[test]
fn optimal_lineup_wins_every_draw_without_variance() {
    let catalog = slate();
    let optimal = best_lineup(&catalog, 50_000).unwrap();
    let config = SimulationConfig {
        randomness: 0.0,
        ..config()
    };
    let outcome = simulate(&catalog, &config, &[optimal], &CancelFlag::new()).unwrap();
    let result = &outcome.lineups[0];
    assert_eq!(result.wins, outcome.num_simulations);
    assert_eq!(result.win_rate, 1.0);
    assert_eq!(outcome.field_wins, 0);
    assert!(result.roi > 0.0);
}

#[test]
fn ceiling_is_the_best_simulated_score() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 4);
    let outcome = simulate(&catalog, &config(), &lineups, &CancelFlag::new()).unwrap();
    for result in &outcome.lineups {
        assert!(result.ceiling >= result.avg_score, "{} < {}", result.ceiling, result.avg_score);
    }

    let flat = SimulationConfig {
        randomness: 0.0,
        ..config()
    };
    let outcome = simulate(&catalog, &flat, &lineups, &CancelFlag::new()).unwrap();
    for result in &outcome.lineups {
        assert!((result.ceiling - result.fpts).abs() < 1e-9);
        assert!((result.ceiling - result.avg_score).abs() < 1e-6);
    }
}

#[test]
fn seed_reproduces_results_across_worker_counts() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 4);
    let run = |workers: usize| {
        let config = SimulationConfig {
            max_workers: workers,
            ..config()
        };
        simulate(&catalog, &config, &lineups, &CancelFlag::new())
            .unwrap()
            .lineups
            .iter()
            .map(|l| (l.lineup, l.wins, l.top10, l.cash))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(1), run(3));
}

#[test]
fn player_records_cover_every_used_player() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 3);
    let outcome = simulate(&catalog, &config(), &lineups, &CancelFlag::new()).unwrap();
    for lineup in &lineups {
        for id in lineup.ids(&catalog) {
            let record = &outcome.players[&id];
            assert!(record.exposure > 0.0);
            assert!((record.leverage - (record.exposure - record.ownership)).abs() < 1e-9);
        }
    }
}

// ===========================================================================
// Candidates and contests
// ===========================================================================

#[test]
fn custom_lineups_resolve_names_and_export_form() {
    let catalog = slate();
    let optimal = best_lineup(&catalog, 50_000).unwrap();
    let entries: Vec<String> = optimal
        .players()
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let player = catalog.player(p);
            if i % 2 == 0 {
                player.name.clone()
            } else {
                format!("{} ({})", player.name, player.id)
            }
        })
        .collect();
    let config = SimulationConfig {
        use_lineup_input: true,
        custom_lineups: vec![entries],
        ..config()
    };
    let others = optimizer_lineups(&catalog, 3);
    let outcome = simulate(&catalog, &config, &others, &CancelFlag::new()).unwrap();
    assert_eq!(outcome.lineups.len(), 1);
    assert_eq!(outcome.lineups[0].kind, LineupKind::Custom);
    assert_eq!(outcome.lineups[0].lineup, optimal);
}

#[test]
fn unknown_custom_player_is_a_config_error() {
    let catalog = slate();
    let config = SimulationConfig {
        use_lineup_input: true,
        custom_lineups: vec![vec!["Nobody".to_string(); 9]],
        ..config()
    };
    let err = simulate(&catalog, &config, &[], &CancelFlag::new()).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn contest_file_sets_field_and_fee() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 2);
    let csv = "field_size,entry_fee\n40,5\nplace_lo,place_hi,payout\n1,1,100\n2,8,10\n";
    let contest = load_contest_from_reader(csv.as_bytes(), Path::new("contest.csv")).unwrap();
    let config = SimulationConfig {
        use_contest_data: true,
        contest: Some(contest),
        ..config()
    };
    let outcome = simulate(&catalog, &config, &lineups, &CancelFlag::new()).unwrap();
    assert_eq!(outcome.field_size, 38);
    assert_eq!(outcome.entry_fee, 5.0);
}

// ===========================================================================
// Failure modes
// ===========================================================================

#[test]
fn zero_sizes_are_rejected() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 1);
    for config in [
        SimulationConfig {
            field_size: 0,
            ..config()
        },
        SimulationConfig {
            num_simulations: 0,
            ..config()
        },
    ] {
        let err = simulate(&catalog, &config, &lineups, &CancelFlag::new()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "got {err:?}");
    }
}

#[test]
fn unreachable_field_floor_is_a_field_generation_error() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 1);
    let config = SimulationConfig {
        max_pct_off_optimal: 0.0,
        field_retry_budget: 3,
        ..config()
    };
    let err = simulate(&catalog, &config, &lineups, &CancelFlag::new()).unwrap_err();
    assert!(matches!(err, Error::FieldGeneration(_)), "got {err:?}");
}

#[test]
fn cancelled_run_reports_cancelled() {
    let catalog = slate();
    let lineups = optimizer_lineups(&catalog, 1);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = simulate(&catalog, &config(), &lineups, &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
