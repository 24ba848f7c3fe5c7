// Integration tests for longball.
//
// These tests exercise the library end-to-end through its public API: table
// loading from fixture exports, name resolution, scoring, slate projection
// from a slate file, and weight profiles feeding back into projections.

use std::sync::Arc;

use longball_core::config::{
    Config, DataConfig, ResolverConfig, ScheduleConfig, ScheduleSource, ScoringConfig,
    StoreConfig, TableFiles,
};
use longball_core::estimator::{Estimator, EstimatorError, SlateProjection};
use longball_core::model::{league_avg, BatterProfile, Handedness, MatchupContext, PitcherProfile};
use longball_core::resolver::{NameStrategy, Resolver};
use longball_core::schedule::{ScheduleProvider, SlateFile};
use longball_core::scorer::Scorer;
use longball_core::store::WeightStore;
use longball_core::tables::{ReferenceTables, TableError};
use longball_core::weights::Weights;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the crate root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn fixture_tables() -> TableFiles {
    TableFiles {
        batters_vs_left: "hitters_vl.json".into(),
        batters_vs_right: "hitters_vr.json".into(),
        pitchers_vs_left: "pitchers_vl.json".into(),
        pitchers_vs_right: "pitchers_vr.json".into(),
        statcast_batters: "statcast_batters.csv".into(),
        statcast_pitchers: "statcast_pitchers.csv".into(),
        park_factors: "park_factors.csv".into(),
    }
}

fn inline_config() -> Config {
    Config {
        scoring: ScoringConfig::default(),
        resolver: ResolverConfig::default(),
        data: DataConfig {
            dir: FIXTURES.into(),
            tables: fixture_tables(),
        },
        store: StoreConfig {
            path: ":memory:".into(),
        },
        schedule: ScheduleConfig {
            source: ScheduleSource::File,
            slate_path: format!("{FIXTURES}/slate.json"),
            statsapi_url: String::new(),
        },
    }
}

fn load_fixture_tables() -> Arc<ReferenceTables> {
    let tables = ReferenceTables::load_from(&inline_config().data)
        .expect("fixture tables should load");
    Arc::new(tables)
}

fn fixture_resolver() -> Resolver {
    Resolver::new(load_fixture_tables(), ResolverConfig::default())
}

fn fixture_estimator() -> Estimator {
    Estimator::new(load_fixture_tables(), &inline_config()).expect("default scoring is valid")
}

/// The reference "strong power hitter" profile.
fn power_bat_profile() -> BatterProfile {
    BatterProfile {
        home_run_rate_per_pa: 0.05,
        barrel_rate_pct: 12.0,
        hard_hit_rate_pct: 45.0,
        avg_exit_velocity_mph: 92.0,
        avg_launch_angle_deg: 18.0,
        fly_ball_rate_pct: 0.40,
        pull_rate_pct: 0.45,
        home_run_per_fly_ball_rate: 0.18,
        isolated_power: 0.220,
        expected_home_runs: 0.0,
        recent_home_runs: 0,
    }
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// ===========================================================================
// Table loading
// ===========================================================================

#[test]
fn fixture_tables_load_from_json_and_csv() {
    let tables = load_fixture_tables();
    assert_eq!(tables.batters_vs_right.len(), 3);
    assert_eq!(tables.batters_vs_left.len(), 2);
    assert_eq!(tables.pitchers_vs_right.len(), 2);
    assert_eq!(tables.statcast_batters.len(), 2);
    assert_eq!(tables.statcast_pitchers.len(), 2);
    assert_eq!(tables.park_factors.get("Hitter Haven"), Some(&1.15));
}

#[test]
fn empty_data_dir_is_unavailable() {
    let dir = temp_dir("longball_it_empty_data");
    let data = DataConfig {
        dir: dir.display().to_string(),
        tables: fixture_tables(),
    };
    match ReferenceTables::load_from(&data) {
        Err(TableError::Unavailable { table }) => assert_eq!(table, "batters_vs_left"),
        other => panic!("expected Unavailable, got {other:?}"),
    }

    let config = Config {
        data,
        ..inline_config()
    };
    assert!(matches!(
        Estimator::load(&config),
        Err(EstimatorError::Tables(TableError::Unavailable { .. }))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inverted_scoring_bounds_refuse_to_build() {
    let config = Config {
        scoring: ScoringConfig {
            floor: 0.4,
            ceiling: 0.2,
            invalid_default: 0.3,
        },
        ..inline_config()
    };
    assert!(Estimator::new(load_fixture_tables(), &config).is_err());
    assert!(matches!(
        Estimator::load(&config),
        Err(EstimatorError::Config(_))
    ));
}

#[test]
fn corrupt_table_is_an_error() {
    let dir = temp_dir("longball_it_corrupt");
    std::fs::write(dir.join("hitters_vl.json"), "[{\"Name\": ").unwrap();
    let data = DataConfig {
        dir: dir.display().to_string(),
        tables: fixture_tables(),
    };
    assert!(matches!(
        ReferenceTables::load_from(&data),
        Err(TableError::Json { .. })
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

// ===========================================================================
// Resolution and scoring
// ===========================================================================

#[test]
fn power_bat_resolves_to_reference_profile() {
    let resolver = fixture_resolver();
    let resolved = resolver.resolve_batter_detailed("Power Bat", Handedness::Right, Handedness::Right);
    assert_eq!(resolved.profile, power_bat_profile());
    assert_eq!(resolved.source.split, Some(NameStrategy::Exact));
    assert_eq!(resolved.source.statcast, Some(NameStrategy::FirstLastToLastFirst));
}

#[test]
fn end_to_end_probability_lands_in_sanity_band() {
    let estimate = fixture_estimator().estimate(
        "Power Bat",
        "TBD",
        MatchupContext::neutral(Handedness::Right, Handedness::Right),
        &Weights::default(),
    );
    let p = estimate.probability();
    assert!((0.05..=0.25).contains(&p), "got {p}");

    let direct = Scorer::default().score(
        &power_bat_profile(),
        &PitcherProfile::league_average(),
        1.0,
        &Weights::default(),
    );
    assert_eq!(p.to_bits(), direct.to_bits());
}

#[test]
fn name_order_does_not_change_the_profile() {
    let resolver = fixture_resolver();
    let a = resolver.resolve_batter("Power Bat", Handedness::Right, Handedness::Left);
    let b = resolver.resolve_batter("Bat, Power", Handedness::Right, Handedness::Left);
    assert_eq!(a, b);
    assert_ne!(a, BatterProfile::league_average());
}

#[test]
fn tbd_pitcher_is_league_average_for_both_hands() {
    let resolver = fixture_resolver();
    for hand in [Handedness::Left, Handedness::Right] {
        assert_eq!(resolver.resolve_pitcher("TBD", hand), PitcherProfile::league_average());
    }
}

#[test]
fn zero_plate_appearances_use_league_rate() {
    let resolver = fixture_resolver();
    let rookie = resolver.resolve_batter("Rookie Callup", Handedness::Right, Handedness::Right);
    assert_eq!(rookie.home_run_rate_per_pa, league_avg::HR_PER_PA);
    assert_eq!(rookie.isolated_power, league_avg::ISO);

    let p = Scorer::default().score(
        &rookie,
        &PitcherProfile::league_average(),
        1.0,
        &Weights::default(),
    );
    assert!(p.is_finite());
}

#[test]
fn pitcher_hr9_is_derived_when_not_published() {
    let resolver = fixture_resolver();
    let gb = resolver.resolve_pitcher("Ground Baller", Handedness::Right);
    assert!((gb.home_runs_per_nine_innings - 0.4).abs() < 1e-12);
    assert_eq!(gb.barrel_rate_pct, 4.0);
    assert_eq!(gb.ground_ball_rate_pct, Some(0.58));
}

#[test]
fn hitter_park_raises_score() {
    let estimator = fixture_estimator();
    let hitters_park = estimator.resolver().park_factor("Hitter Haven");
    assert_eq!(hitters_park, 1.15);
    assert_eq!(estimator.resolver().park_factor("Nowhere Field"), 1.0);

    let at = |park_factor| {
        estimator
            .estimate(
                "Power Bat",
                "Homer Prone",
                MatchupContext {
                    park_factor,
                    batter_handedness: Handedness::Right,
                    pitcher_handedness: Handedness::Right,
                },
                &Weights::default(),
            )
            .probability()
    };
    assert!(at(hitters_park) >= at(1.0));
    assert!(at(1.0) >= at(0.85));
}

// ===========================================================================
// Slate projection
// ===========================================================================

#[tokio::test]
async fn slate_file_projects_ranked_batters() {
    let config = inline_config();
    let games = SlateFile::new(&config.schedule.slate_path)
        .get_todays_games()
        .await
        .expect("fixture slate should load");
    assert_eq!(games.len(), 2);

    let slate = fixture_estimator().project_games(&games, &Weights::default());
    assert_eq!(slate.projections.len(), 5);
    assert_eq!(slate.invalid_scores, 0);
    assert!(!slate.rescaled);
    for pair in slate.projections.windows(2) {
        assert!(pair[0].raw_probability >= pair[1].raw_probability);
    }
    for p in &slate.projections {
        assert_eq!(p.probability, p.raw_probability);
        assert!(p.probability >= 0.02 && p.probability <= 1.0);
    }

    let slap = slate
        .projections
        .iter()
        .find(|p| p.name == "Slap Hitter")
        .unwrap();
    assert_eq!(slap.opponent_pitcher, "TBD");
    assert_eq!(slap.throws, Handedness::Right);
    assert_eq!(slap.bats, Handedness::Left);
    assert_eq!(slap.park_factor, 1.15);

    let prospect = slate
        .projections
        .iter()
        .find(|p| p.name == "Unknown Prospect")
        .unwrap();
    assert_eq!(prospect.opponent_pitcher, "Ground Baller");
    assert!(!prospect.league_average);

    let road_power = slate
        .projections
        .iter()
        .find(|p| p.name == "Power Bat" && p.team == "Pitcher Park")
        .unwrap();
    assert_eq!(road_power.opponent_pitcher, "TBD");
    assert_eq!(road_power.park_factor, 0.85);
}

#[tokio::test]
async fn saved_profile_changes_projections() {
    let config = inline_config();
    let games = SlateFile::new(&config.schedule.slate_path)
        .get_todays_games()
        .await
        .unwrap();

    let store = WeightStore::open(&config.store.path).unwrap();
    let park_heavy = Weights {
        park_factor: 1.0,
        ..Weights::default()
    };
    store.save_weights("tester", "parks", &park_heavy).unwrap();
    let profiles = store.get_weights("tester").unwrap();
    assert_eq!(profiles.len(), 1);

    let estimator = fixture_estimator();
    let base = estimator.project_games(&games, &Weights::default());
    let tuned = estimator.project_games(&games, &profiles[0].weights);

    let prob = |slate: &SlateProjection| {
        slate
            .projections
            .iter()
            .find(|p| p.name == "Power Bat" && p.team == "Hitter Haven")
            .map(|p| p.raw_probability)
            .unwrap()
    };
    assert!(prob(&tuned) > prob(&base));
}
