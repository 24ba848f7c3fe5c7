// Input resolver: turns a player name plus handedness into a scoring profile.
//
// Lookups run an ordered chain of name strategies against each table, and
// anything still unresolved falls back to league-average constants. Missing
// data is a normal outcome here, never an error.

use crate::config::ResolverConfig;
use crate::model::{league_avg, BatterProfile, Handedness, PitcherProfile, NEUTRAL_PARK};
use crate::tables::{BatterSplit, NameIndex, PitcherSplit, ReferenceTables, StatcastBatter, StatcastPitcher};
use std::sync::Arc;
use tracing::debug;

/// Sentinel for an undetermined starting pitcher.
pub const TBD_PITCHER: &str = "TBD";

// ---------------------------------------------------------------------------
// Name strategies
// ---------------------------------------------------------------------------

/// One way of rewriting a player name before looking it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStrategy {
    /// The name exactly as given (trimmed).
    Exact,
    /// `"Judge, Aaron"` -> `"Aaron Judge"`.
    LastFirstToFirstLast,
    /// `"Aaron Judge"` -> `"Judge, Aaron"`.
    FirstLastToLastFirst,
}

impl NameStrategy {
    /// The default chain, tried in order until one yields a hit.
    pub const DEFAULT_CHAIN: [NameStrategy; 3] = [
        NameStrategy::Exact,
        NameStrategy::LastFirstToFirstLast,
        NameStrategy::FirstLastToLastFirst,
    ];

    /// The lookup key this strategy produces for `name`, or `None` when the
    /// strategy does not apply to this name shape.
    pub fn candidate(self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        match self {
            NameStrategy::Exact => Some(name.to_string()),
            NameStrategy::LastFirstToFirstLast => {
                let (last, first) = name.split_once(", ")?;
                let (last, first) = (last.trim(), first.trim());
                (!last.is_empty() && !first.is_empty()).then(|| format!("{first} {last}"))
            }
            NameStrategy::FirstLastToLastFirst => {
                if name.contains(',') {
                    return None;
                }
                let (first, last) = name.split_once(char::is_whitespace)?;
                let last = last.trim();
                (!last.is_empty()).then(|| format!("{last}, {first}"))
            }
        }
    }
}

/// Run `chain` against `index`; the first strategy whose rewritten name is
/// present wins.
fn lookup<'t, T>(
    index: &'t NameIndex<T>,
    name: &str,
    chain: &[NameStrategy],
) -> Option<(&'t T, NameStrategy)> {
    chain.iter().find_map(|strategy| {
        let key = strategy.candidate(name)?;
        index.get(&key).map(|row| (row, *strategy))
    })
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

/// Which strategy located the player in each table it was searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchSource {
    pub split: Option<NameStrategy>,
    pub statcast: Option<NameStrategy>,
}

impl MatchSource {
    /// True when the player was not found anywhere and the profile is pure
    /// league average.
    pub fn is_league_average(&self) -> bool {
        self.split.is_none() && self.statcast.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub profile: T,
    pub source: MatchSource,
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Finite and non-negative, else the fallback.
fn rate_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(fallback)
}

/// Finite and strictly positive, else the fallback.
fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(fallback)
}

/// `numerator / denominator`, or the fallback when the denominator is zero,
/// absent or non-finite.
fn ratio_or(numerator: Option<f64>, denominator: Option<f64>, scale: f64, fallback: f64) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => rate_or(Some(n * scale / d), fallback),
        _ => fallback,
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves names against an injected, read-only [`ReferenceTables`].
#[derive(Debug, Clone)]
pub struct Resolver {
    tables: Arc<ReferenceTables>,
    config: ResolverConfig,
    chain: Vec<NameStrategy>,
}

impl Resolver {
    pub fn new(tables: Arc<ReferenceTables>, config: ResolverConfig) -> Self {
        Self {
            tables,
            config,
            chain: NameStrategy::DEFAULT_CHAIN.to_vec(),
        }
    }

    /// Replace the name strategy chain.
    pub fn with_chain(mut self, chain: Vec<NameStrategy>) -> Self {
        self.chain = chain;
        self
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    /// Batter profile against a pitcher throwing with `pitcher_hand`.
    pub fn resolve_batter(
        &self,
        name: &str,
        batter_hand: Handedness,
        pitcher_hand: Handedness,
    ) -> BatterProfile {
        self.resolve_batter_detailed(name, batter_hand, pitcher_hand).profile
    }

    pub fn resolve_batter_detailed(
        &self,
        name: &str,
        batter_hand: Handedness,
        pitcher_hand: Handedness,
    ) -> Resolved<BatterProfile> {
        let splits = match pitcher_hand {
            Handedness::Left => &self.tables.batters_vs_left,
            Handedness::Right => &self.tables.batters_vs_right,
        };
        let split = lookup(splits, name, &self.chain);
        let statcast = lookup(&self.tables.statcast_batters, name, &self.chain);

        let source = MatchSource {
            split: split.map(|(_, s)| s),
            statcast: statcast.map(|(_, s)| s),
        };
        if source.is_league_average() {
            debug!("batter '{name}' ({batter_hand} vs {pitcher_hand}P) not found; using league averages");
        } else {
            debug!("batter '{name}' ({batter_hand} vs {pitcher_hand}P) resolved: {source:?}");
        }

        let split = split.map(|(row, _)| row).cloned().unwrap_or_default();
        let statcast = statcast.map(|(row, _)| row).cloned().unwrap_or_default();
        Resolved {
            profile: self.batter_profile(&split, &statcast),
            source,
        }
    }

    fn batter_profile(&self, split: &BatterSplit, statcast: &StatcastBatter) -> BatterProfile {
        let units = self.config.batted_ball_units;
        BatterProfile {
            home_run_rate_per_pa: ratio_or(split.hr, split.pa, 1.0, league_avg::HR_PER_PA),
            barrel_rate_pct: rate_or(statcast.barrel_rate, league_avg::BARREL_RATE_PCT),
            hard_hit_rate_pct: rate_or(statcast.hard_hit_rate, league_avg::HARD_HIT_RATE_PCT),
            avg_exit_velocity_mph: positive_or(statcast.exit_velocity, league_avg::EXIT_VELOCITY_MPH),
            avg_launch_angle_deg: statcast
                .launch_angle
                .filter(|v| v.is_finite())
                .unwrap_or(league_avg::LAUNCH_ANGLE_DEG),
            fly_ball_rate_pct: rate_or(
                split.fly_ball.map(|v| units.to_fraction(v)),
                league_avg::FLY_BALL_RATE,
            ),
            pull_rate_pct: rate_or(split.pull.map(|v| units.to_fraction(v)), league_avg::PULL_RATE),
            home_run_per_fly_ball_rate: rate_or(
                split.hr_per_fb.map(|v| units.to_fraction(v)),
                league_avg::HR_PER_FB,
            ),
            isolated_power: rate_or(split.iso, league_avg::ISO),
            expected_home_runs: rate_or(statcast.expected_hr, 0.0),
            recent_home_runs: rate_or(statcast.recent_hr, 0.0).round() as u32,
        }
    }

    /// Pitcher profile against a batter hitting from `batter_hand`.
    /// `"TBD"` (or a blank name) goes straight to league averages.
    pub fn resolve_pitcher(&self, name: &str, batter_hand: Handedness) -> PitcherProfile {
        self.resolve_pitcher_detailed(name, batter_hand).profile
    }

    pub fn resolve_pitcher_detailed(
        &self,
        name: &str,
        batter_hand: Handedness,
    ) -> Resolved<PitcherProfile> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(TBD_PITCHER) {
            debug!("pitcher is TBD; using league averages");
            return Resolved {
                profile: PitcherProfile::league_average(),
                source: MatchSource::default(),
            };
        }

        let splits = match batter_hand {
            Handedness::Left => &self.tables.pitchers_vs_left,
            Handedness::Right => &self.tables.pitchers_vs_right,
        };
        let split = lookup(splits, trimmed, &self.chain);
        let statcast = lookup(&self.tables.statcast_pitchers, trimmed, &self.chain);

        let source = MatchSource {
            split: split.map(|(_, s)| s),
            statcast: statcast.map(|(_, s)| s),
        };
        if source.is_league_average() {
            debug!("pitcher '{trimmed}' (vs {batter_hand}HB) not found; using league averages");
        } else {
            debug!("pitcher '{trimmed}' (vs {batter_hand}HB) resolved: {source:?}");
        }

        let split = split.map(|(row, _)| row).cloned().unwrap_or_default();
        let statcast = statcast.map(|(row, _)| row).cloned().unwrap_or_default();
        Resolved {
            profile: self.pitcher_profile(&split, &statcast),
            source,
        }
    }

    fn pitcher_profile(&self, split: &PitcherSplit, statcast: &StatcastPitcher) -> PitcherProfile {
        let units = self.config.batted_ball_units;
        let derived_hr_9 = ratio_or(split.hr, split.ip, 9.0, league_avg::PITCHER_HR_PER_9);
        PitcherProfile {
            home_runs_per_nine_innings: rate_or(split.hr_per_9, derived_hr_9),
            barrel_rate_pct: rate_or(statcast.barrel_rate, league_avg::PITCHER_BARREL_RATE_PCT),
            fly_ball_rate_pct: rate_or(
                split.fly_ball.map(|v| units.to_fraction(v)),
                league_avg::PITCHER_FLY_BALL_RATE,
            ),
            ground_ball_rate_pct: Some(rate_or(
                split.ground_ball.map(|v| units.to_fraction(v)),
                league_avg::PITCHER_GROUND_BALL_RATE,
            )),
        }
    }

    /// Park factor as a ratio (1.0 neutral) for the home team's park.
    pub fn park_factor(&self, home_team: &str) -> f64 {
        let published = self.tables.park_factors.get(home_team.trim()).copied();
        positive_or(
            published.map(|v| self.config.park_factor_scale.to_ratio(v)),
            NEUTRAL_PARK,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BattedBallUnits, ParkFactorScale};
    use crate::tables::{RawTables, TableRecord};
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<TableRecord> {
        value
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .filter_map(TableRecord::from_json)
            .collect()
    }

    fn fixture_tables() -> RawTables {
        RawTables {
            batters_vs_left: records(json!([
                { "Name_1": "Aaron Judge", "PA": 160, "HR": 16, "ISO": 0.350, "HR/FB": 0.30, "FB%": 0.45, "Pull%": 0.48 },
                { "Name_1": "Zero Pa", "PA": 0, "HR": 0 }
            ])),
            batters_vs_right: records(json!([
                { "Name_1": "Aaron Judge", "PA": 500, "HR": 40, "ISO": 0.320, "HR/FB": 0.28, "FB%": 0.44, "Pull%": 0.46 },
                { "Name_1": "Juan Soto", "PA": 480, "HR": 28, "ISO": 0.260 }
            ])),
            pitchers_vs_left: records(json!([
                { "Name_1": "Gerrit Cole", "HR/9": 1.4, "FB%": 0.40, "GB%": 0.38 },
                { "Name_1": "No Innings", "HR": 3, "IP": 0 }
            ])),
            pitchers_vs_right: records(json!([
                { "Name_1": "Gerrit Cole", "HR/9": 0.9, "FB%": 0.36 },
                { "Name_1": "Derived Rate", "HR": 10, "IP": 90 }
            ])),
            statcast_batters: records(json!([
                { "player_name": "Judge, Aaron", "barrel_rate": 24.0, "hard_hit_percent": 60.0,
                  "exit_velocity": 96.0, "launch_angle": 17.0, "xhr": 48.0, "recent_hr": 5 }
            ])),
            statcast_pitchers: records(json!([
                { "last_name, first_name": "Cole, Gerrit", "barrel_rate": 6.5 }
            ])),
            park_factors: records(json!([
                { "Team": "New York Yankees", "Park Factor": 1.08 },
                { "Team": "Bad Park", "Park Factor": -1.0 }
            ])),
        }
    }

    fn resolver() -> Resolver {
        let tables = ReferenceTables::from_records(&fixture_tables());
        Resolver::new(Arc::new(tables), ResolverConfig::default())
    }

    // -- Name strategies --

    #[test]
    fn last_first_is_reversed() {
        assert_eq!(
            NameStrategy::LastFirstToFirstLast.candidate("Judge, Aaron").as_deref(),
            Some("Aaron Judge")
        );
        assert_eq!(
            NameStrategy::LastFirstToFirstLast.candidate("De La Cruz, Elly").as_deref(),
            Some("Elly De La Cruz")
        );
        assert_eq!(NameStrategy::LastFirstToFirstLast.candidate("Aaron Judge"), None);
    }

    #[test]
    fn first_last_is_reversed() {
        assert_eq!(
            NameStrategy::FirstLastToLastFirst.candidate("Aaron Judge").as_deref(),
            Some("Judge, Aaron")
        );
        assert_eq!(
            NameStrategy::FirstLastToLastFirst.candidate("Vladimir Guerrero Jr.").as_deref(),
            Some("Guerrero Jr., Vladimir")
        );
        assert_eq!(NameStrategy::FirstLastToLastFirst.candidate("Judge, Aaron"), None);
        assert_eq!(NameStrategy::FirstLastToLastFirst.candidate("Ichiro"), None);
    }

    #[test]
    fn blank_names_have_no_candidates() {
        for strategy in NameStrategy::DEFAULT_CHAIN {
            assert_eq!(strategy.candidate("   "), None);
        }
    }

    // -- Batters --

    #[test]
    fn batter_uses_split_for_pitcher_hand() {
        let r = resolver();
        let vs_left = r.resolve_batter("Aaron Judge", Handedness::Right, Handedness::Left);
        let vs_right = r.resolve_batter("Aaron Judge", Handedness::Right, Handedness::Right);
        assert!((vs_left.home_run_rate_per_pa - 0.1).abs() < 1e-12);
        assert!((vs_right.home_run_rate_per_pa - 0.08).abs() < 1e-12);
        assert!((vs_left.isolated_power - 0.350).abs() < 1e-12);
    }

    #[test]
    fn batter_joins_statcast_row_in_other_name_format() {
        let resolved = resolver().resolve_batter_detailed("Aaron Judge", Handedness::Right, Handedness::Right);
        assert_eq!(resolved.source.split, Some(NameStrategy::Exact));
        assert_eq!(resolved.source.statcast, Some(NameStrategy::FirstLastToLastFirst));
        assert!((resolved.profile.barrel_rate_pct - 24.0).abs() < 1e-12);
        assert!((resolved.profile.avg_exit_velocity_mph - 96.0).abs() < 1e-12);
        assert!((resolved.profile.expected_home_runs - 48.0).abs() < 1e-12);
        assert_eq!(resolved.profile.recent_home_runs, 5);
    }

    #[test]
    fn name_format_fallback_is_symmetric() {
        let r = resolver();
        let a = r.resolve_batter("Judge, Aaron", Handedness::Right, Handedness::Right);
        let b = r.resolve_batter("Aaron Judge", Handedness::Right, Handedness::Right);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_batter_gets_league_average() {
        let resolved = resolver().resolve_batter_detailed("Nobody Special", Handedness::Left, Handedness::Right);
        assert!(resolved.source.is_league_average());
        assert_eq!(resolved.profile, BatterProfile::league_average());
    }

    #[test]
    fn zero_plate_appearances_fall_back_to_league_rate() {
        let p = resolver().resolve_batter("Zero Pa", Handedness::Left, Handedness::Left);
        assert!(p.home_run_rate_per_pa.is_finite());
        assert_eq!(p.home_run_rate_per_pa, league_avg::HR_PER_PA);
    }

    #[test]
    fn partial_split_row_fills_missing_fields() {
        let p = resolver().resolve_batter("Juan Soto", Handedness::Left, Handedness::Right);
        assert!((p.isolated_power - 0.260).abs() < 1e-12);
        assert_eq!(p.fly_ball_rate_pct, league_avg::FLY_BALL_RATE);
        assert_eq!(p.barrel_rate_pct, league_avg::BARREL_RATE_PCT);
    }

    #[test]
    fn percent_units_are_converted_to_fractions() {
        let mut raw = fixture_tables();
        raw.batters_vs_right = records(json!([
            { "Name_1": "Aaron Judge", "PA": 500, "HR": 40, "HR/FB": 28.0, "FB%": 44.0, "Pull%": 46.0 }
        ]));
        let config = ResolverConfig {
            batted_ball_units: BattedBallUnits::Percent,
            ..ResolverConfig::default()
        };
        let r = Resolver::new(Arc::new(ReferenceTables::from_records(&raw)), config);
        let p = r.resolve_batter("Aaron Judge", Handedness::Right, Handedness::Right);
        assert!((p.fly_ball_rate_pct - 0.44).abs() < 1e-12);
        assert!((p.pull_rate_pct - 0.46).abs() < 1e-12);
        assert!((p.home_run_per_fly_ball_rate - 0.28).abs() < 1e-12);
    }

    #[test]
    fn exact_only_chain_skips_reformatting() {
        let r = resolver().with_chain(vec![NameStrategy::Exact]);
        let resolved = r.resolve_batter_detailed("Judge, Aaron", Handedness::Right, Handedness::Right);
        assert_eq!(resolved.source.split, None);
        assert_eq!(resolved.source.statcast, Some(NameStrategy::Exact));
    }

    // -- Pitchers --

    #[test]
    fn tbd_pitcher_is_league_average_for_either_hand() {
        let r = resolver();
        for hand in [Handedness::Left, Handedness::Right] {
            assert_eq!(r.resolve_pitcher(TBD_PITCHER, hand), PitcherProfile::league_average());
            assert_eq!(r.resolve_pitcher(" tbd ", hand), PitcherProfile::league_average());
            assert_eq!(r.resolve_pitcher("", hand), PitcherProfile::league_average());
        }
    }

    #[test]
    fn pitcher_uses_split_for_batter_hand() {
        let r = resolver();
        let vs_left = r.resolve_pitcher("Gerrit Cole", Handedness::Left);
        let vs_right = r.resolve_pitcher("Gerrit Cole", Handedness::Right);
        assert!((vs_left.home_runs_per_nine_innings - 1.4).abs() < 1e-12);
        assert!((vs_right.home_runs_per_nine_innings - 0.9).abs() < 1e-12);
        assert_eq!(vs_left.ground_ball_rate_pct, Some(0.38));
        assert!((vs_left.barrel_rate_pct - 6.5).abs() < 1e-12);
    }

    #[test]
    fn pitcher_hr_9_is_derived_when_not_published() {
        let p = resolver().resolve_pitcher("Derived Rate", Handedness::Right);
        assert!((p.home_runs_per_nine_innings - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_innings_fall_back_to_league_rate() {
        let p = resolver().resolve_pitcher("No Innings", Handedness::Left);
        assert_eq!(p.home_runs_per_nine_innings, league_avg::PITCHER_HR_PER_9);
    }

    // -- Parks --

    #[test]
    fn park_factor_lookup_and_fallbacks() {
        let r = resolver();
        assert!((r.park_factor("New York Yankees") - 1.08).abs() < 1e-12);
        assert_eq!(r.park_factor("Unknown Team"), NEUTRAL_PARK);
        assert_eq!(r.park_factor("Bad Park"), NEUTRAL_PARK);
    }

    #[test]
    fn index_scale_park_factors_become_ratios() {
        let mut raw = fixture_tables();
        raw.park_factors = records(json!([{ "Team": "Colorado Rockies", "Park Factor": 112 }]));
        let config = ResolverConfig {
            park_factor_scale: ParkFactorScale::Index,
            ..ResolverConfig::default()
        };
        let r = Resolver::new(Arc::new(ReferenceTables::from_records(&raw)), config);
        assert!((r.park_factor("Colorado Rockies") - 1.12).abs() < 1e-12);
    }
}
