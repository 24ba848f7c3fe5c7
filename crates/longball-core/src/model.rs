// Scoring inputs: batter/pitcher profiles, matchup context, league averages.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// League-average constants
// ---------------------------------------------------------------------------

/// League-average values substituted whenever a field cannot be resolved.
pub mod league_avg {
    pub const HR_PER_PA: f64 = 0.035;
    pub const BARREL_RATE_PCT: f64 = 7.0;
    pub const HARD_HIT_RATE_PCT: f64 = 35.0;
    pub const EXIT_VELOCITY_MPH: f64 = 88.0;
    pub const LAUNCH_ANGLE_DEG: f64 = 12.0;
    pub const FLY_BALL_RATE: f64 = 0.35;
    pub const PULL_RATE: f64 = 0.40;
    pub const HR_PER_FB: f64 = 0.10;
    pub const ISO: f64 = 0.150;

    pub const PITCHER_HR_PER_9: f64 = 1.2;
    pub const PITCHER_BARREL_RATE_PCT: f64 = 7.0;
    pub const PITCHER_FLY_BALL_RATE: f64 = 0.35;
    pub const PITCHER_GROUND_BALL_RATE: f64 = 0.43;
}

/// Neutral park factor, used for parks missing from the park table.
pub const NEUTRAL_PARK: f64 = 1.0;

// ---------------------------------------------------------------------------
// Handedness
// ---------------------------------------------------------------------------

/// Batting side or throwing arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Handedness {
    /// Parse an MLB-style hand code ("L", "R", "Left", "right").
    /// Switch hitters ("S") and unknown codes return `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "L" | "LEFT" => Some(Handedness::Left),
            "R" | "RIGHT" => Some(Handedness::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Handedness::Left => "L",
            Handedness::Right => "R",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Per-batter snapshot fed to the scorer.
///
/// Units are fixed per field: `*_pct` fields holding Statcast rates
/// (barrel, hard-hit) are percents on a 0-100 scale, while the batted-ball
/// mix (fly-ball, pull, HR/FB) and HR/PA are fractions on a 0-1 scale.
/// Source tables that publish batted-ball rates as percents are converted by
/// the resolver before a profile is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatterProfile {
    /// Fraction, 0-1.
    pub home_run_rate_per_pa: f64,
    /// Percent, 0-100.
    pub barrel_rate_pct: f64,
    /// Percent, 0-100.
    pub hard_hit_rate_pct: f64,
    pub avg_exit_velocity_mph: f64,
    pub avg_launch_angle_deg: f64,
    /// Fraction, 0-1.
    pub fly_ball_rate_pct: f64,
    /// Fraction, 0-1.
    pub pull_rate_pct: f64,
    /// Fraction, 0-1.
    pub home_run_per_fly_ball_rate: f64,
    pub isolated_power: f64,
    #[serde(default)]
    pub expected_home_runs: f64,
    #[serde(default)]
    pub recent_home_runs: u32,
}

impl BatterProfile {
    /// A batter made entirely of league-average constants.
    pub fn league_average() -> Self {
        Self {
            home_run_rate_per_pa: league_avg::HR_PER_PA,
            barrel_rate_pct: league_avg::BARREL_RATE_PCT,
            hard_hit_rate_pct: league_avg::HARD_HIT_RATE_PCT,
            avg_exit_velocity_mph: league_avg::EXIT_VELOCITY_MPH,
            avg_launch_angle_deg: league_avg::LAUNCH_ANGLE_DEG,
            fly_ball_rate_pct: league_avg::FLY_BALL_RATE,
            pull_rate_pct: league_avg::PULL_RATE,
            home_run_per_fly_ball_rate: league_avg::HR_PER_FB,
            isolated_power: league_avg::ISO,
            expected_home_runs: 0.0,
            recent_home_runs: 0,
        }
    }
}

/// Per-pitcher snapshot fed to the scorer. Same unit convention as
/// [`BatterProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitcherProfile {
    pub home_runs_per_nine_innings: f64,
    /// Percent, 0-100.
    pub barrel_rate_pct: f64,
    /// Fraction, 0-1.
    pub fly_ball_rate_pct: f64,
    /// Fraction, 0-1. Not every split table publishes it.
    #[serde(default)]
    pub ground_ball_rate_pct: Option<f64>,
}

impl PitcherProfile {
    pub fn league_average() -> Self {
        Self {
            home_runs_per_nine_innings: league_avg::PITCHER_HR_PER_9,
            barrel_rate_pct: league_avg::PITCHER_BARREL_RATE_PCT,
            fly_ball_rate_pct: league_avg::PITCHER_FLY_BALL_RATE,
            ground_ball_rate_pct: Some(league_avg::PITCHER_GROUND_BALL_RATE),
        }
    }
}

/// Game-level context for a single batter/pitcher pairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupContext {
    /// 1.0 is neutral; above 1.0 favors hitters.
    pub park_factor: f64,
    pub batter_handedness: Handedness,
    pub pitcher_handedness: Handedness,
}

impl MatchupContext {
    pub fn neutral(batter_handedness: Handedness, pitcher_handedness: Handedness) -> Self {
        Self {
            park_factor: NEUTRAL_PARK,
            batter_handedness,
            pitcher_handedness,
        }
    }
}
