// Scoring weights: one coefficient per input signal, plus saved profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Every input the scorer weighs. Order matches the breakdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    HrRate,
    BarrelRate,
    HardHitRate,
    ExitVelo,
    LaunchAngle,
    FlyBallRate,
    PullRate,
    HrFbRate,
    ExpectedHr,
    Iso,
    RecentHrs,
    PitcherHr9,
    PitcherBarrelRate,
    PitcherFbRate,
    ParkFactor,
}

impl Signal {
    pub const ALL: [Signal; 15] = [
        Signal::HrRate,
        Signal::BarrelRate,
        Signal::HardHitRate,
        Signal::ExitVelo,
        Signal::LaunchAngle,
        Signal::FlyBallRate,
        Signal::PullRate,
        Signal::HrFbRate,
        Signal::ExpectedHr,
        Signal::Iso,
        Signal::RecentHrs,
        Signal::PitcherHr9,
        Signal::PitcherBarrelRate,
        Signal::PitcherFbRate,
        Signal::ParkFactor,
    ];

    /// Key used in serialized weights.
    pub fn key(self) -> &'static str {
        match self {
            Signal::HrRate => "hr_rate",
            Signal::BarrelRate => "barrel_rate",
            Signal::HardHitRate => "hard_hit_rate",
            Signal::ExitVelo => "exit_velo",
            Signal::LaunchAngle => "launch_angle",
            Signal::FlyBallRate => "fly_ball_rate",
            Signal::PullRate => "pull_rate",
            Signal::HrFbRate => "hr_fb_rate",
            Signal::ExpectedHr => "xhr",
            Signal::Iso => "iso",
            Signal::RecentHrs => "recent_hrs",
            Signal::PitcherHr9 => "pitcher_hr_9",
            Signal::PitcherBarrelRate => "pitcher_barrel_rate",
            Signal::PitcherFbRate => "pitcher_fb_rate",
            Signal::ParkFactor => "park_factor",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// One coefficient per [`Signal`]. The aliases accept the camel-cased keys
/// used by the dashboard's weight sliders (`HR_rate`, `BarrelRate`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(alias = "HR_rate")]
    pub hr_rate: f64,
    #[serde(alias = "BarrelRate")]
    pub barrel_rate: f64,
    #[serde(alias = "HardHitRate")]
    pub hard_hit_rate: f64,
    #[serde(alias = "ExitVelo")]
    pub exit_velo: f64,
    #[serde(alias = "LaunchAngle")]
    pub launch_angle: f64,
    #[serde(alias = "FlyBallRate")]
    pub fly_ball_rate: f64,
    #[serde(alias = "PullRate")]
    pub pull_rate: f64,
    #[serde(alias = "HR_FB_Rate")]
    pub hr_fb_rate: f64,
    #[serde(alias = "xHR")]
    pub xhr: f64,
    #[serde(alias = "ISO")]
    pub iso: f64,
    #[serde(alias = "RecentHRs")]
    pub recent_hrs: f64,
    #[serde(alias = "PitcherHR_9")]
    pub pitcher_hr_9: f64,
    #[serde(alias = "PitcherBarrelRate")]
    pub pitcher_barrel_rate: f64,
    #[serde(alias = "PitcherFBRate")]
    pub pitcher_fb_rate: f64,
    #[serde(alias = "ParkFactor")]
    pub park_factor: f64,
}

/// Default coefficients. Calibrated so a league-average batter against a
/// league-average starter in a neutral park lands near 15%, and a strong
/// power bat lands near 18-20%. `xhr` and `recent_hrs` multiply raw season
/// counts, hence the small coefficients.
impl Default for Weights {
    fn default() -> Self {
        Self {
            hr_rate: 0.60,
            barrel_rate: 0.10,
            hard_hit_rate: 0.05,
            exit_velo: 0.03,
            launch_angle: 0.02,
            fly_ball_rate: 0.03,
            pull_rate: 0.02,
            hr_fb_rate: 0.05,
            xhr: 0.001,
            iso: 0.08,
            recent_hrs: 0.002,
            pitcher_hr_9: 0.03,
            pitcher_barrel_rate: 0.05,
            pitcher_fb_rate: 0.02,
            park_factor: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("weight `{signal}` must be finite and >= 0, got {value}")]
    Invalid { signal: Signal, value: f64 },
}

impl Weights {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::HrRate => self.hr_rate,
            Signal::BarrelRate => self.barrel_rate,
            Signal::HardHitRate => self.hard_hit_rate,
            Signal::ExitVelo => self.exit_velo,
            Signal::LaunchAngle => self.launch_angle,
            Signal::FlyBallRate => self.fly_ball_rate,
            Signal::PullRate => self.pull_rate,
            Signal::HrFbRate => self.hr_fb_rate,
            Signal::ExpectedHr => self.xhr,
            Signal::Iso => self.iso,
            Signal::RecentHrs => self.recent_hrs,
            Signal::PitcherHr9 => self.pitcher_hr_9,
            Signal::PitcherBarrelRate => self.pitcher_barrel_rate,
            Signal::PitcherFbRate => self.pitcher_fb_rate,
            Signal::ParkFactor => self.park_factor,
        }
    }

    /// `(signal, coefficient)` pairs in [`Signal::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, f64)> + '_ {
        Signal::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Weights must be finite and non-negative before they can be saved.
    /// The scorer itself accepts anything and guards its output instead.
    pub fn validate(&self) -> Result<(), WeightError> {
        match self.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            Some((signal, value)) => Err(WeightError::Invalid { signal, value }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Saved profiles
// ---------------------------------------------------------------------------

/// A named set of weights owned by a user. Immutable once saved; a change
/// is saved as a new profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub weights: Weights,
    pub created_at: DateTime<Utc>,
}

impl WeightProfile {
    /// Name of the built-in profile every user starts with.
    pub const DEFAULT_NAME: &'static str = "default";

    /// The unsaved built-in profile for `user_id`.
    pub fn builtin(user_id: &str) -> Self {
        Self {
            id: Self::DEFAULT_NAME.into(),
            user_id: user_id.into(),
            name: Self::DEFAULT_NAME.into(),
            weights: Weights::default(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
