// Weighted-sum home-run probability scorer.

use crate::config::{validate_scoring, ConfigError, ScoringConfig};
use crate::model::{BatterProfile, PitcherProfile};
use crate::weights::{Signal, Weights};
use tracing::warn;

// ---------------------------------------------------------------------------
// Normalization references
// ---------------------------------------------------------------------------

/// Exit velocity (mph) that maps to 1.0.
pub const EXIT_VELO_REFERENCE: f64 = 95.0;
/// Launch angle (degrees) that maps to 1.0.
pub const LAUNCH_ANGLE_REFERENCE: f64 = 25.0;
/// Pitcher HR/9 that maps to 1.0.
pub const HR_PER_9_REFERENCE: f64 = 2.0;

/// Each signal's input on the scale its weight applies to.
fn normalized_signal(
    signal: Signal,
    batter: &BatterProfile,
    pitcher: &PitcherProfile,
    park_factor: f64,
) -> f64 {
    match signal {
        Signal::HrRate => batter.home_run_rate_per_pa,
        Signal::BarrelRate => batter.barrel_rate_pct / 100.0,
        Signal::HardHitRate => batter.hard_hit_rate_pct / 100.0,
        Signal::ExitVelo => batter.avg_exit_velocity_mph / EXIT_VELO_REFERENCE,
        Signal::LaunchAngle => batter.avg_launch_angle_deg / LAUNCH_ANGLE_REFERENCE,
        Signal::FlyBallRate => batter.fly_ball_rate_pct,
        Signal::PullRate => batter.pull_rate_pct,
        Signal::HrFbRate => batter.home_run_per_fly_ball_rate,
        Signal::ExpectedHr => batter.expected_home_runs,
        Signal::Iso => batter.isolated_power,
        Signal::RecentHrs => f64::from(batter.recent_home_runs),
        Signal::PitcherHr9 => pitcher.home_runs_per_nine_innings / HR_PER_9_REFERENCE,
        Signal::PitcherBarrelRate => pitcher.barrel_rate_pct / 100.0,
        Signal::PitcherFbRate => pitcher.fly_ball_rate_pct,
        Signal::ParkFactor => park_factor - 1.0,
    }
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// One leg of the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub signal: Signal,
    pub input: f64,
    pub weight: f64,
    pub value: f64,
}

/// Full audit trail of a single score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub contributions: Vec<Contribution>,
    /// Sum of all contributions before any guarding.
    pub raw_sum: f64,
    /// Final bounded probability.
    pub probability: f64,
    /// The raw sum was not finite and `invalid_default` was returned.
    pub substituted: bool,
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Pure function of its inputs: no state, no randomness.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

impl Scorer {
    /// Fails unless `0 <= floor < ceiling` and the invalid default lies
    /// within the bounds.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        validate_scoring(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Probability in `[floor, ceiling]`.
    pub fn score(
        &self,
        batter: &BatterProfile,
        pitcher: &PitcherProfile,
        park_factor: f64,
        weights: &Weights,
    ) -> f64 {
        self.score_breakdown(batter, pitcher, park_factor, weights)
            .probability
    }

    pub fn score_breakdown(
        &self,
        batter: &BatterProfile,
        pitcher: &PitcherProfile,
        park_factor: f64,
        weights: &Weights,
    ) -> ScoreBreakdown {
        let contributions: Vec<Contribution> = weights
            .iter()
            .map(|(signal, weight)| {
                let input = normalized_signal(signal, batter, pitcher, park_factor);
                Contribution {
                    signal,
                    input,
                    weight,
                    value: input * weight,
                }
            })
            .collect();
        let raw_sum: f64 = contributions.iter().map(|c| c.value).sum();

        if !raw_sum.is_finite() {
            let culprits: Vec<String> = contributions
                .iter()
                .filter(|c| !c.value.is_finite())
                .map(|c| format!("{}={}x{}", c.signal, c.input, c.weight))
                .collect();
            warn!(
                target: "longball::data_quality",
                "non-finite HR score ({raw_sum}); substituting {} [{}]",
                self.config.invalid_default,
                culprits.join(", ")
            );
            return ScoreBreakdown {
                contributions,
                raw_sum,
                probability: self.config.invalid_default,
                substituted: true,
            };
        }

        ScoreBreakdown {
            contributions,
            raw_sum,
            probability: raw_sum.max(self.config.floor).min(self.config.ceiling),
            substituted: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
