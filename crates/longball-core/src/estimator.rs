// Slate projection: resolve every lineup batter against the opposing
// starter, score, rank and normalize.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::model::{Handedness, MatchupContext};
use crate::normalize::normalize;
use crate::resolver::{MatchSource, Resolver, TBD_PITCHER};
use crate::schedule::{Game, TeamSlate};
use crate::scorer::{ScoreBreakdown, Scorer};
use crate::tables::{ReferenceTables, TableError};
use crate::weights::Weights;

/// One batter's projected chance of homering today.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub name: String,
    pub team: String,
    pub opponent_pitcher: String,
    pub bats: Handedness,
    pub throws: Handedness,
    pub park_factor: f64,
    /// After batch normalization.
    pub probability: f64,
    /// Straight from the scorer.
    pub raw_probability: f64,
    /// Neither the batter nor the pitcher matched any reference row.
    pub league_average: bool,
}

/// Ranked projections for a whole slate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlateProjection {
    pub projections: Vec<Projection>,
    /// Scores replaced by the invalid default because the sum was not finite.
    pub invalid_scores: usize,
    /// The batch was rescaled because some raw score exceeded 1.0.
    pub rescaled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tables(#[from] TableError),
}

/// Single-matchup result with its audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupEstimate {
    pub breakdown: ScoreBreakdown,
    pub batter_source: MatchSource,
    pub pitcher_source: MatchSource,
}

impl MatchupEstimate {
    pub fn probability(&self) -> f64 {
        self.breakdown.probability
    }
}

pub struct Estimator {
    resolver: Resolver,
    scorer: Scorer,
}

impl Estimator {
    /// Fails when the scoring bounds are invalid.
    pub fn new(tables: Arc<ReferenceTables>, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::from_parts(
            Resolver::new(tables, config.resolver),
            Scorer::new(config.scoring)?,
        ))
    }

    pub fn from_parts(resolver: Resolver, scorer: Scorer) -> Self {
        Self { resolver, scorer }
    }

    /// Load the reference tables named in `config` and build an estimator.
    /// Fails when the platoon-split tables are unavailable, so no
    /// probability is ever produced without reference data.
    pub fn load(config: &Config) -> Result<Self, EstimatorError> {
        let tables = ReferenceTables::load(config)?;
        Ok(Self::new(Arc::new(tables), config)?)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Score one batter against one pitcher.
    pub fn estimate(
        &self,
        batter: &str,
        pitcher: &str,
        context: MatchupContext,
        weights: &Weights,
    ) -> MatchupEstimate {
        let batter = self.resolver.resolve_batter_detailed(
            batter,
            context.batter_handedness,
            context.pitcher_handedness,
        );
        let pitcher = self
            .resolver
            .resolve_pitcher_detailed(pitcher, context.batter_handedness);
        let breakdown = self.scorer.score_breakdown(
            &batter.profile,
            &pitcher.profile,
            context.park_factor,
            weights,
        );
        MatchupEstimate {
            breakdown,
            batter_source: batter.source,
            pitcher_source: pitcher.source,
        }
    }

    /// Project every lineup batter on the slate against the opposing starter.
    pub fn project_games(&self, games: &[Game], weights: &Weights) -> SlateProjection {
        let mut projections = Vec::new();
        let mut invalid_scores = 0;

        for game in games {
            let park_factor = self.resolver.park_factor(&game.home.name);
            for (batting, fielding) in [(&game.home, &game.away), (&game.away, &game.home)] {
                self.project_side(batting, fielding, park_factor, weights, &mut projections, &mut invalid_scores);
            }
        }

        // Stable: ties keep lineup order.
        projections.sort_by(|a, b| b.raw_probability.total_cmp(&a.raw_probability));

        let scores: Vec<(usize, f64)> = projections
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.raw_probability))
            .collect();
        let mut rescaled = false;
        for (i, probability) in normalize(scores) {
            let p = &mut projections[i];
            rescaled |= probability != p.raw_probability;
            p.probability = probability;
        }

        if invalid_scores > 0 {
            warn!(
                target: "longball::data_quality",
                "{invalid_scores} of {} scores were not finite and used the default",
                projections.len()
            );
        }
        info!(
            "Projected {} batters across {} games{}",
            projections.len(),
            games.len(),
            if rescaled { " (rescaled)" } else { "" }
        );

        SlateProjection {
            projections,
            invalid_scores,
            rescaled,
        }
    }

    fn project_side(
        &self,
        batting: &TeamSlate,
        fielding: &TeamSlate,
        park_factor: f64,
        weights: &Weights,
        out: &mut Vec<Projection>,
        invalid_scores: &mut usize,
    ) {
        let (pitcher, throws) = match &fielding.starting_pitcher {
            Some(sp) => (sp.name.as_str(), sp.throws.unwrap_or(Handedness::Right)),
            None => (TBD_PITCHER, Handedness::Right),
        };

        for player in &batting.lineup {
            let bats = player
                .bats
                .map(|b| b.against(throws))
                .unwrap_or(Handedness::Right);
            let context = MatchupContext {
                park_factor,
                batter_handedness: bats,
                pitcher_handedness: throws,
            };
            let estimate = self.estimate(&player.name, pitcher, context, weights);
            if estimate.breakdown.substituted {
                *invalid_scores += 1;
            }
            let probability = estimate.probability();
            out.push(Projection {
                name: player.name.clone(),
                team: batting.name.clone(),
                opponent_pitcher: pitcher.to_string(),
                bats,
                throws,
                park_factor,
                probability,
                raw_probability: probability,
                league_average: estimate.batter_source.is_league_average()
                    && estimate.pitcher_source.is_league_average(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResolverConfig, ScoringConfig};
    use crate::schedule::{Bats, LineupPlayer, StartingPitcher};
    use crate::tables::{RawTables, TableRecord};
    use serde_json::json;

    fn record(value: serde_json::Value) -> TableRecord {
        TableRecord::from_json(value).unwrap()
    }

    fn tables() -> Arc<ReferenceTables> {
        let slugger = || record(json!({"Name": "Aaron Judge", "PA": 200, "HR": 16, "ISO": 0.35, "FB%": 0.45, "Pull%": 0.48, "HR/FB": 0.30}));
        let contact = || record(json!({"Name": "Luis Arraez", "PA": 200, "HR": 1, "ISO": 0.08, "FB%": 0.25, "Pull%": 0.30, "HR/FB": 0.02}));
        let raw = RawTables {
            batters_vs_left: vec![slugger(), contact()],
            batters_vs_right: vec![slugger(), contact()],
            pitchers_vs_left: vec![record(json!({"Name": "Chris Sale", "HR/9": 0.8, "FB%": 0.33}))],
            pitchers_vs_right: vec![record(json!({"Name": "Chris Sale", "HR/9": 1.0, "FB%": 0.35}))],
            statcast_batters: vec![record(json!({"player_name": "Judge, Aaron", "barrel_rate": 22.0, "hard_hit_percent": 58.0, "exit_velocity": 95.5, "launch_angle": 18.0}))],
            statcast_pitchers: vec![],
            park_factors: vec![record(json!({"Team": "New York Yankees", "Park Factor": 1.1}))],
        };
        Arc::new(ReferenceTables::from_records(&raw))
    }

    fn estimator() -> Estimator {
        Estimator::from_parts(
            Resolver::new(tables(), ResolverConfig::default()),
            Scorer::new(ScoringConfig::default()).unwrap(),
        )
    }

    fn player(name: &str, bats: Option<Bats>) -> LineupPlayer {
        LineupPlayer {
            id: None,
            name: name.into(),
            bats,
        }
    }

    fn game() -> Game {
        Game {
            id: "g1".into(),
            start_time: None,
            home: TeamSlate {
                id: None,
                name: "New York Yankees".into(),
                lineup: vec![player("Aaron Judge", Some(Bats::Right))],
                starting_pitcher: Some(StartingPitcher {
                    id: None,
                    name: "Gerrit Cole".into(),
                    throws: Some(Handedness::Right),
                }),
            },
            away: TeamSlate {
                id: None,
                name: "Miami Marlins".into(),
                lineup: vec![player("Luis Arraez", Some(Bats::Left)), player("Nobody Known", Some(Bats::Switch))],
                starting_pitcher: None,
            },
        }
    }

    #[test]
    fn slate_is_ranked_by_probability() {
        let slate = estimator().project_games(&[game()], &Weights::default());
        let names: Vec<&str> = slate.projections.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "Aaron Judge");
        for pair in slate.projections.windows(2) {
            assert!(pair[0].raw_probability >= pair[1].raw_probability);
        }
        assert_eq!(slate.invalid_scores, 0);
        assert!(!slate.rescaled);
    }

    #[test]
    fn missing_starter_is_tbd_right_handed() {
        let slate = estimator().project_games(&[game()], &Weights::default());
        let judge = slate.projections.iter().find(|p| p.name == "Aaron Judge").unwrap();
        assert_eq!(judge.opponent_pitcher, "TBD");
        assert_eq!(judge.throws, Handedness::Right);
    }

    #[test]
    fn park_factor_is_the_home_teams() {
        let slate = estimator().project_games(&[game()], &Weights::default());
        assert!(slate.projections.iter().all(|p| (p.park_factor - 1.1).abs() < 1e-12));
    }

    #[test]
    fn switch_hitter_bats_opposite_the_pitcher() {
        let slate = estimator().project_games(&[game()], &Weights::default());
        let switch = slate.projections.iter().find(|p| p.name == "Nobody Known").unwrap();
        assert_eq!(switch.throws, Handedness::Right);
        assert_eq!(switch.bats, Handedness::Left);
        assert!(switch.league_average);
    }

    #[test]
    fn unknown_players_against_tbd_are_league_average() {
        let e = estimator();
        let est = e.estimate(
            "Nobody Known",
            "TBD",
            MatchupContext::neutral(Handedness::Right, Handedness::Right),
            &Weights::default(),
        );
        assert!(est.batter_source.is_league_average());
        assert!(est.pitcher_source.is_league_average());
        assert!(est.probability().is_finite());
    }

    #[test]
    fn statcast_row_found_through_name_reversal() {
        let est = estimator().estimate(
            "Aaron Judge",
            "Chris Sale",
            MatchupContext::neutral(Handedness::Right, Handedness::Left),
            &Weights::default(),
        );
        assert!(est.batter_source.statcast.is_some());
        assert!(est.pitcher_source.split.is_some());
        assert!((0.05..=0.25).contains(&est.probability()), "got {}", est.probability());
    }

    #[test]
    fn oversized_scores_are_rescaled_to_one() {
        let e = Estimator::from_parts(
            Resolver::new(tables(), ResolverConfig::default()),
            Scorer::new(ScoringConfig {
                ceiling: 3.0,
                ..ScoringConfig::default()
            })
            .unwrap(),
        );
        let w = Weights {
            hr_rate: 40.0,
            ..Weights::default()
        };
        let slate = e.project_games(&[game()], &w);
        assert!(slate.rescaled);
        assert!(slate.projections[0].raw_probability > 1.0);
        assert_eq!(slate.projections[0].probability, 1.0);
        assert!(slate.projections.iter().all(|p| p.probability <= 1.0));
    }

    #[test]
    fn non_finite_scores_are_counted() {
        let w = Weights {
            iso: f64::NAN,
            ..Weights::default()
        };
        let slate = estimator().project_games(&[game()], &w);
        assert_eq!(slate.invalid_scores, 3);
        assert!(slate.projections.iter().all(|p| p.probability == 0.03));
    }

    #[test]
    fn empty_slate_projects_nothing() {
        let slate = estimator().project_games(&[], &Weights::default());
        assert!(slate.projections.is_empty());
        assert_eq!(slate.invalid_scores, 0);
    }
}
