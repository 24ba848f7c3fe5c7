// Today's games: lineups and probable starters from a slate file or the
// MLB Stats API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, ScheduleSource};
use crate::model::Handedness;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Which side a batter hits from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bats {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "S")]
    Switch,
}

impl Bats {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "S" | "B" | "SWITCH" => Some(Bats::Switch),
            other => Handedness::from_code(other).map(Bats::from),
        }
    }

    /// The side actually used against a pitcher throwing with `throws`.
    /// Switch hitters take the opposite side.
    pub fn against(self, throws: Handedness) -> Handedness {
        match self {
            Bats::Left => Handedness::Left,
            Bats::Right => Handedness::Right,
            Bats::Switch => throws.opposite(),
        }
    }
}

impl From<Handedness> for Bats {
    fn from(hand: Handedness) -> Self {
        match hand {
            Handedness::Left => Bats::Left,
            Handedness::Right => Bats::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPlayer {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// `None` when the source did not publish a batting side.
    #[serde(default, deserialize_with = "de_bats")]
    pub bats: Option<Bats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingPitcher {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, deserialize_with = "de_hand")]
    pub throws: Option<Handedness>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSlate {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub lineup: Vec<LineupPlayer>,
    #[serde(default)]
    pub starting_pitcher: Option<StartingPitcher>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    pub home: TeamSlate,
    pub away: TeamSlate,
}

fn de_bats<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Bats>, D::Error> {
    let code: Option<String> = Option::deserialize(d)?;
    Ok(code.as_deref().and_then(Bats::from_code))
}

fn de_hand<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Handedness>, D::Error> {
    let code: Option<String> = Option::deserialize(d)?;
    Ok(code.as_deref().and_then(Handedness::from_code))
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("failed to read slate {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse slate {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("schedule request failed: {0}")]
    Http(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Source of the day's games.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn get_todays_games(&self) -> Result<Vec<Game>, ScheduleError>;
}

/// Build the provider named in the config.
pub fn from_config(config: &Config) -> Box<dyn ScheduleProvider> {
    match config.schedule.source {
        ScheduleSource::File => Box::new(SlateFile::new(&config.schedule.slate_path)),
        ScheduleSource::StatsApi => Box::new(StatsApi::new(&config.schedule.statsapi_url)),
    }
}

// ---------------------------------------------------------------------------
// Slate file
// ---------------------------------------------------------------------------

/// A JSON array of [`Game`]s on disk.
#[derive(Debug, Clone)]
pub struct SlateFile {
    path: PathBuf,
}

impl SlateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScheduleProvider for SlateFile {
    async fn get_todays_games(&self) -> Result<Vec<Game>, ScheduleError> {
        let path_str = self.path.display().to_string();
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ScheduleError::Io {
                path: path_str.clone(),
                source: e,
            })?;
        let games: Vec<Game> = serde_json::from_str(&text).map_err(|e| ScheduleError::Json {
            path: path_str.clone(),
            source: e,
        })?;
        info!("Loaded {} games from slate {path_str}", games.len());
        Ok(games)
    }
}

// ---------------------------------------------------------------------------
// MLB Stats API
// ---------------------------------------------------------------------------

/// Today's schedule from the MLB Stats API. Teams without a posted lineup
/// fall back to their lineup from yesterday's game.
#[derive(Debug, Clone)]
pub struct StatsApi {
    http: reqwest::Client,
    base_url: String,
    date: Option<NaiveDate>,
}

impl StatsApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            date: None,
        }
    }

    /// Pin the slate date instead of using today's local date.
    pub fn for_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    async fn fetch(&self, date: NaiveDate, hydrate: &str) -> Result<ApiSchedule, ScheduleError> {
        let url = format!("{}/schedule", self.base_url);
        let date = date.format("%Y-%m-%d").to_string();
        let response = self
            .http
            .get(&url)
            .query(&[("sportId", "1"), ("date", date.as_str()), ("hydrate", hydrate)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<ApiSchedule>().await?)
    }
}

#[async_trait]
impl ScheduleProvider for StatsApi {
    async fn get_todays_games(&self) -> Result<Vec<Game>, ScheduleError> {
        let today = self.date.unwrap_or_else(|| Local::now().date_naive());
        let schedule = self.fetch(today, "probablePitcher,lineups,team").await?;

        // Yesterday's lineups only fill gaps, so a failure here is not fatal.
        let yesterday = match self.fetch(today - Duration::days(1), "lineups,team").await {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("could not fetch yesterday's lineups: {e}");
                None
            }
        };

        let games = games_from_schedule(schedule, yesterday.as_ref());
        info!("Fetched {} games for {today} from the Stats API", games.len());
        Ok(games)
    }
}

// ---------------------------------------------------------------------------
// Stats API wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ApiSchedule {
    #[serde(default)]
    dates: Vec<ApiDate>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiDate {
    #[serde(default)]
    games: Vec<ApiGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGame {
    game_pk: u64,
    #[serde(default)]
    game_date: Option<DateTime<Utc>>,
    teams: ApiTeams,
    #[serde(default)]
    lineups: Option<ApiLineups>,
}

#[derive(Debug, Deserialize)]
struct ApiTeams {
    away: ApiTeamSide,
    home: ApiTeamSide,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTeamSide {
    team: ApiTeam,
    #[serde(default)]
    probable_pitcher: Option<ApiPerson>,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    id: u64,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLineups {
    #[serde(default)]
    home_players: Vec<ApiPerson>,
    #[serde(default)]
    away_players: Vec<ApiPerson>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPerson {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    bat_side: Option<ApiCode>,
    #[serde(default)]
    pitch_hand: Option<ApiCode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiCode {
    code: String,
}

impl ApiPerson {
    fn name(&self) -> Option<String> {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    fn to_lineup_player(&self) -> Option<LineupPlayer> {
        Some(LineupPlayer {
            id: self.id.map(|id| id.to_string()),
            name: self.name()?,
            bats: self.bat_side.as_ref().and_then(|c| Bats::from_code(&c.code)),
        })
    }

    fn to_starting_pitcher(&self) -> Option<StartingPitcher> {
        Some(StartingPitcher {
            id: self.id.map(|id| id.to_string()),
            name: self.name()?,
            throws: self.pitch_hand.as_ref().and_then(|c| Handedness::from_code(&c.code)),
        })
    }
}

fn to_lineup(players: &[ApiPerson]) -> Vec<LineupPlayer> {
    players.iter().filter_map(ApiPerson::to_lineup_player).collect()
}

/// Convert a schedule response into games, filling empty lineups from the
/// most recent lineup each team posted in `yesterday`.
fn games_from_schedule(today: ApiSchedule, yesterday: Option<&ApiSchedule>) -> Vec<Game> {
    let mut last_lineups: HashMap<u64, &[ApiPerson]> = HashMap::new();
    if let Some(yesterday) = yesterday {
        for game in yesterday.dates.iter().flat_map(|d| &d.games) {
            let Some(lineups) = &game.lineups else {
                continue;
            };
            if !lineups.away_players.is_empty() {
                last_lineups.insert(game.teams.away.team.id, &lineups.away_players);
            }
            if !lineups.home_players.is_empty() {
                last_lineups.insert(game.teams.home.team.id, &lineups.home_players);
            }
        }
    }

    let side = |team: &ApiTeamSide, posted: &[ApiPerson]| -> TeamSlate {
        let lineup = if posted.is_empty() {
            last_lineups
                .get(&team.team.id)
                .map(|players| to_lineup(players))
                .unwrap_or_default()
        } else {
            to_lineup(posted)
        };
        TeamSlate {
            id: Some(team.team.id.to_string()),
            name: team.team.name.clone(),
            lineup,
            starting_pitcher: team
                .probable_pitcher
                .as_ref()
                .and_then(ApiPerson::to_starting_pitcher),
        }
    };

    today
        .dates
        .iter()
        .flat_map(|d| &d.games)
        .map(|game| {
            let lineups = game.lineups.as_ref();
            let home_posted = lineups.map(|l| l.home_players.as_slice()).unwrap_or(&[]);
            let away_posted = lineups.map(|l| l.away_players.as_slice()).unwrap_or(&[]);
            Game {
                id: game.game_pk.to_string(),
                start_time: game.game_date,
                home: side(&game.teams.home, home_posted),
                away: side(&game.teams.away, away_posted),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
