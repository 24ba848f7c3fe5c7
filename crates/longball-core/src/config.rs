// Configuration loading and parsing (config/longball.toml).

use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name of the single configuration file, inside `config/`.
pub const CONFIG_FILE: &str = "longball.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub data: DataConfig,
    pub store: StoreConfig,
    pub schedule: ScheduleConfig,
}

// ---------------------------------------------------------------------------
// [scoring]
// ---------------------------------------------------------------------------

/// Output bounds of the scorer. A 0.35 ceiling is a common tighter choice.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Minimum realistic probability for any MLB hitter.
    pub floor: f64,
    pub ceiling: f64,
    /// Returned in place of a non-finite weighted sum.
    pub invalid_default: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            floor: 0.02,
            ceiling: 1.0,
            invalid_default: 0.03,
        }
    }
}

// ---------------------------------------------------------------------------
// [resolver]
// ---------------------------------------------------------------------------

/// How the split tables publish FB%, Pull%, HR/FB and GB%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattedBallUnits {
    /// 0-1 (FanGraphs JSON exports).
    #[default]
    Fraction,
    /// 0-100.
    Percent,
}

impl BattedBallUnits {
    /// Convert a published value to a 0-1 fraction.
    pub fn to_fraction(self, value: f64) -> f64 {
        match self {
            BattedBallUnits::Fraction => value,
            BattedBallUnits::Percent => value / 100.0,
        }
    }
}

/// How the park table publishes park factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkFactorScale {
    /// 1.0 is neutral.
    #[default]
    Ratio,
    /// 100 is neutral.
    Index,
}

impl ParkFactorScale {
    pub fn to_ratio(self, value: f64) -> f64 {
        match self {
            ParkFactorScale::Ratio => value,
            ParkFactorScale::Index => value / 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub batted_ball_units: BattedBallUnits,
    #[serde(default)]
    pub park_factor_scale: ParkFactorScale,
}

// ---------------------------------------------------------------------------
// [data], [store], [schedule]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub dir: String,
    #[serde(default)]
    pub tables: TableFiles,
}

/// File names of the reference tables inside `data.dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct TableFiles {
    pub batters_vs_left: String,
    pub batters_vs_right: String,
    pub pitchers_vs_left: String,
    pub pitchers_vs_right: String,
    pub statcast_batters: String,
    pub statcast_pitchers: String,
    pub park_factors: String,
}

impl Default for TableFiles {
    fn default() -> Self {
        Self {
            batters_vs_left: "HittersvL.json".into(),
            batters_vs_right: "HittersvR.json".into(),
            pitchers_vs_left: "PitchersvL.json".into(),
            pitchers_vs_right: "PitchersvR.json".into(),
            statcast_batters: "StatcastBatters.json".into(),
            statcast_pitchers: "StatcastPitchers.json".into(),
            park_factors: "ParkFactors.json".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    File,
    StatsApi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub source: ScheduleSource,
    #[serde(default)]
    pub slate_path: String,
    #[serde(default = "default_statsapi_url")]
    pub statsapi_url: String,
}

fn default_statsapi_url() -> String {
    "https://statsapi.mlb.com/api/v1".into()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/longball.toml` relative to `base_dir`.
///
/// Does not auto-copy defaults; prefer `load_config()` for that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let config = parse_config(&text, &path)?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Seed `config/` from `defaults/` on first run.
///
/// Every `*.toml` under `defaults/` that has no counterpart in `config/` is
/// copied over; files the user already has are never touched. Returns the
/// paths that were written. Without `defaults/`, `config/longball.toml` must
/// already exist.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.join(CONFIG_FILE).is_file() {
            return Ok(vec![]);
        }
        return Err(copy_error(format!(
            "no {CONFIG_FILE} in {} and no defaults/ to seed it from",
            config_dir.display()
        )));
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;
    let entries = std::fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?;

    let mut copied = Vec::new();
    for entry in entries {
        let src = entry
            .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
            .path();
        if !src.is_file() || src.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let Some(file_name) = src.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if copy_default(&src, &target)? {
            info!("Seeded {} from {}", target.display(), src.display());
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Copy `src` to `target` unless `target` exists. Returns whether a copy
/// was made.
fn copy_default(src: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    };
    let content = std::fs::read(src)
        .map_err(|e| copy_error(format!("cannot read {}: {e}", src.display())))?;
    dest.write_all(&content)
        .map_err(|e| copy_error(format!("cannot write {}: {e}", target.display())))?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Loads config relative to the current working directory, copying default
/// config files into place first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the scoring bounds on their own; also used when a caller builds a
/// `ScoringConfig` in code.
pub fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    let fields: &[(&str, f64)] = &[
        ("scoring.floor", scoring.floor),
        ("scoring.ceiling", scoring.ceiling),
        ("scoring.invalid_default", scoring.invalid_default),
    ];
    for (name, val) in fields {
        if !val.is_finite() {
            return Err(invalid(name, format!("must be finite, got {val}")));
        }
    }

    if scoring.floor < 0.0 {
        return Err(invalid(
            "scoring.floor",
            format!("must be >= 0, got {}", scoring.floor),
        ));
    }
    if scoring.ceiling <= scoring.floor {
        return Err(invalid(
            "scoring.ceiling",
            format!(
                "must be greater than floor ({}), got {}",
                scoring.floor, scoring.ceiling
            ),
        ));
    }
    if !(scoring.floor..=scoring.ceiling).contains(&scoring.invalid_default) {
        return Err(invalid(
            "scoring.invalid_default",
            format!(
                "must lie within [{}, {}], got {}",
                scoring.floor, scoring.ceiling, scoring.invalid_default
            ),
        ));
    }
    Ok(())
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scoring(&config.scoring)?;

    if config.data.dir.trim().is_empty() {
        return Err(invalid("data.dir", "must not be empty".into()));
    }
    let t = &config.data.tables;
    let table_fields: &[(&str, &str)] = &[
        ("data.tables.batters_vs_left", t.batters_vs_left.as_str()),
        ("data.tables.batters_vs_right", t.batters_vs_right.as_str()),
        ("data.tables.pitchers_vs_left", t.pitchers_vs_left.as_str()),
        ("data.tables.pitchers_vs_right", t.pitchers_vs_right.as_str()),
        ("data.tables.statcast_batters", t.statcast_batters.as_str()),
        ("data.tables.statcast_pitchers", t.statcast_pitchers.as_str()),
        ("data.tables.park_factors", t.park_factors.as_str()),
    ];
    for (name, val) in table_fields {
        if val.trim().is_empty() {
            return Err(invalid(name, "must not be empty".into()));
        }
    }

    if config.store.path.trim().is_empty() {
        return Err(invalid("store.path", "must not be empty".into()));
    }

    match config.schedule.source {
        ScheduleSource::File if config.schedule.slate_path.trim().is_empty() => {
            return Err(invalid(
                "schedule.slate_path",
                "required when schedule.source = \"file\"".into(),
            ));
        }
        ScheduleSource::StatsApi if config.schedule.statsapi_url.trim().is_empty() => {
            return Err(invalid(
                "schedule.statsapi_url",
                "required when schedule.source = \"statsapi\"".into(),
            ));
        }
        _ => {}
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
