// Reference data: raw table loading and the immutable lookup context.
//
// Tables come from FanGraphs/Baseball Savant exports saved as JSON arrays or
// CSV files. Column names vary between exports, so records are kept as loose
// key/value maps and typed rows are pulled out with ordered key candidates.

use crate::config::{Config, DataConfig};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("JSON error in table {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("CSV error in table {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("unsupported table format for {path} (expected .json or .csv)")]
    UnsupportedFormat { path: String },

    #[error("reference data unavailable: table `{table}` has no usable rows")]
    Unavailable { table: String },
}

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One row of a reference table, keyed by the export's column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRecord {
    fields: Map<String, Value>,
}

impl TableRecord {
    /// Build a record from a JSON object. Non-objects yield `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// First non-empty text value among `keys`, trimmed.
    pub fn text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| match self.fields.get(*k) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        })
    }

    /// First finite numeric value among `keys`. Numeric strings are accepted
    /// and a trailing `%` is dropped (the number is kept as written).
    pub fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.fields.get(*k).and_then(value_as_f64))
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn records_from_json_reader<R: Read>(rdr: R) -> Result<Vec<TableRecord>, serde_json::Error> {
    let rows: Vec<Value> = serde_json::from_reader(rdr)?;
    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        match TableRecord::from_json(row) {
            Some(record) => records.push(record),
            None => warn!("skipping table row {i}: not a JSON object"),
        }
    }
    Ok(records)
}

fn records_from_csv_reader<R: Read>(rdr: R) -> Result<Vec<TableRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(row) => {
                let fields = headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, v)| (h.trim().to_string(), csv_cell(v)))
                    .collect();
                records.push(TableRecord { fields });
            }
            Err(e) => {
                warn!("skipping malformed table row: {}", e);
            }
        }
    }
    Ok(records)
}

fn csv_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed.parse::<f64>() {
        Ok(n) => serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(trimmed.to_string())),
        Err(_) => Value::String(trimmed.to_string()),
    }
}

/// Load a single table from `dir`. The format follows the file extension.
///
/// An absent file yields an empty list, never an error; whether an empty
/// table is acceptable is decided by [`ReferenceTables::load`].
pub fn load_table(dir: &Path, file_name: &str) -> Result<Vec<TableRecord>, TableError> {
    let path = dir.join(file_name);
    let path_str = path.display().to_string();
    if !path.exists() {
        warn!("table {path_str} not found, treating as empty");
        return Ok(Vec::new());
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let file = std::fs::File::open(&path).map_err(|e| TableError::Io {
        path: path_str.clone(),
        source: e,
    })?;

    match extension.as_deref() {
        Some("json") => records_from_json_reader(std::io::BufReader::new(file))
            .map_err(|e| TableError::Json {
                path: path_str,
                source: e,
            }),
        Some("csv") => records_from_csv_reader(file).map_err(|e| TableError::Csv {
            path: path_str,
            source: e,
        }),
        _ => Err(TableError::UnsupportedFormat { path: path_str }),
    }
}

// ---------------------------------------------------------------------------
// Typed rows
// ---------------------------------------------------------------------------

const NAME_KEYS: &[&str] = &["Name_1", "Name", "name", "player_name", "last_name, first_name"];

/// Batter platoon-split row. Values are as published; units are resolved later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatterSplit {
    pub pa: Option<f64>,
    pub hr: Option<f64>,
    pub iso: Option<f64>,
    pub hr_per_fb: Option<f64>,
    pub fly_ball: Option<f64>,
    pub pull: Option<f64>,
}

impl BatterSplit {
    fn from_record(r: &TableRecord) -> Self {
        Self {
            pa: r.number(&["PA"]),
            hr: r.number(&["HR"]),
            iso: r.number(&["ISO"]),
            hr_per_fb: r.number(&["HR/FB"]),
            fly_ball: r.number(&["FB%"]),
            pull: r.number(&["Pull%"]),
        }
    }
}

/// Pitcher platoon-split row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitcherSplit {
    pub hr_per_9: Option<f64>,
    pub hr: Option<f64>,
    pub ip: Option<f64>,
    pub fly_ball: Option<f64>,
    pub ground_ball: Option<f64>,
}

impl PitcherSplit {
    fn from_record(r: &TableRecord) -> Self {
        Self {
            hr_per_9: r.number(&["HR/9"]),
            hr: r.number(&["HR"]),
            ip: r.number(&["IP"]),
            fly_ball: r.number(&["FB%"]),
            ground_ball: r.number(&["GB%"]),
        }
    }
}

/// Statcast quality-of-contact row for a batter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatcastBatter {
    pub barrel_rate: Option<f64>,
    pub hard_hit_rate: Option<f64>,
    pub exit_velocity: Option<f64>,
    pub launch_angle: Option<f64>,
    pub expected_hr: Option<f64>,
    pub recent_hr: Option<f64>,
}

impl StatcastBatter {
    fn from_record(r: &TableRecord) -> Self {
        Self {
            barrel_rate: r.number(&["barrel_rate", "brl_percent", "barrel_batted_rate"]),
            hard_hit_rate: r.number(&["hard_hit_percent", "ev95percent"]),
            exit_velocity: r.number(&["exit_velocity", "avg_hit_speed", "exit_velocity_avg"]),
            launch_angle: r.number(&["launch_angle", "avg_hit_angle", "launch_angle_avg"]),
            expected_hr: r.number(&["xhr", "xHR"]),
            recent_hr: r.number(&["recent_hr", "RecentHRs"]),
        }
    }
}

/// Statcast quality-of-contact row for a pitcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatcastPitcher {
    pub barrel_rate: Option<f64>,
}

impl StatcastPitcher {
    fn from_record(r: &TableRecord) -> Self {
        Self {
            barrel_rate: r.number(&["barrel_rate", "brl_percent", "barrel_batted_rate"]),
        }
    }
}

/// Rows of one table keyed by the exact (trimmed) player name.
#[derive(Debug, Clone)]
pub struct NameIndex<T> {
    rows: HashMap<String, T>,
}

impl<T> Default for NameIndex<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }
}

impl<T> NameIndex<T> {
    fn build(table: &str, records: &[TableRecord], parse: impl Fn(&TableRecord) -> T) -> Self {
        let mut rows = HashMap::with_capacity(records.len());
        for record in records {
            let Some(name) = record.text(NAME_KEYS) else {
                warn!("skipping {table} row without a player name");
                continue;
            };
            if rows.contains_key(name) {
                warn!("duplicate {table} entry for '{name}', keeping the first");
                continue;
            }
            rows.insert(name.to_string(), parse(record));
        }
        Self { rows }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.rows.get(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reference tables
// ---------------------------------------------------------------------------

/// Raw records for every reference table, as handed over by the loader.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub batters_vs_left: Vec<TableRecord>,
    pub batters_vs_right: Vec<TableRecord>,
    pub pitchers_vs_left: Vec<TableRecord>,
    pub pitchers_vs_right: Vec<TableRecord>,
    pub statcast_batters: Vec<TableRecord>,
    pub statcast_pitchers: Vec<TableRecord>,
    pub park_factors: Vec<TableRecord>,
}

/// Read-only lookup context shared by every resolve call. Built once and
/// never mutated, so it can be shared across threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub batters_vs_left: NameIndex<BatterSplit>,
    pub batters_vs_right: NameIndex<BatterSplit>,
    pub pitchers_vs_left: NameIndex<PitcherSplit>,
    pub pitchers_vs_right: NameIndex<PitcherSplit>,
    pub statcast_batters: NameIndex<StatcastBatter>,
    pub statcast_pitchers: NameIndex<StatcastPitcher>,
    /// Team name -> park factor exactly as published.
    pub park_factors: HashMap<String, f64>,
}

impl ReferenceTables {
    /// Index raw records without any availability checks.
    pub fn from_records(raw: &RawTables) -> Self {
        let mut park_factors = HashMap::new();
        for record in &raw.park_factors {
            let (Some(team), Some(factor)) = (
                record.text(&["Team", "team", "Venue"]),
                record.number(&["Park Factor", "park_factor", "Basic", "index_hr"]),
            ) else {
                warn!("skipping park factor row without team or factor");
                continue;
            };
            park_factors.entry(team.to_string()).or_insert(factor);
        }

        Self {
            batters_vs_left: NameIndex::build("batters_vs_left", &raw.batters_vs_left, BatterSplit::from_record),
            batters_vs_right: NameIndex::build("batters_vs_right", &raw.batters_vs_right, BatterSplit::from_record),
            pitchers_vs_left: NameIndex::build("pitchers_vs_left", &raw.pitchers_vs_left, PitcherSplit::from_record),
            pitchers_vs_right: NameIndex::build("pitchers_vs_right", &raw.pitchers_vs_right, PitcherSplit::from_record),
            statcast_batters: NameIndex::build("statcast_batters", &raw.statcast_batters, StatcastBatter::from_record),
            statcast_pitchers: NameIndex::build("statcast_pitchers", &raw.statcast_pitchers, StatcastPitcher::from_record),
            park_factors,
        }
    }

    /// Index raw records and refuse to proceed if a platoon-split table is
    /// empty. Statcast and park tables are optional.
    pub fn from_records_checked(raw: &RawTables) -> Result<Self, TableError> {
        let tables = Self::from_records(raw);

        let required: [(&str, bool); 4] = [
            ("batters_vs_left", tables.batters_vs_left.is_empty()),
            ("batters_vs_right", tables.batters_vs_right.is_empty()),
            ("pitchers_vs_left", tables.pitchers_vs_left.is_empty()),
            ("pitchers_vs_right", tables.pitchers_vs_right.is_empty()),
        ];
        if let Some((table, _)) = required.iter().find(|(_, empty)| *empty) {
            return Err(TableError::Unavailable {
                table: table.to_string(),
            });
        }

        if tables.statcast_batters.is_empty() {
            warn!("statcast batter table is empty; contact metrics will use league averages");
        }
        if tables.statcast_pitchers.is_empty() {
            warn!("statcast pitcher table is empty; pitcher barrel rates will use league averages");
        }
        if tables.park_factors.is_empty() {
            warn!("park factor table is empty; every park will be treated as neutral");
        }

        Ok(tables)
    }

    /// Load every table named in the data config.
    pub fn load(config: &Config) -> Result<Self, TableError> {
        Self::load_from(&config.data)
    }

    /// Load every table from explicit data settings. Exposed for testing.
    pub fn load_from(data: &DataConfig) -> Result<Self, TableError> {
        let dir = Path::new(&data.dir);
        let files = &data.tables;
        let raw = RawTables {
            batters_vs_left: load_table(dir, &files.batters_vs_left)?,
            batters_vs_right: load_table(dir, &files.batters_vs_right)?,
            pitchers_vs_left: load_table(dir, &files.pitchers_vs_left)?,
            pitchers_vs_right: load_table(dir, &files.pitchers_vs_right)?,
            statcast_batters: load_table(dir, &files.statcast_batters)?,
            statcast_pitchers: load_table(dir, &files.statcast_pitchers)?,
            park_factors: load_table(dir, &files.park_factors)?,
        };
        let tables = Self::from_records_checked(&raw)?;
        info!(
            "Reference tables loaded: {} batters vs L, {} vs R, {} pitchers vs L, {} vs R, {} parks",
            tables.batters_vs_left.len(),
            tables.batters_vs_right.len(),
            tables.pitchers_vs_left.len(),
            tables.pitchers_vs_right.len(),
            tables.park_factors.len()
        );
        Ok(tables)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
