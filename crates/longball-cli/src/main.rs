// longball entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, stdout is for results)
// 3. Load config (copying defaults/ into config/ on first run)
// 4. Run the requested command

use longball_core::config::{self, Config};
use longball_core::estimator::{Estimator, SlateProjection};
use longball_core::model::{Handedness, MatchupContext, NEUTRAL_PARK};
use longball_core::schedule::{self, Bats};
use longball_core::store::WeightStore;
use longball_core::weights::{WeightProfile, Weights};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "longball")]
#[command(about = "Daily MLB home-run probability estimates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project every batter in today's lineups
    Slate {
        /// Owner of the weight profile to use
        #[arg(long, default_value = "local")]
        user: String,
        /// Saved weight profile name (latest save wins); defaults to built-in weights
        #[arg(long)]
        profile: Option<String>,
        /// Only print the top N batters
        #[arg(long)]
        top: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Score a single batter/pitcher matchup with a per-signal breakdown
    Score {
        #[arg(long)]
        batter: String,
        #[arg(long, default_value = "TBD")]
        pitcher: String,
        /// Batter side: L, R or S
        #[arg(long, value_parser = parse_bats, default_value = "R")]
        bats: Bats,
        /// Pitcher hand: L or R
        #[arg(long, value_parser = parse_hand, default_value = "R")]
        throws: Handedness,
        /// Home team, for the park factor
        #[arg(long)]
        park: Option<String>,
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Manage saved weight profiles
    Weights {
        #[command(subcommand)]
        action: WeightCommands,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// List a user's saved profiles
    List {
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Save a profile from a JSON weights file
    Save {
        #[arg(long, default_value = "local")]
        user: String,
        #[arg(long)]
        name: String,
        /// JSON object with one coefficient per signal
        #[arg(long)]
        file: String,
    },
    /// Print the built-in default weights as JSON
    Defaults,
}

fn parse_hand(s: &str) -> Result<Handedness, String> {
    Handedness::from_code(s).ok_or_else(|| format!("unknown hand `{s}`; use L or R"))
}

fn parse_bats(s: &str) -> Result<Bats, String> {
    Bats::from_code(s).ok_or_else(|| format!("unknown batting side `{s}`; use L, R or S"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("longball starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: data dir {}, schedule source {:?}",
        config.data.dir, config.schedule.source
    );

    match cli.command {
        Commands::Slate {
            user,
            profile,
            top,
            json,
        } => run_slate(&config, &user, profile.as_deref(), top, json).await,
        Commands::Score {
            batter,
            pitcher,
            bats,
            throws,
            park,
            user,
            profile,
        } => run_score(&config, &batter, &pitcher, bats, throws, park.as_deref(), &user, profile.as_deref()),
        Commands::Weights { action } => run_weights(&config, action),
    }
}

async fn run_slate(
    config: &Config,
    user: &str,
    profile: Option<&str>,
    top: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let weights = select_weights(config, user, profile)?;
    let estimator = Estimator::load(config).context("failed to build estimator")?;

    let provider = schedule::from_config(config);
    let games = provider
        .get_todays_games()
        .await
        .context("failed to fetch today's games")?;

    let mut slate = estimator.project_games(&games, &weights);
    if let Some(n) = top {
        slate.projections.truncate(n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&slate)?);
    } else {
        print_slate(&slate);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_score(
    config: &Config,
    batter: &str,
    pitcher: &str,
    bats: Bats,
    throws: Handedness,
    park: Option<&str>,
    user: &str,
    profile: Option<&str>,
) -> anyhow::Result<()> {
    let weights = select_weights(config, user, profile)?;
    let estimator = Estimator::load(config).context("failed to build estimator")?;

    let batter_handedness = bats.against(throws);
    let context = MatchupContext {
        park_factor: park
            .map(|team| estimator.resolver().park_factor(team))
            .unwrap_or(NEUTRAL_PARK),
        batter_handedness,
        pitcher_handedness: throws,
    };
    let estimate = estimator.estimate(batter, pitcher, context, &weights);

    println!(
        "{batter} ({batter_handedness}) vs {pitcher} ({throws}), park factor {:.3}",
        context.park_factor
    );
    println!(
        "  batter match: {:?}  pitcher match: {:?}",
        estimate.batter_source, estimate.pitcher_source
    );
    println!("  {:<20} {:>10} {:>10} {:>10}", "signal", "input", "weight", "value");
    for c in &estimate.breakdown.contributions {
        println!(
            "  {:<20} {:>10.4} {:>10.4} {:>10.5}",
            c.signal.key(),
            c.input,
            c.weight,
            c.value
        );
    }
    println!("  raw sum {:.5}", estimate.breakdown.raw_sum);
    if estimate.breakdown.substituted {
        println!("  score was not finite; default substituted");
    }
    println!("  HR probability {:.1}%", estimate.probability() * 100.0);
    Ok(())
}

fn run_weights(config: &Config, action: WeightCommands) -> anyhow::Result<()> {
    match action {
        WeightCommands::List { user } => {
            let store = open_store(config)?;
            let profiles = store.get_weights(&user)?;
            if profiles.is_empty() {
                println!("no saved profiles for {user}");
            }
            for p in profiles {
                println!("{}  {}  {}", p.id, p.created_at.format("%Y-%m-%d %H:%M"), p.name);
            }
        }
        WeightCommands::Save { user, name, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read weights file {file}"))?;
            let weights: Weights = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse weights file {file}"))?;
            let store = open_store(config)?;
            let profile = store.save_weights(&user, &name, &weights)?;
            println!("saved {} as {}", profile.name, profile.id);
        }
        WeightCommands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&Weights::default())?);
        }
    }
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<WeightStore> {
    WeightStore::open(&config.store.path)
        .with_context(|| format!("failed to open weight store at {}", config.store.path))
}

/// Built-in weights, or the most recent profile `user` saved under `name`.
fn select_weights(config: &Config, user: &str, name: Option<&str>) -> anyhow::Result<Weights> {
    let Some(name) = name.filter(|n| *n != WeightProfile::DEFAULT_NAME) else {
        return Ok(WeightProfile::builtin(user).weights);
    };
    let store = open_store(config)?;
    let profiles = store.get_weights(user)?;
    match profiles.into_iter().rev().find(|p| p.name == name) {
        Some(profile) => {
            info!("Using weight profile '{}' ({})", profile.name, profile.id);
            Ok(profile.weights)
        }
        None => bail!("no weight profile named '{name}' for user {user}"),
    }
}

fn print_slate(slate: &SlateProjection) {
    println!(
        "{:>4}  {:<24} {:<24} {:<22} {:>4} {:>7}",
        "#", "batter", "team", "vs", "B/T", "HR%"
    );
    for (rank, p) in slate.projections.iter().enumerate() {
        println!(
            "{:>4}  {:<24} {:<24} {:<22} {:>4} {:>6.1}%{}",
            rank + 1,
            p.name,
            p.team,
            p.opponent_pitcher,
            format!("{}/{}", p.bats, p.throws),
            p.probability * 100.0,
            if p.league_average { " *" } else { "" }
        );
    }
    if slate.projections.iter().any(|p| p.league_average) {
        println!("* no reference data for batter or pitcher; league averages used");
    }
    if slate.invalid_scores > 0 {
        println!("{} scores were not finite and used the default", slate.invalid_scores);
    }
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("longball.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("longball=info,longball_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
