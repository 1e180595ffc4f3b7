//! Watermelon Meow Meow command-line front end.
//!
//! Drives the append transaction and the dashboard views against a bucket
//! directory on disk.
//!
//! Usage:
//!   wmm seed thm220
//!   wmm infect thm220 gms221
//!   wmm intervene gms221 --type "Intervention 01"
//!   wmm summary
//!   wmm search thm220 --json

mod config;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use wmm_contracts::{error::WmmResult, proposal::Proposal, record::EventLog};
use wmm_core::{
    traits::{Clock, EffectivenessSampler, EventLogStore, LocalClock, RandomSource, TracingNotifier},
    AppendTransaction,
};
use wmm_outcome::{EntropySource, SeededSource, UniformSampler};
use wmm_rules::RuleEngine;
use wmm_store::{load_effectiveness_table, seed_log, FsObjectStore, ObjectEventLog, SeedPlan};

use crate::config::WmmConfig;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Watermelon Meow Meow outbreak game.
///
/// Records infection and intervention events in a shared CSV event log and
/// reports on the state of the outbreak.
#[derive(Parser)]
#[command(
    name = "wmm",
    about = "Watermelon Meow Meow outbreak game",
    long_about = "Records infection and intervention events in the shared event log,\n\
                  enforcing the game rules, and reports on the outbreak."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Configuration file (TOML).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Bucket directory. Overrides `bucket_dir`.
    #[arg(long, global = true)]
    bucket: Option<PathBuf>,

    /// Event log object key. Overrides `log_key`.
    #[arg(long, global = true)]
    log_key: Option<String>,

    /// Effectiveness table object key. Overrides `effectiveness_key`.
    #[arg(long, global = true)]
    effectiveness_key: Option<String>,

    /// Seed the random source for a reproducible run.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new game: infect the given users from the reserved account.
    Seed {
        /// Patient-zero usernames.
        #[arg(required = true)]
        users: Vec<String>,
        /// Replace an existing event log.
        #[arg(long)]
        force: bool,
    },
    /// Record an infection attempt.
    Infect { actor: String, audience: String },
    /// Record an intervention received by a user.
    Intervene {
        audience: String,
        /// Intervention label, e.g. "Intervention 01".
        #[arg(long = "type", short = 't')]
        intervention_type: String,
    },
    /// List the offered interventions.
    Interventions,
    /// Headline totals.
    Summary,
    /// Cumulative infections and interventions per hour.
    Timeline,
    /// Every node and edge of the contact network.
    Network,
    /// Primary and secondary contacts of one user.
    Search { username: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Set RUST_LOG=debug for pipeline detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("wmm: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> WmmResult<ExitCode> {
    let config = load_config(&cli.global)?;
    let json = cli.global.json;
    let bucket = Arc::new(FsObjectStore::new(&config.bucket_dir));
    debug!(
        bucket = %config.bucket_dir.display(),
        log_key = %config.log_key,
        "configuration loaded"
    );

    match cli.command {
        Command::Seed { users, force } => {
            let plan = SeedPlan::new(users).force(force);
            let version = seed_log(&*bucket, &config.log_key, &plan, LocalClock.now())?;
            report::seeded(&plan, &version, json);
            Ok(ExitCode::SUCCESS)
        }

        Command::Infect { actor, audience } => {
            // Infections never sample effectiveness.
            let tx = transaction(&config, bucket, Box::new(UniformSampler), cli.global.seed);
            let outcome = tx.submit(&Proposal::infection(actor, audience))?;
            report::submitted(&outcome, json);
            Ok(exit_for(outcome.is_accepted()))
        }

        Command::Intervene {
            audience,
            intervention_type,
        } => {
            // The table is read only once the proposal has been accepted.
            let table_bucket = bucket.clone();
            let table_key = config.effectiveness_key.clone();
            let sampler = config
                .outcome
                .sampler(move || load_effectiveness_table(&*table_bucket, &table_key));
            let tx = transaction(&config, bucket, sampler, cli.global.seed);
            let outcome = tx.submit(&Proposal::intervention(intervention_type, audience))?;
            report::submitted(&outcome, json);
            Ok(exit_for(outcome.is_accepted()))
        }

        Command::Interventions => {
            report::interventions(&config.rules.interventions, json);
            Ok(ExitCode::SUCCESS)
        }

        Command::Summary => {
            report::summary(&fetch_log(&config, bucket)?, json);
            Ok(ExitCode::SUCCESS)
        }

        Command::Timeline => {
            report::timeline(&fetch_log(&config, bucket)?, json);
            Ok(ExitCode::SUCCESS)
        }

        Command::Network => {
            report::network(&fetch_log(&config, bucket)?, json);
            Ok(ExitCode::SUCCESS)
        }

        Command::Search { username } => {
            let log = fetch_log(&config, bucket)?;
            let found = report::search(&log, &username.trim().to_lowercase(), json);
            Ok(exit_for(found))
        }
    }
}

fn fetch_log(config: &WmmConfig, bucket: Arc<FsObjectStore>) -> WmmResult<EventLog> {
    Ok(ObjectEventLog::new(bucket, config.log_key.clone()).fetch()?.log)
}

/// Rejections and unknown users exit with status 2, faults with 1.
fn exit_for(accepted: bool) -> ExitCode {
    if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn load_config(args: &GlobalArgs) -> WmmResult<WmmConfig> {
    let mut config = match &args.config {
        Some(path) => WmmConfig::from_file(path)?,
        None => WmmConfig::default(),
    };
    if let Some(bucket) = &args.bucket {
        config.bucket_dir = bucket.clone();
    }
    if let Some(key) = &args.log_key {
        config.log_key = key.clone();
    }
    if let Some(key) = &args.effectiveness_key {
        config.effectiveness_key = key.clone();
    }
    config.validate()?;
    Ok(config)
}

fn transaction(
    config: &WmmConfig,
    bucket: Arc<FsObjectStore>,
    sampler: Box<dyn EffectivenessSampler>,
    seed: Option<u64>,
) -> AppendTransaction {
    let rng: Box<dyn RandomSource> = match seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(EntropySource),
    };
    AppendTransaction::new(
        Box::new(ObjectEventLog::new(bucket, config.log_key.clone())),
        Box::new(RuleEngine::new(config.rules.clone())),
        Box::new(config.outcome.infection_resolver()),
        sampler,
        rng,
    )
    .with_notifier(Box::new(TracingNotifier))
    .with_max_attempts(config.max_attempts)
    .with_mail_domain(config.mail_domain.clone())
}
