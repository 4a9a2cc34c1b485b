//! planwatch CLI
//!
//! Runs the polling loop locally and offers offline helpers to inspect
//! feeds and diffs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use planwatch::{
    error::{AppError, Result},
    models::{Config, GroupSet, Snapshot},
    pipeline::{DiffWindow, PollingScheduler, diff_snapshots},
    services::{ChangeFormatter, FeedParser, HttpFeedSource, NotificationDispatcher, SnapshotAssembler},
    storage::{HttpPushTransport, LocalStorage, LogTransport, PushTransport},
    utils::http,
};

/// planwatch - schedule change notifier
#[derive(Parser, Debug)]
#[command(
    name = "planwatch",
    version,
    about = "Polls group calendar feeds and notifies subscribers of schedule changes"
)]
struct Cli {
    /// Path to storage directory containing config and registry files
    #[arg(short, long, default_value = "storage", global = true)]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll group-sets in rotation and dispatch changes
    Run {
        /// Poll every group-set once, then exit
        #[arg(long)]
        once: bool,

        /// Log notifications instead of pushing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse a feed file and print its events as JSON
    Parse {
        file: PathBuf,
    },

    /// Diff two feed files and print the formatted changes
    Diff {
        previous: PathBuf,
        current: PathBuf,

        /// Window length in days (default: polling.forward_days)
        #[arg(long)]
        days: Option<u32>,

        /// First day of the window, YYYY-MM-DD (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Validate configuration and group registry
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_groups(storage_dir: &Path) -> Result<Vec<GroupSet>> {
    let path = storage_dir.join("groups.json");
    if !path.exists() {
        return Err(AppError::config(format!(
            "Group registry not found at {}",
            path.display()
        )));
    }
    let sets = GroupSet::load_all(&path)?;
    GroupSet::validate_all(&sets)?;
    Ok(sets)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    match cli.command {
        Command::Run { once, dry_run } => {
            config.validate()?;
            let group_sets = load_groups(&cli.storage_dir)?;
            log::info!(
                "Loaded {} group-set(s) with {} group(s)",
                group_sets.len(),
                group_sets.iter().map(|s| s.groups.len()).sum::<usize>()
            );

            let client = http::create_async_client(&config.feed)?;
            let parser = Arc::new(FeedParser::new(&config)?);
            let source = HttpFeedSource::new(client.clone(), config.feed.clone(), parser);
            let assembler = SnapshotAssembler::new(Arc::new(source), config.feed.max_concurrent);

            let transport: Arc<dyn PushTransport> = match (&config.notify.push_endpoint, dry_run) {
                (Some(endpoint), false) => Arc::new(HttpPushTransport::new(client, endpoint.clone())),
                (None, false) => {
                    log::warn!("notify.push_endpoint is not set, notifications will only be logged");
                    Arc::new(LogTransport)
                }
                (_, true) => Arc::new(LogTransport),
            };

            let storage = Arc::new(LocalStorage::new(&cli.storage_dir));
            let dispatcher = NotificationDispatcher::new(transport, storage.clone());
            let mut scheduler =
                PollingScheduler::new(&config, group_sets, assembler, storage, dispatcher)?;

            if once {
                let sets = scheduler.rotation().len();
                scheduler.run_cycles(sets).await;
            } else {
                scheduler.run().await;
            }
        }

        Command::Parse { file } => {
            let parser = FeedParser::new(&config)?;
            let body = std::fs::read_to_string(&file)?;
            let events = parser.parse(&body);
            let unknown = events.iter().filter(|e| !e.has_known_teacher()).count();
            log::info!(
                "Parsed {} event(s) from {} ({} without a recognised teacher)",
                events.len(),
                file.display(),
                unknown
            );
            println!("{}", serde_json::to_string_pretty(&events)?);
        }

        Command::Diff {
            previous,
            current,
            days,
            today,
        } => {
            let parser = FeedParser::new(&config)?;
            let offset = parser.offset();
            let previous = Snapshot::from_events(parser.parse(&std::fs::read_to_string(&previous)?));
            let current = Snapshot::from_events(parser.parse(&std::fs::read_to_string(&current)?));

            let now = match today {
                Some(date) => date
                    .and_time(NaiveTime::MIN)
                    .and_local_timezone(offset)
                    .single()
                    .ok_or_else(|| AppError::validation(format!("Invalid window start {}", date)))?,
                None => Utc::now().with_timezone(&offset),
            };
            let window = DiffWindow::starting_today(now, days.unwrap_or(config.polling.forward_days));

            let formatter = ChangeFormatter::from_config(&config.notify);
            let changes = diff_snapshots(&previous, &current, &window);
            for change in &changes {
                let formatted = formatter.format(change);
                println!("{:<18} {}  ({})", change.kind().as_str(), formatted.text, formatted.action);
            }
            log::info!(
                "{} change(s) between {} and {}",
                changes.len(),
                window.start.format("%Y-%m-%d"),
                window.end.format("%Y-%m-%d")
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");

            let sets = load_groups(&cli.storage_dir)?;
            let groups: usize = sets.iter().map(|s| s.groups.len()).sum();
            let feeds: usize = sets.iter().map(|s| s.feed_count()).sum();
            log::info!(
                "Group registry OK: {} set(s), {} group(s), {} feed(s)",
                sets.len(),
                groups,
                feeds
            );
        }
    }

    Ok(())
}
