//! reel-import - movie list importer
//!
//! Subcommands:
//! - `import`: process every configured list (or one with `--list`) once
//! - `cron`: run the full import on a schedule until Ctrl+C
//! - `check`: compile every list's rules without touching any service

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use reel_common::config::{resolve_config_path, LoggingConfig, TomlConfig};
use reel_common::events::EventBus;
use reel_import::bootstrap::{build_importer, check_lists};
use reel_import::notification::run_event_log;
use reel_import::{Importer, RunSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reel-import", version, about = "Import movie lists into Radarr")]
struct Cli {
    /// Configuration file (falls back to REEL_CONFIG, then the platform config dirs)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the configured lists once
    Import {
        /// List name, or `all`
        #[arg(long, default_value = "all")]
        list: String,
    },
    /// Run the full import on a cron schedule
    Cron {
        /// Cron expression with a leading seconds field; defaults to the config's `cron`
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Validate list types and rules
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = resolve_config_path(cli.config.as_deref()).context("Failed to locate configuration")?;
    let config = TomlConfig::load(&path).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!("Starting reel-import");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        path = %path.display(),
        lists = config.importer.lists.len(),
        "Loaded configuration"
    );

    match cli.command {
        Command::Import { list } => run_import(&config, &list).await,
        Command::Cron { schedule } => run_cron(&config, schedule).await,
        Command::Check => run_check(&config),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("Failed to initialize tracing: {}", e))
}

async fn run_import(config: &TomlConfig, list: &str) -> Result<()> {
    let bus = EventBus::new(100);
    let event_log = tokio::spawn(run_event_log(bus.subscribe()));
    let mut importer = build_importer(config, bus).await?;

    let result = if list.eq_ignore_ascii_case("all") {
        let summary = importer.process_lists().await;
        print_summary(&summary);
        Ok(())
    } else {
        importer.process_list(list).await.map(|summary| {
            println!(
                "{}: approved {}, added {}",
                summary.list, summary.approved, summary.added
            );
        })
    };

    // Dropping the importer closes the bus, the log drains what is left and stops
    drop(importer);
    if let Err(e) = event_log.await {
        error!(error = %e, "Event log task failed");
    }
    Ok(result?)
}

async fn run_cron(config: &TomlConfig, schedule: Option<String>) -> Result<()> {
    let schedule = schedule
        .or_else(|| config.cron.clone())
        .context("No cron schedule given and none configured")?;

    let bus = EventBus::new(100);
    tokio::spawn(run_event_log(bus.subscribe()));
    let importer = Arc::new(Mutex::new(build_importer(config, bus).await?));

    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("Failed to create scheduler: {:?}", e))?;

    let job_importer = importer.clone();
    let job = Job::new_async(schedule.as_str(), move |_id, _scheduler| {
        let importer = job_importer.clone();
        Box::pin(async move {
            run_scheduled(&importer).await;
        })
    })
    .map_err(|e| anyhow!("Invalid cron schedule {:?}: {:?}", schedule, e))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("Failed to schedule import: {:?}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("Failed to start scheduler: {:?}", e))?;
    info!(schedule = %schedule, "Scheduler started, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Shutting down scheduler");
    let mut scheduler = scheduler;
    if let Err(e) = scheduler.shutdown().await {
        error!(error = ?e, "Scheduler shutdown failed");
    }
    Ok(())
}

async fn run_scheduled(importer: &Mutex<Importer>) {
    // A run that outlasts the schedule interval delays the next one
    let mut importer = importer.lock().await;
    let summary = importer.process_lists().await;
    print_summary(&summary);
}

fn run_check(config: &TomlConfig) -> Result<()> {
    let checks = check_lists(config)?;
    let mut failed = 0;
    for check in &checks {
        match &check.error {
            None => println!("{}: ok", check.list),
            Some(e) => {
                failed += 1;
                println!("{}: {}", check.list, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} lists failed the configuration check", failed, checks.len());
    }
    info!(total = checks.len(), "Configuration check passed");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let failed: Vec<&str> = summary.failed_lists().map(|l| l.list.as_str()).collect();
    if failed.is_empty() {
        println!(
            "run {}: approved {}, added {}",
            summary.run_id, summary.approved, summary.added
        );
    } else {
        println!(
            "run {}: approved {}, added {} (failed lists: {})",
            summary.run_id,
            summary.approved,
            summary.added,
            failed.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_check_returns_error_for_invalid_lists() {
        let valid = TomlConfig::from_toml_str(
            r#"
[importer.lists.feed]
url = "https://example.com/feed.xml"
type = "rss"
"#,
        )
        .unwrap();
        assert!(run_check(&valid).is_ok());

        let invalid = TomlConfig::from_toml_str(
            r#"
[importer.lists.pop]
url = "trakt://movies/popular"
type = "trakt"
"#,
        )
        .unwrap();
        let err = run_check(&invalid).unwrap_err();
        assert!(err.to_string().contains("1 of 1 lists"));
    }
}
