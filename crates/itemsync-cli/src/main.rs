//! itemsync: drive the sync coordinator against a JSON fixture of items.
//!
//! The host side (scheduler, notifications, article cache) is simulated
//! in-process: scheduled jobs are drained and run right away when the
//! simulated connection satisfies their network constraint.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use itemsync_core::config::{ConfigPreferences, Connectivity};
use itemsync_core::domain::{ItemId, RunState, SyncJob};
use itemsync_core::impls::{
    FileDeferralStore, ImmediateReadability, InMemoryDeferralStore, InMemoryHostScheduler,
    InMemoryItemSource, LoggingWebCache, TracingNotifier,
};
use itemsync_core::ports::{
    ArticleBackend, ArticleProgressSink, ArticleRenderer, DeferralStore, NetworkType,
    PreferenceSource,
};
use itemsync_core::{CoordinatorBuilder, SyncConfig, SyncCoordinator};

/// Offline sync of an item and its replies.
#[derive(Parser)]
#[command(name = "itemsync", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON fixture: `{ "cached": [...], "remote": [...] }`.
    #[arg(short, long)]
    items: Option<PathBuf>,

    /// Deferral file (overrides `[storage] deferral_path`).
    #[arg(long)]
    deferral: Option<PathBuf>,

    /// Keep deferred ids in memory only.
    #[arg(long, conflicts_with = "deferral")]
    no_persist: bool,

    /// Simulated connection.
    #[arg(long, value_enum, default_value_t = Net::Unmetered)]
    net: Net,

    /// Render articles in-process instead of handing them to the cache service.
    #[arg(long)]
    render: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync one item now and wait for it.
    Sync { id: String },

    /// Hand one item to the scheduler, then run whatever it releases.
    Schedule { id: String },

    /// Re-schedule every deferred item and run them.
    Flush,

    /// List deferred item ids.
    Deferred,

    /// Write the default configuration to the config path.
    InitConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Net {
    Offline,
    Metered,
    Unmetered,
}

impl From<Net> for Connectivity {
    fn from(net: Net) -> Self {
        match net {
            Net::Offline => Connectivity::Offline,
            Net::Metered => Connectivity::Metered,
            Net::Unmetered => Connectivity::Unmetered,
        }
    }
}

/// Outcome of one job, printed as JSON.
#[derive(Serialize)]
struct RunReport {
    id: ItemId,
    completed: bool,
    state: Option<RunState>,
    title: Option<String>,
    progress: u32,
    max: u32,
    deferred: Vec<ItemId>,
}

/// Stand-in for an embedded browser: reports load progress in steps.
struct SimulatedRenderer;

#[async_trait]
impl ArticleRenderer for SimulatedRenderer {
    async fn load(&self, url: &str, progress: ArticleProgressSink) {
        info!(url, "rendering article");
        for percent in [25, 50, 75, 100] {
            sleep(Duration::from_millis(50)).await;
            progress.report(percent);
        }
    }
}

struct Host {
    coordinator: SyncCoordinator,
    scheduler: Arc<InMemoryHostScheduler>,
    deferrals: Arc<dyn DeferralStore>,
    preferences: Arc<ConfigPreferences>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("itemsync=info,itemsync_core=info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(SyncConfig::default_path);
    let config = match &config_path {
        Some(path) if path.exists() => SyncConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        _ => SyncConfig::default(),
    };

    if let Command::InitConfig = cli.command {
        let path = config_path.context("no config directory on this platform")?;
        config.save_to_file(&path)?;
        println!("{}", path.display());
        return Ok(());
    }

    let host = build_host(&cli, &config)?;
    match cli.command {
        Command::Sync { id } => {
            let job = SyncJob::from_preferences(ItemId::new(id), host.preferences.as_ref());
            let report = host.run(job).await?;
            print_json(&report)?;
        }
        Command::Schedule { id } => {
            host.coordinator.request_sync(ItemId::new(id))?;
            host.drain().await?;
        }
        Command::Flush => {
            host.coordinator
                .perform_sync(SyncJob::flush(host.preferences.as_ref()));
            host.drain().await?;
        }
        Command::Deferred => {
            print_json(&host.deferrals.list()?)?;
        }
        Command::InitConfig => {}
    }
    Ok(())
}

fn build_host(cli: &Cli, config: &SyncConfig) -> anyhow::Result<Host> {
    let preferences = Arc::new(ConfigPreferences::new(
        config.offline.clone(),
        cli.net.into(),
    ));

    let fetcher = match &cli.items {
        Some(path) => InMemoryItemSource::from_json_file(path)
            .with_context(|| format!("loading items from {}", path.display()))?,
        None => InMemoryItemSource::new(),
    };

    let deferrals: Arc<dyn DeferralStore> =
        match cli.deferral.clone().or_else(|| config.deferral_path()) {
            Some(path) if !cli.no_persist => Arc::new(
                FileDeferralStore::open(&path)
                    .with_context(|| format!("opening deferral file {}", path.display()))?,
            ),
            _ => Arc::new(InMemoryDeferralStore::new()),
        };

    let article = if cli.render {
        ArticleBackend::Renderer(Arc::new(SimulatedRenderer))
    } else {
        ArticleBackend::Service(Arc::new(LoggingWebCache::new()))
    };

    let scheduler = Arc::new(InMemoryHostScheduler::new());
    let coordinator = CoordinatorBuilder::new()
        .config(config)
        .fetcher(Arc::new(fetcher))
        .deferral_store(Arc::clone(&deferrals))
        .notifier(Arc::new(TracingNotifier))
        .preferences(preferences.clone())
        .host_scheduler(scheduler.clone())
        .readability(Arc::new(ImmediateReadability))
        .article_backend(article)
        .build()?;

    Ok(Host {
        coordinator,
        scheduler,
        deferrals,
        preferences,
    })
}

impl Host {
    /// Run one job to completion, deferral or timeout.
    async fn run(&self, job: SyncJob) -> anyhow::Result<RunReport> {
        let id = job.id.clone();
        let (tx, mut done) = mpsc::unbounded_channel();
        self.coordinator.perform_sync_with(
            job,
            Some(Arc::new(move |id: &ItemId| {
                let _ = tx.send(id.clone());
            })),
        );

        let mut last = self.coordinator.status(&id);
        let wait = tokio::time::timeout(self.coordinator.timeout(), async {
            loop {
                tokio::select! {
                    finished = done.recv() => return finished.is_some(),
                    _ = sleep(Duration::from_millis(100)) => {
                        if let Some(view) = self.coordinator.status(&id) {
                            last = Some(view);
                        }
                    }
                }
            }
        });
        let completed = wait.await.unwrap_or(false);
        let state = if completed {
            Some(RunState::Completed)
        } else {
            // the walk ran dry or timed out; do not wait for the timer
            if let Some(view) = self.coordinator.status(&id) {
                last = Some(view);
            }
            self.coordinator.stop_sync(&id);
            let state = self.coordinator.run_state(&id).map(|(_, state)| state);
            warn!(job = %id, ?state, "sync did not complete");
            state
        };

        let (title, progress, max) = match last {
            Some(view) if !completed => (view.title, view.progress, view.max),
            Some(view) => (view.title, view.max, view.max),
            None => (None, 0, 0),
        };
        Ok(RunReport {
            id,
            completed,
            state,
            title,
            progress,
            max,
            deferred: self.deferrals.list()?.into_iter().collect(),
        })
    }

    /// Act as the OS scheduler: run every released job whose network
    /// constraint the current connection satisfies.
    async fn drain(&self) -> anyhow::Result<()> {
        for request in self.scheduler.take_syncs() {
            info!(manual = request.manual, "running account sync");
            self.coordinator
                .perform_sync(SyncJob::from_extras(&request.extras));
        }

        let connectivity = self.preferences.connectivity();
        for request in self.scheduler.take_jobs() {
            let allowed = match (request.network, connectivity) {
                (_, Connectivity::Offline) => false,
                (NetworkType::Unmetered, Connectivity::Metered) => false,
                _ => true,
            };
            if !allowed && !request.run_immediately {
                info!(job = %request.id, network = ?request.network, "waiting for a suitable network");
                continue;
            }
            // a fresh look at the connection, like a job service would take
            let job = SyncJob {
                connection_enabled: self.preferences.current_connection_enabled(),
                ..SyncJob::from_extras(&request.extras)
            };
            let report = self.run(job).await?;
            print_json(&report)?;
        }
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
