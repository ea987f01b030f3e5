//! Job watcher
//!
//! Opens one WebSocket connection, subscribes to the configured jobs and
//! logs every update until Ctrl+C.
//!
//! Usage:
//!   cargo run --bin job_watch [job-id ...]
//!
//! Job ids on the command line are watched in addition to those in the
//! config file.
//!
//! Environment variables:
//!   JOB_WATCH_CONFIG - config path (default config/job_watch.yaml)
//!   JOB_WATCH_WS_URL - overrides socket.url
//!   JOB_WATCH_TOKEN  - access token sent as the WebSocket sub-protocol

use anyhow::{Context, Result};
use job_watch::bin_common::runner::wait_for_shutdown;
use job_watch::bin_common::{load_config_from_env, parse_args, BinaryRunner, ConfigType, RunConfig};
use job_watch::config::{AppConfig, TOKEN_ENV};
use job_watch::jobsockets::{
    ChannelSink, ConnectionManager, EnvToken, Fact, TungsteniteConnector,
};
use job_watch::logging::init_tracing;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

struct JobWatcher {
    run_config: RunConfig,
    config: AppConfig,
    manager: ConnectionManager,
    consumer: Option<JoinHandle<usize>>,
}

impl JobWatcher {
    fn new(config: AppConfig) -> Self {
        let manager = ConnectionManager::new(config.socket.clone(), TungsteniteConnector::new());
        manager.set_credentials(EnvToken::new(TOKEN_ENV));

        let (sink, rx) = ChannelSink::unbounded();
        manager.set_dispatch(sink);

        // Facts are consumed off the runtime; the thread ends when the
        // manager (and with it the sender) is dropped
        let consumer = std::thread::spawn(move || {
            let mut count = 0;
            for fact in rx {
                log_fact(&fact);
                count += 1;
            }
            count
        });

        Self {
            run_config: RunConfig::new("Job Watch"),
            config,
            manager,
            consumer: Some(consumer),
        }
    }

    fn subscribe_all(&self) -> Result<()> {
        for job_id in &self.config.jobs {
            self.manager
                .subscribe_job_details(job_id, false)
                .with_context(|| format!("subscribing to details of {}", job_id))?;
            if self.config.progress {
                self.manager
                    .subscribe_job_progress(job_id, false)
                    .with_context(|| format!("subscribing to progress of {}", job_id))?;
            }
        }
        info!(
            "Watching {} job(s), {} subscription(s)",
            self.config.jobs.len(),
            self.manager.subscription_count()
        );
        Ok(())
    }
}

impl BinaryRunner for JobWatcher {
    async fn run(&mut self) -> Result<()> {
        self.manager.open()?;
        self.subscribe_all()?;

        let mut stats = tokio::time::interval(Duration::from_secs(self.run_config.stats_interval_secs));
        stats.tick().await;

        let shutdown = wait_for_shutdown();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = stats.tick() => {
                    let metrics = self.manager.metrics();
                    info!(
                        "state={:?} sent={} received={} reconnects={} dropped={}",
                        self.manager.connection_state(),
                        metrics.messages_sent,
                        metrics.messages_received,
                        metrics.reconnect_count,
                        metrics.dropped_sends,
                    );
                }
            }
        }

        self.manager.close();
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        let metrics = self.manager.metrics();
        Some(format!(
            "Messages: {} sent, {} received, {} malformed | Reconnects: {}",
            metrics.messages_sent,
            metrics.messages_received,
            metrics.malformed_frames,
            metrics.reconnect_count
        ))
    }
}

fn log_fact(fact: &Fact) {
    if fact.is_connection_established() {
        info!("Server acknowledged connection");
        return;
    }

    let id = fact.payload.get("id").and_then(|v| v.as_str()).unwrap_or("?");
    match fact.kind.as_str() {
        "job-details" => info!(
            "[{}] state={}",
            id,
            fact.payload.get("state").map(|v| v.to_string()).unwrap_or_default()
        ),
        "job-progress" => info!("[{}] progress {}", id, fact.payload),
        other => debug!("[{}] {}: {}", id, other, fact.payload),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = load_config_from_env(ConfigType::Watch);
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.jobs.extend(parse_args());
    config.validate()?;

    init_tracing(&config.log_level);
    info!("Loaded configuration from {}", config_path.display());
    if std::env::var(TOKEN_ENV).is_err() {
        warn!("{} not set, connecting without credentials", TOKEN_ENV);
    }

    let mut watcher = JobWatcher::new(config);
    let result = watcher.execute().await;

    // Dropping the manager closes the fact channel
    let consumer = watcher.consumer.take();
    drop(watcher);
    if let Some(handle) = consumer {
        if let Ok(count) = handle.join() {
            info!("Dispatched {} fact(s)", count);
        }
    }

    result
}
