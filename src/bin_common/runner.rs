//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with proper
//! logging, periodic stats and graceful shutdown.

use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// How often to log connection stats, in seconds
    pub stats_interval_secs: u64,
}

impl RunConfig {
    /// Create a new run configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats_interval_secs: 60,
        }
    }

    /// Set stats interval
    pub fn with_stats_interval(mut self, secs: u64) -> Self {
        self.stats_interval_secs = secs;
        self
    }
}

/// Trait for binary applications
#[allow(async_fn_in_trait)]
pub trait BinaryRunner {
    /// Run the application until shutdown is requested
    async fn run(&mut self) -> anyhow::Result<()>;

    /// Get the run configuration
    fn config(&self) -> &RunConfig;

    /// Summary printed on shutdown
    fn stats(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Press Ctrl+C to stop");
        info!("========================================");
        info!("");
    }

    fn print_shutdown(&self) {
        let config = self.config();
        info!("");
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = self.stats() {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Execute the binary with banner, run and shutdown summary
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        self.print_shutdown();
        result
    }
}

/// Wait for Ctrl+C
pub async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop {
        config: RunConfig,
        runs: usize,
    }

    impl BinaryRunner for Noop {
        async fn run(&mut self) -> anyhow::Result<()> {
            self.runs += 1;
            Ok(())
        }

        fn config(&self) -> &RunConfig {
            &self.config
        }
    }

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new("test-binary").with_stats_interval(10);

        assert_eq!(config.name, "test-binary");
        assert_eq!(config.stats_interval_secs, 10);
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::new("default");
        assert_eq!(config.stats_interval_secs, 60);
    }

    #[tokio::test]
    async fn test_execute_runs_once() {
        let mut runner = Noop {
            config: RunConfig::new("noop"),
            runs: 0,
        };
        runner.execute().await.unwrap();
        assert_eq!(runner.runs, 1);
        assert!(runner.stats().is_none());
    }
}
