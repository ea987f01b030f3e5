//! Job Watch - Main Library
//!
//! Watches job status and progress over a single resilient WebSocket
//! connection.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **config**: Application configuration loaded from YAML
//! - **logging**: Tracing subscriber setup
//! - **jobsockets**: WebSocket connection manager (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,no_run
//! use job_watch::bin_common::{load_config_from_env, ConfigType};
//! use job_watch::config::AppConfig;
//!
//! let config = AppConfig::load(load_config_from_env(ConfigType::Watch)).unwrap();
//! ```

// Re-export workspace libraries for convenience
pub use jobsockets;

pub mod config;
pub mod logging;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
