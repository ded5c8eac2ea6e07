use crate::application::engine::TransferPolicy;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Runtime configuration, from command-line flags or `LEDGER_*` variables.
#[derive(Debug, Clone, Args)]
pub struct LedgerConfig {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Time budget for a single transfer, in milliseconds.
    #[arg(long, env = "LEDGER_DEADLINE_MS", default_value_t = 5000)]
    pub deadline_ms: u64,

    /// Attempts per transfer when storage reports a transient conflict.
    #[arg(
        long,
        env = "LEDGER_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    /// Base delay between transfer attempts, in milliseconds.
    #[arg(long, env = "LEDGER_RETRY_BACKOFF_MS", default_value_t = 10)]
    pub retry_backoff_ms: u64,

    /// Maximum number of transfers executed concurrently.
    #[arg(
        long,
        env = "LEDGER_WORKERS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub workers: u32,

    /// Log output format.
    #[arg(long, env = "LEDGER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl LedgerConfig {
    pub fn transfer_policy(&self) -> TransferPolicy {
        TransferPolicy {
            deadline: Duration::from_millis(self.deadline_ms),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers as usize
    }
}
