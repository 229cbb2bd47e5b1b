//! Configuration for the clearinghouse worker
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::path::PathBuf;

/// Clearinghouse - offline-first sync and rule automation core
#[derive(Parser, Debug, Clone)]
#[command(name = "clearinghouse")]
#[command(about = "Sync worker for the investment marketplace data core")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "clearinghouse")]
    pub mongodb_db: String,

    /// Directory for the durable local cache
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Seconds between full sync passes
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value = "60")]
    pub sync_interval_secs: u64,

    /// Baseline overall risk score used when no scoring service is wired up
    #[arg(long, env = "BASELINE_RISK_SCORE", default_value = "50.0")]
    pub baseline_risk_score: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if self.sync_interval_secs == 0 {
            return Err("SYNC_INTERVAL_SECS must be at least 1".to_string());
        }

        if !(0.0..=100.0).contains(&self.baseline_risk_score) {
            return Err("BASELINE_RISK_SCORE must be between 0 and 100".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let args = Args::parse_from(["clearinghouse"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.mongodb_db, "clearinghouse");
        assert_eq!(args.sync_interval_secs, 60);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let args = Args::parse_from(["clearinghouse", "--sync-interval-secs", "0"]);
        assert!(args.validate().is_err());
    }
}
