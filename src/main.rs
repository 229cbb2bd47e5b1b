//! Clearinghouse sync worker
//!
//! Connects the data core to MongoDB, hydrates the local cache, and runs a
//! full sync pass on a fixed interval until interrupted.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clearinghouse::{
    config::Args,
    gateway::{MongoAuditSink, MongoGateway},
    health::{BuildInfo, Health, DEFAULT_EVENT_CAPACITY},
    notify::LogNotifier,
    risk::{RiskAssessment, StaticRiskAssessor},
    rules::{Registry, RuleDispatcher},
    store::SledStore,
    sync::SyncEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clearinghouse={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let build = BuildInfo::current();
    info!("======================================");
    info!("  Clearinghouse sync worker");
    info!("======================================");
    info!("Version: {} ({})", build.version, build.commit);
    info!("Built: {}", build.build_time);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Database: {}", args.mongodb_db);
    info!("Data dir: {}", args.data_dir.display());
    info!("Sync interval: {}s", args.sync_interval_secs);
    info!("======================================");

    let store = Arc::new(SledStore::open(&args.data_dir)?);

    let mongo = match MongoGateway::connect(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(gateway) => {
            info!("MongoDB connected successfully");
            Arc::new(gateway)
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let audit = Arc::new(MongoAuditSink::new(mongo.database()));
    let notifier = Arc::new(LogNotifier::new());
    let risk = Arc::new(StaticRiskAssessor::new(RiskAssessment::baseline(
        args.baseline_risk_score,
    )));
    let health = Arc::new(Health::new(DEFAULT_EVENT_CAPACITY));

    let dispatcher = Arc::new(RuleDispatcher::new(
        Registry::builtin(),
        mongo.clone(),
        audit,
        notifier,
        risk,
        health.clone(),
    ));
    let engine = SyncEngine::new(mongo, store, dispatcher, health.clone());

    let hydrated = engine.hydrate().await?;
    info!(records = hydrated, "Local cache hydrated");

    let mut interval = tokio::time::interval(Duration::from_secs(args.sync_interval_secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let synced = engine.sync_all().await;
                let snapshot = health.snapshot();
                info!(
                    collections = synced,
                    sync_failures = snapshot.sync_failures,
                    rules_executed = snapshot.rules_executed,
                    rule_failures = snapshot.rule_failures,
                    "Sync pass complete"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
