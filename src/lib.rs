//! Clearinghouse - offline-first data core for an investment marketplace
//!
//! Clearinghouse keeps a durable local cache in agreement with a remote
//! MongoDB store and runs a priority-ordered set of automation rules on
//! every entity change.
//!
//! ## Components
//!
//! - **Sync engine**: full-collection refresh into a sled-backed cache,
//!   write-through mutations, stale reads on remote failure
//! - **Rule dispatcher**: due-diligence gating, risk alerts, milestone skip
//!   reviews, payment routing, signature sequencing, service auto-assignment
//! - **Collaborators**: audit sink, notifier, and risk assessor behind
//!   trait seams with in-memory stand-ins for tests
//! - **Health**: counters and a broadcast event stream for sync and rule
//!   outcomes

pub mod audit;
pub mod config;
pub mod gateway;
pub mod health;
pub mod model;
pub mod notify;
pub mod risk;
pub mod rules;
pub mod store;
pub mod sync;
pub mod types;

pub use config::Args;
pub use health::{BuildInfo, EngineEvent, Health, MetricsSnapshot};
pub use model::Collection;
pub use rules::{Registry, RuleDispatcher};
pub use sync::SyncEngine;
pub use types::{CoreError, Result};
