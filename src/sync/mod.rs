//! Sync engine
//!
//! Owns the local cache and every write path to the remote store. Reads are
//! served from an in-memory mirror backed by the durable cache; writes go
//! through the gateway first and only the canonical record the remote store
//! confirmed is mirrored locally (write-through, never write-back).
//!
//! Every confirmed mutation is handed to the rule dispatcher before the
//! call returns, so rule effects are ordered after their trigger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::gateway::RemoteGateway;
use crate::health::Health;
use crate::model::{
    record_id, Agreement, Collection, Milestone, MilestoneStatus, NewMilestone, NewOffer,
    NewOpportunity, NewPayment, NewServiceRequest, Offer, Opportunity, OpportunityStatus, Payment,
    PaymentStatus, ServiceRequest, SignatureParty,
};
use crate::rules::RuleDispatcher;
use crate::store::CacheStore;
use crate::types::{CoreError, Result};

/// Per-collection sync bookkeeping
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    /// When the collection last completed a full refresh
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Whether a refresh is currently running
    pub is_syncing: bool,
}

/// Offline-first data core: durable cache + write-through mutations + rule
/// dispatch
pub struct SyncEngine {
    gateway: Arc<dyn RemoteGateway>,
    store: Arc<dyn CacheStore>,
    dispatcher: Arc<RuleDispatcher>,
    health: Arc<Health>,
    state: RwLock<HashMap<Collection, SyncState>>,
    // In-memory mirror of the cache, serving reads without touching disk
    records: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl SyncEngine {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        store: Arc<dyn CacheStore>,
        dispatcher: Arc<RuleDispatcher>,
        health: Arc<Health>,
    ) -> Self {
        Self {
            gateway,
            store,
            dispatcher,
            health,
            state: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All cached records in a collection. Never touches the network: after
    /// a failed sync this returns the last good snapshot.
    pub async fn records(&self, collection: Collection) -> Vec<Value> {
        self.records
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Sync bookkeeping for a collection
    pub async fn sync_state(&self, collection: Collection) -> SyncState {
        self.state
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Populate the in-memory mirror from the durable cache. Called once at
    /// startup so reads work before the first remote sync.
    pub async fn hydrate(&self) -> Result<usize> {
        let mut total = 0;
        let mut mirror = self.records.write().await;
        for collection in Collection::ALL {
            let cached = self.store.get_all(collection).await?;
            total += cached.len();
            mirror.insert(collection, cached);
        }
        info!(records = total, "Hydrated cache mirror from local store");
        Ok(total)
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Refresh one collection from the remote store.
    ///
    /// The fetched payload is schema-checked before anything is replaced; a
    /// failed fetch or a malformed payload leaves the cache and mirror at
    /// their last good snapshot. Returns the number of records synced, or 0
    /// when a refresh of the same collection is already running.
    pub async fn sync_collection(&self, collection: Collection) -> Result<usize> {
        {
            let mut state = self.state.write().await;
            let entry = state.entry(collection).or_default();
            if entry.is_syncing {
                debug!(collection = %collection, "Sync already in progress, skipping");
                return Ok(0);
            }
            entry.is_syncing = true;
        }

        let outcome = self.refresh(collection).await;

        let mut state = self.state.write().await;
        let entry = state.entry(collection).or_default();
        entry.is_syncing = false;
        match outcome {
            Ok(count) => {
                entry.last_synced_at = Some(Utc::now());
                self.health.record_sync_completed(collection, count);
                info!(collection = %collection, records = count, "Collection synced");
                Ok(count)
            }
            Err(err) => {
                self.health.record_sync_failed(collection, &err.to_string());
                warn!(collection = %collection, error = %err, "Sync failed, serving last good snapshot");
                Err(err)
            }
        }
    }

    async fn refresh(&self, collection: Collection) -> Result<usize> {
        let fetched = self.gateway.fetch_all(collection).await?;
        collection.check_schema(&fetched)?;
        self.store.replace_all(collection, &fetched).await?;

        let count = fetched.len();
        self.records.write().await.insert(collection, fetched);
        Ok(count)
    }

    /// Refresh every collection in the fixed order. Failures are recorded
    /// and skipped so one unreachable collection never blocks the rest.
    /// Returns how many collections refreshed successfully.
    pub async fn sync_all(&self) -> usize {
        let mut synced = 0;
        for collection in Collection::ALL {
            if self.sync_collection(collection).await.is_ok() {
                synced += 1;
            }
        }
        synced
    }

    // ========================================================================
    // Mutations (write-through)
    // ========================================================================

    /// Create an opportunity in `pending_review`, which arms the
    /// due-diligence rule.
    pub async fn add_opportunity(&self, new: NewOpportunity) -> Result<Opportunity> {
        if new.title.trim().is_empty() {
            return Err(CoreError::Validation("opportunity title is required".into()));
        }
        if new.entrepreneur_id.trim().is_empty() {
            return Err(CoreError::Validation("entrepreneur_id is required".into()));
        }
        if new.amount_sought <= 0.0 {
            return Err(CoreError::Validation(
                "amount_sought must be positive".into(),
            ));
        }

        let record = json!({
            "title": new.title,
            "entrepreneur_id": new.entrepreneur_id,
            "status": OpportunityStatus::PendingReview.as_str(),
            "amount_sought": new.amount_sought,
            "summary": new.summary,
            "due_diligence_completed": false,
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let canonical = self.gateway.insert(Collection::Opportunities, record).await?;
        self.write_through(Collection::Opportunities, "opportunity_update", canonical)
            .await
    }

    pub async fn add_offer(&self, new: NewOffer) -> Result<Offer> {
        if new.amount <= 0.0 {
            return Err(CoreError::Validation("offer amount must be positive".into()));
        }

        let record = json!({
            "opportunity_id": new.opportunity_id,
            "investor_id": new.investor_id,
            "status": "pending",
            "amount": new.amount,
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let canonical = self.gateway.insert(Collection::Offers, record).await?;
        self.write_through(Collection::Offers, "offer_update", canonical)
            .await
    }

    /// Submit a payment. With a proof attached it lands in `pending_proof`,
    /// which routes it to admin verification.
    pub async fn add_payment(&self, new: NewPayment) -> Result<Payment> {
        if new.amount <= 0.0 {
            return Err(CoreError::Validation(
                "payment amount must be positive".into(),
            ));
        }

        let record = json!({
            "opportunity_id": new.opportunity_id,
            "payer_id": new.payer_id,
            "status": PaymentStatus::PendingProof.as_str(),
            "amount": new.amount,
            "proof_url": new.proof_url,
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let canonical = self.gateway.insert(Collection::Payments, record).await?;
        self.write_through(Collection::Payments, "payment_update", canonical)
            .await
    }

    pub async fn add_milestone(&self, new: NewMilestone) -> Result<Milestone> {
        if new.title.trim().is_empty() {
            return Err(CoreError::Validation("milestone title is required".into()));
        }

        let record = json!({
            "opportunity_id": new.opportunity_id,
            "title": new.title,
            "status": MilestoneStatus::Planned.as_str(),
            "total_skipped_milestones": 0,
            "opportunity_value": new.opportunity_value,
            "due_date": new.due_date,
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let canonical = self.gateway.insert(Collection::Milestones, record).await?;
        self.write_through(Collection::Milestones, "milestone_update", canonical)
            .await
    }

    /// Publish a service request, which arms auto-assignment
    pub async fn add_service_request(&self, new: NewServiceRequest) -> Result<ServiceRequest> {
        if new.category.trim().is_empty() {
            return Err(CoreError::Validation(
                "service request category is required".into(),
            ));
        }

        let record = json!({
            "requester_id": new.requester_id,
            "category": new.category,
            "title": new.title,
            "status": "published",
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let canonical = self
            .gateway
            .insert(Collection::ServiceRequests, record)
            .await?;
        self.write_through(
            Collection::ServiceRequests,
            "service_request_update",
            canonical,
        )
        .await
    }

    pub async fn update_opportunity_status(
        &self,
        id: &str,
        status: OpportunityStatus,
    ) -> Result<Opportunity> {
        let canonical = self
            .gateway
            .update(
                Collection::Opportunities,
                id,
                json!({"status": status.as_str(), "updated_at": Utc::now()}),
            )
            .await?;
        self.write_through(Collection::Opportunities, "opportunity_update", canonical)
            .await
    }

    /// Change a milestone's status. Moving to `skipped` bumps the
    /// opportunity's cumulative skip count, which drives the skip review.
    pub async fn update_milestone_status(
        &self,
        id: &str,
        status: MilestoneStatus,
    ) -> Result<Milestone> {
        let mut patch = json!({"status": status.as_str(), "updated_at": Utc::now()});
        if status == MilestoneStatus::Skipped {
            let current = self
                .cached_record(Collection::Milestones, id)
                .await
                .and_then(|r| r.get("total_skipped_milestones").and_then(|v| v.as_u64()))
                .unwrap_or(0);
            patch["total_skipped_milestones"] = json!(current + 1);
        }

        let canonical = self
            .gateway
            .update(Collection::Milestones, id, patch)
            .await?;
        self.write_through(Collection::Milestones, "milestone_update", canonical)
            .await
    }

    pub async fn update_payment_status(&self, id: &str, status: PaymentStatus) -> Result<Payment> {
        let canonical = self
            .gateway
            .update(
                Collection::Payments,
                id,
                json!({"status": status.as_str(), "updated_at": Utc::now()}),
            )
            .await?;
        self.write_through(Collection::Payments, "payment_update", canonical)
            .await
    }

    /// Record one party's signature on an agreement. Sequencing (moving the
    /// agreement to the other party) is the signature rule's job.
    pub async fn record_signature(
        &self,
        agreement_id: &str,
        party: SignatureParty,
    ) -> Result<Agreement> {
        let field = match party {
            SignatureParty::Entrepreneur => "entrepreneur_signed",
            SignatureParty::Investor => "investor_signed",
        };
        let canonical = self
            .gateway
            .update(
                Collection::Agreements,
                agreement_id,
                json!({field: true, "updated_at": Utc::now()}),
            )
            .await?;
        self.write_through(Collection::Agreements, "agreement_update", canonical)
            .await
    }

    /// Manually assign a provider to a request (admin override of
    /// auto-assignment)
    pub async fn assign_provider(
        &self,
        request_id: &str,
        provider_id: &str,
    ) -> Result<ServiceRequest> {
        let canonical = self
            .gateway
            .update(
                Collection::ServiceRequests,
                request_id,
                json!({
                    "assigned_provider_id": provider_id,
                    "status": "assigned",
                    "updated_at": Utc::now(),
                }),
            )
            .await?;
        self.write_through(
            Collection::ServiceRequests,
            "service_request_update",
            canonical,
        )
        .await
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn cached_record(&self, collection: Collection, id: &str) -> Option<Value> {
        self.records
            .read()
            .await
            .get(&collection)?
            .iter()
            .find(|r| record_id(r) == Some(id))
            .cloned()
    }

    /// Mirror a gateway-confirmed record locally, then dispatch rules on it.
    ///
    /// The remote write has already happened; a failed local persist is
    /// logged and counted against the next sync, never surfaced to the
    /// caller, so the remote store and the caller's view stay in agreement.
    async fn write_through<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        context: &str,
        canonical: Value,
    ) -> Result<T> {
        if let Err(err) = self.store.upsert(collection, &canonical).await {
            warn!(collection = %collection, error = %err, "Local cache write failed, will repair on next sync");
        }

        {
            let mut mirror = self.records.write().await;
            let slot = mirror.entry(collection).or_default();
            match slot
                .iter_mut()
                .find(|r| record_id(r) == record_id(&canonical))
            {
                Some(existing) => *existing = canonical.clone(),
                None => slot.push(canonical.clone()),
            }
        }

        self.dispatcher.process(context, &canonical).await;

        serde_json::from_value(canonical).map_err(Into::into)
    }
}
