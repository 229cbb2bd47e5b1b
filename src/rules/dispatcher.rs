//! Rule dispatcher
//!
//! Executes the actions behind matched rules. Dispatch is sequential in
//! priority order; one failing rule is logged and counted but never stops
//! the rules behind it. Every execution, success or failure, is appended to
//! the audit sink before the next rule runs.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::gateway::{GatewayError, RemoteGateway};
use crate::health::Health;
use crate::model::{record_id, Collection, ServiceProvider};
use crate::notify::{Audience, Notification, Notifier, NotifyError};
use crate::risk::{RiskAssessor, RiskError};

use super::assignment::select_provider;
use super::milestone_risk::{classify_risk, skip_recommendations};
use super::{u64_field, Registry, RuleDef, RuleId, DUE_DILIGENCE_ALERT_THRESHOLD};

/// Error types for rule actions
#[derive(Debug, thiserror::Error)]
pub enum RuleActionError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Record is missing a field the action needs
    #[error("Invalid record for rule: {0}")]
    Invalid(String),
}

/// Runs rule actions against the remote store and collaborators
pub struct RuleDispatcher {
    registry: Registry,
    gateway: Arc<dyn RemoteGateway>,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    risk: Arc<dyn RiskAssessor>,
    health: Arc<Health>,
}

impl RuleDispatcher {
    pub fn new(
        registry: Registry,
        gateway: Arc<dyn RemoteGateway>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        risk: Arc<dyn RiskAssessor>,
        health: Arc<Health>,
    ) -> Self {
        Self {
            registry,
            gateway,
            audit,
            notifier,
            risk,
            health,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch every matching rule for a changed record. `context` names
    /// the change, e.g. `opportunity_update` or `milestone_update`. Returns
    /// the number of rules that ran (including failed ones).
    pub async fn process(&self, context: &str, record: &Value) -> usize {
        let matched = self.registry.matching(record);
        if matched.is_empty() {
            return 0;
        }

        let id = record_id(record);
        for rule in &matched {
            let outcome = self.execute(rule.id, record).await;
            match &outcome {
                Ok(()) => {
                    info!(rule = %rule.name, context = %context, record_id = ?id, "Rule executed");
                    self.health.record_rule_executed(rule.id, context, id);
                }
                Err(err) => {
                    warn!(rule = %rule.name, context = %context, record_id = ?id, error = %err, "Rule failed");
                    self.health
                        .record_rule_failed(rule.id, context, id, &err.to_string());
                }
            }
            self.append_execution_audit(rule, context, record, &outcome)
                .await;
        }
        matched.len()
    }

    /// Write the per-rule audit record. Awaited so the log order matches
    /// execution order; a failed append is counted but never fails dispatch.
    async fn append_execution_audit(
        &self,
        rule: &RuleDef,
        context: &str,
        record: &Value,
        outcome: &Result<(), RuleActionError>,
    ) {
        let action_type = match outcome {
            Ok(()) => "rule_executed",
            Err(_) => "rule_failed",
        };
        let mut details = json!({
            "rule_id": rule.id,
            "rule_name": rule.name,
            "priority": rule.priority,
            "record": record,
        });
        if let Err(err) = outcome {
            details["error"] = json!(err.to_string());
        }

        let mut entry = AuditEntry::new(action_type, context).with_details(details);
        if let Some(id) = record_id(record) {
            entry = entry.with_resource_id(id);
        }

        if let Err(err) = self.audit.append(entry).await {
            warn!(rule = %rule.name, error = %err, "Audit append failed");
            self.health.record_audit_append_failure();
        }
    }

    async fn execute(&self, id: RuleId, record: &Value) -> Result<(), RuleActionError> {
        match id {
            RuleId::DueDiligenceGate => self.run_due_diligence(record).await,
            RuleId::HighRiskAlert => self.alert_high_risk(record).await,
            RuleId::MilestoneSkipAlert => self.review_milestone_skip(record).await,
            RuleId::PaymentVerification => self.route_payment_proof(record).await,
            RuleId::SignatureSequencing => self.advance_signature(record).await,
            RuleId::ServiceAutoAssignment => self.assign_provider(record).await,
        }
    }

    /// Score the opportunity, persist the assessment, and alert admins when
    /// the score clears the review threshold.
    async fn run_due_diligence(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        let assessment = self.risk.assess_risk(record).await?;

        self.gateway
            .update(
                Collection::Opportunities,
                id,
                json!({
                    "risk_score": assessment.overall_risk,
                    "risk_factors": assessment.factors,
                    "due_diligence_completed": true,
                }),
            )
            .await?;

        if assessment.overall_risk > DUE_DILIGENCE_ALERT_THRESHOLD {
            self.notifier
                .notify(Notification {
                    audience: Audience::Admins,
                    subject: format!("Due diligence flagged opportunity {id}"),
                    body: format!(
                        "Overall risk {:.1} exceeds the review threshold. Factors: {}",
                        assessment.overall_risk,
                        assessment.factors.join("; "),
                    ),
                })
                .await?;
        }
        Ok(())
    }

    async fn alert_high_risk(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        let score = record
            .get("risk_score")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let factors: Vec<String> = record
            .get("risk_factors")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        self.notifier
            .notify(Notification {
                audience: Audience::Admins,
                subject: format!("High-risk record {id}"),
                body: format!("Risk score {score:.1}. Factors: {}", factors.join("; ")),
            })
            .await?;
        Ok(())
    }

    /// Grade the skip, record the review in the audit trail, and notify the
    /// opportunity's accepted investors.
    async fn review_milestone_skip(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        let opportunity_id = record
            .get("opportunity_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RuleActionError::Invalid("milestone has no opportunity_id".into()))?;

        let skip_count = u64_field(record, "total_skipped_milestones").unwrap_or(1);
        let value = record
            .get("opportunity_value")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let level = classify_risk(skip_count, value);
        let recommendations = skip_recommendations(skip_count, value);

        self.audit
            .append(
                AuditEntry::new("milestone_skip_review", "milestone")
                    .with_resource_id(id)
                    .with_details(json!({
                        "risk_level": level,
                        "recommendations": recommendations,
                        "skip_count": skip_count,
                        "opportunity_value": value,
                    })),
            )
            .await?;

        self.notifier
            .notify(Notification {
                audience: Audience::AcceptedInvestors {
                    opportunity_id: opportunity_id.to_string(),
                },
                subject: format!("Milestone skipped on opportunity {opportunity_id}"),
                body: format!(
                    "Skip risk is {level}. Recommended actions: {}",
                    recommendations.join("; "),
                ),
            })
            .await?;
        Ok(())
    }

    async fn route_payment_proof(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        self.notifier
            .notify(Notification {
                audience: Audience::Admins,
                subject: format!("Payment {id} awaiting verification"),
                body: "A payment proof was submitted and needs admin review.".to_string(),
            })
            .await?;
        Ok(())
    }

    /// Entrepreneur has signed a draft agreement: move it to the investor's
    /// queue and tell them it is their turn.
    async fn advance_signature(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        let investor_id = record
            .get("investor_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RuleActionError::Invalid("agreement has no investor_id".into()))?;

        self.gateway
            .update(
                Collection::Agreements,
                id,
                json!({"status": "awaiting_investor"}),
            )
            .await?;

        self.notifier
            .notify(Notification {
                audience: Audience::User {
                    user_id: investor_id.to_string(),
                },
                subject: format!("Agreement {id} is ready for your signature"),
                body: "The entrepreneur has signed. The agreement now awaits your signature."
                    .to_string(),
            })
            .await?;
        Ok(())
    }

    /// Assign the best verified provider in the request's category. No
    /// eligible provider is not an error; the request stays open.
    async fn assign_provider(&self, record: &Value) -> Result<(), RuleActionError> {
        let id = require_id(record)?;
        let category = record
            .get("category")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RuleActionError::Invalid("service request has no category".into()))?;

        let raw = self.gateway.fetch_all(Collection::ServiceProviders).await?;
        let providers: Vec<ServiceProvider> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();

        let Some(provider) = select_provider(&providers, category) else {
            info!(request = %id, category = %category, "No eligible provider, request stays open");
            return Ok(());
        };

        self.gateway
            .update(
                Collection::ServiceRequests,
                id,
                json!({"assigned_provider_id": provider.id}),
            )
            .await?;
        info!(request = %id, provider = %provider.id, "Provider auto-assigned");
        Ok(())
    }
}

fn require_id(record: &Value) -> Result<&str, RuleActionError> {
    record_id(record).ok_or_else(|| RuleActionError::Invalid("record has no id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::gateway::InMemoryGateway;
    use crate::notify::InMemoryNotifier;
    use crate::risk::{RiskAssessment, StaticRiskAssessor};

    struct Harness {
        dispatcher: RuleDispatcher,
        gateway: Arc<InMemoryGateway>,
        audit: Arc<InMemoryAuditSink>,
        notifier: Arc<InMemoryNotifier>,
        risk: Arc<StaticRiskAssessor>,
    }

    fn harness(assessment: RiskAssessment) -> Harness {
        let gateway = Arc::new(InMemoryGateway::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let notifier = Arc::new(InMemoryNotifier::new());
        let risk = Arc::new(StaticRiskAssessor::new(assessment));
        let health = Arc::new(Health::new(16));
        let dispatcher = RuleDispatcher::new(
            Registry::builtin(),
            gateway.clone(),
            audit.clone(),
            notifier.clone(),
            risk.clone(),
            health,
        );
        Harness {
            dispatcher,
            gateway,
            audit,
            notifier,
            risk,
        }
    }

    #[tokio::test]
    async fn test_due_diligence_persists_assessment_and_alerts() {
        let h = harness(RiskAssessment::baseline(85.0));
        h.gateway
            .seed(
                Collection::Opportunities,
                vec![json!({
                    "id": "opp-1",
                    "status": "pending_review",
                    "due_diligence_completed": false,
                })],
            )
            .await;

        let record = json!({
            "id": "opp-1",
            "status": "pending_review",
            "due_diligence_completed": false,
        });
        let ran = h.dispatcher.process("opportunity_update", &record).await;
        assert_eq!(ran, 1);

        let stored = h.gateway.records(Collection::Opportunities).await;
        assert_eq!(stored[0]["due_diligence_completed"], json!(true));
        assert_eq!(stored[0]["risk_score"], json!(85.0));

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::Admins);
    }

    #[tokio::test]
    async fn test_due_diligence_below_threshold_skips_alert() {
        let h = harness(RiskAssessment::baseline(40.0));
        h.gateway
            .seed(
                Collection::Opportunities,
                vec![json!({"id": "opp-1", "status": "pending_review"})],
            )
            .await;

        let record = json!({"id": "opp-1", "status": "pending_review"});
        h.dispatcher.process("opportunity_update", &record).await;

        assert!(h.notifier.sent().await.is_empty());
        let stored = h.gateway.records(Collection::Opportunities).await;
        assert_eq!(stored[0]["due_diligence_completed"], json!(true));
    }

    #[tokio::test]
    async fn test_rules_run_in_priority_order() {
        let h = harness(RiskAssessment::baseline(50.0));
        h.gateway
            .seed(
                Collection::Opportunities,
                vec![json!({"id": "opp-1", "status": "pending_review"})],
            )
            .await;

        // Matches both the gate (100) and the high-risk alert (90)
        let record = json!({
            "id": "opp-1",
            "status": "pending_review",
            "due_diligence_completed": false,
            "risk_score": 92.0,
            "risk_factors": ["unproven market"],
        });
        let ran = h.dispatcher.process("opportunity_update", &record).await;
        assert_eq!(ran, 2);

        let entries = h.audit.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].details["rule_id"], json!("due_diligence_gate"));
        assert_eq!(entries[1].details["rule_id"], json!("high_risk_alert"));
    }

    #[tokio::test]
    async fn test_failing_rule_does_not_stop_later_rules() {
        let h = harness(RiskAssessment::baseline(50.0));
        h.risk.set_failing(true);

        let record = json!({
            "id": "opp-1",
            "status": "pending_review",
            "due_diligence_completed": false,
            "risk_score": 95.0,
        });
        let ran = h.dispatcher.process("opportunity_update", &record).await;
        assert_eq!(ran, 2);

        let entries = h.audit.entries().await;
        assert_eq!(entries[0].action_type, "rule_failed");
        assert!(entries[0].details["error"]
            .as_str()
            .unwrap()
            .contains("unavailable"));
        assert_eq!(entries[1].action_type, "rule_executed");

        // The high-risk alert still reached the admins
        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::Admins);
    }

    #[tokio::test]
    async fn test_milestone_skip_review_end_to_end() {
        let h = harness(RiskAssessment::baseline(0.0));

        let record = json!({
            "id": "ms-1",
            "opportunity_id": "opp-9",
            "status": "skipped",
            "total_skipped_milestones": 5,
            "opportunity_value": 2_000_000.0,
        });
        let ran = h.dispatcher.process("milestone_update", &record).await;
        assert_eq!(ran, 1);

        let entries = h.audit.entries().await;
        let review = entries
            .iter()
            .find(|e| e.action_type == "milestone_skip_review")
            .unwrap();
        assert_eq!(review.details["risk_level"], json!("high"));
        let recs = review.details["recommendations"].as_array().unwrap();
        assert!(recs.iter().any(|r| r.as_str().unwrap().contains("Restructure")));
        assert!(recs
            .iter()
            .any(|r| r.as_str().unwrap().contains("emergency meeting")));

        let sent = h.notifier.sent().await;
        assert_eq!(
            sent[0].audience,
            Audience::AcceptedInvestors {
                opportunity_id: "opp-9".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_payment_proof_routed_to_admins() {
        let h = harness(RiskAssessment::baseline(0.0));

        let record = json!({
            "id": "pay-1",
            "opportunity_id": "opp-1",
            "status": "pending_proof",
            "proof_url": "s3://proofs/pay-1.pdf",
        });
        let ran = h.dispatcher.process("payment_update", &record).await;
        assert_eq!(ran, 1);

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::Admins);
        assert!(sent[0].subject.contains("pay-1"));

        let entries = h.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, "rule_executed");
        assert_eq!(entries[0].details["rule_id"], json!("payment_verification"));
    }

    #[tokio::test]
    async fn test_signature_sequencing_advances_agreement() {
        let h = harness(RiskAssessment::baseline(0.0));
        h.gateway
            .seed(
                Collection::Agreements,
                vec![json!({"id": "agr-1", "status": "draft"})],
            )
            .await;

        let record = json!({
            "id": "agr-1",
            "status": "draft",
            "investor_id": "inv-1",
            "entrepreneur_signed": true,
            "investor_signed": false,
        });
        h.dispatcher.process("agreement_update", &record).await;

        let stored = h.gateway.records(Collection::Agreements).await;
        assert_eq!(stored[0]["status"], json!("awaiting_investor"));

        let sent = h.notifier.sent().await;
        assert_eq!(
            sent[0].audience,
            Audience::User {
                user_id: "inv-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_auto_assignment_picks_best_verified_provider() {
        let h = harness(RiskAssessment::baseline(0.0));
        h.gateway
            .seed(
                Collection::ServiceProviders,
                vec![
                    json!({"id": "sp-1", "name": "A", "category": "legal", "verified": true, "rating": 4.2}),
                    json!({"id": "sp-2", "name": "B", "category": "legal", "verified": false, "rating": 5.0}),
                    json!({"id": "sp-3", "name": "C", "category": "legal", "verified": true, "rating": 4.8}),
                ],
            )
            .await;
        h.gateway
            .seed(
                Collection::ServiceRequests,
                vec![json!({"id": "req-1", "status": "published", "category": "legal"})],
            )
            .await;

        let record = json!({"id": "req-1", "status": "published", "category": "legal"});
        h.dispatcher.process("service_request_update", &record).await;

        let stored = h.gateway.records(Collection::ServiceRequests).await;
        assert_eq!(stored[0]["assigned_provider_id"], json!("sp-3"));
    }

    #[tokio::test]
    async fn test_auto_assignment_without_candidates_is_not_an_error() {
        let h = harness(RiskAssessment::baseline(0.0));
        h.gateway
            .seed(
                Collection::ServiceRequests,
                vec![json!({"id": "req-1", "status": "published", "category": "legal"})],
            )
            .await;

        let record = json!({"id": "req-1", "status": "published", "category": "legal"});
        h.dispatcher.process("service_request_update", &record).await;

        let entries = h.audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, "rule_executed");
        let stored = h.gateway.records(Collection::ServiceRequests).await;
        assert!(stored[0].get("assigned_provider_id").is_none());
    }
}
