//! Rule registry
//!
//! Automation rules are plain data ([`RuleDef`]) over a closed [`RuleId`]
//! enum; conditions are pure record predicates resolved by id, and actions
//! live on the dispatcher. The registry is built once at startup and never
//! mutated at runtime.
//!
//! Matching is deterministic: filter by condition, then a stable sort by
//! priority descending, so ties keep registry insertion order.

pub mod assignment;
pub mod dispatcher;
pub mod milestone_risk;

pub use dispatcher::RuleDispatcher;
pub use milestone_risk::{classify_risk, skip_recommendations, RiskLevel};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Due-diligence assessments above this overall score alert admins
pub const DUE_DILIGENCE_ALERT_THRESHOLD: f64 = 70.0;

/// Records scoring above this trip the high-risk alert rule
pub const HIGH_RISK_THRESHOLD: f64 = 80.0;

/// Identity of every automation rule the platform ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    DueDiligenceGate,
    HighRiskAlert,
    MilestoneSkipAlert,
    PaymentVerification,
    SignatureSequencing,
    ServiceAutoAssignment,
}

/// Declarative rule descriptor: id, human name, priority. The condition and
/// action are looked up by id, keeping rule data serializable and the logic
/// independently testable.
#[derive(Debug, Clone, Serialize)]
pub struct RuleDef {
    pub id: RuleId,
    pub name: &'static str,
    pub description: &'static str,
    pub priority: i32,
}

/// Ordered, immutable set of rules
pub struct Registry {
    rules: Vec<RuleDef>,
}

impl Registry {
    /// The built-in platform rule set
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                RuleDef {
                    id: RuleId::DueDiligenceGate,
                    name: "Due-diligence gate",
                    description: "Run risk assessment when an opportunity enters review",
                    priority: 100,
                },
                RuleDef {
                    id: RuleId::HighRiskAlert,
                    name: "High-risk alert",
                    description: "Alert admins when a record's risk score exceeds the threshold",
                    priority: 90,
                },
                RuleDef {
                    id: RuleId::MilestoneSkipAlert,
                    name: "Milestone skip alert",
                    description: "Classify risk and notify investors when a milestone is skipped",
                    priority: 80,
                },
                RuleDef {
                    id: RuleId::PaymentVerification,
                    name: "Payment verification",
                    description: "Route payment proofs to admin reviewers",
                    priority: 70,
                },
                RuleDef {
                    id: RuleId::SignatureSequencing,
                    name: "Signature sequencing",
                    description: "Advance a draft agreement once the entrepreneur has signed",
                    priority: 60,
                },
                RuleDef {
                    id: RuleId::ServiceAutoAssignment,
                    name: "Service auto-assignment",
                    description: "Assign the top-rated verified provider to a published request",
                    priority: 50,
                },
            ],
        }
    }

    pub fn rules(&self) -> &[RuleDef] {
        &self.rules
    }

    pub fn get(&self, id: RuleId) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Rules whose condition holds for the record, ordered by descending
    /// priority (stable for ties)
    pub fn matching(&self, record: &Value) -> Vec<&RuleDef> {
        let mut matched: Vec<&RuleDef> = self
            .rules
            .iter()
            .filter(|rule| condition_holds(rule.id, record))
            .collect();
        matched.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        matched
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Pure record predicate for a rule
pub fn condition_holds(id: RuleId, record: &Value) -> bool {
    match id {
        RuleId::DueDiligenceGate => {
            str_field(record, "status") == Some("pending_review")
                && !bool_field(record, "due_diligence_completed")
        }
        RuleId::HighRiskAlert => {
            f64_field(record, "risk_score").is_some_and(|score| score > HIGH_RISK_THRESHOLD)
        }
        RuleId::MilestoneSkipAlert => str_field(record, "status") == Some("skipped"),
        RuleId::PaymentVerification => {
            str_field(record, "status") == Some("pending_proof")
                && str_field(record, "proof_url").is_some_and(|url| !url.is_empty())
        }
        RuleId::SignatureSequencing => {
            str_field(record, "status") == Some("draft")
                && bool_field(record, "entrepreneur_signed")
                && !bool_field(record, "investor_signed")
        }
        RuleId::ServiceAutoAssignment => {
            str_field(record, "status") == Some("published")
                && str_field(record, "assigned_provider_id")
                    .map(|id| id.is_empty())
                    .unwrap_or(true)
        }
    }
}

fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(|v| v.as_str())
}

fn bool_field(record: &Value, field: &str) -> bool {
    record.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn f64_field(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(|v| v.as_f64())
}

pub(crate) fn u64_field(record: &Value, field: &str) -> Option<u64> {
    record.get(field).and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_priorities_are_distinct_and_descending() {
        let registry = Registry::builtin();
        let priorities: Vec<i32> = registry.rules().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn test_due_diligence_condition() {
        let pending = json!({"status": "pending_review", "due_diligence_completed": false});
        assert!(condition_holds(RuleId::DueDiligenceGate, &pending));

        let done = json!({"status": "pending_review", "due_diligence_completed": true});
        assert!(!condition_holds(RuleId::DueDiligenceGate, &done));

        let published = json!({"status": "published"});
        assert!(!condition_holds(RuleId::DueDiligenceGate, &published));
    }

    #[test]
    fn test_high_risk_condition_boundary() {
        assert!(!condition_holds(
            RuleId::HighRiskAlert,
            &json!({"risk_score": 80.0})
        ));
        assert!(condition_holds(
            RuleId::HighRiskAlert,
            &json!({"risk_score": 80.5})
        ));
        assert!(!condition_holds(RuleId::HighRiskAlert, &json!({})));
    }

    #[test]
    fn test_payment_condition_requires_proof() {
        let no_proof = json!({"status": "pending_proof"});
        assert!(!condition_holds(RuleId::PaymentVerification, &no_proof));

        let empty_proof = json!({"status": "pending_proof", "proof_url": ""});
        assert!(!condition_holds(RuleId::PaymentVerification, &empty_proof));

        let with_proof = json!({"status": "pending_proof", "proof_url": "s3://proofs/p-1.pdf"});
        assert!(condition_holds(RuleId::PaymentVerification, &with_proof));
    }

    #[test]
    fn test_signature_condition() {
        let ready = json!({"status": "draft", "entrepreneur_signed": true, "investor_signed": false});
        assert!(condition_holds(RuleId::SignatureSequencing, &ready));

        let both = json!({"status": "draft", "entrepreneur_signed": true, "investor_signed": true});
        assert!(!condition_holds(RuleId::SignatureSequencing, &both));

        let unsigned = json!({"status": "draft"});
        assert!(!condition_holds(RuleId::SignatureSequencing, &unsigned));
    }

    #[test]
    fn test_auto_assignment_condition() {
        let open = json!({"status": "published"});
        assert!(condition_holds(RuleId::ServiceAutoAssignment, &open));

        let assigned = json!({"status": "published", "assigned_provider_id": "sp-1"});
        assert!(!condition_holds(RuleId::ServiceAutoAssignment, &assigned));

        let draft = json!({"status": "draft"});
        assert!(!condition_holds(RuleId::ServiceAutoAssignment, &draft));
    }

    #[test]
    fn test_matching_orders_by_priority() {
        let registry = Registry::builtin();
        // Matches both the due-diligence gate (100) and high-risk alert (90)
        let record = json!({
            "status": "pending_review",
            "due_diligence_completed": false,
            "risk_score": 92.0,
        });

        let matched = registry.matching(&record);
        let ids: Vec<RuleId> = matched.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RuleId::DueDiligenceGate, RuleId::HighRiskAlert]);
    }
}
