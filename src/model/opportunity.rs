//! Opportunity schema
//!
//! An investment opportunity submitted by an entrepreneur. Submission moves
//! it to `pending_review`, which is what the due-diligence rule keys off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opportunity lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Draft,
    PendingReview,
    UnderReview,
    Published,
    Funded,
    Closed,
    Rejected,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Draft => "draft",
            OpportunityStatus::PendingReview => "pending_review",
            OpportunityStatus::UnderReview => "under_review",
            OpportunityStatus::Published => "published",
            OpportunityStatus::Funded => "funded",
            OpportunityStatus::Closed => "closed",
            OpportunityStatus::Rejected => "rejected",
        }
    }
}

/// Investment opportunity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,

    pub title: String,

    /// Owning entrepreneur
    pub entrepreneur_id: String,

    pub status: OpportunityStatus,

    /// Total funding sought
    pub amount_sought: f64,

    /// Short pitch shown to investors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Set once the due-diligence rule has run
    #[serde(default)]
    pub due_diligence_completed: bool,

    /// Overall risk score persisted by the due-diligence rule (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,

    /// Risk factors reported by the assessment collaborator
    #[serde(default)]
    pub risk_factors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for submitting a new opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOpportunity {
    pub title: String,
    pub entrepreneur_id: String,
    pub amount_sought: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        let status: OpportunityStatus = serde_json::from_str("\"pending_review\"").unwrap();
        assert_eq!(status, OpportunityStatus::PendingReview);
        assert_eq!(status.as_str(), "pending_review");
    }
}
