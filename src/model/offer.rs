//! Offer schema
//!
//! A pooled-investment offer made by an investor against an opportunity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offer lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Withdrawn,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Declined => "declined",
            OfferStatus::Withdrawn => "withdrawn",
        }
    }
}

/// Investment offer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,

    pub opportunity_id: String,

    pub investor_id: String,

    pub status: OfferStatus,

    /// Amount committed by this investor
    pub amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for placing a new offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOffer {
    pub opportunity_id: String,
    pub investor_id: String,
    pub amount: f64,
}
