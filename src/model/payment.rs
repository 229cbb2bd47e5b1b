//! Payment schema
//!
//! Escrow payments move through proof upload and admin verification. The
//! payment-verification rule fires when a payment is `pending_proof` with a
//! proof document attached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    PendingProof,
    UnderReview,
    Verified,
    Rejected,
    Released,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::PendingProof => "pending_proof",
            PaymentStatus::UnderReview => "under_review",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Released => "released",
        }
    }
}

/// Escrow payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,

    pub opportunity_id: String,

    /// Investor who made the payment
    pub payer_id: String,

    pub status: PaymentStatus,

    pub amount: f64,

    /// Uploaded proof document, if any (upload itself is out of scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for recording a new payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub opportunity_id: String,
    pub payer_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
}
