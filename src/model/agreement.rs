//! Agreement schema
//!
//! Investment agreements are signed in sequence: entrepreneur first, then
//! investor. The signature-sequencing rule advances a draft once the
//! entrepreneur has signed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agreement lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementStatus {
    Draft,
    AwaitingInvestor,
    Executed,
    Cancelled,
}

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Draft => "draft",
            AgreementStatus::AwaitingInvestor => "awaiting_investor",
            AgreementStatus::Executed => "executed",
            AgreementStatus::Cancelled => "cancelled",
        }
    }
}

/// Which party is signing an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureParty {
    Entrepreneur,
    Investor,
}

/// Investment agreement record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,

    pub opportunity_id: String,

    pub entrepreneur_id: String,

    pub investor_id: String,

    pub status: AgreementStatus,

    #[serde(default)]
    pub entrepreneur_signed: bool,

    #[serde(default)]
    pub investor_signed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
