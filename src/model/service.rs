//! Service marketplace schemas
//!
//! Entrepreneurs publish service requests (legal, accounting, ...); verified
//! providers are auto-assigned by category and rating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRequestStatus {
    Draft,
    Published,
    Assigned,
    Completed,
    Cancelled,
}

impl ServiceRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRequestStatus::Draft => "draft",
            ServiceRequestStatus::Published => "published",
            ServiceRequestStatus::Assigned => "assigned",
            ServiceRequestStatus::Completed => "completed",
            ServiceRequestStatus::Cancelled => "cancelled",
        }
    }
}

/// Service request record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: String,

    /// Requesting user (usually the entrepreneur)
    pub requester_id: String,

    /// Service category, matched exactly against provider categories
    pub category: String,

    pub title: String,

    pub status: ServiceRequestStatus,

    /// Provider assigned by the auto-assignment rule (or manually)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_provider_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for publishing a new service request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub requester_id: String,
    pub category: String,
    pub title: String,
}

/// Service provider record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProvider {
    pub id: String,

    pub name: String,

    pub category: String,

    /// Platform-verified providers are the only auto-assignment candidates
    #[serde(default)]
    pub verified: bool,

    /// Average rating, 0.0-5.0
    #[serde(default)]
    pub rating: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
