//! Milestone schema
//!
//! Milestones track delivery of a funded opportunity. Skipping one trips the
//! milestone-skip rule, which classifies risk from the running skip count and
//! the opportunity's value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milestone lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Planned,
    InProgress,
    Completed,
    Skipped,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Planned => "planned",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Skipped => "skipped",
        }
    }
}

/// Project milestone record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,

    pub opportunity_id: String,

    pub title: String,

    pub status: MilestoneStatus,

    /// Running count of skipped milestones for the parent opportunity,
    /// denormalized onto each milestone so rules can act on it directly
    #[serde(default)]
    pub total_skipped_milestones: u64,

    /// Funded value of the parent opportunity, denormalized for risk
    /// classification
    #[serde(default)]
    pub opportunity_value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for adding a milestone to an opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMilestone {
    pub opportunity_id: String,
    pub title: String,
    /// Funded value of the parent opportunity at creation time
    #[serde(default)]
    pub opportunity_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}
