//! Milestone skip risk classification
//!
//! Skipped milestones are graded against cumulative skip count and the
//! value of the opportunity they belong to. The grade drives the audit
//! trail entry and investor notification produced by the dispatcher.

use serde::{Deserialize, Serialize};

/// Risk grade for a skipped milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade a skip event. `skip_count` is the total skipped milestones on the
/// opportunity including this one; `opportunity_value` is the amount sought.
pub fn classify_risk(skip_count: u64, opportunity_value: f64) -> RiskLevel {
    if skip_count > 3 || opportunity_value > 1_000_000.0 {
        RiskLevel::High
    } else if skip_count > 1 || opportunity_value > 500_000.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Action items attached to the skip review. Always non-empty: when nothing
/// specific applies a monitoring item is returned.
pub fn skip_recommendations(skip_count: u64, opportunity_value: f64) -> Vec<String> {
    let mut out = Vec::new();

    if skip_count > 2 {
        out.push("Restructure the milestone timeline with the entrepreneur".to_string());
    }
    if skip_count > 3 {
        out.push("Escalate to the platform review board".to_string());
    }
    if opportunity_value > 500_000.0 {
        out.push("Schedule an emergency meeting with accepted investors".to_string());
    }
    if opportunity_value > 1_000_000.0 {
        out.push("Require an updated delivery plan before further disbursement".to_string());
    }

    if out.is_empty() {
        out.push("Continue monitoring milestone progress".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_skip_count() {
        assert_eq!(classify_risk(0, 0.0), RiskLevel::Low);
        assert_eq!(classify_risk(1, 0.0), RiskLevel::Low);
        assert_eq!(classify_risk(2, 0.0), RiskLevel::Medium);
        assert_eq!(classify_risk(3, 0.0), RiskLevel::Medium);
        assert_eq!(classify_risk(4, 0.0), RiskLevel::High);
    }

    #[test]
    fn test_classify_by_value() {
        assert_eq!(classify_risk(0, 500_000.0), RiskLevel::Low);
        assert_eq!(classify_risk(0, 600_000.0), RiskLevel::Medium);
        assert_eq!(classify_risk(0, 1_000_000.0), RiskLevel::Medium);
        assert_eq!(classify_risk(0, 1_100_000.0), RiskLevel::High);
    }

    #[test]
    fn test_recommendations_never_empty() {
        let recs = skip_recommendations(0, 1_000.0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("monitoring"));
    }

    #[test]
    fn test_recommendations_compound() {
        let recs = skip_recommendations(5, 2_000_000.0);
        assert!(recs.iter().any(|r| r.contains("Restructure")));
        assert!(recs.iter().any(|r| r.contains("Escalate")));
        assert!(recs.iter().any(|r| r.contains("emergency meeting")));
        assert!(recs.iter().any(|r| r.contains("delivery plan")));
    }
}
