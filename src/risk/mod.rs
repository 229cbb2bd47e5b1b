//! Risk assessment collaborator
//!
//! The scoring model itself is a black box behind [`RiskAssessor`]; the core
//! only consumes the returned score and factor list. [`StaticRiskAssessor`]
//! stands in where no scoring service is wired up.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error types for risk assessment
#[derive(Debug, Clone, thiserror::Error)]
pub enum RiskError {
    #[error("Risk assessment unavailable: {0}")]
    Unavailable(String),
}

/// Assessment returned by the scoring collaborator. Scores are 0-100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: f64,
    pub financial_risk: f64,
    pub operational_risk: f64,
    pub market_risk: f64,
    pub compliance_risk: f64,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// Flat baseline assessment with the given overall score
    pub fn baseline(overall_risk: f64) -> Self {
        Self {
            overall_risk,
            financial_risk: overall_risk,
            operational_risk: overall_risk,
            market_risk: overall_risk,
            compliance_risk: overall_risk,
            factors: vec!["automated baseline assessment".to_string()],
            recommendations: Vec::new(),
        }
    }
}

/// Black-box risk scoring contract
#[async_trait::async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn assess_risk(&self, record: &Value) -> Result<RiskAssessment, RiskError>;
}

/// Returns a fixed assessment for every record
///
/// Used in tests and by the worker binary when no scoring service is
/// configured. Can be flipped into a failing mode to exercise rule failure
/// isolation.
pub struct StaticRiskAssessor {
    assessment: RiskAssessment,
    failing: AtomicBool,
}

impl StaticRiskAssessor {
    pub fn new(assessment: RiskAssessment) -> Self {
        Self {
            assessment,
            failing: AtomicBool::new(false),
        }
    }

    /// Assessor whose every call fails
    pub fn failing() -> Self {
        let assessor = Self::new(RiskAssessment::baseline(0.0));
        assessor.failing.store(true, Ordering::Relaxed);
        assessor
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl RiskAssessor for StaticRiskAssessor {
    async fn assess_risk(&self, _record: &Value) -> Result<RiskAssessment, RiskError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(RiskError::Unavailable("scoring service down".to_string()));
        }
        Ok(self.assessment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_static_assessor() {
        let assessor = StaticRiskAssessor::new(RiskAssessment::baseline(42.0));
        let assessment = assessor.assess_risk(&json!({})).await.unwrap();
        assert_eq!(assessment.overall_risk, 42.0);

        assessor.set_failing(true);
        assert!(assessor.assess_risk(&json!({})).await.is_err());
    }
}
