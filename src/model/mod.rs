//! Entity model and the typed collection registry
//!
//! Every record collection the core syncs is named by the closed
//! [`Collection`] enum. Each collection binds a concrete serde schema;
//! [`Collection::check_schema`] is applied to remote payloads before they are
//! allowed to replace cache contents, so a malformed fetch can never poison
//! the local mirror.

pub mod agreement;
pub mod milestone;
pub mod offer;
pub mod opportunity;
pub mod payment;
pub mod service;

pub use agreement::{Agreement, AgreementStatus, SignatureParty};
pub use milestone::{Milestone, MilestoneStatus, NewMilestone};
pub use offer::{NewOffer, Offer, OfferStatus};
pub use opportunity::{NewOpportunity, Opportunity, OpportunityStatus};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use service::{NewServiceRequest, ServiceProvider, ServiceRequest, ServiceRequestStatus};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::CoreError;

/// A record collection known to the core.
///
/// Closed set: collection routing is typed, never a free-form string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Opportunities,
    Offers,
    Payments,
    Milestones,
    Agreements,
    ServiceRequests,
    ServiceProviders,
}

impl Collection {
    /// Fixed sync order for `sync_all` (sequential by design)
    pub const ALL: [Collection; 7] = [
        Collection::Opportunities,
        Collection::Offers,
        Collection::Payments,
        Collection::Milestones,
        Collection::Agreements,
        Collection::ServiceRequests,
        Collection::ServiceProviders,
    ];

    /// Collection name as used by the remote store and the local cache
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Opportunities => "opportunities",
            Collection::Offers => "offers",
            Collection::Payments => "payments",
            Collection::Milestones => "milestones",
            Collection::Agreements => "agreements",
            Collection::ServiceRequests => "service_requests",
            Collection::ServiceProviders => "service_providers",
        }
    }

    /// Verify that every record in a fetched payload matches this
    /// collection's schema.
    ///
    /// Used by the sync engine before `replace_all`: a payload that fails the
    /// check is treated as a failed fetch and the cache is left untouched.
    pub fn check_schema(&self, records: &[Value]) -> Result<(), CoreError> {
        fn check<T: DeserializeOwned>(name: &str, records: &[Value]) -> Result<(), CoreError> {
            for record in records {
                serde_json::from_value::<T>(record.clone()).map_err(|e| {
                    CoreError::Serialization(format!(
                        "record in '{}' does not match schema: {}",
                        name, e
                    ))
                })?;
            }
            Ok(())
        }

        let name = self.name();
        match self {
            Collection::Opportunities => check::<Opportunity>(name, records),
            Collection::Offers => check::<Offer>(name, records),
            Collection::Payments => check::<Payment>(name, records),
            Collection::Milestones => check::<Milestone>(name, records),
            Collection::Agreements => check::<Agreement>(name, records),
            Collection::ServiceRequests => check::<ServiceRequest>(name, records),
            Collection::ServiceProviders => check::<ServiceProvider>(name, records),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extract the stable `id` field from a JSON-shaped record
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_names_are_stable() {
        for collection in Collection::ALL {
            let round_trip: Collection =
                serde_json::from_value(serde_json::to_value(collection).unwrap()).unwrap();
            assert_eq!(round_trip, collection);
            assert_eq!(collection.to_string(), collection.name());
        }
    }

    #[test]
    fn test_schema_check_rejects_wrong_shape() {
        let bad = vec![json!({"id": 42})];
        assert!(Collection::Opportunities.check_schema(&bad).is_err());

        let good = vec![json!({
            "id": "opp-1",
            "title": "Solar farm",
            "entrepreneur_id": "ent-1",
            "status": "pending_review",
            "amount_sought": 250000.0,
        })];
        assert!(Collection::Opportunities.check_schema(&good).is_ok());
    }

    #[test]
    fn test_record_id() {
        assert_eq!(record_id(&json!({"id": "a-1"})), Some("a-1"));
        assert_eq!(record_id(&json!({"id": 7})), None);
        assert_eq!(record_id(&json!({})), None);
    }
}
