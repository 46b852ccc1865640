//! Deployment availability
//!
//! A Deployment is available when its status carries an `Available`
//! condition with status `True`. Other conditions are ignored.

use k8s_openapi::api::apps::v1::DeploymentStatus;
use serde::Deserialize;
use serde_json::Value;

use super::error::{InstallError, InstallResult};
use super::types::ResourceRef;

pub const DEPLOYMENT_KIND: &str = "Deployment";
pub const CONDITION_AVAILABLE: &str = "Available";
pub const STATUS_TRUE: &str = "True";

/// Name substring identifying the controller Deployment
pub const CONTROLLER_NAME: &str = "controller";
/// Name substring identifying the webhook Deployment
pub const WEBHOOK_NAME: &str = "webhook";

/// Check for an `Available=True` condition
pub fn is_available(status: &DeploymentStatus) -> bool {
    status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == CONDITION_AVAILABLE && c.status == STATUS_TRUE)
}

/// Decode the status of a live Deployment object.
///
/// An object without a status decodes to an empty status, which is not
/// available.
pub fn decode_status(resource: &ResourceRef, live: &Value) -> InstallResult<DeploymentStatus> {
    match live.get("status") {
        None | Some(Value::Null) => Ok(DeploymentStatus::default()),
        Some(status) => {
            DeploymentStatus::deserialize(status).map_err(|source| InstallError::Decode {
                resource: resource.clone(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(conditions: Value) -> DeploymentStatus {
        let resource = ResourceRef::new("apps/v1", "Deployment", "d", Some("ns".into()));
        decode_status(&resource, &json!({ "status": { "conditions": conditions } })).unwrap()
    }

    #[test]
    fn test_empty_conditions_not_available() {
        assert!(!is_available(&status(json!([]))));
        assert!(!is_available(&DeploymentStatus::default()));
    }

    #[test]
    fn test_available_false_not_available() {
        let s = status(json!([{ "type": "Available", "status": "False" }]));
        assert!(!is_available(&s));
    }

    #[test]
    fn test_available_true_among_other_conditions() {
        let s = status(json!([
            { "type": "Progressing", "status": "False" },
            { "type": "Available", "status": "True" }
        ]));
        assert!(is_available(&s));
    }

    #[test]
    fn test_condition_values_are_case_sensitive() {
        let s = status(json!([{ "type": "available", "status": "true" }]));
        assert!(!is_available(&s));
    }

    #[test]
    fn test_missing_status_decodes_as_unavailable() {
        let resource = ResourceRef::new("apps/v1", "Deployment", "d", Some("ns".into()));
        let decoded = decode_status(&resource, &json!({ "metadata": { "name": "d" } })).unwrap();
        assert!(!is_available(&decoded));
    }

    #[test]
    fn test_malformed_status_is_decode_error() {
        let resource = ResourceRef::new("apps/v1", "Deployment", "d", Some("ns".into()));
        let err = decode_status(&resource, &json!({ "status": { "conditions": "yes" } })).unwrap_err();
        assert!(matches!(err, InstallError::Decode { .. }));
    }
}
