//! Run dispatch DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::assignment::AssignmentId;
use crate::domain::result_stub::ResultStubId;

/// Request for the next run to execute
///
/// Fields are optional on the wire so a missing value surfaces as a
/// `missing-input` error instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetRunRequest {
    pub client_id: Option<String>,
    pub run_token: Option<String>,
}

/// A dispatched run handed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Assignment identifier
    pub id: AssignmentId,
    pub run_id: Uuid,
    pub url: String,
    /// "<job name> <run name>"
    pub desc: String,
    #[serde(rename = "resultsId")]
    pub results_id: ResultStubId,
    /// One-time credential for submitting results; never retrievable again
    #[serde(rename = "resultsStoreToken")]
    pub results_store_token: String,
}

/// Response to a get-run request; `run_info` is `None` when no work is available
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRunResponse {
    #[serde(rename = "runInfo")]
    pub run_info: Option<RunInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_serializes_null_run_info() {
        let json = serde_json::to_value(GetRunResponse::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "runInfo": null }));
    }

    #[test]
    fn test_run_info_wire_names() {
        let info = RunInfo {
            id: 7,
            run_id: Uuid::nil(),
            url: "http://example.test/suite".to_string(),
            desc: "nightly core".to_string(),
            results_id: 11,
            results_store_token: "abc".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["resultsId"], 11);
        assert_eq!(json["resultsStoreToken"], "abc");
        assert_eq!(json["desc"], "nightly core");
    }

    #[test]
    fn test_request_tolerates_missing_fields() {
        let req: GetRunRequest = serde_json::from_str("{}").unwrap();
        assert!(req.client_id.is_none());
        assert!(req.run_token.is_none());
    }
}
