use crate::errors::ApiError;
use aid_ledger::{AidRequest, Eligibility, RequestStatus, ReviewDecision};
use serde::{Deserialize, Serialize};

// ===== Aid Requests =====
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestResponse {
    pub id: String,
    pub eligibility: Eligibility,
    pub status: RequestStatus,
}

impl From<AidRequest> for SubmitRequestResponse {
    fn from(request: AidRequest) -> Self {
        Self {
            id: request.id,
            eligibility: request.eligibility,
            status: request.status,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestQuery {
    pub beneficiary_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewRequest {
    pub decision: ReviewAction,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TryFrom<ReviewRequest> for ReviewDecision {
    type Error = ApiError;

    fn try_from(review: ReviewRequest) -> Result<Self, Self::Error> {
        match (review.decision, review.reason) {
            (ReviewAction::Approve, _) => Ok(ReviewDecision::Approve),
            (ReviewAction::Reject, Some(reason)) => Ok(ReviewDecision::Reject { reason }),
            (ReviewAction::Reject, None) => Err(ApiError::Validation(
                "reason is required when rejecting".to_string(),
            )),
        }
    }
}

// ===== Donations =====
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DonationQuery {
    pub donor_id: String,
}

// ===== Health =====
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ledger_entries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}
