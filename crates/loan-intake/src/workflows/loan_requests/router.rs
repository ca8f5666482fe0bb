use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::domain::{
    Approver, ClientId, LoanRequest, LoanRequestDraft, LoanRequestId, MerchantId, UserId,
};
use super::expiration::ExpirationSweep;
use super::service::LoanLifecycleService;
use super::verification::{evaluate, BureauVariable, CreditVerifier, RuleConfig};

/// Shared handler state.
#[derive(Clone)]
pub struct LoanRequestState {
    pub lifecycle: Arc<LoanLifecycleService>,
    pub sweep: Arc<ExpirationSweep>,
    pub verifier: Arc<CreditVerifier>,
}

/// Router exposing creation, review, expiration and credit verification endpoints.
pub fn loan_request_router(state: LoanRequestState) -> Router {
    Router::new()
        .route("/api/v1/loan-requests", post(create_handler))
        .route("/api/v1/loan-requests/expirations", post(sweep_handler))
        .route("/api/v1/loan-requests/:request_id", get(fetch_handler))
        .route(
            "/api/v1/loan-requests/:request_id/approve",
            post(approve_handler),
        )
        .route(
            "/api/v1/loan-requests/:request_id/reject",
            post(reject_handler),
        )
        .route("/api/v1/credit-verifications", post(verify_handler))
        .with_state(state)
}

/// Public representation of a stored request. Document bytes are never echoed back.
#[derive(Debug, Clone, Serialize)]
pub struct LoanRequestView {
    pub id: LoanRequestId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub client_id: ClientId,
    pub client_dni: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<MerchantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver: Option<Approver>,
    pub comments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_document: Option<String>,
}

impl From<&LoanRequest> for LoanRequestView {
    fn from(request: &LoanRequest) -> Self {
        Self {
            id: request.id(),
            status: request.status().label(),
            created_at: request.created_at(),
            client_id: request.client_id(),
            client_dni: request.client_dni().to_string(),
            client_tax_id: request.client_tax_id().map(str::to_string),
            merchant_id: request.merchant_id(),
            requested_amount: request.requested_amount(),
            approver: request.approver(),
            comments: request.comments().to_vec(),
            attached_document: request
                .attached_document()
                .map(|document| document.file_name.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approver_id: u64,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub approver_id: u64,
    #[serde(default)]
    pub is_administrator: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub variables: Vec<BureauVariable>,
    #[serde(default)]
    pub rules: Option<Vec<RuleConfig>>,
}

fn view_response(status: StatusCode, request: &LoanRequest) -> Response {
    (status, axum::Json(LoanRequestView::from(request))).into_response()
}

pub(crate) async fn create_handler(
    State(state): State<LoanRequestState>,
    axum::Json(draft): axum::Json<LoanRequestDraft>,
) -> Response {
    match state.lifecycle.create(draft).await {
        Ok(request) => view_response(StatusCode::CREATED, &request),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn fetch_handler(
    State(state): State<LoanRequestState>,
    Path(request_id): Path<u64>,
) -> Response {
    match state.lifecycle.get(LoanRequestId(request_id)).await {
        Ok(request) => view_response(StatusCode::OK, &request),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn approve_handler(
    State(state): State<LoanRequestState>,
    Path(request_id): Path<u64>,
    axum::Json(body): axum::Json<ApproveRequest>,
) -> Response {
    let result = state
        .lifecycle
        .approve(
            LoanRequestId(request_id),
            UserId(body.approver_id),
            body.is_administrator,
            body.comment.as_deref(),
        )
        .await;

    match result {
        Ok(request) => view_response(StatusCode::OK, &request),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn reject_handler(
    State(state): State<LoanRequestState>,
    Path(request_id): Path<u64>,
    axum::Json(body): axum::Json<RejectRequest>,
) -> Response {
    let result = state
        .lifecycle
        .reject(
            LoanRequestId(request_id),
            body.comment.as_deref(),
            UserId(body.approver_id),
            body.is_administrator,
        )
        .await;

    match result {
        Ok(request) => view_response(StatusCode::OK, &request),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn sweep_handler(State(state): State<LoanRequestState>) -> Response {
    match state.sweep.run().await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn verify_handler(
    State(state): State<LoanRequestState>,
    axum::Json(body): axum::Json<VerificationRequest>,
) -> Response {
    let result = match &body.rules {
        Some(rules) => evaluate(&body.variables, rules),
        None => state.verifier.verify(&body.variables),
    };
    (StatusCode::OK, axum::Json(result)).into_response()
}
