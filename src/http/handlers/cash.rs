use crate::domain::outcome::CashConfirmError;
use crate::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ConfirmCashRequest {
    pub payment_code: String,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCashCodeRequest {
    pub order_id: Uuid,
    pub amount: i64,
    pub ttl_minutes: Option<i64>,
}

fn error_body(code: &str, message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": {"code": code, "message": message}}))
}

/// Operator-only confirmation of a cash payment. Unlike the webhook path,
/// errors here go back to the caller.
pub async fn confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmCashRequest>,
) -> impl IntoResponse {
    let Some(operator_id) = headers
        .get("X-Operator-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
    else {
        return (
            StatusCode::BAD_REQUEST,
            error_body("MISSING_OPERATOR_ID", "X-Operator-Id header is required"),
        )
            .into_response();
    };

    match state
        .cash_codes
        .confirm(&req.payment_code, &operator_id, req.admin_notes.as_deref())
        .await
    {
        Ok(confirmation) => (StatusCode::OK, Json(serde_json::json!(confirmation))).into_response(),
        Err(CashConfirmError::CodeNotFound) => (
            StatusCode::NOT_FOUND,
            error_body("CODE_NOT_FOUND", "payment code not found"),
        )
            .into_response(),
        Err(CashConfirmError::CodeExpired) => (
            StatusCode::GONE,
            error_body("CODE_EXPIRED", "payment code expired"),
        )
            .into_response(),
        Err(CashConfirmError::CodeAlreadyConfirmed) => (
            StatusCode::CONFLICT,
            error_body("CODE_ALREADY_CONFIRMED", "payment code already confirmed"),
        )
            .into_response(),
        Err(err @ CashConfirmError::AmountMismatch { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            error_body("AMOUNT_MISMATCH", &err.to_string()),
        )
            .into_response(),
        Err(CashConfirmError::Internal(err)) => {
            tracing::error!("cash confirm failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("INTERNAL", "internal error"),
            )
                .into_response()
        }
    }
}

/// Issues a cash code for an order; called by the order-placement flow when
/// the buyer picks the cash network.
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateCashCodeRequest>,
) -> impl IntoResponse {
    match state
        .cash_codes
        .generate(req.order_id, req.amount, req.ttl_minutes)
        .await
    {
        Ok(code) => (StatusCode::CREATED, Json(serde_json::json!(code))).into_response(),
        Err(err) => {
            tracing::error!(order_id = %req.order_id, "cash code generation failed: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("INTERNAL", "could not generate payment code"),
            )
                .into_response()
        }
    }
}
