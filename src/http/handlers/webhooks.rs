use crate::domain::event::Gateway;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

/// Front door for provider callbacks. For any structurally valid request the
/// response is 200 `{"status":"ok"}` no matter what processing decided;
/// otherwise provider retry loops would storm the endpoint. The true outcome
/// lives on the webhook_events audit row.
pub async fn receive(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let parsed: Result<Gateway, _> = gateway.parse();
    let gateway = match parsed {
        Ok(g) if g.has_webhook_channel() => g,
        _ => {
            return (
                axum::http::StatusCode::NOT_FOUND,
                Json(serde_json::json!({"status": "unknown_gateway"})),
            )
                .into_response()
        }
    };

    let signature = headers
        .get("x-event-signature")
        .and_then(|h| h.to_str().ok());

    let outcome = state
        .reconciliation
        .handle_callback(gateway, &body, signature)
        .await;
    tracing::debug!(gateway = gateway.as_str(), ?outcome, "callback acknowledged");

    (
        axum::http::StatusCode::OK,
        Json(serde_json::json!({"status": "ok"})),
    )
        .into_response()
}

/// Per-gateway verifier configuration status. Secrets are reported only as
/// present or absent.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let cfg = &state.config;
    Json(serde_json::json!({
        "environment": cfg.environment,
        "gateways": {
            "wompi": { "secret_configured": !cfg.wompi_event_secret.is_empty() },
            "payu": {
                "api_key_configured": !cfg.payu_api_key.is_empty(),
                "merchant_id_configured": !cfg.payu_merchant_id.is_empty(),
            },
            "efecty": { "channel": "operator_confirmation" },
        },
    }))
}
