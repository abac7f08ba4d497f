use crate::domain::event::NormalizedEvent;
use crate::gateways::{digest_eq, NormalizeError};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verifies the `X-Event-Signature` header: hex-encoded HMAC-SHA256 over the
/// exact raw request body. Any parse or length problem counts as invalid;
/// this function never errors. An unconfigured (empty) secret rejects
/// everything, since anyone can compute an HMAC under the empty key.
pub fn verify_signature(secret: &str, raw_body: &[u8], header_value: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let supplied = match hex::decode(header_value.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();
    digest_eq(expected.as_slice(), &supplied)
}

#[derive(Debug, Deserialize)]
struct Callback {
    data: Option<CallbackData>,
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CallbackData {
    transaction: Option<CallbackTransaction>,
}

#[derive(Debug, Deserialize)]
struct CallbackTransaction {
    id: Option<String>,
    reference: Option<String>,
    amount_in_cents: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
}

/// Reduces a Wompi `transaction.updated` event to the canonical shape.
/// `amount_in_cents` is already minor units.
pub fn parse_payload(raw: &[u8]) -> Result<NormalizedEvent, NormalizeError> {
    let cb: Callback =
        serde_json::from_slice(raw).map_err(|e| NormalizeError::Invalid(e.to_string()))?;
    let tx = cb
        .data
        .ok_or(NormalizeError::MissingField("data"))?
        .transaction
        .ok_or(NormalizeError::MissingField("data.transaction"))?;

    let occurred_at = cb
        .timestamp
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    Ok(NormalizedEvent {
        event_id: tx.id.ok_or(NormalizeError::MissingField("transaction.id"))?,
        order_reference: tx
            .reference
            .ok_or(NormalizeError::MissingField("transaction.reference"))?,
        amount_minor: tx
            .amount_in_cents
            .ok_or(NormalizeError::MissingField("transaction.amount_in_cents"))?,
        currency: tx
            .currency
            .ok_or(NormalizeError::MissingField("transaction.currency"))?,
        gateway_status: tx
            .status
            .ok_or(NormalizeError::MissingField("transaction.status"))?,
        occurred_at,
    })
}

/// Test-fixture helper: signs a body the way Wompi does.
pub fn compute_signature(secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}
