use thiserror::Error;

/// Internal result of processing one inbound callback. The HTTP layer
/// acknowledges with 200 regardless; this type is what lands in logs and on
/// the audit row, so the always-ack policy stays a deliberate decision
/// instead of swallowed errors.
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Order and transaction updated, audit row stamped PROCESSED.
    Processed,
    /// Mapped to no canonical action (provider-side pending or unknown
    /// status); nothing terminal happened.
    NoChange,
    /// Order already CONFIRMED or CANCELLED; the callback was absorbed.
    AlreadyTerminal,
    /// The event_id was seen before; nothing was touched.
    Duplicate,
    /// Recorded as FAILED on the audit row and dropped.
    Rejected(ProcessingError),
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("amount mismatch: transaction carries {got} but order total is {expected}")]
    ConsistencyViolation { expected: i64, got: i64 },
    #[error("unknown gateway status: {0}")]
    UnknownGatewayStatus(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Errors from the operator-facing cash confirmation API. Unlike webhook
/// processing these are surfaced to the caller, since the caller is an
/// authenticated human, not an untrusted provider retry loop.
#[derive(Debug, Error)]
pub enum CashConfirmError {
    #[error("payment code not found")]
    CodeNotFound,
    #[error("payment code expired")]
    CodeExpired,
    #[error("payment code already confirmed")]
    CodeAlreadyConfirmed,
    #[error("code amount {got} does not match order total {expected}")]
    AmountMismatch { expected: i64, got: i64 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
