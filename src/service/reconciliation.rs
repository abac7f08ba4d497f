use crate::config::AppConfig;
use crate::domain::event::{Gateway, NormalizedEvent};
use crate::domain::outcome::{ProcessingError, WebhookOutcome};
use crate::gateways::{payu, wompi, NormalizeError};
use crate::mapper::{amount_consistent, map_gateway_status, plan_transition, MappedStatus, TransitionPlan};
use crate::repo::orders_repo::{OrdersRepo, TransactionInput};
use crate::repo::webhook_events_repo::{InsertOutcome, NewWebhookEvent, WebhookEventsRepo};
use crate::service::notifier::Notifier;
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

const MAX_PERSIST_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 100;

#[derive(Clone)]
pub struct ReconciliationService {
    pub pool: PgPool,
    pub events_repo: WebhookEventsRepo,
    pub orders_repo: OrdersRepo,
    pub notifier: Notifier,
    pub config: AppConfig,
}

/// Transient failures are worth a bounded in-process retry; anything else
/// (constraint violations, decode errors) is recorded immediately.
pub fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn is_transient_anyhow(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>().map(is_transient).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAdmission {
    /// The event_id lost the insert race; stop before any side effect.
    Duplicate,
    /// Fresh event with a bad signature; record FAILED and stop.
    RejectSignature,
    /// Fresh, authentic event; continue to mapping.
    Accepted,
}

/// Gate applied right after the idempotency insert. Deduplication wins over
/// everything, including signature state: a redelivered event was already
/// judged once and must stay a no-op.
pub fn admit_event(inserted: InsertOutcome, signature_valid: bool) -> EventAdmission {
    match (inserted, signature_valid) {
        (InsertOutcome::Duplicate, _) => EventAdmission::Duplicate,
        (InsertOutcome::Inserted, false) => EventAdmission::RejectSignature,
        (InsertOutcome::Inserted, true) => EventAdmission::Accepted,
    }
}

impl ReconciliationService {
    /// Full pipeline for one inbound callback: verify, normalize, dedupe,
    /// map, persist. Infallible by design; every internal failure is turned
    /// into a WebhookOutcome so the router can acknowledge unconditionally.
    pub async fn handle_callback(
        &self,
        gateway: Gateway,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> WebhookOutcome {
        match self.process(gateway, raw_body, signature_header).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(gateway = gateway.as_str(), "callback processing error: {err:#}");
                WebhookOutcome::Rejected(ProcessingError::Persistence(err.to_string()))
            }
        }
    }

    async fn process(
        &self,
        gateway: Gateway,
        raw_body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookOutcome> {
        let (parsed, signature, signature_valid) = match gateway {
            Gateway::Wompi => {
                let header = signature_header.unwrap_or("");
                let valid =
                    wompi::verify_signature(&self.config.wompi_event_secret, raw_body, header);
                (wompi::parse_payload(raw_body), Some(header.to_string()), valid)
            }
            Gateway::Payu => match payu::parse_form(raw_body) {
                Ok(cb) => {
                    let valid = payu::verify_signature(
                        &self.config.payu_api_key,
                        &self.config.payu_merchant_id,
                        &cb,
                    );
                    (payu::normalize(&cb), Some(cb.sign.clone()), valid)
                }
                Err(err) => (Err(err), None, false),
            },
            // No webhook channel; the router rejects this before we get here.
            Gateway::Efecty => {
                return Ok(WebhookOutcome::Rejected(ProcessingError::MalformedPayload(
                    "efecty has no webhook channel".to_string(),
                )))
            }
        };

        let event = match parsed {
            Ok(event) => event,
            Err(err) => {
                return self
                    .record_malformed(gateway, raw_body, signature.as_deref(), signature_valid, err)
                    .await
            }
        };

        let inserted = self
            .events_repo
            .insert_event(&NewWebhookEvent {
                event_id: &event.event_id,
                gateway,
                raw_payload: raw_body,
                signature: signature.as_deref(),
                signature_valid,
            })
            .await?;

        match admit_event(inserted, signature_valid) {
            EventAdmission::Duplicate => {
                tracing::info!(
                    gateway = gateway.as_str(),
                    event_id = %event.event_id,
                    "duplicate delivery ignored"
                );
                return Ok(WebhookOutcome::Duplicate);
            }
            EventAdmission::RejectSignature => {
                tracing::warn!(
                    gateway = gateway.as_str(),
                    event_id = %event.event_id,
                    "signature verification failed"
                );
                self.events_repo
                    .mark_failed(&event.event_id, "signature verification failed")
                    .await?;
                return Ok(WebhookOutcome::Rejected(ProcessingError::SignatureInvalid));
            }
            EventAdmission::Accepted => {}
        }

        let mapped = map_gateway_status(gateway, &event.gateway_status);
        if !mapped.recognized {
            let unknown = ProcessingError::UnknownGatewayStatus(event.gateway_status.clone());
            tracing::warn!(
                gateway = gateway.as_str(),
                event_id = %event.event_id,
                status = %event.gateway_status,
                "unrecognized gateway status, treating as no-change"
            );
            self.events_repo
                .mark_processed_with_note(&event.event_id, &unknown.to_string())
                .await?;
            return Ok(WebhookOutcome::NoChange);
        }

        self.persist_with_retry(gateway, &event, mapped).await
    }

    async fn record_malformed(
        &self,
        gateway: Gateway,
        raw_body: &[u8],
        signature: Option<&str>,
        signature_valid: bool,
        err: NormalizeError,
    ) -> Result<WebhookOutcome> {
        // No provider event id to key on, so the audit row gets a synthetic
        // one; the failure must still be visible in the store.
        let event_id = format!("malformed-{}", Uuid::new_v4());
        self.events_repo
            .insert_event(&NewWebhookEvent {
                event_id: &event_id,
                gateway,
                raw_payload: raw_body,
                signature,
                signature_valid,
            })
            .await?;
        self.events_repo
            .mark_failed(&event_id, &format!("malformed payload: {err}"))
            .await?;
        tracing::warn!(gateway = gateway.as_str(), "malformed payload: {err}");
        Ok(WebhookOutcome::Rejected(ProcessingError::MalformedPayload(
            err.to_string(),
        )))
    }

    async fn persist_with_retry(
        &self,
        gateway: Gateway,
        event: &NormalizedEvent,
        mapped: MappedStatus,
    ) -> Result<WebhookOutcome> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.persist(gateway, event, mapped).await {
                Ok(outcome) => {
                    if matches!(outcome, WebhookOutcome::Processed) {
                        self.notify_after_commit(gateway, event, mapped);
                    }
                    return Ok(outcome);
                }
                Err(err) if is_transient_anyhow(&err) && attempt < MAX_PERSIST_ATTEMPTS => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        attempt,
                        "transient persistence error, retrying: {err}"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(
                        RETRY_BACKOFF_MS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) => {
                    tracing::error!(event_id = %event.event_id, "persistence failed: {err:#}");
                    // Follow-up write on the pool so the failure record
                    // survives the rolled-back business transaction.
                    self.events_repo
                        .mark_failed(&event.event_id, &err.to_string())
                        .await?;
                    return Ok(WebhookOutcome::Rejected(ProcessingError::Persistence(
                        err.to_string(),
                    )));
                }
            }
        }
    }

    /// The atomic persister: lock order, re-check terminal, consistency
    /// check, upsert transaction, apply action, stamp the audit row, commit.
    /// All or nothing.
    async fn persist(
        &self,
        gateway: Gateway,
        event: &NormalizedEvent,
        mapped: MappedStatus,
    ) -> Result<WebhookOutcome> {
        let mut tx = self.pool.begin().await?;

        let order = match OrdersRepo::find_by_number_for_update(&mut tx, &event.order_reference).await? {
            Some(order) => order,
            None => {
                tx.rollback().await?;
                tracing::warn!(
                    event_id = %event.event_id,
                    reference = %event.order_reference,
                    "callback references unknown order"
                );
                self.events_repo
                    .mark_failed(
                        &event.event_id,
                        &format!("order not found: {}", event.order_reference),
                    )
                    .await?;
                return Ok(WebhookOutcome::Rejected(ProcessingError::OrderNotFound(
                    event.order_reference.clone(),
                )));
            }
        };

        match plan_transition(order.status, mapped.action) {
            TransitionPlan::AlreadyTerminal => {
                tx.rollback().await?;
                tracing::info!(
                    event_id = %event.event_id,
                    order = %order.order_number,
                    status = order.status.as_str(),
                    "ignored, order already terminal"
                );
                self.events_repo.mark_processed(&event.event_id).await?;
                Ok(WebhookOutcome::AlreadyTerminal)
            }
            TransitionPlan::Nothing => {
                // Provider-side pending or error: record the attempt, leave
                // the order alone.
                let tx_id = OrdersRepo::upsert_transaction_tx(
                    &mut tx,
                    &self.transaction_input(gateway, event, mapped, order.id),
                )
                .await?;
                WebhookEventsRepo::mark_processed_tx(&mut tx, &event.event_id, Some(tx_id)).await?;
                tx.commit().await?;
                Ok(WebhookOutcome::NoChange)
            }
            TransitionPlan::Apply(new_status) => {
                if !amount_consistent(mapped.action, order.total_amount, event.amount_minor) {
                    tx.rollback().await?;
                    tracing::warn!(
                        event_id = %event.event_id,
                        order = %order.order_number,
                        expected = order.total_amount,
                        got = event.amount_minor,
                        "amount mismatch, confirmation blocked"
                    );
                    self.events_repo
                        .mark_failed(
                            &event.event_id,
                            &format!(
                                "amount mismatch: transaction {} vs order total {}",
                                event.amount_minor, order.total_amount
                            ),
                        )
                        .await?;
                    return Ok(WebhookOutcome::Rejected(ProcessingError::ConsistencyViolation {
                        expected: order.total_amount,
                        got: event.amount_minor,
                    }));
                }

                let tx_id = OrdersRepo::upsert_transaction_tx(
                    &mut tx,
                    &self.transaction_input(gateway, event, mapped, order.id),
                )
                .await?;
                OrdersRepo::set_status_tx(&mut tx, order.id, new_status).await?;
                WebhookEventsRepo::mark_processed_tx(&mut tx, &event.event_id, Some(tx_id)).await?;
                tx.commit().await?;

                tracing::info!(
                    event_id = %event.event_id,
                    order = %order.order_number,
                    status = new_status.as_str(),
                    "order transitioned"
                );
                Ok(WebhookOutcome::Processed)
            }
        }
    }

    fn transaction_input<'a>(
        &self,
        gateway: Gateway,
        event: &'a NormalizedEvent,
        mapped: MappedStatus,
        order_id: Uuid,
    ) -> TransactionInput<'a> {
        TransactionInput {
            order_id,
            gateway,
            gateway_transaction_id: &event.event_id,
            amount: event.amount_minor,
            currency: &event.currency,
            status: mapped.transaction_status,
            gateway_response: serde_json::json!({
                "gateway_status": event.gateway_status,
                "occurred_at": event.occurred_at,
            }),
        }
    }

    /// Fire-and-forget, strictly after commit. A lost notification is a log
    /// line, never a rolled-back confirmation.
    fn notify_after_commit(&self, gateway: Gateway, event: &NormalizedEvent, mapped: MappedStatus) {
        let notifier = self.notifier.clone();
        let order_number = event.order_reference.clone();
        let action = mapped.action;
        tokio::spawn(async move {
            notifier.order_status_changed(&order_number, action, gateway).await;
        });
    }
}
