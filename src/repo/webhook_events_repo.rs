use crate::domain::event::Gateway;
use anyhow::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookEventsRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

pub struct NewWebhookEvent<'a> {
    pub event_id: &'a str,
    pub gateway: Gateway,
    pub raw_payload: &'a [u8],
    pub signature: Option<&'a str>,
    pub signature_valid: bool,
}

impl WebhookEventsRepo {
    /// The idempotency guard. The primary key on event_id turns concurrent
    /// duplicate deliveries into exactly one Inserted and N-1 Duplicates,
    /// with no application-level locking.
    pub async fn insert_event(&self, ev: &NewWebhookEvent<'_>) -> Result<InsertOutcome> {
        let res = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, gateway, raw_payload, signature, signature_valid, received_at, processing_status)
            VALUES ($1, $2, $3, $4, $5, now(), 'PENDING')
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(ev.event_id)
        .bind(ev.gateway.as_str())
        .bind(ev.raw_payload)
        .bind(ev.signature)
        .bind(ev.signature_valid)
        .execute(&self.pool)
        .await?;

        Ok(if res.rows_affected() == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    /// Success stamp, taken inside the same transaction as the order update
    /// so the audit state and the business state commit together.
    pub async fn mark_processed_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_id: &str,
        linked_transaction_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status='PROCESSED', processed_at=now(), linked_transaction_id=$2
            WHERE event_id=$1
            "#,
        )
        .bind(event_id)
        .bind(linked_transaction_id)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// For no-op outcomes that never open a business transaction.
    pub async fn mark_processed(&self, event_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE webhook_events SET processing_status='PROCESSED', processed_at=now() WHERE event_id=$1",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// PROCESSED with an explanatory note, for events handled as deliberate
    /// no-ops (e.g. an unrecognized provider status).
    pub async fn mark_processed_with_note(&self, event_id: &str, note: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status='PROCESSED', processed_at=now(), processing_error=$2
            WHERE event_id=$1
            "#,
        )
        .bind(event_id)
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Failure stamp. Deliberately runs on the pool, never inside the
    /// business transaction: when that transaction rolls back, this record
    /// must survive or the failure becomes invisible.
    pub async fn mark_failed(&self, event_id: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET processing_status='FAILED', processed_at=now(), processing_error=$2
            WHERE event_id=$1
            "#,
        )
        .bind(event_id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Audit row for an operator cash confirmation, written inside the
    /// confirmation transaction. There is no inbound signature on this
    /// channel; authenticity is the operator credential.
    pub async fn insert_operator_event_tx(
        tx: &mut Transaction<'_, Postgres>,
        event_id: &str,
        payload: &serde_json::Value,
        linked_transaction_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, gateway, raw_payload, signature, signature_valid, received_at, processed_at, processing_status, linked_transaction_id)
            VALUES ($1, $2, $3, NULL, true, now(), now(), 'PROCESSED', $4)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(Gateway::Efecty.as_str())
        .bind(serde_json::to_vec(payload)?)
        .bind(linked_transaction_id)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }
}
