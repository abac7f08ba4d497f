use crate::domain::cash_code::{CashCodeStatus, CashPaymentCode};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct CashCodesRepo {
    pub pool: PgPool,
}

fn row_to_code(row: sqlx::postgres::PgRow) -> Result<CashPaymentCode> {
    let raw_status: String = row.get("status");
    let status = CashCodeStatus::from_db(&raw_status)
        .ok_or_else(|| anyhow!("unknown cash code status in database: {raw_status}"))?;
    Ok(CashPaymentCode {
        code: row.get("code"),
        order_id: row.get("order_id"),
        amount: row.get("amount"),
        expires_at: row.get("expires_at"),
        status,
        confirmed_by: row.get("confirmed_by"),
        confirmed_at: row.get("confirmed_at"),
    })
}

impl CashCodesRepo {
    /// Returns false on a code collision; the caller regenerates and
    /// retries. Uniqueness is the primary key, same pattern as the
    /// webhook_events guard.
    pub async fn try_insert(
        &self,
        code: &str,
        order_id: Uuid,
        amount: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO cash_payment_codes (code, order_id, amount, expires_at, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(code)
        .bind(order_id)
        .bind(amount)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<CashPaymentCode>> {
        let row = sqlx::query(
            r#"
            SELECT code, order_id, amount, expires_at, status, confirmed_by, confirmed_at
            FROM cash_payment_codes
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(tx.as_mut())
        .await?;

        row.map(row_to_code).transpose()
    }

    pub async fn mark_confirmed_tx(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
        operator_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cash_payment_codes
            SET status='CONFIRMED', confirmed_by=$2, confirmed_at=now()
            WHERE code=$1
            "#,
        )
        .bind(code)
        .bind(operator_id)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// Expiry sweep: closes every PENDING code past its deadline. Confirmed
    /// codes are never touched.
    pub async fn expire_due(&self) -> Result<u64> {
        let res = sqlx::query(
            "UPDATE cash_payment_codes SET status='EXPIRED' WHERE status='PENDING' AND expires_at <= now()",
        )
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}
