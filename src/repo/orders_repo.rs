use crate::domain::event::Gateway;
use crate::domain::order::{Order, OrderStatus, TransactionStatus};
use anyhow::{anyhow, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

pub struct TransactionInput<'a> {
    pub order_id: Uuid,
    pub gateway: Gateway,
    pub gateway_transaction_id: &'a str,
    pub amount: i64,
    pub currency: &'a str,
    pub status: TransactionStatus,
    pub gateway_response: serde_json::Value,
}

fn row_to_order(row: sqlx::postgres::PgRow) -> Result<Order> {
    let raw_status: String = row.get("status");
    let status = OrderStatus::from_db(&raw_status)
        .ok_or_else(|| anyhow!("unknown order status in database: {raw_status}"))?;
    Ok(Order {
        id: row.get("id"),
        order_number: row.get("order_number"),
        status,
        total_amount: row.get("total_amount"),
        currency: row.get("currency"),
        confirmed_at: row.get("confirmed_at"),
    })
}

impl OrdersRepo {
    /// Locks the order row for the rest of the transaction. Two callbacks
    /// racing for the same order serialize here; different orders do not
    /// contend at all.
    pub async fn find_by_number_for_update(
        tx: &mut Transaction<'_, Postgres>,
        order_number: &str,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, status, total_amount, currency, confirmed_at
            FROM orders
            WHERE order_number = $1
            FOR UPDATE
            "#,
        )
        .bind(order_number)
        .fetch_optional(tx.as_mut())
        .await?;

        row.map(row_to_order).transpose()
    }

    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, status, total_amount, currency, confirmed_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(tx.as_mut())
        .await?;

        row.map(row_to_order).transpose()
    }

    pub async fn set_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                confirmed_at = CASE WHEN $2 = 'CONFIRMED' THEN now() ELSE confirmed_at END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    /// Upsert keyed by (order_id, gateway, gateway_transaction_id), so a
    /// provider retry with a fresh event_id updates the attempt it already
    /// created instead of growing a second row.
    pub async fn upsert_transaction_tx(
        tx: &mut Transaction<'_, Postgres>,
        input: &TransactionInput<'_>,
    ) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_transactions
                (id, order_id, gateway, gateway_transaction_id, amount, currency, status, gateway_response, processed_at, confirmed_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, now(), CASE WHEN $7 = 'APPROVED' THEN now() END)
            ON CONFLICT (order_id, gateway, gateway_transaction_id) DO UPDATE SET
                status = EXCLUDED.status,
                gateway_response = EXCLUDED.gateway_response,
                processed_at = now(),
                confirmed_at = COALESCE(order_transactions.confirmed_at, EXCLUDED.confirmed_at)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.order_id)
        .bind(input.gateway.as_str())
        .bind(input.gateway_transaction_id)
        .bind(input.amount)
        .bind(input.currency)
        .bind(input.status.as_str())
        .bind(&input.gateway_response)
        .fetch_one(tx.as_mut())
        .await?;

        Ok(row.get("id"))
    }
}
