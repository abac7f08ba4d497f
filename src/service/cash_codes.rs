use crate::domain::cash_code::{CashCodeStatus, CashPaymentCode};
use crate::domain::event::Gateway;
use crate::domain::order::{Order, TransactionStatus};
use crate::domain::outcome::CashConfirmError;
use crate::mapper::{plan_transition, CanonicalAction, TransitionPlan};
use crate::repo::cash_codes_repo::CashCodesRepo;
use crate::repo::orders_repo::{OrdersRepo, TransactionInput};
use crate::repo::webhook_events_repo::WebhookEventsRepo;
use crate::service::notifier::Notifier;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;

/// Unambiguous alphabet for the human-entered suffix: no 0/O, no 1/I.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_PREFIX: &str = "MST";
const MAX_GENERATE_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct CashCodeService {
    pub pool: PgPool,
    pub cash_codes_repo: CashCodesRepo,
    pub orders_repo: OrdersRepo,
    pub events_repo: WebhookEventsRepo,
    pub notifier: Notifier,
    pub ttl_minutes: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct CashConfirmation {
    pub code: String,
    pub order_number: String,
    pub order_status: &'static str,
    pub confirmed_by: String,
}

/// Codes look like MST-482-KQZN: a fixed network prefix, three digits, and
/// four characters from the unambiguous alphabet.
pub fn random_code(rng: &mut impl Rng) -> String {
    let digits: u32 = rng.gen_range(0..1000);
    let suffix: String = (0..4)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}-{digits:03}-{suffix}")
}

/// Per-code TTL override; absent or non-positive falls back to the
/// configured default.
pub fn effective_ttl(requested: Option<i64>, default_minutes: i64) -> i64 {
    match requested {
        Some(minutes) if minutes > 0 => minutes,
        _ => default_minutes,
    }
}

/// External notification only follows an actual order transition; closing a
/// code against an already settled order stays quiet.
pub fn notifies(plan: TransitionPlan) -> bool {
    matches!(plan, TransitionPlan::Apply(_))
}

/// The one-way confirmation gate: only a PENDING code before its deadline
/// may be confirmed.
pub fn check_confirmable(
    status: CashCodeStatus,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), CashConfirmError> {
    match status {
        CashCodeStatus::Confirmed => Err(CashConfirmError::CodeAlreadyConfirmed),
        CashCodeStatus::Expired => Err(CashConfirmError::CodeExpired),
        CashCodeStatus::Pending if now >= expires_at => Err(CashConfirmError::CodeExpired),
        CashCodeStatus::Pending => Ok(()),
    }
}

impl CashCodeService {
    /// Allocates a fresh code for an order. Collisions lose the insert race
    /// on the primary key and trigger regeneration.
    pub async fn generate(
        &self,
        order_id: uuid::Uuid,
        amount: i64,
        ttl_minutes: Option<i64>,
    ) -> Result<CashPaymentCode> {
        let expires_at = Utc::now() + Duration::minutes(effective_ttl(ttl_minutes, self.ttl_minutes));
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = random_code(&mut rand::thread_rng());
            if self
                .cash_codes_repo
                .try_insert(&code, order_id, amount, expires_at)
                .await?
            {
                tracing::info!(code = %code, order_id = %order_id, "cash code issued");
                return Ok(CashPaymentCode {
                    code,
                    order_id,
                    amount,
                    expires_at,
                    status: CashCodeStatus::Pending,
                    confirmed_by: None,
                    confirmed_at: None,
                });
            }
        }
        bail!("could not allocate a unique cash code after {MAX_GENERATE_ATTEMPTS} attempts")
    }

    /// Operator confirmation. Locks the code row, enforces the one-way
    /// transition, then drives the same persister path a webhook would:
    /// lock order, re-check terminal, upsert transaction, apply Confirm,
    /// write the audit event, commit once.
    pub async fn confirm(
        &self,
        code: &str,
        operator_id: &str,
        admin_notes: Option<&str>,
    ) -> Result<CashConfirmation, CashConfirmError> {
        let mut tx = self.pool.begin().await.context("begin confirm transaction")?;

        let cash_code = CashCodesRepo::find_for_update(&mut tx, code)
            .await?
            .ok_or(CashConfirmError::CodeNotFound)?;

        check_confirmable(cash_code.status, cash_code.expires_at, Utc::now())?;

        let order = OrdersRepo::find_by_id_for_update(&mut tx, cash_code.order_id)
            .await?
            .ok_or_else(|| anyhow!("order {} missing for cash code {code}", cash_code.order_id))?;

        if cash_code.amount != order.total_amount {
            return Err(CashConfirmError::AmountMismatch {
                expected: order.total_amount,
                got: cash_code.amount,
            });
        }

        let plan = plan_transition(order.status, CanonicalAction::Confirm);
        let order_status = match plan {
            TransitionPlan::Apply(new_status) => {
                let tx_id = OrdersRepo::upsert_transaction_tx(
                    &mut tx,
                    &self.transaction_input(&cash_code, &order),
                )
                .await?;
                OrdersRepo::set_status_tx(&mut tx, order.id, new_status).await?;
                WebhookEventsRepo::insert_operator_event_tx(
                    &mut tx,
                    &format!("cash-{code}"),
                    &serde_json::json!({
                        "code": code,
                        "operator_id": operator_id,
                        "admin_notes": admin_notes,
                    }),
                    Some(tx_id),
                )
                .await?;
                new_status
            }
            // The order settled through another channel first; close the
            // code without touching the order.
            TransitionPlan::AlreadyTerminal | TransitionPlan::Nothing => {
                tracing::info!(
                    code = %code,
                    order = %order.order_number,
                    status = order.status.as_str(),
                    "cash confirm on already settled order, code closed only"
                );
                order.status
            }
        };

        CashCodesRepo::mark_confirmed_tx(&mut tx, code, operator_id).await?;
        tx.commit().await.context("commit confirm transaction")?;

        tracing::info!(code = %code, operator = operator_id, "cash code confirmed");

        if notifies(plan) {
            let notifier = self.notifier.clone();
            let order_number = order.order_number.clone();
            tokio::spawn(async move {
                notifier
                    .order_status_changed(&order_number, CanonicalAction::Confirm, Gateway::Efecty)
                    .await;
            });
        }

        Ok(CashConfirmation {
            code: code.to_string(),
            order_number: order.order_number,
            order_status: order_status.as_str(),
            confirmed_by: operator_id.to_string(),
        })
    }

    fn transaction_input<'a>(&self, cash_code: &'a CashPaymentCode, order: &'a Order) -> TransactionInput<'a> {
        TransactionInput {
            order_id: order.id,
            gateway: Gateway::Efecty,
            gateway_transaction_id: &cash_code.code,
            amount: cash_code.amount,
            currency: &order.currency,
            status: TransactionStatus::Approved,
            gateway_response: serde_json::json!({ "channel": "cash_network" }),
        }
    }

    /// Background sweep closing expired codes, in the same loop shape as the
    /// other long-running tasks.
    pub async fn run_expiry_sweep(self) {
        loop {
            match self.cash_codes_repo.expire_due().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("expired {n} cash codes"),
                Err(err) => tracing::error!("cash code expiry sweep error: {err}"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }
}
