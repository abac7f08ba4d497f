use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashCodeStatus {
    Pending,
    Confirmed,
    Expired,
}

impl CashCodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CashCodeStatus::Pending => "PENDING",
            CashCodeStatus::Confirmed => "CONFIRMED",
            CashCodeStatus::Expired => "EXPIRED",
        }
    }

    pub fn from_db(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(CashCodeStatus::Pending),
            "CONFIRMED" => Some(CashCodeStatus::Confirmed),
            "EXPIRED" => Some(CashCodeStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CashPaymentCode {
    pub code: String,
    pub order_id: Uuid,
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
    pub status: CashCodeStatus,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}
