use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Wompi,
    Payu,
    Efecty,
}

impl Gateway {
    pub fn as_str(self) -> &'static str {
        match self {
            Gateway::Wompi => "wompi",
            Gateway::Payu => "payu",
            Gateway::Efecty => "efecty",
        }
    }

    /// Whether the provider delivers inbound callbacks at all. Efecty is
    /// confirmed by an operator action, never by a webhook.
    pub fn has_webhook_channel(self) -> bool {
        !matches!(self, Gateway::Efecty)
    }
}

impl FromStr for Gateway {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wompi" => Ok(Gateway::Wompi),
            "payu" => Ok(Gateway::Payu),
            "efecty" => Ok(Gateway::Efecty),
            _ => Err(()),
        }
    }
}

/// One provider callback reduced to the canonical vocabulary. Amounts are
/// integer minor units regardless of how the provider encodes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub event_id: String,
    pub order_reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway_status: String,
    pub occurred_at: Option<DateTime<Utc>>,
}
