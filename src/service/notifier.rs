use crate::domain::event::Gateway;
use crate::mapper::CanonicalAction;

/// Post-commit ping to the (external) notification service. Best effort:
/// failures are logged and dropped, and nothing here ever runs inside the
/// persister's transaction.
#[derive(Clone)]
pub struct Notifier {
    pub client: reqwest::Client,
    pub endpoint: Option<String>,
}

impl Notifier {
    pub async fn order_status_changed(
        &self,
        order_number: &str,
        action: CanonicalAction,
        gateway: Gateway,
    ) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };

        let event = match action {
            CanonicalAction::Confirm => "order.confirmed",
            CanonicalAction::Cancel => "order.cancelled",
            CanonicalAction::NoChange => return,
        };

        let payload = serde_json::json!({
            "event": event,
            "order_number": order_number,
            "gateway": gateway.as_str(),
        });

        if let Err(err) = self.client.post(endpoint).json(&payload).send().await {
            tracing::warn!(order = order_number, "notification post failed: {err}");
        }
    }
}
