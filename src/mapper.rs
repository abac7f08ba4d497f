use crate::domain::event::Gateway;
use crate::domain::order::{OrderStatus, TransactionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalAction {
    Confirm,
    Cancel,
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedStatus {
    pub action: CanonicalAction,
    pub transaction_status: TransactionStatus,
    /// False when the provider status string is not in the lookup table.
    /// Unrecognized statuses never map to a guessed terminal state.
    pub recognized: bool,
}

/// Translates one provider's native status vocabulary into a canonical
/// action plus the transaction status to record.
pub fn map_gateway_status(gateway: Gateway, raw: &str) -> MappedStatus {
    let known = |action, transaction_status| MappedStatus {
        action,
        transaction_status,
        recognized: true,
    };

    let mapped = match gateway {
        Gateway::Wompi => match raw {
            "APPROVED" => Some(known(CanonicalAction::Confirm, TransactionStatus::Approved)),
            "DECLINED" => Some(known(CanonicalAction::Cancel, TransactionStatus::Declined)),
            "VOIDED" => Some(known(CanonicalAction::Cancel, TransactionStatus::Voided)),
            // ERROR is not terminal on the provider side; the order stays
            // PENDING so a later callback can still settle it.
            "ERROR" => Some(known(CanonicalAction::NoChange, TransactionStatus::Error)),
            "PENDING" => Some(known(CanonicalAction::NoChange, TransactionStatus::Pending)),
            _ => None,
        },
        Gateway::Payu => match raw {
            // state_pol numeric vocabulary: 4 approved, 6 declined,
            // 5 expired, 7 pending, 104 internal error.
            "4" => Some(known(CanonicalAction::Confirm, TransactionStatus::Approved)),
            "6" => Some(known(CanonicalAction::Cancel, TransactionStatus::Declined)),
            "5" => Some(known(CanonicalAction::Cancel, TransactionStatus::Voided)),
            "7" => Some(known(CanonicalAction::NoChange, TransactionStatus::Pending)),
            "104" => Some(known(CanonicalAction::NoChange, TransactionStatus::Error)),
            _ => None,
        },
        // The cash network has no provider vocabulary; operator confirmation
        // enters the pipeline with this single synthetic status.
        Gateway::Efecty => match raw {
            "CONFIRMED" => Some(known(CanonicalAction::Confirm, TransactionStatus::Approved)),
            _ => None,
        },
    };

    mapped.unwrap_or(MappedStatus {
        action: CanonicalAction::NoChange,
        transaction_status: TransactionStatus::Pending,
        recognized: false,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    Apply(OrderStatus),
    /// The order is already CONFIRMED or CANCELLED; the action is absorbed.
    AlreadyTerminal,
    Nothing,
}

/// The order lifecycle is monotonic: PENDING may move to CONFIRMED or
/// CANCELLED, and terminal states absorb everything that arrives later.
pub fn plan_transition(current: OrderStatus, action: CanonicalAction) -> TransitionPlan {
    if current.is_terminal() {
        return match action {
            CanonicalAction::NoChange => TransitionPlan::Nothing,
            _ => TransitionPlan::AlreadyTerminal,
        };
    }
    match action {
        CanonicalAction::Confirm => TransitionPlan::Apply(OrderStatus::Confirmed),
        CanonicalAction::Cancel => TransitionPlan::Apply(OrderStatus::Cancelled),
        CanonicalAction::NoChange => TransitionPlan::Nothing,
    }
}

/// A transaction may only move an order to CONFIRMED if its amount equals
/// the order total at that moment.
pub fn amount_consistent(action: CanonicalAction, order_total: i64, transaction_amount: i64) -> bool {
    action != CanonicalAction::Confirm || order_total == transaction_amount
}
