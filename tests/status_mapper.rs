use payment_reconciler::domain::event::Gateway;
use payment_reconciler::domain::order::{OrderStatus, TransactionStatus};
use payment_reconciler::domain::outcome::ProcessingError;
use payment_reconciler::mapper::{
    amount_consistent, map_gateway_status, plan_transition, CanonicalAction, TransitionPlan,
};

#[test]
fn wompi_vocabulary_maps() {
    let approved = map_gateway_status(Gateway::Wompi, "APPROVED");
    assert_eq!(approved.action, CanonicalAction::Confirm);
    assert_eq!(approved.transaction_status, TransactionStatus::Approved);
    assert!(approved.recognized);

    assert_eq!(map_gateway_status(Gateway::Wompi, "DECLINED").action, CanonicalAction::Cancel);
    assert_eq!(map_gateway_status(Gateway::Wompi, "VOIDED").action, CanonicalAction::Cancel);

    let error = map_gateway_status(Gateway::Wompi, "ERROR");
    assert_eq!(error.action, CanonicalAction::NoChange);
    assert_eq!(error.transaction_status, TransactionStatus::Error);

    assert_eq!(map_gateway_status(Gateway::Wompi, "PENDING").action, CanonicalAction::NoChange);
}

#[test]
fn payu_vocabulary_maps() {
    assert_eq!(map_gateway_status(Gateway::Payu, "4").action, CanonicalAction::Confirm);
    assert_eq!(map_gateway_status(Gateway::Payu, "6").action, CanonicalAction::Cancel);
    assert_eq!(map_gateway_status(Gateway::Payu, "5").action, CanonicalAction::Cancel);
    assert_eq!(map_gateway_status(Gateway::Payu, "7").action, CanonicalAction::NoChange);
    assert_eq!(
        map_gateway_status(Gateway::Payu, "104").transaction_status,
        TransactionStatus::Error
    );
}

#[test]
fn unknown_status_never_guesses_a_terminal_state() {
    for (gateway, raw) in [
        (Gateway::Wompi, "SOMETHING_NEW"),
        (Gateway::Payu, "99"),
        (Gateway::Efecty, "REJECTED"),
    ] {
        let mapped = map_gateway_status(gateway, raw);
        assert!(!mapped.recognized);
        assert_eq!(mapped.action, CanonicalAction::NoChange);
    }
}

#[test]
fn pending_order_transitions() {
    assert_eq!(
        plan_transition(OrderStatus::Pending, CanonicalAction::Confirm),
        TransitionPlan::Apply(OrderStatus::Confirmed)
    );
    assert_eq!(
        plan_transition(OrderStatus::Pending, CanonicalAction::Cancel),
        TransitionPlan::Apply(OrderStatus::Cancelled)
    );
    assert_eq!(
        plan_transition(OrderStatus::Pending, CanonicalAction::NoChange),
        TransitionPlan::Nothing
    );
}

#[test]
fn terminal_orders_absorb_everything() {
    for terminal in [OrderStatus::Confirmed, OrderStatus::Cancelled] {
        assert_eq!(
            plan_transition(terminal, CanonicalAction::Confirm),
            TransitionPlan::AlreadyTerminal
        );
        assert_eq!(
            plan_transition(terminal, CanonicalAction::Cancel),
            TransitionPlan::AlreadyTerminal
        );
        assert_eq!(
            plan_transition(terminal, CanonicalAction::NoChange),
            TransitionPlan::Nothing
        );
    }
}

// A retried callback with a fresh event_id but the same approved order must
// land in AlreadyTerminal, which is what keeps redelivery safe past the
// idempotency guard.
#[test]
fn approved_then_redelivered_approval_is_a_noop() {
    let mapped = map_gateway_status(Gateway::Wompi, "APPROVED");
    let first = plan_transition(OrderStatus::Pending, mapped.action);
    assert_eq!(first, TransitionPlan::Apply(OrderStatus::Confirmed));

    let second = plan_transition(OrderStatus::Confirmed, mapped.action);
    assert_eq!(second, TransitionPlan::AlreadyTerminal);
}

#[test]
fn confirmation_requires_exact_amount() {
    assert!(amount_consistent(CanonicalAction::Confirm, 50000, 50000));
    assert!(!amount_consistent(CanonicalAction::Confirm, 50000, 49999));
    assert!(!amount_consistent(CanonicalAction::Confirm, 50000, 0));
}

#[test]
fn non_confirm_actions_skip_the_amount_check() {
    assert!(amount_consistent(CanonicalAction::Cancel, 50000, 1));
    assert!(amount_consistent(CanonicalAction::NoChange, 50000, 1));
}

// The unrecognized-status path stamps the audit row with this message; the
// raw provider value must survive into it.
#[test]
fn unknown_status_error_carries_the_raw_value() {
    let err = ProcessingError::UnknownGatewayStatus("SOMETHING_NEW".to_string());
    assert_eq!(err.to_string(), "unknown gateway status: SOMETHING_NEW");
}
