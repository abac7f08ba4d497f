use chrono::{Duration, Utc};
use payment_reconciler::domain::cash_code::CashCodeStatus;
use payment_reconciler::domain::order::OrderStatus;
use payment_reconciler::domain::outcome::CashConfirmError;
use payment_reconciler::mapper::TransitionPlan;
use payment_reconciler::service::cash_codes::{
    check_confirmable, effective_ttl, notifies, random_code,
};

#[test]
fn code_shape_is_stable() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let code = random_code(&mut rng);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3, "unexpected shape: {code}");
        assert_eq!(parts[0], "MST");
        assert_eq!(parts[1].len(), 3);
        assert!(parts[1].bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
    }
}

#[test]
fn code_suffix_avoids_ambiguous_characters() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let code = random_code(&mut rng);
        let suffix = code.rsplit('-').next().unwrap();
        for c in suffix.chars() {
            assert!(!matches!(c, '0' | 'O' | '1' | 'I'), "ambiguous char in {code}");
        }
    }
}

#[test]
fn pending_code_before_expiry_is_confirmable() {
    let now = Utc::now();
    let result = check_confirmable(CashCodeStatus::Pending, now + Duration::hours(1), now);
    assert!(result.is_ok());
}

// Scenario: a second confirm attempt on an already confirmed code is
// rejected, not silently accepted.
#[test]
fn confirmed_code_rejects_reconfirmation() {
    let now = Utc::now();
    let result = check_confirmable(CashCodeStatus::Confirmed, now + Duration::hours(1), now);
    assert!(matches!(result, Err(CashConfirmError::CodeAlreadyConfirmed)));
}

#[test]
fn code_past_deadline_is_expired() {
    let now = Utc::now();
    let result = check_confirmable(CashCodeStatus::Pending, now - Duration::seconds(1), now);
    assert!(matches!(result, Err(CashConfirmError::CodeExpired)));
}

#[test]
fn deadline_itself_counts_as_expired() {
    let now = Utc::now();
    let result = check_confirmable(CashCodeStatus::Pending, now, now);
    assert!(matches!(result, Err(CashConfirmError::CodeExpired)));
}

#[test]
fn swept_code_stays_expired() {
    let now = Utc::now();
    // Even with a future deadline, a code the sweep already closed is done.
    let result = check_confirmable(CashCodeStatus::Expired, now + Duration::hours(1), now);
    assert!(matches!(result, Err(CashConfirmError::CodeExpired)));
}

#[test]
fn requested_ttl_overrides_default() {
    assert_eq!(effective_ttl(Some(30), 4320), 30);
    assert_eq!(effective_ttl(Some(1), 4320), 1);
}

#[test]
fn absent_or_nonsense_ttl_falls_back_to_default() {
    assert_eq!(effective_ttl(None, 4320), 4320);
    assert_eq!(effective_ttl(Some(0), 4320), 4320);
    assert_eq!(effective_ttl(Some(-15), 4320), 4320);
}

// Scenario: the order was cancelled through a card gateway before the buyer
// paid cash. Confirming the code closes it but must not announce an order
// change that never happened.
#[test]
fn settled_order_confirmation_stays_quiet() {
    assert!(!notifies(TransitionPlan::AlreadyTerminal));
    assert!(!notifies(TransitionPlan::Nothing));
}

#[test]
fn applied_transition_notifies() {
    assert!(notifies(TransitionPlan::Apply(OrderStatus::Confirmed)));
}
