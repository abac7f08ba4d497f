use payment_reconciler::gateways::{payu, wompi};

const WOMPI_SECRET: &str = "test_events_secret_4f3k";
const PAYU_API_KEY: &str = "4Vj8eK4rloUd272L48hsrarnUA";
const PAYU_MERCHANT_ID: &str = "508029";

#[test]
fn wompi_valid_signature_accepted() {
    let body = br#"{"event":"transaction.updated","data":{"transaction":{"id":"1234-1","status":"APPROVED"}}}"#;
    let sig = wompi::compute_signature(WOMPI_SECRET, body);

    assert!(wompi::verify_signature(WOMPI_SECRET, body, &sig));
}

#[test]
fn wompi_wrong_secret_rejected() {
    let body = br#"{"event":"transaction.updated"}"#;
    let sig = wompi::compute_signature("another_secret", body);

    assert!(!wompi::verify_signature(WOMPI_SECRET, body, &sig));
}

#[test]
fn wompi_any_flipped_payload_byte_rejected() {
    let body = br#"{"reference":"ORD-001","amount_in_cents":50000}"#.to_vec();
    let sig = wompi::compute_signature(WOMPI_SECRET, &body);

    for i in 0..body.len() {
        let mut tampered = body.clone();
        tampered[i] ^= 0x01;
        assert!(
            !wompi::verify_signature(WOMPI_SECRET, &tampered, &sig),
            "flipping byte {i} should invalidate the signature"
        );
    }
}

#[test]
fn wompi_any_flipped_signature_nibble_rejected() {
    let body = br#"{"reference":"ORD-001"}"#;
    let sig = wompi::compute_signature(WOMPI_SECRET, body);

    for i in 0..sig.len() {
        let mut tampered = sig.clone().into_bytes();
        // Stay within hex so the reject comes from the comparison, not the decoder.
        tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();
        if tampered == sig {
            continue;
        }
        assert!(!wompi::verify_signature(WOMPI_SECRET, body, &tampered));
    }
}

#[test]
fn wompi_non_hex_header_rejected() {
    assert!(!wompi::verify_signature(WOMPI_SECRET, b"{}", "not-hex-at-all"));
    assert!(!wompi::verify_signature(WOMPI_SECRET, b"{}", ""));
}

#[test]
fn wompi_truncated_signature_rejected() {
    let body = b"payload";
    let sig = wompi::compute_signature(WOMPI_SECRET, body);
    assert!(!wompi::verify_signature(WOMPI_SECRET, body, &sig[..32]));
}

// An empty secret means the gateway is not configured; it must not become
// an accept-everything key, even when the sender signed with the same
// empty string.
#[test]
fn wompi_unconfigured_secret_rejects_all() {
    let body = br#"{"event":"transaction.updated"}"#;
    let sig = wompi::compute_signature("", body);

    assert!(!wompi::verify_signature("", body, &sig));
    assert!(!wompi::verify_signature("", body, ""));
}

fn payu_callback() -> payu::Callback {
    payu::Callback {
        merchant_id: "508029".to_string(),
        reference_sale: "ORD-001".to_string(),
        value: "50000.00".to_string(),
        currency: "COP".to_string(),
        state_pol: "4".to_string(),
        transaction_id: "abc123-tx-1".to_string(),
        sign: String::new(),
    }
}

#[test]
fn payu_valid_signature_accepted() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature(PAYU_API_KEY, &cb);

    assert!(payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_uppercase_hex_accepted() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature(PAYU_API_KEY, &cb).to_uppercase();

    assert!(payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_wrong_api_key_rejected() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature("some_other_key", &cb);

    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_tampered_amount_rejected() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature(PAYU_API_KEY, &cb);
    cb.value = "50001.00".to_string();

    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_tampered_state_rejected() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature(PAYU_API_KEY, &cb);
    cb.state_pol = "6".to_string();

    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_any_flipped_sign_character_rejected() {
    let mut cb = payu_callback();
    let sign = payu::compute_signature(PAYU_API_KEY, &cb);

    for i in 0..sign.len() {
        let mut tampered = sign.clone().into_bytes();
        tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(tampered).unwrap();
        if tampered == sign {
            continue;
        }
        cb.sign = tampered;
        assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
    }
}

#[test]
fn payu_garbage_sign_rejected() {
    let mut cb = payu_callback();
    cb.sign = "zz".repeat(16);
    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));

    cb.sign = String::new();
    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}

#[test]
fn payu_unconfigured_api_key_rejects_all() {
    let mut cb = payu_callback();
    cb.sign = payu::compute_signature("", &cb);

    assert!(!payu::verify_signature("", PAYU_MERCHANT_ID, &cb));
}

// A callback for somebody else's merchant account carries a composite that
// verifies against its own merchant_id; the expected-account check is what
// rejects it.
#[test]
fn payu_foreign_merchant_rejected() {
    let mut cb = payu_callback();
    cb.merchant_id = "999999".to_string();
    cb.sign = payu::compute_signature(PAYU_API_KEY, &cb);

    assert!(!payu::verify_signature(PAYU_API_KEY, PAYU_MERCHANT_ID, &cb));
}
