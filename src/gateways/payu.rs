use crate::domain::event::NormalizedEvent;
use crate::gateways::{digest_eq, parse_decimal_minor, NormalizeError};
use md5::{Digest, Md5};
use std::collections::HashMap;

/// PayU confirmation callbacks are form-encoded with the signature embedded
/// as the `sign` field rather than a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub merchant_id: String,
    pub reference_sale: String,
    pub value: String,
    pub currency: String,
    pub state_pol: String,
    pub transaction_id: String,
    pub sign: String,
}

pub fn parse_form(raw: &[u8]) -> Result<Callback, NormalizeError> {
    let fields: HashMap<String, String> = url::form_urlencoded::parse(raw)
        .into_owned()
        .collect();

    let take = |name: &'static str| -> Result<String, NormalizeError> {
        fields
            .get(name)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or(NormalizeError::MissingField(name))
    };

    Ok(Callback {
        merchant_id: take("merchant_id")?,
        reference_sale: take("reference_sale")?,
        value: take("value")?,
        currency: take("currency")?,
        state_pol: take("state_pol")?,
        transaction_id: take("transaction_id")?,
        sign: take("sign")?,
    })
}

/// Composite MD5 check: the digest of
/// `api_key~merchant_id~reference_sale~value~currency~state_pol` must match
/// the `sign` field. The supplied hex is accepted case-insensitively; the
/// comparison itself is constant-time over the hex bytes.
///
/// An unconfigured (empty) api key rejects everything. The payload's
/// merchant_id is attacker-supplied, so when a merchant id is configured it
/// must match too.
pub fn verify_signature(api_key: &str, expected_merchant_id: &str, cb: &Callback) -> bool {
    if api_key.is_empty() {
        return false;
    }
    if !expected_merchant_id.is_empty() && cb.merchant_id != expected_merchant_id {
        return false;
    }
    let base = format!(
        "{}~{}~{}~{}~{}~{}",
        api_key, cb.merchant_id, cb.reference_sale, cb.value, cb.currency, cb.state_pol
    );
    let expected = hex::encode(Md5::digest(base.as_bytes()));
    let supplied = cb.sign.trim().to_ascii_lowercase();
    digest_eq(expected.as_bytes(), supplied.as_bytes())
}

pub fn normalize(cb: &Callback) -> Result<NormalizedEvent, NormalizeError> {
    let amount_minor = parse_decimal_minor(&cb.value)
        .ok_or_else(|| NormalizeError::Invalid(format!("bad amount value: {}", cb.value)))?;

    Ok(NormalizedEvent {
        event_id: cb.transaction_id.clone(),
        order_reference: cb.reference_sale.clone(),
        amount_minor,
        currency: cb.currency.clone(),
        gateway_status: cb.state_pol.clone(),
        occurred_at: None,
    })
}

/// Test-fixture helper: builds the composite signature PayU would send.
pub fn compute_signature(api_key: &str, cb: &Callback) -> String {
    let base = format!(
        "{}~{}~{}~{}~{}~{}",
        api_key, cb.merchant_id, cb.reference_sale, cb.value, cb.currency, cb.state_pol
    );
    hex::encode(Md5::digest(base.as_bytes()))
}
