use subtle::ConstantTimeEq;
use thiserror::Error;

pub mod payu;
pub mod wompi;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// Constant-time equality over raw digest bytes. Length mismatch is an
/// immediate reject; the lengths themselves are not secret.
pub(crate) fn digest_eq(expected: &[u8], supplied: &[u8]) -> bool {
    if expected.len() != supplied.len() {
        return false;
    }
    expected.ct_eq(supplied).into()
}

/// Parses a decimal amount string ("50000", "50000.00") into integer minor
/// units, assuming at most two decimal places.
pub fn parse_decimal_minor(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (units, frac) = match raw.split_once('.') {
        Some((u, f)) => (u, f),
        None => (raw, ""),
    };
    if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let units: i64 = units.parse().ok()?;
    let cents: i64 = if frac.is_empty() {
        0
    } else {
        format!("{:0<2}", frac).parse().ok()?
    };
    units.checked_mul(100)?.checked_add(cents)
}
