//! Numeric parsing for procfs tokens.
//!
//! Two policies exist. [`parse_float`] is lenient: a corrupt token becomes `0.0`
//! so the rest of its record still gets emitted. [`parse_float_strict`] reports
//! the failure and is used where the grammar says a bad value suppresses emission.

/// Parse a token as `f64`, returning `0.0` for anything malformed.
pub fn parse_float(token: &str) -> f64 {
    parse_float_strict(token).unwrap_or(0.0)
}

pub fn parse_float_strict(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok()
}
