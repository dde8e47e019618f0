use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};

/// Length of the anti-forgery `state` token sent with each authorization request.
pub const STATE_LENGTH: usize = 32;

/// Generates a fresh anti-forgery token drawn uniformly from the 62 ASCII
/// alphanumerics.
pub fn generate_state() -> String {
    generate_random_string(STATE_LENGTH)
}

pub fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// `Authorization` header value for client-credential authenticated token calls.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{client_id}:{client_secret}"))
    )
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Compares two strings without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Parses an inclusive `min,max` range of unit-interval values, e.g. `0.2,0.8`.
pub fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX but got '{s}'"))?;
    let min: f64 = min.trim().parse().map_err(|e| format!("invalid minimum: {e}"))?;
    let max: f64 = max.trim().parse().map_err(|e| format!("invalid maximum: {e}"))?;

    if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) {
        return Err(format!("range bounds must be within 0..=1, got {min},{max}"));
    }
    if min > max {
        return Err(format!("minimum {min} is greater than maximum {max}"));
    }
    Ok((min, max))
}

/// Parses a single audio feature value in `0..=1`.
pub fn parse_unit(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|e| format!("invalid number: {e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("value {value} is outside 0..=1"))
    }
}
