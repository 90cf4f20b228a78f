use serde_json::Value;

use crate::constants::{MAX_RELEVANCY_SCORE, UNPARSEABLE_SCORE};

/// Coerces a model-emitted score to `0..=MAX_RELEVANCY_SCORE`.
///
/// Accepts integers, floats (truncated), `"7"`, `"7/10"` and `"7 out of 10"`. Anything else,
/// including negative numbers, yields [`UNPARSEABLE_SCORE`]. Values above the scale clamp to
/// its maximum.
pub fn coerce_score(value: &Value) -> u8 {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                clamp(i)
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f >= 0.0 {
                    clamp(f.trunc() as u64)
                } else {
                    UNPARSEABLE_SCORE
                }
            } else {
                UNPARSEABLE_SCORE
            }
        }
        Value::String(s) => coerce_score_text(s),
        _ => UNPARSEABLE_SCORE,
    }
}

/// Text form of [`coerce_score`]; only the part before a `/` is considered.
pub fn coerce_score_text(text: &str) -> u8 {
    let numerator = text.split('/').next().unwrap_or_default().trim();
    if numerator.starts_with('-') {
        return UNPARSEABLE_SCORE;
    }

    let digits: String = numerator
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return UNPARSEABLE_SCORE;
    }
    // Overflowing digit runs are far above the scale.
    digits.parse::<u64>().map(clamp).unwrap_or(MAX_RELEVANCY_SCORE)
}

fn clamp(score: u64) -> u8 {
    score.min(MAX_RELEVANCY_SCORE as u64) as u8
}
