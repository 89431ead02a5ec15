//! Advice text shaping — budget normalization and rule-based fallback.
//!
//! Advice strings are Chinese, so both budgets count Unicode scalar
//! values, not bytes: each item ≤ 30 characters, and the whole list
//! joined with "；" ≤ 50 characters.

use crate::api::WeatherReading;

/// Maximum characters per advice item.
pub const MAX_ITEM_CHARS: usize = 30;

/// Maximum characters for the full list joined with [`SEPARATOR`].
pub const MAX_JOINED_CHARS: usize = 50;

/// Single-character separator used when measuring the joined budget.
pub const SEPARATOR: char = '；';

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Normalize a candidate advice list against the character budget.
///
/// Each item is truncated to [`MAX_ITEM_CHARS`]; the longest prefix
/// whose items joined by [`SEPARATOR`] stay within [`MAX_JOINED_CHARS`]
/// is kept, in original order. May return an empty list — callers on
/// the completion path substitute [`fallback_advice`].
pub fn normalize(candidates: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut joined_len = 0usize;
    for item in candidates {
        let item = truncate_chars(&item, MAX_ITEM_CHARS);
        let sep = usize::from(!out.is_empty());
        let next_len = joined_len + sep + item.chars().count();
        if next_len > MAX_JOINED_CHARS {
            break;
        }
        joined_len = next_len;
        out.push(item);
    }
    out
}

/// Split completion text into advice fragments.
///
/// Splits on newline and the delimiters the model tends to emit
/// ("；", ";", "。"), trims whitespace, and drops empty fragments.
pub fn split_completion(text: &str) -> Vec<String> {
    text.split(['\n', '；', ';', '。'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rule-based advice derived purely from weather thresholds.
///
/// Rules are evaluated independently, in fixed order, each appending at
/// most one string; when none fire a single neutral string is produced.
/// The result passes through the same budget as completion-derived
/// advice.
pub fn fallback_advice(weather: &WeatherReading) -> Vec<String> {
    let mut tips = Vec::new();
    if weather.temp < 5.0 {
        tips.push("低温防寒，穿羽绒服+围巾".to_string());
    }
    if weather.temp > 30.0 {
        tips.push("高温防暑，避正午外出防晒".to_string());
    }
    if weather.precip_probability > 60.0 {
        tips.push("降水较大，通勤记得带伞".to_string());
    }
    if weather.wind_scale > 5.0 {
        tips.push("风力偏大，注意防风与坠物".to_string());
    }
    if tips.is_empty() {
        tips.push("天气平稳，合理安排出行".to_string());
    }
    normalize(tips)
}
