//! Column type inference from raw element text.
//!
//! Classification is an ordered table of independent rules. The first rule
//! that returns a type wins; a value no rule claims is `TEXT`.

use crate::types::ColumnType;
use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Upper bound of a signed 32-bit integer
const INT_MAX: u64 = i32::MAX as u64;

/// A rule either claims a value or passes it on
type Rule = fn(&str) -> Option<ColumnType>;

/// Rules in priority order
const RULES: [Rule; 4] = [blank_rule, integer_rule, decimal_rule, timestamp_rule];

/// Infer the column type of one observed value.
///
/// Total: every input, including `None`, maps to exactly one type.
pub fn infer_type(value: Option<&str>) -> ColumnType {
    let Some(value) = value else {
        return ColumnType::Text;
    };

    RULES
        .iter()
        .find_map(|rule| rule(value))
        .unwrap_or(ColumnType::Text)
}

fn blank_rule(value: &str) -> Option<ColumnType> {
    value.trim().is_empty().then_some(ColumnType::Text)
}

fn integer_rule(value: &str) -> Option<ColumnType> {
    if !DIGITS_REGEX.is_match(value) {
        return None;
    }

    // Arbitrarily long digit strings are still integers, just not 32-bit ones.
    let magnitude = value.trim_start_matches('0');
    let fits = magnitude.len() <= 10
        && magnitude.parse::<u64>().map_or(magnitude.is_empty(), |n| n <= INT_MAX);

    Some(if fits { ColumnType::Int } else { ColumnType::BigInt })
}

fn decimal_rule(value: &str) -> Option<ColumnType> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .map(|_| ColumnType::Decimal)
}

fn timestamp_rule(value: &str) -> Option<ColumnType> {
    (value.contains('T') && value.contains(':')).then_some(ColumnType::Timestamp)
}
