use std::sync::LazyLock;

use regex::{Captures, Regex};

/// First run of digits and dots in a value, e.g. `7.2` in `7.2 [H]`.
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\d.]+)").unwrap());

/// "A to B" or "A - B" (whitespace and extra hyphens tolerated).
static BOUNDED_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d.]+)[\s-]+to[\s-]+([\d.]+)|(\d+\.?\d*)[\s-]*-[\s-]*(\d+\.?\d*)").unwrap()
});

static LESS_THAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\s*([\d.]+)").unwrap());

static GREATER_THAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s*([\d.]+)").unwrap());

/// Outcome of comparing a value against a reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeVerdict {
    Within,
    Outside,
    /// The value or the range could not be read as numbers.
    Undetermined,
}

impl RangeVerdict {
    /// `Some(true)` for Outside, `Some(false)` for Within, `None` otherwise.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            RangeVerdict::Within => Some(false),
            RangeVerdict::Outside => Some(true),
            RangeVerdict::Undetermined => None,
        }
    }
}

impl From<bool> for RangeVerdict {
    fn from(outside: bool) -> Self {
        if outside {
            RangeVerdict::Outside
        } else {
            RangeVerdict::Within
        }
    }
}

/// Compare the first number in `value` against `range_text`.
///
/// Range forms, tried in order:
/// - `A to B` / `A - B`: outside if `v < A` or `v > B`
/// - `< N`: outside if `v >= N`
/// - `> N`: outside if `v <= N`
///
/// Bounds are inclusive on the in-range side.
pub fn evaluate_range(value: &str, range_text: &str) -> RangeVerdict {
    if range_text.is_empty() {
        return RangeVerdict::Undetermined;
    }

    let Some(v) = FIRST_NUMBER
        .captures(value)
        .and_then(|caps| parse_group(&caps, 1))
    else {
        return RangeVerdict::Undetermined;
    };

    if let Some(caps) = BOUNDED_RANGE.captures(range_text) {
        let lower = parse_group(&caps, 1).or_else(|| parse_group(&caps, 3));
        let upper = parse_group(&caps, 2).or_else(|| parse_group(&caps, 4));
        return match (lower, upper) {
            (Some(lower), Some(upper)) => (v < lower || v > upper).into(),
            _ => RangeVerdict::Undetermined,
        };
    }

    if let Some(caps) = LESS_THAN.captures(range_text) {
        return match parse_group(&caps, 1) {
            Some(bound) => (v >= bound).into(),
            None => RangeVerdict::Undetermined,
        };
    }

    if let Some(caps) = GREATER_THAN.captures(range_text) {
        return match parse_group(&caps, 1) {
            Some(bound) => (v <= bound).into(),
            None => RangeVerdict::Undetermined,
        };
    }

    RangeVerdict::Undetermined
}

/// True only when the value is known to lie outside the range.
/// Anything that cannot be evaluated counts as not out of range.
pub fn is_out_of_range(value: &str, range_text: &str) -> bool {
    evaluate_range(value, range_text) == RangeVerdict::Outside
}

/// Parse capture group `index` as `f64`. Missing group or bad number: `None`.
fn parse_group(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index)?.as_str().parse().ok()
}
