use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Recognized unit tokens, tried left to right.
///
/// The order is significant: the regex engine takes the first alternative that
/// matches, so `pg` wins over `pgm` and `mg/L` is tried before `mg/dL`.
const UNIT_ALTERNATION: &str =
    r"\w+/%|/cumm|/mm3|mill/cumm|mill/mm3|g/dL|gm/dL|gm%|mg/L|mg/dL|pg|pgm|fL|%|U/L|mIU/L";

/// A compiled split rule: where to look and what to pull out of a match.
struct UnitRule {
    regex: Regex,
    extract: fn(&Captures<'_>) -> (String, Option<String>),
}

fn value_and_unit(caps: &Captures<'_>) -> (String, Option<String>) {
    (caps[1].to_string(), Some(caps[2].to_string()))
}

fn bare_value(caps: &Captures<'_>) -> (String, Option<String>) {
    (caps[0].trim_end().to_string(), None)
}

/// Split rules in priority order. The first rule that matches decides.
static UNIT_RULES: LazyLock<Vec<UnitRule>> = LazyLock::new(|| {
    vec![
        // "13.5 g/dL"
        UnitRule {
            regex: Regex::new(&format!(r"(\d+\.?\d*)\s*({UNIT_ALTERNATION})")).unwrap(),
            extract: value_and_unit,
        },
        // "7.2 [H] mg/dL": flag marker between number and unit
        UnitRule {
            regex: Regex::new(&format!(r"(\d+\.?\d*)\s*\[?[HL]?\]?\s*({UNIT_ALTERNATION})"))
                .unwrap(),
            extract: value_and_unit,
        },
        // "42", "11.5 [H]": number with optional flag, no unit
        UnitRule {
            regex: Regex::new(r"(\d+\.?\d*)\s*\[?[HL]?\]?").unwrap(),
            extract: bare_value,
        },
    ]
});

/// Separate the numeric value from its unit in a "value + unit" fragment.
///
/// Falls back to returning `text` unchanged with no unit when nothing numeric
/// is present.
pub fn split_value_unit(text: &str) -> (String, Option<String>) {
    UNIT_RULES
        .iter()
        .find_map(|rule| rule.regex.captures(text).map(|caps| (rule.extract)(&caps)))
        .unwrap_or_else(|| (text.to_string(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> (String, Option<String>) {
        split_value_unit(text)
    }

    #[test]
    fn value_with_unit() {
        assert_eq!(split("13.5 g/dL"), ("13.5".into(), Some("g/dL".into())));
    }

    #[test]
    fn flagged_value_with_unit() {
        assert_eq!(split("7.2 [H] mg/dL"), ("7.2".into(), Some("mg/dL".into())));
        assert_eq!(split("3.1 L U/L"), ("3.1".into(), Some("U/L".into())));
    }

    #[test]
    fn bare_number() {
        assert_eq!(split("42"), ("42".into(), None));
    }

    #[test]
    fn bare_number_keeps_flag_marker() {
        assert_eq!(split("11.5 [H]"), ("11.5 [H]".into(), None));
    }

    #[test]
    fn non_numeric_text_is_returned_unchanged() {
        assert_eq!(split("Negative"), ("Negative".into(), None));
        assert_eq!(split(""), (String::new(), None));
    }

    #[test]
    fn unit_without_space() {
        assert_eq!(split("98%"), ("98".into(), Some("%".into())));
        assert_eq!(split("4.5mill/cumm"), ("4.5".into(), Some("mill/cumm".into())));
    }

    #[test]
    fn count_units() {
        assert_eq!(split("7500 /cumm"), ("7500".into(), Some("/cumm".into())));
        assert_eq!(split("250000 /mm3"), ("250000".into(), Some("/mm3".into())));
    }

    #[test]
    fn milli_units() {
        assert_eq!(split("2.4 mIU/L"), ("2.4".into(), Some("mIU/L".into())));
        assert_eq!(split("0.8 mg/L"), ("0.8".into(), Some("mg/L".into())));
    }

    #[test]
    fn earlier_alternative_wins_on_shared_prefix() {
        // `pg` precedes `pgm` in the token list.
        assert_eq!(split("29 pgm"), ("29".into(), Some("pg".into())));
    }

    #[test]
    fn unknown_unit_falls_back_to_bare_value() {
        assert_eq!(split("5.4 mmol/L"), ("5.4".into(), None));
    }
}
