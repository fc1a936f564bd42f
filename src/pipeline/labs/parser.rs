use std::sync::LazyLock;

use regex::Regex;

use super::units::split_value_unit;
use crate::models::LabTest;

/// Lines containing any of these (case-insensitive) are headers, footers or
/// demographics, never results.
const NON_DATA_MARKERS: [&str; 6] = [
    "report",
    "end of",
    "laboratory",
    "patient",
    "doctor",
    "sample",
];

/// Two numbers joined by "to" or "-", with at least one separator character
/// on each side of the joiner: `12.0 - 15.5`, `3.5 to 5.0`.
static REFERENCE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+[\s-]+(?:to|-)[\s-]+[\d.]+").unwrap());

/// Parse OCR text into lab-test records, in line order.
///
/// A record comes from a `name: value [unit]` line whose reference range is
/// either the following line or embedded in the value text. Lines that do
/// not fit are skipped silently. Same name twice means two records.
pub fn parse_report(text: &str) -> Vec<LabTest> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut candidates = 0usize;
    let mut tests = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if is_non_data_line(line) {
            continue;
        }

        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        candidates += 1;

        if let Some(test) = parse_candidate(name, rest, lines.get(i + 1).copied()) {
            tests.push(test);
        }
    }

    tracing::debug!(
        lines = lines.len(),
        candidates,
        records = tests.len(),
        "Lab report parsed"
    );

    tests
}

fn is_non_data_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    NON_DATA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Assemble one record from the two halves of a colon line.
///
/// The next line wins as the reference range when it looks like one;
/// otherwise a range embedded in the value text is cut out of it.
fn parse_candidate(name: &str, rest: &str, next_line: Option<&str>) -> Option<LabTest> {
    let test_name = name.trim();
    let mut value_unit = rest.trim().to_string();

    let reference_range = match next_line {
        Some(next) if REFERENCE_RANGE.is_match(next) => Some(next.trim().to_string()),
        _ => match REFERENCE_RANGE.find(&value_unit) {
            Some(found) => {
                let range = found.as_str().to_string();
                value_unit = value_unit.replace(&range, "").trim().to_string();
                Some(range)
            }
            None => None,
        },
    };

    let (value, unit) = split_value_unit(&value_unit);
    LabTest::from_candidate(test_name, &value, unit, reference_range)
}
