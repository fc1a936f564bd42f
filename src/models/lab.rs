use serde::{Deserialize, Serialize};

use crate::pipeline::labs::range::evaluate_range;

/// One lab-test row recovered from a report.
///
/// Optional fields serialize as `null`, never skipped: clients rely on every
/// key being present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTest {
    pub test_name: String,
    /// Numeric text as printed, possibly with a flag marker such as `[H]`.
    pub value: String,
    pub unit: Option<String>,
    pub bio_reference_range: Option<String>,
    /// `None` when the value or range could not be interpreted numerically.
    pub lab_test_out_of_range: Option<bool>,
}

impl LabTest {
    /// Build a record from a parsed candidate line.
    ///
    /// Returns `None` unless the name and value are non-empty and a reference
    /// range was found. This is the only place records are created, so every
    /// `LabTest` in a parse result carries a range.
    pub fn from_candidate(
        test_name: &str,
        value: &str,
        unit: Option<String>,
        bio_reference_range: Option<String>,
    ) -> Option<Self> {
        let test_name = test_name.trim();
        if test_name.is_empty() || value.is_empty() {
            return None;
        }
        let range = bio_reference_range?;

        let lab_test_out_of_range = evaluate_range(value, &range).as_flag();

        Some(Self {
            test_name: test_name.to_string(),
            value: value.to_string(),
            unit,
            bio_reference_range: Some(range),
            lab_test_out_of_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_without_range_is_rejected() {
        assert!(LabTest::from_candidate("Hemoglobin", "13.5", Some("g/dL".into()), None).is_none());
    }

    #[test]
    fn candidate_without_name_or_value_is_rejected() {
        let range = Some("12.0 - 15.5".to_string());
        assert!(LabTest::from_candidate("  ", "13.5", None, range.clone()).is_none());
        assert!(LabTest::from_candidate("Hemoglobin", "", None, range).is_none());
    }

    #[test]
    fn candidate_computes_out_of_range_flag() {
        let test = LabTest::from_candidate(
            "Glucose",
            "180",
            Some("mg/dL".into()),
            Some("70 - 110".into()),
        )
        .unwrap();
        assert_eq!(test.lab_test_out_of_range, Some(true));
    }

    #[test]
    fn undetermined_range_leaves_flag_empty() {
        let test = LabTest::from_candidate("Culture", "abc", None, Some("1 - 2".into())).unwrap();
        assert_eq!(test.lab_test_out_of_range, None);
    }

    #[test]
    fn serializes_every_key_including_nulls() {
        let test = LabTest {
            test_name: "MCV".into(),
            value: "88".into(),
            unit: None,
            bio_reference_range: Some("80 - 100".into()),
            lab_test_out_of_range: None,
        };
        let json = serde_json::to_value(&test).unwrap();
        assert_eq!(json["test_name"], "MCV");
        assert_eq!(json["value"], "88");
        assert!(json["unit"].is_null());
        assert_eq!(json["bio_reference_range"], "80 - 100");
        assert!(json["lab_test_out_of_range"].is_null());
        assert_eq!(json.as_object().unwrap().len(), 5);
    }
}
