use serde::{Deserialize, Serialize};

use super::types::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Strict numeric coercion: a cell qualifies only when it already holds a
/// finite number, or when its entire trimmed text parses to one. A lenient
/// prefix parse would accept values like "42abc"; that is a correctness gap,
/// not a feature, so `str::parse::<f64>` (whole-string) is used instead.
/// Rust accepts "inf"/"NaN" spellings, hence the explicit finiteness filter.
pub fn numeric_value(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Null => None,
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) => None,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
    }
}

/// A column is NUMERIC when strictly more than half of its non-empty cells
/// coerce to a number (and at least one does); otherwise CATEGORICAL.
/// A column with no non-empty cells is CATEGORICAL.
pub fn classify<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> ColumnKind {
    let mut non_empty = 0usize;
    let mut numeric = 0usize;
    for cell in values {
        if cell.is_empty() {
            continue;
        }
        non_empty += 1;
        if numeric_value(cell).is_some() {
            numeric += 1;
        }
    }

    // Integer form of `numeric / non_empty > 0.5`; exact at the boundary.
    if numeric > 0 && numeric * 2 > non_empty {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn whole_string_parse_rejects_trailing_garbage() {
        assert_eq!(numeric_value(&text("42abc")), None);
        assert_eq!(numeric_value(&text("42")), Some(42.0));
        assert_eq!(numeric_value(&text(" 3.5 ")), Some(3.5));
        assert_eq!(numeric_value(&text("1e3")), Some(1000.0));
        assert_eq!(numeric_value(&text("")), None);
        assert_eq!(numeric_value(&CellValue::Null), None);
    }

    #[test]
    fn non_finite_values_never_qualify() {
        assert_eq!(numeric_value(&text("inf")), None);
        assert_eq!(numeric_value(&text("NaN")), None);
        assert_eq!(numeric_value(&CellValue::Number(f64::INFINITY)), None);
    }

    #[test]
    fn majority_numeric_classifies_numeric() {
        // 2/3 numeric is above the half mark.
        let values = vec![text("42abc"), text("7"), text("9")];
        assert_eq!(classify(&values), ColumnKind::Numeric);
    }

    #[test]
    fn exactly_half_numeric_classifies_categorical() {
        // 1/2 is not strictly greater than 0.5.
        let values = vec![text("42abc"), text("7")];
        assert_eq!(classify(&values), ColumnKind::Categorical);
    }

    #[test]
    fn empty_column_classifies_categorical() {
        let values: Vec<CellValue> = vec![CellValue::Null, text("")];
        assert_eq!(classify(&values), ColumnKind::Categorical);
        assert_eq!(
            classify(std::iter::empty::<&CellValue>()),
            ColumnKind::Categorical
        );
    }

    #[test]
    fn mixed_representations_all_count_numeric() {
        let values = vec![text("5"), CellValue::Number(5.0), text("5.0")];
        assert_eq!(classify(&values), ColumnKind::Numeric);
    }

    #[test]
    fn nulls_are_excluded_from_the_ratio() {
        // 1 numeric of 1 non-empty; the nulls must not dilute it.
        let values = vec![CellValue::Null, CellValue::Null, text("12")];
        assert_eq!(classify(&values), ColumnKind::Numeric);
    }

    fn cell_strategy() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Null),
            (-1.0e6f64..1.0e6).prop_map(CellValue::Number),
            "[a-z0-9]{0,6}".prop_map(CellValue::Text),
        ]
    }

    proptest! {
        #[test]
        fn classification_is_order_invariant(
            values in proptest::collection::vec(cell_strategy(), 0..40),
            pivot in 0usize..40,
        ) {
            let mut rotated = values.clone();
            let pivot = pivot.min(rotated.len());
            rotated.rotate_left(pivot);
            prop_assert_eq!(classify(&values), classify(&rotated));
        }
    }
}
