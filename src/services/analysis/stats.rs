use indexmap::IndexMap;
use rayon::prelude::*;

use super::classify::{classify, numeric_value, ColumnKind};
use super::types::{
    CategoricalProfile, CellValue, ColumnProfile, Dataset, DatasetProfile, NumericProfile,
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Descriptive statistics over the numeric-qualifying cells of a column.
/// The classifier guarantees at least one such cell before this runs, but
/// an empty input still degrades to a zeroed profile rather than panicking.
pub fn summarize_numeric<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> NumericProfile {
    let mut numbers: Vec<f64> = values.into_iter().filter_map(numeric_value).collect();
    if numbers.is_empty() {
        return NumericProfile {
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            sum: 0.0,
            count: 0,
        };
    }

    numbers.sort_by(|a, b| a.total_cmp(b));
    let count = numbers.len();
    let sum: f64 = numbers.iter().sum();
    let median = if count % 2 == 0 {
        (numbers[count / 2 - 1] + numbers[count / 2]) / 2.0
    } else {
        numbers[count / 2]
    };

    // Intermediate math stays full precision; only the report rounds.
    NumericProfile {
        mean: round2(sum / count as f64),
        median: round2(median),
        min: round2(numbers[0]),
        max: round2(numbers[count - 1]),
        sum: round2(sum),
        count,
    }
}

/// Frequency distribution over the non-empty cells of a column. The tally
/// map is insertion-ordered, so `most_common` ties resolve to the value
/// seen first.
pub fn summarize_categorical<'a>(
    values: impl IntoIterator<Item = &'a CellValue>,
) -> CategoricalProfile {
    let mut distribution: IndexMap<String, usize> = IndexMap::new();
    let mut total = 0usize;
    for cell in values {
        let Some(key) = cell.to_key() else { continue };
        total += 1;
        *distribution.entry(key).or_insert(0) += 1;
    }

    let mut most_common: Option<(String, usize)> = None;
    for (key, &count) in &distribution {
        match &most_common {
            Some((_, best)) if count <= *best => {}
            _ => most_common = Some((key.clone(), count)),
        }
    }

    CategoricalProfile {
        unique_count: distribution.len(),
        most_common,
        distribution,
        total,
    }
}

/// Classify one column and produce the matching profile variant.
pub fn profile_column(values: &[&CellValue]) -> ColumnProfile {
    match classify(values.iter().copied()) {
        ColumnKind::Numeric => ColumnProfile::Numeric(summarize_numeric(values.iter().copied())),
        ColumnKind::Categorical => {
            ColumnProfile::Categorical(summarize_categorical(values.iter().copied()))
        }
    }
}

/// Profile every column of a dataset. Columns are independent, so they are
/// profiled in parallel; collection restores header order.
pub fn profile_dataset(dataset: &Dataset) -> DatasetProfile {
    if dataset.rows.is_empty() {
        return DatasetProfile::default();
    }

    let columns: Vec<(String, ColumnProfile)> = dataset
        .columns
        .par_iter()
        .map(|name| {
            let cells: Vec<&CellValue> = dataset.column_cells(name).collect();
            (name.clone(), profile_column(&cells))
        })
        .collect();

    DatasetProfile {
        total_rows: dataset.rows.len(),
        total_columns: dataset.columns.len(),
        columns: columns.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use crate::services::analysis::types::Row;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn dataset(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Dataset {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| columns.iter().cloned().zip(cells).collect())
            .collect();
        Dataset { columns, rows }
    }

    #[test]
    fn dept_salary_scenario() {
        let ds = dataset(
            &["dept", "salary"],
            vec![
                vec![text("eng"), num(100.0)],
                vec![text("eng"), num(200.0)],
                vec![text("sales"), num(50.0)],
            ],
        );
        let profile = profile_dataset(&ds);
        assert_eq!(profile.total_rows, 3);
        assert_eq!(profile.total_columns, 2);

        match &profile.columns["dept"] {
            ColumnProfile::Categorical(dept) => {
                assert_eq!(dept.unique_count, 2);
                assert_eq!(dept.most_common, Some(("eng".to_string(), 2)));
                assert_eq!(dept.total, 3);
            }
            other => panic!("dept should be categorical, got {other:?}"),
        }
        match &profile.columns["salary"] {
            ColumnProfile::Numeric(salary) => {
                assert_eq!(salary.mean, 116.67);
                assert_eq!(salary.median, 100.0);
                assert_eq!(salary.min, 50.0);
                assert_eq!(salary.max, 200.0);
                assert_eq!(salary.sum, 350.0);
                assert_eq!(salary.count, 3);
            }
            other => panic!("salary should be numeric, got {other:?}"),
        }
    }

    #[test]
    fn numeric_representations_collapse_into_one_summary() {
        let values = vec![text("5"), num(5.0), text("5.0")];
        let refs: Vec<&CellValue> = values.iter().collect();
        match profile_column(&refs) {
            ColumnProfile::Numeric(profile) => {
                assert_eq!(profile.median, 5.0);
                assert_eq!(profile.mean, 5.0);
                assert_eq!(profile.count, 3);
            }
            other => panic!("expected numeric, got {other:?}"),
        }
    }

    #[test]
    fn even_length_median_averages_the_middle_pair() {
        let values = vec![num(1.0), num(2.0), num(3.0), num(10.0)];
        let profile = summarize_numeric(&values);
        assert_eq!(profile.median, 2.5);
    }

    #[test]
    fn most_common_ties_keep_first_encountered() {
        let values = vec![text("b"), text("a"), text("a"), text("b")];
        let profile = summarize_categorical(&values);
        assert_eq!(profile.most_common, Some(("b".to_string(), 2)));
        assert_eq!(profile.unique_count, 2);
        assert_eq!(profile.total, 4);
    }

    #[test]
    fn numeric_and_text_cells_share_tally_keys() {
        let values = vec![num(5.0), text("5"), text("other")];
        let profile = summarize_categorical(&values);
        assert_eq!(profile.distribution["5"], 2);
        assert_eq!(profile.unique_count, 2);
    }

    #[test]
    fn empty_column_yields_empty_categorical_profile() {
        let values = vec![CellValue::Null, text("")];
        let profile = summarize_categorical(&values);
        assert_eq!(profile.unique_count, 0);
        assert_eq!(profile.most_common, None);
        assert_eq!(profile.total, 0);
        assert!(profile.distribution.is_empty());
    }

    #[test]
    fn empty_dataset_profiles_to_zeros() {
        let ds = dataset(&["a", "b"], vec![]);
        let profile = profile_dataset(&ds);
        assert_eq!(profile.total_rows, 0);
        assert_eq!(profile.total_columns, 0);
        assert!(profile.columns.is_empty());
    }

    #[test]
    fn ragged_rows_profile_from_whatever_parsed() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let full: Row = columns
            .iter()
            .cloned()
            .zip(vec![num(1.0), text("x")])
            .collect();
        let short: Row = [("a".to_string(), num(2.0))].into_iter().collect();
        let ds = Dataset {
            columns,
            rows: vec![full, short],
        };
        let profile = profile_dataset(&ds);
        match &profile.columns["b"] {
            ColumnProfile::Categorical(b) => assert_eq!(b.total, 1),
            other => panic!("expected categorical, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn numeric_summary_is_ordered(
            raw in proptest::collection::vec(-1.0e6f64..1.0e6, 1..60),
        ) {
            let cells: Vec<CellValue> = raw.iter().copied().map(CellValue::Number).collect();
            let profile = summarize_numeric(&cells);
            // Display rounding can nudge values by up to half a cent.
            let tol = 0.011;
            prop_assert!(profile.min <= profile.median + tol);
            prop_assert!(profile.median <= profile.max + tol);
            prop_assert!(profile.min <= profile.mean + tol);
            prop_assert!(profile.mean <= profile.max + tol);
        }
    }
}
