use indexmap::IndexMap;

use super::classify::numeric_value;
use super::frequency;
use super::types::{limits, ChartKind, ChartSeries, ChartSpec, Dataset, SeriesPoint};

/// Realize one chart spec against the dataset. A spec whose columns no
/// longer match the dataset (a stale client replaying an old plan) yields
/// an empty series rather than an error.
pub fn build(dataset: &Dataset, spec: &ChartSpec) -> ChartSeries {
    match spec.kind {
        ChartKind::Pie => frequency_series(dataset, spec, limits::PIE_SLICE_LIMIT),
        ChartKind::Bar => frequency_series(dataset, spec, limits::BAR_SLICE_LIMIT),
        ChartKind::Line => ChartSeries::Points(line_points(dataset, &spec.columns)),
        ChartKind::Comparison => ChartSeries::Points(comparison_points(dataset, &spec.columns)),
    }
}

fn frequency_series(dataset: &Dataset, spec: &ChartSpec, limit: usize) -> ChartSeries {
    let entries = match spec.columns.first() {
        Some(column) => frequency::project(dataset.column_cells(column), limit),
        None => Vec::new(),
    };
    ChartSeries::Frequency(entries)
}

/// Points may be sparse: a row missing one tracked column still yields a
/// point carrying the columns that did parse. Index is the 1-based position
/// within the scanned slice.
fn line_points(dataset: &Dataset, columns: &[String]) -> Vec<SeriesPoint> {
    dataset
        .rows
        .iter()
        .take(limits::LINE_MAX_ROWS)
        .enumerate()
        .map(|(i, row)| {
            let mut values = IndexMap::new();
            for column in columns {
                if let Some(value) = row.get(column).and_then(numeric_value) {
                    values.insert(column.clone(), value);
                }
            }
            SeriesPoint {
                index: i + 1,
                values,
            }
        })
        .collect()
}

/// Rows where either column is missing or non-numeric are dropped whole.
/// Kept rows are renumbered sequentially, not by original position.
fn comparison_points(dataset: &Dataset, columns: &[String]) -> Vec<SeriesPoint> {
    let (Some(first), Some(second)) = (columns.first(), columns.get(1)) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    for row in dataset.rows.iter().take(limits::COMPARISON_MAX_ROWS) {
        let (Some(a), Some(b)) = (
            row.get(first).and_then(numeric_value),
            row.get(second).and_then(numeric_value),
        ) else {
            continue;
        };
        let mut values = IndexMap::new();
        values.insert(first.clone(), a);
        values.insert(second.clone(), b);
        points.push(SeriesPoint {
            index: points.len() + 1,
            values,
        });
    }
    points
}
