use indexmap::IndexMap;

use super::types::{limits, CellValue, FrequencyEntry};

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Display transform only: applied after tallying and sorting, so it never
/// affects counts, percentages, or rank order.
fn clip_label(label: String) -> String {
    if label.chars().count() > limits::LABEL_MAX_CHARS {
        let mut clipped: String = label.chars().take(limits::LABEL_MAX_CHARS).collect();
        clipped.push('…');
        clipped
    } else {
        label
    }
}

/// Ranked, size-limited frequency table over a column's non-empty values.
/// Percentages are computed against the whole column, so a truncated slice
/// reports the true share of each entry rather than renormalizing to 100.
pub fn project<'a>(
    values: impl IntoIterator<Item = &'a CellValue>,
    limit: usize,
) -> Vec<FrequencyEntry> {
    let mut tally: IndexMap<String, usize> = IndexMap::new();
    let mut total = 0usize;
    for cell in values {
        let Some(key) = cell.to_key() else { continue };
        total += 1;
        *tally.entry(key).or_insert(0) += 1;
    }

    // Stable sort over an insertion-ordered map: ties keep first-seen order.
    let mut entries: Vec<(String, usize)> = tally.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(limit);

    entries
        .into_iter()
        .map(|(label, count)| FrequencyEntry {
            label: clip_label(label),
            count,
            percentage: round1(100.0 * count as f64 / total as f64),
        })
        .collect()
}
