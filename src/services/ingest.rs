use std::collections::HashSet;

use bytes::Bytes;
use reqwest::Client;

use crate::error::AppError;
use crate::services::analysis::types::{CellValue, Dataset, Row};

/// Download delimited text from a URL, bounded by the configured upload cap.
pub async fn fetch_text(url: &str, max_bytes: usize) -> Result<String, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("failed to fetch source: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::Fetch(format!(
            "failed to fetch source, status {}",
            response.status()
        )));
    }

    let body: Bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::Fetch(format!("failed to read response body: {e}")))?;

    if body.len() > max_bytes {
        return Err(AppError::InvalidInput(format!(
            "source exceeds the {max_bytes} byte limit"
        )));
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Guess the delimiter from the header line by taking the most frequent of
/// comma, semicolon, and tab. Bytes inside double quotes are skipped so a
/// quoted field like `"a,b"` does not skew the count. Comma wins ties.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let candidates = [b',', b';', b'\t'];
    let mut counts = [0usize; 3];
    let mut in_quotes = false;
    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(slot) = candidates.iter().position(|&c| c == byte) {
                counts[slot] += 1;
            }
        }
    }

    let mut best = b',';
    let mut best_count = 0usize;
    for (candidate, count) in candidates.into_iter().zip(counts) {
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Header names stay verbatim, except blank headers become `col_{index}`
/// and duplicates get a numeric suffix so every column is addressable.
fn unique_headers<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| {
            let base = name.trim();
            let base = if base.is_empty() {
                format!("col_{index}")
            } else {
                base.to_string()
            };
            let mut candidate = base.clone();
            let mut counter = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{counter}");
                counter += 1;
            }
            candidate
        })
        .collect()
}

/// Cell typing mirrors the classifier's predicate: blank fields are null,
/// fields whose whole trimmed content parses to a finite number are numbers,
/// everything else stays text.
fn parse_cell(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Null;
    }
    let trimmed = field.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            return CellValue::Number(number);
        }
    }
    CellValue::Text(field.to_string())
}

/// Parse delimited text into a dataset. Short rows pad with nulls, cells
/// beyond the header width drop, and entirely-empty rows are filtered out.
pub fn parse_delimited(text: &str, delimiter: Option<u8>) -> Result<Dataset, AppError> {
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(text));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::Parse(format!("failed to read header: {e}")))?;
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::InvalidInput(
            "source has no usable header row".to_string(),
        ));
    }
    let columns = unique_headers(headers.iter());

    let mut rows: Vec<Row> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), parse_cell(record.get(i).unwrap_or(""))))
            .collect();
        if row.values().all(CellValue::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(Dataset { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_semicolons_and_tabs() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        // A lone column defaults to comma.
        assert_eq!(sniff_delimiter("solo"), b',');
    }

    #[test]
    fn quoted_fields_do_not_skew_the_sniff() {
        assert_eq!(sniff_delimiter("\"a,b\";c\n1;2"), b';');
        let ds = parse_delimited("\"last, first\";age\n\"doe, jane\";30\n", None).unwrap();
        assert_eq!(ds.columns, vec!["last, first", "age"]);
        assert_eq!(ds.rows[0]["age"], CellValue::Number(30.0));
    }

    #[test]
    fn parses_typed_cells() {
        let ds = parse_delimited("name,age,score\nalice,30,9.5\nbob,,42abc\n", None).unwrap();
        assert_eq!(ds.columns, vec!["name", "age", "score"]);
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0]["age"], CellValue::Number(30.0));
        assert_eq!(ds.rows[0]["score"], CellValue::Number(9.5));
        assert_eq!(ds.rows[1]["age"], CellValue::Null);
        assert_eq!(ds.rows[1]["score"], CellValue::Text("42abc".to_string()));
    }

    #[test]
    fn blank_and_duplicate_headers_become_unique() {
        let ds = parse_delimited(",name,name\n1,a,b\n", None).unwrap();
        assert_eq!(ds.columns, vec!["col_0", "name", "name_1"]);
    }

    #[test]
    fn short_rows_pad_and_long_rows_clip() {
        let ds = parse_delimited("a,b\n1\n1,2,3\n", None).unwrap();
        assert_eq!(ds.rows[0]["b"], CellValue::Null);
        assert_eq!(ds.rows[1].len(), 2);
    }

    #[test]
    fn entirely_empty_rows_are_filtered() {
        let ds = parse_delimited("a,b\n,\n1,2\n", None).unwrap();
        assert_eq!(ds.rows.len(), 1);
    }

    #[test]
    fn explicit_delimiter_overrides_sniffing() {
        let ds = parse_delimited("a;b\n1;2\n", Some(b';')).unwrap();
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.rows[0]["b"], CellValue::Number(2.0));
    }

    #[test]
    fn header_only_input_is_an_empty_dataset() {
        let ds = parse_delimited("a,b\n", None).unwrap();
        assert!(ds.rows.is_empty());
        assert_eq!(ds.columns.len(), 2);
    }

    #[test]
    fn blank_header_row_is_rejected() {
        assert!(parse_delimited(",,\n1,2,3\n", None).is_err());
    }
}
