use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Engine limits. Chart rules and series builders read these rather than
/// carrying their own magic numbers.
pub mod limits {
    pub const SAMPLE_ROWS: usize = 3;
    pub const MAX_CHART_SPECS: usize = 6;
    pub const MIN_CHART_CATEGORIES: usize = 2;
    pub const PIE_MAX_CATEGORIES: usize = 15;
    pub const BAR_MAX_CATEGORIES: usize = 20;
    pub const PIE_SLICE_LIMIT: usize = 8;
    pub const BAR_SLICE_LIMIT: usize = 10;
    pub const DEFAULT_FREQUENCY_LIMIT: usize = 10;
    pub const LINE_MAX_ROWS: usize = 50;
    pub const LINE_MAX_COLUMNS: usize = 3;
    pub const COMPARISON_MAX_ROWS: usize = 100;
    pub const LABEL_MAX_CHARS: usize = 20;
}

/// One row/column intersection. Cells arrive dynamically typed from the
/// delimited source: absent/blank, a number, or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Null cells and empty strings both count as missing.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.is_empty(),
        }
    }

    /// Stringified tally key for a non-empty cell. Numbers render through
    /// `Display`, so numeric `5` and the string `"5"` share one key.
    pub fn to_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(s) if s.is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
        }
    }
}

/// Insertion-ordered so rows echo the header order of the source.
pub type Row = IndexMap<String, CellValue>;

/// Immutable once loaded; a re-upload replaces the whole dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Cells of one column in row order. Rows missing the key are treated
    /// as holding null, so ragged input degrades instead of failing.
    pub fn column_cells<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows.iter().filter_map(move |row| row.get(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericProfile {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalProfile {
    pub unique_count: usize,
    /// Highest-count value, ties broken by first encounter. Absent when the
    /// column has no non-empty values.
    pub most_common: Option<(String, usize)>,
    pub distribution: IndexMap<String, usize>,
    pub total: usize,
}

/// Exactly one variant per column, decided by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnProfile {
    Numeric(NumericProfile),
    Categorical(CategoricalProfile),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProfile {
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: IndexMap<String, ColumnProfile>,
}

impl DatasetProfile {
    /// Numeric column names in profile order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, profile)| matches!(profile, ColumnProfile::Numeric(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn categorical_columns(&self) -> impl Iterator<Item = (&String, &CategoricalProfile)> {
        self.columns.iter().filter_map(|(name, profile)| match profile {
            ColumnProfile::Categorical(categorical) => Some((name, categorical)),
            ColumnProfile::Numeric(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
    Line,
    Comparison,
}

/// A recommended visualization, independent of any rendering technology.
/// Produced fresh from a profile on every request; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub columns: SmallVec<[String; limits::LINE_MAX_COLUMNS]>,
    pub title: String,
    pub description: String,
}

impl ChartSpec {
    pub fn new(
        kind: ChartKind,
        columns: impl IntoIterator<Item = String>,
        title: String,
        description: String,
    ) -> Self {
        Self {
            kind,
            columns: columns.into_iter().collect(),
            title,
            description,
        }
    }
}

/// One ranked frequency entry. `percentage` is relative to every non-empty
/// value in the column, not the truncated slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// One indexed point of a line or comparison series. Line points may be
/// sparse; comparison points always carry both tracked columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub index: usize,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

/// Realized data for one chart spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartSeries {
    Frequency(Vec<FrequencyEntry>),
    Points(Vec<SeriesPoint>),
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        match self {
            ChartSeries::Frequency(entries) => entries.len(),
            ChartSeries::Points(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
