use smallvec::smallvec;

use super::types::{limits, ChartKind, ChartSpec, DatasetProfile};

/// One planning rule: inspects the profile, proposes zero or more specs.
type Rule = fn(&DatasetProfile) -> Vec<ChartSpec>;

/// Precedence is the order of this table; truncation to the spec cap keeps
/// earlier rules' output first.
const RULES: [Rule; 4] = [pie_rule, bar_rule, line_rule, comparison_rule];

/// Propose a bounded, ordered chart plan for a dataset profile. Pure and
/// deterministic, so the plan can be recomputed on demand instead of stored.
pub fn plan(profile: &DatasetProfile) -> Vec<ChartSpec> {
    let mut specs = Vec::new();
    for rule in RULES {
        specs.extend(rule(profile));
        if specs.len() >= limits::MAX_CHART_SPECS {
            break;
        }
    }
    specs.truncate(limits::MAX_CHART_SPECS);
    specs
}

fn pie_rule(profile: &DatasetProfile) -> Vec<ChartSpec> {
    profile
        .categorical_columns()
        .filter(|(_, categorical)| {
            (limits::MIN_CHART_CATEGORIES..=limits::PIE_MAX_CATEGORIES)
                .contains(&categorical.unique_count)
        })
        .map(|(name, categorical)| {
            ChartSpec::new(
                ChartKind::Pie,
                [name.clone()],
                format!("Distribution of {name}"),
                format!(
                    "Share of records across {} {name} categories",
                    categorical.unique_count
                ),
            )
        })
        .collect()
}

fn bar_rule(profile: &DatasetProfile) -> Vec<ChartSpec> {
    profile
        .categorical_columns()
        .filter(|(_, categorical)| {
            (limits::MIN_CHART_CATEGORIES..=limits::BAR_MAX_CATEGORIES)
                .contains(&categorical.unique_count)
        })
        .map(|(name, _)| {
            ChartSpec::new(
                ChartKind::Bar,
                [name.clone()],
                format!("{name} frequency"),
                format!("Occurrence counts for the most common {name} values"),
            )
        })
        .collect()
}

fn line_rule(profile: &DatasetProfile) -> Vec<ChartSpec> {
    let numeric = profile.numeric_columns();
    if numeric.len() < 2 {
        return Vec::new();
    }
    let tracked: Vec<String> = numeric
        .iter()
        .take(limits::LINE_MAX_COLUMNS)
        .map(|name| name.to_string())
        .collect();
    vec![ChartSpec::new(
        ChartKind::Line,
        tracked.clone(),
        format!("Trend of {}", tracked.join(", ")),
        "Row-by-row values for the leading numeric columns".to_string(),
    )]
}

fn comparison_rule(profile: &DatasetProfile) -> Vec<ChartSpec> {
    let numeric = profile.numeric_columns();
    if numeric.len() < 2 {
        return Vec::new();
    }
    let (a, b) = (numeric[0].to_string(), numeric[1].to_string());
    vec![ChartSpec {
        kind: ChartKind::Comparison,
        title: format!("{a} vs {b}"),
        description: format!("Paired values from rows where both {a} and {b} are present"),
        columns: smallvec![a, b],
    }]
}
