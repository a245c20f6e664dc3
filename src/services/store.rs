use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;

use crate::services::analysis::types::Dataset;

/// An analyzed dataset held for follow-up chart and insight requests.
/// Entries are immutable; a re-upload produces a fresh id.
#[derive(Debug)]
pub struct StoredDataset {
    pub id: String,
    pub name: String,
    pub dataset: Dataset,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DatasetStore {
    cache: Cache<String, Arc<StoredDataset>>,
}

impl DatasetStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn insert(&self, name: &str, dataset: Dataset) -> Arc<StoredDataset> {
        let created_at = Utc::now();
        let id = format!("ds_{}_{}", slug(name), created_at.timestamp_millis());
        let stored = Arc::new(StoredDataset {
            id: id.clone(),
            name: name.to_string(),
            dataset,
            created_at,
        });
        self.cache.insert(id, Arc::clone(&stored));
        stored
    }

    /// Missing, evicted, and expired entries all read as absent.
    pub fn get(&self, id: &str) -> Option<Arc<StoredDataset>> {
        self.cache.get(id)
    }
}

fn slug(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        "dataset".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_roundtrips() {
        let store = DatasetStore::new(8, Duration::from_secs(60));
        let stored = store.insert("Q1 Sales.csv", Dataset::default());
        assert!(stored.id.starts_with("ds_q1_sales_csv_"));
        let fetched = store.get(&stored.id).expect("entry present");
        assert_eq!(fetched.name, "Q1 Sales.csv");
    }

    #[test]
    fn unknown_id_is_absent() {
        let store = DatasetStore::new(8, Duration::from_secs(60));
        assert!(store.get("ds_missing_0").is_none());
    }

    #[test]
    fn awkward_names_still_slug() {
        assert_eq!(slug("  !!  "), "______");
        assert_eq!(slug(""), "dataset");
    }
}
