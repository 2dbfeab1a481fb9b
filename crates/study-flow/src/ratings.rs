//! Response aggregation.
//!
//! Ratings live in a two-level map keyed by dependent-variable id, then by
//! category key. Insertion order is kept so the encoded payload lists buckets
//! in assignment order and cells in the order they were answered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ratings for one dependent variable, keyed by category key.
pub type CategoryRatings = IndexMap<String, i64>;

/// Nested rating map: DV id → category key → rating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingMap(IndexMap<String, CategoryRatings>);

impl RatingMap {
    /// Creates an empty bucket for every DV id.
    pub fn with_buckets<I, S>(dv_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            dv_ids
                .into_iter()
                .map(|id| (id.into(), CategoryRatings::new()))
                .collect(),
        )
    }

    /// Returns a new map whose `dv_id` bucket is a copy of the old one with
    /// `category_key` added or overwritten. Every other bucket is shared as is.
    pub fn merge(&self, dv_id: &str, category_key: &str, value: i64) -> RatingMap {
        let mut next = self.clone();
        next.0
            .entry(dv_id.to_string())
            .or_default()
            .insert(category_key.to_string(), value);
        next
    }

    /// [`RatingMap::merge`] applied to several cells of one bucket.
    pub fn merge_all<'a, I>(&self, dv_id: &str, cells: I) -> RatingMap
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut next = self.clone();
        let bucket = next.0.entry(dv_id.to_string()).or_default();
        for (key, value) in cells {
            bucket.insert(key.to_string(), value);
        }
        next
    }

    /// Rating of one cell.
    pub fn get(&self, dv_id: &str, category_key: &str) -> Option<i64> {
        self.0.get(dv_id)?.get(category_key).copied()
    }

    /// All ratings for `dv_id`.
    pub fn bucket(&self, dv_id: &str) -> Option<&CategoryRatings> {
        self.0.get(dv_id)
    }

    /// Bucket ids in insertion order.
    pub fn dv_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Total number of rated cells across all buckets.
    pub fn cell_count(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    /// Whether every `(dv, category)` pair has a value.
    pub fn covers<'a>(
        &self,
        dv_ids: impl IntoIterator<Item = &'a str>,
        category_keys: &[&str],
    ) -> bool {
        dv_ids.into_iter().all(|dv| {
            self.0
                .get(dv)
                .map(|bucket| category_keys.iter().all(|key| bucket.contains_key(*key)))
                .unwrap_or(false)
        })
    }
}

/// Everything a participant has answered, in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    /// Nested ratings.
    pub ratings: RatingMap,
    /// Open-ended answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_response: Option<String>,
    /// Age as entered, trimmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    /// Selected gender option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl ResponseRecord {
    /// Record with `ratings` and no scalar answers.
    pub fn new(ratings: RatingMap) -> Self {
        Self {
            ratings,
            ..Self::default()
        }
    }

    /// Merges one rating.
    pub fn record_rating(&mut self, dv_id: &str, category_key: &str, value: i64) {
        self.ratings = self.ratings.merge(dv_id, category_key, value);
    }

    /// Merges a whole block's ratings into one bucket.
    pub fn record_batch<'a, I>(&mut self, dv_id: &str, cells: I)
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        self.ratings = self.ratings.merge_all(dv_id, cells);
    }

    /// Stores the open-ended answer.
    pub fn record_free_response(&mut self, text: impl Into<String>) {
        self.free_response = Some(text.into());
    }

    /// Stores age and gender.
    pub fn record_demographics(&mut self, age: impl Into<String>, gender: impl Into<String>) {
        self.age = Some(age.into());
        self.gender = Some(gender.into());
    }
}
