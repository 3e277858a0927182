//! Search and sort over small in-memory lists.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::models::{CreatureComment, FoodPost, Image, Note, Task};

/// Something a list panel can search and sort.
pub trait Listable {
    /// Text the search box matches against.
    fn label(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    DateAsc,
    #[default]
    DateDesc,
}

impl SortOrder {
    fn compare<T: Listable>(&self, a: &T, b: &T) -> Ordering {
        match self {
            SortOrder::NameAsc => compare_labels(a, b),
            SortOrder::NameDesc => compare_labels(b, a),
            SortOrder::DateAsc => a.created_at().cmp(&b.created_at()),
            SortOrder::DateDesc => b.created_at().cmp(&a.created_at()),
        }
    }
}

fn compare_labels<T: Listable>(a: &T, b: &T) -> Ordering {
    a.label().to_lowercase().cmp(&b.label().to_lowercase())
}

/// Query-string form of a list request: `?q=&sort=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ListQuery {
    pub fn apply<T: Listable + Clone>(&self, items: &[T]) -> Vec<T> {
        filter_and_sort(items, self.q.as_deref().unwrap_or(""), self.sort)
    }
}

/// Keep items whose label contains `query` (case-insensitive), then sort.
/// Items with equal sort keys keep their original relative order, and the
/// input is left untouched.
pub fn filter_and_sort<T: Listable + Clone>(items: &[T], query: &str, order: SortOrder) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    let mut kept: Vec<T> = items
        .iter()
        .filter(|item| needle.is_empty() || item.label().to_lowercase().contains(&needle))
        .cloned()
        .collect();
    // `sort_by` is stable.
    kept.sort_by(|a, b| order.compare(a, b));
    kept
}

macro_rules! listable {
    ($ty:ty, $field:ident) => {
        impl Listable for $ty {
            fn label(&self) -> &str {
                &self.$field
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
        }
    };
}

listable!(Task, title);
listable!(Note, title);
listable!(Image, name);
listable!(FoodPost, name);
listable!(CreatureComment, creature_name);
