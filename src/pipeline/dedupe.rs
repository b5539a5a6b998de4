//! First-seen deduplication by primary key.

use std::collections::HashSet;
use std::hash::Hash;

/// Keep the first occurrence of every distinct key, in input order.
///
/// `key_fn` returns `None` for items whose underlying entity is absent (for
/// example a playlist slot whose track has been pulled from the catalog);
/// those items are dropped without error.
pub fn dedupe<T, K, I, F>(items: I, mut key_fn: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
    F: FnMut(&T) -> Option<K>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match key_fn(item) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect()
}

/// Deduplicate a list of ids, keeping first-seen order.
pub fn dedupe_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    dedupe(ids.into_iter().map(Into::into), |id: &String| {
        Some(id.clone())
    })
}
