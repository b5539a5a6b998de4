//! Chunked secondary lookups joined back onto a base id list.
//!
//! Batched lookup endpoints cap how many ids a single request may carry, so
//! the base list is split into consecutive chunks and each chunk is looked up
//! with one call. Every requested id ends up with exactly one entry in the
//! result; ids the lookup could not resolve map to `None`, which the table
//! layer turns into an all-null enrichment row.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use tracing::debug;

/// How lookup results are matched to the ids that were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correlation {
    /// Each result carries its own id. Results without an id, or with an id
    /// that was not requested, are dropped.
    #[default]
    ById,
    /// Result `i` of a chunk belongs to requested id `i` of that chunk. For
    /// endpoints that answer a miss with a bare `null` and no id. Missing
    /// trailing results count as misses, surplus results are dropped.
    Positional,
}

/// A lookup result that knows which id it describes.
pub trait Identified {
    fn id(&self) -> Option<&str>;
}

/// Result of [`enrich`]: one entry per requested id, in request order.
#[derive(Debug, Clone)]
pub struct EnrichmentMap<R> {
    order: Vec<String>,
    entries: HashMap<String, Option<R>>,
    lookup_calls: usize,
}

impl<R> EnrichmentMap<R> {
    /// The enrichment for `id`, or `None` when it was a miss or never requested.
    pub fn get(&self, id: &str) -> Option<&R> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    /// `Some(None)` for a requested id that missed, `None` for an unknown id.
    pub fn entry(&self, id: &str) -> Option<Option<&R>> {
        self.entries.get(id).map(Option::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of ids that received an enrichment record.
    pub fn hits(&self) -> usize {
        self.entries.values().filter(|r| r.is_some()).count()
    }

    /// Number of calls made to the lookup function.
    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&R>)> {
        self.order
            .iter()
            .map(|id| (id.as_str(), self.entries.get(id).and_then(Option::as_ref)))
    }
}

/// Split `base_ids` into chunks of at most `chunk_size`, call `lookup` once per
/// chunk in order, and correlate the results back to the requested ids.
///
/// Duplicate ids collapse into a single entry, so callers normally dedupe
/// first. The first lookup error aborts the enrichment and is returned as-is.
pub fn enrich<R, E, F>(
    base_ids: &[String],
    chunk_size: NonZeroUsize,
    correlation: Correlation,
    mut lookup: F,
) -> Result<EnrichmentMap<R>, E>
where
    R: Identified,
    F: FnMut(&[String]) -> Result<Vec<Option<R>>, E>,
{
    let mut order = Vec::with_capacity(base_ids.len());
    let mut entries: HashMap<String, Option<R>> = HashMap::with_capacity(base_ids.len());
    for id in base_ids {
        if !entries.contains_key(id) {
            entries.insert(id.clone(), None);
            order.push(id.clone());
        }
    }

    let mut lookup_calls = 0;
    for (chunk_index, chunk) in base_ids.chunks(chunk_size.get()).enumerate() {
        let results = lookup(chunk)?;
        lookup_calls += 1;
        debug!(
            "Lookup chunk {} requested {} ids, got {} results",
            chunk_index,
            chunk.len(),
            results.len()
        );

        match correlation {
            Correlation::ById => {
                for record in results.into_iter().flatten() {
                    let Some(id) = record.id().map(str::to_string) else {
                        continue;
                    };
                    if !chunk.contains(&id) {
                        continue;
                    }
                    if let Some(slot) = entries.get_mut(&id) {
                        if slot.is_none() {
                            *slot = Some(record);
                        }
                    }
                }
            }
            Correlation::Positional => {
                for (id, record) in chunk.iter().zip(results) {
                    if let (Some(record), Some(slot)) = (record, entries.get_mut(id)) {
                        if slot.is_none() {
                            *slot = Some(record);
                        }
                    }
                }
            }
        }
    }

    Ok(EnrichmentMap {
        order,
        entries,
        lookup_calls,
    })
}
