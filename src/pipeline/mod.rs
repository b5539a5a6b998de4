//! The paginated-collection-to-record-table pipeline.
//!
//! ```text
//! walk (pages) -> dedupe (by id) -> enrich (chunked lookups) -> TableBuilder -> sink
//!                                                                    ^
//!                                   config_store (id lists between runs)
//! ```
//!
//! Nothing in here knows about the upstream API; the catalog module wires
//! these pieces to concrete endpoints.

pub mod config_store;
pub mod dedupe;
pub mod enrich;
pub mod page_walker;
pub mod sink;
pub mod table;

pub use dedupe::{dedupe, dedupe_ids};
pub use enrich::{enrich, Correlation, EnrichmentMap, Identified};
pub use page_walker::{walk, walk_all, CollectionPage, Cursor, PageWalker};
pub use sink::{to_flat_file, upsert, RowFailure, SinkError, UpsertReport, UpsertSpec};
pub use table::{Record, Schema, SortKey, Table, TableBuilder, Value};
