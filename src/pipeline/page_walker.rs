//! Cursor-driven pagination over a single collection endpoint.
//!
//! The walker is lazy: a page is only requested once every item of the
//! previous page has been consumed. It is also single-use; walking the same
//! collection again means building a new walker, which re-queries the API.

use std::iter::FusedIterator;
use std::mem;

use tracing::debug;

/// Opaque continuation marker returned by a paginated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a collection: its items and, if there is more, where to continue.
#[derive(Debug, Clone)]
pub struct CollectionPage<T> {
    pub items: Vec<T>,
    pub next: Option<Cursor>,
}

impl<T> CollectionPage<T> {
    pub fn new(items: Vec<T>, next: Option<Cursor>) -> Self {
        Self { items, next }
    }

    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

enum WalkState {
    Start,
    Next(Cursor),
    Done,
}

/// Iterator returned by [`walk`].
pub struct PageWalker<T, E, F> {
    fetch_page: F,
    buffer: std::vec::IntoIter<T>,
    state: WalkState,
    pages_fetched: usize,
    _error: std::marker::PhantomData<E>,
}

/// Walk a paginated collection, yielding every item of every page in order.
///
/// `fetch_page` is called with `None` for the first page and with the
/// previous page's cursor afterwards, until a page reports no cursor. An
/// error from `fetch_page` is yielded as-is and ends the walk.
pub fn walk<T, E, F>(fetch_page: F) -> PageWalker<T, E, F>
where
    F: FnMut(Option<&Cursor>) -> Result<CollectionPage<T>, E>,
{
    PageWalker {
        fetch_page,
        buffer: Vec::new().into_iter(),
        state: WalkState::Start,
        pages_fetched: 0,
        _error: std::marker::PhantomData,
    }
}

/// Walk the whole collection eagerly, stopping at the first error.
pub fn walk_all<T, E, F>(fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<&Cursor>) -> Result<CollectionPage<T>, E>,
{
    walk(fetch_page).collect()
}

impl<T, E, F> PageWalker<T, E, F> {
    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl<T, E, F> Iterator for PageWalker<T, E, F>
where
    F: FnMut(Option<&Cursor>) -> Result<CollectionPage<T>, E>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }

            let page = match mem::replace(&mut self.state, WalkState::Done) {
                WalkState::Done => return None,
                WalkState::Start => (self.fetch_page)(None),
                WalkState::Next(cursor) => (self.fetch_page)(Some(&cursor)),
            };

            match page {
                Ok(page) => {
                    self.pages_fetched += 1;
                    debug!(
                        "Fetched page {} with {} items (more: {})",
                        self.pages_fetched,
                        page.items.len(),
                        page.next.is_some()
                    );
                    self.buffer = page.items.into_iter();
                    if let Some(cursor) = page.next {
                        self.state = WalkState::Next(cursor);
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<T, E, F> FusedIterator for PageWalker<T, E, F> where
    F: FnMut(Option<&Cursor>) -> Result<CollectionPage<T>, E>
{
}
