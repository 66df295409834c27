//! Offset pagination over repeated query executions.
//!
//! # Design
//! `PageCursor` is the whole state machine and performs no I/O:
//!
//! ```text
//! Ready(offset) --fetch--> returned < requested  --> Exhausted
//!                          returned > requested  --> Exhausted (paging ignored)
//!                          returned == requested --> Ready(offset + returned)
//! ```
//!
//! A short page is the only end-of-data signal; server-reported totals are
//! never consulted. A page larger than requested means the endpoint ignored
//! the paging parameters and already returned everything. Resources that are
//! known to ignore paging get a single-page cursor up front.
//!
//! `Pages` (blocking) and `item_stream` (async) both drive a fresh cursor, so
//! concurrent iterations over one query never share state. `Collector` is the
//! bounded accumulation used by `get_all`.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::IfpaClient;
use crate::error::Error;
use crate::query::{Query, Resource};
use crate::transport::Transport;

/// Page size used by `get_all` when the query sets no limit.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Ready { offset: u32 },
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct PageCursor {
    state: PageState,
    page_size: u32,
    paged: bool,
}

impl PageCursor {
    /// Cursor for an endpoint that honours paging. A zero page size is
    /// treated as one.
    pub fn new(start_offset: u32, page_size: u32) -> Self {
        Self {
            state: PageState::Ready {
                offset: start_offset,
            },
            page_size: page_size.max(1),
            paged: true,
        }
    }

    /// Cursor for an endpoint that returns everything in one response.
    pub fn single_page() -> Self {
        Self {
            state: PageState::Ready { offset: 0 },
            page_size: u32::MAX,
            paged: false,
        }
    }

    pub fn for_query<R: Resource>(query: &Query<R>, page_size: u32) -> Self {
        if R::HONORS_PAGING {
            Self::new(query.page_offset().unwrap_or(0), page_size)
        } else {
            Self::single_page()
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == PageState::Exhausted
    }

    /// Query for the next page of `count` items, or `None` once exhausted.
    pub fn next_query<R: Resource>(&self, query: &Query<R>, count: u32) -> Option<Query<R>> {
        match self.state {
            PageState::Exhausted => None,
            PageState::Ready { .. } if !self.paged => Some(query.clone()),
            PageState::Ready { offset } => Some(query.page(offset, count)),
        }
    }

    /// Record a fetched page of `returned` items for a request of `requested`.
    pub fn advance(&mut self, requested: u32, returned: usize) -> PageState {
        self.state = match self.state {
            PageState::Exhausted => PageState::Exhausted,
            PageState::Ready { .. } if !self.paged => PageState::Exhausted,
            PageState::Ready { offset } => {
                let requested_len = requested as usize;
                if returned > requested_len {
                    warn!(
                        requested,
                        returned, "page larger than requested; treating paging as ignored"
                    );
                    PageState::Exhausted
                } else if returned < requested_len {
                    PageState::Exhausted
                } else {
                    match offset.checked_add(requested) {
                        Some(next) => PageState::Ready { offset: next },
                        None => PageState::Exhausted,
                    }
                }
            }
        };
        self.state
    }

    pub fn exhaust(&mut self) {
        self.state = PageState::Exhausted;
    }
}

/// Bounded accumulation for `get_all`.
///
/// Each request asks for at most one item more than the remaining budget, so
/// an overflow is detected without fetching an unbounded final page.
pub struct Collector<R: Resource> {
    query: Query<R>,
    cursor: PageCursor,
    max_results: usize,
    requested: u32,
    items: Vec<R::Item>,
}

impl<R: Resource> Collector<R> {
    pub fn new(query: &Query<R>, max_results: usize) -> Self {
        let page_size = query.page_limit().unwrap_or(DEFAULT_PAGE_SIZE);
        Self {
            query: query.clone(),
            cursor: PageCursor::for_query(query, page_size),
            max_results,
            requested: 0,
            items: Vec::new(),
        }
    }

    fn remaining(&self) -> usize {
        self.max_results.saturating_sub(self.items.len())
    }

    /// The next page to request, or `None` when collection is complete.
    pub fn next_query(&mut self) -> Option<Query<R>> {
        let budget = u32::try_from(self.remaining().saturating_add(1)).unwrap_or(u32::MAX);
        let count = self.cursor.page_size().min(budget);
        let next = self.cursor.next_query(&self.query, count)?;
        self.requested = count;
        Some(next)
    }

    /// Accept one fetched page.
    pub fn accept(&mut self, page: Vec<R::Item>) -> Result<(), Error> {
        if page.len() > self.remaining() {
            self.cursor.exhaust();
            return Err(Error::LimitExceeded {
                max_results: self.max_results,
                collected: self.items.len() + page.len(),
            });
        }
        self.cursor.advance(self.requested, page.len());
        self.items.extend(page);
        Ok(())
    }

    pub fn finish(self) -> Vec<R::Item> {
        self.items
    }
}

/// Lazy blocking iteration over every item matching a query.
///
/// Stops after the first error.
pub struct Pages<'c, R: Resource, T> {
    client: &'c IfpaClient<T>,
    query: Query<R>,
    cursor: PageCursor,
    buffer: VecDeque<R::Item>,
}

impl<'c, R: Resource, T: Transport> Pages<'c, R, T> {
    pub(crate) fn new(client: &'c IfpaClient<T>, query: &Query<R>, page_size: u32) -> Self {
        Self {
            client,
            query: query.clone(),
            cursor: PageCursor::for_query(query, page_size),
            buffer: VecDeque::new(),
        }
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }
}

impl<R: Resource, T: Transport> Iterator for Pages<'_, R, T> {
    type Item = Result<R::Item, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let page_size = self.cursor.page_size();
            let page_query = self.cursor.next_query(&self.query, page_size)?;
            match self.client.run(&page_query) {
                Ok(page) => {
                    let items = R::items(page);
                    self.cursor.advance(page_size, items.len());
                    self.buffer.extend(items);
                }
                Err(err) => {
                    self.cursor.exhaust();
                    return Some(Err(err));
                }
            }
        }
    }
}

struct StreamState<R: Resource> {
    query: Query<R>,
    cursor: PageCursor,
    buffer: VecDeque<R::Item>,
    cancel: CancellationToken,
}

/// Async counterpart of `Pages`.
///
/// `cancel` is checked before each page fetch and again when the fetch
/// completes; a page that lands after cancellation is discarded and the
/// stream ends. Items from pages delivered before cancellation still drain.
pub(crate) fn item_stream<'c, R, T>(
    client: &'c IfpaClient<T>,
    query: Query<R>,
    page_size: u32,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<R::Item, Error>> + 'c
where
    R: Resource,
    T: Transport,
{
    let state = StreamState {
        cursor: PageCursor::for_query(&query, page_size),
        query,
        buffer: VecDeque::new(),
        cancel,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Some((Ok(item), state));
            }
            if state.cancel.is_cancelled() {
                return None;
            }
            let page_size = state.cursor.page_size();
            let page_query = state.cursor.next_query(&state.query, page_size)?;
            match client.run_async(&page_query).await {
                Ok(_) if state.cancel.is_cancelled() => return None,
                Ok(page) => {
                    let items = R::items(page);
                    state.cursor.advance(page_size, items.len());
                    state.buffer.extend(items);
                }
                Err(err) => {
                    state.cursor.exhaust();
                    return Some((Err(err), state));
                }
            }
        }
    })
}
