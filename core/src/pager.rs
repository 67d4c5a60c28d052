//! Pagination state and the lazy record stream.
//!
//! # Design
//! `PageState` advances a cursor/offset after each page and decides
//! exhaustion per the configured style. `RecordStream` is a pull-based
//! iterator: consuming it triggers one network call per page, it buffers at
//! most one page of records, and it may be abandoned at any point — the
//! transport returns fully buffered responses, so dropping the stream
//! releases everything. The stream is forward-only and non-restartable;
//! after an error it yields nothing further.

use std::collections::VecDeque;

use crate::client::RestClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::query::{Cursor, QuerySpec};
use crate::record::Record;
use crate::response::PageMeta;
use crate::schema::PaginationStyle;

/// Mutable position within one paged fetch-many. Created when the fetch
/// begins, discarded when the caller stops consuming.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    cursor: Option<Cursor>,
    position: u64,
    seen: u64,
    exhausted: bool,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a fetch whose base query is already positioned. An offset
    /// cursor seeds the absolute position so advancing continues from there
    /// instead of rewinding to zero; a token cursor needs no seeding, the
    /// base query itself carries it into the first fetch.
    pub fn starting_at(cursor: Option<&Cursor>) -> Self {
        let mut state = Self::default();
        if let Some(Cursor::Offset(offset)) = cursor {
            state.position = *offset;
        }
        state
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fold one page's metadata into the state.
    ///
    /// Offset-limit exhausts on a short page (or any empty page when no
    /// page size was requested), or when a reported total count has been
    /// reached. Cursor-token exhausts when the server sends no next token.
    pub fn advance(&mut self, page: &PageMeta, style: &PaginationStyle, page_size: Option<u64>) {
        self.seen += page.returned as u64;
        self.position += page.returned as u64;
        match style {
            PaginationStyle::OffsetLimit { .. } => {
                let short_page = match page_size {
                    Some(size) => (page.returned as u64) < size,
                    None => page.returned == 0,
                };
                let total_reached = page
                    .total_count
                    .is_some_and(|total| self.position >= total);
                if short_page || total_reached {
                    self.exhausted = true;
                } else {
                    self.cursor = Some(Cursor::Offset(self.position));
                }
            }
            PaginationStyle::CursorToken { .. } => match &page.next_token {
                Some(token) => self.cursor = Some(Cursor::Token(token.clone())),
                None => self.exhausted = true,
            },
        }
    }
}

/// A single logical, lazily produced sequence of records spanning pages.
pub struct RecordStream<'a, T: Transport> {
    client: &'a RestClient<T>,
    base: QuerySpec,
    state: PageState,
    buffer: VecDeque<Record>,
    top: Option<u64>,
    yielded: u64,
    failed: bool,
}

impl<'a, T: Transport> RecordStream<'a, T> {
    pub(crate) fn new(client: &'a RestClient<T>, base: QuerySpec) -> Self {
        let state = PageState::starting_at(base.cursor_value());
        Self {
            client,
            base,
            state,
            buffer: VecDeque::new(),
            top: None,
            yielded: 0,
            failed: false,
        }
    }

    /// Cap the total number of records yielded; page fetching stops as soon
    /// as the cap is reached.
    pub fn top(mut self, limit: u64) -> Self {
        self.top = Some(limit);
        self
    }
}

impl<T: Transport> Iterator for RecordStream<'_, T> {
    type Item = Result<Record, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.top.is_some_and(|top| self.yielded >= top) {
            return None;
        }
        loop {
            if let Some(record) = self.buffer.pop_front() {
                self.yielded += 1;
                return Some(Ok(record));
            }
            if self.state.exhausted() {
                return None;
            }
            let query = match self.state.cursor() {
                Some(cursor) => self.base.at_cursor(cursor.clone()),
                None => self.base.clone(),
            };
            match self.client.fetch_page(&query) {
                Ok((records, page)) => {
                    self.state.advance(
                        &page,
                        &self.client.schema().pagination,
                        self.base.page_size_value(),
                    );
                    if records.is_empty() {
                        if self.state.exhausted() {
                            return None;
                        }
                        continue;
                    }
                    self.buffer.extend(records);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
