// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batched selection builders.
//!
//! A batch is an ordered list of slots. `select*` appends a slot with the
//! default page descriptor; `with_page_size` and `with_page_start_cursor`
//! rewrite the descriptor of the slot added last. Using either before any
//! slot exists leaves the chain intact and makes [`QueryBatch::execute`]
//! fail with [`Error::IllegalState`].

use std::fmt;

use flock_proto::{
    Cursor, Direction, EdgeQuery, FlockEndpoint, GraphId, NodeId, Page, QueryTerm, SelectQuery,
};

use crate::cursor::{Edges, NodeIds, PageKind, Paged};
use crate::error::{Error, Result};
use crate::selection::SelectionQuery;

/// Ordered batch of paged queries, submitted in one round trip.
pub struct QueryBatch<'a, E: ?Sized, K: PageKind> {
    endpoint: &'a E,
    queries: Vec<K::Query>,
    misuse: Option<&'static str>,
}

/// Batch of node-id selections.
pub type SelectionBuilder<'a, E> = QueryBatch<'a, E, NodeIds>;
/// Batch of edge selections.
pub type EdgeSelectionBuilder<'a, E> = QueryBatch<'a, E, Edges>;

impl<'a, E: FlockEndpoint + ?Sized, K: PageKind> QueryBatch<'a, E, K> {
    /// Empty batch against `endpoint`.
    pub fn new(endpoint: &'a E) -> Self {
        Self {
            endpoint,
            queries: Vec::new(),
            misuse: None,
        }
    }

    /// Limit the page size of the most recently added slot.
    pub fn with_page_size(self, count: i32) -> Self {
        self.update_last_page(
            "with_page_size called before any query was added",
            |page| page.with_count(count),
        )
    }

    /// Start the most recently added slot at `cursor`.
    pub fn with_page_start_cursor(self, cursor: Cursor) -> Self {
        self.update_last_page(
            "with_page_start_cursor called before any query was added",
            |page| page.with_cursor(cursor),
        )
    }

    /// Slots in submission order.
    pub fn queries(&self) -> &[K::Query] {
        &self.queries
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// `true` when no slot was added.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Submit every slot in one round trip.
    ///
    /// Returns one cursor per slot, in slot order. The batch is left as is
    /// and may be executed again.
    pub fn execute(&self) -> Result<Vec<Paged<'a, E, K>>> {
        if let Some(misuse) = self.misuse {
            return Err(Error::IllegalState(misuse));
        }
        let pages = K::fetch(self.endpoint, &self.queries)?;
        Ok(self
            .queries
            .iter()
            .cloned()
            .zip(pages)
            .map(|(query, contents)| Paged::new(self.endpoint, query, contents))
            .collect())
    }

    fn push(mut self, query: K::Query) -> Self {
        self.queries.push(query);
        self
    }

    fn update_last_page(mut self, misuse: &'static str, update: impl FnOnce(Page) -> Page) -> Self {
        match self.queries.last_mut() {
            Some(query) => {
                let page = update(K::page(query));
                K::set_page(query, page);
            }
            None => {
                self.misuse.get_or_insert(misuse);
            }
        }
        self
    }
}

impl<'a, E: FlockEndpoint + ?Sized> QueryBatch<'a, E, NodeIds> {
    /// Append a slot evaluating `query` from the first page.
    pub fn select(self, query: &SelectionQuery) -> Self {
        self.push(SelectQuery {
            operations: query.operations().to_vec(),
            page: Page::default(),
        })
    }
}

impl<'a, E: FlockEndpoint + ?Sized> QueryBatch<'a, E, Edges> {
    /// Append a slot listing the edges of `source_id`, optionally restricted
    /// to `destination_ids` (empty means unrestricted).
    pub fn select_edges(
        self,
        source_id: NodeId,
        graph_id: GraphId,
        direction: Direction,
        destination_ids: &[NodeId],
    ) -> Self {
        self.select_term(
            QueryTerm::new(source_id, graph_id, direction).with_destinations(destination_ids),
        )
    }

    /// Append a slot for a prepared term.
    pub fn select_term(self, term: QueryTerm) -> Self {
        self.push(EdgeQuery {
            term,
            page: Page::default(),
        })
    }
}

impl<'a, E: ?Sized, K: PageKind> fmt::Debug for QueryBatch<'a, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBatch")
            .field("queries", &self.queries)
            .field("misuse", &self.misuse)
            .finish_non_exhaustive()
    }
}
