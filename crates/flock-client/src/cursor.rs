// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Paged result cursors.
//!
//! A [`Paged`] value is one materialized page plus the query that produced
//! it. Moving to a neighbouring page copies that query, swaps in the
//! neighbour's cursor and issues it as a single-slot batch; the original
//! cursor is left untouched.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use flock_proto::{
    ids, Cursor, Edge, EdgeQuery, FlockEndpoint, NodeId, Page, SelectQuery,
};

use crate::error::{expect_pages, round_trip, Error, Result};

/// Result rows of one page together with its neighbour cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContents<T> {
    /// Rows in remote order.
    pub items: Vec<T>,
    /// Cursor of the following page; [`Page::END`] when there is none.
    pub next_cursor: Cursor,
    /// Cursor of the preceding page; [`Page::START`] when there is none.
    pub prev_cursor: Cursor,
}

/// What a paged query selects and how a batch of such queries is fetched.
///
/// Implemented by the marker types [`NodeIds`] and [`Edges`].
pub trait PageKind {
    /// One batch slot.
    type Query: Clone + fmt::Debug;
    /// One result row.
    type Item: Clone + fmt::Debug;

    /// Page descriptor of a slot.
    fn page(query: &Self::Query) -> Page;

    /// Replace the page descriptor of a slot.
    fn set_page(query: &mut Self::Query, page: Page);

    /// Issue `queries` in one round trip, one page per query in order.
    fn fetch<E: FlockEndpoint + ?Sized>(
        endpoint: &E,
        queries: &[Self::Query],
    ) -> Result<Vec<PageContents<Self::Item>>>;
}

/// Node-id selections (`select2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIds {}

impl PageKind for NodeIds {
    type Query = SelectQuery;
    type Item = NodeId;

    fn page(query: &SelectQuery) -> Page {
        query.page
    }

    fn set_page(query: &mut SelectQuery, page: Page) {
        query.page = page;
    }

    fn fetch<E: FlockEndpoint + ?Sized>(
        endpoint: &E,
        queries: &[SelectQuery],
    ) -> Result<Vec<PageContents<NodeId>>> {
        let results = round_trip("select2", queries.len(), || endpoint.select2(queries))?;
        expect_pages(queries.len(), &results)?;
        results
            .into_iter()
            .map(|r| -> Result<PageContents<NodeId>> {
                Ok(PageContents {
                    items: ids::decode(&r.ids)?,
                    next_cursor: r.next_cursor,
                    prev_cursor: r.prev_cursor,
                })
            })
            .collect()
    }
}

/// Edge selections (`select_edges`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edges {}

impl PageKind for Edges {
    type Query = EdgeQuery;
    type Item = Edge;

    fn page(query: &EdgeQuery) -> Page {
        query.page
    }

    fn set_page(query: &mut EdgeQuery, page: Page) {
        query.page = page;
    }

    fn fetch<E: FlockEndpoint + ?Sized>(
        endpoint: &E,
        queries: &[EdgeQuery],
    ) -> Result<Vec<PageContents<Edge>>> {
        let results = round_trip("select_edges", queries.len(), || {
            endpoint.select_edges(queries)
        })?;
        expect_pages(queries.len(), &results)?;
        Ok(results
            .into_iter()
            .map(|r| PageContents {
                items: r.edges,
                next_cursor: r.next_cursor,
                prev_cursor: r.prev_cursor,
            })
            .collect())
    }
}

/// One page of results, bound to the endpoint and query that produced it.
pub struct Paged<'a, E: ?Sized, K: PageKind> {
    endpoint: &'a E,
    query: K::Query,
    items: Vec<K::Item>,
    next_cursor: Cursor,
    prev_cursor: Cursor,
    kind: PhantomData<K>,
}

/// Page of node ids.
pub type PagedNodeIdList<'a, E> = Paged<'a, E, NodeIds>;
/// Page of edges.
pub type PagedEdgeList<'a, E> = Paged<'a, E, Edges>;

impl<'a, E: ?Sized, K: PageKind> Paged<'a, E, K> {
    pub(crate) fn new(endpoint: &'a E, query: K::Query, contents: PageContents<K::Item>) -> Self {
        Self {
            endpoint,
            query,
            items: contents.items,
            next_cursor: contents.next_cursor,
            prev_cursor: contents.prev_cursor,
            kind: PhantomData,
        }
    }

    /// Whether the remote side reported a following page.
    pub fn has_next_page(&self) -> bool {
        self.next_cursor != Page::END
    }

    /// Whether the remote side reported a preceding page.
    pub fn has_previous_page(&self) -> bool {
        self.prev_cursor != Page::START
    }

    /// Rows of this page.
    pub fn items(&self) -> &[K::Item] {
        &self.items
    }

    /// Iterate the rows of this page. Restartable; never fetches.
    pub fn iter(&self) -> std::slice::Iter<'_, K::Item> {
        self.items.iter()
    }

    /// Number of rows on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Query that produced this page.
    pub fn query(&self) -> &K::Query {
        &self.query
    }

    /// Raw cursor of the following page.
    pub fn next_cursor(&self) -> Cursor {
        self.next_cursor
    }

    /// Raw cursor of the preceding page.
    pub fn prev_cursor(&self) -> Cursor {
        self.prev_cursor
    }

    /// Take the rows, dropping the cursor state.
    pub fn into_items(self) -> Vec<K::Item> {
        self.items
    }

    fn query_at(&self, cursor: Cursor) -> K::Query {
        let mut query = self.query.clone();
        K::set_page(&mut query, K::page(&self.query).with_cursor(cursor));
        query
    }
}

impl<'a, E: FlockEndpoint + ?Sized, K: PageKind> Paged<'a, E, K> {
    /// Fetch the page after this one.
    ///
    /// The query is re-issued with `next_cursor` even when
    /// [`has_next_page`](Self::has_next_page) is `false`; the remote side
    /// decides what an exhausted cursor returns.
    pub fn next_page(&self) -> Result<Self> {
        fetch_one::<E, K>(self.endpoint, self.query_at(self.next_cursor))
    }

    /// Fetch the page before this one.
    pub fn previous_page(&self) -> Result<Self> {
        fetch_one::<E, K>(self.endpoint, self.query_at(self.prev_cursor))
    }

    /// Walk forward from this page, yielding it first and then each
    /// following page as it is fetched.
    pub fn pages(self) -> Pages<'a, E, K> {
        Pages {
            endpoint: self.endpoint,
            first: Some(self),
            upcoming: None,
        }
    }
}

impl<'a, E: ?Sized> Paged<'a, E, NodeIds> {
    /// Node ids on this page.
    pub fn ids(&self) -> &[NodeId] {
        &self.items
    }
}

impl<'a, E: ?Sized> Paged<'a, E, Edges> {
    /// Edges on this page.
    pub fn edges(&self) -> &[Edge] {
        &self.items
    }
}

impl<'a, E: ?Sized, K: PageKind> Clone for Paged<'a, E, K> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint,
            query: self.query.clone(),
            items: self.items.clone(),
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
            kind: PhantomData,
        }
    }
}

impl<'a, E: ?Sized, K: PageKind> fmt::Debug for Paged<'a, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paged")
            .field("query", &self.query)
            .field("items", &self.items)
            .field("next_cursor", &self.next_cursor)
            .field("prev_cursor", &self.prev_cursor)
            .finish_non_exhaustive()
    }
}

impl<'p, 'a, E: ?Sized, K: PageKind> IntoIterator for &'p Paged<'a, E, K> {
    type Item = &'p K::Item;
    type IntoIter = std::slice::Iter<'p, K::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Lazy forward walk over pages; see [`Paged::pages`].
///
/// Ends after the first page without a successor or right after yielding
/// an error.
pub struct Pages<'a, E: ?Sized, K: PageKind> {
    endpoint: &'a E,
    first: Option<Paged<'a, E, K>>,
    upcoming: Option<K::Query>,
}

impl<'a, E: FlockEndpoint + ?Sized, K: PageKind> Iterator for Pages<'a, E, K> {
    type Item = Result<Paged<'a, E, K>>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = match self.first.take() {
            Some(page) => page,
            None => match fetch_one::<E, K>(self.endpoint, self.upcoming.take()?) {
                Ok(page) => page,
                Err(err) => return Some(Err(err)),
            },
        };
        if page.has_next_page() {
            self.upcoming = Some(page.query_at(page.next_cursor));
        }
        Some(Ok(page))
    }
}

impl<'a, E: FlockEndpoint + ?Sized, K: PageKind> FusedIterator for Pages<'a, E, K> {}

impl<'a, E: ?Sized, K: PageKind> fmt::Debug for Pages<'a, E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pages")
            .field("first", &self.first)
            .field("upcoming", &self.upcoming)
            .finish_non_exhaustive()
    }
}

pub(crate) fn fetch_one<'a, E: FlockEndpoint + ?Sized, K: PageKind>(
    endpoint: &'a E,
    query: K::Query,
) -> Result<Paged<'a, E, K>> {
    let contents = K::fetch(endpoint, std::slice::from_ref(&query))?
        .pop()
        .ok_or(Error::ResultCountMismatch {
            expected: 1,
            got: 0,
        })?;
    Ok(Paged::new(endpoint, query, contents))
}
