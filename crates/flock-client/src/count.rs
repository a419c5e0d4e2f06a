// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Batched selection counts.

use std::fmt;

use flock_proto::{ids, FlockEndpoint, SelectOperation};

use crate::error::{expect_pages, round_trip, Result};
use crate::selection::SelectionQuery;

/// Ordered batch of selections to count in one round trip.
pub struct CountBuilder<'a, E: ?Sized> {
    endpoint: &'a E,
    queries: Vec<Vec<SelectOperation>>,
}

impl<'a, E: FlockEndpoint + ?Sized> CountBuilder<'a, E> {
    /// Empty batch against `endpoint`.
    pub fn new(endpoint: &'a E) -> Self {
        Self {
            endpoint,
            queries: Vec::new(),
        }
    }

    /// Append a selection to count.
    pub fn count(mut self, query: &SelectionQuery) -> Self {
        self.queries.push(query.operations().to_vec());
        self
    }

    /// Programs in submission order.
    pub fn queries(&self) -> &[Vec<SelectOperation>] {
        &self.queries
    }

    /// One count per selection, in submission order.
    pub fn execute(&self) -> Result<Vec<i32>> {
        let packed = round_trip("count2", self.queries.len(), || {
            self.endpoint.count2(&self.queries)
        })?;
        let counts = ids::decode_counts(&packed)?;
        expect_pages(self.queries.len(), &counts)?;
        Ok(counts)
    }
}

impl<'a, E: ?Sized> fmt::Debug for CountBuilder<'a, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountBuilder")
            .field("queries", &self.queries)
            .finish_non_exhaustive()
    }
}
