// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Client error taxonomy.

use flock_proto::{CodecError, FlockError, RpcError, TransportError};
use tracing::{debug, warn};

/// Everything a client operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote service rejected or failed to evaluate the request.
    #[error("remote failure: {0}")]
    Remote(#[source] FlockError),
    /// The request or its reply did not make it across.
    #[error("transport failure: {0}")]
    Transport(#[source] TransportError),
    /// A packed id or count buffer had a ragged length.
    #[error(transparent)]
    MalformedEncoding(#[from] CodecError),
    /// A builder was used out of order (e.g. paging before any query).
    #[error("illegal builder state: {0}")]
    IllegalState(&'static str),
    /// The endpoint answered with the wrong number of result pages.
    #[error("expected {expected} result pages, got {got}")]
    ResultCountMismatch {
        /// Pages the batch asked for.
        expected: usize,
        /// Pages that came back.
        got: usize,
    },
}

impl Error {
    /// `true` for failures reported by the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// `true` for communication failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Remote(e) => Error::Remote(e),
            RpcError::Transport(e) => Error::Transport(e),
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err)
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Run one endpoint call, logging it and lifting its error into [`Error`].
pub(crate) fn round_trip<T>(
    op: &'static str,
    batch: usize,
    call: impl FnOnce() -> std::result::Result<T, RpcError>,
) -> Result<T> {
    debug!(op, batch, "flock round trip");
    call().map_err(|err| {
        warn!(op, batch, %err, "flock round trip failed");
        Error::from(err)
    })
}

/// Fail unless the endpoint returned exactly `expected` pages.
pub(crate) fn expect_pages<T>(expected: usize, pages: &[T]) -> Result<()> {
    if pages.len() == expected {
        Ok(())
    } else {
        Err(Error::ResultCountMismatch {
            expected,
            got: pages.len(),
        })
    }
}
