//! Storage pool and volume handles over a daemon [`Connection`].
//!
//! [`PoolRegistry`] enumerates and materializes [`Pool`] handles against one
//! connection; a [`Pool`] enumerates and materializes [`Volume`] handles.
//! Handles are stateless proxies: every accessor queries the daemon, which
//! remains the source of truth, and nothing is cached beyond immutable
//! identity. The one contract enforced locally is the release discipline:
//! a released handle deterministically fails every later call with
//! [`Error::InvalidHandle`](mgmt_api::Error::InvalidHandle).
//!
//! [`Connection`]: mgmt_api::Connection

pub mod pool;
pub mod registry;
pub mod volume;

pub use pool::Pool;
pub use registry::PoolRegistry;
pub use volume::Volume;

use mgmt_api::{v0::Request, Error};

/// The daemon answered a request with a reply of the wrong shape.
pub(crate) fn unexpected_reply(request: &Request) -> Error {
    Error::QueryFailed {
        operation: request.to_string(),
        reason: "unexpected reply shape from the daemon".into(),
    }
}
