#![warn(missing_docs)]
//! Typed API spoken between the storage handle layer and a storage
//! management daemon.
//!
//! The daemon owns all pool and volume state; this crate only defines the
//! requests it understands, the replies it returns and the error taxonomy
//! every failure is reported under. How the connection is established,
//! authenticated and closed is the transport's business.

/// version 0 of the request/reply surface
pub mod v0;

use async_trait::async_trait;
use dyn_clonable::clonable;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::v0::{Feature, Reply, Request};

/// Save on typing
pub type DynConnection = Box<dyn Connection>;

/// Handle to an established daemon session with request/reply semantics.
///
/// Calls are synchronous request/response against the daemon; every call is
/// treated as blocking I/O and must therefore stay off latency-sensitive
/// paths. The daemon is the sole arbiter of consistency between concurrent
/// calls. No retries are performed at this level.
#[async_trait]
#[clonable]
pub trait Connection: Clone + Send + Sync {
    /// Send one request and wait for the daemon's reply.
    ///
    /// Once the daemon side of the session is gone every call fails with
    /// [`Error::InvalidHandle`] for the connection resource.
    async fn call(&self, request: Request) -> Result<Reply, Error>;

    /// Whether the daemon implements an optional capability.
    ///
    /// Queried at call time by operations which are not universally
    /// available, so an unsupported operation fails cleanly instead of
    /// being absent from the API.
    async fn supports(&self, feature: Feature) -> Result<bool, Error>;
}

/// The kind of resource an error refers to.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Eq,
    PartialEq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum ResourceKind {
    /// the daemon session itself
    Connection,
    /// a storage pool
    Pool,
    /// a storage volume
    Volume,
}

/// Error type returned by the daemon and by the handle layer.
///
/// Every variant carries the identity of the failing operation and the
/// daemon's diagnostic text, so callers can tell transient from permanent
/// failures by taxonomy alone. Enumerations which legitimately match
/// nothing are a success path, never an error.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A lookup matched no entity.
    #[snafu(display("{} '{}' not found", kind, id))]
    NotFound {
        /// kind of the entity looked up
        kind: ResourceKind,
        /// identifier the lookup was given
        id: String,
    },
    /// A supplied definition document failed daemon-side validation.
    #[snafu(display("'{}' rejected the supplied definition: {}", operation, reason))]
    InvalidDefinition {
        /// operation the definition was submitted to
        operation: String,
        /// daemon diagnostic
        reason: String,
    },
    /// A state transition or destructive operation failed against live
    /// storage.
    #[snafu(display("'{}' failed for {} '{}': {}", operation, kind, id, reason))]
    OperationFailed {
        /// operation that failed
        operation: String,
        /// kind of the entity operated on
        kind: ResourceKind,
        /// identifier of the entity operated on
        id: String,
        /// daemon diagnostic
        reason: String,
    },
    /// A read-only query against the daemon failed.
    #[snafu(display("query '{}' failed: {}", operation, reason))]
    QueryFailed {
        /// query that failed
        operation: String,
        /// daemon diagnostic
        reason: String,
    },
    /// The handle was released, or its daemon-side counterpart is gone.
    #[snafu(display("stale {} handle '{}'", kind, id))]
    InvalidHandle {
        /// kind of the stale handle
        kind: ResourceKind,
        /// identifier the handle was created with
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_operation_identity() {
        let error = Error::OperationFailed {
            operation: "deletePool".into(),
            kind: ResourceKind::Pool,
            id: "tank".into(),
            reason: "pool is still active".into(),
        };
        let text = error.to_string();
        assert!(text.contains("deletePool"));
        assert!(text.contains("tank"));
        assert!(text.contains("pool is still active"));
    }

    #[test]
    fn errors_serialize_for_the_wire() {
        let error = Error::NotFound {
            kind: ResourceKind::Volume,
            id: "disk0.img".into(),
        };
        let json = serde_json::to_string(&error).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(error, back);
    }
}
