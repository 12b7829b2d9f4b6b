//! Transport-layer interfaces consumed by the client port.
//!
//! Everything in this module is, per the specification, an external
//! collaborator: the real send/receive primitives, framing, and wire format
//! belong to a transport implementation this crate never builds. The one
//! exception is [`loopback`], an in-memory test/demo double kept at the
//! minimum needed to exercise [`crate::client`] end-to-end.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::ClientError;

/// Identifies one client port uniquely within the presentation layer:
/// a service-ID paired with the node-ID of the server it talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionSpecifier {
    pub service_id: u16,
    pub server_node_id: u16,
}

impl fmt::Display for SessionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service #{} @ node {}", self.service_id, self.server_node_id)
    }
}

/// Transfer priority. Values are ordered the same way UAVCAN orders them:
/// `Exceptional` preempts everything, `Optional` yields to everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Exceptional,
    Immediate,
    Fast,
    High,
    Nominal,
    Low,
    Slow,
    Optional,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Nominal
    }
}

/// One logical outbound message: the request transfer a [`ClientImpl`] hands
/// to the [`OutputSession`].
///
/// [`ClientImpl`]: crate::client::client_impl::ClientImpl
#[derive(Debug, Clone)]
pub struct Transfer {
    pub timestamp: Instant,
    pub priority: Priority,
    pub transfer_id: u64,
    pub fragmented_payload: Vec<Vec<u8>>,
}

/// An inbound transfer as delivered by an [`InputSession`], carrying enough
/// metadata to both deserialize the payload and correlate it with a pending
/// request.
#[derive(Debug, Clone)]
pub struct TransferFrom {
    pub timestamp: Instant,
    pub priority: Priority,
    pub transfer_id: u64,
    pub source_node_id: u16,
    pub fragmented_payload: Vec<Vec<u8>>,
}

/// Metadata about a response transfer, handed back to the caller alongside
/// the deserialized response object.
#[derive(Debug, Clone)]
pub struct TransferMetadata {
    pub timestamp: Instant,
    pub priority: Priority,
    pub transfer_id: u64,
    pub source_node_id: u16,
}

impl From<&TransferFrom> for TransferMetadata {
    fn from(t: &TransferFrom) -> Self {
        Self {
            timestamp: t.timestamp,
            priority: t.priority,
            transfer_id: t.transfer_id,
            source_node_id: t.source_node_id,
        }
    }
}

/// Monotonic counters sampled off a transport session, forwarded verbatim
/// into [`crate::client::stats::ClientStatistics`].
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct SessionStatistics {
    pub transfers: u64,
    pub frames: u64,
    pub payload_bytes: u64,
    pub errors: u64,
    pub drops: u64,
}

/// The outbound half of a transport session pair.
///
/// Mutated only under the owning [`ClientImpl`]'s mutex: interleaving two
/// sends on the same session could corrupt wire-level framing on some
/// transports, so access is always serialised by the caller.
///
/// [`ClientImpl`]: crate::client::client_impl::ClientImpl
#[async_trait]
pub trait OutputSession: Send + Sync {
    /// Attempt to emit `transfer`, blocking up to `deadline`. Returns `true`
    /// if the transport accepted the transfer before the deadline, `false`
    /// if the deadline elapsed first.
    async fn send_until(&self, transfer: Transfer, deadline: Instant) -> Result<bool, ClientError>;

    /// Snapshot of this session's transport-layer counters.
    fn sample_statistics(&self) -> SessionStatistics;
}

/// The inbound half of a transport session pair, read only by the receiver
/// task.
#[async_trait]
pub trait InputSession: Send + Sync {
    /// Wait for the next inbound transfer, up to `deadline`. Returns `None`
    /// if the deadline elapses with nothing received.
    async fn receive_until(&self, deadline: Instant) -> Result<Option<TransferFrom>, ClientError>;

    /// Snapshot of this session's transport-layer counters.
    fn sample_statistics(&self) -> SessionStatistics;
}

pub mod loopback;
