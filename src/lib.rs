//! # UAVCAN Client Port
//!
//! This crate implements the client-side request/response correlation engine
//! for a UAVCAN/Cyphal presentation-layer service port: given a typed service
//! definition, send a serialized request to a remote node and deliver the
//! matching response to the caller, correlating the two via a transfer
//! identifier whose value space may be severely restricted by the underlying
//! transport (on classical CAN, as few as 32 distinct IDs).
//!
//! ## Scope
//!
//! The hard part lives in [`client`]: [`client::client_impl::ClientImpl`] is a
//! shared, reference-counted per-session state machine that multiplexes many
//! concurrent outstanding requests over a single pair of transport sessions,
//! enforces a modular transfer-ID space, serialises outbound send access to
//! the transport, and dispatches incoming transfers to the correct pending
//! caller. [`client::proxy::Client`] is the thin user-facing handle.
//!
//! Transport sessions ([`transport::OutputSession`], [`transport::InputSession`])
//! and the DSDL codec ([`dsdl::ServiceCodec`]) are consumed as traits; this
//! crate is not responsible for wire formats or serialization details beyond
//! the bundled [`dsdl::BincodeCodec`] stand-in and the in-memory
//! [`transport::loopback`] transport used for tests and the demo binary.

pub mod client;
pub mod cli;
pub mod dsdl;
pub mod error;
pub mod logging;
pub mod transport;

pub use client::client_impl::ClientImpl;
pub use client::proxy::Client;
pub use client::stats::ClientStatistics;
pub use error::ClientError;
pub use transport::{InputSession, OutputSession, Priority, SessionSpecifier, Transfer, TransferFrom};

/// The current version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values, mirroring the recommendations in the
/// UAVCAN specification for the presentation layer.
pub mod defaults {
    use std::time::Duration;

    /// Default response timeout used by a fresh [`crate::client::proxy::Client`].
    pub const SERVICE_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

    /// Bound on how long the receiver task blocks on a single `receive_until`
    /// call before re-checking whether the port has been closed.
    pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);
}
