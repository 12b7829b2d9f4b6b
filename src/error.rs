//! Error taxonomy for the client port.
//!
//! Not every outcome in the spec is an error: a response timeout or a
//! transport-refused send are *values* (`None`), returned to the caller
//! because higher layers routinely need to act on them without unwinding.
//! Deserialization failures and unexpected responses are swallowed into
//! counters and never reach this type at all. `ClientError` only covers the
//! outcomes that are programmer-visible failures: closed ports, transfer-ID
//! exhaustion, invalid arguments, a request object of the wrong type, and a
//! fatal receiver failure that tore the whole port down.

use std::fmt;

use thiserror::Error;

/// Errors raised by [`crate::client::client_impl::ClientImpl`] and
/// [`crate::client::proxy::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation was attempted on a proxy or impl that has already closed.
    #[error("port closed: {0}")]
    PortClosed(String),

    /// The transfer ID computed for this call already has an outstanding
    /// request occupying it modulo the transport's transfer-ID space. The
    /// caller has more concurrent requests in flight than the transport can
    /// distinguish.
    #[error("request transfer-ID variability exhausted: {0}")]
    RequestTransferIdVariabilityExhausted(String),

    /// A caller-supplied argument was out of its valid range, e.g. a
    /// `response_timeout` outside `(0, +inf)`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request object's runtime type did not match the service's
    /// declared `Request` type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The receiver task terminated due to a fatal transport or codec
    /// failure. Carries the underlying cause; every pending slot still
    /// outstanding at the time of termination is completed with a clone of
    /// this variant.
    #[error("fatal receiver failure: {0}")]
    FatalReceiver(std::sync::Arc<anyhow::Error>),
}

impl Clone for ClientError {
    fn clone(&self) -> Self {
        match self {
            Self::PortClosed(s) => Self::PortClosed(s.clone()),
            Self::RequestTransferIdVariabilityExhausted(s) => {
                Self::RequestTransferIdVariabilityExhausted(s.clone())
            }
            Self::InvalidArgument(s) => Self::InvalidArgument(s.clone()),
            Self::TypeMismatch(s) => Self::TypeMismatch(s.clone()),
            Self::FatalReceiver(e) => Self::FatalReceiver(e.clone()),
        }
    }
}

impl ClientError {
    /// Build a [`ClientError::PortClosed`] tagged with a human-readable
    /// identity for the impl or proxy that raised it.
    pub fn port_closed(identity: impl fmt::Display) -> Self {
        Self::PortClosed(identity.to_string())
    }
}
