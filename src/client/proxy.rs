//! The user-facing client handle.
//!
//! Thin by design: every proxy sharing a [`SessionSpecifier`] forwards to the
//! same [`ClientImpl`], which does all the real work. What is per-proxy is
//! just `priority` and `response_timeout`, and nothing else; the transfer-ID
//! counter and statistics are shared because they belong to the session, not
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::client::client_impl::ClientImpl;
use crate::client::stats::ClientStatistics;
use crate::defaults::SERVICE_REQUEST_TIMEOUT;
use crate::dsdl::{ServiceCodec, ServiceType};
use crate::error::ClientError;
use crate::transport::{Priority, TransferMetadata};

/// A task's private handle to a UAVCAN client port.
///
/// Do not share one `Client` across tasks; request a fresh one per task
/// instead (it is cheap — just an `Arc` clone of the shared impl plus two
/// fields). Dropping a `Client` without calling [`Client::close`] is
/// equivalent to closing it, logged at debug rather than failing silently.
pub struct Client<T: ServiceType, C: ServiceCodec<T>> {
    impl_: Arc<ClientImpl<T, C>>,
    priority: Priority,
    response_timeout: Duration,
    closed: bool,
}

impl<T, C> Client<T, C>
where
    T: ServiceType,
    C: ServiceCodec<T> + 'static,
{
    /// Construct a proxy over `impl_`, registering it immediately.
    ///
    /// Not part of the public API surface of a real presentation layer —
    /// callers are expected to obtain a `Client` from whatever registry owns
    /// the `ClientImpl`s, which is out of scope for this crate.
    pub fn new(impl_: Arc<ClientImpl<T, C>>) -> Result<Self, ClientError> {
        impl_.register_proxy()?;
        Ok(Self {
            impl_,
            priority: Priority::default(),
            response_timeout: SERVICE_REQUEST_TIMEOUT,
            closed: false,
        })
    }

    /// Send `request` using this proxy's configured priority and timeout.
    pub async fn call(
        &self,
        request: T::Request,
    ) -> Result<Option<(T::Response, TransferMetadata)>, ClientError> {
        if self.closed {
            return Err(ClientError::port_closed("client proxy"));
        }
        self.impl_.call(request, self.priority, self.response_timeout).await
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Change the response timeout. Must be strictly positive and finite;
    /// `Duration` has no representation of infinity, so only the zero case
    /// needs rejecting.
    pub fn set_response_timeout(&mut self, response_timeout: Duration) -> Result<(), ClientError> {
        if response_timeout.is_zero() {
            return Err(ClientError::InvalidArgument(
                "response_timeout must be positive".to_string(),
            ));
        }
        self.response_timeout = response_timeout;
        Ok(())
    }

    /// A snapshot of the statistics shared by every proxy over this impl.
    pub async fn sample_statistics(&self) -> ClientStatistics {
        self.impl_.sample_statistics().await
    }

    /// Explicitly close this proxy, deregistering it from the shared impl.
    /// Idempotent: closing an already-closed proxy is a no-op.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.impl_.remove_proxy();
        }
    }
}

impl<T: ServiceType, C: ServiceCodec<T>> Drop for Client<T, C> {
    fn drop(&mut self) {
        if !self.closed {
            debug!("client proxy dropped without explicit close, closing now");
            self.impl_.remove_proxy();
        }
    }
}
