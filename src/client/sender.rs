//! The outbound half of a call: validate, stamp, serialize, send.
//!
//! Invoked from [`crate::client::client_impl::ClientImpl::call`] while that
//! call still holds the impl's mutex — sends on one `ClientImpl` are always
//! totally ordered by the order in which callers acquired that mutex.

use std::time::Instant;

use crate::dsdl::{ServiceCodec, ServiceType};
use crate::error::ClientError;
use crate::transport::{OutputSession, Priority, Transfer};

/// Serialize `request` and hand it to `output_session.send_until`.
///
/// Returns whatever the transport returns: `true` if accepted before
/// `monotonic_deadline`, `false` if the deadline elapsed first.
pub(crate) async fn do_send_until<T, C>(
    codec: &C,
    output_session: &dyn OutputSession,
    request: &T::Request,
    transfer_id: u64,
    priority: Priority,
    monotonic_deadline: Instant,
) -> Result<bool, ClientError>
where
    T: ServiceType,
    C: ServiceCodec<T>,
{
    let fragmented_payload = codec.serialize_request(request);
    let transfer = Transfer {
        timestamp: Instant::now(),
        priority,
        transfer_id,
        fragmented_payload,
    };
    output_session.send_until(transfer, monotonic_deadline).await
}
