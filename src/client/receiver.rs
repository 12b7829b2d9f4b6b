//! The long-running task that reads the inbound transport session and
//! resolves pending completion slots.
//!
//! One instance is spawned per [`ClientImpl`] at construction and runs for
//! as long as the impl is open. Bounding every `receive_until` call to
//! [`crate::defaults::RECEIVE_TIMEOUT`] is what lets the task notice closure
//! promptly without the underlying transport needing to unblock on its own.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::client_impl::ClientImpl;
use crate::defaults::RECEIVE_TIMEOUT;
use crate::dsdl::{ServiceCodec, ServiceType};
use crate::error::ClientError;
use crate::transport::TransferMetadata;

/// Drive the receive loop until the impl closes or the transport/codec
/// raises a fatal failure, then run the shared termination sequence.
pub(crate) async fn run<T, C>(impl_: Arc<ClientImpl<T, C>>)
where
    T: ServiceType,
    C: ServiceCodec<T>,
{
    let termination_cause = receive_loop(&impl_).await;
    terminate(&impl_, termination_cause).await;
}

/// `Ok(())` on a clean close (the impl's `closed` flag was observed), `Err`
/// on a fatal transport/codec failure.
async fn receive_loop<T, C>(impl_: &Arc<ClientImpl<T, C>>) -> Result<(), anyhow::Error>
where
    T: ServiceType,
    C: ServiceCodec<T>,
{
    while !impl_.is_closed() {
        let deadline = std::time::Instant::now() + RECEIVE_TIMEOUT;
        let transfer = match impl_.input_session.receive_until(deadline).await {
            Ok(Some(t)) => t,
            Ok(None) => continue,
            Err(ClientError::FatalReceiver(e)) => return Err(anyhow::anyhow!(e.to_string())),
            Err(e) => return Err(anyhow::Error::new(e)),
        };

        let response = match impl_.codec.try_deserialize_response(&transfer.fragmented_payload) {
            Some(r) => r,
            None => {
                let mut state = impl_.state.lock().await;
                state.stats.deserialization_failures += 1;
                debug!(impl_ = %impl_, transfer_id = transfer.transfer_id, "failed to deserialize response payload");
                continue;
            }
        };

        let metadata = TransferMetadata::from(&transfer);
        let mut state = impl_.state.lock().await;
        let completed = state.pending.complete(transfer.transfer_id, Ok((response, metadata)));
        if !completed {
            state.stats.unexpected_responses += 1;
            let pending_ids = state.pending_ids_for_log();
            info!(
                impl_ = %impl_,
                transfer_id = transfer.transfer_id,
                pending = ?pending_ids,
                "unexpected response: no pending request for this transfer ID",
            );
        }
    }
    Ok(())
}

async fn terminate<T, C>(impl_: &Arc<ClientImpl<T, C>>, cause: Result<(), anyhow::Error>)
where
    T: ServiceType,
    C: ServiceCodec<T>,
{
    impl_.closed.store(true, Ordering::SeqCst);

    if let Err(ref err) = cause {
        warn!(impl_ = %impl_, error = %err, "fatal error in client receiver task");
    } else {
        debug!(impl_ = %impl_, "client receiver task closing");
    }

    if let Some(finalizer) = impl_.finalizer.lock().expect("finalizer mutex poisoned").take() {
        let sessions = crate::client::client_impl::FinalizedSessions {
            output_session: Arc::clone(&impl_.output_session),
            input_session: Arc::clone(&impl_.input_session),
        };
        finalizer(sessions);
    }

    let termination_error = match cause {
        Err(err) => ClientError::FatalReceiver(Arc::new(err)),
        Ok(()) => ClientError::port_closed(impl_.as_ref()),
    };

    let mut state = impl_.state.lock().await;
    state.pending.drain_with(termination_error);
    debug_assert!(state.pending.is_empty());
}
