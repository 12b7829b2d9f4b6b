//! The hidden, shared coordinator behind every [`crate::client::proxy::Client`].
//!
//! There is at most one `ClientImpl` per [`SessionSpecifier`]; it is created
//! by the presentation layer when the first proxy for that specifier is
//! requested, and shared by every subsequent proxy. It owns the transport
//! sessions, the transfer-ID counter, the pending table, and the long-running
//! receiver task, and multiplexes many concurrent `call()`s over a single
//! outbound session while serialising access to it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::client::allocator::{ModulusSource, TransferIdCounter};
use crate::client::pending::PendingTable;
use crate::client::sender::do_send_until;
use crate::client::stats::{ClientStatistics, StatsCounters};
use crate::dsdl::{ServiceCodec, ServiceType};
use crate::error::ClientError;
use crate::transport::{InputSession, OutputSession, Priority, SessionSpecifier};

/// The transport sessions handed back to the presentation layer when a
/// `ClientImpl` closes, so it can close them and remove the impl from
/// whatever registry keyed it by [`SessionSpecifier`].
pub struct FinalizedSessions {
    pub output_session: Arc<dyn OutputSession>,
    pub input_session: Arc<dyn InputSession>,
}

/// Called exactly once, from the receiver task's termination path.
pub type Finalizer = Box<dyn FnOnce(FinalizedSessions) + Send>;

pub(crate) struct ClientState<Response> {
    pub(crate) pending: PendingTable<Response>,
    pub(crate) stats: StatsCounters,
}

impl<Response> ClientState<Response> {
    fn new() -> Self {
        Self {
            pending: PendingTable::new(),
            stats: StatsCounters::default(),
        }
    }

    pub(crate) fn pending_ids_for_log(&self) -> Vec<u64> {
        self.pending.keys()
    }
}

pub struct ClientImpl<T: ServiceType, C: ServiceCodec<T>> {
    pub(crate) session_specifier: SessionSpecifier,
    pub(crate) codec: C,
    pub(crate) output_session: Arc<dyn OutputSession>,
    pub(crate) input_session: Arc<dyn InputSession>,
    transfer_id_counter: TransferIdCounter,
    modulus_source: ModulusSource,
    pub(crate) state: Mutex<ClientState<T::Response>>,
    pub(crate) closed: AtomicBool,
    proxy_count: AtomicUsize,
    pub(crate) finalizer: std::sync::Mutex<Option<Finalizer>>,
}

impl<T, C> ClientImpl<T, C>
where
    T: ServiceType,
    C: ServiceCodec<T> + 'static,
{
    /// Construct a new impl and spawn its receiver task. There is no public
    /// `close()`: closure is exclusively proxy-driven (see
    /// [`Self::remove_proxy`]).
    pub fn new(
        session_specifier: SessionSpecifier,
        codec: C,
        output_session: Arc<dyn OutputSession>,
        input_session: Arc<dyn InputSession>,
        transfer_id_counter: TransferIdCounter,
        modulus_source: ModulusSource,
        finalizer: Finalizer,
    ) -> Arc<Self> {
        let this = Arc::new(Self {
            session_specifier,
            codec,
            output_session,
            input_session,
            transfer_id_counter,
            modulus_source,
            state: Mutex::new(ClientState::new()),
            closed: AtomicBool::new(false),
            proxy_count: AtomicUsize::new(0),
            finalizer: std::sync::Mutex::new(Some(finalizer)),
        });

        {
            let this = Arc::clone(&this);
            tokio::spawn(async move { crate::client::receiver::run(this).await });
        }

        this
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The number of proxies currently registered against this impl.
    pub fn proxy_count(&self) -> usize {
        self.proxy_count.load(Ordering::SeqCst)
    }

    /// Send `request` and wait for the matching response.
    ///
    /// Transfer-ID allocation, pending-table insertion, and the send itself
    /// all run under `self.state`'s mutex; the mutex is released before the
    /// completion-slot wait so other callers can allocate transfer IDs and
    /// send while this call is still waiting on its response.
    pub async fn call(
        self: &Arc<Self>,
        request: T::Request,
        priority: Priority,
        response_timeout: Duration,
    ) -> Result<Option<(T::Response, crate::transport::TransferMetadata)>, ClientError> {
        if self.is_closed() {
            return Err(ClientError::port_closed(self.as_ref()));
        }

        let transfer_id;
        let rx;
        let send_result;
        {
            let mut state = self.state.lock().await;
            if self.is_closed() {
                return Err(ClientError::port_closed(self.as_ref()));
            }

            let modulus = self.modulus_source.get();
            transfer_id = self.transfer_id_counter.get_then_increment() % modulus;
            if state.pending.contains(transfer_id) {
                return Err(ClientError::RequestTransferIdVariabilityExhausted(format!(
                    "{self} already has an outstanding request at transfer ID {transfer_id}"
                )));
            }

            rx = state.pending.insert(transfer_id);

            let deadline = Instant::now() + response_timeout;
            let result = do_send_until::<T, C>(
                &self.codec,
                self.output_session.as_ref(),
                &request,
                transfer_id,
                priority,
                deadline,
            )
            .await;

            send_result = match result {
                Ok(accepted) => accepted,
                Err(err) => {
                    state.pending.remove(transfer_id);
                    return Err(err);
                }
            };
            // `state`'s guard drops here, releasing the mutex before we wait.
        }

        // A guard that removes the slot even if this future is dropped
        // (e.g. the caller cancels the call) before the wait below resolves.
        let mut removal_guard = PendingRemovalGuard {
            impl_: Arc::clone(self),
            transfer_id,
            disarmed: false,
        };

        let outcome = if send_result {
            {
                let mut state = self.state.lock().await;
                state.stats.sent_requests += 1;
            }
            match tokio::time::timeout(response_timeout, rx).await {
                Ok(Ok(Ok((response, metadata)))) => Ok(Some((response, metadata))),
                Ok(Ok(Err(err))) => Err(err),
                // The sender half was dropped without completing, which
                // should not happen on any live impl; treat it like a
                // timeout rather than panicking.
                Ok(Err(_recv_closed)) => Ok(None),
                Err(_elapsed) => Ok(None),
            }
        } else {
            let mut state = self.state.lock().await;
            state.stats.unsent_requests += 1;
            Ok(None)
        };

        {
            let mut state = self.state.lock().await;
            state.pending.remove(transfer_id);
        }
        removal_guard.disarmed = true;

        outcome
    }

    /// Register a new proxy. Fails if the impl is already closed.
    pub fn register_proxy(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::port_closed(self));
        }
        self.proxy_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Deregister a proxy. Always succeeds, even on an already-closed impl,
    /// and is idempotent once the count has reached zero. When the count
    /// reaches zero, initiates shutdown: the receiver task will observe the
    /// closed flag within [`crate::defaults::RECEIVE_TIMEOUT`] and run the
    /// termination sequence exactly once.
    pub fn remove_proxy(&self) {
        loop {
            let current = self.proxy_count.load(Ordering::SeqCst);
            if current == 0 {
                // Already at zero: a repeated or post-close call, tolerated
                // as a no-op rather than underflowing.
                return;
            }
            if self
                .proxy_count
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                if current == 1 {
                    // Cooperative close: flip the flag the receiver loop
                    // polls. We never hard-abort the task, so it can still
                    // run the finalizer and drain the pending table itself.
                    self.closed.store(true, Ordering::SeqCst);
                }
                return;
            }
        }
    }

    /// Snapshot of this impl's statistics, combined with the transport
    /// sessions' own counters.
    pub async fn sample_statistics(&self) -> ClientStatistics {
        let state = self.state.lock().await;
        ClientStatistics {
            request_transport_session: self.output_session.sample_statistics(),
            response_transport_session: self.input_session.sample_statistics(),
            sent_requests: state.stats.sent_requests,
            unsent_requests: state.stats.unsent_requests,
            deserialization_failures: state.stats.deserialization_failures,
            unexpected_responses: state.stats.unexpected_responses,
        }
    }
}

/// Removes a pending-table entry on drop, as a backstop for cancellation:
/// if the `call` future is dropped while awaiting the completion slot, this
/// still guarantees the transfer ID is freed, just not necessarily by the
/// time the dropped future's poll returns (the actual removal runs as a
/// detached task on the impl's mutex).
struct PendingRemovalGuard<T: ServiceType, C: ServiceCodec<T>> {
    impl_: Arc<ClientImpl<T, C>>,
    transfer_id: u64,
    disarmed: bool,
}

impl<T, C> Drop for PendingRemovalGuard<T, C>
where
    T: ServiceType,
    C: ServiceCodec<T> + 'static,
{
    fn drop(&mut self) {
        if self.disarmed {
            return;
        }
        let impl_ = Arc::clone(&self.impl_);
        let transfer_id = self.transfer_id;
        tokio::spawn(async move {
            let mut state = impl_.state.lock().await;
            state.pending.remove(transfer_id);
        });
    }
}

impl<T: ServiceType, C: ServiceCodec<T>> fmt::Display for ClientImpl<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientImpl({}, proxy_count={})",
            self.session_specifier,
            self.proxy_count()
        )
    }
}
