//! An in-memory transport double used by tests and the demo binary.
//!
//! This is not a wire transport: there is no framing, no addressing beyond
//! what the caller threads through by hand, and no reconnection logic. It
//! exists purely so [`crate::client::client_impl::ClientImpl`] has something
//! concrete to drive in tests: a pair of channel-backed sessions wrapping a
//! `tokio::sync::mpsc` pair behind the shared transport trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::ClientError;
use crate::transport::{InputSession, OutputSession, SessionStatistics, Transfer, TransferFrom};

#[derive(Default)]
struct StatsInner {
    transfers: AtomicU64,
    frames: AtomicU64,
    payload_bytes: AtomicU64,
    errors: AtomicU64,
    drops: AtomicU64,
}

impl StatsInner {
    fn record_transfer(&self, payload: &[Vec<u8>]) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(payload.len().max(1) as u64, Ordering::Relaxed);
        let bytes: usize = payload.iter().map(Vec::len).sum();
        self.payload_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SessionStatistics {
        SessionStatistics {
            transfers: self.transfers.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            payload_bytes: self.payload_bytes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// The client-facing outbound half of a loopback wire.
pub struct LoopbackOutputSession {
    tx: mpsc::Sender<Transfer>,
    stats: Arc<StatsInner>,
}

#[async_trait]
impl OutputSession for LoopbackOutputSession {
    async fn send_until(&self, transfer: Transfer, deadline: Instant) -> Result<bool, ClientError> {
        let payload_stats = transfer.fragmented_payload.clone();
        let accepted = match tokio::time::timeout_at(deadline.into(), self.tx.send(transfer)).await {
            Ok(Ok(())) => true,
            // The peer dropped its receiver: the transport has nothing left
            // to accept the send into. Treat it the same as a deadline miss.
            Ok(Err(_)) => false,
            Err(_elapsed) => false,
        };
        if accepted {
            self.stats.record_transfer(&payload_stats);
        } else {
            self.stats.drops.fetch_add(1, Ordering::Relaxed);
        }
        Ok(accepted)
    }

    fn sample_statistics(&self) -> SessionStatistics {
        self.stats.snapshot()
    }
}

/// The client-facing inbound half of a loopback wire.
pub struct LoopbackInputSession {
    rx: Mutex<mpsc::Receiver<TransferFrom>>,
    stats: Arc<StatsInner>,
}

#[async_trait]
impl InputSession for LoopbackInputSession {
    async fn receive_until(&self, deadline: Instant) -> Result<Option<TransferFrom>, ClientError> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout_at(deadline.into(), rx.recv()).await {
            Ok(Some(transfer)) => {
                self.stats.record_transfer(&transfer.fragmented_payload);
                Ok(Some(transfer))
            }
            // Peer closed: nothing more will ever arrive, which for our
            // purposes is indistinguishable from "nothing arrived by the
            // deadline" as far as the receiver loop is concerned.
            Ok(None) => Ok(None),
            Err(_elapsed) => Ok(None),
        }
    }

    fn sample_statistics(&self) -> SessionStatistics {
        self.stats.snapshot()
    }
}

/// The far end of a loopback wire, controlled by a test harness or the demo
/// binary's fake server to play the role of the remote node.
pub struct LoopbackPeer {
    pub requests: mpsc::Receiver<Transfer>,
    pub responses: mpsc::Sender<TransferFrom>,
}

/// A fresh loopback wire: one [`LoopbackOutputSession`] / [`LoopbackInputSession`]
/// pair for the client, and a [`LoopbackPeer`] for whatever stands in for the
/// remote server.
pub struct LoopbackWire {
    pub client_output: LoopbackOutputSession,
    pub client_input: LoopbackInputSession,
    pub peer: LoopbackPeer,
}

/// Build a loopback wire with the given channel capacity.
pub fn wire(capacity: usize) -> LoopbackWire {
    let (req_tx, req_rx) = mpsc::channel(capacity);
    let (resp_tx, resp_rx) = mpsc::channel(capacity);
    LoopbackWire {
        client_output: LoopbackOutputSession {
            tx: req_tx,
            stats: Arc::new(StatsInner::default()),
        },
        client_input: LoopbackInputSession {
            rx: Mutex::new(resp_rx),
            stats: Arc::new(StatsInner::default()),
        },
        peer: LoopbackPeer {
            requests: req_rx,
            responses: resp_tx,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Priority;

    #[tokio::test]
    async fn send_then_receive_round_trips_a_transfer() {
        let w = wire(4);
        let deadline = Instant::now() + std::time::Duration::from_millis(100);
        let sent = w
            .client_output
            .send_until(
                Transfer {
                    timestamp: Instant::now(),
                    priority: Priority::Nominal,
                    transfer_id: 7,
                    fragmented_payload: vec![b"hello".to_vec()],
                },
                deadline,
            )
            .await
            .unwrap();
        assert!(sent);

        let mut peer = w.peer;
        let req = peer.requests.recv().await.unwrap();
        assert_eq!(req.transfer_id, 7);

        peer.responses
            .send(TransferFrom {
                timestamp: Instant::now(),
                priority: Priority::Nominal,
                transfer_id: 7,
                source_node_id: 42,
                fragmented_payload: vec![b"world".to_vec()],
            })
            .await
            .unwrap();

        let got = w
            .client_input
            .receive_until(Instant::now() + std::time::Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(got.unwrap().transfer_id, 7);
    }

    #[tokio::test]
    async fn receive_until_times_out_with_nothing_pending() {
        let w = wire(4);
        let got = w
            .client_input
            .receive_until(Instant::now() + std::time::Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }
}
