//! The pending-request table: transfer-id-modulo → one-shot completion slot.
//!
//! Keys are unique; inserting an already-present key is a programmer-visible
//! failure one layer up ([`crate::error::ClientError::RequestTransferIdVariabilityExhausted`]).
//! Every slot inserted by a `call` is removed by that same call on every
//! exit path — see [`crate::client::client_impl::ClientImpl::call`] for how
//! that is enforced even across cancellation.

use std::collections::HashMap;

use tokio::sync::oneshot;

use crate::error::ClientError;
use crate::transport::TransferMetadata;

/// What a completion slot resolves to: either the deserialized response
/// plus its metadata, or a failure raised by the receiver's termination
/// path.
pub type PendingOutcome<Response> = Result<(Response, TransferMetadata), ClientError>;

/// Maps transfer-ID (already folded modulo the transport's TID space) to the
/// one-shot sender a caller is awaiting the other end of.
pub(crate) struct PendingTable<Response> {
    slots: HashMap<u64, oneshot::Sender<PendingOutcome<Response>>>,
}

impl<Response> PendingTable<Response> {
    pub fn new() -> Self {
        Self { slots: HashMap::new() }
    }

    pub fn contains(&self, transfer_id: u64) -> bool {
        self.slots.contains_key(&transfer_id)
    }

    /// Insert a fresh slot at `transfer_id`, returning the receiving half.
    /// Caller must have already checked [`Self::contains`].
    pub fn insert(&mut self, transfer_id: u64) -> oneshot::Receiver<PendingOutcome<Response>> {
        let (tx, rx) = oneshot::channel();
        self.slots.insert(transfer_id, tx);
        rx
    }

    /// Remove the slot at `transfer_id`, if any. A no-op if it is already
    /// gone (e.g. the receiver task already completed and removed it).
    pub fn remove(&mut self, transfer_id: u64) {
        self.slots.remove(&transfer_id);
    }

    /// Remove and complete the slot at `transfer_id` with `outcome`. Returns
    /// `false` if no slot was present (an unexpected response).
    pub fn complete(&mut self, transfer_id: u64, outcome: PendingOutcome<Response>) -> bool {
        match self.slots.remove(&transfer_id) {
            Some(tx) => {
                // The caller may have already timed out and stopped polling
                // its receiver; a dropped receiver is not an error here.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drain every remaining slot, completing each with a clone of `err`.
    /// Used once, from the receiver's termination path.
    pub fn drain_with(&mut self, err: ClientError) {
        for (_, tx) in self.slots.drain() {
            let _ = tx.send(Err(err.clone()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The transfer IDs currently occupied. Used only for diagnostics (log
    /// lines on an unexpected response) and tests.
    pub fn keys(&self) -> Vec<u64> {
        self.slots.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_complete_delivers_to_receiver() {
        let mut table: PendingTable<u32> = PendingTable::new();
        assert!(!table.contains(7));
        let rx = table.insert(7);
        assert!(table.contains(7));

        let meta = TransferMetadata {
            timestamp: std::time::Instant::now(),
            priority: crate::transport::Priority::Nominal,
            transfer_id: 7,
            source_node_id: 1,
        };
        assert!(table.complete(7, Ok((99, meta))));
        assert!(!table.contains(7));

        let (value, _meta) = rx.await.unwrap().unwrap();
        assert_eq!(value, 99);
    }

    #[test]
    fn complete_on_absent_key_returns_false() {
        let mut table: PendingTable<u32> = PendingTable::new();
        let meta = TransferMetadata {
            timestamp: std::time::Instant::now(),
            priority: crate::transport::Priority::Nominal,
            transfer_id: 42,
            source_node_id: 1,
        };
        assert!(!table.complete(42, Ok((1, meta))));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut table: PendingTable<u32> = PendingTable::new();
        let _rx = table.insert(3);
        table.remove(3);
        table.remove(3); // no panic, no-op
        assert!(!table.contains(3));
    }

    #[tokio::test]
    async fn drain_with_completes_every_remaining_slot() {
        let mut table: PendingTable<u32> = PendingTable::new();
        let rx_a = table.insert(1);
        let rx_b = table.insert(2);
        table.drain_with(ClientError::port_closed("test"));
        assert!(table.is_empty());
        assert!(rx_a.await.unwrap().is_err());
        assert!(rx_b.await.unwrap().is_err());
    }
}
