//! Statistics maintained at the hidden `ClientImpl`.
//!
//! Counters are never atomics: every mutation happens under the same
//! [`tokio::sync::Mutex`] that guards the pending table, so plain `u64`
//! fields suffice — there is always a single logical owner of the counters
//! at a time, enforced by that mutex.

use serde::{Deserialize, Serialize};

use crate::transport::SessionStatistics;

/// Counters private to one `ClientImpl`, incremented as calls and inbound
/// transfers are processed. Monotonically non-decreasing for the lifetime
/// of the impl.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StatsCounters {
    pub sent_requests: u64,
    pub unsent_requests: u64,
    pub deserialization_failures: u64,
    pub unexpected_responses: u64,
}

/// A point-in-time snapshot of a client port's statistics, combining the
/// counters above with the underlying transport sessions' own counters.
/// All clients sharing a session specifier observe the same counters,
/// because they share the same `ClientImpl`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClientStatistics {
    pub request_transport_session: SessionStatistics,
    pub response_transport_session: SessionStatistics,
    pub sent_requests: u64,
    pub unsent_requests: u64,
    pub deserialization_failures: u64,
    pub unexpected_responses: u64,
}
