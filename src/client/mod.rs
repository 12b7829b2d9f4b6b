//! The client-side request/response correlation engine.
//!
//! [`client_impl::ClientImpl`] is the shared coordinator; everything else in
//! this module is a piece it owns or delegates to: [`allocator`] hands out
//! transfer IDs, [`pending`] tracks outstanding requests, [`sender`] and
//! [`receiver`] are the two halves of the wire, [`stats`] is the counters
//! both sides touch, and [`proxy`] is the handle a caller actually holds.

pub mod allocator;
pub mod client_impl;
pub mod pending;
pub mod proxy;
pub mod receiver;
pub mod sender;
pub mod stats;
