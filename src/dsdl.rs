//! DSDL codec interface and a default bincode-based implementation.
//!
//! Serialization of typed payloads is, per the specification, delegated to a
//! DSDL codec external to this crate — real UAVCAN deployments generate
//! per-type codecs from `.dsdl` definitions. [`BincodeCodec`] is a stand-in
//! good enough to exercise [`crate::client`] against any `Serialize` +
//! `Deserialize` request/response pair, using `bincode` for the wire
//! encoding.

use serde::{de::DeserializeOwned, Serialize};

/// A request/response service definition: the thing a DSDL compiler would
/// normally generate from a `.dsdl` file.
pub trait ServiceType: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// The service-ID half of the session specifier.
    const SERVICE_ID: u16;
}

/// Serializes requests and deserializes responses for one [`ServiceType`].
///
/// `try_deserialize_response` returns `None` on structural failure rather
/// than an error: a malformed inbound transfer increments
/// `deserialization_failures` and is otherwise ignored, it never propagates.
pub trait ServiceCodec<T: ServiceType>: Send + Sync {
    fn serialize_request(&self, request: &T::Request) -> Vec<Vec<u8>>;
    fn try_deserialize_response(&self, fragments: &[Vec<u8>]) -> Option<T::Response>;
}

/// A [`ServiceCodec`] built on `bincode`, applicable to any service whose
/// request/response types implement `serde::Serialize`/`DeserializeOwned`.
///
/// Each call produces a single fragment; this is adequate for the loopback
/// transport and the demo binary but says nothing about how a real DSDL
/// codec would split a payload across transport-level frames.
pub struct BincodeCodec;

impl<T> ServiceCodec<T> for BincodeCodec
where
    T: ServiceType,
    T::Request: Serialize,
    T::Response: Serialize + DeserializeOwned,
{
    fn serialize_request(&self, request: &T::Request) -> Vec<Vec<u8>> {
        match bincode::serialize(request) {
            Ok(bytes) => vec![bytes],
            // The bundled codec only fails on non-serializable types, which
            // for `serde`-derived request types should not happen; treat it
            // as an empty payload rather than panicking inside a library call.
            Err(_) => vec![Vec::new()],
        }
    }

    fn try_deserialize_response(&self, fragments: &[Vec<u8>]) -> Option<T::Response> {
        let joined: Vec<u8> = fragments.iter().flatten().copied().collect();
        bincode::deserialize(&joined).ok()
    }
}
