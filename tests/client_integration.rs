//! Black-box integration tests driving `uavcan_client::client` end-to-end
//! over the bundled loopback transport, covering the scenarios a UAVCAN
//! client port must get right: correlated happy-path delivery, timeouts,
//! transfer-ID exhaustion, unexpected responses, refcounted shutdown, and
//! concurrent callers sharing one session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use uavcan_client::client::allocator::{ModulusSource, TransferIdCounter};
use uavcan_client::client::client_impl::ClientImpl;
use uavcan_client::client::proxy::Client;
use uavcan_client::dsdl::{BincodeCodec, ServiceType};
use uavcan_client::transport::loopback;
use uavcan_client::{ClientError, Priority, SessionSpecifier, TransferFrom};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct EchoRequest {
    value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct EchoResponse {
    value: u64,
}

struct Echo;

impl ServiceType for Echo {
    type Request = EchoRequest;
    type Response = EchoResponse;
    const SERVICE_ID: u16 = 7;
}

fn session_specifier() -> SessionSpecifier {
    SessionSpecifier { service_id: Echo::SERVICE_ID, server_node_id: 99 }
}

fn new_impl(modulo: u64) -> (Arc<ClientImpl<Echo, BincodeCodec>>, loopback::LoopbackPeer, Arc<AtomicBool>) {
    let wire = loopback::wire(16);
    let finalized = Arc::new(AtomicBool::new(false));
    let finalized_flag = Arc::clone(&finalized);
    let impl_ = ClientImpl::new(
        session_specifier(),
        BincodeCodec,
        Arc::new(wire.client_output),
        Arc::new(wire.client_input),
        TransferIdCounter::new(),
        ModulusSource::fixed(modulo),
        Box::new(move |_sessions| {
            finalized_flag.store(true, Ordering::SeqCst);
        }),
    );
    (impl_, wire.peer, finalized)
}

async fn respond(peer: &mut loopback::LoopbackPeer, value: u64) {
    let request = peer.requests.recv().await.expect("server saw no request");
    let response = EchoResponse { value };
    let bytes = bincode::serialize(&response).unwrap();
    peer.responses
        .send(TransferFrom {
            timestamp: std::time::Instant::now(),
            priority: Priority::Nominal,
            transfer_id: request.transfer_id,
            source_node_id: session_specifier().server_node_id,
            fragmented_payload: vec![bytes],
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn happy_path_delivers_matching_response() {
    let (impl_, mut peer, _finalized) = new_impl(32);
    let client = Client::new(Arc::clone(&impl_)).unwrap();

    let server = tokio::spawn(async move {
        respond(&mut peer, 7).await;
    });

    let result = client
        .call(EchoRequest { value: 7 })
        .await
        .expect("call should not error");
    let (response, _metadata) = result.expect("expected a response before the timeout");
    assert_eq!(response.value, 7);

    server.await.unwrap();
    let stats = client.sample_statistics().await;
    assert_eq!(stats.sent_requests, 1);
    assert_eq!(stats.unexpected_responses, 0);
}

#[tokio::test]
async fn call_times_out_when_no_response_arrives() {
    let (impl_, _peer, _finalized) = new_impl(32);
    let mut client = Client::new(Arc::clone(&impl_)).unwrap();
    client.set_response_timeout(Duration::from_millis(30)).unwrap();

    // Nothing ever reads from `peer.requests` or sends a response back.
    let result = client.call(EchoRequest { value: 1 }).await.unwrap();
    assert!(result.is_none());

    let stats = client.sample_statistics().await;
    assert_eq!(stats.sent_requests, 1);
}

#[tokio::test]
async fn transfer_id_exhaustion_is_reported_as_an_error() {
    let (impl_, _peer, _finalized) = new_impl(2);
    let mut client = Client::new(Arc::clone(&impl_)).unwrap();
    client.set_response_timeout(Duration::from_secs(5)).unwrap();

    // Two concurrent calls occupy both transfer IDs in the modulus-2 space;
    // neither is ever answered, so both remain pending.
    let c1 = Arc::clone(&impl_);
    let c2 = Arc::clone(&impl_);
    let first = tokio::spawn(async move { c1.call(EchoRequest { value: 1 }, Priority::Nominal, Duration::from_secs(5)).await });
    let second = tokio::spawn(async move { c2.call(EchoRequest { value: 2 }, Priority::Nominal, Duration::from_secs(5)).await });

    // Give both calls a chance to register their pending slots before the
    // third call observes the table.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let third = client.call(EchoRequest { value: 3 }).await;
    assert!(matches!(third, Err(ClientError::RequestTransferIdVariabilityExhausted(_))));

    first.abort();
    second.abort();
}

#[tokio::test]
async fn unexpected_response_is_counted_and_does_not_resolve_a_call() {
    let (impl_, mut peer, _finalized) = new_impl(32);
    let mut client = Client::new(Arc::clone(&impl_)).unwrap();
    client.set_response_timeout(Duration::from_millis(50)).unwrap();

    let server = tokio::spawn(async move {
        // Consume the real request so it doesn't show up as a second one,
        // then answer on a transfer ID nobody is waiting on.
        let _ = peer.requests.recv().await.unwrap();
        let bytes = bincode::serialize(&EchoResponse { value: 0 }).unwrap();
        peer.responses
            .send(TransferFrom {
                timestamp: std::time::Instant::now(),
                priority: Priority::Nominal,
                transfer_id: 9999,
                source_node_id: session_specifier().server_node_id,
                fragmented_payload: vec![bytes],
            })
            .await
            .unwrap();
    });

    let result = client.call(EchoRequest { value: 1 }).await.unwrap();
    assert!(result.is_none(), "mismatched transfer ID must not resolve the call");

    server.await.unwrap();
    // Give the receiver task a moment to process the unmatched response.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let stats = client.sample_statistics().await;
    assert_eq!(stats.unexpected_responses, 1);
}

#[tokio::test]
async fn shutdown_runs_finalizer_exactly_once_proxy_count_reaches_zero() {
    let (impl_, _peer, finalized) = new_impl(32);
    let a = Client::new(Arc::clone(&impl_)).unwrap();
    let b = Client::new(Arc::clone(&impl_)).unwrap();
    assert_eq!(impl_.proxy_count(), 2);

    drop(a);
    // One proxy remains: the impl must still be open.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(impl_.proxy_count(), 1);
    assert!(!impl_.is_closed());
    assert!(!finalized.load(Ordering::SeqCst));

    drop(b);
    // The receiver task polls its closed flag on a bounded interval; give it
    // generous headroom well above that bound before asserting.
    for _ in 0..50 {
        if finalized.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(impl_.is_closed());
    assert!(finalized.load(Ordering::SeqCst), "finalizer must run once all proxies are gone");
}

#[tokio::test]
async fn concurrent_callers_sharing_one_impl_get_distinct_transfer_ids() {
    // Three tasks sharing one `ClientImpl` (standing in for three proxies'
    // `call`s, which all forward to the same impl) must never collide on a
    // transfer ID even though they race to acquire the send mutex.
    let (impl_, mut peer, _finalized) = new_impl(1000);

    let server = tokio::spawn(async move {
        for _ in 0..3 {
            let request = peer.requests.recv().await.unwrap();
            let response = EchoResponse { value: request.transfer_id };
            let bytes = bincode::serialize(&response).unwrap();
            peer.responses
                .send(TransferFrom {
                    timestamp: std::time::Instant::now(),
                    priority: Priority::Nominal,
                    transfer_id: request.transfer_id,
                    source_node_id: session_specifier().server_node_id,
                    fragmented_payload: vec![bytes],
                })
                .await
                .unwrap();
        }
    });

    let callers: Vec<_> = (0..3)
        .map(|i| {
            let impl_ = Arc::clone(&impl_);
            tokio::spawn(async move {
                impl_
                    .call(EchoRequest { value: i }, Priority::Nominal, Duration::from_secs(2))
                    .await
            })
        })
        .collect();

    let mut transfer_ids = Vec::with_capacity(3);
    for caller in callers {
        let outcome = caller.await.unwrap().unwrap().expect("every call should be answered");
        transfer_ids.push(outcome.1.transfer_id);
    }
    server.await.unwrap();

    transfer_ids.sort_unstable();
    transfer_ids.dedup();
    assert_eq!(transfer_ids.len(), 3, "each concurrent call must get a distinct transfer ID");
}
