//! # UAVCAN Client Port Demo
//!
//! A small standalone program that wires an in-memory loopback transport
//! between a fake server task and a [`uavcan_client::client::proxy::Client`],
//! then issues a handful of requests against it. It exists so the engine in
//! [`uavcan_client::client`] can be exercised end-to-end without a real
//! UAVCAN transport or DSDL toolchain.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use uavcan_client::client::allocator::{ModulusSource, TransferIdCounter};
use uavcan_client::client::client_impl::ClientImpl;
use uavcan_client::client::proxy::Client;
use uavcan_client::cli::DemoArgs;
use uavcan_client::dsdl::{BincodeCodec, ServiceType};
use uavcan_client::transport::{loopback, SessionSpecifier};
use uavcan_client::{logging, Priority};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PingRequest {
    value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PingResponse {
    echo: u64,
}

struct Ping;

impl ServiceType for Ping {
    type Request = PingRequest;
    type Response = PingResponse;
    const SERVICE_ID: u16 = 1;
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = DemoArgs::parse();
    let _log_guard = logging::init(args.verbose, args.quiet, std::path::Path::new("."));

    info!("Starting UAVCAN client port demo");

    let session_specifier = SessionSpecifier {
        service_id: args.service_id,
        server_node_id: args.server_node_id,
    };

    let wire = loopback::wire(16);
    let mut peer = wire.peer;
    let codec = BincodeCodec;

    // Fake server: echoes every request's `value` back as `echo`, under the
    // same transfer ID it arrived on.
    let server_task = tokio::spawn(async move {
        while let Some(transfer) = peer.requests.recv().await {
            let request: PingRequest =
                match bincode::deserialize(&transfer.fragmented_payload.concat()) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
            let response = PingResponse { echo: request.value };
            let bytes = bincode::serialize(&response).unwrap_or_default();
            let sent = peer
                .responses
                .send(uavcan_client::TransferFrom {
                    timestamp: std::time::Instant::now(),
                    priority: Priority::Nominal,
                    transfer_id: transfer.transfer_id,
                    source_node_id: session_specifier.server_node_id,
                    fragmented_payload: vec![bytes],
                })
                .await;
            if sent.is_err() {
                break;
            }
        }
    });

    let impl_ = ClientImpl::<Ping, BincodeCodec>::new(
        session_specifier,
        codec,
        Arc::new(wire.client_output),
        Arc::new(wire.client_input),
        TransferIdCounter::new(),
        ModulusSource::fixed(args.transfer_id_modulo),
        Box::new(|_sessions| {
            info!("client port closed, transport sessions returned");
        }),
    );

    let mut client = Client::new(Arc::clone(&impl_))?;
    client.set_response_timeout(Duration::from_millis(args.response_timeout_ms))?;

    for i in 0..args.requests {
        let request = PingRequest { value: i as u64 };
        match client.call(request).await {
            Ok(Some((response, metadata))) => {
                info!(
                    transfer_id = metadata.transfer_id,
                    echo = response.echo,
                    "received response"
                );
            }
            Ok(None) => error!(i, "request timed out or was not accepted"),
            Err(err) => {
                error!(i, error = %err, "call failed");
                break;
            }
        }
    }

    let stats = client.sample_statistics().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        info!(?stats, "final statistics");
    }

    client.close();
    drop(client);
    server_task.abort();

    info!("UAVCAN client port demo completed successfully");
    Ok(())
}
