//! Unix-socket IPC server — operator/admin transport
//!
//! Frames are a 4-byte little-endian length prefix followed by a
//! MessagePack-encoded `LeadlineRequest`; replies use the same framing.
//! Every request routes through the same router as the HTTP API.

use crate::router;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use leadline_core::ipc::{self, LeadlineResponse};
use leadline_core::LeadlineConfig;
use sqlx::PgPool;
use std::path::Path;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

pub async fn run_unix_server(
    socket_path: &str,
    pool: PgPool,
    config: LeadlineConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                let pool = pool.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    serve_connection(stream, pool, config).await;
                });
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

/// Drain one client connection: decode frames, route, write replies.
/// Malformed frames get an error envelope; transport errors end the
/// connection.
async fn serve_connection(stream: UnixStream, pool: PgPool, config: LeadlineConfig) {
    let (read, write) = stream.into_split();
    let le_codec = || LengthDelimitedCodec::builder().little_endian().new_codec();
    let mut framed_read = FramedRead::new(read, le_codec());
    let mut framed_write = FramedWrite::new(write, le_codec());

    while let Some(frame) = framed_read.next().await {
        let bytes_mut = match frame {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Frame error: {}", e);
                break;
            }
        };

        let response = match ipc::decode_request(&bytes_mut) {
            Ok(request) => {
                router::handle_request_with_config(request, &pool, Some(config.clone())).await
            }
            Err(e) => LeadlineResponse::err(e.to_string()),
        };

        match ipc::encode_response(&response) {
            Ok(resp_bytes) => {
                if let Err(e) = framed_write.send(Bytes::from(resp_bytes)).await {
                    tracing::error!("Failed to send response: {}", e);
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                break;
            }
        }
    }
}
