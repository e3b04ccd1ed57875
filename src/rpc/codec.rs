//! `RpcCodec` — encodes [`RequestEnvelope`]/[`ResponseEnvelope`] as one JSON
//! document per [`crate::transport`] frame. Reads one framed message,
//! deserializes it, and dispatches by the envelope's `method` string.

use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::RpcError;
use crate::rpc::envelope::{generate_id, RequestEnvelope, ResponseEnvelope};
use crate::transport;

/// Peer side of [`send_request`]: reads one request frame off `stream` and
/// returns it as a [`RequestEnvelope`] the caller can dispatch on.
pub async fn recv_request(stream: &mut TcpStream) -> Result<RequestEnvelope, RpcError> {
    let payload = transport::recv_frame(stream).await?;
    serde_json::from_slice(&payload).map_err(|e| RpcError::MalformedEnvelope(e.to_string()))
}

/// Writes a response frame carrying `result`, echoing `id`.
pub async fn send_response<R: Serialize>(
    stream: &mut TcpStream,
    id: serde_json::Value,
    result: R,
) -> Result<(), RpcError> {
    let envelope = ResponseEnvelope::new(id, result)?;
    transport::send_frame(stream, &envelope.to_bytes()?).await?;
    Ok(())
}

/// Writes a server-pushed frame carrying `result` with no `id`.
pub async fn send_push<R: Serialize>(stream: &mut TcpStream, result: R) -> Result<(), RpcError> {
    let envelope = ResponseEnvelope::push(result)?;
    transport::send_frame(stream, &envelope.to_bytes()?).await?;
    Ok(())
}

/// Sends a one-shot RPC request to `addr`: opens a connection, sends the
/// request, reads exactly one response frame, verifies the echoed `id`, and
/// closes the connection before returning `result`.
pub async fn call<P, R>(addr: impl ToSocketAddrs, method: &str, params: P) -> Result<R, RpcError>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let mut stream = TcpStream::connect(addr).await.map_err(crate::error::TransportError::from)?;
    let id = generate_id();
    let request = RequestEnvelope::new(method, params, id.clone())?;
    transport::send_frame(&mut stream, &request.to_bytes()?).await?;

    let payload = transport::recv_frame(&mut stream).await?;
    let response: ResponseEnvelope =
        serde_json::from_slice(&payload).map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;

    match &response.id {
        Some(got) if *got == id => {}
        Some(got) => {
            return Err(RpcError::ProtocolMismatch { expected: id, got: got.clone() });
        }
        None => {
            return Err(RpcError::ProtocolMismatch { expected: id, got: serde_json::Value::Null });
        }
    }
    debug!(method, "received rpc response");
    response.result_as()
}

/// Opens a long-lived stream connection to `addr`: sends the request, reads
/// the single acknowledgement frame, and returns the still-open connection
/// for subsequent server-pushed frames. Used only by `OpenStream`.
pub async fn open_stream_request<P: Serialize>(
    addr: impl ToSocketAddrs,
    method: &str,
    params: P,
) -> Result<TcpStream, RpcError> {
    let mut stream = TcpStream::connect(addr).await.map_err(crate::error::TransportError::from)?;
    let id = generate_id();
    let request = RequestEnvelope::new(method, params, id.clone())?;
    transport::send_frame(&mut stream, &request.to_bytes()?).await?;

    let payload = transport::recv_frame(&mut stream).await?;
    let response: ResponseEnvelope =
        serde_json::from_slice(&payload).map_err(|e| RpcError::MalformedEnvelope(e.to_string()))?;
    match &response.id {
        Some(got) if *got == id => Ok(stream),
        Some(got) => Err(RpcError::ProtocolMismatch { expected: id, got: got.clone() }),
        None => Err(RpcError::ProtocolMismatch { expected: id, got: serde_json::Value::Null }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn call_round_trips_result_and_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = recv_request(&mut stream).await.unwrap();
            assert_eq!(request.method, "Echo");
            send_response(&mut stream, request.id, serde_json::json!({"ok": true})).await.unwrap();
        });

        let result: serde_json::Value = call(addr, "Echo", serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"ok": true}));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn call_rejects_mismatched_response_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _request = recv_request(&mut stream).await.unwrap();
            send_response(&mut stream, serde_json::json!("not-the-request-id"), serde_json::json!({}))
                .await
                .unwrap();
        });

        let result: Result<serde_json::Value, RpcError> = call(addr, "Echo", serde_json::json!({})).await;
        assert!(matches!(result, Err(RpcError::ProtocolMismatch { .. })));
        server.await.unwrap();
    }
}
