//! One message per TCP connection. Accept-side reads to EOF and
//! parses one JSON object; dial-side writes one object, half-closes
//! for write, then reads the reply to EOF.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::MeshError;
use crate::protocol::Message;

/// Maximum size of a single wire message. Larger payloads fail rather
/// than being accepted partially.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const ALIVE_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// Read an accepted connection to EOF and parse it as a `Message`.
/// An empty payload is a bare liveness probe: returns `Ok(None)` so
/// the caller can close silently rather than logging a protocol
/// error.
pub async fn read_one_message(stream: &mut TcpStream) -> Result<Option<Message>, MeshError> {
	let mut buf = Vec::new();
	let mut limited = stream.take(MAX_MESSAGE_BYTES as u64 + 1);
	limited.read_to_end(&mut buf).await?;

	if buf.len() > MAX_MESSAGE_BYTES {
		return Err(MeshError::Protocol { message: "message exceeds 1 MiB limit".to_string() });
	}
	if buf.is_empty() {
		return Ok(None);
	}
	let msg: Message = serde_json::from_slice(&buf)?;
	Ok(Some(msg))
}

/// Write one `Message` to an accepted connection and half-close the
/// write side so the peer's `read_to_end` observes EOF.
pub async fn write_and_close(stream: &mut TcpStream, msg: &Message) -> Result<(), MeshError> {
	let bytes = serde_json::to_vec(msg)?;
	stream.write_all(&bytes).await?;
	stream.shutdown().await?;
	Ok(())
}

/// Dial `addr`, send `msg`, half-close, and read the single-message
/// reply. Used by every client-initiated exchange except SYNC, whose
/// reply is an NDJSON stream rather than one `Message`.
pub async fn dial_and_exchange(addr: &str, msg: &Message) -> Result<Message, MeshError> {
	let raw = dial_and_read_raw(addr, msg).await?;
	let reply: Message = serde_json::from_slice(&raw)?;
	Ok(reply)
}

/// Dial `addr`, send `msg`, half-close, and return the raw reply
/// bytes without parsing, used for SYNC's NDJSON response.
pub async fn dial_and_read_raw(addr: &str, msg: &Message) -> Result<Vec<u8>, MeshError> {
	let mut stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr))
		.await
		.map_err(|_| MeshError::PeerUnavailable { address: addr.to_string() })?
		.map_err(|_| MeshError::PeerUnavailable { address: addr.to_string() })?;

	let bytes = serde_json::to_vec(msg)?;
	stream.write_all(&bytes).await?;
	stream.shutdown().await?;

	let mut buf = Vec::new();
	stream.read_to_end(&mut buf).await?;
	Ok(buf)
}

/// A 1 s reachability probe: dial and close without writing anything
/// (an empty payload is how the peer interprets a probe).
pub async fn probe_peer(addr: &str) -> bool {
	matches!(tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// A 500 ms liveness check, the tighter budget the GUI collaborator
/// uses before attempting a user-initiated action.
pub async fn is_peer_alive(addr: &str) -> bool {
	matches!(tokio::time::timeout(ALIVE_CHECK_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Dial, write one message, half-close, and return without reading a
/// reply. Used for the "push" message kinds (TRANSFER, DELETE) whose
/// protocol table entry lists no response.
pub async fn dial_and_send(addr: &str, msg: &Message) -> Result<(), MeshError> {
	let mut stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr))
		.await
		.map_err(|_| MeshError::PeerUnavailable { address: addr.to_string() })?
		.map_err(|_| MeshError::PeerUnavailable { address: addr.to_string() })?;

	let bytes = serde_json::to_vec(msg)?;
	stream.write_all(&bytes).await?;
	stream.shutdown().await?;
	Ok(())
}

/// Write a SYNC reply as NDJSON (one `Operation` per line) and close.
/// The client-side counterpart reads the connection to EOF and splits
/// on `\n`; there is no message framing beyond the line terminator.
pub async fn write_ndjson_and_close(stream: &mut TcpStream, ops: &[crate::types::Operation]) -> Result<(), MeshError> {
	let mut buf = Vec::new();
	for op in ops {
		serde_json::to_writer(&mut buf, op)?;
		buf.push(b'\n');
	}
	stream.write_all(&buf).await?;
	stream.shutdown().await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::MessageType;
	use tokio::net::TcpListener;

	#[tokio::test]
	async fn round_trip_list_request_response() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let server = tokio::spawn(async move {
			let (mut stream, _) = listener.accept().await.unwrap();
			let msg = read_one_message(&mut stream).await.unwrap().unwrap();
			assert_eq!(msg.kind, MessageType::List);
			let reply = Message::list_response("responder", crate::types::FileNode::empty_dir("shared", 0));
			write_and_close(&mut stream, &reply).await.unwrap();
		});

		let reply = dial_and_exchange(&addr.to_string(), &Message::list_request("dialer")).await.unwrap();
		assert_eq!(reply.kind, MessageType::List);
		assert!(reply.file_tree.is_some());
		server.await.unwrap();
	}

	#[tokio::test]
	async fn empty_payload_is_treated_as_probe() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		let server = tokio::spawn(async move {
			let (mut stream, _) = listener.accept().await.unwrap();
			let msg = read_one_message(&mut stream).await.unwrap();
			assert!(msg.is_none());
		});

		let stream = TcpStream::connect(addr).await.unwrap();
		drop(stream);
		server.await.unwrap();
	}

	#[tokio::test]
	async fn probe_peer_false_when_nothing_listening() {
		let alive = probe_peer("127.0.0.1:1").await;
		assert!(!alive);
	}
}
