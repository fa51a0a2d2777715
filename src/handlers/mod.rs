//! Per-message-type handlers and the dispatch that routes an accepted
//! connection to one of them.

pub mod delete;
pub mod list;
pub mod request_file;
pub mod sync;
pub mod transfer;

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::MeshError;
use crate::node::NodeContext;
use crate::protocol::{read_one_message, write_and_close, MessageType};

/// Read one message off an accepted connection and route it. Never
/// returns an error for a malformed or unknown message; those are
/// logged and the connection is simply closed.
pub async fn dispatch(ctx: Arc<NodeContext>, mut stream: TcpStream) -> Result<(), MeshError> {
	let msg = match read_one_message(&mut stream).await {
		Ok(Some(msg)) => msg,
		Ok(None) => return Ok(()), // empty payload: a bare liveness probe
		Err(e) => {
			tracing::warn!(error = %e, "dropping unparseable message");
			return Ok(());
		}
	};

	match msg.kind {
		MessageType::List => {
			let reply = list::handle(&ctx).await;
			write_and_close(&mut stream, &reply).await?;
		}
		MessageType::RequestFile => {
			let reply = request_file::handle(&ctx, &msg).await;
			write_and_close(&mut stream, &reply).await?;
		}
		MessageType::Transfer => {
			transfer::handle(&ctx, &msg).await;
		}
		MessageType::Delete => {
			delete::handle(&ctx, &msg).await;
		}
		MessageType::Sync => {
			sync::handle(&ctx, &msg, &mut stream).await?;
		}
		MessageType::Error => {
			tracing::warn!(peer = %msg.from, "received unsolicited ERROR message, ignoring");
		}
	}

	Ok(())
}
