//! Wire protocol: one JSON `Message` per TCP connection.

pub mod messages;
pub mod transport;

pub use messages::{Message, MessageType};
pub use transport::{
	dial_and_exchange, dial_and_read_raw, dial_and_send, is_peer_alive, probe_peer, read_one_message, write_and_close,
	write_ndjson_and_close,
};
