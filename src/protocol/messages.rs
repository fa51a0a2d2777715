//! Wire message type. Field names are exact; unknown fields are
//! ignored on receipt for forward compatibility.

use serde::{Deserialize, Serialize};

use crate::types::FileNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
	#[serde(rename = "LIST")]
	List,
	#[serde(rename = "REQUEST_FILE")]
	RequestFile,
	#[serde(rename = "TRANSFER")]
	Transfer,
	#[serde(rename = "DELETE")]
	Delete,
	#[serde(rename = "SYNC")]
	Sync,
	#[serde(rename = "ERROR")]
	Error,
}

/// The single message shape carried over every connection. Unused
/// fields are omitted from the wire via `skip_serializing_if`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	#[serde(rename = "type")]
	pub kind: MessageType,
	pub from: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub file_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes::opt")]
	pub data: Option<Vec<u8>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub file_tree: Option<FileNode>,
	#[serde(default)]
	pub timestamp: i64,
}

impl Message {
	pub fn list_request(from: impl Into<String>) -> Self {
		Message { kind: MessageType::List, from: from.into(), file_name: None, data: None, file_tree: None, timestamp: 0 }
	}

	pub fn list_response(from: impl Into<String>, file_tree: FileNode) -> Self {
		Message {
			kind: MessageType::List,
			from: from.into(),
			file_name: None,
			data: None,
			file_tree: Some(file_tree),
			timestamp: 0,
		}
	}

	pub fn request_file(from: impl Into<String>, file_name: impl Into<String>) -> Self {
		Message {
			kind: MessageType::RequestFile,
			from: from.into(),
			file_name: Some(file_name.into()),
			data: None,
			file_tree: None,
			timestamp: 0,
		}
	}

	pub fn transfer(from: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>, timestamp: i64) -> Self {
		Message {
			kind: MessageType::Transfer,
			from: from.into(),
			file_name: Some(file_name.into()),
			data: Some(data),
			file_tree: None,
			timestamp,
		}
	}

	pub fn delete(from: impl Into<String>, file_name: impl Into<String>, timestamp: i64) -> Self {
		Message {
			kind: MessageType::Delete,
			from: from.into(),
			file_name: Some(file_name.into()),
			data: None,
			file_tree: None,
			timestamp,
		}
	}

	pub fn sync_request(from: impl Into<String>, since: i64) -> Self {
		Message { kind: MessageType::Sync, from: from.into(), file_name: None, data: None, file_tree: None, timestamp: since }
	}

	pub fn error(from: impl Into<String>, file_name: impl Into<String>, reason: impl Into<String>) -> Self {
		Message {
			kind: MessageType::Error,
			from: from.into(),
			file_name: Some(file_name.into()),
			data: Some(reason.into().into_bytes()),
			file_tree: None,
			timestamp: 0,
		}
	}
}

/// `data` is a byte payload; `serde_json` has no native bytes type, so
/// it travels as base64 text the way Go's `encoding/json` auto-encodes
/// a `[]byte` field.
mod base64_bytes {
	use base64::Engine;
	use serde::{Deserialize, Deserializer, Serializer};

	pub mod opt {
		use super::*;

		pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(bytes) => {
					let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
					serializer.serialize_str(&encoded)
				}
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
		where
			D: Deserializer<'de>,
		{
			let opt = Option::<String>::deserialize(deserializer)?;
			match opt {
				Some(s) => base64::engine::general_purpose::STANDARD
					.decode(s)
					.map(Some)
					.map_err(serde::de::Error::custom),
				None => Ok(None),
			}
		}
	}
}
