//! # meshsync: a small peer-to-peer file-sharing mesh
//!
//! Each node exposes a local directory to a fixed, small set of peers
//! over long-unused, short-lived TCP connections. Nodes list, fetch,
//! push, and delete files across the mesh and stay eventually
//! consistent through reconnections via a differential
//! synchronization triggered on every detected up-edge.
//!
//! This crate is the node runtime only. Bootstrap/discovery of peer
//! addresses and any graphical front end are out of scope; see
//! `main.rs` for a thin CLI that plays the role of that external
//! caller.

#![deny(unsafe_code)]
#![warn(dead_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod logging;
pub mod monitor;
pub mod node;
pub mod oplog;
pub mod protocol;
pub mod reconcile;
pub mod retry;
pub mod send;
pub mod state;
pub mod time;
pub mod tree;
pub mod types;
pub mod validation;

pub use error::{MeshError, MeshResult};
pub use node::{Node, NodeContext};

// vim: ts=4
