//! graphdb-client - A lightweight asynchronous graph traversal client implemented in Rust
//!
//! This crate provides the client-side transport and session layer for a
//! remote graph service: building traversal requests, serializing them over
//! a persistent connection, correlating asynchronous response batches, and
//! surfacing typed results.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod core;
pub mod message;
pub mod stream;
pub mod tracker;
pub mod traversal;
pub mod utils;

pub use client::GraphClient;
pub use config::ClientConfig;
pub use connection::ConnectionState;
pub use core::error::{ClientError, ClientResult};
pub use core::{Edge, Value, Vertex};
pub use stream::ResultStream;
pub use traversal::GraphTraversal;
