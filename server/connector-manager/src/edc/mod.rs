//! EDC Management API plumbing: URL/auth handling and JSON-LD payloads.

pub mod client;
pub mod payload;

pub use client::EdcClient;
