//! HTTP handlers, one module per resource.

pub mod assets;
pub mod connectors;
pub mod contracts;
pub mod health;
pub mod policies;
pub mod transfers;
