//! Shared types for the agent intent coordinator.
//!
//! This crate defines the domain types used across the coordinator system:
//! addresses and signatures, the intent record and its lifecycle status,
//! transition events, and the closed error taxonomy every operation returns.

pub mod common;
pub mod errors;
pub mod events;
pub mod intent;

pub use common::*;
pub use errors::*;
pub use events::*;
pub use intent::*;
