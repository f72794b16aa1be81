//! Core of the agent intent coordinator.
//!
//! Houses the three pieces of authoritative state and the state machine
//! over them: the per-user nonce tracker, the intent store, and the
//! lifecycle coordinator that guards every transition. Also provides the
//! creator-side submitter (signing plus bounded stale-nonce retry) and the
//! builder that wires the coordinator from configuration.

pub mod builder;
pub mod coordinator;
pub mod nonce;
pub mod store;
pub mod submitter;

pub use builder::{BuildError, CoordinatorBuilder};
pub use coordinator::{CreateIntentRequest, IntentCoordinator};
pub use nonce::NonceTracker;
pub use store::IntentStore;
pub use submitter::{IntentSubmitter, SubmitError};
