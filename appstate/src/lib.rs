//! Application state for the feature cache service.
//!
//! This crate provides the central `AppState` struct that wires the request
//! path together and implements the `AppStateProvider` trait from `common`.
//!
//! # Architecture
//!
//! `appstate` sits between the infrastructure crates and the transport layer:
//!
//! ```text
//! Transport Layer (api)
//!          ↓
//!     appstate (this crate)
//!          ↓
//! Infrastructure (storage, feature-detector)
//! ```
//!
//! # Components
//!
//! - [`ReadinessGate`]: warm-up state, consulted before any work
//! - [`ContentCache`]: fingerprint-keyed results over the durable store
//! - [`InFlightCoordinator`]: at most one detector run per fingerprint
//! - [`AuditLog`]: background writer for the request log
//! - [`AppState`]: the request handler tying them together

pub mod audit;
pub mod cache;
pub mod inflight;
pub mod readiness;
pub mod state;

pub use audit::AuditLog;
pub use cache::ContentCache;
pub use inflight::{Claim, InFlightCoordinator, LeaderTicket, Subscription};
pub use readiness::{spawn_warmup, ReadinessGate};
pub use state::{AppState, AppStateConfig, PROCESS_ENDPOINT};
