//! # switchboard-core
//!
//! In-memory room registry backing a WebRTC signaling relay.
//!
//! - [`SessionRegistry`]: room lifecycle (create, get, join, leave) and relay
//! - [`Room`] / [`Participant`]: live membership state guarded per room
//! - [`SendHandle`]: the non-blocking write capability a connection adapter
//!   hands in at join time
//! - [`Payload`]: opaque relayed bytes plus the frame kind they arrived in
//!
//! Every operation is synchronous and never logs. Callers own logging,
//! retries and connection teardown.

#![deny(unsafe_code)]

pub mod errors;
pub mod participant;
pub mod payload;
pub mod registry;
pub mod room;

pub use errors::{DeliveryFailure, FailedDelivery, RegistryError, Result, SendError};
pub use participant::{Participant, SendHandle, SharedHandle};
pub use payload::{FrameKind, Payload};
pub use registry::SessionRegistry;
pub use room::Room;
