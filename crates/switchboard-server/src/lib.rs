//! # switchboard-server
//!
//! Axum HTTP + `WebSocket` front end for the signaling relay.
//!
//! - `WebSocket` adapter at `/ws/{room_id}/{participant_id}`: join on connect,
//!   relay every frame, leave on disconnect
//! - Room management REST surface under `/v1/rtc/room`
//! - SDP offer companion at `/webrtc/offer`
//! - Health, Prometheus metrics, heartbeat and graceful shutdown via
//!   `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod offer;
pub mod rest;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use server::{AppState, SwitchboardServer};
