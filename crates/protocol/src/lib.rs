//! Wire types for the Chrome DevTools Protocol.
//!
//! This crate contains the serde-serializable types used for communication
//! with a Chromium instance over its WebSocket debugging endpoint. These
//! types represent the "protocol layer" - the shapes of data as they appear
//! on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * 1:1 with protocol: Match the CDP JSON message framing
//! * Stable: Changes only when the wire protocol changes
//!
//! Higher-level ergonomic APIs are built on top of these types in `vv-rs`.

pub mod message;
pub mod payload;

pub use message::*;
pub use payload::*;
