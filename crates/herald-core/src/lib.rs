//! # herald-core
//!
//! Types shared by every herald crate.
//!
//! - [`SubscriberId`]: identity of one push channel
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;

pub use ids::SubscriberId;
pub use logging::{LogFormat, init_subscriber};
