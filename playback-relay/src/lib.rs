//! # Playback Relay
//!
//! Bridges a cloud command queue and a media renderer on the local network.
//! Messages with the body `PAUSE` or `RESUME` are turned into AVTransport
//! Pause/Play actions on one renderer, found by its friendly name.
//!
//! The building blocks live in their own crates:
//! - `relay_discovery`: SSDP search and device description parsing
//! - `relay_device`: [`DeviceController`](relay_device::DeviceController), a
//!   lazily connected, self-healing handle on one renderer
//! - `relay_queue`: the long-poll [`QueuePoller`](relay_queue::QueuePoller)
//!   and its SQS transport
//!
//! This crate adds the command codec, the handler that connects the two
//! sides, and the command line front end.

pub mod command;
pub mod config;
pub mod handler;
pub mod logging;
pub mod relay;

pub use command::Command;
pub use config::{Cli, Commands, Config};
pub use handler::CommandHandler;
pub use relay::Relay;
