#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

/// The bridge itself: listener lifecycle, the single client, and forwarding between it and the UART.
pub mod bridge;

/// Host scheduling: components are set up once and then ticked forever.
pub mod component;

/// Network readiness.
pub mod network;

/// Listening for and talking to clients.
pub mod transport;

/// Serial port access.
pub mod uart;

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;
