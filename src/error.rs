use std::io;

use thiserror::Error;

/// Errors that may occur in this library.
///
/// Note that the bridge itself never hands these to its host.
/// They are logged where they happen, and the bridge resets its state.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be created.
    #[error("Failed to create socket")]
    Socket(#[source] io::Error),

    /// A socket option could not be applied.
    #[error("Failed to set socket option")]
    SocketOption(#[source] io::Error),

    /// Binding the listening socket failed.
    #[error("Failed to bind socket to port {port}")]
    Bind {
        /// The port we tried to bind.
        port: u16,

        /// The underlying problem.
        #[source]
        source: io::Error,
    },

    /// Listening on the bound socket failed.
    #[error("Failed to listen on port {port}")]
    Listen {
        /// The port we tried to listen on.
        port: u16,

        /// The underlying problem.
        #[source]
        source: io::Error,
    },

    /// A socket could not be put in non-blocking mode.
    #[error("Failed to set non-blocking mode")]
    NonBlocking(#[source] io::Error),

    /// The serial port could not be opened.
    #[error("Could not open serial port at `{path}`")]
    SerialPort {
        /// The path (or COM name) of the port.
        path: String,

        /// The underlying problem.
        #[source]
        source: serialport::Error,
    },

    /// The configuration is not valid.
    #[error("Bad configuration: {0}")]
    BadConfig(String),

    /// IO related errors.
    #[error("Underlying IO problem")]
    Io(#[from] io::Error),

    /// The configuration file is not valid RON.
    #[error("Could not parse configuration")]
    Ron(#[from] ron::error::SpannedError),
}

impl Error {
    /// The problem description, if this is a [`Error::BadConfig`].
    pub fn try_into_bad_config(self) -> Option<String> {
        match self {
            Error::BadConfig(problem) => Some(problem),
            _ => None,
        }
    }
}
