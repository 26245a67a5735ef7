use std::{
    io::{Read, Write},
    time::Duration,
};

use tracing::{debug, info, trace, warn};

use crate::{config::UartConfig, error::Error};

/// A test double which records what is written and replays what it is told to.
pub mod mock;

/// Byte level access to a serial device.
///
/// The bridge only borrows a UART, it never opens, closes or reconfigures one.
pub trait Uart {
    /// Is at least one byte ready to be read?
    fn available(&self) -> bool;

    /// Read a single byte.
    /// `None` if no byte could be read.
    fn read_byte(&mut self) -> Option<u8>;

    /// Write a single byte.
    fn write_byte(&mut self, byte: u8);
}

/// A [`Uart`] backed by an actual serial port.
pub struct SerialUart {
    path: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialUart {
    /// Open the serial port as described by the configuration.
    /// 8 data bits, no parity, one stop bit.
    pub fn open(config: &UartConfig) -> Result<Self, Error> {
        info!(%config.path, %config.baud, ?config.flow_control, "Opening serial port");

        let port = serialport::new(&config.path, config.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(config.flow_control)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|source| Error::SerialPort {
                path: config.path.clone(),
                source,
            })?;

        Ok(Self {
            path: config.path.clone(),
            port,
        })
    }

    /// The path (or COM name) this port was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Uart for SerialUart {
    fn available(&self) -> bool {
        match self.port.bytes_to_read() {
            Ok(pending) => pending > 0,
            Err(e) => {
                warn!(?e, path = %self.path, "Could not query serial port");
                false
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];

        match self.port.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(e) => {
                trace!(?e, "Serial read yielded nothing");
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if let Err(e) = self.port.write_all(&[byte]) {
            warn!(?e, path = %self.path, "Serial write failed, byte lost");
        }
    }
}

/// Names of the serial ports found on this machine.
pub fn list_ports() -> Result<Vec<String>, Error> {
    let ports = serialport::available_ports().map_err(|source| Error::SerialPort {
        path: "<enumeration>".into(),
        source,
    })?;

    debug!("Found {} serial port(s)", ports.len());

    Ok(ports.into_iter().map(|info| info.port_name).collect())
}
