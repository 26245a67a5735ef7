use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{bridge::DEFAULT_PORT, error::Error, network::NetworkCheck};

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_baud() -> u32 {
    115_200
}

fn default_flow_control() -> serialport::FlowControl {
    serialport::FlowControl::None
}

fn default_timeout_ms() -> u64 {
    10
}

/// The serial port to bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UartConfig {
    /// The path to the port.
    /// Likely "/dev/ttyUSBx" or "COMx".
    pub path: String,

    /// Defaults to 115200.
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Defaults to no flow control.
    #[serde(default = "default_flow_control")]
    pub flow_control: serialport::FlowControl,

    /// How long a single serial read or write may take before giving up.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl UartConfig {
    /// A port at this path with default settings.
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            baud: default_baud(),
            flow_control: default_flow_control(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// The configuration used for running the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// The serial port to expose. Required.
    pub uart: UartConfig,

    /// The TCP port to listen on. Defaults to 8888.
    #[serde(default = "default_port")]
    pub port: u16,

    /// How often the bridge is ticked.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How to tell if the network is up.
    #[serde(default)]
    pub network: NetworkCheck,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uart: UartConfig::new(if cfg!(windows) { "COM1" } else { "/dev/ttyUSB0" }),
            port: default_port(),
            tick_interval_ms: default_tick_interval_ms(),
            network: NetworkCheck::default(),
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    pub fn deserialize(input: &str) -> Result<Self, Error> {
        Ok(Self::ron().from_str::<Config>(input)?)
    }

    /// An example configuration with all fields filled in.
    pub fn example() -> Self {
        Self {
            uart: UartConfig {
                path: "/dev/ttyUSB0".into(),
                baud: 115_200,
                flow_control: serialport::FlowControl::None,
                timeout_ms: 10,
            },
            port: DEFAULT_PORT,
            tick_interval_ms: 16,
            network: NetworkCheck::Route(([192, 168, 1, 1], 53).into()),
        }
    }

    /// Serialize the configuration in a "pretty" (i.e. non-compact) fashion.
    pub fn serialize_pretty(&self) -> Result<String, Error> {
        Self::ron()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::BadConfig(format!("Could not serialize: {e}")))
    }

    /// Setup a new configuration from a RON file.
    pub fn new_from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let s = std::fs::read_to_string(p)?;

        Self::deserialize(&s)
    }

    /// The cadence at which to tick the bridge.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check the configuration makes sense before using it.
    pub fn validate(&self) -> Result<(), Error> {
        if self.port == 0 {
            return Err(Error::BadConfig(
                "The port must be in the range 1-65535, got 0".into(),
            ));
        }

        if self.uart.path.trim().is_empty() {
            return Err(Error::BadConfig(
                "The uart path is empty, please point it at a serial port".into(),
            ));
        }

        if self.uart.baud == 0 {
            return Err(Error::BadConfig(format!(
                "The uart baud must be non-zero (uart at `{}`)",
                self.uart.path
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(Error::BadConfig(
                "The tick_interval_ms must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
