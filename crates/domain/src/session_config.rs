//! Serial session configuration, fixed for the lifetime of one connection.

use serde::Deserialize;

use crate::error::ConnectError;

/// Framing and port selection for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// OS port identifier (e.g. `/dev/ttyUSB0`, `COM3`).
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::RtsCts,
        }
    }
}

impl SessionConfig {
    /// Default framing on the given port.
    #[must_use]
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Reject configurations no transport could open.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidConfig`] when the port is empty or the
    /// baud rate is zero.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.port.trim().is_empty() {
            return Err(ConnectError::InvalidConfig("port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConnectError::InvalidConfig("baud rate must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(format!("unsupported data bits {other}, expected 5-8")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(format!("unsupported stop bits {other}, expected 1 or 2")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum FlowControl {
    #[serde(rename = "none")]
    None,
    #[default]
    #[serde(rename = "rts/cts", alias = "rts_cts")]
    RtsCts,
}
