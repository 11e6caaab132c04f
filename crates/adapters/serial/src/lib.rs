//! # plotter-adapter-serial
//!
//! Real transport: a physical serial link opened with the `serialport` crate.
//!
//! The port is opened once with the session's framing, then cloned so the
//! receive loop and the command path each own a handle.
//!
//! ## Dependency rule
//!
//! Depends on `plotter-app` (port traits) and `plotter-domain` only.

mod error;
mod line_buffer;

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use plotter_app::ports::{LineReader, LineWriter, Transport};
use plotter_domain::error::{ConnectError, TransportError};
use plotter_domain::session_config::{DataBits, FlowControl, Parity, SessionConfig, StopBits};

pub use error::SerialError;
pub use line_buffer::LineBuffer;

/// Initial read timeout; the receive loop sets its own poll interval.
const OPEN_TIMEOUT: Duration = Duration::from_millis(100);

/// Opens serial ports for the session engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    type Reader = SerialReader;
    type Writer = SerialWriter;

    fn open(&self, config: &SessionConfig) -> Result<(SerialReader, SerialWriter), ConnectError> {
        let port = open_port(config).map_err(|err| {
            tracing::error!(port = %config.port, %err, "failed to open serial port");
            err.into_connect(&config.port)
        })?;
        let reader = port
            .try_clone()
            .map_err(|err| SerialError::from(err).into_connect(&config.port))?;

        tracing::info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "serial port opened"
        );
        Ok((
            SerialReader {
                port: reader,
                timeout: OPEN_TIMEOUT,
                lines: LineBuffer::new(),
            },
            SerialWriter { port: Some(port) },
        ))
    }
}

fn open_port(config: &SessionConfig) -> Result<Box<dyn SerialPort>, SerialError> {
    let port = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(data_bits(config.data_bits))
        .parity(parity(config.parity))
        .stop_bits(stop_bits(config.stop_bits))
        .flow_control(flow_control(config.flow_control))
        .timeout(OPEN_TIMEOUT)
        .open()?;
    Ok(port)
}

fn data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Five => serialport::DataBits::Five,
        DataBits::Six => serialport::DataBits::Six,
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

fn flow_control(flow: FlowControl) -> serialport::FlowControl {
    match flow {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::RtsCts => serialport::FlowControl::Hardware,
    }
}

/// Read half of a serial link, framed into lines.
pub struct SerialReader {
    port: Box<dyn SerialPort>,
    timeout: Duration,
    lines: LineBuffer,
}

impl LineReader for SerialReader {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        if let Some(line) = self.lines.pop_line() {
            return Ok(Some(line));
        }
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(SerialError::from)?;
            self.timeout = timeout;
        }

        Ok(read_framed(&mut self.port, &mut self.lines)?)
    }
}

/// One read from the port, framed into lines.
///
/// When the read times out, whatever partial line is buffered counts as a
/// complete reply: the device does not always end its replies with a newline.
fn read_framed<R: Read + ?Sized>(
    port: &mut R,
    lines: &mut LineBuffer,
) -> Result<Option<String>, SerialError> {
    let mut chunk = [0u8; 256];
    match port.read(&mut chunk) {
        Ok(n) => lines.push(&chunk[..n]),
        Err(err) if err.kind() == std::io::ErrorKind::TimedOut => lines.flush_partial(),
        Err(err) => return Err(err.into()),
    }
    Ok(lines.pop_line())
}

/// Write half of a serial link.
pub struct SerialWriter {
    port: Option<Box<dyn SerialPort>>,
}

impl LineWriter for SerialWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            tracing::info!(port = ?port.name(), "serial port closed");
        }
    }
}

/// A serial port present on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// List the serial ports the OS knows about.
///
/// # Errors
///
/// Returns [`SerialError::Port`] when enumeration itself fails.
pub fn available_ports() -> Result<Vec<PortInfo>, SerialError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            description: describe(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe(kind: &serialport::SerialPortType) -> String {
    match kind {
        serialport::SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_rts_cts_to_hardware_flow_control() {
        assert_eq!(
            flow_control(FlowControl::RtsCts),
            serialport::FlowControl::Hardware
        );
        assert_eq!(flow_control(FlowControl::None), serialport::FlowControl::None);
    }

    #[test]
    fn should_map_default_framing_to_8n1() {
        let config = SessionConfig::default();
        assert_eq!(data_bits(config.data_bits), serialport::DataBits::Eight);
        assert_eq!(parity(config.parity), serialport::Parity::None);
        assert_eq!(stop_bits(config.stop_bits), serialport::StopBits::One);
    }

    /// Replays scripted chunks, then times out forever.
    struct ScriptedPort(std::collections::VecDeque<&'static [u8]>);

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(chunk);
                    Ok(chunk.len())
                }
                None => Err(std::io::ErrorKind::TimedOut.into()),
            }
        }
    }

    #[test]
    fn should_deliver_unterminated_reply_once_port_goes_quiet() {
        let mut port = ScriptedPort(vec![&b"P1000,2000,"[..], &b"0C"[..]].into());
        let mut lines = LineBuffer::new();

        assert_eq!(read_framed(&mut port, &mut lines).unwrap(), None);
        assert_eq!(read_framed(&mut port, &mut lines).unwrap(), None);
        let line = read_framed(&mut port, &mut lines).unwrap();

        assert_eq!(line.as_deref(), Some("P1000,2000,0C"));
        assert_eq!(read_framed(&mut port, &mut lines).unwrap(), None);
    }

    #[test]
    fn should_deliver_terminated_reply_without_waiting() {
        let mut port = ScriptedPort(vec![&b"P1,2,3C\r\nP4"[..]].into());
        let mut lines = LineBuffer::new();

        let line = read_framed(&mut port, &mut lines).unwrap();

        assert_eq!(line.as_deref(), Some("P1,2,3C"));
        assert_eq!(read_framed(&mut port, &mut lines).unwrap().as_deref(), Some("P4"));
    }

    #[test]
    fn should_surface_other_read_errors() {
        struct BrokenPort;
        impl Read for BrokenPort {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
        }

        let result = read_framed(&mut BrokenPort, &mut LineBuffer::new());

        assert!(matches!(result, Err(SerialError::Io(_))));
    }

    #[test]
    fn should_fail_to_open_missing_port() {
        let config = SessionConfig::for_port("/dev/plotter-does-not-exist");

        let result = SerialTransport.open(&config);

        assert!(matches!(result, Err(ConnectError::PortUnavailable { .. })));
    }

    #[test]
    fn should_refuse_writes_after_close() {
        let mut writer = SerialWriter { port: None };
        writer.close();
        assert!(matches!(writer.write(b"PU;"), Err(TransportError::Closed)));
    }
}
