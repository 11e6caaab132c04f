//! Picks the transport per connection: the simulated plotter for the
//! `virtual` port name, a serial port for anything else.

use plotter_adapter_serial::SerialTransport;
use plotter_adapter_virtual::{VIRTUAL_PORT, VirtualPlotter};
use plotter_app::ports::{LineReader, LineWriter, Transport};
use plotter_domain::error::ConnectError;
use plotter_domain::session_config::SessionConfig;

#[derive(Clone, Default)]
pub struct PortRouter {
    serial: SerialTransport,
    simulated: VirtualPlotter,
}

impl PortRouter {
    /// The simulated plotter behind the `virtual` port.
    #[must_use]
    pub fn simulated(&self) -> &VirtualPlotter {
        &self.simulated
    }
}

impl Transport for PortRouter {
    type Reader = Box<dyn LineReader>;
    type Writer = Box<dyn LineWriter>;

    fn open(&self, config: &SessionConfig) -> Result<(Self::Reader, Self::Writer), ConnectError> {
        if config.port.eq_ignore_ascii_case(VIRTUAL_PORT) {
            let (reader, writer) = self.simulated.open(config)?;
            Ok((Box::new(reader), Box::new(writer)))
        } else {
            let (reader, writer) = self.serial.open(config)?;
            Ok((Box::new(reader), Box::new(writer)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_route_virtual_port_to_simulated_plotter() {
        let router = PortRouter::default();

        let (_reader, mut writer) = router.open(&SessionConfig::for_port("VIRTUAL")).unwrap();
        writer.write(b"PD;").unwrap();

        assert!(router.simulated().device_state().pen_down);
    }

    #[test]
    fn should_route_other_ports_to_serial() {
        let router = PortRouter::default();

        let result = router.open(&SessionConfig::for_port("/dev/plotter-does-not-exist"));

        assert!(matches!(result, Err(ConnectError::PortUnavailable { .. })));
        assert!(router.simulated().written().is_empty());
    }
}
