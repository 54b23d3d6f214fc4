//! UART do sensor via `serialport`.

use crate::error::StartupError;
use eeg_core::ByteSource;
use eeg_core::config::SerialConfig;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read};
use std::time::Duration;
use tracing::info;

/// Fonte de bytes 8N1 com timeout curto.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
}

impl SerialSource {
    pub fn open(config: &SerialConfig) -> Result<Self, StartupError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|source| StartupError::Serial {
                port: config.port.clone(),
                source,
            })?;

        info!("Serial aberta: {} @ {} baud", config.port, config.baud_rate);
        Ok(Self { port })
    }
}

impl ByteSource for SerialSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}
