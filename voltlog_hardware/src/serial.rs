//! Serial transport for the ADC byte stream.
//!
//! Frames are newline-terminated ASCII, assembled by `framing`. Bytes of
//! a half-arrived line survive a read timeout in `partial` and complete
//! on a later call. A zero-byte read means the far end went away and maps
//! to `LinkError::Disconnected`, which the pipeline treats as recoverable.

use std::io::BufReader;
use std::time::Duration;

use serialport::SerialPort;
use voltlog_traits::Link;

use crate::error::LinkError;
use crate::framing;

pub struct SerialLink {
    reader: BufReader<Box<dyn SerialPort>>,
    partial: Vec<u8>,
    port_name: String,
}

impl SerialLink {
    /// Open `port` at `baud`. Fails with `Unavailable` when the port cannot
    /// be opened; the link manager owns retry policy, not this constructor.
    pub fn open(port: &str, baud: u32, read_timeout: Duration) -> Result<Self, LinkError> {
        let inner = serialport::new(port, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|e| LinkError::Unavailable(format!("{port}: {e}")))?;
        tracing::debug!(port, baud, "serial port open");
        Ok(Self {
            reader: BufReader::new(inner),
            partial: Vec::new(),
            port_name: port.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<String, LinkError> {
        self.reader.get_mut().set_timeout(timeout).map_err(|e| {
            LinkError::Unavailable(format!("{}: set_timeout: {e}", self.port_name))
        })?;
        framing::read_frame(&mut self.reader, &mut self.partial)
    }
}

impl Link for SerialLink {
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.read_frame(timeout).map_err(Into::into)
    }
}
