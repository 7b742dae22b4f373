pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One newline-terminated frame from the acquisition transport.
///
/// Implementations block until a full line is available, the timeout
/// elapses, or the transport reports disconnection. The returned string
/// carries no trailing newline.
pub trait Link {
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

impl Link for Box<dyn Link + Send> {
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }
}
