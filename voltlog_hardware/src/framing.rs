//! Newline framing over a buffered byte stream.
//!
//! The device offers no checksum or length prefix, so framing is purely
//! `read_until(b'\n')`. Bytes consumed before a mid-line timeout stay in
//! the caller's accumulator; the next call picks up where this one
//! stopped, so the head of a slow frame is never lost.

use std::io::BufRead;

use crate::error::LinkError;

/// Pull one newline-terminated frame out of `reader`, accumulating into
/// `acc` across calls. `acc` is cleared only when a frame is returned.
pub fn read_frame(reader: &mut impl BufRead, acc: &mut Vec<u8>) -> Result<String, LinkError> {
    match reader.read_until(b'\n', acc) {
        Ok(0) => Err(LinkError::Disconnected),
        Ok(_) => {
            // Tolerate non-UTF8 garbage the same way the firmware's
            // text channel is tolerated: lossy-decode and trim.
            let line = String::from_utf8_lossy(acc).trim().to_string();
            acc.clear();
            Ok(line)
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(LinkError::Timeout),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::NotConnected
            ) =>
        {
            Err(LinkError::Disconnected)
        }
        Err(e) => Err(LinkError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{self, BufReader, Read};

    /// Byte source that plays chunks and errors in order, then EOF.
    struct ScriptedBytes {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedBytes {
        fn new(steps: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
            }
        }
    }

    impl Read for ScriptedBytes {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn bytes_before_a_mid_line_timeout_survive_into_the_next_read() {
        let source = ScriptedBytes::new([
            Ok(b"12".to_vec()),
            Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
            Ok(b"3\n".to_vec()),
        ]);
        let mut reader = BufReader::new(source);
        let mut acc = Vec::new();
        assert!(matches!(
            read_frame(&mut reader, &mut acc),
            Err(LinkError::Timeout)
        ));
        assert_eq!(read_frame(&mut reader, &mut acc).unwrap(), "123");
        assert!(acc.is_empty());
    }

    #[test]
    fn end_of_stream_maps_to_disconnected() {
        let mut reader = BufReader::new(ScriptedBytes::new([]));
        let mut acc = Vec::new();
        assert!(matches!(
            read_frame(&mut reader, &mut acc),
            Err(LinkError::Disconnected)
        ));
    }

    #[test]
    fn broken_pipe_maps_to_disconnected() {
        let source =
            ScriptedBytes::new([Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))]);
        let mut reader = BufReader::new(source);
        let mut acc = Vec::new();
        assert!(matches!(
            read_frame(&mut reader, &mut acc),
            Err(LinkError::Disconnected)
        ));
    }

    #[test]
    fn garbage_bytes_are_lossy_decoded_and_trimmed() {
        let source = ScriptedBytes::new([Ok(b"\xff42\r\n".to_vec())]);
        let mut reader = BufReader::new(source);
        let mut acc = Vec::new();
        assert_eq!(read_frame(&mut reader, &mut acc).unwrap(), "\u{fffd}42");
    }
}
