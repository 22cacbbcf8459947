//! Hardware-facing traits the monitor loop samples from

use core::fmt::Debug;
use core::future::Future;

use embassy_time::Duration;
use log::warn;

use crate::battery::BatteryReading;

/// NMEA 0183 caps sentences at 82 characters; leave room for chatty receivers
pub const MAX_LINE_LEN: usize = 96;

/// One terminated line of receiver output, not yet validated
pub type RawLine = heapless::Vec<u8, MAX_LINE_LEN>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    Line(RawLine),
    /// Nothing arrived within the timeout. Not an error.
    Timeout,
}

/// Line-oriented source of positioning receiver output
pub trait TelemetrySource {
    type Error: Debug;

    /// Wait at most `timeout` for the next complete line
    fn read_line(&mut self, timeout: Duration)
    -> impl Future<Output = Result<LineRead, Self::Error>>;
}

/// Supply voltage and power flags, read from the power management IC
pub trait BatteryReadout {
    type Error: Debug;

    fn read_battery(&mut self) -> impl Future<Output = Result<BatteryReading, Self::Error>>;
}

/// Splits a byte stream into lines.
///
/// `\r` is dropped, `\n` terminates. A line longer than [`MAX_LINE_LEN`] is
/// discarded up to its terminator instead of being delivered truncated.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: RawLine,
    overflowed: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; returns a line when `byte` completes one
    pub fn push(&mut self, byte: u8) -> Option<RawLine> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let line = core::mem::take(&mut self.buffer);
                if core::mem::take(&mut self.overflowed) {
                    warn!("Discarded receiver line longer than {} bytes", MAX_LINE_LEN);
                    return None;
                }
                if line.is_empty() { None } else { Some(line) }
            }
            _ if self.overflowed => None,
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.overflowed = true;
                    self.buffer.clear();
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(assembler: &mut LineAssembler, bytes: &[u8]) -> heapless::Vec<RawLine, 8> {
        let mut lines = heapless::Vec::new();
        for &b in bytes {
            if let Some(line) = assembler.push(b) {
                lines.push(line).unwrap();
            }
        }
        lines
    }

    #[test]
    fn test_splits_on_newline_and_drops_cr() {
        let mut assembler = LineAssembler::new();
        let lines = feed(&mut assembler, b"$GPRMC,1*00\r\n$GPGGA,2*00\r\n$GP");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_slice(), b"$GPRMC,1*00");
        assert_eq!(lines[1].as_slice(), b"$GPGGA,2*00");

        // Partial line is kept for the next read
        let lines = feed(&mut assembler, b"RMC\n");
        assert_eq!(lines[0].as_slice(), b"$GPRMC");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut assembler = LineAssembler::new();
        assert!(feed(&mut assembler, b"\r\n\n\r\n").is_empty());
    }

    #[test]
    fn test_overlong_line_is_discarded_whole() {
        let mut assembler = LineAssembler::new();
        let mut input = [b'x'; MAX_LINE_LEN + 10];
        input[MAX_LINE_LEN + 9] = b'\n';
        assert!(feed(&mut assembler, &input).is_empty());

        let lines = feed(&mut assembler, b"ok\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_slice(), b"ok");
    }

    #[test]
    fn test_exactly_full_line_is_delivered() {
        let mut assembler = LineAssembler::new();
        let mut input = [b'y'; MAX_LINE_LEN + 1];
        input[MAX_LINE_LEN] = b'\n';
        let lines = feed(&mut assembler, &input);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
    }
}
