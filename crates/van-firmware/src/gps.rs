//! Positioning receiver on UART1

use embassy_time::{Duration, Instant, with_deadline};
use esp_hal::Async;
use esp_hal::uart::{RxError, Uart};
use log::warn;
use van_core::telemetry::LineAssembler;
use van_core::{LineRead, TelemetrySource};

const CHUNK_LEN: usize = 64;

/// [`TelemetrySource`] over an async UART.
///
/// Bytes are read in chunks; whatever follows a completed line stays
/// buffered for the next call.
pub struct UartGps {
    uart: Uart<'static, Async>,
    assembler: LineAssembler,
    chunk: [u8; CHUNK_LEN],
    len: usize,
    pos: usize,
}

impl UartGps {
    pub fn new(uart: Uart<'static, Async>) -> Self {
        Self {
            uart,
            assembler: LineAssembler::new(),
            chunk: [0; CHUNK_LEN],
            len: 0,
            pos: 0,
        }
    }

    fn drop_buffered(&mut self) {
        self.assembler.reset();
        self.len = 0;
        self.pos = 0;
    }
}

impl TelemetrySource for UartGps {
    type Error = RxError;

    async fn read_line(&mut self, timeout: Duration) -> Result<LineRead, Self::Error> {
        let deadline = Instant::now() + timeout;
        loop {
            while self.pos < self.len {
                let byte = self.chunk[self.pos];
                self.pos += 1;
                if let Some(line) = self.assembler.push(byte) {
                    return Ok(LineRead::Line(line));
                }
            }

            match with_deadline(deadline, self.uart.read_async(&mut self.chunk)).await {
                Ok(Ok(read)) => {
                    self.len = read;
                    self.pos = 0;
                }
                // Lost bytes: the partial line is garbage but the link is fine
                Ok(Err(RxError::FifoOverflowed)) => {
                    warn!("GPS UART FIFO overflowed, dropping partial line");
                    self.drop_buffered();
                }
                Ok(Err(e)) => {
                    self.drop_buffered();
                    return Err(e);
                }
                Err(_) => return Ok(LineRead::Timeout),
            }
        }
    }
}
