//! UART log output.
//!
//! Drains [`LOG_STREAM`](crate::LOG_STREAM) to a TX-only UART. Needs an
//! external USB-UART adapter (CH340, CP2102, etc).
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32 GPIO17 (TX) ──────▶ USB-UART RX
//!                            └─▶ PC Serial Monitor
//! ```

use crate::logging::{BufWriter, LogEntry};

#[cfg(target_os = "espidf")]
use crate::logging::LogStream;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripheral::Peripheral;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::uart::{self, UartTxDriver};

/// Longest formatted line: prefix plus a full message.
pub const MAX_LINE_LEN: usize = 128;

/// Interval between dropped-message reports.
pub const DROPPED_REPORT_INTERVAL_MS: i64 = 10_000;

/// UART configuration for logging.
pub struct UartLoggerConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartLoggerConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 17,
        }
    }
}

/// Format log entry to bytes.
///
/// Format: `[timestamp_ms] LEVEL: message\n`
pub fn format_log_entry(entry: &LogEntry, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(
        writer,
        "[{:10}] {}: {}\n",
        entry.timestamp_ms,
        entry.level.as_str(),
        entry.message()
    );
    writer.pos
}

/// Format the dropped-message warning.
pub fn format_dropped_report(dropped: u32, buf: &mut [u8]) -> usize {
    use core::fmt::Write;

    let mut writer = BufWriter { buf, pos: 0 };
    let _ = write!(writer, "[WARN] Dropped: {}\n", dropped);
    writer.pos
}

/// Initialize UART1 TX-only for logging output.
#[cfg(target_os = "espidf")]
pub fn init_uart_logger<'d>(
    uart: impl Peripheral<P = uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartLoggerConfig,
) -> Result<UartTxDriver<'d>, esp_idf_svc::sys::EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Non-blocking drain polled from the main loop.
#[cfg(target_os = "espidf")]
pub struct UartLogDrain<'d> {
    uart: UartTxDriver<'d>,
    last_dropped_report_ms: i64,
}

#[cfg(target_os = "espidf")]
impl<'d> UartLogDrain<'d> {
    pub fn new(uart: UartTxDriver<'d>) -> Self {
        Self {
            uart,
            last_dropped_report_ms: 0,
        }
    }

    /// Write every pending entry. Returns `true` if anything was written.
    pub fn poll<const N: usize>(&mut self, stream: &LogStream<N>, now_ms: i64) -> bool {
        let mut line = [0u8; MAX_LINE_LEN];
        let mut work_done = false;

        while let Some(entry) = stream.drain() {
            let len = format_log_entry(&entry, &mut line);
            let _ = self.uart.write(&line[..len]);
            work_done = true;
        }

        if now_ms - self.last_dropped_report_ms > DROPPED_REPORT_INTERVAL_MS {
            let dropped = stream.dropped();
            if dropped > 0 {
                let len = format_dropped_report(dropped, &mut line);
                let _ = self.uart.write(&line[..len]);
                stream.reset_dropped();
            }
            self.last_dropped_report_ms = now_ms;
        }

        work_done
    }
}
