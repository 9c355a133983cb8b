//! Global log stream instance.
//!
//! Single producer (decoder main loop), single consumer (UART drain).

use crate::logging::LogStream;

/// Log stream shared by the main loop and the UART drain.
pub static LOG_STREAM: LogStream = LogStream::new();
