//! Hardware Abstraction Layer for IntercomKnock.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod gpio;

pub use gpio::{raw_edge, BellInputConfig};

#[cfg(target_os = "espidf")]
pub use gpio::install_bell_isr;
