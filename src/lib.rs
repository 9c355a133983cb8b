//! # IntercomKnock
//!
//! Secret-knock decoder for an apartment intercom bell line.
//!
//! ## Architecture
//!
//! ```text
//! GPIO ISR ──▶ EdgeQueue ──▶ Decoder ──▶ EventSink
//!  (push only)  lock-free     main loop    telemetry / log
//! ```
//!
//! - The interrupt only timestamps transitions and pushes them
//! - The main loop drains the queue, runs the decoder and ticks it
//! - Events leave through [`EventSink`]; the decoder never knows who listens
//! - Anomalies are counted in [`Diagnostics`], never raised
//!
//! Everything except [`hal`] and [`log_drain`] device output is plain
//! `no_std` logic that runs on the host.

#![cfg_attr(not(test), no_std)]

pub mod accumulator;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod edge;
pub mod hal;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod morse;
pub mod pattern;
pub mod queue;
pub mod sink;

pub use config::{ConfigError, DecoderConfig, KnockConfig};
pub use decoder::{Decoder, DecoderState};
pub use diagnostics::{Counter, Diagnostics, DiagnosticsSnapshot};
pub use edge::{Level, Polarity};
pub use log_globals::LOG_STREAM;
pub use pattern::Pattern;
pub use queue::{EdgeQueue, RawEdge};
pub use sink::{DecoderEvent, EventSink, LogSink};
