//! IntercomKnock - Main entry point
//!
//! On the device: installs the bell interrupt, loads thresholds from NVS
//! and runs the decoder loop, logging events to the UART.
//!
//! On the host: replays a captured bell trace from stdin through the same
//! decoder and prints every event.
//!
//! ```text
//! # timestamp_ms level
//! 1000 1
//! 1060 0
//! ```

#![cfg_attr(target_os = "espidf", no_std)]
#![cfg_attr(target_os = "espidf", no_main)]

const PATTERN_COUNT: usize = 1;

/// Patterns compiled into the firmware: (id, text).
const PATTERNS: [(&str, &str); PATTERN_COUNT] = [("door", "SOS")];

#[cfg(target_os = "espidf")]
mod firmware {
    use super::{PATTERNS, PATTERN_COUNT};

    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::sys::{self as esp_idf_sys, EspError};

    use intercom_knock::config::nvs::{self, LoadReport, MigrationResult};
    use intercom_knock::hal::{install_bell_isr, BellInputConfig};
    use intercom_knock::log_drain::{init_uart_logger, UartLogDrain, UartLoggerConfig};
    use intercom_knock::{
        log_debug, log_error, log_info, log_warn, ConfigError, Decoder, DecoderConfig,
        Diagnostics, EdgeQueue, KnockConfig, LogSink, Pattern, LOG_STREAM,
    };

    static EDGE_QUEUE: EdgeQueue = EdgeQueue::new();
    static DIAGNOSTICS: Diagnostics = Diagnostics::new();

    /// Main loop period in FreeRTOS ticks.
    const LOOP_DELAY_TICKS: u32 = 5;
    const DIAGNOSTICS_INTERVAL_MS: i64 = 60_000;

    #[derive(Debug)]
    pub enum StartupError {
        Esp(EspError),
        Config(ConfigError),
    }

    impl From<EspError> for StartupError {
        fn from(e: EspError) -> Self {
            StartupError::Esp(e)
        }
    }

    impl From<ConfigError> for StartupError {
        fn from(e: ConfigError) -> Self {
            StartupError::Config(e)
        }
    }

    fn now_ms() -> i64 {
        unsafe { esp_idf_sys::esp_timer_get_time() / 1000 }
    }

    fn parse_patterns() -> Result<[Pattern; PATTERN_COUNT], ConfigError> {
        let (first_id, first_text) = PATTERNS[0];
        let mut patterns = [Pattern::parse(first_id, first_text)?; PATTERN_COUNT];
        for (slot, &(id, text)) in patterns.iter_mut().zip(PATTERNS.iter()).skip(1) {
            *slot = Pattern::parse(id, text)?;
        }
        Ok(patterns)
    }

    pub fn run() -> Result<core::convert::Infallible, StartupError> {
        let peripherals = Peripherals::take()?;
        let uart = init_uart_logger(
            peripherals.uart1,
            peripherals.pins.gpio17,
            &UartLoggerConfig::default(),
        )?;
        let mut log_drain = UartLogDrain::new(uart);

        let patterns = parse_patterns()?;
        let (config, report) = match nvs::open_default_store() {
            Ok(mut store) => nvs::load_or_default(&mut store, &patterns)?,
            Err(e) => (
                KnockConfig::new(DecoderConfig::default(), &patterns)?,
                LoadReport::StorageFailed(e),
            ),
        };

        let now = now_ms();
        log_info!(LOG_STREAM, now, "{}", env!("VERSION_STRING"));
        match report {
            LoadReport::Stored(MigrationResult::FreshInstall) => {
                log_info!(LOG_STREAM, now, "config: fresh install, defaults")
            }
            LoadReport::Stored(MigrationResult::UpToDate) => {
                log_info!(LOG_STREAM, now, "config: loaded from NVS")
            }
            LoadReport::Stored(MigrationResult::Migrated { from_version, to_version }) => {
                log_info!(LOG_STREAM, now, "config: migrated v{} -> v{}", from_version, to_version)
            }
            LoadReport::StorageFailed(e) => {
                log_warn!(LOG_STREAM, now, "config: NVS unavailable ({:?}), defaults", e)
            }
            LoadReport::InvalidStored(e) => {
                log_error!(LOG_STREAM, now, "config: stored values rejected ({}), defaults", e)
            }
        }

        let bell = BellInputConfig {
            polarity: config.decoder().polarity,
            ..BellInputConfig::default()
        };
        install_bell_isr(&bell, &EDGE_QUEUE)?;
        log_info!(LOG_STREAM, now, "bell input on GPIO{}", bell.pin);

        let mut decoder = Decoder::new(config, &DIAGNOSTICS);
        let mut sink = LogSink::new(&LOG_STREAM);
        let mut last_diagnostics_ms = now;

        loop {
            decoder.drain(&EDGE_QUEUE, &mut sink);

            let now = now_ms();
            decoder.tick(now, &mut sink);

            let overflow = EDGE_QUEUE.dropped();
            if overflow > 0 {
                log_warn!(LOG_STREAM, now, "edge queue overflow: {} dropped", overflow);
                EDGE_QUEUE.reset_dropped();
            }

            if now - last_diagnostics_ms > DIAGNOSTICS_INTERVAL_MS {
                let d = DIAGNOSTICS.snapshot();
                log_debug!(
                    LOG_STREAM,
                    now,
                    "diag: bounce={} noise={} ovf={} unk={} chr={} match={} reset={}",
                    d.bounces,
                    d.noise,
                    d.letter_overflows,
                    d.unknown_letters,
                    d.characters,
                    d.matches,
                    d.sequence_resets
                );
                last_diagnostics_ms = now;
            }

            log_drain.poll(&LOG_STREAM, now);

            unsafe {
                esp_idf_sys::vTaskDelay(LOOP_DELAY_TICKS);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
#[no_mangle]
fn main() {
    esp_idf_svc::sys::link_patches();

    if firmware::run().is_err() {
        // Nothing reached the UART; park instead of boot-looping
        loop {
            unsafe {
                esp_idf_svc::sys::vTaskDelay(1000);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod replay {
    use std::fs::File;
    use std::io::{self, BufRead, BufReader, Write};
    use std::path::PathBuf;

    use anyhow::{anyhow, bail, Context, Result};
    use clap::Parser;

    use intercom_knock::{
        Decoder, DecoderConfig, DecoderEvent, Diagnostics, KnockConfig, Level, Pattern,
    };

    /// Replay a captured bell trace through the knock decoder.
    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    pub struct Args {
        /// Patterns to watch for, as ID=TEXT (default: the firmware's built-in set)
        #[arg(value_name = "ID=TEXT")]
        patterns: Vec<String>,

        /// Trace file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Debounce window in ms
        #[arg(long)]
        debounce: Option<u32>,

        /// Longest dot in ms
        #[arg(long)]
        dot_max: Option<u32>,

        /// Longest dash in ms
        #[arg(long)]
        dash_max: Option<u32>,

        /// Longest gap inside a letter in ms
        #[arg(long)]
        intra_gap_max: Option<u32>,

        /// Longest gap between letters in ms
        #[arg(long)]
        letter_gap_max: Option<u32>,

        /// Longest gap between words in ms
        #[arg(long)]
        word_gap_max: Option<u32>,

        /// Sequence timeout in ms
        #[arg(long)]
        timeout: Option<u32>,

        /// Tick period used to poll silence between samples, in ms
        #[arg(long, default_value_t = 10)]
        tick: i64,
    }

    impl Args {
        fn decoder_config(&self) -> DecoderConfig {
            let mut cfg = DecoderConfig::default();
            let overrides = [
                (self.debounce, &mut cfg.debounce_ms),
                (self.dot_max, &mut cfg.dot_max_ms),
                (self.dash_max, &mut cfg.dash_max_ms),
                (self.intra_gap_max, &mut cfg.intra_symbol_gap_max_ms),
                (self.letter_gap_max, &mut cfg.letter_gap_max_ms),
                (self.word_gap_max, &mut cfg.word_gap_max_ms),
                (self.timeout, &mut cfg.sequence_timeout_ms),
            ];
            for (value, field) in overrides {
                if let Some(v) = value {
                    *field = v;
                }
            }
            cfg
        }

        fn patterns(&self) -> Result<Vec<Pattern>> {
            if self.patterns.is_empty() {
                return super::PATTERNS
                    .iter()
                    .map(|&(id, text)| {
                        Pattern::parse(id, text)
                            .with_context(|| format!("built-in pattern {id}"))
                    })
                    .collect();
            }

            self.patterns
                .iter()
                .map(|arg| {
                    let (id, text) = arg
                        .split_once('=')
                        .ok_or_else(|| anyhow!("expected ID=TEXT, got '{arg}'"))?;
                    // Pattern ids are 'static; the process owns them until exit
                    let id: &'static str = id.to_owned().leak();
                    Pattern::parse(id, text).with_context(|| format!("pattern '{arg}'"))
                })
                .collect()
        }
    }

    /// One trace line: `timestamp_ms level`, level `1` (ringing) or `0`.
    /// Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<(i64, Level)>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut fields = line.split_whitespace();
        let (Some(ts), Some(level), None) = (fields.next(), fields.next(), fields.next()) else {
            bail!("expected 'timestamp_ms level', got '{line}'");
        };
        let ts: i64 = ts
            .parse()
            .with_context(|| format!("bad timestamp '{ts}'"))?;
        let level = match level {
            "1" => Level::Active,
            "0" => Level::Inactive,
            other => bail!("bad level '{other}'"),
        };
        Ok(Some((ts, level)))
    }

    fn print_event(out: &mut impl Write, event: DecoderEvent) -> io::Result<()> {
        match event {
            DecoderEvent::CharacterDecoded { character, timestamp_ms } => {
                writeln!(out, "{timestamp_ms:>10}  char  '{character}'")
            }
            DecoderEvent::PatternMatched { pattern_id, timestamp_ms } => {
                writeln!(out, "{timestamp_ms:>10}  MATCH {pattern_id}")
            }
            DecoderEvent::SequenceReset { timestamp_ms } => {
                writeln!(out, "{timestamp_ms:>10}  reset")
            }
        }
    }

    pub fn run(args: &Args) -> Result<()> {
        let patterns = args.patterns()?;
        let config = KnockConfig::new(args.decoder_config(), &patterns)
            .context("invalid decoder configuration")?;
        let timeout = config.decoder().sequence_timeout_ms as i64;
        let tick = args.tick.max(1);

        let input: Box<dyn BufRead> = match &args.input {
            Some(path) => Box::new(BufReader::new(
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
            )),
            None => Box::new(io::stdin().lock()),
        };

        let diagnostics = Diagnostics::new();
        let mut decoder = Decoder::new(config, &diagnostics);

        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut write_error = None;
        let mut sink = |event: DecoderEvent| {
            if let Err(e) = print_event(&mut out, event) {
                write_error.get_or_insert(e);
            }
        };

        let mut last_ts = None;
        for (n, line) in input.lines().enumerate() {
            let line = line.context("failed to read trace")?;
            let Some((ts, level)) =
                parse_line(&line).with_context(|| format!("line {}", n + 1))?
            else {
                continue;
            };
            // Silence between trace samples is seen by the loop in real time
            if let Some(prev) = last_ts {
                let mut t = prev;
                while t + tick < ts {
                    t += tick;
                    decoder.tick(t, &mut sink);
                }
            }
            decoder.on_raw_level(level, ts, &mut sink);
            last_ts = Some(ts);
        }

        if let Some(last) = last_ts {
            decoder.tick(last + timeout + 1, &mut sink);
        }

        if let Some(e) = write_error {
            return Err(e).context("failed to write events");
        }

        let d = diagnostics.snapshot();
        eprintln!(
            "bounces={} noise={} overflows={} unknown={} matches={} resets={}",
            d.bounces,
            d.noise,
            d.letter_overflows,
            d.unknown_letters,
            d.matches,
            d.sequence_resets
        );
        Ok(())
    }

}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use clap::Parser;

    let args = replay::Args::parse();
    replay::run(&args)
}
