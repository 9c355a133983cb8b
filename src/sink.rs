//! Outward events and the sink they are published to.
//!
//! The decoder knows nothing about transport. Whatever forwards events
//! to telemetry or automation implements [`EventSink`].

use crate::logging::{LogLevel, LogStream};

/// Event published by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderEvent {
    /// A letter was flushed. Word separators (`' '`) and unknown codes
    /// (`'*'`) are published too, so the event stream spells the text.
    CharacterDecoded { character: char, timestamp_ms: i64 },
    /// A configured pattern was completed.
    PatternMatched { pattern_id: &'static str, timestamp_ms: i64 },
    /// A long silence abandoned the attempt in progress.
    SequenceReset { timestamp_ms: i64 },
}

impl DecoderEvent {
    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        match *self {
            DecoderEvent::CharacterDecoded { timestamp_ms, .. }
            | DecoderEvent::PatternMatched { timestamp_ms, .. }
            | DecoderEvent::SequenceReset { timestamp_ms } => timestamp_ms,
        }
    }
}

/// Consumer of decoder events.
pub trait EventSink {
    fn publish(&mut self, event: DecoderEvent);
}

impl<F> EventSink for F
where
    F: FnMut(DecoderEvent),
{
    #[inline]
    fn publish(&mut self, event: DecoderEvent) {
        self(event)
    }
}

/// Sink that writes every event to a [`LogStream`].
///
/// Matches are logged at `Info`, decoded characters at `Debug`.
pub struct LogSink<'a, const N: usize = { crate::logging::LOG_BUFFER_SIZE }> {
    stream: &'a LogStream<N>,
}

impl<'a, const N: usize> LogSink<'a, N> {
    pub fn new(stream: &'a LogStream<N>) -> Self {
        Self { stream }
    }
}

impl<'a, const N: usize> EventSink for LogSink<'a, N> {
    fn publish(&mut self, event: DecoderEvent) {
        let ts = event.timestamp_ms();
        match event {
            DecoderEvent::CharacterDecoded { character, .. } => {
                crate::log_event!(LogLevel::Debug, self.stream, ts, "decoded '{}'", character);
            }
            DecoderEvent::PatternMatched { pattern_id, .. } => {
                crate::log_event!(LogLevel::Info, self.stream, ts, "pattern matched: {}", pattern_id);
            }
            DecoderEvent::SequenceReset { .. } => {
                crate::log_event!(LogLevel::Debug, self.stream, ts, "sequence reset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = std::vec::Vec::new();
        {
            let mut sink = |e: DecoderEvent| seen.push(e);
            sink.publish(DecoderEvent::SequenceReset { timestamp_ms: 5 });
        }
        assert_eq!(seen, [DecoderEvent::SequenceReset { timestamp_ms: 5 }]);
    }

    #[test]
    fn test_log_sink_writes_entries() {
        let stream = LogStream::<8>::new();
        stream.set_level(LogLevel::Trace);
        let mut sink = LogSink::new(&stream);

        sink.publish(DecoderEvent::PatternMatched { pattern_id: "door", timestamp_ms: 7 });

        let entry = stream.drain().unwrap();
        assert_eq!(entry.timestamp_ms, 7);
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message(), "pattern matched: door");
    }

    #[test]
    fn test_log_sink_respects_level() {
        let stream = LogStream::<8>::new();
        stream.set_level(LogLevel::Info);
        let mut sink = LogSink::new(&stream);

        sink.publish(DecoderEvent::CharacterDecoded { character: 'S', timestamp_ms: 1 });
        assert!(!stream.has_entries());
    }
}
