//! End-to-end decoder scenarios: raw levels in, events out.

use intercom_knock::morse::{self, ALPHABET};
use intercom_knock::{
    Counter, Decoder, DecoderConfig, DecoderEvent, DecoderState, Diagnostics, EdgeQueue,
    KnockConfig, Level, Pattern, RawEdge,
};

const DOT: i64 = 50;
const DASH: i64 = 250;
const INTRA: i64 = 100;
const LETTER: i64 = 400;
const WORD: i64 = 800;

/// Level transitions keying `text` at a comfortable pace.
fn edges_for(text: &str, start_ms: i64) -> Vec<(i64, Level)> {
    let mut edges = Vec::new();
    let mut t = start_ms;
    let mut gap = 0;

    for (wi, word) in text.split(' ').enumerate() {
        if wi > 0 {
            gap = WORD;
        }
        for (ci, c) in word.chars().enumerate() {
            if ci > 0 {
                gap = LETTER;
            }
            let code = morse::encode(c).unwrap();
            for (ei, e) in code.chars().enumerate() {
                if ei > 0 {
                    gap = INTRA;
                }
                t += gap;
                edges.push((t, Level::Active));
                t += if e == '.' { DOT } else { DASH };
                edges.push((t, Level::Inactive));
            }
        }
    }
    edges
}

/// Feed edges only, then one late tick.
fn feed(decoder: &mut Decoder<'_>, edges: &[(i64, Level)], final_tick: i64) -> Vec<DecoderEvent> {
    let mut events = Vec::new();
    let mut sink = |e: DecoderEvent| events.push(e);
    for &(ts, level) in edges {
        decoder.on_raw_level(level, ts, &mut sink);
    }
    decoder.tick(final_tick, &mut sink);
    events
}

/// Feed edges with a 10 ms tick running in between, like the main loop.
fn feed_ticking(decoder: &mut Decoder<'_>, edges: &[(i64, Level)], until: i64) -> Vec<DecoderEvent> {
    let mut events = Vec::new();
    let mut sink = |e: DecoderEvent| events.push(e);
    let mut now = edges.first().map(|&(ts, _)| ts).unwrap_or(0);
    for &(ts, level) in edges {
        while now + 10 < ts {
            now += 10;
            decoder.tick(now, &mut sink);
        }
        decoder.on_raw_level(level, ts, &mut sink);
    }
    while now < until {
        now += 10;
        decoder.tick(now, &mut sink);
    }
    events
}

fn text_of(events: &[DecoderEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match *e {
            DecoderEvent::CharacterDecoded { character, .. } => Some(character),
            _ => None,
        })
        .collect()
}

fn matches_of(events: &[DecoderEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|e| match *e {
            DecoderEvent::PatternMatched { pattern_id, .. } => Some(pattern_id),
            _ => None,
        })
        .collect()
}

fn sos() -> [Pattern; 1] {
    [Pattern::parse("door", "SOS").unwrap()]
}

#[test]
fn test_sos_scenario() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("SOS", 1000);
    assert_eq!(edges.last(), Some(&(3450, Level::Inactive)));

    let events = feed(&mut decoder, &edges, 3700);
    assert_eq!(
        events,
        [
            DecoderEvent::CharacterDecoded { character: 'S', timestamp_ms: 1750 },
            DecoderEvent::CharacterDecoded { character: 'O', timestamp_ms: 3100 },
            DecoderEvent::CharacterDecoded { character: 'S', timestamp_ms: 3700 },
            DecoderEvent::PatternMatched { pattern_id: "door", timestamp_ms: 3700 },
        ]
    );
    assert!(decoder.decoded().is_empty());
    assert_eq!(decoder.state(), DecoderState::Idle);
    assert_eq!(diag.get(Counter::Match), 1);
}

#[test]
fn test_sos_with_running_tick() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("SOS", 0);
    let events = feed_ticking(&mut decoder, &edges, 3000);

    assert_eq!(text_of(&events), "SOS");
    assert_eq!(matches_of(&events), ["door"]);
}

#[test]
fn test_pattern_retriggers() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("SOS SOS", 0);
    let events = feed_ticking(&mut decoder, &edges, edges.last().unwrap().0 + 600);

    // The first match clears the buffer, so no separator follows it
    assert_eq!(text_of(&events), "SOSSOS");
    assert_eq!(matches_of(&events), ["door", "door"]);
}

#[test]
fn test_match_published_after_its_character() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let events = feed(&mut decoder, &edges_for("SOS", 0), 2750);
    let n = events.len();
    assert!(matches!(
        events[n - 2],
        DecoderEvent::CharacterDecoded { character: 'S', .. }
    ));
    assert!(matches!(events[n - 1], DecoderEvent::PatternMatched { .. }));
    assert_eq!(events[n - 2].timestamp_ms(), events[n - 1].timestamp_ms());
}

#[test]
fn test_hello_world_round_trip_with_single_tick() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("HELLO WORLD", 0);
    let last = edges.last().unwrap().0;
    let events = feed(&mut decoder, &edges, last + 300);

    assert_eq!(text_of(&events), "HELLO WORLD");
    assert!(matches_of(&events).is_empty());
}

#[test]
fn test_hello_world_round_trip_with_running_tick() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("HELLO WORLD", 0);
    let last = edges.last().unwrap().0;
    let events = feed_ticking(&mut decoder, &edges, last + 5000);

    // Trailing word gap adds a separator; the timeout then resets
    assert_eq!(text_of(&events), "HELLO WORLD ");
    assert_eq!(
        events.last(),
        Some(&DecoderEvent::SequenceReset { timestamp_ms: last + 1010 })
    );
    assert_eq!(diag.get(Counter::SequenceReset), 1);
    assert!(decoder.decoded().is_empty());
}

#[test]
fn test_every_table_character_round_trips() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let text: String = ALPHABET.iter().map(|&(c, _)| c as char).collect();
    let edges = edges_for(&text, 0);
    let last = edges.last().unwrap().0;
    let events = feed(&mut decoder, &edges, last + 300);

    assert_eq!(text_of(&events), text);
    assert_eq!(diag.get(Counter::UnknownLetter), 0);
    assert_eq!(diag.get(Counter::LetterOverflow), 0);
}

#[test]
fn test_noise_ring_discards_only_its_letter() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut edges = edges_for("S", 0);
    // Two dots, then a 500 ms ring
    edges.extend_from_slice(&[
        (750, Level::Active),
        (800, Level::Inactive),
        (900, Level::Active),
        (950, Level::Inactive),
        (1050, Level::Active),
        (1550, Level::Inactive),
    ]);
    edges.extend(edges_for("T", 1950));
    let last = edges.last().unwrap().0;

    let events = feed(&mut decoder, &edges, last + 300);
    assert_eq!(text_of(&events), "ST");
    assert_eq!(diag.get(Counter::Noise), 1);
}

#[test]
fn test_bounce_inside_a_dash_is_ignored() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = [
        (0, Level::Active),
        (5, Level::Inactive),
        (12, Level::Active),
        (250, Level::Inactive),
    ];
    // 5 bounces, 12 repeats the accepted level; the dash closes at 250
    let events = feed(&mut decoder, &edges, 600);
    assert_eq!(diag.get(Counter::Bounce), 1);
    assert_eq!(text_of(&events), "T");
    assert_eq!(decoder.level(), Level::Inactive);
}

#[test]
fn test_contact_chatter_on_release() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = [
        (1000, Level::Active),
        (1250, Level::Inactive),
        (1255, Level::Active),
        (1260, Level::Inactive),
        (1650, Level::Active),
        (1700, Level::Inactive),
    ];
    let events = feed(&mut decoder, &edges, 2000);

    // The chatter after 1250 neither splits the dash nor shortens the gap
    assert_eq!(text_of(&events), "TE");
    assert_eq!(diag.get(Counter::Bounce), 1);
}

#[test]
fn test_unknown_code_decodes_to_marker() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    // ..-- has no table entry
    let edges = [
        (0, Level::Active),
        (50, Level::Inactive),
        (150, Level::Active),
        (200, Level::Inactive),
        (300, Level::Active),
        (550, Level::Inactive),
        (650, Level::Active),
        (900, Level::Inactive),
    ];
    let events = feed(&mut decoder, &edges, 1200);

    assert_eq!(text_of(&events), "*");
    assert_eq!(diag.get(Counter::UnknownLetter), 1);
    assert_eq!(decoder.decoded().to_string(), "*");
}

#[test]
fn test_overlong_letter_is_dropped() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut edges = Vec::new();
    for i in 0..8 {
        edges.push((i * 150, Level::Active));
        edges.push((i * 150 + 50, Level::Inactive));
    }
    let last = edges.last().unwrap().0;
    let events = feed(&mut decoder, &edges, last + 300);

    assert!(text_of(&events).is_empty());
    assert_eq!(diag.get(Counter::LetterOverflow), 1);
    assert!(decoder.decoded().is_empty());
}

#[test]
fn test_runaway_letter_never_publishes_its_tail() {
    for dots in [9i64, 11] {
        let patterns = [Pattern::parse("e", "E").unwrap()];
        let diag = Diagnostics::new();
        let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
        let mut decoder = Decoder::new(config, &diag);

        let mut edges = Vec::new();
        for i in 0..dots {
            edges.push((i * 150, Level::Active));
            edges.push((i * 150 + 50, Level::Inactive));
        }
        let last = edges.last().unwrap().0;
        let events = feed(&mut decoder, &edges, last + 300);

        assert!(events.is_empty(), "{dots} dots: {events:?}");
        assert_eq!(diag.get(Counter::LetterOverflow), 1);
        assert_eq!(decoder.letter_len(), 0);

        // The letter after the runaway one is decoded and can match
        let next = last + 600;
        let events = feed(&mut decoder, &[(next, Level::Active), (next + 50, Level::Inactive)], next + 350);
        assert_eq!(text_of(&events), "E");
        assert_eq!(matches_of(&events), ["e"]);
    }
}

#[test]
fn test_buffer_never_exceeds_capacity() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG", 0);
    let mut sink = |_e: DecoderEvent| {};
    for &(ts, level) in &edges {
        decoder.on_raw_level(level, ts, &mut sink);
        assert!(decoder.decoded().len() <= 16);
    }
    decoder.tick(edges.last().unwrap().0 + 300, &mut sink);
    assert_eq!(decoder.decoded().to_string(), "VER THE LAZY DOG");
}

#[test]
fn test_first_listed_pattern_wins() {
    let patterns = [
        Pattern::parse("long", "SOS").unwrap(),
        Pattern::parse("short", "OS").unwrap(),
    ];
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let events = feed(&mut decoder, &edges_for("SOS", 0), 10_000);
    assert_eq!(matches_of(&events), ["long"]);
}

#[test]
fn test_multi_word_pattern() {
    let patterns = [Pattern::parse("greeting", "HI MOM").unwrap()];
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let edges = edges_for("HI MOM", 0);
    let events = feed(&mut decoder, &edges, edges.last().unwrap().0 + 300);
    assert_eq!(matches_of(&events), ["greeting"]);
}

#[test]
fn test_timeout_abandons_partial_attempt() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut edges = edges_for("SO", 0);
    let last = edges.last().unwrap().0;
    edges.extend(edges_for("S", last + 1500));

    let events = feed(&mut decoder, &edges, edges.last().unwrap().0 + 300);
    assert_eq!(text_of(&events), "SOS");
    assert!(matches_of(&events).is_empty());
    assert_eq!(diag.get(Counter::SequenceReset), 1);
}

#[test]
fn test_silence_stage_reported_once() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut events = Vec::new();
    let mut sink = |e: DecoderEvent| events.push(e);
    for &(ts, level) in &edges_for("E", 0) {
        decoder.on_raw_level(level, ts, &mut sink);
    }
    for now in [300, 400, 1500, 1600, 2000] {
        decoder.tick(now, &mut sink);
    }
    // The closing edge must not repeat the timeout already reported
    decoder.on_raw_level(Level::Active, 2500, &mut sink);

    assert_eq!(
        events,
        [
            DecoderEvent::CharacterDecoded { character: 'E', timestamp_ms: 300 },
            DecoderEvent::SequenceReset { timestamp_ms: 1500 },
        ]
    );
}

#[test]
fn test_reset_is_idempotent_and_silent() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut events = Vec::new();
    let mut sink = |e: DecoderEvent| events.push(e);
    for &(ts, level) in &edges_for("SO", 0) {
        decoder.on_raw_level(level, ts, &mut sink);
    }
    assert_eq!(decoder.state(), DecoderState::InLetter);

    decoder.reset();
    decoder.reset();
    decoder.tick(20_000, &mut sink);

    assert_eq!(decoder.state(), DecoderState::Idle);
    assert!(decoder.decoded().is_empty());
    assert_eq!(decoder.letter_len(), 0);
    assert_eq!(decoder.level(), Level::Inactive);
    // Only S was flushed before the reset; O was still pending
    assert_eq!(text_of(&events), "S");
}

#[test]
fn test_in_word_state() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    let mut sink = |_e: DecoderEvent| {};
    for &(ts, level) in &edges_for("E", 0) {
        decoder.on_raw_level(level, ts, &mut sink);
    }
    decoder.tick(800, &mut sink);
    assert_eq!(decoder.state(), DecoderState::InWord);
    assert_eq!(decoder.decoded().to_string(), "E ");
}

#[test]
fn test_drain_from_edge_queue() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let config = KnockConfig::new(DecoderConfig::default(), &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);
    let queue = EdgeQueue::<64>::new();

    let edges = edges_for("SOS", 0);
    for &(ts, level) in &edges {
        queue.push(RawEdge { timestamp_ms: ts, active: level == Level::Active });
    }

    let mut events = Vec::new();
    let mut sink = |e: DecoderEvent| events.push(e);
    assert_eq!(decoder.drain(&queue, &mut sink), edges.len());
    assert!(queue.is_empty());
    decoder.tick(edges.last().unwrap().0 + 300, &mut sink);

    assert_eq!(matches_of(&events), ["door"]);
}

#[test]
fn test_custom_thresholds() {
    let patterns = sos();
    let diag = Diagnostics::new();
    let slow = DecoderConfig {
        dot_max_ms: 300,
        dash_max_ms: 900,
        intra_symbol_gap_max_ms: 400,
        letter_gap_max_ms: 1500,
        word_gap_max_ms: 3000,
        sequence_timeout_ms: 6000,
        ..DecoderConfig::default()
    };
    let config = KnockConfig::new(slow, &patterns).unwrap();
    let mut decoder = Decoder::new(config, &diag);

    // A 250 ms ring is a dot at this pace
    let edges = [(0, Level::Active), (250, Level::Inactive)];
    let events = feed(&mut decoder, &edges, 1000);
    assert_eq!(text_of(&events), "E");
}
