//! Content-shape classification of the incoming text stream.
//!
//! The firmware multiplexes two logical channels (data and control) onto
//! one newline-framed ASCII stream with no type tag, so a line is
//! classified by what it looks like: a float is a raw count, a known gain
//! identifier is a control message, anything else is dropped.

use chrono::{DateTime, Utc};

use crate::gain::Gain;

/// One accepted measurement, already scaled to millivolts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub at: DateTime<Utc>,
    pub millivolts: f64,
}

impl Sample {
    /// Wall-clock timestamp as float seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> f64 {
        self.at.timestamp() as f64 + f64::from(self.at.timestamp_subsec_nanos()) * 1e-9
    }
}

/// Gain-change control message, carrying both settings so the
/// visualization collaborator can refresh its plot range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainChange {
    pub old: Gain,
    pub new: Gain,
}

/// Why a line was dropped. Dropped lines are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    Empty,
    /// Looked numeric but failed to parse as a float.
    Malformed,
    /// Neither numeric nor a known gain identifier.
    Unrecognized,
}

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Sample(Sample),
    GainChanged(GainChange),
    Discarded(DiscardReason),
}

/// Decodes lines and owns the process-wide current gain.
///
/// The current gain is deliberately not ambient global state: this parser
/// is its single owner and the only writer; everything downstream sees it
/// through the frames it emits or `current_gain()`.
pub struct FrameParser {
    gain: Gain,
}

impl FrameParser {
    pub fn new(initial: Gain) -> Self {
        Self { gain: initial }
    }

    pub fn current_gain(&self) -> Gain {
        self.gain
    }

    /// Classify one decoded line, stamping samples with `at`.
    pub fn classify(&mut self, line: &str, at: DateTime<Utc>) -> Frame {
        let line = line.trim();
        if line.is_empty() {
            return Frame::Discarded(DiscardReason::Empty);
        }
        match line.parse::<f64>() {
            Ok(count) => Frame::Sample(Sample {
                at,
                millivolts: count * self.gain.scale(),
            }),
            Err(_) => {
                if let Ok(new) = line.parse::<Gain>() {
                    let old = self.gain;
                    self.gain = new;
                    tracing::info!(
                        old = %old,
                        new = %new,
                        scale_mv = new.scale(),
                        range_mv = new.range(),
                        "gain changed"
                    );
                    Frame::GainChanged(GainChange { old, new })
                } else if line.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
                    Frame::Discarded(DiscardReason::Malformed)
                } else {
                    Frame::Discarded(DiscardReason::Unrecognized)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn numeric_frame_is_scaled_by_current_gain() {
        let mut parser = FrameParser::new(Gain::One);
        match parser.classify("100", now()) {
            Frame::Sample(s) => assert_eq!(s.millivolts, 12.5),
            other => panic!("expected sample, got {other:?}"),
        }
    }

    #[test]
    fn gain_control_message_updates_scaling_of_later_frames() {
        let mut parser = FrameParser::new(Gain::One);
        match parser.classify("GAIN_TWO", now()) {
            Frame::GainChanged(c) => {
                assert_eq!(c.old, Gain::One);
                assert_eq!(c.new, Gain::Two);
                assert_eq!(c.new.scale(), 0.0625);
                assert_eq!(c.new.range(), 2048.0);
            }
            other => panic!("expected gain change, got {other:?}"),
        }
        assert_eq!(parser.current_gain(), Gain::Two);
        match parser.classify("100", now()) {
            Frame::Sample(s) => assert_eq!(s.millivolts, 6.25),
            other => panic!("expected sample, got {other:?}"),
        }
    }

    #[test]
    fn negative_and_fractional_counts_parse() {
        let mut parser = FrameParser::new(Gain::One);
        match parser.classify("-16.5", now()) {
            Frame::Sample(s) => assert_eq!(s.millivolts, -16.5 * 0.125),
            other => panic!("expected sample, got {other:?}"),
        }
    }

    #[test]
    fn junk_lines_are_dropped_without_touching_gain() {
        let mut parser = FrameParser::new(Gain::Four);
        assert_eq!(
            parser.classify("12.3.4", now()),
            Frame::Discarded(DiscardReason::Malformed)
        );
        assert_eq!(
            parser.classify("GAIN_BOGUS", now()),
            Frame::Discarded(DiscardReason::Unrecognized)
        );
        assert_eq!(
            parser.classify("   ", now()),
            Frame::Discarded(DiscardReason::Empty)
        );
        assert_eq!(parser.current_gain(), Gain::Four);
    }

    #[test]
    fn epoch_seconds_carries_subsecond_precision() {
        let at = DateTime::from_timestamp(1_700_000_000, 250_000_000).unwrap();
        let s = Sample {
            at,
            millivolts: 0.0,
        };
        assert!((s.epoch_seconds() - 1_700_000_000.25).abs() < 1e-9);
    }
}
