//! Device gain table.
//!
//! The ADS1115-style frontend announces its programmable gain over the same
//! text stream as the data; both sides must agree on this table and its
//! ordering. Scale is millivolts per raw count, range is the full-scale
//! input in millivolts.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One of the fixed device gain settings, in firmware table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    TwoThirds,
    One,
    Two,
    Four,
    Eight,
    Sixteen,
}

impl Gain {
    /// All settings, in the order the firmware indexes them.
    pub const ALL: [Gain; 6] = [
        Gain::TwoThirds,
        Gain::One,
        Gain::Two,
        Gain::Four,
        Gain::Eight,
        Gain::Sixteen,
    ];

    /// Millivolts per raw ADC count at this setting.
    pub fn scale(self) -> f64 {
        match self {
            Gain::TwoThirds => 0.1875,
            Gain::One => 0.125,
            Gain::Two => 0.0625,
            Gain::Four => 0.03125,
            Gain::Eight => 0.015625,
            Gain::Sixteen => 0.0078125,
        }
    }

    /// Full-scale input range in millivolts.
    pub fn range(self) -> f64 {
        match self {
            Gain::TwoThirds => 6144.0,
            Gain::One => 4096.0,
            Gain::Two => 2048.0,
            Gain::Four => 1024.0,
            Gain::Eight => 512.0,
            Gain::Sixteen => 256.0,
        }
    }

    /// Identifier string as the firmware announces it.
    pub fn name(self) -> &'static str {
        match self {
            Gain::TwoThirds => "GAIN_TWOTHIRDS",
            Gain::One => "GAIN_ONE",
            Gain::Two => "GAIN_TWO",
            Gain::Four => "GAIN_FOUR",
            Gain::Eight => "GAIN_EIGHT",
            Gain::Sixteen => "GAIN_SIXTEEN",
        }
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown gain identifier: {0:?}")]
pub struct UnknownGain(pub String);

impl FromStr for Gain {
    type Err = UnknownGain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gain::ALL
            .into_iter()
            .find(|g| g.name() == s)
            .ok_or_else(|| UnknownGain(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Gain::TwoThirds, 0.1875, 6144.0)]
    #[case(Gain::One, 0.125, 4096.0)]
    #[case(Gain::Two, 0.0625, 2048.0)]
    #[case(Gain::Four, 0.03125, 1024.0)]
    #[case(Gain::Eight, 0.015625, 512.0)]
    #[case(Gain::Sixteen, 0.0078125, 256.0)]
    fn table_matches_firmware(#[case] gain: Gain, #[case] scale: f64, #[case] range: f64) {
        assert_eq!(gain.scale(), scale);
        assert_eq!(gain.range(), range);
    }

    #[test]
    fn names_round_trip() {
        for gain in Gain::ALL {
            assert_eq!(gain.name().parse::<Gain>(), Ok(gain));
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        assert!("GAIN_THIRTYTWO".parse::<Gain>().is_err());
        assert!("gain_one".parse::<Gain>().is_err());
    }
}
