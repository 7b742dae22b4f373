//! Recover link parameters from the device firmware sketch.
//!
//! The ADC firmware is the single source of truth for baud rate, sampling
//! rate, and the power-on gain. Rather than duplicating those numbers in
//! the TOML (and drifting), we scan the Arduino sketch for the three
//! declarations that define them:
//!
//! ```c
//! float fs = 32.0;        // sampling rate in Hz
//! int g = 1;              // index into the gain table
//! Serial.begin(115200);
//! ```
//!
//! Parsing is line-oriented and tolerant: a declaration that is absent or
//! malformed simply yields `None` for that field.

use std::path::Path;

/// Link parameters recovered from a firmware sketch. Absent fields mean
/// the sketch did not declare them recognizably.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FirmwareParams {
    pub sample_rate_hz: Option<f64>,
    pub baud: Option<u32>,
    /// Index into the gain table (`GAIN_NAMES` order).
    pub gain_index: Option<usize>,
}

/// Parse a firmware sketch from disk.
pub fn load_sketch(path: &Path) -> eyre::Result<FirmwareParams> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read firmware sketch {:?}: {}", path, e))?;
    Ok(parse_sketch(&text))
}

/// Parse firmware sketch text. First recognizable declaration wins.
pub fn parse_sketch(text: &str) -> FirmwareParams {
    let mut params = FirmwareParams::default();
    for line in text.lines() {
        let line = strip_comment(line).trim();
        if params.sample_rate_hz.is_none() {
            params.sample_rate_hz = match_assignment(line, "float", "fs").and_then(number_prefix);
        }
        if params.gain_index.is_none() {
            params.gain_index = match_assignment(line, "int", "g")
                .and_then(number_prefix)
                .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                .map(|v| v as usize);
        }
        if params.baud.is_none() {
            params.baud = call_argument(line, "Serial.begin")
                .and_then(number_prefix)
                .filter(|v| v.fract() == 0.0 && *v > 0.0 && *v <= f64::from(u32::MAX))
                .map(|v| v as u32);
        }
    }
    params
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Match `<ty> <name> = <rest>;` and return the right-hand side.
fn match_assignment<'a>(line: &'a str, ty: &str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(ty)?.trim_start();
    let rest = rest.strip_prefix(name)?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    Some(rest.trim_end_matches(';').trim())
}

/// Return the argument text of `<func>(...)` if the call appears in `line`.
fn call_argument<'a>(line: &'a str, func: &str) -> Option<&'a str> {
    let start = line.find(func)? + func.len();
    let rest = line[start..].trim_start().strip_prefix('(')?;
    let end = rest.find(')')?;
    Some(rest[..end].trim())
}

/// Parse the leading numeric token of `s` (digits, sign, decimal point).
fn number_prefix(s: &str) -> Option<f64> {
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKETCH: &str = r#"
#include <Adafruit_ADS1X15.h>

float fs = 32.0; // samples per second
int g = 2;       // adsGain_t table index

void setup() {
  Serial.begin(115200);
}
"#;

    #[test]
    fn recovers_all_three_parameters() {
        let p = parse_sketch(SKETCH);
        assert_eq!(p.sample_rate_hz, Some(32.0));
        assert_eq!(p.gain_index, Some(2));
        assert_eq!(p.baud, Some(115_200));
    }

    #[test]
    fn missing_declarations_yield_none() {
        let p = parse_sketch("void loop() {}\n");
        assert_eq!(p, FirmwareParams::default());
    }

    #[test]
    fn commented_out_declarations_are_ignored() {
        let p = parse_sketch("// float fs = 64.0;\nfloat fs = 32.0;\n");
        assert_eq!(p.sample_rate_hz, Some(32.0));
    }

    #[test]
    fn first_declaration_wins() {
        let p = parse_sketch("int g = 1;\nint g = 4;\n");
        assert_eq!(p.gain_index, Some(1));
    }
}
