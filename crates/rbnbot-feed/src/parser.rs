//! Feed line decoding.
//!
//! The feed prints one spot per line as `SPOTTER_SPOTTED_FREQKHZ_WPM\n`,
//! e.g. `HA6PX_HB9IIH_3534.0_26`.

use rbnbot_core::{SpotEvent, UNKNOWN_ICON};

use crate::error::ParseError;

const FIELD_SEPARATOR: char = '_';

/// Decode one feed line into a [`SpotEvent`].
///
/// The trailing line terminator is stripped. Frequency and rate must parse as
/// numbers but are kept verbatim. The returned event carries [`UNKNOWN_ICON`]
/// until the caller resolves the spotter's continent.
pub fn parse_line(line: &str) -> Result<SpotEvent, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let [spotter, spotted, frequency, wpm] = fields.as_slice() else {
        return Err(ParseError::FieldCount(fields.len()));
    };

    if spotter.is_empty() {
        return Err(ParseError::EmptyField("spotter"));
    }
    if spotted.is_empty() {
        return Err(ParseError::EmptyField("spotted"));
    }
    if frequency.parse::<f64>().map_or(true, |f| !f.is_finite()) {
        return Err(ParseError::Frequency(frequency.to_string()));
    }
    if wpm.parse::<u32>().is_err() {
        return Err(ParseError::Rate(wpm.to_string()));
    }

    Ok(SpotEvent {
        spotter: spotter.to_string(),
        spotted: spotted.to_string(),
        frequency_khz: frequency.to_string(),
        wpm: wpm.to_string(),
        icon: UNKNOWN_ICON,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_line() {
        let ev = parse_line("HA6PX_HB9IIH_3534.0_26\n").unwrap();
        assert_eq!(ev.spotter, "HA6PX");
        assert_eq!(ev.spotted, "HB9IIH");
        assert_eq!(ev.frequency_khz, "3534.0");
        assert_eq!(ev.wpm, "26");
        assert_eq!(ev.icon, UNKNOWN_ICON);
    }

    #[test]
    fn crlf_terminator_is_stripped() {
        let ev = parse_line("W8WTS_WD5GRW_21036.9_18\r\n").unwrap();
        assert_eq!(ev.wpm, "18");
    }

    #[test]
    fn single_field_is_rejected() {
        assert_eq!(
            parse_line("ONLYONEFIELD\n"),
            Err(ParseError::FieldCount(1))
        );
    }

    #[test]
    fn extra_fields_are_rejected() {
        assert_eq!(
            parse_line("A_B_7010.0_12_X\n"),
            Err(ParseError::FieldCount(5))
        );
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        assert!(matches!(
            parse_line("HA6PX_HB9IIH_abc_26\n"),
            Err(ParseError::Frequency(_))
        ));
        assert!(matches!(
            parse_line("HA6PX_HB9IIH_3534.0_fast\n"),
            Err(ParseError::Rate(_))
        ));
        assert!(matches!(
            parse_line("HA6PX_HB9IIH_NaN_26\n"),
            Err(ParseError::Frequency(_))
        ));
    }

    #[test]
    fn empty_call_is_rejected() {
        assert_eq!(
            parse_line("_HB9IIH_3534.0_26\n"),
            Err(ParseError::EmptyField("spotter"))
        );
    }

    #[test]
    fn malformed_line_does_not_affect_next_one() {
        let lines = ["ONLYONEFIELD\n", "HA6PX_HB9IIH_3534.0_26\n"];
        let parsed: Vec<_> = lines.iter().filter_map(|l| parse_line(l).ok()).collect();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].spotted, "HB9IIH");
    }
}
