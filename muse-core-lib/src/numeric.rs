//! Incremental parsing of bounded decimal fields.
//!
//! ```text
//!   +-------+  digit   +-----------+  would overflow  +----------+
//!   | Start |--------->| SawDigit  |----------------->| Overflow |
//!   +-------+          +-----------+                  +----------+
//!       |               |        ^ digit
//!       | non-digit     |        |
//!       v               |non-digit
//!   +-------+           v
//!   |  Err  |     +-------------+
//!   +-------+     | SawNonDigit |
//!                 +-------------+
//! ```
//!
//! Running out of input in `Start` or `SawDigit` means the number may continue
//! in bytes that have not arrived yet.

use crate::error::{DecodeError, DecodeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericState {
    #[default]
    Start,
    SawDigit,
    SawNonDigit,
    Overflow,
    Err,
}

impl NumericState {
    /// No further input can change the outcome.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NumericState::SawNonDigit | NumericState::Overflow | NumericState::Err)
    }
}

/// Accumulates an unsigned base-10 `u16` one byte at a time.
#[derive(Debug, Clone, Default)]
pub struct NumericFieldParser {
    state: NumericState,
    value: u16,
    digits: usize,
}

impl NumericFieldParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NumericState {
        self.state
    }

    /// Advances the machine by one byte. Bytes fed after a terminal state are
    /// ignored.
    pub fn feed(&mut self, byte: u8) -> NumericState {
        self.state = match self.state {
            NumericState::Start | NumericState::SawDigit if byte.is_ascii_digit() => {
                let digit = u16::from(byte - b'0');
                match self.value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                    Some(value) => {
                        self.value = value;
                        self.digits += 1;
                        NumericState::SawDigit
                    }
                    None => NumericState::Overflow,
                }
            }
            NumericState::Start => NumericState::Err,
            NumericState::SawDigit => NumericState::SawNonDigit,
            terminal => terminal,
        };
        self.state
    }

    /// Value and number of digit bytes consumed, once a non-digit has been seen.
    pub fn finish(&self) -> DecodeResult<u16> {
        match self.state {
            NumericState::Start | NumericState::SawDigit => Err(DecodeError::NeedMoreData),
            NumericState::SawNonDigit => Ok((self.value, self.digits)),
            NumericState::Overflow => Err(DecodeError::BadString("number does not fit in 16 bits")),
            NumericState::Err => Err(DecodeError::BadString("expected a decimal digit")),
        }
    }
}

/// Parses the decimal number at the front of `buf`.
///
/// The number must be followed by a non-digit byte, which is not consumed.
pub fn parse_u16(buf: &[u8]) -> DecodeResult<u16> {
    let mut parser = NumericFieldParser::new();
    for &byte in buf {
        if parser.feed(byte).is_terminal() {
            break;
        }
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_first_non_digit() {
        assert_eq!(parse_u16(b"0."), Ok((0, 1)));
        assert_eq!(parse_u16(b"42 "), Ok((42, 2)));
        assert_eq!(parse_u16(b"007\n"), Ok((7, 3)));
        assert_eq!(parse_u16(b"65535x"), Ok((65535, 5)));
    }

    #[test]
    fn exhausted_input_needs_more() {
        assert_eq!(parse_u16(b""), Err(DecodeError::NeedMoreData));
        assert_eq!(parse_u16(b"1"), Err(DecodeError::NeedMoreData));
        assert_eq!(parse_u16(b"65535"), Err(DecodeError::NeedMoreData));
    }

    #[test]
    fn rejects_non_digit_start() {
        assert!(matches!(parse_u16(b"x1"), Err(DecodeError::BadString(_))));
        assert!(matches!(parse_u16(b" 1"), Err(DecodeError::BadString(_))));
        assert!(matches!(parse_u16(b"-1"), Err(DecodeError::BadString(_))));
    }

    #[test]
    fn rejects_overflow_even_without_terminator() {
        assert!(matches!(parse_u16(b"65536"), Err(DecodeError::BadString(_))));
        assert!(matches!(parse_u16(b"99999 "), Err(DecodeError::BadString(_))));
        assert!(matches!(parse_u16(b"6553500"), Err(DecodeError::BadString(_))));
    }

    #[test]
    fn states_advance() {
        let mut parser = NumericFieldParser::new();
        assert_eq!(parser.state(), NumericState::Start);
        assert_eq!(parser.feed(b'1'), NumericState::SawDigit);
        assert_eq!(parser.feed(b'2'), NumericState::SawDigit);
        assert_eq!(parser.feed(b'.'), NumericState::SawNonDigit);
        assert_eq!(parser.feed(b'3'), NumericState::SawNonDigit);
        assert_eq!(parser.finish(), Ok((12, 2)));

        let mut parser = NumericFieldParser::new();
        assert_eq!(parser.feed(b'a'), NumericState::Err);
        assert!(parser.state().is_terminal());
    }
}
