//! Fixed-point decimal numbers as written in script files.
//!
//! Values keep the scale they were written with, so `1.50` renders back as
//! `1.50` and `+5` as `5`. The range matches a 96-bit mantissa with at most
//! 28 fractional digits. Fractional digits beyond what fits are rounded
//! half to even; only an integer part beyond the range is an error.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Largest number of fractional digits a value may carry.
pub const MAX_SCALE: u32 = 28;

const MAX_MANTISSA: u128 = (1 << 96) - 1;

/// Reasons a number-shaped token can still fail to convert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("missing integer digits")]
    Empty,

    #[error("unexpected character '{0}'")]
    InvalidDigit(char),

    #[error("value exceeds the decimal range")]
    Overflow,
}

/// A signed decimal: `mantissa * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(mantissa: i64, scale: u32) -> Self {
        debug_assert!(scale <= MAX_SCALE);
        Self {
            mantissa: i128::from(mantissa),
            scale,
        }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(value, 0)
    }
}

impl FromStr for Decimal {
    type Err = NumberError;

    /// Accepts `[+-]?digits(.digits*)?`; a trailing `.` is allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() {
            return Err(NumberError::Empty);
        }
        if let Some(c) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(NumberError::InvalidDigit(c));
        }

        let mut mantissa: u128 = 0;
        for digit in digits(int_part) {
            mantissa = push_digit(mantissa, digit).ok_or(NumberError::Overflow)?;
        }

        let mut scale = 0;
        let mut rest = digits(frac_part);
        while let Some(digit) = rest.next() {
            match push_digit(mantissa, digit).filter(|_| scale < MAX_SCALE) {
                Some(next) => {
                    mantissa = next;
                    scale += 1;
                }
                None => {
                    let sticky = rest.any(|d| d != 0);
                    if digit > 5 || (digit == 5 && (sticky || mantissa % 2 == 1)) {
                        (mantissa, scale) = round_up(mantissa, scale)?;
                    }
                    break;
                }
            }
        }

        // MAX_MANTISSA fits comfortably in i128
        let mantissa = mantissa as i128;
        Ok(Self {
            mantissa: if negative { -mantissa } else { mantissa },
            scale,
        })
    }
}

fn digits(text: &str) -> impl Iterator<Item = u128> + '_ {
    text.bytes().map(|b| u128::from(b - b'0'))
}

fn push_digit(mantissa: u128, digit: u128) -> Option<u128> {
    mantissa
        .checked_mul(10)
        .and_then(|m| m.checked_add(digit))
        .filter(|m| *m <= MAX_MANTISSA)
}

/// Add one unit in the last place, giving up a fractional digit if the mantissa spills.
fn round_up(mantissa: u128, scale: u32) -> Result<(u128, u32), NumberError> {
    let bumped = mantissa + 1;
    if bumped <= MAX_MANTISSA {
        return Ok((bumped, scale));
    }
    if scale == 0 {
        return Err(NumberError::Overflow);
    }
    Ok(((bumped + 5) / 10, scale - 1))
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.is_negative() {
            f.write_str("-")?;
        }
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", "1")]
    #[case("+5", "5")]
    #[case("-5", "-5")]
    #[case("007", "7")]
    #[case("1.50", "1.50")]
    #[case("0.05", "0.05")]
    #[case("-0.25", "-0.25")]
    #[case("1.", "1")]
    #[case("-0", "0")]
    #[case("-0.0", "0.0")]
    fn given_number_lexeme_when_parsed_then_renders_with_written_scale(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let value: Decimal = input.parse().unwrap();
        assert_eq!(value.to_string(), expected);
    }

    #[rstest]
    #[case("", NumberError::Empty)]
    #[case("-", NumberError::Empty)]
    #[case(".5", NumberError::Empty)]
    #[case("1.2.3", NumberError::InvalidDigit('.'))]
    #[case("12a", NumberError::InvalidDigit('a'))]
    #[case("79228162514264337593543950336", NumberError::Overflow)]
    fn given_bad_lexeme_when_parsed_then_reports_reason(
        #[case] input: &str,
        #[case] expected: NumberError,
    ) {
        assert_eq!(input.parse::<Decimal>(), Err(expected));
    }

    #[rstest]
    #[case("0.00000000000000000000000000001", "0.0000000000000000000000000000")]
    #[case("0.00000000000000000000000000005", "0.0000000000000000000000000000")]
    #[case("0.00000000000000000000000000015", "0.0000000000000000000000000002")]
    #[case("0.000000000000000000000000000050001", "0.0000000000000000000000000001")]
    #[case("-0.12345678901234567890123456789", "-0.1234567890123456789012345679")]
    #[case("1.23456789012345678901234567890", "1.2345678901234567890123456789")]
    #[case("79228162514264337593543950335.4", "79228162514264337593543950335")]
    fn given_too_many_fractional_digits_when_parsed_then_rounded_half_to_even(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let value: Decimal = input.parse().unwrap();
        assert!(value.scale() <= MAX_SCALE);
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn given_rounding_past_largest_mantissa_when_parsed_then_scale_shrinks() {
        let value: Decimal = "7.92281625142643375935439503355".parse().unwrap();
        assert_eq!(value.scale(), 27);
        assert_eq!(value.to_string(), "7.922816251426433759354395034");
    }

    #[test]
    fn given_integer_at_limit_with_fraction_rounding_up_when_parsed_then_overflow() {
        assert_eq!(
            "79228162514264337593543950335.9".parse::<Decimal>(),
            Err(NumberError::Overflow)
        );
    }

    #[test]
    fn given_largest_mantissa_when_parsed_then_accepted() {
        let value: Decimal = "79228162514264337593543950335".parse().unwrap();
        assert_eq!(value.mantissa(), (1i128 << 96) - 1);
        assert_eq!(value.scale(), 0);
    }

    #[test]
    fn given_constructor_when_displayed_then_inserts_point() {
        assert_eq!(Decimal::new(-1234, 2).to_string(), "-12.34");
        assert_eq!(Decimal::from(42).to_string(), "42");
    }
}
