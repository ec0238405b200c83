//! The `decimal` extension type: fixed-point with four fractional digits.

use std::fmt::{Display, Formatter, Result as FmtResult};

const SCALE: i64 = 10_000;

/// A fixed-point decimal stored as a scaled 64-bit integer. `12.34` and
/// `12.340` normalize to the same value; more than four fractional digits
/// is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Decimal(i64);

impl Decimal {
    pub fn parse(s: &str) -> Result<Decimal, String> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (int_text, frac_text) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };

        if int_text.is_empty() || !int_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err("error parsing decimal".into());
        }
        if body.contains('.') && (frac_text.is_empty() || !frac_text.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err("error parsing decimal".into());
        }
        if frac_text.len() > 4 {
            return Err("too much precision in decimal".into());
        }

        let units: i64 = int_text
            .parse()
            .map_err(|_| "decimal out of range".to_string())?;
        let mut frac: i64 = if frac_text.is_empty() {
            0
        } else {
            frac_text
                .parse()
                .map_err(|_| "error parsing decimal".to_string())?
        };
        for _ in frac_text.len()..4 {
            frac *= 10;
        }

        let magnitude = units
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| "decimal out of range".to_string())?;
        let value = if negative {
            magnitude.checked_neg().ok_or("decimal out of range")?
        } else {
            magnitude
        };
        Ok(Decimal(value))
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let abs = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:04}", abs / SCALE as u64, abs % SCALE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_zero_normalization() {
        assert_eq!(Decimal::parse("12.34").unwrap(), Decimal::parse("12.340").unwrap());
        assert_eq!(Decimal::parse("20").unwrap(), Decimal::parse("20.0000").unwrap());
        assert_ne!(Decimal::parse("12.34").unwrap(), Decimal::parse("12.341").unwrap());
    }

    #[test]
    fn test_ordering() {
        let a = Decimal::parse("12.34").unwrap();
        let b = Decimal::parse("20").unwrap();
        assert!(a < b);
        assert!(a <= Decimal::parse("12.3400").unwrap());
        assert!(Decimal::parse("-1.5").unwrap() < Decimal::parse("-1.4").unwrap());
    }

    #[test]
    fn test_precision_limit() {
        assert_eq!(
            Decimal::parse("12.12345"),
            Err("too much precision in decimal".into())
        );
        assert!(Decimal::parse("0.0001").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Decimal::parse("").is_err());
        assert!(Decimal::parse("abc").is_err());
        assert!(Decimal::parse("12.").is_err());
        assert!(Decimal::parse(".5").is_err());
        assert!(Decimal::parse("1.2.3").is_err());
        assert!(Decimal::parse("1e3").is_err());
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            Decimal::parse("9223372036854775807"),
            Err("decimal out of range".into())
        );
    }

    #[test]
    fn test_display_pads_fraction() {
        assert_eq!(Decimal::parse("12.34").unwrap().to_string(), "12.3400");
        assert_eq!(Decimal::parse("-0.5").unwrap().to_string(), "-0.5000");
        assert_eq!(Decimal::parse("7").unwrap().to_string(), "7.0000");
    }
}
