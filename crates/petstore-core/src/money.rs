//! # Money — Fixed-Point Amounts in Minor Units
//!
//! All amounts in the commerce stack are `i64` **cents** of the single store
//! currency. Strings cross the API boundary (`"12.50"`), integers do the
//! arithmetic. Floats are never used on a money path: binary floating point
//! cannot represent most decimal prices exactly, and rounding drift in a
//! pricing engine is a correctness bug, not a cosmetic one.

/// Parse a decimal amount string into cents.
///
/// Handles:
/// - `"75"` → 7500 (whole units)
/// - `"75.5"` → 7550
/// - `"75.50"` → 7550
/// - `"0.01"` → 1
///
/// Fractional digits beyond two are truncated. Returns `None` for empty,
/// malformed, or overflowing input — an amount that does not fit in i64
/// cents is not representable and must not be silently capped.
pub fn parse_amount(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dot_pos) = s.find('.') {
        let integer_part = s[..dot_pos].parse::<i64>().ok()?;
        let frac_str = &s[dot_pos + 1..];

        // Pad or truncate to exactly 2 decimal places.
        let frac_cents = match frac_str.len() {
            0 => 0i64,
            1 => frac_str.parse::<i64>().ok()? * 10,
            2 => frac_str.parse::<i64>().ok()?,
            _ => frac_str[..2].parse::<i64>().ok()?,
        };
        if frac_cents < 0 {
            return None;
        }

        let sign: i64 = if integer_part < 0 || s.starts_with('-') {
            -1
        } else {
            1
        };

        integer_part
            .abs()
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_cents))
            .map(|v| sign * v)
    } else {
        s.parse::<i64>().ok().and_then(|v| v.checked_mul(100))
    }
}

/// Format cents back into a decimal string with 2 places.
///
/// `7550` → `"75.50"`, `1` → `"0.01"`, `-450` → `"-4.50"`.
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_whole_units() {
        assert_eq!(parse_amount("75"), Some(7500));
        assert_eq!(parse_amount("0"), Some(0));
        assert_eq!(parse_amount("1"), Some(100));
    }

    #[test]
    fn parse_decimal() {
        assert_eq!(parse_amount("75.50"), Some(7550));
        assert_eq!(parse_amount("75.5"), Some(7550));
        assert_eq!(parse_amount("0.01"), Some(1));
        assert_eq!(parse_amount("1234.56"), Some(123456));
    }

    #[test]
    fn parse_truncates_extra_precision() {
        assert_eq!(parse_amount("9.999"), Some(999));
    }

    #[test]
    fn parse_negative() {
        assert_eq!(parse_amount("-4.50"), Some(-450));
        assert_eq!(parse_amount("-0.25"), Some(-25));
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_amount("  12.00  "), Some(1200));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("12.x"), None);
        assert_eq!(parse_amount("12.-5"), None);
    }

    #[test]
    fn parse_rejects_overflow() {
        assert_eq!(parse_amount("92233720368547758070"), None);
        assert_eq!(parse_amount("92233720368547758.08"), None);
    }

    #[test]
    fn format_basic() {
        assert_eq!(format_amount(7550), "75.50");
        assert_eq!(format_amount(1), "0.01");
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(-450), "-4.50");
    }

    proptest! {
        /// format → parse is the identity for all representable amounts.
        #[test]
        fn format_parse_roundtrip(cents in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let rendered = format_amount(cents);
            prop_assert_eq!(parse_amount(&rendered), Some(cents));
        }
    }
}
