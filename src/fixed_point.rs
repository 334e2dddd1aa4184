//! Values are carried as signed integers in tenths: `-3.4` is `-34`.

use lexical_core::FormattedSize;

// Keeps `digits * 10 + frac` inside i64; sums are accumulated in i128.
const MAX_INTEGER_DIGITS: usize = 15;

/// Parses a `-?\d+\.\d` field into tenths.
///
/// The caller has already cut the field out of its record. The only checks
/// made here are the ones the digit loop gets for free: non-digits, a missing
/// `.` before the last byte, and an over-long integer part all yield `None`.
#[inline]
pub fn parse_tenths(field: &[u8]) -> Option<i64> {
    let (negative, digits) = match field.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, field),
    };
    let [int_part @ .., b'.', frac] = digits else {
        return None;
    };
    if int_part.is_empty() || int_part.len() > MAX_INTEGER_DIGITS || !frac.is_ascii_digit() {
        return None;
    }

    let mut value = 0i64;
    for &b in int_part {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + i64::from(b - b'0');
    }
    value = value * 10 + i64::from(frac - b'0');

    Some(if negative { -value } else { value })
}

/// Appends `value` (tenths) to `out` with exactly one fractional digit.
pub fn write_tenths(value: i64, out: &mut Vec<u8>) {
    if value < 0 {
        out.push(b'-');
    }
    let magnitude = value.unsigned_abs();
    let mut buf = [0u8; u64::FORMATTED_SIZE_DECIMAL];
    out.extend_from_slice(lexical_core::write(magnitude / 10, &mut buf));
    out.push(b'.');
    out.push(b'0' + (magnitude % 10) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(value: i64) -> String {
        let mut out = Vec::new();
        write_tenths(value, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_known_values() {
        assert_eq!(parse_tenths(b"-3.4"), Some(-34));
        assert_eq!(parse_tenths(b"0.0"), Some(0));
        assert_eq!(parse_tenths(b"12.3"), Some(123));
        assert_eq!(parse_tenths(b"-99.9"), Some(-999));
        assert_eq!(parse_tenths(b"1000.0"), Some(10000));
        assert_eq!(parse_tenths(b"007.5"), Some(75));
    }

    #[test]
    fn accepts_longest_integer_part() {
        assert_eq!(parse_tenths(b"999999999999999.9"), Some(9_999_999_999_999_999));
        assert_eq!(parse_tenths(b"-999999999999999.9"), Some(-9_999_999_999_999_999));
        assert_eq!(format(9_999_999_999_999_999), "999999999999999.9");
    }

    #[test]
    fn rejects_misshapen_fields() {
        for bad in [
            &b""[..],
            b"-",
            b"1",
            b"1.",
            b".5",
            b"-.5",
            b"1.23",
            b"1,5",
            b"a.0",
            b"1.x",
            b"--1.0",
            b"1234567890123456.0",
        ] {
            assert_eq!(parse_tenths(bad), None, "{:?}", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn formats_with_one_fractional_digit() {
        assert_eq!(format(0), "0.0");
        assert_eq!(format(-34), "-3.4");
        assert_eq!(format(-5), "-0.5");
        assert_eq!(format(123), "12.3");
        assert_eq!(format(10000), "1000.0");
    }

    #[test]
    fn format_then_parse_is_identity() {
        for value in (-20_000..=20_000).chain([i64::from(i32::MAX), -987_654_321_012]) {
            assert_eq!(parse_tenths(format(value).as_bytes()), Some(value));
        }
    }
}
