//! RFC 8785 §3.2.2.3 number formatting: the ECMAScript `Number::toString`
//! algorithm, restricted to finite values.

use crate::CanonError;

pub(crate) fn format_number(n: &serde_json::Number) -> Result<String, CanonError> {
    if let Some(i) = n.as_i64() {
        return Ok(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.to_string());
    }
    let f = n.as_f64().ok_or(CanonError::NonFiniteNumber)?;
    format_ecma_double(f)
}

fn format_ecma_double(f: f64) -> Result<String, CanonError> {
    if !f.is_finite() {
        return Err(CanonError::NonFiniteNumber);
    }
    if f == 0.0 {
        // Distinguishes +0 from -0 the way JCS requires: both render "0".
        return Ok("0".to_string());
    }

    let neg = f.is_sign_negative();
    let abs = f.abs();

    // Rust's `{:e}` gives the shortest round-trip decimal in scientific
    // form, e.g. "1.5e2", "1e0", "3.14159e0".
    let sci = format!("{abs:e}");
    let (mantissa, exp_str) = sci.split_once('e').expect("scientific notation has an exponent");
    let exp: i32 = exp_str.parse().expect("exponent is a valid integer");
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    let k = digits.len() as i32;
    let point = exp + 1; // ECMA spec's `n`: digits * 10^(point - k) == abs

    let mut s = String::new();
    if neg {
        s.push('-');
    }

    if k <= point && point <= 21 {
        s.push_str(digits);
        s.push_str(&"0".repeat((point - k) as usize));
    } else if 0 < point && point <= 21 {
        s.push_str(&digits[..point as usize]);
        s.push('.');
        s.push_str(&digits[point as usize..]);
    } else if -6 < point && point <= 0 {
        s.push_str("0.");
        s.push_str(&"0".repeat((-point) as usize));
        s.push_str(digits);
    } else {
        s.push_str(&digits[..1]);
        if k > 1 {
            s.push('.');
            s.push_str(&digits[1..]);
        }
        s.push('e');
        let e = point - 1;
        if e >= 0 {
            s.push('+');
        }
        s.push_str(&e.to_string());
    }

    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn fmt(f: f64) -> String {
        format_ecma_double(f).unwrap()
    }

    #[test]
    fn integers_render_without_decimal_point() {
        assert_eq!(fmt(1.0), "1");
        assert_eq!(fmt(-1.0), "-1");
        assert_eq!(fmt(100.0), "100");
    }

    #[test]
    fn fractions_render_minimally() {
        assert_eq!(fmt(1.5), "1.5");
        assert_eq!(fmt(0.1), "0.1");
        assert_eq!(fmt(-0.5), "-0.5");
    }

    #[test]
    fn zero_has_no_sign() {
        assert_eq!(fmt(0.0), "0");
        assert_eq!(fmt(-0.0), "0");
    }

    #[test]
    fn large_magnitude_uses_exponential_notation() {
        assert_eq!(fmt(1e21), "1e+21");
        assert_eq!(fmt(1.23e21), "1.23e+21");
    }

    #[test]
    fn small_magnitude_uses_exponential_notation() {
        assert_eq!(fmt(1e-7), "1e-7");
    }

    #[test]
    fn small_magnitude_within_range_uses_decimal() {
        assert_eq!(fmt(1e-6), "0.000001");
    }

    #[test]
    fn int64_path_bypasses_float_formatting() {
        let n = Number::from(9_007_199_254_740_993_i64);
        assert_eq!(format_number(&n).unwrap(), "9007199254740993");
    }

    #[test]
    fn nan_and_infinity_are_rejected() {
        assert!(matches!(
            format_ecma_double(f64::NAN),
            Err(CanonError::NonFiniteNumber)
        ));
        assert!(matches!(
            format_ecma_double(f64::INFINITY),
            Err(CanonError::NonFiniteNumber)
        ));
    }
}
