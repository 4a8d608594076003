//! # Amount Parsing
//!
//! Conversion between user-typed decimal strings and base units. Raw strings
//! from the presentation layer always pass through here; the core never takes
//! a pre-parsed amount from user input.

use crate::domain::{Amount, ValidationError, NATIVE_DECIMALS};

/// Parse a decimal string ("0.01") into base units with `decimals` places.
///
/// Zero is accepted; use [`parse_positive_units`] where zero is invalid.
pub fn parse_units(text: &str, decimals: u8) -> Result<Amount, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyAmount);
    }

    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ValidationError::MalformedAmount(text.to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(ValidationError::MalformedAmount(text.to_string()));
    }
    if frac_part.len() > usize::from(decimals) {
        return Err(ValidationError::MalformedAmount(format!(
            "{} has more than {} decimal places",
            text, decimals
        )));
    }

    let too_large = || ValidationError::MalformedAmount(format!("{} is too large", text));

    let int_value = if int_part.is_empty() {
        Amount::zero()
    } else {
        Amount::from_dec_str(int_part).map_err(|_| too_large())?
    };

    let padded = format!("{:0<width$}", frac_part, width = usize::from(decimals));
    let frac_value = if padded.is_empty() {
        Amount::zero()
    } else {
        Amount::from_dec_str(&padded).map_err(|_| too_large())?
    };

    int_value
        .checked_mul(Amount::exp10(usize::from(decimals)))
        .and_then(|scaled| scaled.checked_add(frac_value))
        .ok_or_else(too_large)
}

/// Parse a strictly positive amount.
pub fn parse_positive_units(text: &str, decimals: u8) -> Result<Amount, ValidationError> {
    let value = parse_units(text, decimals)?;
    if value.is_zero() {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(value)
}

/// Parse an ETH amount into wei.
pub fn parse_ether(text: &str) -> Result<Amount, ValidationError> {
    parse_units(text, NATIVE_DECIMALS)
}

/// Render base units as a decimal string, keeping at least one fractional
/// digit ("1.0", "0.015").
pub fn format_units(value: Amount, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        format!("{}.0", int_part)
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Render wei as ETH.
pub fn format_ether(value: Amount) -> String {
    format_units(value, NATIVE_DECIMALS)
}

/// Convert a duration typed in (possibly fractional) minutes into whole
/// seconds, rounding down. An empty string counts as zero.
pub fn parse_duration_minutes(text: &str) -> Result<u64, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::NonPositiveDuration);
    }

    let minutes: f64 = text
        .parse()
        .map_err(|_| ValidationError::MalformedDuration(text.to_string()))?;
    if !minutes.is_finite() {
        return Err(ValidationError::MalformedDuration(text.to_string()));
    }

    let seconds = (minutes * 60.0).floor();
    if seconds < 1.0 {
        return Err(ValidationError::NonPositiveDuration);
    }
    if seconds >= u64::MAX as f64 {
        return Err(ValidationError::MalformedDuration(text.to_string()));
    }
    Ok(seconds as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> Amount {
        Amount::from_dec_str(s).unwrap()
    }

    #[test]
    fn test_parse_ether_whole_and_fraction() {
        assert_eq!(parse_ether("1").unwrap(), wei("1000000000000000000"));
        assert_eq!(parse_ether("0.01").unwrap(), wei("10000000000000000"));
        assert_eq!(parse_ether(" 2.5 ").unwrap(), wei("2500000000000000000"));
        assert_eq!(parse_ether(".5").unwrap(), wei("500000000000000000"));
        assert_eq!(parse_ether("3.").unwrap(), wei("3000000000000000000"));
    }

    #[test]
    fn test_parse_ether_smallest_unit() {
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), Amount::one());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["abc", "-1", "1.2.3", "1e18", "+1", ".", "1,5", "0x10"] {
            assert!(
                matches!(parse_ether(bad), Err(ValidationError::MalformedAmount(_))),
                "{} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        assert!(matches!(
            parse_ether("0.0000000000000000001"),
            Err(ValidationError::MalformedAmount(_))
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_ether(""), Err(ValidationError::EmptyAmount));
        assert_eq!(parse_ether("   "), Err(ValidationError::EmptyAmount));
    }

    #[test]
    fn test_parse_positive_rejects_zero() {
        assert_eq!(
            parse_positive_units("0", 18),
            Err(ValidationError::NonPositiveAmount)
        );
        assert_eq!(
            parse_positive_units("0.000", 18),
            Err(ValidationError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_parse_overflow() {
        let huge = "9".repeat(80);
        assert!(matches!(
            parse_ether(&huge),
            Err(ValidationError::MalformedAmount(_))
        ));
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(Amount::zero()), "0.0");
        assert_eq!(format_ether(wei("1000000000000000000")), "1.0");
        assert_eq!(format_ether(wei("10000000000000000")), "0.01");
        assert_eq!(format_ether(wei("1500000000000000001")), "1.500000000000000001");
    }

    #[test]
    fn test_format_units_zero_decimals() {
        assert_eq!(format_units(Amount::from(42), 0), "42");
        assert_eq!(format_units(Amount::from(42), 2), "0.42");
    }

    #[test]
    fn test_duration_minutes() {
        assert_eq!(parse_duration_minutes("10").unwrap(), 600);
        assert_eq!(parse_duration_minutes("0.5").unwrap(), 30);
        assert_eq!(parse_duration_minutes("0.999").unwrap(), 59);
    }

    #[test]
    fn test_duration_rejects_non_positive() {
        assert_eq!(
            parse_duration_minutes("0"),
            Err(ValidationError::NonPositiveDuration)
        );
        assert_eq!(
            parse_duration_minutes(""),
            Err(ValidationError::NonPositiveDuration)
        );
        assert_eq!(
            parse_duration_minutes("-5"),
            Err(ValidationError::NonPositiveDuration)
        );
        assert_eq!(
            parse_duration_minutes("0.001"),
            Err(ValidationError::NonPositiveDuration)
        );
    }

    #[test]
    fn test_duration_rejects_garbage() {
        assert!(matches!(
            parse_duration_minutes("ten"),
            Err(ValidationError::MalformedDuration(_))
        ));
        assert!(matches!(
            parse_duration_minutes("inf"),
            Err(ValidationError::MalformedDuration(_))
        ));
    }
}
