use std::time::Duration;

use crate::error::DurationError;

/// Parses a duration string such as `1d2h3m4s` into a [`Duration`].
///
/// The input is any number of `<digits><unit>` groups where unit is one of
/// `s`, `m`, `h` or `d`. An empty string parses as zero. Overflow and unknown
/// units are rejected.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ducks_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || {
        DurationError::Invalid {
            input: input.to_string(),
        }
    };

    let mut total: u64 = 0;
    let mut chars = input.trim().chars().peekable();

    while chars.peek().is_some() {
        let mut number_str = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                number_str.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        if number_str.is_empty() {
            return Err(invalid());
        }

        let number: u64 = number_str.parse().map_err(|_| invalid())?;
        let multiplier: u64 = match chars.next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 24 * 60 * 60,
            _ => return Err(invalid()),
        };

        total = number
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
    }

    Ok(Duration::from_secs(total))
}

/// Renders a [`Duration`] back into the `1d2h3m4s` form accepted by
/// [`parse_duration`]. Sub-second precision is dropped.
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (unit, size) in [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        let count = secs / size;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            secs %= size;
        }
    }
    out
}
