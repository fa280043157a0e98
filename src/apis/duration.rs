//! Go `time.Duration` strings, the format `metav1.Duration` fields such as `relistDuration`
//! are written in: a sequence of decimal numbers, each with an optional fraction and a
//! unit, like `300ms`, `1.5h` or `2h45m`.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {value:?}")]
    UnknownUnit { unit: String, value: String },
    #[error("duration {0:?} is negative")]
    Negative(String),
    #[error("duration {0:?} overflows")]
    Overflow(String),
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

/// Parses a Go duration string. Negative durations are rejected since every duration field
/// in the catalog is an interval.
pub fn parse_duration(value: &str) -> Result<Duration, DurationError> {
    let original = value;
    let invalid = || DurationError::Invalid(original.to_string());

    let mut rest = value.trim();
    let negative = match rest.as_bytes().first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, tail) = rest.split_at(int_len);
        let (frac_part, tail) = match tail.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", tail),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map_or(tail.len(), |(i, _)| i);
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(original.to_string()));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| DurationError::UnknownUnit {
                unit: unit.to_string(),
                value: original.to_string(),
            })?;

        let overflow = || DurationError::Overflow(original.to_string());
        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;
        // Digits past nanosecond precision cannot change the result.
        let frac_part = &frac_part[..frac_part.len().min(18)];
        if !frac_part.is_empty() {
            let digits: u128 = frac_part.parse().map_err(|_| overflow())?;
            let divisor = 10u128.pow(frac_part.len() as u32);
            nanos = nanos
                .checked_add(digits * scale / divisor)
                .ok_or_else(overflow)?;
        }
        total = total.checked_add(nanos).ok_or_else(overflow)?;
        rest = tail;
    }

    if negative && total > 0 {
        return Err(DurationError::Negative(original.to_string()));
    }
    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| DurationError::Overflow(original.to_string()))?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}
