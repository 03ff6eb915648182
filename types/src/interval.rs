//! Monitor interval parsing.
//!
//! On the wire an interval is either an integer count of nanoseconds or a
//! duration string such as `"1m30s"`, `"500ms"` or `"1.5s"`. Intervals are
//! always encoded back as nanoseconds.

use std::time::Duration;

use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Largest representable interval, matching a signed 64-bit nanosecond count.
const MAX_NANOS: u128 = i64::MAX as u128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration must not be empty")]
    Empty,
    #[error("duration must not be negative: {input:?}")]
    Negative { input: String },
    #[error("invalid number in duration {input:?}")]
    InvalidNumber { input: String },
    #[error("missing unit in duration {input:?}")]
    MissingUnit { input: String },
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration {input:?} is out of range")]
    Overflow { input: String },
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// Parses a sequence of `<decimal><unit>` pairs, e.g. `"1h2m3.5s"`.
///
/// A bare `"0"` is accepted without a unit.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() {
        return Err(DurationError::Empty);
    }
    if input.starts_with('-') {
        return Err(DurationError::Negative {
            input: input.to_owned(),
        });
    }
    let body = input.strip_prefix('+').unwrap_or(input);
    if body == "0" {
        return Ok(Duration::ZERO);
    }
    if body.is_empty() {
        return Err(DurationError::InvalidNumber {
            input: input.to_owned(),
        });
    }

    let overflow = || DurationError::Overflow {
        input: input.to_owned(),
    };
    let invalid = || DurationError::InvalidNumber {
        input: input.to_owned(),
    };

    let mut rest = body;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number_char(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail.find(is_number_char).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);
        rest = tail;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        if unit.is_empty() {
            return Err(DurationError::MissingUnit {
                input: input.to_owned(),
            });
        }
        let scale = unit_scale(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_owned(),
            input: input.to_owned(),
        })?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_err| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        // Digits finer than one nanosecond are dropped.
        let mut place = scale;
        for digit in fraction.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            nanos += u128::from(digit - b'0') * place;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        if total > MAX_NANOS {
            return Err(overflow());
        }
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_err| overflow())
}

/// Serde adapter for the wire form of an interval.
pub(crate) mod wire {
    use std::fmt;
    use std::time::Duration;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    use super::{MAX_NANOS, parse_duration};

    pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let nanos = u64::try_from(value.as_nanos().min(MAX_NANOS)).unwrap_or(i64::MAX as u64);
        serializer.serialize_u64(nanos)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IntervalVisitor)
    }

    struct IntervalVisitor;

    impl Visitor<'_> for IntervalVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a duration string or a non-negative nanosecond count")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Duration, E> {
            if u128::from(value) > MAX_NANOS {
                return Err(E::custom(format!("interval {value}ns is out of range")));
            }
            Ok(Duration::from_nanos(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Duration, E> {
            u64::try_from(value)
                .map(Duration::from_nanos)
                .map_err(|_err| E::custom(format!("interval must not be negative: {value}")))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse_duration(value).map_err(E::custom)
        }
    }
}
