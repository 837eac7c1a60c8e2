// ABOUTME: ISO-8601 duration parsing for test-utility token expiry strings
// ABOUTME: Accepts the PnDTnHnMnS subset and reports precise parse failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

use chrono::Duration;
use thiserror::Error;

/// Why an ISO-8601 duration string failed to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    /// Input does not start with the mandatory `P`
    #[error("duration must start with 'P'")]
    MissingPrefix,
    /// No date or time component after the designators
    #[error("duration has no components")]
    Empty,
    /// Digits that do not form a number, or a number too large
    #[error("invalid number in duration")]
    InvalidNumber,
    /// Digits not followed by a unit designator
    #[error("number without unit designator in duration")]
    MissingDesignator,
    /// A designator outside the supported D/H/M/S set, or one repeated
    #[error("unexpected designator '{0}' in duration")]
    UnexpectedDesignator(char),
    /// Combined duration exceeds the representable range
    #[error("duration out of range")]
    OutOfRange,
}

fn parse_components(
    part: &str,
    designators: &[(char, i64)],
) -> Result<i64, DurationParseError> {
    let mut total: i64 = 0;
    let mut number = String::new();
    let mut next_allowed = 0;

    for c in part.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let position = designators
            .iter()
            .position(|(d, _)| d.eq_ignore_ascii_case(&c))
            .ok_or(DurationParseError::UnexpectedDesignator(c))?;
        if position < next_allowed {
            return Err(DurationParseError::UnexpectedDesignator(c));
        }
        if number.is_empty() {
            return Err(DurationParseError::InvalidNumber);
        }
        let value: i64 = number
            .parse()
            .map_err(|_| DurationParseError::InvalidNumber)?;
        let scaled = value
            .checked_mul(designators[position].1)
            .ok_or(DurationParseError::OutOfRange)?;
        total = total
            .checked_add(scaled)
            .ok_or(DurationParseError::OutOfRange)?;
        number.clear();
        next_allowed = position + 1;
    }

    if !number.is_empty() {
        return Err(DurationParseError::MissingDesignator);
    }
    Ok(total)
}

/// Parse an ISO-8601 duration of the form `PnDTnHnMnS`.
///
/// Designators are case-insensitive and each may appear at most once, in
/// order. Week, month, year, and fractional-second forms are rejected.
///
/// # Errors
/// Returns a [`DurationParseError`] describing the first malformed element.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    let rest = trimmed
        .strip_prefix('P')
        .or_else(|| trimmed.strip_prefix('p'))
        .ok_or(DurationParseError::MissingPrefix)?;

    let (date_part, time_part) = match rest.split_once(['T', 't']) {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    if date_part.is_empty() && time_part.is_none_or(str::is_empty) {
        return Err(DurationParseError::Empty);
    }

    let mut seconds = parse_components(date_part, &[('D', 86_400)])?;
    if let Some(time) = time_part {
        if time.is_empty() {
            return Err(DurationParseError::Empty);
        }
        let time_seconds = parse_components(time, &[('H', 3600), ('M', 60), ('S', 1)])?;
        seconds = seconds
            .checked_add(time_seconds)
            .ok_or(DurationParseError::OutOfRange)?;
    }

    Duration::try_seconds(seconds).ok_or(DurationParseError::OutOfRange)
}
