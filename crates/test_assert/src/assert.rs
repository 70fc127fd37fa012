//! Assertion Primitives
//!
//! Comparison helpers for tests. Each one returns silently on success and
//! panics with a descriptive message on failure.
//!
//! ```rust
//! use test_assert::assert;
//!
//! assert::equal(2 + 2, 4);
//! assert::string_contains("policy not found", "not found");
//! assert::delta(9.95_f64, 10.0, 0.1);
//! ```

use std::error::Error;
use std::fmt::{Debug, Display};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Maximum distance, in milliseconds, for two instants to count as "the same time"
const TIMEISH_TOLERANCE_MS: i64 = 1000;

/// Asserts that `actual == expected`
#[track_caller]
pub fn equal<T: PartialEq + Debug>(actual: T, expected: T) {
    if actual != expected {
        panic!("\nexpected: '{:?}'\nto equal: '{:?}'", expected, actual);
    }
}

/// Asserts that `actual != expected`
#[track_caller]
pub fn not_equal<T: PartialEq + Debug>(actual: T, expected: T) {
    if actual == expected {
        panic!("\nexpected: '{:?}'\nto not equal: '{:?}'", expected, actual);
    }
}

/// Asserts that two byte sequences are identical
#[track_caller]
pub fn bytes(actual: &[u8], expected: &[u8]) {
    if actual != expected {
        panic!("\nexpected: '{:?}'\nto equal: '{:?}'", expected, actual);
    }
}

/// Asserts that two lists have the same length and the same values in the same order
#[track_caller]
pub fn list<T: PartialEq + Debug>(actuals: &[T], expecteds: &[T]) {
    equal(actuals.len(), expecteds.len());
    for (actual, expected) in actuals.iter().zip(expecteds) {
        equal(actual, expected);
    }
}

/// Asserts that an optional value is absent
#[track_caller]
pub fn nil<T: Debug>(actual: &Option<T>) {
    if let Some(value) = actual {
        panic!("expected {:?} to be nil", value);
    }
}

/// Asserts that an optional value is present
#[track_caller]
pub fn not_nil<T: Debug>(actual: &Option<T>) {
    if actual.is_none() {
        panic!("expected {:?} to be not nil", actual);
    }
}

/// Asserts that a value is true
#[track_caller]
pub fn is_true(actual: bool) {
    if !actual {
        panic!("expected true, got false");
    }
}

/// Asserts that a value is false
#[track_caller]
pub fn is_false(actual: bool) {
    if actual {
        panic!("expected false, got true");
    }
}

/// Asserts that `actual` contains `expected`
#[track_caller]
pub fn string_contains(actual: &str, expected: &str) {
    if !actual.contains(expected) {
        panic!("\nexpected: '{}'\nto contain: '{}'", actual, expected);
    }
}

/// Asserts that `expected` appears somewhere in the `source()` chain of `actual`
///
/// Each link is downcast to `E` and compared with `==`, so wrapped errors
/// match as long as the wrapper exposes its cause through `source()`.
#[track_caller]
pub fn error_is<E>(actual: &(dyn Error + 'static), expected: &E)
where
    E: Error + PartialEq + 'static,
{
    let mut current = Some(actual);
    while let Some(err) = current {
        if err.downcast_ref::<E>() == Some(expected) {
            return;
        }
        current = err.source();
    }
    panic!("expected '{}' to be '{}'", actual, expected);
}

/// Asserts that `actual` is within one second of now
#[track_caller]
pub fn nowish(actual: DateTime<Utc>) {
    let now = Utc::now();
    if !within_tolerance(actual, now) {
        panic!("expected '{}' to be nowish", actual);
    }
}

/// Parses `actual` with a `chrono` format string, then asserts it is within one second of now
///
/// Formats without an offset are interpreted as UTC.
#[track_caller]
pub fn nowish_str(actual: &str, format: &str) {
    let parsed = DateTime::parse_from_str(actual, format)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(actual, format).map(|d| d.and_utc()));

    match parsed {
        Ok(date) => nowish(date),
        Err(_) => panic!("date is not a valid format: {}", actual),
    }
}

/// Asserts that two instants are within one second of each other
#[track_caller]
pub fn timeish(actual: DateTime<Utc>, expected: DateTime<Utc>) {
    if !within_tolerance(actual, expected) {
        panic!("expected '{}' to be around '{}'", actual, expected);
    }
}

/// Fails the current test unconditionally
#[track_caller]
pub fn fail(message: impl Display) -> ! {
    panic!("{}", message);
}

/// Asserts that `expected - delta <= actual <= expected + delta`
///
/// Both bounds are inclusive. Integer bounds saturate at the type's limits.
#[track_caller]
pub fn delta<T: Numeric>(actual: T, expected: T, delta: T) {
    if actual < expected.lower_bound(delta) || actual > expected.upper_bound(delta) {
        panic!(
            "\nexpected: '{}'\nto be within {} of equal: '{}'",
            actual, delta, expected
        );
    }
}

fn within_tolerance(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).num_milliseconds().abs() <= TIMEISH_TOLERANCE_MS
}

/// Ordered numeric kinds accepted by [`delta`]
pub trait Numeric: Copy + PartialOrd + Display {
    /// `self - delta`, without overflowing
    fn lower_bound(self, delta: Self) -> Self;

    /// `self + delta`, without overflowing
    fn upper_bound(self, delta: Self) -> Self;
}

macro_rules! integer_numeric {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                fn lower_bound(self, delta: Self) -> Self {
                    self.saturating_sub(delta)
                }

                fn upper_bound(self, delta: Self) -> Self {
                    self.saturating_add(delta)
                }
            }
        )*
    };
}

macro_rules! float_numeric {
    ($($t:ty),*) => {
        $(
            impl Numeric for $t {
                fn lower_bound(self, delta: Self) -> Self {
                    self - delta
                }

                fn upper_bound(self, delta: Self) -> Self {
                    self + delta
                }
            }
        )*
    };
}

integer_numeric!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
float_numeric!(f32, f64);
