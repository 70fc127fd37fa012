//! Test Assertions Crate
//!
//! Assertion helpers that give better failure messages than the bare
//! `assert!` family, plus a matcher for validation errors.
//!
//! # Modules
//!
//! - `assert`: Generic comparison primitives (equality, containment, deltas, times)
//! - `validation`: Field-level matching over anything implementing `ErrorSource`
//!
//! Every assertion panics on mismatch, which stops the current test and
//! leaves the rest of the suite running. All of them are `#[track_caller]`
//! so the reported location is the test line, not this crate.

pub mod assert;
pub mod validation;

pub use validation::{Expect, Validation};
pub use validation_port::{ErrorSource, InvalidRecord};
