//! Shared helpers.

pub mod datetime;

pub use datetime::{format_timestamp, parse_timestamp};
