//! ICS feed parsing.
//!
//! Reads feed documents according to RFC 5545. Generation is never needed:
//! the destination calendar is written through its own API.

mod parse;

pub use parse::{FeedDocument, FeedEvent, Recurrence, parse_feed};
