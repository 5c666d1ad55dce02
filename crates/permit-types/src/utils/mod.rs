//! Utility functions for formatting, unit conversion and time.

pub mod formatting;
pub mod helpers;
pub mod units;

pub use formatting::{format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix};
pub use helpers::current_timestamp;
pub use units::{parse_token_amount, UnitsError};
