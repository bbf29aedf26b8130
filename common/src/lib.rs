//! Value types shared by the bridge crates.
//!
//! Nothing in here knows about the wire protocol. It holds the pieces every
//! layer needs:
//!
//! - [`ErrorLocation`]: where an error was raised, captured with `#[track_caller]`
//! - [`RedactedToken`]: a bearer credential that stays out of logs
//! - [`RedactError`]: raised when a redacted value is serialized by accident

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
