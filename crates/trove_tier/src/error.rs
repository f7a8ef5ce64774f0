// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error type for tier operations.

/// An error from a cache tier.
///
/// Opaque wrapper around whatever the backing store reported (connection refused,
/// timeout, protocol error). Use [`std::error::Error::source()`] or
/// `ohno::ErrorExt::find_source` to reach the underlying cause.
///
/// # Example
///
/// ```
/// use trove_tier::Error;
///
/// let error = Error::from_message("connection refused");
/// assert!(error.to_string().contains("connection refused"));
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a tier error from any error or message.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for tier operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_cause_message() {
        let error = Error::from_message("socket closed");
        let display_str = format!("{error}");
        assert!(display_str.contains("socket closed"), "got: {display_str}");
    }

    #[test]
    fn error_keeps_io_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let error = Error::from_message(io);
        assert!(ohno::ErrorExt::find_source::<std::io::Error>(&error).is_some());
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::from_message("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(format!("{err}").contains("expected failure"));
    }
}
