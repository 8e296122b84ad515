//! Normalisation of callable return values.
//!
//! Protected callables may return `()` or any `Result<T, E>` whose error
//! converts into a [`BoxError`]. [`IntoOutcome`] folds both shapes into a
//! single `Result` so the domain can tell success from failure.

use super::error::BoxError;

/// A return value the domain knows how to interpret as success or failure.
pub trait IntoOutcome {
    /// The success value.
    type Output;

    /// Converts into a result with a boxed error.
    fn into_outcome(self) -> Result<Self::Output, BoxError>;
}

/// `()` always succeeds.
impl IntoOutcome for () {
    type Output = ();

    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    E: Into<BoxError>,
{
    type Output = T;

    fn into_outcome(self) -> Result<T, BoxError> {
        self.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_is_success() {
        assert!(().into_outcome().is_ok());
    }

    #[test]
    fn test_result_error_is_boxed() {
        let ok: Result<u8, std::io::Error> = Ok(3);
        assert_eq!(ok.into_outcome().ok(), Some(3));

        let err: Result<u8, &str> = Err("nope");
        assert_eq!(err.into_outcome().unwrap_err().to_string(), "nope");
    }
}
