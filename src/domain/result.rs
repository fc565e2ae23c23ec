//! Result type alias
//!
//! Convenience alias that uses [`OffstudyError`] as the error type.

use super::errors::OffstudyError;

/// Result type alias for off-study operations
///
/// # Examples
///
/// ```
/// use offstudy::domain::result::Result;
/// use offstudy::domain::errors::OffstudyError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(OffstudyError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, OffstudyError>;
