//! Entry validation support.

use crate::error::ValidationError;

/// Trait for configuration entry validation.
///
/// Implement this trait on your configuration type and call
/// [`ConfigurationManagerBuilder::validate_entries`](crate::core::ConfigurationManagerBuilder::validate_entries)
/// to check every entry before a store is installed.
///
/// # Examples
///
/// ```rust
/// use keyswap_config::core::Validate;
/// use keyswap_config::error::ValidationError;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, Clone)]
/// struct Signing {
///     secret: String,
///     max_age: u32,
/// }
///
/// impl Validate for Signing {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.secret.len() < 16 {
///             return Err(ValidationError::invalid_field(
///                 "secret",
///                 "must be at least 16 characters"
///             ));
///         }
///
///         if self.max_age == 0 {
///             return Err(ValidationError::invalid_field(
///                 "max_age",
///                 "must be greater than 0"
///             ));
///         }
///
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Validate one entry.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
