//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur while building or validating a benchmark configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Batch size must be greater than 0.
    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    /// Batch count must be greater than 0.
    #[error("batch count must be greater than 0")]
    InvalidBatchCount,

    /// A required setting was not provided.
    #[error("missing required setting: {key}")]
    MissingSetting { key: String },

    /// A setting could not be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// Generic invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A resource setting is outside sane bounds.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid_value(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A trait for validating configuration parameters.
///
/// Implementors provide [`ConfigValidator::validate`]; the remaining methods
/// are reusable checks for the individual fields.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Validates a batch size.
    fn validate_batch_size(&self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            Err(ConfigError::InvalidBatchSize)
        } else {
            Ok(())
        }
    }

    /// Validates a batch count.
    fn validate_batch_count(&self, batch_count: usize) -> Result<(), ConfigError> {
        if batch_count == 0 {
            Err(ConfigError::InvalidBatchCount)
        } else {
            Ok(())
        }
    }

    /// Validates image dimensions.
    fn validate_image_dimensions(&self, height: usize, width: usize) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("Image dimensions must be positive, got {height}x{width}"),
            })
        } else {
            Ok(())
        }
    }

    /// Validates thread count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;

        if thread_count == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Thread count must be greater than 0".to_string(),
            })
        } else if thread_count > MAX_REASONABLE_THREADS {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Thread count {} exceeds reasonable maximum of {}",
                    thread_count, MAX_REASONABLE_THREADS
                ),
            })
        } else {
            Ok(())
        }
    }
}

/// Extension trait wrapping validation failures into [`BenchError`].
///
/// [`BenchError`]: crate::core::BenchError
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates and converts any failure into `BenchError::Config`.
    fn validate_and_wrap(self) -> Result<Self, crate::core::BenchError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestValidator;
    impl ConfigValidator for TestValidator {
        fn validate(&self) -> Result<(), ConfigError> {
            Ok(())
        }
    }

    #[test]
    fn test_validate_batch_size() {
        let validator = TestValidator;
        assert!(validator.validate_batch_size(1).is_ok());
        assert!(validator.validate_batch_size(10).is_ok());
        assert!(validator.validate_batch_size(0).is_err());
    }

    #[test]
    fn test_validate_batch_count() {
        let validator = TestValidator;
        assert!(validator.validate_batch_count(1).is_ok());
        assert!(matches!(
            validator.validate_batch_count(0),
            Err(ConfigError::InvalidBatchCount)
        ));
    }

    #[test]
    fn test_validate_image_dimensions() {
        let validator = TestValidator;
        assert!(validator.validate_image_dimensions(224, 224).is_ok());
        assert!(validator.validate_image_dimensions(0, 224).is_err());
        assert!(validator.validate_image_dimensions(224, 0).is_err());
    }

    #[test]
    fn test_validate_thread_count() {
        let validator = TestValidator;
        assert!(validator.validate_thread_count(1).is_ok());
        assert!(validator.validate_thread_count(64).is_ok());
        assert!(validator.validate_thread_count(0).is_err());
        assert!(validator.validate_thread_count(512).is_err());
    }

    #[test]
    fn test_invalid_value_message() {
        let err = ConfigError::invalid_value("CK_BATCH_SIZE", "four", "expected an integer");
        assert_eq!(
            err.to_string(),
            "invalid value 'four' for CK_BATCH_SIZE: expected an integer"
        );
    }
}
