//! Repository configuration error type.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    MissingField,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::MissingField => "DSG_CONFIG_MISSING_FIELD",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed `RepositoryConfig` failed validation. This crate never
/// loads configuration from disk — that is the external CLI
/// collaborator's job — but it does reject a well-typed value with
/// empty required fields before opening a transaction against it.
#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn missing_field(field: &str) -> Self {
        Self {
            code: ConfigErrorCode::MissingField,
            message: format!("repository config is missing required field `{}`", field),
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::errors::DsgError {
    fn from(err: ConfigError) -> Self {
        crate::errors::DsgError::new(crate::errors::ErrorKind::ConfigInvalid, err.message)
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
