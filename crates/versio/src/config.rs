//! Runtime configuration for translation and clone tracing.
//!
//! All fields are optional in TOML; omitted fields take their defaults.
//!
//! ```toml
//! [translate]
//! max_depth = 32
//! mark_processed = true
//!
//! [trace]
//! cascade_round_cap = 500
//! ```

use crate::{
    DEFAULT_MAX_TRANSLATE_DEPTH,
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::Io { .. } => ErrorClass::NotFound,
            Self::Invalid(_) | Self::Parse(_) => ErrorClass::Unsupported,
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.class(), ErrorOrigin::Config, err.to_string())
    }
}

///
/// VersioConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersioConfig {
    pub translate: TranslateConfig,
    pub trace: TraceConfig,
}

impl VersioConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.translate.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "translate.max_depth must be at least 1".to_string(),
            ));
        }
        if self.trace.cascade_round_cap == Some(0) {
            return Err(ConfigError::Invalid(
                "trace.cascade_round_cap must be at least 1 when set".to_string(),
            ));
        }

        Ok(())
    }
}

///
/// TranslateConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslateConfig {
    /// Nesting limit for translator-to-translator calls.
    pub max_depth: u32,

    /// Mark entities as processed in the trace cache when a translator visits them.
    pub mark_processed: bool,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_TRANSLATE_DEPTH,
            mark_processed: true,
        }
    }
}

///
/// TraceConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Upper bound on cascade rounds. `None` derives it from the cache size.
    pub cascade_round_cap: Option<u32>,
}

///
/// TESTS
///
