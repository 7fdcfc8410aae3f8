//! Pipeline configuration.
//!
//! Configuration is passed explicitly to the [`Packetizer`](crate::Packetizer);
//! nothing in the pipeline reads process-wide settings.
//!
//! # Example
//!
//! ```
//! use postern_mail::config::{PipelineConfig, PipelineConfigBuilder};
//!
//! // Use defaults
//! let config = PipelineConfig::default();
//! assert!(!config.include_sent_time);
//!
//! // Or use the builder
//! let config = PipelineConfigBuilder::new()
//!     .include_sent_time(true)
//!     .with_compression_level(3)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::limits::{DEFAULT_COMPRESSION_LEVEL, REASSEMBLY_TIMEOUT_SECS};

/// Settings for packetizing and unpacking messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Whether outgoing messages carry a `Date` header.
    ///
    /// When false the `Date` header is removed so the send time is not
    /// revealed to recipients.
    pub include_sent_time: bool,

    /// zstd compression level (1-22).
    pub compression_level: i32,

    /// Seconds to wait for the remaining packets of a message.
    pub reassembly_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            include_sent_time: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            reassembly_timeout_secs: REASSEMBLY_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigError::InvalidValue {
                field: "compression_level".into(),
                reason: format!("must be between 1 and 22, got {}", self.compression_level),
            });
        }

        if self.reassembly_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reassembly_timeout_secs".into(),
                reason: "reassembly timeout must be greater than zero".into(),
            });
        }

        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Clone, Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include or omit the `Date` header on outgoing messages.
    pub fn include_sent_time(mut self, include: bool) -> Self {
        self.config.include_sent_time = include;
        self
    }

    /// Set the zstd compression level.
    ///
    /// Levels outside 1-22 fail [`PipelineConfig::validate`].
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set the reassembly timeout in seconds.
    pub fn with_reassembly_timeout(mut self, secs: u64) -> Self {
        self.config.reassembly_timeout_secs = secs;
        self
    }

    /// Finish building.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
