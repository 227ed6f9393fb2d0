//! Engine configuration
//!
//! Typed configuration for the pipeline's timing parameters, loadable from
//! a JSON document or assembled with the builder-style setters. Validation
//! happens explicitly so an embedding process can surface configuration
//! mistakes before subscribing to a live event source.

use serde::Deserialize;
use thiserror::Error;

use crate::{
    events::LocationId,
    pipeline::{
        stages::{DeadlineStage, DeduplicationStage, LocationFilterStage},
        Pipeline,
    },
    time::TimeSource,
};

/// Configuration mistakes caught by [`EngineConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The run window must be positive
    #[error("run time must be positive")]
    ZeroRunTime,

    /// The averaging period must be positive
    #[error("averaging period must be positive")]
    ZeroAveragingPeriod,

    /// The bin retention period must be positive
    #[error("bin retention must be positive")]
    ZeroRetention,

    /// Retention shorter than the averaging period would force-retire bins
    /// before they can collect a full period of data
    #[error("bin retention {retention_secs}s is shorter than the averaging period {period_secs}s")]
    RetentionTooShort {
        /// Configured retention, seconds
        retention_secs: u64,
        /// Configured averaging period, seconds
        period_secs: u64,
    },
}

/// Timing parameters of one monitoring run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long to process events, in seconds
    pub run_time_secs: u64,
    /// How long a seen event id suppresses repeats, in seconds
    pub dedup_ttl_secs: u64,
    /// Width of one averaging bin, in seconds
    pub averaging_period_secs: u64,
    /// How long a bin is retained past its end before finalizing, in seconds
    pub expiry_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_time_secs: 60,
            dedup_ttl_secs: 5,
            averaging_period_secs: 10,
            expiry_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Start from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the run window
    pub fn run_time_secs(mut self, secs: u64) -> Self {
        self.run_time_secs = secs;
        self
    }

    /// Set the deduplication TTL
    pub fn dedup_ttl_secs(mut self, secs: u64) -> Self {
        self.dedup_ttl_secs = secs;
        self
    }

    /// Set the averaging bin width
    pub fn averaging_period_secs(mut self, secs: u64) -> Self {
        self.averaging_period_secs = secs;
        self
    }

    /// Set the bin retention period
    pub fn expiry_secs(mut self, secs: u64) -> Self {
        self.expiry_secs = secs;
        self
    }

    /// Check the parameters for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_time_secs == 0 {
            return Err(ConfigError::ZeroRunTime);
        }
        if self.averaging_period_secs == 0 {
            return Err(ConfigError::ZeroAveragingPeriod);
        }
        if self.expiry_secs == 0 {
            return Err(ConfigError::ZeroRetention);
        }
        if self.expiry_secs < self.averaging_period_secs {
            return Err(ConfigError::RetentionTooShort {
                retention_secs: self.expiry_secs,
                period_secs: self.averaging_period_secs,
            });
        }
        Ok(())
    }

    /// Assemble the standard filtering chain from this configuration
    ///
    /// Deadline → location filter → deduplication, each stage with its own
    /// handle on `clock`.
    pub fn build_pipeline<T>(
        &self,
        valid_locations: impl IntoIterator<Item = LocationId>,
        clock: T,
    ) -> Result<Pipeline, ConfigError>
    where
        T: TimeSource + Clone + 'static,
    {
        self.validate()?;
        Ok(
            Pipeline::new(DeadlineStage::new(self.run_time_secs, clock.clone()))
                .then(LocationFilterStage::new(valid_locations))
                .then(DeduplicationStage::new(self.dedup_ttl_secs, clock)),
        )
    }
}
