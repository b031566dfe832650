// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Retry options loaded from JSON configuration.
//!
//! # Example
//! ```
//! # use google_cloud_storage_retry::config::RetryConfig;
//! use std::time::Duration;
//!
//! let options = RetryConfig::from_json(r#"{
//!     "initialBackoffSecs": 0.5,
//!     "maxBackoffSecs": 10,
//!     "retryableCodes": [429, 503]
//! }"#)?;
//! assert!(options.should_retry(429));
//! assert!(!options.should_retry(500));
//! assert_eq!(options.delay(1), Duration::from_millis(500));
//! # Ok::<(), google_cloud_storage_retry::error::ConfigError>(())
//! ```

use crate::error::ConfigError;
use crate::retry_options::RetryOptions;
use crate::retry_predicate::from_error_codes;
use crate::retry_timings::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF, RetryTimings,
};

/// The serialized form of [RetryOptions].
///
/// All the fields are optional. Missing timings use the defaults, a missing
/// list of codes disables retries.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetryConfig {
    /// The wait before the first retry, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_backoff_secs: Option<f64>,

    /// The upper bound for any wait, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_secs: Option<f64>,

    /// Scales the exponential step between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,

    /// The HTTP status codes that are retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable_codes: Option<Vec<i32>>,
}

impl RetryConfig {
    /// Parses a JSON document and builds the options it describes.
    pub fn from_json(json: &str) -> Result<RetryOptions, ConfigError> {
        let config = serde_json::from_str::<Self>(json)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.build()
    }

    /// Validates the configuration and builds the options.
    pub fn build(&self) -> Result<RetryOptions, ConfigError> {
        let initial = self.initial_backoff_secs;
        let maximum = self.max_backoff_secs;
        let multiplier = self.backoff_multiplier;
        let timings = RetryTimings::from_secs_f64(
            initial.unwrap_or(DEFAULT_INITIAL_BACKOFF.as_secs_f64()),
            maximum.unwrap_or(DEFAULT_MAX_BACKOFF.as_secs_f64()),
            multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER),
        )?;
        let predicate = self
            .retryable_codes
            .as_ref()
            .map(|codes| from_error_codes(codes.iter().copied()).into());
        Ok(RetryOptions::new(Some(timings), predicate))
    }
}

impl From<&RetryOptions> for RetryConfig {
    /// Captures the timings of `options`.
    ///
    /// Predicates are opaque, the resulting configuration has no
    /// `retryableCodes`.
    fn from(options: &RetryOptions) -> Self {
        let timings = options.timings();
        Self {
            initial_backoff_secs: Some(timings.initial_backoff().as_secs_f64()),
            max_backoff_secs: Some(timings.max_backoff().as_secs_f64()),
            backoff_multiplier: Some(timings.backoff_multiplier()),
            retryable_codes: None,
        }
    }
}
