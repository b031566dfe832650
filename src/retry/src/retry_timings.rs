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

//! Defines the backoff schedule between retry attempts.
//!
//! Retry strategies should avoid immediately retrying a request, as the
//! service may need time to recover. The storage client waits for
//! `initial_backoff` after the first failure. After that, the wait grows
//! exponentially, with the multiplier scaling the size of each step:
//!
//! ```text
//! delay(1) = initial_backoff
//! delay(n) = initial_backoff + 2^(n - 2) * backoff_multiplier seconds, n > 1
//! ```
//!
//! The result is always truncated to `max_backoff`. Note that the initial
//! backoff is an additive floor; it is not multiplied on each attempt.
//!
//! # Example
//! ```
//! # use google_cloud_storage_retry::retry_timings::RetryTimings;
//! use std::time::Duration;
//! let timings = RetryTimings::new(Duration::from_secs(1), Duration::from_secs(6), 2.0)?;
//! assert_eq!(timings.delay(1), Duration::from_secs(1));
//! assert_eq!(timings.delay(2), Duration::from_secs(3));
//! assert_eq!(timings.delay(3), Duration::from_secs(5));
//! assert_eq!(timings.delay(5), Duration::from_secs(6));
//! # Ok::<(), google_cloud_storage_retry::error::ConfigError>(())
//! ```

use crate::error::ConfigError;
use std::time::Duration;

/// The default wait between the first attempt and the first retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// The default maximum wait between retries.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(32);

/// The default backoff multiplier.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// The timing configuration for retries.
///
/// Instances are immutable. The `with_*()` functions return a new, validated
/// instance and leave the receiver unchanged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryTimings {
    initial_backoff: Duration,
    max_backoff: Duration,
    backoff_multiplier: f64,
}

impl RetryTimings {
    /// Creates a new instance.
    ///
    /// # Parameters
    /// * `initial_backoff` - the wait between the first attempt and the first
    ///   retry.
    /// * `max_backoff` - the maximum wait between retries. It must be at least
    ///   as much as `initial_backoff`.
    /// * `backoff_multiplier` - scales the exponential step on each attempt. It
    ///   must be at least 1.0.
    pub fn new(
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, ConfigError> {
        if max_backoff < initial_backoff {
            return Err(ConfigError::InvalidMaxBackoff {
                maximum: max_backoff.as_secs_f64(),
                initial: initial_backoff.as_secs_f64(),
            });
        }
        if backoff_multiplier.is_nan() || backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(backoff_multiplier));
        }
        Ok(Self {
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        })
    }

    /// Creates a new instance from (possibly fractional) seconds.
    ///
    /// Configuration files and command-line flags express the backoff as a
    /// signed number of seconds. Negative and non-finite values are rejected.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_retry::retry_timings::RetryTimings;
    /// # use google_cloud_storage_retry::error::ConfigError;
    /// let err = RetryTimings::from_secs_f64(-1.0, 1.0, 1.0).unwrap_err();
    /// assert_eq!(err, ConfigError::InvalidInitialBackoff(-1.0));
    /// ```
    pub fn from_secs_f64(
        initial_backoff: f64,
        max_backoff: f64,
        backoff_multiplier: f64,
    ) -> Result<Self, ConfigError> {
        let initial = Duration::try_from_secs_f64(initial_backoff)
            .map_err(|_| ConfigError::InvalidInitialBackoff(initial_backoff))?;
        if max_backoff.is_nan() || max_backoff < initial_backoff {
            return Err(ConfigError::InvalidMaxBackoff {
                maximum: max_backoff,
                initial: initial_backoff,
            });
        }
        let maximum = Duration::try_from_secs_f64(max_backoff)
            .map_err(|_| ConfigError::MaxBackoffOverflow(max_backoff))?;
        Self::new(initial, maximum, backoff_multiplier)
    }

    /// The wait between the first attempt and the first retry.
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// The maximum wait between retries.
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// The multiplier applied to the exponential step.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Returns a copy with a different initial backoff.
    pub fn with_initial_backoff<V: Into<Duration>>(&self, v: V) -> Result<Self, ConfigError> {
        Self::new(v.into(), self.max_backoff, self.backoff_multiplier)
    }

    /// Returns a copy with a different maximum backoff.
    pub fn with_max_backoff<V: Into<Duration>>(&self, v: V) -> Result<Self, ConfigError> {
        Self::new(self.initial_backoff, v.into(), self.backoff_multiplier)
    }

    /// Returns a copy with a different backoff multiplier.
    pub fn with_backoff_multiplier<V: Into<f64>>(&self, v: V) -> Result<Self, ConfigError> {
        Self::new(self.initial_backoff, self.max_backoff, v.into())
    }

    /// Returns the wait before retrying after `attempt_count` attempts.
    ///
    /// The attempt count starts at 1. Values below 1 are treated as 1.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        if attempt_count <= 1 {
            return self.initial_backoff;
        }
        let exp = std::cmp::min(attempt_count - 2, i32::MAX as u32) as i32;
        let step = 2_f64.powi(exp) * self.backoff_multiplier;
        let headroom = self.max_backoff - self.initial_backoff;
        if step >= headroom.as_secs_f64() {
            return self.max_backoff;
        }
        // `step` is finite and non-negative here, and
        // `initial_backoff + step < max_backoff`, so neither operation panics.
        self.initial_backoff + Duration::from_secs_f64(step)
    }
}

impl Default for RetryTimings {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}
