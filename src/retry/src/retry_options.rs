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

//! The retry configuration for a single request.
//!
//! The storage client retries idempotent operations by default. Some
//! operations are only idempotent when the application provides a
//! precondition, for example, an `if_generation_match` value on an upload.
//! [RetryOptions::maybe_idempotent] picks the policy for these operations.
//!
//! # Example
//! ```
//! # use google_cloud_storage_retry::retry_options::RetryOptions;
//! # use google_cloud_storage_retry::retry_predicate::from_error_code_predicate;
//! # use google_cloud_storage_retry::retry_timings::RetryTimings;
//! use std::time::Duration;
//!
//! let timings = RetryTimings::default().with_max_backoff(Duration::from_secs(10))?;
//! let options = RetryOptions::new(Some(timings), None)
//!     .with_predicate(from_error_code_predicate(|code| code >= 500));
//! assert!(options.should_retry(503));
//! assert_eq!(options.timings().max_backoff(), Duration::from_secs(10));
//! # Ok::<(), google_cloud_storage_retry::error::ConfigError>(())
//! ```

use crate::retry_predicate::{Never, RetryPredicate, RetryPredicateArg, default_error_codes};
use crate::retry_timings::RetryTimings;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static IDEMPOTENT: LazyLock<RetryOptions> = LazyLock::new(|| {
    RetryOptions::new(
        Some(RetryTimings::default()),
        Some(default_error_codes().into()),
    )
});

static NEVER: LazyLock<RetryOptions> =
    LazyLock::new(|| RetryOptions::new(Some(RetryTimings::default()), None));

/// Pairs a [RetryPredicate] with a [RetryTimings].
///
/// Instances are immutable and cheap to clone. A single instance can be shared
/// by any number of concurrent requests.
#[derive(Clone, Debug)]
pub struct RetryOptions {
    predicate: Arc<dyn RetryPredicate>,
    timings: RetryTimings,
}

impl RetryOptions {
    /// Creates a new instance.
    ///
    /// Missing values are valid: without `timings` the options use
    /// [RetryTimings::default()], without a `predicate` the request is never
    /// retried.
    pub fn new(timings: Option<RetryTimings>, predicate: Option<RetryPredicateArg>) -> Self {
        Self {
            predicate: predicate.map(|p| p.0).unwrap_or_else(|| Arc::new(Never)),
            timings: timings.unwrap_or_default(),
        }
    }

    /// The options used for idempotent operations.
    ///
    /// Uses the default timings and retries the default error codes.
    pub fn idempotent() -> Self {
        IDEMPOTENT.clone()
    }

    /// The options for operations that must not be retried.
    pub fn never() -> Self {
        NEVER.clone()
    }

    /// Returns [never()][Self::never] if the `condition` is absent, and
    /// [idempotent()][Self::idempotent] otherwise.
    ///
    /// Use this for operations that are only idempotent with a precondition.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_storage_retry::retry_options::RetryOptions;
    /// let if_generation_match: Option<i64> = Some(123);
    /// let options = RetryOptions::maybe_idempotent(if_generation_match);
    /// assert!(options.should_retry(503));
    ///
    /// let options = RetryOptions::maybe_idempotent(None::<i64>);
    /// assert!(!options.should_retry(503));
    /// ```
    pub fn maybe_idempotent<T>(condition: Option<T>) -> Self {
        match condition {
            None => Self::never(),
            Some(_) => Self::idempotent(),
        }
    }

    /// Returns a copy using a different predicate.
    pub fn with_predicate<P: Into<RetryPredicateArg>>(mut self, v: P) -> Self {
        self.predicate = v.into().0;
        self
    }

    /// Returns a copy using different timings.
    pub fn with_timings(mut self, v: RetryTimings) -> Self {
        self.timings = v;
        self
    }

    /// The retry predicate.
    pub fn predicate(&self) -> &Arc<dyn RetryPredicate> {
        &self.predicate
    }

    /// The retry timings.
    pub fn timings(&self) -> &RetryTimings {
        &self.timings
    }

    /// Returns true if a failure with `status_code` should be retried.
    pub fn should_retry(&self, status_code: i32) -> bool {
        self.predicate.should_retry(status_code)
    }

    /// The wait before retrying after `attempt_count` attempts.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        self.timings.delay(attempt_count)
    }
}
