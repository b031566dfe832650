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

//! Handles failed attempts for requests that permit retries.
//!
//! The hosting request pipeline calls [RetryHandler::stamp] before each
//! attempt, and [RetryHandler::handle_failure] after each failed attempt. The
//! handler does not limit the number of attempts, that is the responsibility
//! of the pipeline. See [retry_loop][crate::retry_loop::retry_loop] for a
//! pipeline using this handler.
//!
//! A request series moves through these states:
//!
//! ```text
//! Idle -> AwaitingResponse -> Success
//!                          -> Failure -> DecidingRetry -> Retrying -> AwaitingResponse
//!                                                      -> GivingUp
//! ```

use crate::Result;
use crate::api_header::{ApiClientHeader, X_GOOG_API_CLIENT};
use crate::error::Error;
use crate::retry_options::RetryOptions;
use http::{HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The state owned by one request series.
///
/// Each logical request, including all its retries, needs its own instance.
/// Concurrent requests must never share one.
#[derive(Debug)]
pub struct RetrySeries {
    invocation_id: Uuid,
    attempt_count: u32,
}

impl RetrySeries {
    /// Creates a series with a new, random invocation id.
    pub fn new() -> Self {
        Self::with_invocation_id(Uuid::new_v4())
    }

    /// Creates a series with a known invocation id, useful in tests.
    pub fn with_invocation_id(invocation_id: Uuid) -> Self {
        Self {
            invocation_id,
            attempt_count: 0,
        }
    }

    /// The id correlating all the attempts in this series.
    pub fn invocation_id(&self) -> &Uuid {
        &self.invocation_id
    }

    /// The number of attempts stamped so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }
}

impl Default for RetrySeries {
    fn default() -> Self {
        Self::new()
    }
}

/// A failed attempt, as reported by the hosting pipeline.
///
/// This struct may gain new fields in future versions.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct FailedAttempt {
    /// The HTTP status code of the failed attempt.
    pub status_code: i32,

    /// The number of attempts so far, including the one that just failed.
    pub attempt_count: u32,

    /// If false, the pipeline will not make another attempt, regardless of
    /// the retry policy.
    pub supports_retry: bool,
}

impl FailedAttempt {
    /// Create a new instance. The pipeline is assumed to permit retries.
    pub fn new(status_code: i32, attempt_count: u32) -> Self {
        Self {
            status_code,
            attempt_count,
            supports_retry: true,
        }
    }

    /// Update whether the pipeline permits another attempt.
    pub fn set_supports_retry(mut self, v: bool) -> Self {
        self.supports_retry = v;
        self
    }
}

/// Applies a [RetryOptions] to the failed attempts of a request.
///
/// The handler holds no per-request state, it can be cloned cheaply and
/// shared by concurrent requests.
#[derive(Clone, Debug)]
pub struct RetryHandler {
    options: RetryOptions,
}

impl RetryHandler {
    /// Creates a handler. Without options, requests are never retried.
    pub fn new(options: Option<RetryOptions>) -> Self {
        Self {
            options: options.unwrap_or_else(RetryOptions::never),
        }
    }

    /// Creates a handler for idempotent requests.
    pub fn idempotent() -> Self {
        Self::new(Some(RetryOptions::idempotent()))
    }

    /// The options used by this handler.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Returns true if the retry policy accepts `status_code`.
    pub fn is_retriable(&self, status_code: i32) -> bool {
        self.options.should_retry(status_code)
    }

    /// Prepares the headers for the next attempt in `series`.
    ///
    /// Updates the `x-goog-api-client` header with the invocation id and the
    /// attempt count, preserving any other tokens in the header. The header is
    /// created if missing. A header with more than one value, or with a value
    /// that is not valid text, is left unchanged.
    pub fn stamp(&self, series: &mut RetrySeries, headers: &mut HeaderMap) {
        series.attempt_count = series.attempt_count.saturating_add(1);
        let mut values = headers.get_all(X_GOOG_API_CLIENT).iter();
        let current = match (values.next(), values.next()) {
            (None, _) => "",
            (Some(value), None) => match value.to_str() {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("cannot stamp {X_GOOG_API_CLIENT} header: {e:?}");
                    return;
                }
            },
            (Some(_), Some(_)) => {
                tracing::debug!("cannot stamp {X_GOOG_API_CLIENT} header with multiple values");
                return;
            }
        };
        let mut header = ApiClientHeader::parse(current);
        let count = header.stamp(&series.invocation_id);
        match HeaderValue::try_from(header.to_string()) {
            Ok(value) => {
                headers.insert(X_GOOG_API_CLIENT, value);
            }
            Err(e) => {
                tracing::debug!("cannot stamp {X_GOOG_API_CLIENT} header: {e:?}");
                return;
            }
        }
        if count != Some(series.attempt_count) {
            tracing::debug!(
                "{X_GOOG_API_CLIENT} attempt count is {count:?}, the series is at attempt {}",
                series.attempt_count
            );
        }
    }

    /// Decides if a failed attempt should be retried, and waits before the
    /// retry.
    ///
    /// Returns `Ok(false)` if the pipeline does not support more attempts, or
    /// if the retry policy rejects the status code. The caller should report
    /// the original failure.
    ///
    /// Otherwise waits for the backoff delay and returns `Ok(true)`. If
    /// `cancel` is triggered during the wait, returns [Error::Cancelled]
    /// immediately. The caller must not make another attempt in that case.
    pub async fn handle_failure(
        &self,
        failure: &FailedAttempt,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        if !failure.supports_retry || !self.is_retriable(failure.status_code) {
            tracing::debug!(
                "giving up after attempt {} with status code {}",
                failure.attempt_count,
                failure.status_code
            );
            return Ok(false);
        }
        let delay = self.options.delay(failure.attempt_count);
        tracing::debug!(
            "retrying attempt {} with status code {} after {delay:?}",
            failure.attempt_count,
            failure.status_code
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled {
                attempt_count: failure.attempt_count,
                delay,
            }),
            _ = tokio::time::sleep(delay) => Ok(true),
        }
    }
}
