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

//! Drives a request series with a [RetryHandler].

use crate::Result;
use crate::retry_handler::{FailedAttempt, RetryHandler, RetrySeries};
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

/// The number of attempts the storage request pipeline makes by default.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs a request series for a given function.
///
/// This function calls `inner` as long as (1) `inner` has not returned a
/// successful response, (2) the handler accepts the failure for retry, and
/// (3) fewer than `max_attempts` attempts have been made. The first attempt
/// always runs, even if `max_attempts` is zero.
///
/// Each attempt receives a copy of `headers`, stamped with the diagnostic
/// tokens for that attempt. In between attempts the function waits for the
/// backoff delay prescribed by the handler.
///
/// Errors that are not HTTP responses are returned immediately. If the series
/// ends because the failure is not retryable, or because the attempts are
/// exhausted, the function returns the last failure unchanged. If `cancel` is
/// triggered during a backoff wait the function returns
/// [Error::Cancelled][crate::error::Error::Cancelled] without making another
/// attempt.
///
/// # Example
/// ```
/// # use google_cloud_storage_retry::error::Error;
/// # use google_cloud_storage_retry::retry_handler::RetryHandler;
/// # use google_cloud_storage_retry::retry_loop::{DEFAULT_MAX_ATTEMPTS, retry_loop};
/// # use http::HeaderMap;
/// # use tokio_util::sync::CancellationToken;
/// # tokio_test_main();
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn tokio_test_main() {
/// let handler = RetryHandler::idempotent();
/// let cancel = CancellationToken::new();
/// let response = retry_loop(
///     &handler,
///     DEFAULT_MAX_ATTEMPTS,
///     &cancel,
///     HeaderMap::new(),
///     async |headers: HeaderMap| {
///         assert!(headers.contains_key("x-goog-api-client"));
///         Ok::<_, Error>("response")
///     },
/// )
/// .await;
/// assert!(matches!(response, Ok("response")));
/// # }
/// ```
pub async fn retry_loop<F, Response>(
    handler: &RetryHandler,
    max_attempts: u32,
    cancel: &CancellationToken,
    mut headers: HeaderMap,
    mut inner: F,
) -> Result<Response>
where
    F: AsyncFnMut(HeaderMap) -> Result<Response>,
{
    let mut series = RetrySeries::new();
    loop {
        handler.stamp(&mut series, &mut headers);
        let attempt_count = series.attempt_count();
        let error = match inner(headers.clone()).await {
            Ok(r) => return Ok(r),
            Err(e) => e,
        };
        let Some(status_code) = error.http_status_code() else {
            return Err(error);
        };
        tracing::debug!(
            "attempt {attempt_count} for invocation {} failed with status code {status_code}",
            series.invocation_id()
        );
        let failure = FailedAttempt::new(i32::from(status_code), attempt_count)
            .set_supports_retry(attempt_count < max_attempts);
        if !handler.handle_failure(&failure, cancel).await? {
            return Err(error);
        }
    }
}
