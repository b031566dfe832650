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

//! Defines the trait for retry predicates and some common implementations.
//!
//! A retry predicate only looks at the HTTP status code of a failed attempt.
//! It does not limit the number of attempts, nor the time spent retrying.
//!
//! The storage service [recommends] retrying 408, 429, and most 5xx HTTP
//! status codes:
//!
//! - [408 - Request Timeout][408]
//! - [429 - Too Many Requests][429]
//! - [500 - Internal Server Error][500]
//! - [502 - Bad Gateway][502]
//! - [503 - Service Unavailable][503]
//! - [504 - Gateway Timeout][504]
//!
//! Applications may replace this set. A predicate built from custom codes, or
//! from a custom function, completely overrides the default codes; it is not
//! appended to them.
//!
//! # Example
//! ```
//! # use google_cloud_storage_retry::retry_predicate::*;
//! let p = from_error_code_predicate(|code| code >= 500);
//! assert!(p.should_retry(503));
//! assert!(!p.should_retry(429));
//!
//! let p = from_error_codes([429, 502]);
//! assert!(p.should_retry(429));
//! assert!(!p.should_retry(500));
//! ```
//!
//! [recommends]: https://cloud.google.com/storage/docs/retry-strategy
//! [408]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#408_Request_Timeout
//! [429]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#429_Too_Many_Requests
//! [500]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#500_Internal_Server_Error
//! [502]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#502_Bad_Gateway
//! [503]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#503_Service_Unavailable
//! [504]: https://cloud.google.com/storage/docs/json_api/v1/status-codes#504_Gateway_Timeout

use std::collections::BTreeSet;
use std::sync::Arc;

/// The status codes retried by default.
pub const DEFAULT_ERROR_CODES: [i32; 6] = [
    408, // Request timeout
    429, // Too many requests
    500, // Internal server error
    502, // Bad gateway
    503, // Service unavailable
    504, // Gateway timeout
];

/// Decides if a failed request should be retried, based on its status code.
///
/// Implementations must be pure: the same status code always produces the
/// same answer, and the predicate has no side effects. Any panic in the
/// implementation propagates to the caller.
pub trait RetryPredicate: Send + Sync + std::fmt::Debug {
    /// Returns true if a request that failed with `status_code` should be
    /// retried.
    fn should_retry(&self, status_code: i32) -> bool;
}

/// Retries a fixed set of status codes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorCodes {
    codes: BTreeSet<i32>,
}

impl ErrorCodes {
    /// Creates a predicate retrying exactly the given status codes.
    ///
    /// An empty set never retries.
    pub fn new<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// The predicate for the status codes in [DEFAULT_ERROR_CODES].
    pub fn default_codes() -> Self {
        Self::new(DEFAULT_ERROR_CODES)
    }

    /// The status codes retried by this predicate.
    pub fn codes(&self) -> impl Iterator<Item = i32> + '_ {
        self.codes.iter().copied()
    }
}

impl RetryPredicate for ErrorCodes {
    fn should_retry(&self, status_code: i32) -> bool {
        self.codes.contains(&status_code)
    }
}

/// Retries based on an application-provided function.
#[derive(Clone)]
pub struct ErrorCodePredicate<F> {
    predicate: F,
}

impl<F> ErrorCodePredicate<F>
where
    F: Fn(i32) -> bool + Send + Sync,
{
    /// Creates a predicate that retries the codes accepted by `predicate`.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> std::fmt::Debug for ErrorCodePredicate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorCodePredicate").finish_non_exhaustive()
    }
}

impl<F> RetryPredicate for ErrorCodePredicate<F>
where
    F: Fn(i32) -> bool + Send + Sync,
{
    fn should_retry(&self, status_code: i32) -> bool {
        (self.predicate)(status_code)
    }
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Never;

impl RetryPredicate for Never {
    fn should_retry(&self, _status_code: i32) -> bool {
        false
    }
}

impl<T: RetryPredicate + ?Sized> RetryPredicate for Arc<T> {
    fn should_retry(&self, status_code: i32) -> bool {
        (**self).should_retry(status_code)
    }
}

impl<T: RetryPredicate + ?Sized> RetryPredicate for Box<T> {
    fn should_retry(&self, status_code: i32) -> bool {
        (**self).should_retry(status_code)
    }
}

/// Creates a predicate retrying exactly the given status codes.
pub fn from_error_codes<I: IntoIterator<Item = i32>>(codes: I) -> ErrorCodes {
    ErrorCodes::new(codes)
}

/// Creates a predicate from a function.
pub fn from_error_code_predicate<F>(predicate: F) -> ErrorCodePredicate<F>
where
    F: Fn(i32) -> bool + Send + Sync,
{
    ErrorCodePredicate::new(predicate)
}

/// The predicate used for idempotent operations.
pub fn default_error_codes() -> ErrorCodes {
    ErrorCodes::default_codes()
}

/// A helper type to use [RetryPredicate] in retry options.
///
/// Shared predicates (`Arc<dyn RetryPredicate>`) are predicates too, so they
/// convert like any other implementation.
#[derive(Clone, Debug)]
pub struct RetryPredicateArg(pub(crate) Arc<dyn RetryPredicate>);

impl<T: RetryPredicate + 'static> std::convert::From<T> for RetryPredicateArg {
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}
