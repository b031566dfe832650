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

//! Retry policies for the Google Cloud Storage JSON API.
//!
//! The Cloud Storage client retries a failed HTTP request when (1) the
//! response status code is considered transient, and (2) the request is safe
//! to repeat. This crate contains the pieces that make that decision:
//!
//! - [RetryPredicate][retry_predicate::RetryPredicate] decides if a status
//!   code is retryable.
//! - [RetryTimings][retry_timings::RetryTimings] computes how long to wait
//!   before the next attempt.
//! - [RetryOptions][retry_options::RetryOptions] pairs a predicate with a
//!   timing schedule.
//! - [RetryHandler][retry_handler::RetryHandler] waits between attempts and
//!   stamps each attempt with the `x-goog-api-client` diagnostic tokens.
//!
//! # Example
//! ```
//! # use google_cloud_storage_retry::retry_options::RetryOptions;
//! # use google_cloud_storage_retry::retry_predicate::from_error_codes;
//! # use google_cloud_storage_retry::retry_timings::RetryTimings;
//! use std::time::Duration;
//!
//! let timings = RetryTimings::new(Duration::from_secs(1), Duration::from_secs(6), 2.0)?;
//! let options = RetryOptions::new(Some(timings), Some(from_error_codes([429, 502]).into()));
//! assert!(options.should_retry(502));
//! assert!(!options.should_retry(500));
//! assert_eq!(options.delay(2), Duration::from_secs(3));
//! # Ok::<(), google_cloud_storage_retry::error::ConfigError>(())
//! ```

/// An alias of [std::result::Result] where the error is always [Error][crate::error::Error].
pub type Result<T> = std::result::Result<T, crate::error::Error>;

pub mod api_header;
pub mod config;
pub mod error;
pub mod retry_handler;
pub mod retry_loop;
pub mod retry_options;
pub mod retry_predicate;
pub mod retry_timings;
