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

//! The error types used in this crate.

use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for retry configuration.
///
/// Retry timings are validated when they are created. Invalid values are
/// rejected, they are never clamped to a valid range.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("the initial backoff ({0}s) must be a non-negative number of seconds")]
    InvalidInitialBackoff(f64),
    #[error(
        "the maximum backoff ({maximum}s) must be at least as much as the initial backoff ({initial}s)"
    )]
    InvalidMaxBackoff { maximum: f64, initial: f64 },
    #[error("the maximum backoff ({0}s) is too large to represent as a duration")]
    MaxBackoffOverflow(f64),
    #[error("the backoff multiplier ({0}) must be at least 1.0")]
    InvalidBackoffMultiplier(f64),
    #[error("cannot parse the retry configuration: {0}")]
    InvalidConfig(String),
}

/// An error describing a non-2xx HTTP response.
#[derive(Debug, Default, Clone)]
pub struct HttpError {
    status_code: u16,
    payload: Option<Bytes>,
    headers: HashMap<String, String>,
}

impl HttpError {
    /// Creates a new [HttpError] with the given status code, headers, and payload.
    pub fn new(status_code: u16, headers: HashMap<String, String>, payload: Option<Bytes>) -> Self {
        Self {
            status_code,
            headers,
            payload,
        }
    }

    /// Returns the status code associated with the HTTP error response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns a reference to the payload associated with the HTTP error
    /// response.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Returns a reference to the headers associated with the HTTP error
    /// response.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "HTTP Error: code={}, headers={:?}",
            self.status_code, self.headers
        )?;
        if let Some(payload) = self.payload() {
            match std::str::from_utf8(payload) {
                Ok(text) => write!(f, ", payload:\n{text}")?,
                Err(_) => write!(f, ", payload:\n{payload:?}")?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

/// The error type for a request series.
///
/// A series ends with an error when (1) the last attempt failed and the
/// failure was not retryable, (2) the hosting pipeline stopped permitting
/// new attempts, or (3) the series was cancelled while waiting to retry.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The service returned a non-2xx response.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The series was cancelled during the backoff wait.
    #[error("the request was cancelled while waiting {delay:?} to retry attempt {attempt_count}")]
    Cancelled { attempt_count: u32, delay: Duration },

    /// The request could not be sent, or the response could not be received.
    #[error("cannot send the request: {0}")]
    Io(#[source] BoxError),

    /// The retry configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// A helper to create HTTP errors without headers or payload.
    pub fn http(status_code: u16) -> Self {
        Self::Http(HttpError::new(status_code, HashMap::new(), None))
    }

    /// Creates an error representing a transport failure.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self::Io(source.into())
    }

    /// The HTTP status code, if the error is a non-2xx response.
    pub fn http_status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status_code()),
            _ => None,
        }
    }

    /// Returns true if the series was cancelled while waiting to retry.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_messages_name_the_field() {
        let got = ConfigError::InvalidInitialBackoff(-1.0).to_string();
        assert!(got.contains("initial backoff"), "{got}");
        assert!(got.contains("non-negative"), "{got}");

        let got = ConfigError::InvalidMaxBackoff {
            maximum: 1.0,
            initial: 2.0,
        }
        .to_string();
        assert!(got.contains("maximum backoff (1s)"), "{got}");
        assert!(got.contains("initial backoff (2s)"), "{got}");

        let got = ConfigError::InvalidBackoffMultiplier(0.5).to_string();
        assert!(got.contains("backoff multiplier (0.5)"), "{got}");
        assert!(got.contains("at least 1.0"), "{got}");
    }

    #[test]
    fn http_display() {
        let headers = HashMap::from_iter(
            [("content-type", "application/json")].map(|(k, v)| (k.to_string(), v.to_string())),
        );
        let error = HttpError::new(503, headers, Some(Bytes::from_static(b"try again")));
        let display = format!("{error}");
        assert!(display.contains("code=503"), "{display}");
        assert!(
            display.contains(r##""content-type": "application/json""##),
            "{display}"
        );
        assert!(display.contains("payload:\ntry again"), "{display}");
    }

    #[test]
    fn http_display_without_payload() {
        let error = HttpError::new(404, HashMap::new(), None);
        let display = format!("{error}");
        assert!(display.contains("code=404"), "{display}");
        assert!(!display.contains("payload"), "{display}");
    }

    #[test]
    fn error_helpers() {
        let e = Error::http(502);
        assert_eq!(e.http_status_code(), Some(502));
        assert!(!e.is_cancelled(), "{e:?}");

        let e = Error::io("connection reset");
        assert_eq!(e.http_status_code(), None);
        assert!(e.to_string().contains("connection reset"), "{e}");

        let e = Error::Cancelled {
            attempt_count: 2,
            delay: Duration::from_secs(3),
        };
        assert!(e.is_cancelled(), "{e:?}");
        assert_eq!(e.http_status_code(), None);

        let e = Error::from(ConfigError::InvalidBackoffMultiplier(0.0));
        assert!(matches!(e, Error::Config(_)), "{e:?}");
    }
}
