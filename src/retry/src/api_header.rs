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

//! Helpers to read and update the `x-goog-api-client` diagnostic tokens.

use uuid::Uuid;

/// The telemetry header carrying the diagnostic tokens.
pub const X_GOOG_API_CLIENT: &str = "x-goog-api-client";

/// The key for the token correlating all the attempts of one request.
pub const INVOCATION_ID_KEY: &str = "gccl-invocation-id";

/// The key for the token counting the attempts of one request.
pub const ATTEMPT_COUNT_KEY: &str = "gccl-attempt-count";

/// The `x-goog-api-client` header value, as an ordered list of tokens.
///
/// The header value is a space-separated list of `key/value` tokens, for
/// example `gl-rust/1.85.0 gccl/1.2.3`. The retry handler adds two tokens:
///
/// * `gccl-invocation-id/<uuid>`, the same value for all the attempts of one
///   request.
/// * `gccl-attempt-count/<n>`, starting at 1 and incremented on each attempt.
///
/// Updates preserve all other tokens, their order, and the spacing between
/// them. The formatted value reproduces the original value byte-for-byte,
/// followed by any appended tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiClientHeader {
    // Segments between single spaces, empty segments included.
    segments: Vec<String>,
}

impl ApiClientHeader {
    /// Splits a header value into tokens.
    pub fn parse(value: &str) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self {
            segments: value.split(' ').map(str::to_string).collect(),
        }
    }

    /// The non-empty tokens, in order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    /// The value of the invocation id token, if present.
    pub fn invocation_id(&self) -> Option<&str> {
        self.find(INVOCATION_ID_KEY).map(|(_, v)| v)
    }

    /// The value of the attempt count token, if present and numeric.
    pub fn attempt_count(&self) -> Option<u32> {
        self.find(ATTEMPT_COUNT_KEY)
            .and_then(|(_, v)| parse_count(v))
    }

    /// Adds the diagnostic tokens for a new attempt.
    ///
    /// Inserts the invocation id token unless one is already present, then
    /// increments the attempt count token, or starts it at 1. Returns the new
    /// attempt count, if known.
    pub fn stamp(&mut self, invocation_id: &Uuid) -> Option<u32> {
        self.stamp_invocation_id(invocation_id);
        self.increment_attempt_count()
    }

    /// Inserts the invocation id token, unless one is already present.
    ///
    /// An existing token is kept, so all the attempts of a request report the
    /// id used in the first attempt.
    pub fn stamp_invocation_id(&mut self, invocation_id: &Uuid) {
        if self.find(INVOCATION_ID_KEY).is_none() {
            let token = format!("{INVOCATION_ID_KEY}/{invocation_id}");
            self.segments.push(token);
        }
    }

    /// Increments the attempt count token in place, or appends it with a value
    /// of 1.
    ///
    /// A token with a non-numeric (or overflowing) value cannot be
    /// incremented, it is left unchanged and the function returns `None`.
    pub fn increment_attempt_count(&mut self) -> Option<u32> {
        match self.find(ATTEMPT_COUNT_KEY) {
            None => {
                self.segments.push(format!("{ATTEMPT_COUNT_KEY}/1"));
                Some(1)
            }
            Some((index, value)) => {
                let count = parse_count(value)?.checked_add(1)?;
                self.segments[index] = format!("{ATTEMPT_COUNT_KEY}/{count}");
                Some(count)
            }
        }
    }

    // Empty segments have no `/` and never match.
    fn find(&self, key: &str) -> Option<(usize, &str)> {
        self.segments.iter().enumerate().find_map(|(i, t)| {
            t.split_once('/')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| (i, v))
        })
    }
}

impl std::fmt::Display for ApiClientHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join(" "))
    }
}

// Only plain decimal digits, no signs or whitespace.
fn parse_count(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
