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

//! These tests drive complete request series through `retry_loop`. The inner
//! function returns a canned sequence of responses and records the headers
//! of each attempt. Virtual time makes the backoff waits observable.

#[cfg(test)]
mod tests {
    use google_cloud_storage_retry::api_header::{ApiClientHeader, X_GOOG_API_CLIENT};
    use google_cloud_storage_retry::config::RetryConfig;
    use google_cloud_storage_retry::error::{Error, HttpError};
    use google_cloud_storage_retry::retry_handler::RetryHandler;
    use google_cloud_storage_retry::retry_loop::retry_loop;
    use google_cloud_storage_retry::retry_options::RetryOptions;
    use google_cloud_storage_retry::retry_predicate::from_error_codes;
    use google_cloud_storage_retry::retry_timings::RetryTimings;
    use http::{HeaderMap, HeaderValue};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    type Result = anyhow::Result<()>;

    fn enable_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_level(true)
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn test_handler() -> anyhow::Result<RetryHandler> {
        let timings = RetryTimings::new(Duration::from_secs(1), Duration::from_secs(6), 2.0)?;
        let options = RetryOptions::new(Some(timings), Some(from_error_codes([502]).into()));
        Ok(RetryHandler::new(Some(options)))
    }

    // The time and the diagnostic tokens of one attempt.
    #[derive(Debug)]
    struct Attempt {
        at: Duration,
        header: ApiClientHeader,
    }

    fn api_client_header(headers: &HeaderMap) -> ApiClientHeader {
        let value = headers
            .get(X_GOOG_API_CLIENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        ApiClientHeader::parse(value)
    }

    fn record(start: Instant, headers: &HeaderMap) -> Attempt {
        Attempt {
            at: start.elapsed(),
            header: api_client_header(headers),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() -> Result {
        let _guard = enable_tracing();
        let handler = test_handler()?;
        let mut responses = vec![
            Err(Error::http(502)),
            Err(Error::http(502)),
            Err(Error::http(502)),
            Ok("object contents"),
        ]
        .into_iter();

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_static("gl-rust/1.85.0 gccl/1.2.3");
        headers.insert(X_GOOG_API_CLIENT, value);

        let start = Instant::now();
        let mut attempts = Vec::new();
        let got = retry_loop(
            &handler,
            4,
            &CancellationToken::new(),
            headers,
            async |headers: HeaderMap| {
                attempts.push(record(start, &headers));
                responses
                    .next()
                    .unwrap_or_else(|| Err(Error::io("unexpected attempt")))
            },
        )
        .await?;
        assert_eq!(got, "object contents");

        // Waits of 1s, 3s and 5s between the attempts.
        let at = attempts.iter().map(|a| a.at).collect::<Vec<_>>();
        let want = [0, 1, 4, 9].map(Duration::from_secs).to_vec();
        assert_eq!(at, want, "{attempts:?}");

        let counts = attempts
            .iter()
            .map(|a| a.header.attempt_count())
            .collect::<Vec<_>>();
        assert_eq!(counts, vec![Some(1), Some(2), Some(3), Some(4)]);

        let first = attempts[0].header.invocation_id();
        assert!(first.is_some(), "{attempts:?}");
        for a in &attempts {
            assert_eq!(a.header.invocation_id(), first, "{attempts:?}");
            let tokens = a.header.tokens().collect::<Vec<_>>();
            assert_eq!(tokens[0..2], ["gl-rust/1.85.0", "gccl/1.2.3"], "{a:?}");
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_is_unchanged() -> Result {
        let _guard = enable_tracing();
        let handler = test_handler()?;
        let start = Instant::now();
        let mut calls = 0;
        let got = retry_loop(
            &handler,
            4,
            &CancellationToken::new(),
            HeaderMap::new(),
            async |_: HeaderMap| -> google_cloud_storage_retry::Result<()> {
                calls += 1;
                let headers = HashMap::from([(
                    "content-type".to_string(),
                    "text/plain".to_string(),
                )]);
                let payload = Some("not found".into());
                Err(HttpError::new(404, headers, payload).into())
            },
        )
        .await;
        let err = match got {
            Err(Error::Http(e)) => e,
            r => anyhow::bail!("expected an HTTP error, got {r:?}"),
        };
        assert_eq!(err.status_code(), 404);
        let payload = err.payload().map(|p| p.as_ref());
        assert_eq!(payload, Some(b"not found".as_slice()));
        assert_eq!(
            err.headers().get("content-type").map(String::as_str),
            Some("text/plain")
        );
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_backoff() -> Result {
        let _guard = enable_tracing();
        let handler = test_handler()?;
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let start = Instant::now();
        let mut calls = 0;
        let series = retry_loop(
            &handler,
            4,
            &cancel,
            HeaderMap::new(),
            async |_: HeaderMap| -> google_cloud_storage_retry::Result<()> {
                calls += 1;
                Err(Error::http(502))
            },
        );
        let (got, _) = tokio::join!(series, async move {
            // The first backoff is 1s, cancel half way through it.
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });
        assert!(
            matches!(
                got,
                Err(Error::Cancelled {
                    attempt_count: 1,
                    ..
                })
            ),
            "{got:?}"
        );
        assert_eq!(calls, 1);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_series_have_distinct_ids() -> Result {
        let handler = test_handler()?;
        let cancel = CancellationToken::new();

        let run = async || {
            let mut ids = Vec::new();
            let mut failures = 1;
            let inner = async |headers: HeaderMap| {
                let header = api_client_header(&headers);
                ids.push(header.invocation_id().map(str::to_string));
                if failures > 0 {
                    failures -= 1;
                    return Err(Error::http(502));
                }
                Ok(header.attempt_count())
            };
            let got = retry_loop(&handler, 4, &cancel, HeaderMap::new(), inner).await;
            (got, ids)
        };
        let ((got_a, ids_a), (got_b, ids_b)) = tokio::join!(run(), run());
        assert!(matches!(got_a, Ok(Some(2))), "{got_a:?}");
        assert!(matches!(got_b, Ok(Some(2))), "{got_b:?}");
        assert_eq!(ids_a.len(), 2);
        assert_eq!(ids_a[0], ids_a[1]);
        assert_eq!(ids_b[0], ids_b[1]);
        assert_ne!(ids_a[0], ids_b[0]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn configured_from_json() -> Result {
        let options = RetryConfig::from_json(
            r#"{"initialBackoffSecs": 2, "maxBackoffSecs": 3, "retryableCodes": [503]}"#,
        )?;
        let handler = RetryHandler::new(Some(options));

        let start = Instant::now();
        let mut calls = 0;
        let got = retry_loop(
            &handler,
            3,
            &CancellationToken::new(),
            HeaderMap::new(),
            async |_: HeaderMap| -> google_cloud_storage_retry::Result<()> {
                calls += 1;
                Err(Error::http(503))
            },
        )
        .await;
        assert!(
            matches!(got, Err(ref e) if e.http_status_code() == Some(503)),
            "{got:?}"
        );
        assert_eq!(calls, 3);
        // 2s after the first attempt, then capped at 3s.
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        Ok(())
    }
}
