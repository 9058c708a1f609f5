//! In-memory Sleeper upstream for tests and offline development.
//!
//! Serves canned JSON bodies keyed by request path and counts how often
//! each path was requested.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use super::client::Upstream;
use super::endpoint::Endpoint;
use super::error::UpstreamError;
use super::freshness::UpstreamResponse;

type Answer = Result<UpstreamResponse, UpstreamError>;

#[derive(Default)]
struct MockState {
    /// Answer returned every time once any scripted answers are used up.
    fixed: HashMap<String, Answer>,
    /// One-shot answers, consumed in order before `fixed`.
    scripted: HashMap<String, VecDeque<Answer>>,
    calls: HashMap<String, usize>,
}

/// Mock upstream that serves canned responses.
///
/// Unknown paths answer 404, like Sleeper does for unknown ids.
#[derive(Clone, Default)]
pub struct MockUpstream {
    state: Arc<Mutex<MockState>>,
    delay: Option<Duration>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent callers overlap with a load.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Always answer `path` with `body`.
    pub async fn respond(&self, path: &str, body: Value) {
        self.respond_with(path, UpstreamResponse::new(body)).await;
    }

    /// Always answer `path` with `response`, headers included.
    pub async fn respond_with(&self, path: &str, response: UpstreamResponse) {
        let mut state = self.state.lock().await;
        state.fixed.insert(path.to_string(), Ok(response));
    }

    /// Always answer `path` with `error`.
    pub async fn fail(&self, path: &str, error: UpstreamError) {
        let mut state = self.state.lock().await;
        state.fixed.insert(path.to_string(), Err(error));
    }

    /// Queue a one-shot answer for `path`, served before any fixed answer.
    pub async fn push(&self, path: &str, answer: Result<Value, UpstreamError>) {
        let mut state = self.state.lock().await;
        state
            .scripted
            .entry(path.to_string())
            .or_default()
            .push_back(answer.map(UpstreamResponse::new));
    }

    /// Number of requests made for `path`.
    pub async fn calls(&self, path: &str) -> usize {
        let state = self.state.lock().await;
        state.calls.get(path).copied().unwrap_or(0)
    }

    /// Number of requests made across all paths.
    pub async fn total_calls(&self) -> usize {
        let state = self.state.lock().await;
        state.calls.values().sum()
    }
}

impl Upstream for MockUpstream {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<UpstreamResponse, UpstreamError> {
        let path = endpoint.path();

        let answer = {
            let mut state = self.state.lock().await;
            *state.calls.entry(path.clone()).or_insert(0) += 1;

            match state.scripted.get_mut(&path).and_then(VecDeque::pop_front) {
                Some(answer) => answer,
                None => state
                    .fixed
                    .get(&path)
                    .cloned()
                    .unwrap_or_else(|| Err(UpstreamError::status(404, "null"))),
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn serves_fixed_response_and_counts() {
        let mock = MockUpstream::new();
        mock.respond("/state/nfl", json!({"week": 1})).await;

        let response = mock.fetch(&Endpoint::NflState).await.unwrap();
        assert_eq!(response.body, json!({"week": 1}));
        mock.fetch(&Endpoint::NflState).await.unwrap();

        assert_eq!(mock.calls("/state/nfl").await, 2);
        assert_eq!(mock.total_calls().await, 2);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let mock = MockUpstream::new();
        let err = mock
            .fetch(&Endpoint::League {
                league_id: "doesnotexist".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn scripted_answers_come_first() {
        let mock = MockUpstream::new();
        mock.push("/state/nfl", Err(UpstreamError::status(503, "")))
            .await;
        mock.respond("/state/nfl", json!({"week": 3})).await;

        assert!(mock.fetch(&Endpoint::NflState).await.is_err());
        assert_eq!(
            mock.fetch(&Endpoint::NflState).await.unwrap().body,
            json!({"week": 3})
        );
    }
}
