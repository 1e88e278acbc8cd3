use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pr_load_instruments::{report_operation, OperationRecord, Reporter};
use reqwest::{Method, StatusCode};
use serde::Serialize;

use crate::error::TransportError;
use crate::http::{HttpAdapter, HttpResponse};
use crate::types::{CreatePullRequest, MergePullRequest, ReviewOperation, ServiceStats, Team};

/// Display name given to every pull request the load generator opens.
pub const PULL_REQUEST_NAME: &str = "Load Test PR";

/// What a single scenario step observed. The same information has already been handed to the
/// [Reporter] by the time a step returns.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub operation: ReviewOperation,
    pub success: bool,
    /// Absent when the request never got a response.
    pub status: Option<StatusCode>,
    pub elapsed: Duration,
    pub transport_error: Option<TransportError>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Client for the review service which records an outcome for every call it makes.
///
/// Each step makes exactly one request. A status the step does not expect is a failed outcome,
/// not an error, so callers can carry on with the next step.
#[derive(Debug, Clone)]
pub struct ReviewClientInstrumented {
    http: HttpAdapter,
    reporter: Arc<Reporter>,
}

impl ReviewClientInstrumented {
    pub fn new(http: HttpAdapter, reporter: Arc<Reporter>) -> Self {
        Self { http, reporter }
    }

    pub fn connect(base_url: &str, timeout: Duration, reporter: Arc<Reporter>) -> anyhow::Result<Self> {
        Ok(Self::new(HttpAdapter::new(base_url, timeout)?, reporter))
    }

    /// Create the team with all of its members. The team already existing counts as success.
    pub async fn ensure_team(&self, team: &Team) -> StepOutcome {
        self.step(
            ReviewOperation::TeamSetup,
            Method::POST,
            "/team/add",
            Some(team),
            None,
            &[StatusCode::CREATED, StatusCode::CONFLICT],
        )
        .await
    }

    pub async fn create_pull_request(&self, pull_request_id: &str, author_id: &str) -> StepOutcome {
        let body = CreatePullRequest {
            pull_request_id,
            pull_request_name: PULL_REQUEST_NAME,
            author_id,
        };
        self.step(
            ReviewOperation::CreatePr,
            Method::POST,
            "/pullRequest/create",
            Some(&body),
            None,
            &[StatusCode::CREATED],
        )
        .await
    }

    pub async fn merge_pull_request(&self, pull_request_id: &str) -> StepOutcome {
        self.step(
            ReviewOperation::MergePr,
            Method::POST,
            "/pullRequest/merge",
            Some(&MergePullRequest { pull_request_id }),
            None,
            &[StatusCode::OK],
        )
        .await
    }

    /// Read-only check, the list of pull requests is read in full but not interpreted.
    pub async fn get_reviews_for_user(&self, user_id: &str) -> StepOutcome {
        self.step(
            ReviewOperation::GetReview,
            Method::GET,
            "/users/getReview",
            None::<&()>,
            Some(&[("user_id", user_id)]),
            &[StatusCode::OK],
        )
        .await
    }

    /// Fetch the service's own statistics. Not recorded as an operation.
    pub async fn get_stats(&self) -> anyhow::Result<ServiceStats> {
        let response = self
            .http
            .perform(Method::GET, "/stats", None::<&()>, None)
            .await?;
        if response.status != StatusCode::OK {
            anyhow::bail!("Unexpected status {} from /stats", response.status);
        }

        serde_json::from_str(&response.body).context("Failed to parse /stats response")
    }

    async fn step<B>(
        &self,
        operation: ReviewOperation,
        method: Method,
        path: &str,
        body: Option<&B>,
        query: Option<&[(&str, &str)]>,
        expected: &[StatusCode],
    ) -> StepOutcome
    where
        B: Serialize + ?Sized,
    {
        let record = OperationRecord::new(operation.as_str());
        let result = self.http.perform(method, path, body, query).await;
        let recorded = report_operation(&self.reporter, record, &result, |response: &HttpResponse| {
            (
                response.status.as_u16(),
                expected.contains(&response.status),
                response.elapsed,
            )
        });

        match result {
            Ok(response) => {
                let success = expected.contains(&response.status);
                if !success {
                    log::debug!(
                        "{operation} got unexpected status {}: {}",
                        response.status,
                        response.body
                    );
                }
                StepOutcome {
                    operation,
                    success,
                    status: Some(response.status),
                    elapsed: recorded,
                    transport_error: None,
                }
            }
            Err(err) => {
                log::debug!("{operation} failed without a response: {err}");
                StepOutcome {
                    operation,
                    success: false,
                    status: None,
                    elapsed: recorded,
                    transport_error: Some(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamMember;
    use pr_load_instruments::ReportConfig;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn team() -> Team {
        Team {
            team_name: "backend-test".to_string(),
            members: vec![
                TeamMember {
                    user_id: "u1".to_string(),
                    username: "Ivan".to_string(),
                    is_active: true,
                },
                TeamMember {
                    user_id: "u2".to_string(),
                    username: "Vasiliy".to_string(),
                    is_active: true,
                },
            ],
        }
    }

    fn client(server: &MockServer) -> (ReviewClientInstrumented, Arc<Reporter>) {
        let reporter = Arc::new(ReportConfig::default().init());
        let client =
            ReviewClientInstrumented::connect(&server.uri(), Duration::from_secs(5), reporter.clone())
                .unwrap();
        (client, reporter)
    }

    async fn team_add_returns(status: u16) -> (StepOutcome, Arc<Reporter>) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/team/add"))
            .and(body_json(serde_json::json!({
                "team_name": "backend-test",
                "members": [
                    {"user_id": "u1", "username": "Ivan", "is_active": true},
                    {"user_id": "u2", "username": "Vasiliy", "is_active": true},
                ],
            })))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&mock_server)
            .await;

        let (client, reporter) = client(&mock_server);
        (client.ensure_team(&team()).await, reporter)
    }

    #[tokio::test]
    async fn ensure_team_created_is_success() {
        let (outcome, reporter) = team_add_returns(201).await;
        assert!(outcome.is_success());
        assert_eq!(Some(StatusCode::CREATED), outcome.status);
        assert_eq!(1, reporter.snapshot().get("team-setup").unwrap().successes);
    }

    #[tokio::test]
    async fn ensure_team_conflict_is_success() {
        let (outcome, _) = team_add_returns(409).await;
        assert!(outcome.is_success());
        assert_eq!(Some(StatusCode::CONFLICT), outcome.status);
    }

    #[tokio::test]
    async fn ensure_team_bad_request_is_failure() {
        let (outcome, reporter) = team_add_returns(400).await;
        assert!(!outcome.is_success());
        let summary = reporter.snapshot().get("team-setup").cloned().unwrap();
        assert_eq!(1, summary.failures);
        assert_eq!(0, summary.transport_errors);
    }

    #[tokio::test]
    async fn create_pull_request_sends_author_and_name() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pullRequest/create"))
            .and(body_json(serde_json::json!({
                "pull_request_id": "pr-load-agent-0-1-00",
                "pull_request_name": "Load Test PR",
                "author_id": "u1",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let (client, reporter) = client(&mock_server);
        let outcome = client
            .create_pull_request("pr-load-agent-0-1-00", "u1")
            .await;

        assert!(outcome.is_success());
        assert_eq!(ReviewOperation::CreatePr, outcome.operation);
        assert_eq!(1, reporter.snapshot().attempts("create-pr"));
    }

    #[tokio::test]
    async fn server_error_is_a_recorded_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pullRequest/create"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let (client, reporter) = client(&mock_server);
        let outcome = client.create_pull_request("pr-1", "u1").await;

        assert!(!outcome.is_success());
        assert_eq!(Some(StatusCode::INTERNAL_SERVER_ERROR), outcome.status);
        let summary = reporter.snapshot().get("create-pr").cloned().unwrap();
        assert_eq!(1, summary.attempts);
        assert_eq!(1, summary.failures);
        assert_eq!(Some(&1), summary.status_counts.get(&500));
    }

    #[tokio::test]
    async fn merge_expects_ok() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pullRequest/merge"))
            .and(body_json(serde_json::json!({"pull_request_id": "pr-1"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/pullRequest/merge"))
            .and(body_json(serde_json::json!({"pull_request_id": "missing"})))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let (client, reporter) = client(&mock_server);
        assert!(client.merge_pull_request("pr-1").await.is_success());
        assert!(!client.merge_pull_request("missing").await.is_success());

        let summary = reporter.snapshot().get("merge-pr").cloned().unwrap();
        assert_eq!(2, summary.attempts);
        assert_eq!(1, summary.successes);
    }

    #[tokio::test]
    async fn get_reviews_queries_by_user() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/getReview"))
            .and(query_param("user_id", "u2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"user_id": "u2", "pull_requests": []})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let (client, _) = client(&mock_server);
        let outcome = client.get_reviews_for_user("u2").await;

        assert!(outcome.is_success());
        assert_eq!(ReviewOperation::GetReview, outcome.operation);
    }

    #[tokio::test]
    async fn transport_error_is_recorded_without_status() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let reporter = Arc::new(ReportConfig::default().init());
        let client = ReviewClientInstrumented::connect(
            &format!("http://127.0.0.1:{port}"),
            Duration::from_secs(5),
            reporter.clone(),
        )
        .unwrap();

        let outcome = client.get_reviews_for_user("u2").await;

        assert!(!outcome.is_success());
        assert_eq!(None, outcome.status);
        assert!(outcome.transport_error.is_some());
        let summary = reporter.snapshot().get("get-review").cloned().unwrap();
        assert_eq!(1, summary.failures);
        assert_eq!(1, summary.transport_errors);
        assert!(summary.status_counts.is_empty());
    }

    #[tokio::test]
    async fn timed_out_step_reports_the_time_waited() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/getReview"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&mock_server)
            .await;

        let reporter = Arc::new(ReportConfig::default().init());
        let client = ReviewClientInstrumented::connect(
            &mock_server.uri(),
            Duration::from_millis(200),
            reporter.clone(),
        )
        .unwrap();

        let outcome = client.get_reviews_for_user("u2").await;

        assert!(matches!(
            outcome.transport_error,
            Some(TransportError::Timeout(_))
        ));
        assert!(outcome.elapsed >= Duration::from_millis(200), "{:?}", outcome.elapsed);
        let latency = reporter
            .snapshot()
            .get("get-review")
            .and_then(|summary| summary.latency.clone())
            .unwrap();
        assert_eq!(outcome.elapsed.as_micros() as f64 / 1000.0, latency.max_ms);
    }

    #[tokio::test]
    async fn stats_are_parsed_and_not_recorded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_teams": 1,
                "total_users": 3,
                "active_users": 3,
                "total_pull_requests": 10,
                "open_pull_requests": 4,
                "top_reviewers": [{"user_id": "u2", "username": "Vasiliy", "review_count": 7}],
            })))
            .mount(&mock_server)
            .await;

        let (client, reporter) = client(&mock_server);
        let stats = client.get_stats().await.unwrap();

        assert_eq!(10, stats.total_pull_requests);
        assert_eq!(4, stats.open_pull_requests);
        assert_eq!("u2", stats.top_reviewers[0].user_id);
        assert!(reporter.snapshot().is_empty());
    }
}
