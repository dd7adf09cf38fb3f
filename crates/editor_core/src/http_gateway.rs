use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::{AssignmentId, Paper, PaperId, SessionId},
    error::{ApiError, ErrorBody, ErrorCode},
    protocol::{
        decode_keyed, unwrap_data, DuplicateResponse, ImportResult, PaperListQuery, PaperPage,
        PublishReceipt, PublishRequest, ScheduleAssignment,
    },
};
use tracing::{debug, warn};
use url::Url;

const NO_RESPONSE_MESSAGE: &str = "Server not respond!";

/// How a non-success status maps onto the failure taxonomy.
#[derive(Debug, Clone, Copy)]
enum StatusPolicy {
    Papers,
    /// Assignment endpoints report anything but conflict/lock/auth as a
    /// missing session or assignment.
    Assignments,
}

impl StatusPolicy {
    fn classify(self, status: u16) -> ErrorCode {
        match (self, status) {
            (_, 401) => ErrorCode::Unauthorized,
            (_, 409) => ErrorCode::Conflict,
            (_, 423) => ErrorCode::Locked,
            (StatusPolicy::Assignments, _) => ErrorCode::NotFound,
            (StatusPolicy::Papers, other) => ErrorCode::from_status(other),
        }
    }
}

/// REST implementation of the persistence and assignment gateways.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Self::with_client(base_url, http)
    }

    fn with_client(base_url: &str, http: Client) -> Result<Self> {
        let parsed = Url::parse(base_url.trim())
            .with_context(|| format!("invalid API base url '{base_url}'"))?;
        if parsed.cannot_be_a_base() {
            bail!("API base url '{base_url}' cannot carry a path");
        }
        Ok(Self {
            http,
            base_url: parsed,
            token: None,
        })
    }

    /// Attaches `Authorization: Bearer <token>` to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Appends `segments` to the base path, percent-encoding each one so an
    /// id can never reach a different endpoint.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.endpoint(segments))
            .header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder, policy: StatusPolicy) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure_from_response(response, policy).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| {
            ApiError::new(ErrorCode::Decode, format!("unexpected response body: {err}"))
        })
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
        policy: StatusPolicy,
    ) -> Result<Value, ApiError> {
        self.send(self.request(method, segments).json(body), policy).await
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        warn!(error = %err, "gateway: no response from server");
        ApiError::new(ErrorCode::Network, NO_RESPONSE_MESSAGE)
    } else {
        ApiError::new(ErrorCode::Network, err.to_string())
    }
}

async fn failure_from_response(response: Response, policy: StatusPolicy) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), %body, "gateway: request failed");
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("Response status: {status}"));
    ApiError {
        code: policy.classify(status.as_u16()),
        message,
        status: Some(status.as_u16()),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, key: &str) -> Result<T, ApiError> {
    decode_keyed(value, key)
        .map_err(|err| ApiError::new(ErrorCode::Decode, format!("unexpected {key} payload: {err}")))
}

#[async_trait]
impl crate::PersistenceGateway for HttpGateway {
    async fn list_papers(&self, query: &PaperListQuery) -> Result<PaperPage, ApiError> {
        let value = self
            .send(
                self.request(Method::GET, &["api", "papers"]).query(query),
                StatusPolicy::Papers,
            )
            .await?;
        serde_json::from_value(unwrap_data(value))
            .map_err(|err| ApiError::new(ErrorCode::Decode, format!("unexpected paper list: {err}")))
    }

    async fn get_paper(&self, paper_id: &PaperId) -> Result<Paper, ApiError> {
        let value = self
            .send(
                self.request(Method::GET, &["api", "papers", paper_id.as_str()]),
                StatusPolicy::Papers,
            )
            .await?;
        decode(value, "paper")
    }

    async fn create_paper(&self, paper: &Paper) -> Result<Paper, ApiError> {
        let value = self
            .send_json(Method::POST, &["api", "papers"], paper, StatusPolicy::Papers)
            .await?;
        decode(value, "paper")
    }

    async fn update_paper(&self, paper_id: &PaperId, paper: &Paper) -> Result<Paper, ApiError> {
        let value = self
            .send_json(
                Method::PUT,
                &["api", "papers", paper_id.as_str()],
                paper,
                StatusPolicy::Papers,
            )
            .await?;
        decode(value, "paper")
    }

    async fn publish_paper(
        &self,
        paper_id: &PaperId,
        version: Option<i64>,
    ) -> Result<PublishReceipt, ApiError> {
        let value = self
            .send_json(
                Method::POST,
                &["api", "papers", paper_id.as_str(), "publish"],
                &PublishRequest { version },
                StatusPolicy::Papers,
            )
            .await?;
        serde_json::from_value(unwrap_data(value)).map_err(|err| {
            ApiError::new(ErrorCode::Decode, format!("unexpected publish response: {err}"))
        })
    }

    async fn duplicate_paper(&self, paper_id: &PaperId) -> Result<PaperId, ApiError> {
        let value = self
            .send(
                self.request(
                    Method::POST,
                    &["api", "papers", paper_id.as_str(), "duplicate"],
                ),
                StatusPolicy::Papers,
            )
            .await?;
        let response: DuplicateResponse = serde_json::from_value(unwrap_data(value))
            .map_err(|err| {
                ApiError::new(ErrorCode::Decode, format!("unexpected duplicate response: {err}"))
            })?;
        Ok(response.paper_id)
    }

    async fn delete_paper(&self, paper_id: &PaperId) -> Result<(), ApiError> {
        self.send(
            self.request(Method::DELETE, &["api", "papers", paper_id.as_str()]),
            StatusPolicy::Papers,
        )
        .await?;
        Ok(())
    }

    async fn import_markdown(&self, markdown_text: &str) -> Result<ImportResult, ApiError> {
        let form = multipart::Form::new().text("markdown_text", markdown_text.to_string());
        let value = self
            .send(
                self.request(Method::POST, &["api", "papers", "import"])
                    .multipart(form),
                StatusPolicy::Papers,
            )
            .await?;
        Ok(ImportResult(unwrap_data(value)))
    }
}

#[async_trait]
impl crate::AssignmentGateway for HttpGateway {
    async fn create_assignment(
        &self,
        session_id: &SessionId,
        assignment: &ScheduleAssignment,
    ) -> Result<ScheduleAssignment, ApiError> {
        let value = self
            .send_json(
                Method::POST,
                &["api", "sessions", session_id.as_str(), "assignments"],
                assignment,
                StatusPolicy::Assignments,
            )
            .await?;
        decode(value, "assignment")
    }

    async fn update_assignment(
        &self,
        session_id: &SessionId,
        assignment_id: &AssignmentId,
        assignment: &ScheduleAssignment,
    ) -> Result<ScheduleAssignment, ApiError> {
        let value = self
            .send_json(
                Method::PUT,
                &[
                    "api",
                    "sessions",
                    session_id.as_str(),
                    "assignments",
                    assignment_id.as_str(),
                ],
                assignment,
                StatusPolicy::Assignments,
            )
            .await?;
        decode(value, "assignment")
    }

    async fn delete_assignment(
        &self,
        session_id: &SessionId,
        assignment_id: &AssignmentId,
    ) -> Result<(), ApiError> {
        self.send(
            self.request(
                Method::DELETE,
                &[
                    "api",
                    "sessions",
                    session_id.as_str(),
                    "assignments",
                    assignment_id.as_str(),
                ],
            ),
            StatusPolicy::Assignments,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/http_gateway_tests.rs"]
mod tests;
