//! HTTP client for the platform's REST endpoints.
//!
//! The realtime layer rides on a small REST surface:
//! - profile and roster lookups (`/api/me`, `/api/my_mentor`, `/api/my_requests`)
//! - conversation history (`/api/messages/{id}`)
//! - mentor link mutations (`/api/request_mentor`, `/api/approve_student`,
//!   `/api/assign_mentor`)
//! - HTTP fallbacks for the channel events (`/api/messages/send`, `/api/typing`,
//!   `/api/messages/mark_seen/{id}`)
//!
//! Queries answer with a `{data}` envelope, mutations with `{ok}` and an
//! optional `error` string. A rejected send (`Duplicate message blocked`)
//! arrives as a normal acknowledgment with `ok: false`, not as an HTTP
//! error.

use crate::channel::SendAck;
use crate::chat::types::{Message, UserId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::roster::Counterpart;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Connection timeout for API requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total timeout for one request/response exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A user profile as stored by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Platform user ID.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Account kind reported by the platform, `student` or `university`.
    #[serde(default)]
    pub account_type: Option<String>,
}

impl Profile {
    /// Whether this is a university account, the kind that mentors
    /// students. Everything else, including a missing kind, is treated as
    /// a student account.
    pub fn is_university(&self) -> bool {
        self.account_type.as_deref() == Some("university")
    }
}

/// A student's mentor link as returned by `/api/my_mentor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorLink {
    /// The linked mentor's profile.
    pub mentor: Profile,
    /// Whether the mentor has approved the link.
    #[serde(default)]
    pub approved: bool,
}

impl MentorLink {
    /// Roster entry for the linked mentor.
    pub fn counterpart(&self) -> Counterpart {
        let mut entry = Counterpart::new(
            self.mentor.id.clone(),
            self.mentor.name.clone(),
            self.approved,
        );
        entry.email = self.mentor.email.clone();
        entry
    }
}

/// One row of a mentor's request list as returned by `/api/my_requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRequest {
    /// The requesting student. `None` when the profile row was missing from
    /// the server-side join.
    #[serde(default)]
    pub student: Option<Profile>,
    /// Whether this mentor has already approved the link.
    #[serde(default)]
    pub approved: bool,
    /// When the student created the request.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl StudentRequest {
    /// Roster entry for the requesting student, if their profile resolved.
    pub fn counterpart(&self) -> Option<Counterpart> {
        let student = self.student.as_ref()?;
        let mut entry = Counterpart::new(student.id.clone(), student.name.clone(), self.approved);
        entry.email = student.email.clone();
        Some(entry)
    }
}

/// Client for the platform's REST endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    /// Build a client from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Fetch the local user's profile.
    pub async fn me(&self) -> Result<Profile> {
        let value = self.get_json("/api/me").await?;
        expect_data(value)
    }

    /// Fetch the student's mentor link. `None` when no mentor is assigned
    /// yet.
    pub async fn my_mentor(&self) -> Result<Option<MentorLink>> {
        let value = self.get_json("/api/my_mentor").await?;
        expect_data(value)
    }

    /// Fetch the mentor's student requests, oldest first.
    pub async fn my_requests(&self) -> Result<Vec<StudentRequest>> {
        let value = self.get_json("/api/my_requests").await?;
        expect_data(value)
    }

    /// Fetch the message history with one counterpart. Row order is not
    /// guaranteed by the server.
    pub async fn messages_with(&self, other_id: &UserId) -> Result<Vec<Message>> {
        let path = format!("/api/messages/{}", other_id.as_str());
        let value = self.get_json(&path).await?;
        expect_data(value)
    }

    /// Send a message over HTTP instead of the event channel.
    ///
    /// Rejections come back with `ok: false` and a reason, the same shape
    /// the channel acknowledgment uses.
    pub async fn send_message(&self, receiver_id: &UserId, body: &str) -> Result<SendAck> {
        let payload = json!({ "receiver_id": receiver_id, "message": body });
        let value = self.post_json("/api/messages/send", &payload).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Report typing state over HTTP instead of the event channel.
    pub async fn set_typing(&self, to_id: &UserId, is_typing: bool) -> Result<()> {
        let payload = json!({ "to_id": to_id, "is_typing": is_typing });
        let value = self.post_json("/api/typing", &payload).await?;
        expect_ok(&value)
    }

    /// Mark all messages from `other_id` as seen. Returns how many rows the
    /// server updated.
    pub async fn mark_seen(&self, other_id: &UserId) -> Result<u64> {
        let path = format!("/api/messages/mark_seen/{}", other_id.as_str());
        let value = self.post_json(&path, &json!({})).await?;
        expect_ok(&value)?;
        Ok(value.get("updated").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Ask the platform to link the local student to a mentor.
    pub async fn request_mentor(&self, mentor_id: &UserId) -> Result<()> {
        let payload = json!({ "mentor_id": mentor_id });
        let value = self.post_json("/api/request_mentor", &payload).await?;
        expect_ok(&value)
    }

    /// Approve a student's pending mentor request.
    pub async fn approve_student(&self, student_id: &UserId) -> Result<()> {
        let payload = json!({ "student_id": student_id });
        let value = self.post_json("/api/approve_student", &payload).await?;
        expect_ok(&value)
    }

    /// Ask the platform to auto-assign a mentor. Returns the assigned
    /// mentor's ID.
    pub async fn assign_mentor(&self, student_id: Option<&UserId>) -> Result<UserId> {
        let mut payload = serde_json::Map::new();
        if let Some(id) = student_id {
            payload.insert("student_id".to_string(), json!(id));
        }
        let value = self
            .post_json("/api/assign_mentor", &Value::Object(payload))
            .await?;
        value
            .get("mentor_id")
            .and_then(Value::as_str)
            .map(UserId::from)
            .ok_or_else(|| Error::Api("assignment returned no mentor_id".to_string()))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie.clone());
        }
        request
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        tracing::debug!(path, "api get");
        let response = self.request(Method::GET, path).send().await?;
        read_json(response).await
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value> {
        tracing::debug!(path, "api post");
        let response = self
            .request(Method::POST, path)
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;
    interpret_body(status, &body)
}

/// Decode a response body against the platform's envelope rules.
///
/// Failure envelopes (`{error}` without `ok`) become [`Error::Api`] whatever
/// the status code. Bodies that do not parse as JSON surface the HTTP status
/// instead, which is what proxies and login redirects produce.
fn interpret_body(status: StatusCode, body: &str) -> Result<Value> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(Error::Http(format!("request failed with status {status}")));
        }
        Err(err) => return Err(Error::Serialization(err)),
    };

    if value.get("ok").is_none() {
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(Error::Api(message.to_string()));
        }
    }
    if !status.is_success() {
        return Err(Error::Http(format!("request failed with status {status}")));
    }
    Ok(value)
}

/// Unwrap a `{data}` query envelope.
fn expect_data<T: serde::de::DeserializeOwned>(mut value: Value) -> Result<T> {
    let data = value.get_mut("data").map(Value::take).unwrap_or(Value::Null);
    Ok(serde_json::from_value(data)?)
}

/// Check an `{ok, error}` mutation envelope.
fn expect_ok(value: &Value) -> Result<()> {
    if value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    let message = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("server rejected the request");
    Err(Error::Api(message.to_string()))
}
