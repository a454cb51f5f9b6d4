//! HTTP types: methods, the users payload and target responses

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use stampede_core::{Operation, ResourceId};
use std::fmt;

/// Method each operation maps to on the users API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

impl From<Operation> for HttpMethod {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::Create => HttpMethod::Post,
            Operation::Read => HttpMethod::Get,
            Operation::Update => HttpMethod::Put,
        }
    }
}

/// JSON body of `POST /users` and `PUT /users/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: String,
    pub username: String,
    pub email: String,

    /// ISO date, e.g. `1990-01-01`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// What came back from the target for one request
#[derive(Debug, Clone, PartialEq)]
pub struct TargetResponse {
    pub status: u16,

    /// Parsed JSON body, when the response carried one
    pub body: Option<JsonValue>,

    /// `Location` header, if present
    pub location: Option<String>,
}

impl TargetResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: None,
            location: None,
        }
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Identifier of a created resource: body `id` first, then the
    /// last segment of the `Location` header
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.body
            .as_ref()
            .and_then(|body| body.get("id"))
            .and_then(ResourceId::from_json)
            .or_else(|| self.location.as_deref().and_then(ResourceId::from_location))
    }
}
