//! Transport abstraction for the secrets API
//!
//! This trait allows the secrets manager to run against different backends
//! (the real GitHub REST API, an in-memory fake for testing, etc.)

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::route::Route;

/// HTTP methods used by the secrets API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request against a route
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub route: Route,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(route: Route) -> Self {
        Self {
            method: Method::Get,
            route,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn delete(route: Route) -> Self {
        Self {
            method: Method::Delete,
            route,
            query: Vec::new(),
            body: None,
        }
    }

    /// `PUT` with an optional JSON body
    pub fn put<B: Serialize>(route: Route, body: Option<&B>) -> Result<Self, ApiError> {
        let body = body.map(serde_json::to_value).transpose()?;
        Ok(Self {
            method: Method::Put,
            route,
            query: Vec::new(),
            body,
        })
    }

    /// Add a query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }
}

/// A successful (2xx/3xx) response
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// Response without a body (e.g. 201/204 from a write)
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Decode the body into a resource payload
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let body = self.body.ok_or_else(|| {
            ApiError::Decode(format!("status {} response had no body", self.status))
        })?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Request/response access to the remote secrets API.
///
/// Implementations return `Err(ApiError::Status { .. })` for any 4xx/5xx
/// status so callers can distinguish not-found from other failures.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    /// Send a request and wait for its response
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}
