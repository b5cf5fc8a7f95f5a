//! HTTP access to the FHIR test server.
//!
//! [`FhirTransport`] is the only place that touches the network; everything above it works on
//! [`FhirRequest`] and [`FhirResponse`] values so it can run against an in-memory transport.
//! [`FhirClient`] layers the console's resource operations on top of any transport.

use crate::config::CoreConfig;
use crate::constants::{
    DELETE_SUCCESS_STATUSES, FHIR_JSON, MEASURE_SUCCESS_STATUSES, RESOURCE_SUCCESS_STATUSES,
};
use crate::outcome::classify;
use crate::{ConsoleError, ConsoleResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A request relative to the configured server base.
#[derive(Clone, Debug, PartialEq)]
pub struct FhirRequest {
    pub method: Method,
    /// Path and query, starting with `/`.
    pub path: String,
    pub body: Option<Value>,
}

impl FhirRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FhirResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

/// Sends requests to the FHIR server.
///
/// Implementations return `Err` only when no response was received; every HTTP status,
/// including errors, comes back as a [`FhirResponse`].
#[async_trait]
pub trait FhirTransport: Send + Sync {
    async fn send(&self, request: FhirRequest) -> ConsoleResult<FhirResponse>;
}

#[async_trait]
impl<T: FhirTransport + ?Sized> FhirTransport for Arc<T> {
    async fn send(&self, request: FhirRequest) -> ConsoleResult<FhirResponse> {
        (**self).send(request).await
    }
}

/// `reqwest`-backed transport bound to one server base.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<CoreConfig>,
}

impl HttpTransport {
    pub fn new(config: Arc<CoreConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: Arc<CoreConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl FhirTransport for HttpTransport {
    async fn send(&self, request: FhirRequest) -> ConsoleResult<FhirResponse> {
        let url = self.config.url_for(&request.path)?;
        tracing::debug!("{} {}", request.method.as_str(), url);

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        }
        .header(reqwest::header::ACCEPT, FHIR_JSON);

        let builder = match &request.body {
            Some(body) => builder
                .header(reqwest::header::CONTENT_TYPE, FHIR_JSON)
                .body(serde_json::to_vec(body)?),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(FhirResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

/// Type and id of a listed resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub resource_type: String,
    pub id: String,
}

/// Check a resource type name such as `Patient` or `MeasureReport`.
pub fn validate_resource_type(resource_type: &str) -> ConsoleResult<()> {
    let mut chars = resource_type.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphabetic());
    if valid {
        Ok(())
    } else {
        Err(ConsoleError::InvalidInput(format!(
            "invalid resource type: {resource_type:?}"
        )))
    }
}

/// Check a logical id against the FHIR id grammar `[A-Za-z0-9\-\.]{1,64}`.
pub fn validate_resource_id(id: &str) -> ConsoleResult<()> {
    let valid = (1..=64).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !id.chars().all(|c| c == '.');
    if valid {
        Ok(())
    } else {
        Err(ConsoleError::InvalidInput(format!("invalid resource id: {id:?}")))
    }
}

/// Read a calendar date from a FHIR date or dateTime string.
///
/// Only the leading `YYYY-MM-DD` is used, so `2019-01-01T00:00:00-05:00` is January 1.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..10)?;
    NaiveDate::parse_from_str(date, crate::constants::PERIOD_DATE_FORMAT).ok()
}

fn require_object<'a>(body: &'a Value, what: &str) -> ConsoleResult<&'a serde_json::Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| ConsoleError::InvalidInput(format!("{what} must be a JSON object")))
}

fn check_resource_type(body: &Value, expected: &str) -> ConsoleResult<()> {
    let object = require_object(body, "resource")?;
    match object.get("resourceType").and_then(Value::as_str) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(ConsoleError::InvalidInput(format!(
            "resourceType {actual} does not match {expected}"
        ))),
        None => Err(ConsoleError::InvalidInput(
            "resource is missing resourceType".into(),
        )),
    }
}

/// Resource operations of the console over any transport.
#[derive(Clone)]
pub struct FhirClient<T> {
    transport: T,
}

impl<T: FhirTransport> FhirClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn exchange(&self, request: FhirRequest, accepted: &[u16]) -> ConsoleResult<Option<Value>> {
        let response = self.transport.send(request).await?;
        classify(&response, accepted)
    }

    async fn exchange_document(&self, request: FhirRequest, accepted: &[u16]) -> ConsoleResult<Value> {
        self.exchange(request, accepted)
            .await?
            .ok_or_else(|| ConsoleError::MalformedResponse("empty response body".into()))
    }

    /// Resource types the server advertises in its CapabilityStatement, sorted.
    pub async fn capability_resource_types(&self) -> ConsoleResult<Vec<String>> {
        let statement = self
            .exchange_document(FhirRequest::get("/metadata"), RESOURCE_SUCCESS_STATUSES)
            .await?;

        let mut types: Vec<String> = statement
            .pointer("/rest/0/resource")
            .and_then(Value::as_array)
            .map(|resources| {
                resources
                    .iter()
                    .filter_map(|r| r.get("type").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        types.sort();
        types.dedup();
        Ok(types)
    }

    /// All resources of one type, as listed in the server's search Bundle.
    pub async fn list(&self, resource_type: &str) -> ConsoleResult<Vec<ResourceSummary>> {
        validate_resource_type(resource_type)?;
        let bundle = self
            .exchange_document(
                FhirRequest::get(format!("/{resource_type}")),
                RESOURCE_SUCCESS_STATUSES,
            )
            .await?;

        let entries = bundle
            .get("entry")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(entries
            .iter()
            .filter_map(|entry| {
                let resource = entry.get("resource")?;
                Some(ResourceSummary {
                    resource_type: resource.get("resourceType")?.as_str()?.to_string(),
                    id: resource.get("id")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    pub async fn read(&self, resource_type: &str, id: &str) -> ConsoleResult<Value> {
        validate_resource_type(resource_type)?;
        validate_resource_id(id)?;
        self.exchange_document(
            FhirRequest::get(format!("/{resource_type}/{id}")),
            RESOURCE_SUCCESS_STATUSES,
        )
        .await
    }

    /// Create a resource; the server assigns the id.
    pub async fn create(&self, resource_type: &str, body: Value) -> ConsoleResult<Option<Value>> {
        validate_resource_type(resource_type)?;
        check_resource_type(&body, resource_type)?;
        self.exchange(
            FhirRequest::post(format!("/{resource_type}"), body),
            RESOURCE_SUCCESS_STATUSES,
        )
        .await
    }

    /// Create or replace the resource at `resource_type/id`.
    pub async fn update(
        &self,
        resource_type: &str,
        id: &str,
        body: Value,
    ) -> ConsoleResult<Option<Value>> {
        validate_resource_type(resource_type)?;
        validate_resource_id(id)?;
        check_resource_type(&body, resource_type)?;
        if let Some(body_id) = body.get("id").and_then(Value::as_str) {
            if body_id != id {
                return Err(ConsoleError::InvalidInput(format!(
                    "resource id {body_id} does not match {id}"
                )));
            }
        }
        self.exchange(
            FhirRequest::put(format!("/{resource_type}/{id}"), body),
            RESOURCE_SUCCESS_STATUSES,
        )
        .await
    }

    pub async fn delete(&self, resource_type: &str, id: &str) -> ConsoleResult<Option<Value>> {
        validate_resource_type(resource_type)?;
        validate_resource_id(id)?;
        self.exchange(
            FhirRequest::delete(format!("/{resource_type}/{id}")),
            DELETE_SUCCESS_STATUSES,
        )
        .await
    }

    /// Post a transaction Bundle to the server base.
    pub async fn transaction(&self, bundle: Value) -> ConsoleResult<Value> {
        check_resource_type(&bundle, "Bundle")?;
        match bundle.get("type").and_then(Value::as_str) {
            Some("transaction") => {}
            Some(other) => {
                return Err(ConsoleError::InvalidInput(format!(
                    "bundle type must be transaction, got {other}"
                )))
            }
            None => {
                return Err(ConsoleError::InvalidInput(
                    "bundle is missing type".into(),
                ))
            }
        }
        self.exchange_document(FhirRequest::post("/", bundle), RESOURCE_SUCCESS_STATUSES)
            .await
    }

    /// Effective period of a Measure as calendar dates.
    ///
    /// Each bound is `None` when absent or not a date.
    pub async fn measure_period(
        &self,
        measure_id: &str,
    ) -> ConsoleResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        validate_resource_id(measure_id)?;
        let measure = self
            .exchange_document(
                FhirRequest::get(format!("/Measure/{measure_id}")),
                RESOURCE_SUCCESS_STATUSES,
            )
            .await?;

        let bound = |name: &str| {
            measure
                .get("effectivePeriod")
                .and_then(|p| p.get(name))
                .and_then(Value::as_str)
                .and_then(parse_calendar_date)
        };
        Ok((bound("start"), bound("end")))
    }

    /// Send an assembled measure operation path and classify the outcome. A success status
    /// without a body is malformed: both operations always answer with a resource.
    pub async fn invoke_measure_operation(&self, path: &str) -> ConsoleResult<Value> {
        self.exchange_document(FhirRequest::get(path), MEASURE_SUCCESS_STATUSES)
            .await
    }
}
