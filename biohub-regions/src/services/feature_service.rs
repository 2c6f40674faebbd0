//! Remote feature service (WFS 2.0) client
//!
//! Requests are assembled from a base endpoint plus KVP parameters. A
//! request carrying a CQL filter is sent as a POST with the filter in a
//! form-encoded body, since WKT filters routinely exceed practical URL
//! lengths; every other request is a GET with all parameters in the query
//! string.
//!
//! Sending is behind [`FeatureTransport`] so request assembly and response
//! parsing can be exercised without a live service.

use crate::error::{RegionError, RegionResult};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "WFS";
const VERSION: &str = "2.0.0";
const USER_AGENT: &str = concat!("biohub-regions/", env!("CARGO_PKG_VERSION"));

/// Supported WFS operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WfsOperation {
    GetCapabilities,
    GetFeature,
    GetPropertyValue,
}

impl WfsOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            WfsOperation::GetCapabilities => "GetCapabilities",
            WfsOperation::GetFeature => "GetFeature",
            WfsOperation::GetPropertyValue => "GetPropertyValue",
        }
    }
}

/// Options for one feature service request
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub operation: WfsOperation,
    pub type_names: Option<String>,
    pub value_reference: Option<String>,
    pub property_name: Option<String>,
    pub output_format: Option<String>,
    pub srs_name: Option<String>,
    pub count: Option<u32>,
    pub cql_filter: Option<String>,
}

impl FeatureQuery {
    pub fn new(operation: WfsOperation) -> Self {
        Self {
            operation,
            type_names: None,
            value_reference: None,
            property_name: None,
            output_format: None,
            srs_name: None,
            count: None,
            cql_filter: None,
        }
    }

    /// `GetPropertyValue` for one column of one layer
    pub fn property_value(type_names: &str, value_reference: &str) -> Self {
        Self {
            type_names: Some(type_names.to_string()),
            value_reference: Some(value_reference.to_string()),
            ..Self::new(WfsOperation::GetPropertyValue)
        }
    }

    pub fn with_cql_filter(mut self, filter: impl Into<String>) -> Self {
        self.cql_filter = Some(filter.into());
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_property_name(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = Some(property_name.into());
        self
    }

    pub fn with_srs_name(mut self, srs_name: impl Into<String>) -> Self {
        self.srs_name = Some(srs_name.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Every parameter except the filter, in a stable order
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("service", SERVICE.to_string()),
            ("version", VERSION.to_string()),
            ("request", self.operation.as_str().to_string()),
        ];

        let optional = [
            ("typeNames", &self.type_names),
            ("valueReference", &self.value_reference),
            ("propertyName", &self.property_name),
            ("outputFormat", &self.output_format),
            ("srsName", &self.srs_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.push((key, value.clone()));
            }
        }

        if let Some(count) = self.count {
            params.push(("count", count.to_string()));
        }

        params
    }
}

/// HTTP method chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Fully assembled request, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Form-encoded body (POST only)
    pub form: Vec<(String, String)>,
}

impl FeatureRequest {
    pub fn build(base_url: &Url, query: &FeatureQuery) -> Self {
        let mut url = base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.base_params() {
                pairs.append_pair(key, &value);
            }
        }

        match &query.cql_filter {
            Some(filter) => Self {
                method: HttpMethod::Post,
                url,
                form: vec![("CQL_FILTER".to_string(), filter.clone())],
            },
            None => Self {
                method: HttpMethod::Get,
                url,
                form: Vec::new(),
            },
        }
    }

    /// Look a parameter up in the query string, then the form body
    pub fn param(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .or_else(|| {
                self.form
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.clone())
            })
    }
}

/// Sends assembled requests and returns the response body as text
#[async_trait]
pub trait FeatureTransport: Send + Sync {
    async fn send(&self, request: &FeatureRequest) -> RegionResult<String>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> RegionResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| RegionError::RemoteQuery(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeatureTransport for HttpTransport {
    async fn send(&self, request: &FeatureRequest) -> RegionResult<String> {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()).form(&request.form),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| RegionError::RemoteQuery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RegionError::RemoteQuery(format!(
                "feature service returned {}: {}",
                status.as_u16(),
                error_text.trim()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RegionError::RemoteQuery(e.to_string()))
    }
}

/// Generic client for the feature-query protocol
#[derive(Clone)]
pub struct FeatureServiceClient {
    base_url: Url,
    transport: Arc<dyn FeatureTransport>,
}

impl FeatureServiceClient {
    pub fn new(base_url: &str, transport: Arc<dyn FeatureTransport>) -> RegionResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            RegionError::RemoteQuery(format!("invalid feature service url '{}': {}", base_url, e))
        })?;

        Ok(Self {
            base_url,
            transport,
        })
    }

    /// Client talking HTTP to `base_url`
    pub fn http(base_url: &str, timeout: Duration) -> RegionResult<Self> {
        Self::new(base_url, Arc::new(HttpTransport::new(timeout)?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue a request and return the raw response text
    pub async fn query(&self, query: &FeatureQuery) -> RegionResult<String> {
        let request = FeatureRequest::build(&self.base_url, query);

        debug!(
            method = ?request.method,
            operation = query.operation.as_str(),
            type_names = query.type_names.as_deref().unwrap_or(""),
            url = %request.url,
            "Querying feature service"
        );

        self.transport.send(&request).await
    }

    /// `GetPropertyValue` returning the parsed values of `value_reference`
    pub async fn get_property_value(
        &self,
        type_names: &str,
        value_reference: &str,
        cql_filter: Option<String>,
    ) -> RegionResult<Vec<String>> {
        let mut query = FeatureQuery::property_value(type_names, value_reference);
        query.cql_filter = cql_filter;

        let body = self.query(&query).await?;
        parse_value_collection(&body, value_reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    ValueCollection,
    ExceptionReport,
}

fn schema_error(message: impl Into<String>) -> RegionError {
    RegionError::ResponseSchema(message.into())
}

fn duplicate_value(value_reference: &str) -> RegionError {
    schema_error(format!("member holds more than one {} element", value_reference))
}

fn root_for(local: &[u8]) -> RegionResult<Root> {
    match local {
        b"ValueCollection" => Ok(Root::ValueCollection),
        b"ExceptionReport" => Ok(Root::ExceptionReport),
        other => Err(schema_error(format!(
            "unexpected root element '{}'",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Parse a `GetPropertyValue` response
///
/// Expects `ValueCollection` → `member`* → `<value_reference>` text, with
/// namespace prefixes ignored. The whole document is validated before any
/// value is returned. Members whose value is empty are skipped; a member
/// without the value element, or with it repeated, fails the parse.
pub fn parse_value_collection(xml: &str, value_reference: &str) -> RegionResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let value_name = value_reference.as_bytes();
    let mut root: Option<Root> = None;
    let mut depth = 0usize;
    let mut member_depth: Option<usize> = None;
    let mut capture_depth: Option<usize> = None;
    let mut current: Option<String> = None;
    let mut text = String::new();
    let mut exception = String::new();
    let mut values = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            schema_error(format!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                let local = e.local_name();
                let local = local.as_ref();

                if depth == 1 {
                    root = Some(root_for(local)?);
                } else if root == Some(Root::ValueCollection) {
                    if depth == 2 && local == b"member" {
                        member_depth = Some(depth);
                        current = None;
                    } else if member_depth == Some(depth - 1) && local == value_name {
                        if current.is_some() {
                            return Err(duplicate_value(value_reference));
                        }
                        capture_depth = Some(depth);
                        text.clear();
                    }
                }
            }
            Event::Empty(e) => {
                let local = e.local_name();
                let local = local.as_ref();

                if depth == 0 {
                    return match root_for(local)? {
                        Root::ValueCollection => Ok(values),
                        Root::ExceptionReport => {
                            Err(schema_error("feature service returned an empty exception report"))
                        }
                    };
                }

                if root == Some(Root::ValueCollection) {
                    if depth == 1 && local == b"member" {
                        return Err(schema_error(format!(
                            "member without a {} element",
                            value_reference
                        )));
                    }
                    if member_depth == Some(depth) && local == value_name {
                        if current.is_some() {
                            return Err(duplicate_value(value_reference));
                        }
                        // Null value, e.g. <pub:NAME xsi:nil="true"/>
                        current = Some(String::new());
                    }
                }
            }
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| schema_error(format!("invalid text content: {}", e)))?;
                if capture_depth.is_some() {
                    text.push_str(&unescaped);
                } else if root == Some(Root::ExceptionReport) {
                    exception.push_str(unescaped.trim());
                    exception.push(' ');
                }
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                let content = String::from_utf8_lossy(&raw);
                if capture_depth.is_some() {
                    text.push_str(&content);
                } else if root == Some(Root::ExceptionReport) {
                    exception.push_str(content.trim());
                    exception.push(' ');
                }
            }
            Event::End(_) => {
                if capture_depth == Some(depth) {
                    current = Some(text.trim().to_string());
                    capture_depth = None;
                } else if member_depth == Some(depth) {
                    match current.take() {
                        Some(value) if !value.is_empty() => values.push(value),
                        Some(_) => debug!(value_reference, "Skipping member with empty value"),
                        None => {
                            return Err(schema_error(format!(
                                "member without a {} element",
                                value_reference
                            )))
                        }
                    }
                    member_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(schema_error("response ended before the document closed"));
    }

    match root {
        Some(Root::ValueCollection) => Ok(values),
        Some(Root::ExceptionReport) => Err(schema_error(format!(
            "feature service exception: {}",
            exception.trim()
        ))),
        None => Err(schema_error("response contained no XML root element")),
    }
}
