//! Intermediate representation of an API.
//!
//! Produced by a bundle loader from OpenAPI, protobuf, GraphQL or AsyncAPI
//! sources and consumed once by a translation.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use flowc_core::{FlowcError, FlowcResult};
use serde::{Deserialize, Serialize};

/// Wire style of an API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    /// REST over HTTP.
    #[default]
    Rest,
    /// gRPC.
    Grpc,
    /// GraphQL.
    Graphql,
    /// WebSocket.
    Websocket,
    /// Server-sent events.
    Sse,
}

/// The ten endpoint shapes the translator understands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    /// Plain request/response HTTP.
    #[default]
    Http,
    /// Unary gRPC call.
    GrpcUnary,
    /// Server-streaming gRPC call.
    GrpcServerStream,
    /// Client-streaming gRPC call.
    GrpcClientStream,
    /// Bidirectional gRPC stream.
    GrpcBidirectional,
    /// GraphQL query.
    GraphqlQuery,
    /// GraphQL mutation.
    GraphqlMutation,
    /// GraphQL subscription.
    GraphqlSubscription,
    /// WebSocket channel.
    Websocket,
    /// Server-sent event stream.
    Sse,
}

impl EndpointType {
    /// Whether requests on this endpoint stay open beyond one response.
    #[must_use]
    pub fn is_streaming(self) -> bool {
        matches!(
            self,
            EndpointType::GrpcServerStream
                | EndpointType::GrpcClientStream
                | EndpointType::GrpcBidirectional
                | EndpointType::GraphqlSubscription
                | EndpointType::Websocket
                | EndpointType::Sse
        )
    }

    /// Whether the endpoint needs an HTTP upgrade to WebSocket.
    #[must_use]
    pub fn is_websocket(self) -> bool {
        self == EndpointType::Websocket
    }
}

/// Transport protocol of an endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// HTTP/1.1 or HTTP/2, negotiated.
    #[default]
    Http,
    /// gRPC over HTTP/2.
    Grpc,
    /// WebSocket upgrade.
    Websocket,
    /// Server-sent events.
    Sse,
}

/// API-level metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMetadata {
    /// Wire style.
    #[serde(rename = "type", default)]
    pub api_type: ApiType,
    /// API name.
    pub name: String,
    /// API version.
    pub version: String,
    /// Path prefix for every endpoint; normalized on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiMetadata {
    /// Normalized base path, or `/` when unset.
    #[must_use]
    pub fn base_path(&self) -> String {
        normalize_base_path(self.base_path.as_deref().unwrap_or(""))
    }
}

/// Where a parameter is carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    /// Path segment.
    #[default]
    Path,
    /// Query string.
    Query,
    /// Request header.
    Header,
    /// Cookie.
    Cookie,
}

/// An endpoint parameter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where it is carried.
    #[serde(rename = "in", default)]
    pub location: ParameterLocation,
    /// Whether the parameter is mandatory.
    #[serde(default)]
    pub required: bool,
    /// JSON schema of the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

impl Parameter {
    /// A required path parameter.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Path,
            required: true,
            schema: None,
        }
    }
}

/// Request body description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Media type.
    #[serde(default)]
    pub content_type: String,
    /// Name of a data model in [`Api::data_models`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
    /// Whether a body is mandatory.
    #[serde(default)]
    pub required: bool,
}

/// One declared response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Status code or `default`.
    pub status: String,
    /// Media type.
    #[serde(default)]
    pub content_type: String,
    /// Name of a data model in [`Api::data_models`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_ref: Option<String>,
}

/// Rate limit declared on an endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSpec {
    /// Requests allowed per window.
    pub requests: u32,
    /// Window length.
    #[serde(with = "humantime_serde")]
    pub per: Duration,
}

/// One operation of the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Unique within the API.
    pub id: String,
    /// Endpoint shape.
    #[serde(rename = "type", default)]
    pub endpoint_type: EndpointType,
    /// Transport protocol.
    #[serde(default)]
    pub protocol: Protocol,
    /// Path relative to the base path; `{name}` marks a parameter.
    pub path_pattern: String,
    /// Declared parameters.
    #[serde(default)]
    pub path_parameters: Vec<Parameter>,
    /// HTTP method (`POST` for gRPC).
    pub method: String,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,
    /// Declared responses.
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,
    /// Names of security schemes that apply.
    #[serde(default)]
    pub security: Vec<String>,
    /// Route timeout override.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Rate limit hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitSpec>,
}

impl Endpoint {
    /// Endpoint with path parameters declared from the pattern.
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, path_pattern: impl Into<String>) -> Self {
        let path_pattern = path_pattern.into();
        let method: String = method.into();
        let path_parameters = template_parameters(&path_pattern)
            .into_iter()
            .map(Parameter::path)
            .collect();
        Self {
            id: id.into(),
            method: method.to_ascii_uppercase(),
            path_pattern,
            path_parameters,
            ..Default::default()
        }
    }

    /// Set the endpoint type.
    #[must_use]
    pub fn with_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    /// Set the route timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Named schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    /// Model name.
    pub name: String,
    /// JSON schema.
    pub schema: serde_json::Value,
}

/// Kind of security scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecuritySchemeType {
    /// API key in a header, query or cookie.
    ApiKey,
    /// HTTP authentication (basic, bearer).
    Http,
    /// OAuth 2.0.
    Oauth2,
    /// OpenID Connect discovery.
    OpenIdConnect,
    /// Mutual TLS.
    MutualTls,
}

/// Security scheme declared by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// Name referenced from [`Endpoint::security`].
    pub name: String,
    /// Kind.
    #[serde(rename = "type")]
    pub scheme_type: SecuritySchemeType,
    /// Scheme-specific settings.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// Server the API is published on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Base URL.
    pub url: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Protocol-agnostic API description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Api {
    /// API metadata.
    pub metadata: ApiMetadata,
    /// Operations, in declaration order.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Named schemas.
    #[serde(default)]
    pub data_models: Vec<DataModel>,
    /// Security schemes.
    #[serde(default)]
    pub security: Vec<SecurityScheme>,
    /// Servers.
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Vendor extensions.
    #[serde(default)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

impl Api {
    /// Empty API.
    #[must_use]
    pub fn new(api_type: ApiType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            metadata: ApiMetadata {
                api_type,
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.metadata.base_path = Some(base_path.into());
        self
    }

    /// Append an endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Check the structural invariants of the IR.
    ///
    /// Endpoint ids are unique, every `{param}` in a path pattern is declared
    /// in `path_parameters`, methods are non-empty and patterns are rooted.
    pub fn validate(&self) -> FlowcResult<()> {
        let mut ids = HashSet::new();
        for endpoint in &self.endpoints {
            let field = format!("endpoints[{}]", endpoint.id);
            if endpoint.id.is_empty() {
                return Err(FlowcError::validation("endpoints[].id", "must not be empty"));
            }
            if !ids.insert(endpoint.id.as_str()) {
                return Err(FlowcError::validation(field, "duplicate endpoint id"));
            }
            if endpoint.method.trim().is_empty() {
                return Err(FlowcError::validation(field, "method must not be empty"));
            }
            if !endpoint.path_pattern.starts_with('/') {
                return Err(FlowcError::validation(
                    field,
                    format!("path pattern {:?} must start with '/'", endpoint.path_pattern),
                ));
            }
            for param in template_parameters(&endpoint.path_pattern) {
                let declared = endpoint
                    .path_parameters
                    .iter()
                    .any(|p| p.name == param && p.location == ParameterLocation::Path);
                if !declared {
                    return Err(FlowcError::validation(
                        field,
                        format!("path parameter {{{param}}} is not declared"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Normalize a base path: leading `/`, no trailing `/`, empty becomes `/`.
///
/// ```rust
/// use flowc_model::ir::normalize_base_path;
///
/// assert_eq!(normalize_base_path("api/v1/"), "/api/v1");
/// assert_eq!(normalize_base_path(""), "/");
/// assert_eq!(normalize_base_path("///"), "/");
/// ```
#[must_use]
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Parameter names in a `{name}` path template, in order of appearance.
///
/// Unterminated braces are treated as literal text.
#[must_use]
pub fn template_parameters(pattern: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut rest = pattern;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                params.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_api() -> Api {
        Api::new(ApiType::Rest, "users-api", "v1.0.0")
            .with_base_path("/api/v1/")
            .with_endpoint(Endpoint::new("getUser", "get", "/users/{id}"))
    }

    #[test]
    fn base_path_is_normalized() {
        let api = users_api();
        assert_eq!(api.metadata.base_path(), "/api/v1");
        assert_eq!(Api::default().metadata.base_path(), "/");
    }

    #[test]
    fn endpoint_new_declares_template_params() {
        let ep = Endpoint::new("p", "get", "/users/{id}/posts/{postId}");
        let names: Vec<_> = ep.path_parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "postId"]);
        assert_eq!(ep.method, "GET");
    }

    #[test]
    fn template_parameters_ignores_unterminated() {
        assert_eq!(template_parameters("/a/{b}/{c"), vec!["b"]);
        assert!(template_parameters("/plain").is_empty());
    }

    #[test]
    fn validate_accepts_well_formed() {
        assert!(users_api().validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let api = users_api().with_endpoint(Endpoint::new("getUser", "DELETE", "/users/{id}"));
        let err = api.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate endpoint id"));
    }

    #[test]
    fn validate_rejects_undeclared_param() {
        let mut ep = Endpoint::new("x", "GET", "/users/{id}");
        ep.path_parameters.clear();
        let api = Api::new(ApiType::Rest, "a", "1").with_endpoint(ep);
        assert!(matches!(api.validate(), Err(FlowcError::Validation { .. })));
    }

    #[test]
    fn streaming_endpoint_types() {
        assert!(EndpointType::Sse.is_streaming());
        assert!(EndpointType::GrpcBidirectional.is_streaming());
        assert!(!EndpointType::GrpcUnary.is_streaming());
        assert!(!EndpointType::Http.is_streaming());
    }

    #[test]
    fn api_deserializes_from_json() {
        let json = serde_json::json!({
            "metadata": { "type": "grpc", "name": "orders", "version": "v2" },
            "endpoints": [{
                "id": "Create",
                "type": "grpc_unary",
                "protocol": "grpc",
                "path_pattern": "/orders.v1.Orders/Create",
                "method": "POST",
                "timeout": "3s"
            }]
        });
        let api: Api = serde_json::from_value(json).unwrap();
        assert_eq!(api.metadata.api_type, ApiType::Grpc);
        assert_eq!(api.endpoints[0].endpoint_type, EndpointType::GrpcUnary);
        assert_eq!(api.endpoints[0].timeout, Some(Duration::from_secs(3)));
    }
}
