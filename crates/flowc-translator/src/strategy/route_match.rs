use flowc_model::Endpoint;
use flowc_types::bool_value;
use flowc_types::pb::envoy::config::route::v3::{header_matcher, route_match, HeaderMatcher, RouteMatch};
use flowc_types::pb::envoy::r#type::matcher::v3::{string_matcher, RegexMatcher, StringMatcher};

use super::RouteMatchStrategy;
use crate::builders::method_header_matcher;
use crate::path::{has_parameters, path_regex};

/// Header consulted by [`HeaderVersionedRouteMatch`] when none is configured.
pub const DEFAULT_VERSION_HEADER: &str = "x-api-version";

fn regex_specifier(path: &str) -> route_match::PathSpecifier {
    route_match::PathSpecifier::SafeRegex(RegexMatcher {
        regex: path_regex(path),
        ..Default::default()
    })
}

/// Path-prefix match.
#[derive(Clone, Debug)]
pub struct PrefixRouteMatch {
    case_sensitive: bool,
}

impl PrefixRouteMatch {
    /// Create the strategy.
    #[must_use]
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }
}

impl Default for PrefixRouteMatch {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RouteMatchStrategy for PrefixRouteMatch {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn create_matcher(&self, full_path: &str, method: &str, _endpoint: &Endpoint) -> RouteMatch {
        RouteMatch {
            path_specifier: Some(route_match::PathSpecifier::Prefix(full_path.to_string())),
            case_sensitive: (!self.case_sensitive).then(|| bool_value(false)),
            headers: vec![method_header_matcher(method)],
            ..Default::default()
        }
    }
}

/// Exact-path match.
///
/// Templated paths can never equal a request path literally, so they fall
/// back to the anchored regex form.
#[derive(Clone, Debug, Default)]
pub struct ExactRouteMatch;

impl RouteMatchStrategy for ExactRouteMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn create_matcher(&self, full_path: &str, method: &str, _endpoint: &Endpoint) -> RouteMatch {
        let path_specifier = if has_parameters(full_path) {
            regex_specifier(full_path)
        } else {
            route_match::PathSpecifier::Path(full_path.to_string())
        };
        RouteMatch {
            path_specifier: Some(path_specifier),
            headers: vec![method_header_matcher(method)],
            ..Default::default()
        }
    }
}

/// Anchored safe-regex match, one `[^/]+` per parameter.
#[derive(Clone, Debug, Default)]
pub struct RegexRouteMatch;

impl RouteMatchStrategy for RegexRouteMatch {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn create_matcher(&self, full_path: &str, method: &str, _endpoint: &Endpoint) -> RouteMatch {
        RouteMatch {
            path_specifier: Some(regex_specifier(full_path)),
            headers: vec![method_header_matcher(method)],
            ..Default::default()
        }
    }
}

/// Path prefix plus an exact match on a version header.
#[derive(Clone, Debug)]
pub struct HeaderVersionedRouteMatch {
    header: String,
    version: String,
    case_sensitive: bool,
}

impl HeaderVersionedRouteMatch {
    /// Match requests whose `header` equals `version`.
    #[must_use]
    pub fn new(header: impl Into<String>, version: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            header: header.into(),
            version: version.into(),
            case_sensitive,
        }
    }
}

impl RouteMatchStrategy for HeaderVersionedRouteMatch {
    fn name(&self) -> &'static str {
        "header-versioned"
    }

    fn create_matcher(&self, full_path: &str, method: &str, endpoint: &Endpoint) -> RouteMatch {
        let mut m = PrefixRouteMatch::new(self.case_sensitive).create_matcher(full_path, method, endpoint);
        m.headers.push(HeaderMatcher {
            name: self.header.clone(),
            header_match_specifier: Some(header_matcher::HeaderMatchSpecifier::StringMatch(
                StringMatcher {
                    match_pattern: Some(string_matcher::MatchPattern::Exact(self.version.clone())),
                    ..Default::default()
                },
            )),
            ..Default::default()
        });
        m
    }
}
