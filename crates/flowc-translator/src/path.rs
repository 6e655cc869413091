//! Path composition and template-to-regex derivation.

use flowc_model::ir::{normalize_base_path, template_parameters};

/// Regex fragment a `{param}` segment turns into.
pub const PARAM_REGEX: &str = "[^/]+";

/// Join a base path and an endpoint path pattern.
///
/// ```rust
/// use flowc_translator::path::join_path;
///
/// assert_eq!(join_path("/api/v1", "/users/{id}"), "/api/v1/users/{id}");
/// assert_eq!(join_path("/", "/process"), "/process");
/// assert_eq!(join_path("/api", "/"), "/api");
/// ```
#[must_use]
pub fn join_path(base: &str, pattern: &str) -> String {
    let base = normalize_base_path(base);
    let pattern = pattern.trim();
    let tail = pattern.trim_start_matches('/');
    match (base.as_str(), tail.is_empty()) {
        ("/", true) => "/".to_string(),
        ("/", false) => format!("/{tail}"),
        (_, true) => base,
        (_, false) => format!("{base}/{tail}"),
    }
}

/// Whether `path` contains at least one `{param}`.
#[must_use]
pub fn has_parameters(path: &str) -> bool {
    !template_parameters(path).is_empty()
}

/// Anchored regex for a path template.
///
/// Each `{name}` becomes `[^/]+`; literal text is escaped so regex
/// metacharacters in it match themselves.
///
/// ```rust
/// use flowc_translator::path::path_regex;
///
/// assert_eq!(path_regex("/users/{id}"), "^/users/[^/]+$");
/// assert_eq!(path_regex("/v1.0/a+b"), r"^/v1\.0/a\+b$");
/// ```
#[must_use]
pub fn path_regex(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 16);
    out.push('^');
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&regex::escape(&rest[..open]));
        out.push_str(PARAM_REGEX);
        rest = &after[close + 1..];
    }
    out.push_str(&regex::escape(rest));
    out.push('$');
    out
}
