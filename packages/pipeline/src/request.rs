//! Request targets: `/seg_0/seg_1/...[?debug=1]`.

use std::collections::BTreeMap;

use crate::segment::split_path;

/// A parsed request target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    /// The raw path, without the query.
    pub path: String,
    /// Decoded, non-empty path tokens in order.
    pub tokens: Vec<String>,
    /// Whether a debug trace was requested.
    pub debug: bool,
    /// All query parameters. Only `debug` is interpreted.
    pub query: BTreeMap<String, String>,
}

impl Request {
    /// A request for `path` in normal mode.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            tokens: split_path(&path),
            path,
            debug: false,
            query: BTreeMap::new(),
        }
    }

    /// Parse a request target with an optional query string.
    pub fn parse(target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let query: BTreeMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        let debug = query.get("debug").is_some_and(|value| is_truthy(value));

        Self {
            path: path.to_string(),
            tokens: split_path(path),
            debug,
            query,
        }
    }

    /// Build a request from an `http` URI.
    pub fn from_uri(uri: &http::Uri) -> Self {
        match uri.query() {
            Some(query) => Self::parse(&format!("{}?{}", uri.path(), query)),
            None => Self::parse(uri.path()),
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
