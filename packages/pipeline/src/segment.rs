//! Classification of path tokens into segments.

use std::fmt;

use serde::Serialize;

use cidchain_store::Cid;

use crate::ServerRegistry;

/// One classified path token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// A registered server, by exact name.
    #[serde(rename = "server")]
    ServerRef { name: String },
    /// A content reference with an optional declared extension.
    #[serde(rename = "cid")]
    CidRef {
        cid: Cid,
        extension: Option<String>,
    },
    /// Anything else, used verbatim.
    Parameter { literal: String },
}

impl Segment {
    /// `"server"`, `"cid"` or `"parameter"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Segment::ServerRef { .. } => "server",
            Segment::CidRef { .. } => "cid",
            Segment::Parameter { .. } => "parameter",
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Segment::Parameter { .. })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::ServerRef { name } => f.write_str(name),
            Segment::CidRef {
                cid,
                extension: Some(ext),
            } => write!(f, "{}.{}", cid, ext),
            Segment::CidRef {
                cid,
                extension: None,
            } => write!(f, "{}", cid),
            Segment::Parameter { literal } => f.write_str(literal),
        }
    }
}

/// Classify a single (already decoded) token.
///
/// Server names win over CIDs; anything that is neither is a parameter.
/// Classification never fails.
pub fn classify(token: &str, registry: &dyn ServerRegistry) -> Segment {
    if registry.lookup(token).is_some() {
        return Segment::ServerRef {
            name: token.to_string(),
        };
    }

    match Cid::parse_with_extension(token) {
        Ok((cid, extension)) => Segment::CidRef { cid, extension },
        Err(_) => Segment::Parameter {
            literal: token.to_string(),
        },
    }
}

/// Split a request path into decoded tokens, dropping empty ones.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|token| !token.is_empty())
        .map(percent_decode)
        .collect()
}

/// Split, decode and classify every token of `path`.
pub fn parse_segments(path: &str, registry: &dyn ServerRegistry) -> Vec<Segment> {
    split_path(path)
        .iter()
        .map(|token| classify(token, registry))
        .collect()
}

/// Decode `%XX` escapes. Malformed escapes are kept literally; `+` is not
/// a space in paths.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRegistry, ServerDefinition};
    use cidchain_exec::Language;

    fn registry() -> InMemoryRegistry {
        InMemoryRegistry::new().with(ServerDefinition::new(
            "echo",
            Language::Bash,
            Cid::for_content(b"cat"),
        ))
    }

    #[test]
    fn server_name_wins() {
        assert_eq!(
            classify("echo", &registry()),
            Segment::ServerRef {
                name: "echo".to_string()
            }
        );
    }

    #[test]
    fn cid_with_and_without_extension() {
        let cid = Cid::for_content(b"print('hi')");
        assert_eq!(
            classify(cid.as_str(), &registry()),
            Segment::CidRef {
                cid: cid.clone(),
                extension: None
            }
        );
        assert_eq!(
            classify(&format!("{}.PY", cid), &registry()),
            Segment::CidRef {
                cid,
                extension: Some("py".to_string())
            }
        );
    }

    #[test]
    fn everything_else_is_parameter() {
        for token in ["hello", "foo.txt", "AAAAAAA", "not a cid at all", "AAAAAAAA."] {
            assert_eq!(
                classify(token, &registry()),
                Segment::Parameter {
                    literal: token.to_string()
                },
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn parse_drops_empty_tokens() {
        let segments = parse_segments("//echo///hello/", &registry());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].type_name(), "server");
        assert!(segments[1].is_parameter());
    }

    #[test]
    fn tokens_are_percent_decoded() {
        assert_eq!(split_path("/a%20b/c%2Fd"), vec!["a b", "c/d"]);
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("a+b"), "a+b");
    }

    #[test]
    fn display_round_trips_token() {
        let cid = Cid::for_content(b"x");
        let token = format!("{}.txt", cid);
        assert_eq!(classify(&token, &registry()).to_string(), token);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(classify("hello", &registry())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "parameter", "literal": "hello"})
        );
    }
}
