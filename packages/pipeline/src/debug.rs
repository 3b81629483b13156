//! Per-segment resolution trace.
//!
//! The resolver records one [`TraceEntry`] per segment it visits. In debug
//! mode the trace is the response; in normal mode it is only kept for
//! logging and tests.

use bytes::Bytes;
use serde::Serialize;

use cidchain_exec::Language;
use cidchain_store::Cid;

use crate::Segment;

/// Characters of intermediate output kept in a trace entry.
pub const OUTPUT_PREVIEW_CHARS: usize = 256;

/// How a segment produced its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    /// Used verbatim (parameters, non-executable CIDs).
    Literal,
    /// Ran in a language runtime.
    Execution,
}

/// What happened at one segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub index: usize,
    /// The token as it appeared in the path (decoded).
    pub segment: String,
    #[serde(rename = "type")]
    pub segment_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub is_valid_cid: bool,
    pub resolution_type: ResolutionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_language: Option<Language>,
    pub supports_chaining: bool,
    pub input_present: bool,
    pub intermediate_output: String,
    pub errors: Vec<String>,
}

impl TraceEntry {
    /// A fresh entry for `segment` with no outcome yet.
    pub(crate) fn new(index: usize, segment: &Segment, input_present: bool) -> Self {
        let token = segment.to_string();
        let (server_name, cid, extension) = match segment {
            Segment::ServerRef { name } => (Some(name.clone()), None, None),
            Segment::CidRef { cid, extension } => (None, Some(cid.clone()), extension.clone()),
            Segment::Parameter { .. } => (None, None, None),
        };

        Self {
            index,
            is_valid_cid: cid.is_some() || Cid::parse_with_extension(&token).is_ok(),
            segment: token,
            segment_type: segment.type_name(),
            server_name,
            cid,
            extension,
            resolution_type: ResolutionType::Literal,
            implementation_language: None,
            supports_chaining: false,
            input_present,
            intermediate_output: String::new(),
            errors: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The full record of one debug resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineTrace {
    /// Entries ordered by segment index (left to right).
    pub segments: Vec<TraceEntry>,
    pub success: bool,
    pub final_output: String,
}

impl PipelineTrace {
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a plain string, bool, number or list thereof.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|entry| entry.errors.iter().map(String::as_str))
    }
}

/// Render output bytes for display in a trace.
///
/// UTF-8 text is truncated to [`OUTPUT_PREVIEW_CHARS`] characters with a
/// trailing `…`; anything else is summarized by size.
pub fn render_output(output: &Bytes) -> String {
    match std::str::from_utf8(output) {
        Ok(text) => match text.char_indices().nth(OUTPUT_PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}…", &text[..cut]),
            None => text.to_string(),
        },
        Err(_) => format!("<{} bytes binary>", output.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_verbatim() {
        assert_eq!(render_output(&Bytes::from_static(b"hello")), "hello");
        assert_eq!(render_output(&Bytes::new()), "");
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let text = "é".repeat(OUTPUT_PREVIEW_CHARS + 10);
        let rendered = render_output(&Bytes::from(text));
        assert_eq!(rendered.chars().count(), OUTPUT_PREVIEW_CHARS + 1);
        assert!(rendered.ends_with('…'));

        let exact = "a".repeat(OUTPUT_PREVIEW_CHARS);
        assert_eq!(render_output(&Bytes::from(exact.clone())), exact);
    }

    #[test]
    fn binary_is_summarized() {
        let rendered = render_output(&Bytes::from_static(&[0xff, 0xfe, 0x00]));
        assert_eq!(rendered, "<3 bytes binary>");
    }

    #[test]
    fn entry_fields_follow_segment() {
        let cid = Cid::for_content(b"initial");
        let entry = TraceEntry::new(
            1,
            &Segment::CidRef {
                cid: cid.clone(),
                extension: Some("txt".to_string()),
            },
            false,
        );
        assert_eq!(entry.segment, format!("{}.txt", cid));
        assert!(entry.is_valid_cid);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "cid");
        assert_eq!(json["cid"], cid.as_str());
        assert_eq!(json["resolution_type"], "literal");
        assert!(json.get("server_name").is_none());

        let param = TraceEntry::new(
            0,
            &Segment::Parameter {
                literal: "hello".to_string(),
            },
            false,
        );
        assert!(!param.is_valid_cid);
    }
}
