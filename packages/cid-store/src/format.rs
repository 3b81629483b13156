//! MIME type hints for stored content.

use std::borrow::Cow;
use std::fmt;

/// A MIME type describing how content should be served.
///
/// A CID extension (`{cid}.json`) selects a format; content without one is
/// served as text when it is valid UTF-8 and as an octet stream otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format(pub Cow<'static, str>);

impl Format {
    /// Plain UTF-8 text (`text/plain; charset=utf-8`)
    pub const TEXT: Format = Format(Cow::Borrowed("text/plain; charset=utf-8"));

    /// HTML (`text/html; charset=utf-8`)
    pub const HTML: Format = Format(Cow::Borrowed("text/html; charset=utf-8"));

    /// JSON (`application/json`)
    pub const JSON: Format = Format(Cow::Borrowed("application/json"));

    /// Markdown (`text/markdown`)
    pub const MARKDOWN: Format = Format(Cow::Borrowed("text/markdown"));

    /// CSV (`text/csv`)
    pub const CSV: Format = Format(Cow::Borrowed("text/csv"));

    /// XML (`application/xml`)
    pub const XML: Format = Format(Cow::Borrowed("application/xml"));

    /// JavaScript (`text/javascript`)
    pub const JAVASCRIPT: Format = Format(Cow::Borrowed("text/javascript"));

    /// Python source (`text/x-python`)
    pub const PYTHON: Format = Format(Cow::Borrowed("text/x-python"));

    /// Shell script (`application/x-sh`)
    pub const SHELL: Format = Format(Cow::Borrowed("application/x-sh"));

    /// Clojure source (`text/x-clojure`)
    pub const CLOJURE: Format = Format(Cow::Borrowed("text/x-clojure"));

    /// ClojureScript source (`text/x-clojurescript`)
    pub const CLOJURESCRIPT: Format = Format(Cow::Borrowed("text/x-clojurescript"));

    /// TypeScript source (`application/typescript`)
    pub const TYPESCRIPT: Format = Format(Cow::Borrowed("application/typescript"));

    /// PNG image
    pub const PNG: Format = Format(Cow::Borrowed("image/png"));

    /// JPEG image
    pub const JPEG: Format = Format(Cow::Borrowed("image/jpeg"));

    /// GIF image
    pub const GIF: Format = Format(Cow::Borrowed("image/gif"));

    /// SVG image
    pub const SVG: Format = Format(Cow::Borrowed("image/svg+xml"));

    /// PDF document
    pub const PDF: Format = Format(Cow::Borrowed("application/pdf"));

    /// Opaque binary data (`application/octet-stream`)
    pub const OCTET_STREAM: Format = Format(Cow::Borrowed("application/octet-stream"));

    /// Create a format from a static string.
    pub const fn from_static(s: &'static str) -> Self {
        Format(Cow::Borrowed(s))
    }

    /// Create a format from an owned string.
    pub fn new(s: impl Into<String>) -> Self {
        Format(Cow::Owned(s.into()))
    }

    /// Look up the format for a file extension (without the dot).
    ///
    /// Returns `None` for extensions with no known MIME type.
    pub fn from_extension(extension: &str) -> Option<Format> {
        let format = match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Self::TEXT,
            "html" | "htm" => Self::HTML,
            "json" => Self::JSON,
            "md" | "markdown" => Self::MARKDOWN,
            "csv" => Self::CSV,
            "xml" => Self::XML,
            "js" | "mjs" => Self::JAVASCRIPT,
            "py" => Self::PYTHON,
            "sh" | "bash" => Self::SHELL,
            "clj" => Self::CLOJURE,
            "cljs" => Self::CLOJURESCRIPT,
            "ts" => Self::TYPESCRIPT,
            "png" => Self::PNG,
            "jpg" | "jpeg" => Self::JPEG,
            "gif" => Self::GIF,
            "svg" => Self::SVG,
            "pdf" => Self::PDF,
            _ => return None,
        };
        Some(format)
    }

    /// Guess a format from raw content: text if it is UTF-8, binary otherwise.
    pub fn sniff(content: &[u8]) -> Format {
        if std::str::from_utf8(content).is_ok() {
            Self::TEXT
        } else {
            Self::OCTET_STREAM
        }
    }

    /// Get the MIME string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is a textual format.
    pub fn is_text(&self) -> bool {
        self.0.starts_with("text/") || self == &Self::JSON || self == &Self::XML
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for Format {
    fn from(s: &'static str) -> Self {
        Format(Cow::Borrowed(s))
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Format(Cow::Owned(s))
    }
}

impl AsRef<str> for Format {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
