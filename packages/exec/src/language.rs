//! Supported implementation languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language a segment can be implemented in.
///
/// This is a closed set. Each variant has exactly one entry in the
/// [`RuntimeTable`](crate::RuntimeTable).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Bash,
    Clojure,
    ClojureScript,
    TypeScript,
}

impl Language {
    /// Every supported language.
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::Bash,
        Language::Clojure,
        Language::ClojureScript,
        Language::TypeScript,
    ];

    /// Map a CID extension to the language it declares.
    pub fn from_extension(extension: &str) -> Option<Language> {
        match extension.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "sh" | "bash" => Some(Language::Bash),
            "clj" => Some(Language::Clojure),
            "cljs" => Some(Language::ClojureScript),
            "ts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Canonical file extension for source files.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Bash => "sh",
            Language::Clojure => "clj",
            Language::ClojureScript => "cljs",
            Language::TypeScript => "ts",
        }
    }

    /// Lowercase name, as used in configuration and debug traces.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Bash => "bash",
            Language::Clojure => "clojure",
            Language::ClojureScript => "clojurescript",
            Language::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Language::Python),
            "bash" | "sh" | "shell" => Ok(Language::Bash),
            "clojure" | "clj" => Ok(Language::Clojure),
            "clojurescript" | "cljs" => Ok(Language::ClojureScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_round_trip() {
        for language in Language::ALL {
            assert_eq!(Language::from_extension(language.extension()), Some(language));
        }
    }

    #[test]
    fn non_executable_extension() {
        assert_eq!(Language::from_extension("txt"), None);
        assert_eq!(Language::from_extension("json"), None);
    }

    #[test]
    fn parse_aliases() {
        assert_eq!("Python3".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("sh".parse::<Language>().unwrap(), Language::Bash);
        assert_eq!("cljs".parse::<Language>().unwrap(), Language::ClojureScript);
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn serde_names() {
        assert_eq!(
            serde_json::to_string(&Language::ClojureScript).unwrap(),
            "\"clojurescript\""
        );
        let parsed: Language = serde_json::from_str("\"typescript\"").unwrap();
        assert_eq!(parsed, Language::TypeScript);
    }

    #[test]
    fn display_matches_as_str() {
        for language in Language::ALL {
            assert_eq!(language.to_string(), language.as_str());
        }
    }
}
