//! Language detection for CIDs that carry no extension.

use lazy_static::lazy_static;
use regex::Regex;

use crate::Language;

lazy_static! {
    static ref PYTHON_MARKERS: Regex =
        Regex::new(r"(?m)^(def \w+\(|import \w+|from [\w.]+ import |if __name__ == )").unwrap();
    static ref BASH_MARKERS: Regex =
        Regex::new(r"(?m)^(set -[euxo]+|echo |printf |read -r |export \w+=)").unwrap();
    static ref CLOJURESCRIPT_MARKERS: Regex =
        Regex::new(r"(?s)^\s*\((ns|defn) .*\bjs/").unwrap();
    static ref CLOJURE_MARKERS: Regex = Regex::new(r"(?m)^\((ns|defn|defn-) [\w.*+!?-]+").unwrap();
    static ref TYPESCRIPT_MARKERS: Regex =
        Regex::new(r"(?m)(^export (default )?(async )?function |\bDeno\.)").unwrap();
}

/// Decides which language a piece of source is written in.
///
/// A shebang line always wins. Without one, the marker heuristic of each
/// language in [`order`](Self::order) is tried in turn and the first match is
/// returned. Content that matches nothing is treated as plain data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detector {
    order: Vec<Language>,
}

impl Detector {
    /// The default order: Python, Bash, ClojureScript, Clojure, TypeScript.
    ///
    /// ClojureScript precedes Clojure because its markers are a superset.
    pub fn standard() -> Self {
        Self::with_order(vec![
            Language::Python,
            Language::Bash,
            Language::ClojureScript,
            Language::Clojure,
            Language::TypeScript,
        ])
    }

    /// Detect languages in a caller-chosen order.
    ///
    /// Languages left out of `order` are only recognized by shebang.
    pub fn with_order(order: Vec<Language>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[Language] {
        &self.order
    }

    /// Detect the language of `source`, if it looks executable.
    pub fn detect(&self, source: &[u8]) -> Option<Language> {
        let text = std::str::from_utf8(source).ok()?;

        if let Some(language) = shebang_language(text) {
            return Some(language);
        }

        self.order
            .iter()
            .copied()
            .find(|&language| matches_markers(language, text))
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::standard()
    }
}

fn shebang_language(text: &str) -> Option<Language> {
    let line = text.lines().next()?.strip_prefix("#!")?;
    // `#!/usr/bin/env -S deno run` and `#!/bin/bash` both name the
    // interpreter somewhere on the line.
    let words: Vec<&str> = line
        .split_whitespace()
        .map(|w| w.rsplit('/').next().unwrap_or(w))
        .collect();

    words.iter().find_map(|word| match *word {
        w if w.starts_with("python") => Some(Language::Python),
        "bash" | "sh" | "zsh" => Some(Language::Bash),
        "nbb" => Some(Language::ClojureScript),
        "bb" | "clojure" => Some(Language::Clojure),
        "deno" | "ts-node" => Some(Language::TypeScript),
        _ => None,
    })
}

fn matches_markers(language: Language, text: &str) -> bool {
    match language {
        Language::Python => PYTHON_MARKERS.is_match(text),
        Language::Bash => BASH_MARKERS.is_match(text),
        Language::Clojure => CLOJURE_MARKERS.is_match(text),
        Language::ClojureScript => CLOJURESCRIPT_MARKERS.is_match(text),
        Language::TypeScript => TYPESCRIPT_MARKERS.is_match(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_executable() {
        let detector = Detector::standard();
        assert_eq!(detector.detect(b"initial"), None);
        assert_eq!(detector.detect(b"hello world\nsecond line"), None);
        assert_eq!(detector.detect(&[0xff, 0x00, 0x12]), None);
    }

    #[test]
    fn shebangs() {
        let detector = Detector::standard();
        assert_eq!(detector.detect(b"#!/bin/bash\ncat"), Some(Language::Bash));
        assert_eq!(
            detector.detect(b"#!/usr/bin/env python3\nprint(1)"),
            Some(Language::Python)
        );
        assert_eq!(detector.detect(b"#!/usr/bin/env bb\n(println 1)"), Some(Language::Clojure));
        assert_eq!(
            detector.detect(b"#!/usr/bin/env nbb\n(println 1)"),
            Some(Language::ClojureScript)
        );
        assert_eq!(
            detector.detect(b"#!/usr/bin/env -S deno run\nconsole.log(1)"),
            Some(Language::TypeScript)
        );
    }

    #[test]
    fn markers() {
        let detector = Detector::standard();
        assert_eq!(
            detector.detect(b"import sys\nprint(sys.stdin.read().upper())"),
            Some(Language::Python)
        );
        assert_eq!(detector.detect(b"set -e\ncat -"), Some(Language::Bash));
        assert_eq!(
            detector.detect(b"(ns shout)\n(defn -main [] (println 1))"),
            Some(Language::Clojure)
        );
        assert_eq!(
            detector.detect(b"(ns shout)\n(js/console.log 1)"),
            Some(Language::ClojureScript)
        );
        assert_eq!(
            detector.detect(b"export function main(input: string) {}"),
            Some(Language::TypeScript)
        );
    }

    #[test]
    fn order_breaks_ties() {
        // Both a Python import and a Bash echo line.
        let source = b"import os\necho hi";
        assert_eq!(Detector::standard().detect(source), Some(Language::Python));
        assert_eq!(
            Detector::with_order(vec![Language::Bash, Language::Python]).detect(source),
            Some(Language::Bash)
        );
    }

    #[test]
    fn languages_outside_order_need_shebang() {
        let detector = Detector::with_order(vec![Language::Python]);
        assert_eq!(detector.detect(b"set -e\ncat"), None);
        assert_eq!(detector.detect(b"#!/bin/sh\ncat"), Some(Language::Bash));
    }
}
