//! Language -> interpreter invocation table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Language;

/// How to start an interpreter for a source file.
///
/// The spawned command line is `program args.. <source-file> [param]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Interpreter executable, resolved through `PATH`.
    pub program: String,
    /// Arguments placed before the source file.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// The built-in invocation for a language.
    pub fn standard(language: Language) -> Self {
        match language {
            Language::Python => Invocation::new("python3", &[]),
            Language::Bash => Invocation::new("bash", &[]),
            Language::Clojure => Invocation::new("bb", &[]),
            Language::ClojureScript => Invocation::new("nbb", &[]),
            Language::TypeScript => Invocation::new("deno", &["run", "--quiet"]),
        }
    }

    /// Full argument vector for running `source` with an optional parameter.
    pub fn argv(&self, source: &str, param: Option<&str>) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.push(source.to_string());
        if let Some(param) = param {
            argv.push(param.to_string());
        }
        argv
    }
}

/// The mapping from language to invocation used by a dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeTable {
    entries: BTreeMap<Language, Invocation>,
}

impl RuntimeTable {
    /// A table holding [`Invocation::standard`] for every language.
    pub fn standard() -> Self {
        Self {
            entries: Language::ALL
                .iter()
                .map(|&language| (language, Invocation::standard(language)))
                .collect(),
        }
    }

    /// Look up the invocation for a language.
    pub fn get(&self, language: Language) -> Option<&Invocation> {
        self.entries.get(&language)
    }

    /// Replace the invocation for a language.
    pub fn set(&mut self, language: Language, invocation: Invocation) {
        self.entries.insert(language, invocation);
    }

    /// Builder-style variant of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, language: Language, invocation: Invocation) -> Self {
        self.set(language, invocation);
        self
    }
}

impl Default for RuntimeTable {
    fn default() -> Self {
        Self::standard()
    }
}
