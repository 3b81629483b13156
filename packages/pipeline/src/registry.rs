//! Server definitions and the registry the resolver consults.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cidchain_exec::{Language, Target};
use cidchain_store::Cid;

fn enabled() -> bool {
    true
}

/// A named server: a program stored in the content store plus its flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    pub name: String,
    pub language: Language,
    /// CID of the program source.
    pub source: Cid,
    /// Reads chained input on standard input.
    #[serde(default = "enabled")]
    pub supports_chaining: bool,
    /// May appear in a pipeline of more than one segment.
    #[serde(default = "enabled")]
    pub usable_in_chain: bool,
}

impl ServerDefinition {
    /// A definition with both flags enabled.
    pub fn new(name: impl Into<String>, language: Language, source: Cid) -> Self {
        Self {
            name: name.into(),
            language,
            source,
            supports_chaining: true,
            usable_in_chain: true,
        }
    }

    #[must_use]
    pub fn with_chaining(mut self, supports_chaining: bool) -> Self {
        self.supports_chaining = supports_chaining;
        self
    }

    /// Mark the server as only valid as the sole segment of a pipeline.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.usable_in_chain = false;
        self
    }

    /// The dispatch target for this server.
    pub fn target(&self) -> Target {
        Target::server(self.name.clone(), self.language, self.source.clone())
    }
}

/// Name lookup for server definitions.
///
/// The registry is owned outside the core; the resolver holds a shared
/// handle and only ever reads it.
pub trait ServerRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<&ServerDefinition>;
}

impl<T: ServerRegistry + ?Sized> ServerRegistry for &T {
    fn lookup(&self, name: &str) -> Option<&ServerDefinition> {
        (**self).lookup(name)
    }
}

impl<T: ServerRegistry + ?Sized> ServerRegistry for Box<T> {
    fn lookup(&self, name: &str) -> Option<&ServerDefinition> {
        (**self).lookup(name)
    }
}

impl<T: ServerRegistry + ?Sized> ServerRegistry for Arc<T> {
    fn lookup(&self, name: &str) -> Option<&ServerDefinition> {
        (**self).lookup(name)
    }
}

/// A registry backed by an ordered map.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    servers: BTreeMap<String, ServerDefinition>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition, returning the one it replaced.
    pub fn register(&mut self, definition: ServerDefinition) -> Option<ServerDefinition> {
        self.servers.insert(definition.name.clone(), definition)
    }

    #[must_use]
    pub fn with(mut self, definition: ServerDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerDefinition> {
        self.servers.values()
    }
}

impl ServerRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str) -> Option<&ServerDefinition> {
        self.servers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> ServerDefinition {
        ServerDefinition::new("echo", Language::Bash, Cid::for_content(b"cat"))
    }

    #[test]
    fn lookup_is_exact() {
        let registry = InMemoryRegistry::new().with(echo());
        assert!(registry.lookup("echo").is_some());
        assert!(registry.lookup("Echo").is_none());
        assert!(registry.lookup("ech").is_none());
    }

    #[test]
    fn register_replaces() {
        let mut registry = InMemoryRegistry::new();
        assert!(registry.register(echo()).is_none());
        let previous = registry.register(echo().terminal()).unwrap();
        assert!(previous.usable_in_chain);
        assert!(!registry.lookup("echo").unwrap().usable_in_chain);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn flags_default_to_enabled() {
        let json = format!(
            r#"{{"name": "echo", "language": "bash", "source": "{}"}}"#,
            Cid::for_content(b"cat")
        );
        let definition: ServerDefinition = serde_json::from_str(&json).unwrap();
        assert!(definition.supports_chaining);
        assert!(definition.usable_in_chain);
        assert_eq!(definition, echo());
    }

    #[test]
    fn shared_handle() {
        let registry: Arc<dyn ServerRegistry> = Arc::new(InMemoryRegistry::new().with(echo()));
        assert_eq!(registry.lookup("echo").unwrap().language, Language::Bash);
    }
}
