//! The store, registry and resolver a CLI invocation works against.

use std::path::Path;
use std::sync::Arc;

use cidchain_exec::{CommandRunner, Dispatcher, ProcessRunner};
use cidchain_pipeline::{InMemoryRegistry, Resolver, ServerDefinition};
use cidchain_store::{Cid, ContentStore, InMemoryContentStore};

use crate::config::{Config, LoadedConfig, ServerSource};
use crate::error::{CliError, Result};

/// Everything built from a config at startup.
///
/// The store lives in memory for the duration of the process: server
/// sources and `content` files are loaded into it first, and anything a
/// command writes is gone when the process exits.
pub struct Context<R = CommandRunner> {
    pub store: Arc<InMemoryContentStore>,
    pub registry: Arc<InMemoryRegistry>,
    pub resolver: Resolver<R>,
}

impl Context<CommandRunner> {
    pub fn from_config(loaded: &LoadedConfig) -> Result<Self> {
        Self::build(&loaded.config, &loaded.base_dir, CommandRunner::new())
    }
}

impl<R: ProcessRunner> Context<R> {
    /// Load sources and content, then wire the resolver around `runner`.
    pub fn build(config: &Config, base_dir: &Path, runner: R) -> Result<Self> {
        let store = Arc::new(InMemoryContentStore::new());

        let mut registry = InMemoryRegistry::new();
        for server in &config.servers {
            let source = match server.source(base_dir)? {
                ServerSource::Inline(text) => store.put(text.as_bytes())?,
                ServerSource::File(path) => store.put(&read(&path)?)?,
            };
            tracing::debug!(
                server = %server.name,
                language = %server.language,
                %source,
                "registered server"
            );
            registry.register(ServerDefinition {
                name: server.name.clone(),
                language: server.language,
                source,
                supports_chaining: server.supports_chaining,
                usable_in_chain: server.usable_in_chain,
            });
        }

        for file in &config.content {
            let path = base_dir.join(file);
            let cid = store.put(&read(&path)?)?;
            tracing::debug!(path = %path.display(), %cid, "loaded content");
        }

        let registry = Arc::new(registry);
        let dispatcher = Dispatcher::with_runner(store.clone(), runner)
            .with_runtimes(config.runtime_table())
            .with_detector(config.detector())
            .with_timeout(config.timeout());

        Ok(Self {
            resolver: Resolver::new(registry.clone(), dispatcher),
            store,
            registry,
        })
    }

    /// Store `content` and return its CID.
    pub fn put(&self, content: &[u8]) -> Result<Cid> {
        Ok(self.store.put(content)?)
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidchain_exec::mock::ScriptedRunner;
    use cidchain_exec::Language;
    use cidchain_pipeline::ServerRegistry;

    #[test]
    fn loads_servers_and_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("shout.py"),
            "import sys\nprint(sys.stdin.read().upper())",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x".repeat(100)).unwrap();

        let config = Config::from_json(
            r#"{
                "servers": [
                    { "name": "echo", "language": "bash", "source": "cat" },
                    { "name": "shout", "language": "python", "source_file": "shout.py",
                      "usable_in_chain": false }
                ],
                "content": ["notes.txt"]
            }"#,
        )
        .unwrap();

        let context = Context::build(&config, dir.path(), ScriptedRunner::new()).unwrap();

        let echo = context.registry.lookup("echo").unwrap();
        assert_eq!(echo.language, Language::Bash);
        assert_eq!(&context.store.get(&echo.source).unwrap()[..], b"cat");

        let shout = context.registry.lookup("shout").unwrap();
        assert!(!shout.usable_in_chain);
        assert!(context.store.get(&shout.source).unwrap().starts_with(b"import sys"));

        // Only notes.txt is over the embedding limit.
        assert_eq!(context.store.len(), 1);
        assert!(context
            .store
            .exists(&Cid::for_content("x".repeat(100).as_bytes()))
            .unwrap());
    }

    #[test]
    fn missing_source_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_json(
            r#"{ "servers": [ { "name": "ghost", "language": "bash", "source_file": "ghost.sh" } ] }"#,
        )
        .unwrap();

        let err = Context::build(&config, dir.path(), ScriptedRunner::new())
            .err()
            .unwrap();
        assert!(matches!(err, CliError::ReadFile { .. }));
        assert!(err.to_string().contains("ghost.sh"));
    }
}
