//! # cidchain-cli
//!
//! The `cidchain` command-line front end.
//!
//! ```bash
//! # Store content and print its CID
//! echo hello | cidchain put -
//!
//! # Resolve a pipeline against servers declared in the config
//! cidchain --config cidchain.json resolve /shout/echo/hello
//!
//! # Show the per-segment trace instead of the result
//! cidchain resolve '/shout/echo/hello?debug=1'
//! ```
//!
//! Logging goes to stderr and is controlled by `CIDCHAIN_LOG` (or
//! `RUST_LOG`), e.g. `CIDCHAIN_LOG=cidchain_pipeline=debug`.

pub mod commands;
pub mod config;
pub mod context;
mod error;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use cidchain_exec::CancelToken;

pub use config::{Config, ConfigError, LoadedConfig};
pub use context::Context;
pub use error::{CliError, Result};

/// Resolve and run content-addressed pipelines
#[derive(Parser, Debug)]
#[command(name = "cidchain")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $CIDCHAIN_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Per-execution timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log at debug level unless CIDCHAIN_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Store a file (or `-` for stdin) and print its CID
    Put { file: PathBuf },
    /// Print the content of a CID
    Get { cid: String },
    /// Show how a path token is classified
    Classify { token: String },
    /// Resolve a request path such as `/echo/hello?debug=1`
    Resolve { path: String },
    /// List configured servers
    Servers,
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let mut loaded = Config::load(cli.config.as_deref())?;
    let env_timeout = std::env::var(config::TIMEOUT_ENV).ok();
    loaded.config.timeout_ms = config::effective_timeout_ms(
        loaded.config.timeout_ms,
        env_timeout.as_deref(),
        cli.timeout_ms,
    )?;

    let ctx = Context::from_config(&loaded)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Put { file } => {
            let content = read_input(&file)?;
            commands::put(&ctx, &content, &mut out)?;
        }
        Command::Get { cid } => commands::get(&ctx, &cid, &mut out)?,
        Command::Classify { token } => commands::classify(&ctx, &token, &mut out)?,
        Command::Resolve { path } => {
            commands::resolve(&ctx, &path, &CancelToken::new(), &mut out)?
        }
        Command::Servers => commands::servers(&ctx, &mut out)?,
    }

    out.flush()?;
    Ok(())
}

fn read_input(file: &Path) -> Result<Vec<u8>> {
    if file.as_os_str() == "-" {
        let mut content = Vec::new();
        io::stdin().read_to_end(&mut content)?;
        return Ok(content);
    }
    std::fs::read(file).map_err(|source| CliError::ReadFile {
        path: file.to_path_buf(),
        source,
    })
}
