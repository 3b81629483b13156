//! Subcommand implementations.
//!
//! Each command writes its result to `out` so it can be exercised without
//! a terminal.

use std::io::Write;

use cidchain_exec::{CancelToken, ProcessRunner};
use cidchain_pipeline::{Request, Response};
use cidchain_store::{Cid, ContentStore};

use crate::context::Context;
use crate::error::{CliError, Result};

/// `cidchain put`: store content and print its CID.
pub fn put<R: ProcessRunner>(ctx: &Context<R>, content: &[u8], out: &mut dyn Write) -> Result<()> {
    let cid = ctx.put(content)?;
    writeln!(out, "{}", cid)?;
    Ok(())
}

/// `cidchain get`: write the content of a CID (an extension is ignored).
pub fn get<R: ProcessRunner>(ctx: &Context<R>, token: &str, out: &mut dyn Write) -> Result<()> {
    let (cid, _) = Cid::parse_with_extension(token.trim_start_matches('/'))?;
    let content = ctx.store.get(&cid)?;
    out.write_all(&content)?;
    Ok(())
}

/// `cidchain classify`: print how a token would be classified.
pub fn classify<R: ProcessRunner>(
    ctx: &Context<R>,
    token: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let segment = ctx.resolver.classify(token);
    writeln!(out, "{}", serde_json::to_string_pretty(&segment)?)?;
    Ok(())
}

/// `cidchain servers`: list registered servers.
pub fn servers<R: ProcessRunner>(ctx: &Context<R>, out: &mut dyn Write) -> Result<()> {
    for server in ctx.registry.iter() {
        let mut flags = Vec::new();
        if !server.supports_chaining {
            flags.push("no-chaining");
        }
        if !server.usable_in_chain {
            flags.push("terminal");
        }
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            server.name,
            server.language,
            server.source,
            flags.join(",")
        )?;
    }
    Ok(())
}

/// `cidchain resolve`: resolve a request target.
///
/// Inline results are written as-is, redirects print the location, and
/// debug requests print the trace as JSON.
pub fn resolve<R: ProcessRunner>(
    ctx: &Context<R>,
    target: &str,
    cancel: &CancelToken,
    out: &mut dyn Write,
) -> Result<()> {
    let request = Request::parse(target);
    match ctx.resolver.handle(&request, cancel) {
        Response::Content { body, .. } => out.write_all(&body)?,
        Response::Redirect { location, .. } => writeln!(out, "{}", location)?,
        Response::Debug { body, .. } => {
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?
        }
        Response::Error { kind, message, .. } => {
            return Err(CliError::Resolution { kind, message });
        }
    }
    Ok(())
}
