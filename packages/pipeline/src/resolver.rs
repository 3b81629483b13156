//! Right-to-left pipeline resolution.
//!
//! Segments are evaluated from the right-most to the left-most. Each
//! segment's output becomes the input of the segment to its left, and the
//! left-most output is the result:
//!
//! | Segment | Output |
//! |---------|--------|
//! | parameter | its literal |
//! | literal CID | the stored content (chained input is an error) |
//! | server / executable CID | standard output of the program |
//!
//! An executable segment directly followed by a parameter receives that
//! literal as its first argument. Its standard input is whatever flowed
//! into the parameter, or the literal itself when nothing did.

use std::sync::Arc;

use bytes::Bytes;

use cidchain_exec::{CancelToken, CommandRunner, Dispatcher, Language, ProcessRunner, Target};
use cidchain_store::{Cid, ContentStore, Format, EMBED_LIMIT};

use crate::debug::{render_output, PipelineTrace, ResolutionType, TraceEntry};
use crate::error::{PipelineError, Result};
use crate::segment::{classify, parse_segments};
use crate::{Request, Response, Segment, ServerRegistry};

/// Whether resolution stops at the first error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Abort on the first error and materialize the result.
    Normal,
    /// Record every error, keep going, never write to the store.
    Debug,
}

/// The result of a successful resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Small enough to return directly.
    Inline { body: Bytes, format: Format },
    /// Stored; the caller should be sent to the CID.
    Stored { cid: Cid },
}

/// Everything one resolution produced.
#[derive(Debug)]
pub struct Resolution {
    pub mode: Mode,
    pub trace: PipelineTrace,
    pub result: Result<Output>,
}

/// Input handed to one step of the fold.
struct Step<'a> {
    index: usize,
    chain_len: usize,
    /// Output of the segment to the right.
    input: Option<&'a Bytes>,
    /// Literal of an adjacent parameter to the right.
    bound: Option<&'a str>,
    /// What flowed into that parameter.
    bound_input: Option<&'a Bytes>,
}

/// Resolves request paths against a registry, a store and a dispatcher.
///
/// A resolver is shared by all requests; each call to
/// [`resolve_segments`](Self::resolve_segments) is independent.
pub struct Resolver<R = CommandRunner> {
    registry: Arc<dyn ServerRegistry>,
    dispatcher: Dispatcher<R>,
}

impl<R: ProcessRunner> Resolver<R> {
    pub fn new(registry: Arc<dyn ServerRegistry>, dispatcher: Dispatcher<R>) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &dyn ServerRegistry {
        self.registry.as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        self.dispatcher.store()
    }

    /// Classify one decoded token.
    pub fn classify(&self, token: &str) -> Segment {
        classify(token, self.registry.as_ref())
    }

    /// Split and classify a path.
    pub fn parse(&self, path: &str) -> Vec<Segment> {
        parse_segments(path, self.registry.as_ref())
    }

    /// Resolve `path`, aborting on the first error.
    pub fn resolve(&self, path: &str, cancel: &CancelToken) -> Result<Output> {
        self.resolve_segments(&self.parse(path), Mode::Normal, cancel)
            .result
    }

    /// Resolve `path` in debug mode and return the trace.
    pub fn debug(&self, path: &str, cancel: &CancelToken) -> PipelineTrace {
        self.resolve_segments(&self.parse(path), Mode::Debug, cancel)
            .trace
    }

    /// Resolve a parsed request and project the outcome into a response.
    pub fn handle(&self, request: &Request, cancel: &CancelToken) -> Response {
        let segments: Vec<Segment> = request.tokens.iter().map(|t| self.classify(t)).collect();
        let mode = if request.debug {
            Mode::Debug
        } else {
            Mode::Normal
        };
        Response::from_resolution(self.resolve_segments(&segments, mode, cancel))
    }

    /// Fold `segments` from right to left.
    pub fn resolve_segments(
        &self,
        segments: &[Segment],
        mode: Mode,
        cancel: &CancelToken,
    ) -> Resolution {
        let mut trace = PipelineTrace::default();

        if segments.is_empty() {
            return Resolution {
                mode,
                trace,
                result: Err(PipelineError::EmptyPipeline),
            };
        }

        if mode == Mode::Normal {
            if let Some(name) = self.terminal_in_chain(segments) {
                tracing::debug!(server = %name, "terminal server in chain");
                return Resolution {
                    mode,
                    trace,
                    result: Err(PipelineError::ChainRejected { name }),
                };
            }
        }

        let mut current: Option<Bytes> = None;
        let mut previous_input: Option<Bytes> = None;
        let mut first_error: Option<PipelineError> = None;
        let mut served_literal = false;

        for (index, segment) in segments.iter().enumerate().rev() {
            if cancel.is_cancelled() {
                first_error = Some(PipelineError::Cancelled);
                break;
            }

            let input = current.take();
            let mut entry = TraceEntry::new(index, segment, input.is_some());
            let bound = match segments.get(index + 1) {
                Some(Segment::Parameter { literal }) => Some(literal.as_str()),
                _ => None,
            };

            tracing::debug!(
                index,
                segment = %segment,
                kind = segment.type_name(),
                "resolving segment"
            );

            let step = Step {
                index,
                chain_len: segments.len(),
                input: input.as_ref(),
                bound,
                bound_input: previous_input.as_ref(),
            };

            match self.step(segment, &step, &mut entry, cancel) {
                Ok(output) => {
                    served_literal = index == 0
                        && matches!(segment, Segment::CidRef { .. })
                        && entry.resolution_type == ResolutionType::Literal;
                    entry.intermediate_output = render_output(&output);
                    current = Some(output);
                    trace.segments.push(entry);
                }
                Err(error) => {
                    tracing::debug!(index, %error, "segment failed");
                    entry.errors.push(error.to_string());
                    trace.segments.push(entry);

                    let stop = mode == Mode::Normal || matches!(error, PipelineError::Cancelled);
                    first_error.get_or_insert(error);
                    if stop {
                        break;
                    }
                }
            }

            previous_input = input;
        }

        trace.segments.reverse();
        trace.final_output = current.as_ref().map(render_output).unwrap_or_default();
        trace.success = first_error.is_none();

        let result = match (first_error, current) {
            (Some(error), _) => Err(error),
            (None, Some(output)) => {
                self.finish(output, &segments[0], mode, served_literal, cancel)
            }
            (None, None) => Err(PipelineError::EmptyPipeline),
        };

        tracing::debug!(
            segments = segments.len(),
            ?mode,
            success = result.is_ok(),
            "pipeline resolved"
        );

        Resolution {
            mode,
            trace,
            result,
        }
    }

    fn terminal_in_chain(&self, segments: &[Segment]) -> Option<String> {
        if segments.len() < 2 {
            return None;
        }
        segments.iter().find_map(|segment| match segment {
            Segment::ServerRef { name } => self
                .registry
                .lookup(name)
                .filter(|definition| !definition.usable_in_chain)
                .map(|_| name.clone()),
            _ => None,
        })
    }

    fn step(
        &self,
        segment: &Segment,
        step: &Step<'_>,
        entry: &mut TraceEntry,
        cancel: &CancelToken,
    ) -> Result<Bytes> {
        match segment {
            Segment::Parameter { literal } => Ok(Bytes::copy_from_slice(literal.as_bytes())),

            Segment::ServerRef { name } => {
                let definition = self
                    .registry
                    .lookup(name)
                    .ok_or_else(|| PipelineError::UnknownServer { name: name.clone() })?;

                entry.resolution_type = ResolutionType::Execution;
                entry.implementation_language = Some(definition.language);
                entry.supports_chaining = definition.supports_chaining;

                if !definition.usable_in_chain && step.chain_len > 1 {
                    return Err(PipelineError::ChainRejected { name: name.clone() });
                }

                let chained = if step.bound.is_some() {
                    step.bound_input
                } else {
                    step.input
                };
                if !definition.supports_chaining && chained.is_some() {
                    return Err(PipelineError::ChainMisuse {
                        index: step.index,
                        message: format!("server '{}' does not accept chained input", name),
                    });
                }

                self.execute(&definition.target(), step, cancel)
            }

            Segment::CidRef { cid, extension } => {
                match self.executable_language(cid, extension.as_deref(), step.index)? {
                    Some(language) => {
                        entry.resolution_type = ResolutionType::Execution;
                        entry.implementation_language = Some(language);
                        entry.supports_chaining = true;
                        self.execute(&Target::cid(cid.clone(), language), step, cancel)
                    }
                    None => {
                        if step.input.is_some() {
                            return Err(PipelineError::ChainMisuse {
                                index: step.index,
                                message: format!(
                                    "content {} is not executable and cannot accept chained input",
                                    cid
                                ),
                            });
                        }
                        self.store().get(cid).map_err(PipelineError::store)
                    }
                }
            }
        }
    }

    /// The language to run a CID in, or `None` for a literal.
    fn executable_language(
        &self,
        cid: &Cid,
        extension: Option<&str>,
        index: usize,
    ) -> Result<Option<Language>> {
        match extension {
            Some(extension) => Ok(Language::from_extension(extension)),
            None => self
                .dispatcher
                .detect(cid)
                .map_err(|e| PipelineError::execution(index, e)),
        }
    }

    fn execute(&self, target: &Target, step: &Step<'_>, cancel: &CancelToken) -> Result<Bytes> {
        let stdin = match step.bound {
            Some(literal) => Some(
                step.bound_input
                    .map(|input| &input[..])
                    .unwrap_or(literal.as_bytes()),
            ),
            None => step.input.map(|input| &input[..]),
        };

        self.dispatcher
            .run(target, stdin, step.bound, cancel)
            .map_err(|e| PipelineError::execution(step.index, e))
    }

    /// Shape the left-most output. Only computed results over the embedding
    /// limit are stored; content read from a literal CID is already
    /// addressable and is served as it is.
    fn finish(
        &self,
        output: Bytes,
        leftmost: &Segment,
        mode: Mode,
        literal: bool,
        cancel: &CancelToken,
    ) -> Result<Output> {
        let format = result_format(leftmost, &output);

        if mode == Mode::Debug || literal || output.len() <= EMBED_LIMIT {
            return Ok(Output::Inline {
                body: output,
                format,
            });
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let cid = self.store().put(&output).map_err(PipelineError::store)?;
        tracing::debug!(%cid, bytes = output.len(), "materialized result");
        Ok(Output::Stored { cid })
    }
}

/// MIME type of an inline result.
fn result_format(leftmost: &Segment, output: &[u8]) -> Format {
    if let Segment::CidRef {
        extension: Some(extension),
        ..
    } = leftmost
    {
        if Language::from_extension(extension).is_none() {
            if let Some(format) = Format::from_extension(extension) {
                return format;
            }
        }
    }
    Format::sniff(output)
}
