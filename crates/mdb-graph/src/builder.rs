//! Replays instrumentation events into a [`Metaprogram`].
//!
//! The builder keeps two pieces of state next to the graph: the stack of
//! open activations (edges whose end event has not arrived yet) and an
//! index from `(node, source location)` to the vertex that represents it.
//! The stack turns the flat, well-nested event stream back into a tree of
//! causes; the index folds repeated activations of the same construct onto
//! one vertex.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use mdb_types::{
    CppCode, Directive, EdgeId, EvaluationResult, EventKind, FileLocation, IncludeArgument,
    IncludeKind, MetaprogramNode, Mode, Token, TraceEvent, Type, VertexId,
};
use tracing::{debug, trace, warn};

use crate::config::MdbConfig;
use crate::error::{Activation, MalformedTraceError};
use crate::metaprogram::{Annotation, Metaprogram};

type VertexKey = (MetaprogramNode, FileLocation);

pub struct MetaprogramBuilder {
    mp: Metaprogram,
    edge_stack: Vec<EdgeId>,
    vertex_index: HashMap<VertexKey, VertexId>,
    failed: bool,
}

impl MetaprogramBuilder {
    pub fn new(mode: Mode, root_name: CppCode, root_source_location: FileLocation) -> Self {
        Self::from_metaprogram(Metaprogram::new(mode, root_name, root_source_location))
    }

    pub fn with_config(
        config: &MdbConfig,
        root_name: CppCode,
        root_source_location: FileLocation,
    ) -> Self {
        let mut builder = Self::from_metaprogram(Metaprogram::with_capacity(
            config.mode,
            root_name,
            root_source_location,
            config.trace_capacity,
        ));
        if builder.vertex_index.try_reserve(config.trace_capacity).is_err() {
            warn!(
                capacity = config.trace_capacity,
                "cannot reserve the vertex index up front"
            );
        }
        builder
    }

    fn from_metaprogram(mp: Metaprogram) -> Self {
        let root = mp.root_vertex();
        let key = (
            mp.vertex(root).node.clone(),
            mp.vertex(root).source_location.clone(),
        );
        Self {
            mp,
            edge_stack: Vec::new(),
            vertex_index: HashMap::from([(key, root)]),
            failed: false,
        }
    }

    /// The graph built so far. Safe to read between events: existing
    /// vertices and edges never change identity, only open edges get an
    /// end timestamp.
    pub fn metaprogram(&self) -> &Metaprogram {
        &self.mp
    }

    /// Number of open activations.
    pub fn depth(&self) -> usize {
        self.edge_stack.len()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Hands over the finished graph.
    pub fn finish(self) -> Result<Metaprogram, MalformedTraceError> {
        if self.failed {
            return Err(MalformedTraceError::Aborted);
        }
        if !self.edge_stack.is_empty() {
            return Err(MalformedTraceError::UnclosedActivations {
                open: self.edge_stack.len(),
            });
        }
        Ok(self.mp)
    }

    /// Records the innermost open activation as the place where evaluation
    /// is paused (a breakpoint the caller decided to stop at).
    pub fn pause(&mut self) {
        debug!(depth = self.edge_stack.len(), "evaluation paused");
        self.mp.set_current_path(self.edge_stack.clone());
    }

    // ── Event dispatch ──────────────────────────────────────

    pub fn handle(&mut self, event: TraceEvent) -> Result<(), MalformedTraceError> {
        match event {
            TraceEvent::BeginTemplate {
                kind,
                ty,
                point_of_event,
                source_location,
                timestamp,
            } => self.handle_template_begin(kind, ty, point_of_event, source_location, timestamp),
            TraceEvent::EndTemplate { timestamp } => self.handle_template_end(timestamp),
            TraceEvent::BeginMacroExpansion {
                name,
                args,
                point_of_event,
                source_location,
                timestamp,
            } => self.handle_macro_expansion_begin(
                name,
                args,
                point_of_event,
                source_location,
                timestamp,
            ),
            TraceEvent::Rescanning { code, timestamp } => self.handle_rescanning(code, timestamp),
            TraceEvent::ExpandedCode {
                code,
                point_of_event,
                timestamp,
            } => self.handle_expanded_code(code, point_of_event, timestamp),
            TraceEvent::EndMacroExpansion { timestamp } => {
                self.handle_macro_expansion_end(timestamp)
            }
            TraceEvent::TokenGenerated {
                token,
                point_of_event,
                source_location,
                timestamp,
            } => self.handle_token_generation(token, point_of_event, source_location, timestamp),
            TraceEvent::TokenSkipped {
                token,
                point_of_event,
                timestamp,
            } => self.handle_token_skipping(token, point_of_event, timestamp),
            TraceEvent::BeginInclude {
                arg,
                point_of_event,
                timestamp,
            } => self.handle_include_begin(arg, point_of_event, timestamp),
            TraceEvent::EndInclude { timestamp } => self.handle_include_end(timestamp),
            TraceEvent::Define {
                name,
                args,
                body,
                point_of_event,
                timestamp,
            } => self.handle_define(name, args, body, point_of_event, timestamp),
            TraceEvent::Undefine {
                name,
                point_of_event,
                timestamp,
            } => self.handle_undefine(name, point_of_event, timestamp),
            TraceEvent::BeginPreprocessingCondition {
                expression,
                point_of_event,
                timestamp,
            } => self.handle_preprocessing_condition_begin(expression, point_of_event, timestamp),
            TraceEvent::EndPreprocessingCondition { result, timestamp } => {
                self.handle_preprocessing_condition_end(result, timestamp)
            }
            TraceEvent::PreprocessingElse {
                point_of_event,
                timestamp,
            } => self.handle_preprocessing_else(point_of_event, timestamp),
            TraceEvent::PreprocessingEndif {
                point_of_event,
                timestamp,
            } => self.handle_preprocessing_endif(point_of_event, timestamp),
            TraceEvent::ErrorDirective {
                message,
                point_of_event,
                timestamp,
            } => self.handle_error_directive(message, point_of_event, timestamp),
            TraceEvent::LineDirective {
                arg,
                point_of_event,
                source_location,
                timestamp,
            } => self.handle_line_directive(arg, point_of_event, source_location, timestamp),
            TraceEvent::EvaluationEnd { result } => self.handle_evaluation_end(result),
        }
    }

    /// Feeds a whole event stream, stopping at the first malformed event.
    pub fn replay<I>(&mut self, events: I) -> Result<(), MalformedTraceError>
    where
        I: IntoIterator<Item = TraceEvent>,
    {
        for (index, event) in events.into_iter().enumerate() {
            let name = event.name();
            if let Err(err) = self.handle(event) {
                debug!(index, event = name, "replay stopped at a malformed event");
                return Err(err);
            }
        }
        Ok(())
    }

    // ── Activations ─────────────────────────────────────────

    pub fn handle_template_begin(
        &mut self,
        kind: EventKind,
        ty: Type,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("begin_template", |this| {
            if !kind.is_template() {
                return Err(MalformedTraceError::InvalidBeginKind { kind });
            }
            this.begin(kind, ty.into(), point_of_event, source_location, timestamp)
        })
    }

    pub fn handle_template_end(&mut self, timestamp: f64) -> Result<(), MalformedTraceError> {
        self.run("end_template", |this| {
            this.end(Activation::Template, timestamp).map(drop)
        })
    }

    pub fn handle_macro_expansion_begin(
        &mut self,
        name: CppCode,
        args: Option<Vec<CppCode>>,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("begin_macro_expansion", |this| {
            this.begin(
                EventKind::MacroExpansion,
                MetaprogramNode::Macro { name, args },
                point_of_event,
                source_location,
                timestamp,
            )
        })
    }

    pub fn handle_macro_expansion_end(
        &mut self,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("end_macro_expansion", |this| {
            this.end(Activation::MacroExpansion, timestamp).map(drop)
        })
    }

    pub fn handle_include_begin(
        &mut self,
        arg: IncludeArgument,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("begin_include", |this| {
            let kind = match arg.kind {
                IncludeKind::Quote => EventKind::QuoteInclude,
                IncludeKind::Sys => EventKind::SysInclude,
            };
            let source_location = point_of_event.clone();
            this.begin(kind, arg.into(), point_of_event, source_location, timestamp)
        })
    }

    pub fn handle_include_end(&mut self, timestamp: f64) -> Result<(), MalformedTraceError> {
        self.run("end_include", |this| {
            this.end(Activation::Include, timestamp).map(drop)
        })
    }

    pub fn handle_preprocessing_condition_begin(
        &mut self,
        expression: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("begin_preprocessing_condition", |this| {
            let source_location = point_of_event.clone();
            this.begin(
                EventKind::PreprocessingCondition,
                expression.into(),
                point_of_event,
                source_location,
                timestamp,
            )
        })
    }

    pub fn handle_preprocessing_condition_end(
        &mut self,
        result: bool,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("end_preprocessing_condition", |this| {
            let edge = this.end(Activation::PreprocessingCondition, timestamp)?;
            let point_of_event = this.mp.edge(edge).point_of_event.clone();
            this.mp.annotate(
                Some(edge),
                Annotation {
                    kind: EventKind::PreprocessingConditionResult,
                    node: MetaprogramNode::Code(CppCode::new(if result { "true" } else { "false" })),
                    point_of_event,
                    source_location: None,
                    timestamp,
                },
            );
            Ok(())
        })
    }

    /// Generic begin event for any activation kind.
    pub fn handle_begin(
        &mut self,
        kind: EventKind,
        node: MetaprogramNode,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("begin", |this| {
            if !kind.is_activation() {
                return Err(MalformedTraceError::InvalidBeginKind { kind });
            }
            this.begin(kind, node, point_of_event, source_location, timestamp)
        })
    }

    /// Generic end event: closes whatever activation is open.
    pub fn handle_end(&mut self, timestamp: f64) -> Result<(), MalformedTraceError> {
        self.run("end", |this| this.end(Activation::Any, timestamp).map(drop))
    }

    // ── Payload of the open macro expansion ─────────────────

    pub fn handle_rescanning(
        &mut self,
        code: CppCode,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("rescanning", |this| {
            let edge = this.open_macro_expansion()?;
            let point_of_event = this.mp.edge(edge).point_of_event.clone();
            this.mp.annotate(
                Some(edge),
                Annotation {
                    kind: EventKind::Rescanning,
                    node: code.into(),
                    point_of_event,
                    source_location: None,
                    timestamp,
                },
            );
            Ok(())
        })
    }

    pub fn handle_expanded_code(
        &mut self,
        code: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("expanded_code", |this| {
            let edge = this.open_macro_expansion()?;
            this.mp.annotate(
                Some(edge),
                Annotation {
                    kind: EventKind::ExpandedCode,
                    node: code.into(),
                    point_of_event,
                    source_location: None,
                    timestamp,
                },
            );
            Ok(())
        })
    }

    // ── Point events ────────────────────────────────────────

    pub fn handle_token_generation(
        &mut self,
        token: Token,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("token_generated", |this| {
            this.annotate(
                EventKind::GeneratedToken,
                token.into(),
                point_of_event,
                Some(source_location),
                timestamp,
            )
        })
    }

    pub fn handle_token_skipping(
        &mut self,
        token: Token,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("token_skipped", |this| {
            this.annotate(EventKind::SkippedToken, token.into(), point_of_event, None, timestamp)
        })
    }

    pub fn handle_define(
        &mut self,
        name: CppCode,
        args: Option<Vec<CppCode>>,
        body: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("define", |this| {
            this.annotate(
                EventKind::MacroDefinition,
                Directive::Define { name, args, body }.into(),
                point_of_event,
                None,
                timestamp,
            )
        })
    }

    pub fn handle_undefine(
        &mut self,
        name: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("undefine", |this| {
            this.annotate(
                EventKind::MacroDeletion,
                Directive::Undefine { name }.into(),
                point_of_event,
                None,
                timestamp,
            )
        })
    }

    pub fn handle_preprocessing_else(
        &mut self,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("preprocessing_else", |this| {
            this.annotate(
                EventKind::PreprocessingElse,
                CppCode::new("#else").into(),
                point_of_event,
                None,
                timestamp,
            )
        })
    }

    pub fn handle_preprocessing_endif(
        &mut self,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("preprocessing_endif", |this| {
            this.annotate(
                EventKind::PreprocessingEndif,
                CppCode::new("#endif").into(),
                point_of_event,
                None,
                timestamp,
            )
        })
    }

    pub fn handle_error_directive(
        &mut self,
        message: String,
        point_of_event: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("error_directive", |this| {
            this.annotate(
                EventKind::ErrorDirective,
                Directive::Error { message }.into(),
                point_of_event,
                None,
                timestamp,
            )
        })
    }

    pub fn handle_line_directive(
        &mut self,
        arg: CppCode,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        self.run("line_directive", |this| {
            this.annotate(
                EventKind::LineDirective,
                Directive::Line { arg }.into(),
                point_of_event,
                Some(source_location),
                timestamp,
            )
        })
    }

    // ── End of evaluation ───────────────────────────────────

    pub fn handle_evaluation_end(
        &mut self,
        result: EvaluationResult,
    ) -> Result<(), MalformedTraceError> {
        if self.failed {
            return Err(MalformedTraceError::Aborted);
        }
        let outcome = if self.mp.is_finished() {
            Err(MalformedTraceError::ResultAlreadySet)
        } else if !self.edge_stack.is_empty() {
            Err(MalformedTraceError::UnclosedActivations {
                open: self.edge_stack.len(),
            })
        } else {
            debug!(
                vertices = self.mp.vertex_count(),
                edges = self.mp.edge_count(),
                %result,
                "evaluation finished"
            );
            self.mp.set_current_path(Vec::new());
            self.mp.set_result(result);
            Ok(())
        };
        self.record("evaluation_end", outcome)
    }

    // ── Internals ───────────────────────────────────────────

    /// Runs one event handler. Refuses to run after a failure or after the
    /// evaluation ended, and poisons the builder when the handler fails.
    fn run<F>(&mut self, event: &'static str, handler: F) -> Result<(), MalformedTraceError>
    where
        F: FnOnce(&mut Self) -> Result<(), MalformedTraceError>,
    {
        if self.failed {
            return Err(MalformedTraceError::Aborted);
        }
        let outcome = if self.mp.is_finished() {
            Err(MalformedTraceError::AlreadyFinished { event })
        } else {
            trace!(event, depth = self.edge_stack.len(), "trace event");
            handler(self)
        };
        self.record(event, outcome)
    }

    fn record(
        &mut self,
        event: &'static str,
        outcome: Result<(), MalformedTraceError>,
    ) -> Result<(), MalformedTraceError> {
        if let Err(err) = &outcome {
            self.failed = true;
            warn!(event, %err, depth = self.edge_stack.len(), "rejecting malformed trace");
        }
        outcome
    }

    fn top_vertex(&self) -> VertexId {
        self.mp.vertex_of(self.edge_stack.last().copied())
    }

    fn vertex_for(
        &mut self,
        node: MetaprogramNode,
        source_location: FileLocation,
    ) -> Result<VertexId, MalformedTraceError> {
        match self.vertex_index.entry((node, source_location)) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let (node, source_location) = entry.key().clone();
                let vertex = self.mp.add_vertex(node, source_location)?;
                entry.insert(vertex);
                Ok(vertex)
            }
        }
    }

    fn begin(
        &mut self,
        kind: EventKind,
        node: MetaprogramNode,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        let source = self.top_vertex();
        let target = self.vertex_for(node, source_location)?;
        let edge = self
            .mp
            .add_edge(source, target, kind, point_of_event, timestamp)?;
        self.edge_stack.push(edge);
        Ok(())
    }

    /// Closes the innermost activation. Checks before mutating, so a
    /// rejected end leaves the graph untouched.
    fn end(
        &mut self,
        expected: Activation,
        timestamp: f64,
    ) -> Result<EdgeId, MalformedTraceError> {
        let Some(&edge) = self.edge_stack.last() else {
            return Err(MalformedTraceError::UnmatchedEnd { expected });
        };
        let found = self.mp.edge(edge).kind;
        if !expected.matches(found) {
            return Err(MalformedTraceError::KindMismatch {
                expected,
                found: Some(found),
            });
        }
        self.edge_stack.pop();
        self.mp.close_edge(edge, timestamp);
        Ok(edge)
    }

    fn open_macro_expansion(&self) -> Result<EdgeId, MalformedTraceError> {
        let top = self.edge_stack.last().copied();
        match top {
            Some(edge) if self.mp.edge(edge).kind == EventKind::MacroExpansion => Ok(edge),
            _ => Err(MalformedTraceError::KindMismatch {
                expected: Activation::MacroExpansion,
                found: top.map(|edge| self.mp.edge(edge).kind),
            }),
        }
    }

    fn annotate(
        &mut self,
        kind: EventKind,
        node: MetaprogramNode,
        point_of_event: FileLocation,
        source_location: Option<FileLocation>,
        timestamp: f64,
    ) -> Result<(), MalformedTraceError> {
        let edge = self.edge_stack.last().copied();
        self.mp.annotate(
            edge,
            Annotation {
                kind,
                node,
                point_of_event,
                source_location,
                timestamp,
            },
        );
        Ok(())
    }
}
