//! Backend of an interactive debugger for C++ template metaprograms.
//!
//! An instrumented compiler reports what it does while evaluating an
//! expression: every template instantiation, macro expansion, include and
//! preprocessor condition opens and closes an activation, and point events
//! (generated tokens, `#define`, `#error`, ...) happen inside them. mdb
//! folds that stream into an instantiation graph, one vertex per distinct
//! construct and one edge per activation, and walks the graph for display:
//! call trees, backtraces, step-by-step sessions.
//!
//! # Building a graph
//!
//! ```
//! use mdb::{
//!     AllEdges, CppCode, EvaluationResult, FileLocation, ForwardTraceIterator,
//!     MetaprogramBuilder, Mode, TraceEvent, Type,
//! };
//!
//! let here = FileLocation::new("main.cpp", 3, 1);
//! let mut builder =
//!     MetaprogramBuilder::new(Mode::Normal, CppCode::new("fib<2>::value"), here.clone());
//! builder.replay([
//!     TraceEvent::begin_template("fib<2>", here.clone(), here.clone(), 0.0),
//!     TraceEvent::begin_template("fib<1>", here.clone(), here.clone(), 0.1),
//!     TraceEvent::end_template(0.2),
//!     TraceEvent::end_template(0.3),
//!     TraceEvent::EvaluationEnd {
//!         result: EvaluationResult::Type(Type::new("int_<1>")),
//!     },
//! ])?;
//! let mp = builder.finish()?;
//!
//! for node in ForwardTraceIterator::new(&mp, None, None, &AllEdges) {
//!     println!("{}{}", "  ".repeat(node.depth), node.frame);
//! }
//! # Ok::<(), mdb::MalformedTraceError>(())
//! ```
//!
//! The finished [`Metaprogram`] is immutable; iterators and cursors only
//! borrow it, so several of them can walk one graph concurrently.
//!
//! # Configuration
//!
//! [`MdbConfig::from_env`] reads:
//!
//! | Variable | Default | Effect |
//! |----------|---------|--------|
//! | `MDB_MODE` | `normal` | `normal`, `full` or `profile` |
//! | `MDB_MAX_DEPTH` | unbounded | default depth bound of forward traces |
//! | `MDB_TRACE_CAPACITY` | `1024` | vertices/edges reserved up front |
//! | `MDB_PREPROCESSOR_MODE` | `false` | show preprocessor activations instead of templates |
//!
//! # Logging
//!
//! Everything is logged through `tracing`; no subscriber is installed.

pub use mdb_graph::*;
pub use mdb_types::*;
