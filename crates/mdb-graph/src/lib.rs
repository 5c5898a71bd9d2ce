//! The instantiation graph of a C++ metaprogram and the ways to walk it.
//!
//! [`MetaprogramBuilder`] consumes the compiler's instrumentation events
//! (template instantiation, macro expansion, includes, preprocessor
//! conditions, ...) and folds them into a [`Metaprogram`]: one vertex per
//! distinct `(node, source location)`, one edge per activation. Once the
//! evaluation ended, the store is read-only and can be shared freely:
//! [`ForwardTraceIterator`] produces depth-first call trees from any
//! activation and [`TraceCursor`] drives step-by-step debugging sessions.

mod builder;
mod config;
mod cursor;
mod error;
mod filter;
mod forward_trace;
mod metaprogram;

#[cfg(test)]
mod tests;

pub use builder::MetaprogramBuilder;
pub use config::{
    ConfigError, MAX_DEPTH_ENV, MODE_ENV, MdbConfig, PREPROCESSOR_MODE_ENV, TRACE_CAPACITY_ENV,
};
pub use cursor::TraceCursor;
pub use error::{Activation, MalformedTraceError};
pub use filter::{AllEdges, EdgeFilter, EventCategoryFilter};
pub use forward_trace::ForwardTraceIterator;
pub use metaprogram::{Annotation, Edge, Metaprogram, Vertex};
