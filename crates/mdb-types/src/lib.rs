//! Value types shared by the metaprogram debugger: what appears in the
//! instantiation graph (nodes, locations, event kinds), what is handed to
//! the display layer (frames, call graph nodes, evaluation results), and
//! the replayable form of the instrumentation event stream.
//!
//! Nothing in here has behavior beyond construction, comparison and
//! display. The graph itself lives in `mdb-graph`.

use facet::Facet;
use std::error::Error;
use std::fmt;

mod event;
mod frame;
mod location;
mod node;
mod result;
mod trace_event;

pub use event::{EventCategory, EventKind};
pub use frame::{CallGraphNode, Frame};
pub use location::FileLocation;
pub use node::{
    CppCode, Directive, IncludeArgument, IncludeKind, MetaprogramNode, Token, TokenCategory, Type,
};
pub use result::EvaluationResult;
pub use trace_event::TraceEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    IndexOutOfRange {
        field: &'static str,
        max: usize,
        got: usize,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { field, max, got } => {
                write!(f, "{field} must be <= {max}, got {got}")
            }
        }
    }
}

impl Error for InvariantError {}

pub const INDEX_MAX: usize = u32::MAX as usize;

macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident,
        field = $field:literal
    ) => {
        #[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[facet(transparent)]
        $(#[$meta])*
        pub struct $name(u32);

        impl $name {
            /// Handle of the first arena slot.
            pub const FIRST: Self = Self(0);

            /// Handle for the arena slot at `index`.
            pub fn from_index(index: usize) -> Result<Self, InvariantError> {
                u32::try_from(index)
                    .map(Self)
                    .map_err(|_| InvariantError::IndexOutOfRange {
                        field: $field,
                        max: INDEX_MAX,
                        got: index,
                    })
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $field, self.0)
            }
        }
    };
}

define_index!(
    /// Arena handle of a deduplicated graph vertex.
    VertexId,
    field = "vertex"
);
define_index!(
    /// Arena handle of one activation edge.
    EdgeId,
    field = "edge"
);

/// How the graph store wants to be walked.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum Mode {
    /// Collapse vertices already shown once during a traversal.
    #[default]
    Normal,
    /// Re-expand every occurrence of a vertex.
    Full,
    /// Collapsing, with siblings ordered by time taken.
    Profile,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Full => "full",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "full" => Ok(Self::Full),
            "profile" => Ok(Self::Profile),
            other => Err(format!("unknown mode `{other}` (expected normal, full or profile)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_handles_round_trip_through_usize() {
        let id = EdgeId::from_index(42).expect("small index must work");
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "edge#42");
    }

    #[test]
    fn index_handles_reject_indices_past_u32() {
        let err = VertexId::from_index(INDEX_MAX + 1).expect_err("index must fit u32");
        assert!(matches!(
            err,
            InvariantError::IndexOutOfRange { field: "vertex", max: INDEX_MAX, got } if got == INDEX_MAX + 1
        ));
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("FULL".parse::<Mode>(), Ok(Mode::Full));
        assert_eq!(" profile ".parse::<Mode>(), Ok(Mode::Profile));
        assert!("fast".parse::<Mode>().is_err());
    }
}
