use std::error::Error;
use std::fmt;

use mdb_types::{EventKind, InvariantError};

/// Family of activations an end or payload event expects to find open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Any open activation.
    Any,
    Template,
    MacroExpansion,
    Include,
    PreprocessingCondition,
}

impl Activation {
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            Self::Any => kind.is_activation(),
            Self::Template => kind.is_template(),
            Self::MacroExpansion => kind == EventKind::MacroExpansion,
            Self::Include => kind.is_include(),
            Self::PreprocessingCondition => kind == EventKind::PreprocessingCondition,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any activation",
            Self::Template => "template instantiation",
            Self::MacroExpansion => "macro expansion",
            Self::Include => "include",
            Self::PreprocessingCondition => "preprocessing condition",
        })
    }
}

/// The event stream does not describe a well-nested trace.
///
/// Fatal to the build: once returned, the builder rejects every further
/// event with [`MalformedTraceError::Aborted`] and its graph must not be
/// traversed.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedTraceError {
    /// End event with no open activation.
    UnmatchedEnd { expected: Activation },
    /// The open activation is not the one the event belongs to. `found`
    /// is `None` when nothing is open.
    KindMismatch {
        expected: Activation,
        found: Option<EventKind>,
    },
    /// Begin event carrying a kind that cannot open that activation.
    InvalidBeginKind { kind: EventKind },
    /// Evaluation ended while activations were still open.
    UnclosedActivations { open: usize },
    ResultAlreadySet,
    /// Event received after `evaluation_end`.
    AlreadyFinished { event: &'static str },
    /// A previous event already failed the build.
    Aborted,
    ArenaFull(InvariantError),
}

impl fmt::Display for MalformedTraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedEnd { expected } => {
                write!(f, "end of {expected} without a matching begin")
            }
            Self::KindMismatch {
                expected,
                found: Some(found),
            } => write!(f, "expected an open {expected}, found {found}"),
            Self::KindMismatch {
                expected,
                found: None,
            } => write!(f, "expected an open {expected}, found no open activation"),
            Self::InvalidBeginKind { kind } => {
                write!(f, "{kind} cannot begin this activation")
            }
            Self::UnclosedActivations { open } => {
                write!(f, "evaluation ended with {open} open activation(s)")
            }
            Self::ResultAlreadySet => f.write_str("evaluation result is already set"),
            Self::AlreadyFinished { event } => {
                write!(f, "{event} received after the evaluation ended")
            }
            Self::Aborted => f.write_str("trace was already rejected by an earlier event"),
            Self::ArenaFull(err) => write!(f, "graph arena is full: {err}"),
        }
    }
}

impl Error for MalformedTraceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ArenaFull(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvariantError> for MalformedTraceError {
    fn from(err: InvariantError) -> Self {
        Self::ArenaFull(err)
    }
}
