use facet::Facet;
use std::fmt;

use crate::{CppCode, Type};

/// Final outcome of evaluating the traced expression.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum EvaluationResult {
    /// The expression resolved to a type.
    Type(Type),
    /// Preprocessing produced code.
    Code(CppCode),
    /// The compiler reported an error.
    Error(String),
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => write!(f, "{ty}"),
            Self::Code(code) => write!(f, "{code}"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}
