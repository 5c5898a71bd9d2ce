use facet::Facet;
use std::fmt;

/// A fragment of C++ source as text.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[facet(transparent)]
pub struct CppCode(String);

impl CppCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CppCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CppCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A fully spelled C++ type, e.g. `fib<10>`.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[facet(transparent)]
pub struct Type(String);

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Type {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum TokenCategory {
    Identifier,
    Keyword,
    Literal,
    Operator,
    Punctuation,
    Whitespace,
    Comment,
    Unknown,
}

/// A preprocessing token.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    pub category: TokenCategory,
    pub value: CppCode,
}

impl Token {
    pub fn new(category: TokenCategory, value: impl Into<String>) -> Self {
        Self {
            category,
            value: CppCode::new(value),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum IncludeKind {
    /// `#include "header"`
    Quote,
    /// `#include <header>`
    Sys,
}

/// The argument of an `#include` directive.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncludeArgument {
    pub kind: IncludeKind,
    pub path: String,
}

impl IncludeArgument {
    pub fn quote(path: impl Into<String>) -> Self {
        Self {
            kind: IncludeKind::Quote,
            path: path.into(),
        }
    }

    pub fn sys(path: impl Into<String>) -> Self {
        Self {
            kind: IncludeKind::Sys,
            path: path.into(),
        }
    }
}

impl fmt::Display for IncludeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IncludeKind::Quote => write!(f, "\"{}\"", self.path),
            IncludeKind::Sys => write!(f, "<{}>", self.path),
        }
    }
}

/// Payload of a preprocessor directive event.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum Directive {
    Define {
        name: CppCode,
        args: Option<Vec<CppCode>>,
        body: CppCode,
    },
    Undefine {
        name: CppCode,
    },
    Error {
        message: String,
    },
    Line {
        arg: CppCode,
    },
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Define { name, args, body } => {
                write!(f, "#define {name}")?;
                if let Some(args) = args {
                    write_args(f, args)?;
                }
                if !body.is_empty() {
                    write!(f, " {body}")?;
                }
                Ok(())
            }
            Self::Undefine { name } => write!(f, "#undef {name}"),
            Self::Error { message } => write!(f, "#error {message}"),
            Self::Line { arg } => write!(f, "#line {arg}"),
        }
    }
}

/// Everything that can be a vertex of the instantiation graph.
///
/// Compared and hashed by value: two activations of the same node at the
/// same source location share one vertex.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum MetaprogramNode {
    /// Template instantiation target.
    Type(Type),
    /// Macro invocation; `args` is `None` for object-like macros.
    Macro {
        name: CppCode,
        args: Option<Vec<CppCode>>,
    },
    /// Raw code: the evaluated expression at the root, a preprocessing
    /// condition, rescanned or expanded code.
    Code(CppCode),
    Token(Token),
    Include(IncludeArgument),
    Directive(Directive),
}

impl fmt::Display for MetaprogramNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => write!(f, "{ty}"),
            Self::Macro { name, args } => {
                write!(f, "{name}")?;
                match args {
                    Some(args) => write_args(f, args),
                    None => Ok(()),
                }
            }
            Self::Code(code) => write!(f, "{code}"),
            Self::Token(token) => write!(f, "{token}"),
            Self::Include(arg) => write!(f, "{arg}"),
            Self::Directive(directive) => write!(f, "{directive}"),
        }
    }
}

impl From<Type> for MetaprogramNode {
    fn from(value: Type) -> Self {
        Self::Type(value)
    }
}

impl From<CppCode> for MetaprogramNode {
    fn from(value: CppCode) -> Self {
        Self::Code(value)
    }
}

impl From<Token> for MetaprogramNode {
    fn from(value: Token) -> Self {
        Self::Token(value)
    }
}

impl From<IncludeArgument> for MetaprogramNode {
    fn from(value: IncludeArgument) -> Self {
        Self::Include(value)
    }
}

impl From<Directive> for MetaprogramNode {
    fn from(value: Directive) -> Self {
        Self::Directive(value)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[CppCode]) -> fmt::Result {
    f.write_str("(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")
}
