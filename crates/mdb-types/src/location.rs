use facet::Facet;
use std::fmt;

/// A position in a source file.
///
/// Used both as the point of an event (where in the expansion sequence
/// something happened) and as the source location of a construct (where it
/// is written). The two differ when, for example, a macro body expands code
/// written elsewhere.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileLocation {
    pub path: String,
    pub line: u32,
    pub column: u32,
}

impl FileLocation {
    pub fn new(path: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }

    /// True for the placeholder produced by `Default`.
    pub fn is_unknown(&self) -> bool {
        self.path.is_empty() && self.line == 0 && self.column == 0
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("<unknown location>");
        }
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}
