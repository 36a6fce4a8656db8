//! Source positions: `{file, line, column}` triples attached to every token
//! and AST node, and used to build traceback frame descriptions.

use std::fmt;

/// A position within a named source file.
///
/// Immutable and cheap to copy; every token and every AST node carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SourcePos {
    pub file: &'static str,
    pub line: u32,
    pub column: u32,
}

/// Manual `Deserialize` impl: the derive would require `'de: 'static` (the
/// `file` field borrows nothing and must outlive everything), which isn't
/// expressible on a struct with no lifetime parameter of its own. Leaking
/// the deserialized file name into a `&'static str` sidesteps that.
impl<'de> serde::Deserialize<'de> for SourcePos {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct SourcePosOwned {
            file: String,
            line: u32,
            column: u32,
        }
        let owned = SourcePosOwned::deserialize(deserializer)?;
        Ok(Self { file: Box::leak(owned.file.into_boxed_str()), line: owned.line, column: owned.column })
    }
}

impl SourcePos {
    pub const fn new(file: &'static str, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// The position a fresh lexer starts at: line 1, column 1.
    pub const fn start(file: &'static str) -> Self {
        Self::new(file, 1, 1)
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(file: {}, line: {}, col: {})", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_traceback_format() {
        let pos = SourcePos::new("<repl>", 3, 7);
        assert_eq!(pos.to_string(), "(file: <repl>, line: 3, col: 7)");
    }
}
