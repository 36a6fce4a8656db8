//! The REPL-facing error type: unifies lex and parse diagnostics so the
//! outer driver can report a failure without string-matching on which
//! pipeline stage produced it.

use std::fmt;

use crate::lexer::LexError;
use crate::parser::ParseError;

/// Error type for the thin REPL/file-loading driver, separating failures
/// by pipeline stage.
///
/// Runtime errors are deliberately absent here: they surface as a
/// `Value::Poison` carried through ordinary evaluation rather than as a
/// `Result`, per the core evaluator's design.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplError {
    /// One or more lexical errors were raised while scanning the source.
    Lex(Vec<LexError>),
    /// One or more syntax errors were raised while parsing the token stream.
    Parse(Vec<ParseError>),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(errors) => {
                writeln!(f, "lex error(s):")?;
                for e in errors {
                    writeln!(f, "  {e}")?;
                }
                Ok(())
            }
            Self::Parse(errors) => {
                writeln!(f, "parse error(s):")?;
                for e in errors {
                    writeln!(f, "  {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ReplError {}

impl From<Vec<LexError>> for ReplError {
    fn from(errors: Vec<LexError>) -> Self {
        Self::Lex(errors)
    }
}

impl From<Vec<ParseError>> for ReplError {
    fn from(errors: Vec<ParseError>) -> Self {
        Self::Parse(errors)
    }
}
