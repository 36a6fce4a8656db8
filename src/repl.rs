//! A thin session wrapper around lex → parse → evaluate, shared by both
//! the file-mode and interactive-mode branches of the REPL binary.
//!
//! This module deliberately stays thin: file loading, line reading, and
//! prompting are external collaborators per the core spec's scope, not
//! specified in depth here.

use crate::frame::{Frame, FrameRef};
use crate::parser::parse;
use crate::repl_error::ReplError;
use crate::tracer::{NoopTracer, Tracer};
use crate::value::Value;

/// One evaluation result, ready to be printed by the caller.
pub struct Outcome(pub Value);

impl Outcome {
    /// Renders exactly the diagnostic/value format mandated for runtime
    /// output: `<repr>` for an ordinary value, or the `RuntimeError: ...`
    /// traceback block for a poisoned one.
    pub fn render(&self) -> String {
        match &self.0 {
            Value::Poison(p) => {
                format!(
                    "RuntimeError: {}\nTraceback (most recent call last):\n{}",
                    p.message,
                    p.release_frame.build_traceback()
                )
            }
            other => other.clone().force().repr(),
        }
    }
}

/// A persistent evaluation session: one root frame shared across every
/// statement group submitted to it, so `def`s from one snippet are visible
/// to the next.
pub struct ReplSession {
    root: FrameRef,
    tracer: Box<dyn Tracer>,
}

impl ReplSession {
    pub fn new() -> Self {
        Self { root: Frame::new_root(), tracer: Box::new(NoopTracer) }
    }

    pub fn with_tracer(tracer: Box<dyn Tracer>) -> Self {
        Self { root: Frame::new_root(), tracer }
    }

    /// Lexes, parses, and evaluates `src` against this session's persistent
    /// root frame, returning the value of the last statement (or `Nil` for
    /// an empty statement group).
    pub fn execute(&self, src: &str, file: &'static str) -> Result<Outcome, ReplError> {
        let (stmts, lex_errors, parse_errors) = parse(src, file);
        if !lex_errors.is_empty() {
            return Err(lex_errors.into());
        }
        if !parse_errors.is_empty() {
            return Err(parse_errors.into());
        }

        let mut last = Value::Nil;
        for stmt in &stmts {
            last = crate::evaluator::eval_stmt(stmt, &self.root, self.tracer.as_ref());
        }
        Ok(Outcome(last))
    }

    /// Runs every statement of a whole file, then returns the `Main`
    /// binding if present, else `Nil` — the file-mode entry point.
    pub fn execute_file(&self, src: &str, file: &'static str) -> Result<Outcome, ReplError> {
        let (stmts, lex_errors, parse_errors) = parse(src, file);
        if !lex_errors.is_empty() {
            return Err(lex_errors.into());
        }
        if !parse_errors.is_empty() {
            return Err(parse_errors.into());
        }
        let value = crate::evaluator::eval_program(&stmts, &self.root, self.tracer.as_ref());
        Ok(Outcome(value))
    }
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_persist_across_statement_groups() {
        let session = ReplSession::new();
        session.execute("def x = 5;", "<test>").unwrap();
        let outcome = session.execute("x + 1;", "<test>").unwrap();
        assert_eq!(outcome.render(), "IntType(6)");
    }

    #[test]
    fn undefined_name_renders_runtime_error_traceback() {
        let session = ReplSession::new();
        let outcome = session.execute("missing;", "<test>").unwrap();
        let rendered = outcome.render();
        assert!(rendered.starts_with("RuntimeError: missing not defined in scope"));
        assert!(rendered.contains("Traceback (most recent call last):"));
    }

    #[test]
    fn lex_errors_surface_as_repl_error() {
        let session = ReplSession::new();
        let result = session.execute("007;", "<test>");
        assert!(matches!(result, Err(ReplError::Lex(_))));
    }
}
