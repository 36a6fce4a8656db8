#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing between Int/Real/Complex is checked at call sites")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors the source language's native arithmetic")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts in list indexing are guarded by range checks")]

mod ast;
mod evaluator;
mod frame;
mod lexer;
mod parser;
mod repl;
mod repl_error;
mod source;
mod tracer;
mod value;
pub mod token;

pub use crate::ast::{Expr, Node, Stmt, VarSet};
pub use crate::evaluator::{eval_expr, eval_program, eval_stmt};
pub use crate::frame::{ArgStack, Frame, FrameRef};
pub use crate::lexer::{tokenize, LexError, Lexer, LexerOptions};
pub use crate::parser::{parse, ParseError, Parser};
pub use crate::repl::{Outcome, ReplSession};
pub use crate::repl_error::ReplError;
pub use crate::source::SourcePos;
pub use crate::tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, Tracer};
pub use crate::value::{FunVal, PoisonVal, ThunkVal, Value};
