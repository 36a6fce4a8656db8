//! Precedence-climbing recursive-descent parser, with parse-time
//! alpha-renaming of `fn` parameters to globally unique synthetic names.

use std::cell::Cell;
use std::collections::HashMap;

use crate::ast::{
    ApplicationExpr, AtomicExpr, BinaryExpr, ConditionalExpr, DefStmt, Expr, FunExpr, LetExpr, ListExpr, Node, Stmt,
    UnaryExpr,
};
use crate::source::SourcePos;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub pos: SourcePos,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

impl std::error::Error for ParseError {}

thread_local! {
    /// Process-wide (thread-local) counter backing `%<counter>` synthetic
    /// parameter names — simplest correct source of freshness across parses
    /// within a session, per the core spec's design note.
    static UNIQUE_IDENT_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_unique_ident() -> String {
    UNIQUE_IDENT_COUNTER.with(|c| {
        let n = c.get();
        c.set(n + 1);
        format!("%{n}")
    })
}

/// The placeholder parameter name that drops out of `arg_names` entirely: a
/// `fn _ -> body` is a zero-arity thunk, never bound, never referenced.
const WILDCARD_PARAM: &str = "_";

/// Precedence level of each binary operator kind; 0 means "not a binary
/// operator at this grammar level" (application and atoms are handled
/// outside this table).
fn binary_precedence(kind: TokenKind) -> Option<u8> {
    use TokenKind as K;
    match kind {
        K::Xor | K::Or => Some(1),
        K::And => Some(2),
        K::DoubleEqual
        | K::ExclamationEqual
        | K::Greater
        | K::GreaterEqual
        | K::Less
        | K::LessEqual => Some(4),
        K::DoublePlus => Some(5),
        K::Plus | K::Minus => Some(6),
        K::Star | K::Slash | K::DoubleSlash | K::Percent | K::SlashPercent => Some(7),
        K::DoubleStar => Some(9),
        K::DoubleExclamation => Some(10),
        _ => None,
    }
}

struct ExprParseCtx {
    to_be_alpha_converted: HashMap<String, String>,
}

impl ExprParseCtx {
    fn new() -> Self {
        Self { to_be_alpha_converted: HashMap::new() }
    }

    fn requires_alpha_conversion(&self, raw: &str) -> Option<&str> {
        self.to_be_alpha_converted.get(raw).map(String::as_str)
    }

    fn enqueue(&mut self, raw: String, synthetic: String) {
        self.to_be_alpha_converted.insert(raw, synthetic);
    }

    fn dequeue(&mut self, raw: &str) {
        self.to_be_alpha_converted.remove(raw);
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, errors: Vec::new() }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(ParseError { pos: self.current().pos, message: message.into() });
    }

    fn expect(&mut self, kind: TokenKind) -> Token {
        if self.at(kind) {
            self.advance()
        } else {
            let found = self.current().clone();
            self.error(format!("expected {kind:?}, found {:?} ({:?})", found.kind, found.raw));
            found
        }
    }

    /// Parses the whole token stream into a program (a sequence of `;`
    /// terminated statements), returning whatever diagnostics accumulated.
    pub fn parse_program(mut self) -> (Vec<Stmt>, Vec<ParseError>) {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eos) {
            let stmt = self.parse_stmt();
            stmts.push(stmt);
            if self.at(TokenKind::Semicolon) {
                self.advance();
            } else if !self.at(TokenKind::Eos) {
                self.error("expected ';' after statement");
            }
        }
        (stmts, self.errors)
    }

    fn parse_stmt(&mut self) -> Stmt {
        if self.at(TokenKind::Def) {
            self.parse_def_stmt()
        } else {
            let mut ctx = ExprParseCtx::new();
            Stmt::Expr(self.parse_expr(&mut ctx))
        }
    }

    fn parse_def_stmt(&mut self) -> Stmt {
        let pos = self.current().pos;
        self.advance(); // 'def'
        let is_rec = if self.at(TokenKind::Rec) {
            self.advance();
            true
        } else {
            false
        };

        let mut names = Vec::new();
        let mut exprs = Vec::new();
        loop {
            let name_tok = self.expect(TokenKind::Ident);
            self.expect(TokenKind::Equal);
            let mut ctx = ExprParseCtx::new();
            let expr = self.parse_expr(&mut ctx);
            names.push(name_tok.raw);
            exprs.push(expr);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Stmt::Def(DefStmt { pos, names, exprs, is_rec })
    }

    fn parse_expr(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        if self.at(TokenKind::Let) {
            self.parse_let_expr(ctx)
        } else if self.at(TokenKind::If) {
            self.parse_if_expr(ctx)
        } else if self.at(TokenKind::Fn) {
            self.parse_fun_expr(ctx)
        } else {
            self.parse_precedence(ctx, 1)
        }
    }

    fn parse_let_expr(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        let pos = self.current().pos;
        self.advance(); // 'let'
        let is_rec = if self.at(TokenKind::Rec) {
            self.advance();
            true
        } else {
            false
        };

        let mut init_names = Vec::new();
        let mut init_exprs = Vec::new();
        loop {
            let name_tok = self.expect(TokenKind::Ident);
            self.expect(TokenKind::Equal);
            let expr = self.parse_expr(ctx);
            init_names.push(name_tok.raw);
            init_exprs.push(expr);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(TokenKind::In);
        let body = self.parse_expr(ctx);

        Expr::Let(LetExpr { pos, init_names, init_exprs, body: Box::new(body), is_rec })
    }

    fn parse_if_expr(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        let pos = self.current().pos;
        self.advance(); // 'if'
        let cond = self.parse_expr(ctx);
        self.expect(TokenKind::Then);
        let consequent = self.parse_expr(ctx);

        let alternative = if self.at(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_expr(ctx)))
        } else if self.at(TokenKind::Elif) {
            Some(Box::new(self.parse_if_expr(ctx)))
        } else {
            None
        };

        Expr::Conditional(ConditionalExpr { pos, cond: Box::new(cond), consequent: Box::new(consequent), alternative })
    }

    fn parse_fun_expr(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        let pos = self.current().pos;
        self.advance(); // 'fn'

        let mut raw_names = Vec::new();
        loop {
            let tok = self.expect(TokenKind::Ident);
            raw_names.push(tok.raw);
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::DashGreater);

        let mut arg_names = Vec::new();
        for raw in &raw_names {
            if raw == WILDCARD_PARAM {
                continue;
            }
            let synthetic = next_unique_ident();
            ctx.enqueue(raw.clone(), synthetic.clone());
            arg_names.push(synthetic);
        }

        let body = self.parse_expr(ctx);

        for raw in &raw_names {
            if raw != WILDCARD_PARAM {
                ctx.dequeue(raw);
            }
        }

        Expr::Fun(FunExpr { pos, arg_names, body: Box::new(body) })
    }

    /// Precedence-climbing dispatch: levels 1-7 and 9 are left-associative
    /// binary productions (9 is the one right-associative exception among
    /// them), level 3 and 8 are unary, level 10 is binary, level 11 is
    /// application, and anything above 11 is an atom.
    fn parse_precedence(&mut self, ctx: &mut ExprParseCtx, level: u8) -> Expr {
        match level {
            1..=2 => self.parse_left_binary(ctx, level),
            3 => self.parse_unary(ctx, TokenKind::Not, level),
            4..=7 => self.parse_left_binary(ctx, level),
            8 => self.parse_unary_plus_minus(ctx, level),
            9 => self.parse_right_binary(ctx, level),
            10 => self.parse_left_binary(ctx, level),
            _ => self.parse_application(ctx),
        }
    }

    fn ops_at_level(&self, level: u8) -> bool {
        binary_precedence(self.current().kind) == Some(level)
    }

    fn parse_left_binary(&mut self, ctx: &mut ExprParseCtx, level: u8) -> Expr {
        let mut lhs = self.parse_precedence(ctx, level + 1);
        while self.ops_at_level(level) {
            let op = self.advance();
            let rhs = self.parse_precedence(ctx, level + 1);
            let pos = lhs.pos();
            lhs = Expr::Binary(BinaryExpr { pos, lhs: Box::new(lhs), op, rhs: Box::new(rhs) });
        }
        lhs
    }

    fn parse_right_binary(&mut self, ctx: &mut ExprParseCtx, level: u8) -> Expr {
        let lhs = self.parse_precedence(ctx, level + 1);
        if self.ops_at_level(level) {
            let op = self.advance();
            let rhs = self.parse_precedence(ctx, level); // same level: right-recursion
            let pos = lhs.pos();
            return Expr::Binary(BinaryExpr { pos, lhs: Box::new(lhs), op, rhs: Box::new(rhs) });
        }
        lhs
    }

    fn parse_unary(&mut self, ctx: &mut ExprParseCtx, op_kind: TokenKind, level: u8) -> Expr {
        if self.at(op_kind) {
            let op = self.advance();
            let operand = self.parse_precedence(ctx, level); // stack repeated prefix ops
            Expr::Unary(UnaryExpr { pos: op.pos, op, expr: Box::new(operand) })
        } else {
            self.parse_precedence(ctx, level + 1)
        }
    }

    fn parse_unary_plus_minus(&mut self, ctx: &mut ExprParseCtx, level: u8) -> Expr {
        if matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance();
            let operand = self.parse_precedence(ctx, level);
            Expr::Unary(UnaryExpr { pos: op.pos, op, expr: Box::new(operand) })
        } else {
            self.parse_precedence(ctx, level + 1)
        }
    }

    fn parse_application(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        let mut head = self.parse_atom(ctx);
        while self.at(TokenKind::LeftParenthesis) {
            let pos = head.pos();
            self.advance(); // '('
            let mut args = Vec::new();
            if !self.at(TokenKind::RightParenthesis) {
                loop {
                    args.push(self.parse_expr(ctx));
                    if self.at(TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightParenthesis);
            head = Expr::Application(ApplicationExpr { pos, func: Box::new(head), args });
        }
        head
    }

    fn parse_atom(&mut self, ctx: &mut ExprParseCtx) -> Expr {
        let pos = self.current().pos;
        if self.at(TokenKind::LeftParenthesis) {
            self.advance();
            let inner = self.parse_expr(ctx);
            self.expect(TokenKind::RightParenthesis);
            return inner;
        }
        if self.at(TokenKind::LeftBracket) {
            self.advance();
            let mut items = Vec::new();
            if !self.at(TokenKind::RightBracket) {
                loop {
                    items.push(self.parse_expr(ctx));
                    if self.at(TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RightBracket);
            return Expr::List(ListExpr { pos, items });
        }

        let tok = self.advance();
        if tok.kind == TokenKind::Ident {
            if let Some(synthetic) = ctx.requires_alpha_conversion(&tok.raw) {
                return Expr::Atomic(AtomicExpr { pos, raw: synthetic.to_string(), kind: TokenKind::Ident });
            }
        }
        Expr::Atomic(AtomicExpr { pos, raw: tok.raw, kind: tok.kind })
    }
}

/// Lexes then parses `src` in one step, the entry point most callers want.
pub fn parse(src: &str, file: &'static str) -> (Vec<Stmt>, Vec<crate::lexer::LexError>, Vec<ParseError>) {
    let (tokens, lex_errors) = crate::lexer::tokenize(src, file);
    let (stmts, parse_errors) = Parser::new(tokens).parse_program();
    (stmts, lex_errors, parse_errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    fn parse_one(src: &str) -> Expr {
        let (stmts, lex_errors, parse_errors) = parse(src, "<test>");
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        assert_eq!(stmts.len(), 1);
        match stmts.into_iter().next().unwrap() {
            Stmt::Expr(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn precedence_invariant_holds_for_plus_then_star() {
        let e = parse_one("a + b * c;");
        // `*` (level 7) binds tighter than `+` (level 6): a + (b * c)
        let Expr::Binary(top) = &e else { panic!("expected binary") };
        assert_eq!(top.op.kind, TokenKind::Plus);
        assert!(matches!(*top.rhs, Expr::Binary(_)));
    }

    #[test]
    fn double_star_is_right_associative() {
        let e = parse_one("2 ** 3 ** 2;");
        let Expr::Binary(top) = &e else { panic!("expected binary") };
        assert_eq!(top.op.kind, TokenKind::DoubleStar);
        assert!(matches!(*top.rhs, Expr::Binary(_)), "rhs should itself be 3 ** 2");
        assert!(matches!(*top.lhs, Expr::Atomic(_)));
    }

    #[test]
    fn application_is_left_associative() {
        let e = parse_one("f(a)(b);");
        let Expr::Application(outer) = &e else { panic!("expected application") };
        assert!(matches!(*outer.func, Expr::Application(_)));
    }

    #[test]
    fn alpha_renaming_produces_percent_decimal_names() {
        let e = parse_one("fn x -> x;");
        let Expr::Fun(fun) = &e else { panic!("expected fn") };
        assert_eq!(fun.arg_names.len(), 1);
        assert!(fun.arg_names[0].starts_with('%'));
        assert!(fun.arg_names[0][1..].parse::<u64>().is_ok());
    }

    #[test]
    fn distinct_fns_never_share_a_synthetic_param_name() {
        let e = parse_one("(fn x -> x)(fn x -> x);");
        let Expr::Application(app) = &e else { panic!("expected application") };
        let Expr::Fun(outer) = &*app.func else { panic!("expected fn") };
        let Expr::Fun(inner) = &app.args[0] else { panic!("expected fn") };
        assert_ne!(outer.arg_names[0], inner.arg_names[0]);
    }

    #[test]
    fn wildcard_param_is_dropped_from_arity() {
        let e = parse_one("fn _ -> 1;");
        let Expr::Fun(fun) = &e else { panic!("expected fn") };
        assert_eq!(fun.arity(), 0);
    }

    #[test]
    fn variable_set_laws_hold_for_fun() {
        let e = parse_one("fn x -> x + outer;");
        assert!(e.free_vars().is_subset(&e.vars()));
        assert!(e.bound_vars().is_subset(&e.vars()));
        let Expr::Fun(fun) = &e else { panic!("expected fn") };
        let arg_set: std::collections::BTreeSet<String> = fun.arg_names.iter().cloned().collect();
        assert!(e.free_vars().is_disjoint(&arg_set));
    }
}
