//! Stateful byte/char scanner turning source text into a token stream.
//!
//! Lexemes are matched in a fixed order — triple-char, numeric, bare period,
//! string, double-char, single-char, identifier/keyword, mismatch — so that
//! longer lexemes always win over shorter prefixes of themselves.

use crate::source::SourcePos;
use crate::token::{self, Token, TokenKind};

/// A lex-time diagnostic: a message paired with the position it was raised
/// at. Collected rather than thrown — the lexer never aborts on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub pos: SourcePos,
    pub message: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

impl std::error::Error for LexError {}

/// Whether whitespace tokens are discarded (`Skip`) or yielded to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexerOptions {
    pub ignore_skippables: bool,
}

impl LexerOptions {
    pub const fn ignore_skippables() -> Self {
        Self { ignore_skippables: true }
    }
}

/// A scanner over a source buffer, advancing one `char` at a time.
pub struct Lexer<'a> {
    src: &'a [char],
    file: &'static str,
    pos: usize,
    line: u32,
    column: u32,
    opts: LexerOptions,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a [char], file: &'static str, opts: LexerOptions) -> Self {
        Self { src, file, pos: 0, line: 1, column: 1, opts, errors: Vec::new() }
    }

    fn current_pos(&self) -> SourcePos {
        SourcePos::new(self.file, self.line, self.column)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn reached_end(&self, offset: usize) -> bool {
        self.pos + offset >= self.src.len()
    }

    /// Advances one character, updating line/column bookkeeping: a consumed
    /// newline resets the column to 1 and increments the line.
    fn consume_char(&mut self) -> char {
        let ch = self.src[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn error(&mut self, pos: SourcePos, message: impl Into<String>) {
        self.errors.push(LexError { pos, message: message.into() });
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.src[start..end].iter().collect()
    }

    /// Lexes the whole source, returning the accumulated diagnostics (if
    /// any) alongside a token stream always terminated by exactly one `Eos`.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eos = tok.kind == TokenKind::Eos;
            tokens.push(tok);
            if is_eos {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn next_token(&mut self) -> Token {
        if self.reached_end(0) {
            return Token::new(self.current_pos(), TokenKind::Eos, "");
        }

        let ch = self.peek(0).expect("checked by reached_end above");

        if ch == ' ' || ch == '\t' || ch == '\n' {
            return self.lex_whitespace();
        }
        if let Some(tok) = self.try_lex_triple_char() {
            return tok;
        }
        if ch.is_ascii_digit() {
            return self.lex_number();
        }
        if ch == '.' {
            return self.lex_bare_period();
        }
        if ch == '"' {
            return self.lex_string();
        }
        if let Some(tok) = self.try_lex_double_char() {
            return tok;
        }
        if let Some(kind) = token::single_char_token(ch) {
            let pos = self.current_pos();
            self.consume_char();
            return Token::new(pos, kind, ch);
        }
        if is_ident_start(ch) {
            return self.lex_ident_or_keyword();
        }

        let pos = self.current_pos();
        self.consume_char();
        self.error(pos, format!("invalid character {ch:?} in identifier"));
        Token::new(pos, TokenKind::Mismatch, ch)
    }

    fn lex_whitespace(&mut self) -> Token {
        let pos = self.current_pos();
        let ch = self.consume_char();
        if self.opts.ignore_skippables {
            return self.next_token();
        }
        let kind = if ch == '\n' { TokenKind::Newline } else { TokenKind::Skip };
        Token::new(pos, kind, ch)
    }

    fn try_lex_triple_char(&mut self) -> Option<Token> {
        if self.reached_end(2) {
            return None;
        }
        let three: String = (0..3).map(|i| self.peek(i).unwrap()).collect();
        let kind = token::triple_char_token(&three)?;
        let pos = self.current_pos();
        for _ in 0..3 {
            self.consume_char();
        }
        Some(Token::new(pos, kind, three))
    }

    fn try_lex_double_char(&mut self) -> Option<Token> {
        if self.reached_end(1) {
            return None;
        }
        let two: String = (0..2).map(|i| self.peek(i).unwrap()).collect();
        let kind = token::double_char_token(&two)?;
        let pos = self.current_pos();
        for _ in 0..2 {
            self.consume_char();
        }
        Some(Token::new(pos, kind, two))
    }

    fn lex_number(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;

        let first = self.consume_char();
        if first == '0' {
            // Leading zero: every subsequent digit (if any) must also be zero.
            while let Some(d) = self.peek(0) {
                if d.is_ascii_digit() {
                    if d != '0' {
                        let digit_pos = self.current_pos();
                        self.error(digit_pos, "leading zeros in decimal integer literals are not permitted");
                    }
                    self.consume_char();
                } else {
                    break;
                }
            }
        } else {
            while let Some(d) = self.peek(0) {
                if d.is_ascii_digit() {
                    self.consume_char();
                } else {
                    break;
                }
            }
        }

        let mut kind = TokenKind::Integer;
        if self.peek(0) == Some('.') {
            self.consume_char();
            kind = TokenKind::Real;
            while let Some(d) = self.peek(0) {
                if d.is_ascii_digit() {
                    self.consume_char();
                } else {
                    break;
                }
            }
        }

        if self.peek(0) == Some('i') {
            self.consume_char();
            kind = TokenKind::Complex;
        }

        let raw = self.slice(start, self.pos);
        Token::new(pos, kind, raw)
    }

    fn lex_bare_period(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;
        self.consume_char();

        if let Some(d) = self.peek(0) {
            if d.is_ascii_digit() {
                while let Some(d) = self.peek(0) {
                    if d.is_ascii_digit() {
                        self.consume_char();
                    } else {
                        break;
                    }
                }
                let mut kind = TokenKind::Real;
                if self.peek(0) == Some('i') {
                    self.consume_char();
                    kind = TokenKind::Complex;
                }
                let raw = self.slice(start, self.pos);
                return Token::new(pos, kind, raw);
            }
        }

        Token::new(pos, TokenKind::Period, ".")
    }

    fn lex_string(&mut self) -> Token {
        let pos = self.current_pos();
        self.consume_char(); // opening quote
        let start = self.pos;
        loop {
            match self.peek(0) {
                None => {
                    self.error(pos, "EOL while scanning string literal");
                    let raw = self.slice(start, self.pos);
                    return Token::new(pos, TokenKind::String, raw);
                }
                Some(ch) if ch == '"' => {
                    let raw = self.slice(start, self.pos);
                    self.consume_char(); // closing quote
                    return Token::new(pos, TokenKind::String, raw);
                }
                Some(ch) if !ch.is_ascii() => {
                    self.error(pos, "EOL while scanning string literal");
                    let raw = self.slice(start, self.pos);
                    return Token::new(pos, TokenKind::String, raw);
                }
                Some(_) => {
                    self.consume_char();
                }
            }
        }
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let pos = self.current_pos();
        let start = self.pos;
        self.consume_char();
        while let Some(ch) = self.peek(0) {
            if is_ident_char(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        let raw = self.slice(start, self.pos);
        let kind = token::keyword_token(&raw).unwrap_or(TokenKind::Ident);
        Token::new(pos, kind, raw)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Lexes `src` to completion with skippable whitespace discarded, the
/// configuration the parser always uses.
pub fn tokenize(src: &str, file: &'static str) -> (Vec<Token>, Vec<LexError>) {
    let chars: Vec<char> = src.chars().collect();
    Lexer::new(&chars, file, LexerOptions::ignore_skippables()).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src, "<test>").0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn ends_in_exactly_one_eos() {
        let toks = kinds("1 + 2");
        assert_eq!(toks.last(), Some(&TokenKind::Eos));
        assert_eq!(toks.iter().filter(|k| **k == TokenKind::Eos).count(), 1);
    }

    #[test]
    fn leading_zero_rule_flags_nonzero_digit() {
        let (_, errors) = tokenize("007", "<test>");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("leading zeros"));

        let (_, errors) = tokenize("000", "<test>");
        assert!(errors.is_empty(), "all-zero leading digits are permitted");

        let (_, errors) = tokenize("0", "<test>");
        assert!(errors.is_empty(), "a single zero is permitted");
    }

    #[test]
    fn leading_zero_diagnostic_points_at_the_offending_digit() {
        let (_, errors) = tokenize("0012", "<test>");
        assert_eq!(errors.len(), 1);
        // The literal starts at column 1; the first non-zero digit after the
        // leading zeros ('1') is at column 3.
        assert_eq!(errors[0].pos.column, 3);
    }

    #[test]
    fn real_literal_allows_empty_fractional_part() {
        let toks = tokenize("1.", "<test>").0;
        assert_eq!(toks[0].kind, TokenKind::Real);
        assert_eq!(toks[0].raw, "1.");
    }

    #[test]
    fn complex_suffix_is_i_not_im() {
        let toks = tokenize("3i", "<test>").0;
        assert_eq!(toks[0].kind, TokenKind::Complex);
        assert_eq!(toks[0].raw, "3i");

        // `im` lexes as the integer `3` followed by identifier `im`.
        let toks = tokenize("3im", "<test>").0;
        assert_eq!(toks[0].kind, TokenKind::Integer);
        assert_eq!(toks[1].kind, TokenKind::Ident);
        assert_eq!(toks[1].raw, "im");
    }

    #[test]
    fn newline_accounting_tracks_line_count() {
        let (toks, _) = Lexer::new(&"a\nb\nc".chars().collect::<Vec<_>>(), "<test>", LexerOptions::default()).tokenize();
        let last = toks.last().unwrap();
        assert_eq!(last.kind, TokenKind::Eos);
        assert_eq!(last.pos.line, 3);
    }

    #[test]
    fn double_and_triple_char_tokens_win_over_shorter_prefixes() {
        assert_eq!(kinds("!=")[0], TokenKind::ExclamationEqual);
        assert_eq!(kinds("...")[0], TokenKind::Ellipsis);
        assert_eq!(kinds("::=")[0], TokenKind::ColonColonEqual);
        assert_eq!(kinds("::")[0], TokenKind::DoubleColon);
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let (_, errors) = tokenize("\"abc", "<test>");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("EOL while scanning string literal"));
    }

    #[test]
    fn position_round_trip_for_identifiers() {
        let src = "  foo";
        let toks = tokenize(src, "<test>").0;
        let ident = &toks[0];
        assert_eq!(ident.kind, TokenKind::Ident);
        assert_eq!(ident.pos.column as usize, 3);
    }
}
