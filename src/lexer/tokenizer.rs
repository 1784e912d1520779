//! Hand-rolled character-level lexer.
//!
//! `peek`/`next` expose a lazily-computed, one-token lookahead stream.
//! `scan_until` operates directly on the character cursor (bypassing
//! normal tokenization) and is used by the parser to pull raw text out
//! of interpolated-string and extern-call bodies.

use super::error::LexError;
use super::token::{Token, TokenType};

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    line_start: usize,
    peeked: Option<Token>,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
            peeked: None,
        }
    }

    fn column(&self) -> usize {
        self.pos - self.line_start + 1
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn lookahead(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(c)
    }

    /// Raw cursor position (for debug-info capture by the parser).
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> usize {
        self.line
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                // Line comment: '#' to end of line.
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Returns the token at the head without consuming it. Calling this
    /// any number of times without an intervening `next` returns the
    /// same token and leaves the cursor unchanged (peek idempotence).
    pub fn peek(&mut self) -> Result<Token, LexError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex_token()?);
        }
        Ok(self.peeked.clone().expect("just set above"))
    }

    /// Consumes and returns the token at the head.
    pub fn next(&mut self) -> Result<Token, LexError> {
        if let Some(tok) = self.peeked.take() {
            return Ok(tok);
        }
        self.lex_token()
    }

    fn lex_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let line = self.line;
        let column = self.column();

        let Some(c) = self.current() else {
            return Ok(Token::new(TokenType::EOS, "", line, column));
        };

        if c.is_ascii_digit() {
            return Ok(self.lex_number(line, column));
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_word(line, column));
        }

        macro_rules! simple {
            ($ty:expr) => {{
                self.advance();
                Ok(Token::new($ty, c.to_string(), line, column))
            }};
        }

        match c {
            '(' => simple!(TokenType::LParen),
            ')' => simple!(TokenType::RParen),
            '{' => simple!(TokenType::LBrace),
            '}' => simple!(TokenType::RBrace),
            '[' => simple!(TokenType::LBracket),
            ']' => simple!(TokenType::RBracket),
            ';' => simple!(TokenType::Semicolon),
            ',' => simple!(TokenType::Comma),
            '|' => simple!(TokenType::Pipe),
            '@' => simple!(TokenType::At),
            '$' => simple!(TokenType::Dollar),
            '\\' => simple!(TokenType::Backslash),
            '"' => simple!(TokenType::Quote),
            '+' => simple!(TokenType::Plus),
            '-' => simple!(TokenType::Minus),
            '*' => simple!(TokenType::Star),
            '/' => simple!(TokenType::Slash),
            '%' => simple!(TokenType::Percent),
            '.' => {
                if self.lookahead(1) == Some('.') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenType::DoubleDot, "..", line, column))
                } else {
                    self.advance();
                    Ok(Token::new(TokenType::Dot, ".", line, column))
                }
            }
            '=' => {
                if self.lookahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenType::DoubleEquals, "==", line, column))
                } else {
                    self.advance();
                    Ok(Token::new(TokenType::Equals, "=", line, column))
                }
            }
            '!' => {
                if self.lookahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenType::NotEquals, "!=", line, column))
                } else {
                    Err(LexError::new("unexpected '!' (did you mean '!='?)", line, column))
                }
            }
            '<' => {
                if self.lookahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenType::LAngleEquals, "<=", line, column))
                } else {
                    self.advance();
                    Ok(Token::new(TokenType::LAngle, "<", line, column))
                }
            }
            '>' => {
                if self.lookahead(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenType::RAngleEquals, ">=", line, column))
                } else {
                    self.advance();
                    Ok(Token::new(TokenType::RAngle, ">", line, column))
                }
            }
            other => Err(LexError::new(format!("unrecognised character '{}'", other), line, column)),
        }
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let start = self.pos;
        while self.current().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        let is_fractional = self.current() == Some('.')
            && self.lookahead(1).map_or(false, |c| c.is_ascii_digit());
        if is_fractional {
            self.advance(); // '.'
            while self.current().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
            let lexeme: String = self.chars[start..self.pos].iter().collect();
            Token::new(TokenType::Fractional, lexeme, line, column)
        } else {
            let lexeme: String = self.chars[start..self.pos].iter().collect();
            Token::new(TokenType::Int, lexeme, line, column)
        }
    }

    fn lex_word(&mut self, line: usize, column: usize) -> Token {
        let start = self.pos;
        while self.current().map_or(false, |c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let lexeme: String = self.chars[start..self.pos].iter().collect();
        let ty = TokenType::keyword_lookup(&lexeme).unwrap_or(TokenType::Symbol);
        Token::new(ty, lexeme, line, column)
    }

    /// Returns the raw substring from the current cursor up to (but not
    /// including) the first unescaped occurrence of any of `stop_chars`.
    /// A stop character preceded by `\` is treated as escaped and does
    /// not terminate the scan; `keep_backslash` controls whether that
    /// backslash is copied into the output or stripped.
    ///
    /// Invalidates any pending `peek` — callers only use this right
    /// after consuming the token that opens the raw region (`"` or
    /// `@(`), before anything could have been peeked past it.
    pub fn scan_until(&mut self, stop_chars: &[char], keep_backslash: bool) -> String {
        self.peeked = None;
        let mut out = String::new();
        loop {
            let Some(c) = self.current() else { break };
            if c == '\\' {
                if let Some(next) = self.lookahead(1) {
                    if stop_chars.contains(&next) {
                        if keep_backslash {
                            out.push('\\');
                        }
                        self.advance();
                        out.push(next);
                        self.advance();
                        continue;
                    }
                }
                out.push(c);
                self.advance();
                continue;
            }
            if stop_chars.contains(&c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }

    /// Character-granularity convenience form of `scan_until` for a
    /// single terminator, discarding any escaping backslash.
    pub fn scan_until_char(&mut self, stop: char) -> String {
        self.scan_until(&[stop], false)
    }

    /// Consumes exactly one raw character (used for the opening/closing
    /// delimiter of a raw region after `scan_until`).
    pub fn consume_char(&mut self) -> Option<char> {
        self.peeked = None;
        self.advance()
    }

    pub fn peek_char(&self) -> Option<char> {
        self.current()
    }

    /// Reads a maximal `[A-Za-z0-9_]` run from the raw cursor (used for
    /// `$qname` references inside interpolated text, where the normal
    /// token stream has been bypassed).
    pub fn scan_identifier(&mut self) -> String {
        self.peeked = None;
        let mut out = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    /// Assumes the opening `(` of a `$(...)` fragment has already been
    /// consumed. Returns the raw text up to (not including) the matching
    /// closing `)`, tracking nested parens so embedded subshells survive
    /// intact. The matching `)` is left unconsumed.
    pub fn scan_balanced_parens(&mut self) -> String {
        self.peeked = None;
        let mut depth = 1usize;
        let mut out = String::new();
        while let Some(c) = self.current() {
            match c {
                '(' => {
                    depth += 1;
                    out.push(c);
                    self.advance();
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(c);
                    self.advance();
                }
                _ => {
                    out.push(c);
                    self.advance();
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_is_idempotent() {
        let mut t = Tokenizer::new("a = 1;");
        let p1 = t.peek().unwrap();
        let p2 = t.peek().unwrap();
        assert_eq!(p1, p2);
        assert_eq!(t.offset(), 0);
    }

    #[test]
    fn multi_char_operators_detected() {
        for (src, ty) in [
            ("==", TokenType::DoubleEquals),
            ("!=", TokenType::NotEquals),
            ("<=", TokenType::LAngleEquals),
            (">=", TokenType::RAngleEquals),
            ("..", TokenType::DoubleDot),
        ] {
            let mut t = Tokenizer::new(src);
            assert_eq!(t.next().unwrap().ty, ty, "lexing {}", src);
        }
    }

    #[test]
    fn keyword_disambiguation() {
        let mut t = Tokenizer::new("if elseif");
        assert_eq!(t.next().unwrap().ty, TokenType::If);
        // "elseif" is one run, not "else"+"if" -> Symbol.
        assert_eq!(t.next().unwrap().ty, TokenType::Symbol);
    }

    #[test]
    fn fractional_vs_range() {
        let mut t = Tokenizer::new("1..5");
        assert_eq!(t.next().unwrap().ty, TokenType::Int);
        assert_eq!(t.next().unwrap().ty, TokenType::DoubleDot);
        assert_eq!(t.next().unwrap().ty, TokenType::Int);

        let mut t2 = Tokenizer::new("3.14");
        let tok = t2.next().unwrap();
        assert_eq!(tok.ty, TokenType::Fractional);
        assert_eq!(tok.lexeme, "3.14");
    }

    #[test]
    fn comment_to_end_of_line_is_skipped() {
        let mut t = Tokenizer::new("a # comment\nb");
        assert_eq!(t.next().unwrap().lexeme, "a");
        assert_eq!(t.next().unwrap().lexeme, "b");
    }

    #[test]
    fn unrecognised_character_is_fatal() {
        let mut t = Tokenizer::new("`");
        assert!(t.next().is_err());
    }

    #[test]
    fn scan_until_respects_escape() {
        let mut t = Tokenizer::new(r#"a\"b"c"#);
        let s = t.scan_until(&['"'], false);
        assert_eq!(s, "a\"b");
        assert_eq!(t.peek_char(), Some('"'));
    }
}
