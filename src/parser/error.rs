use std::rc::Rc;

use thiserror::Error;

use crate::lexer::Token;

/// Parse errors: unexpected token, unmatched bracket, redefinition of a
/// function, assignment to a function, undefined variable. Always
/// carries `(path, line, column)` plus a human-readable message.
#[derive(Debug, Error, Clone)]
#[error("parse error at {path}:{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub path: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub token: Option<Token>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, path: Rc<str>, line: usize, column: usize) -> Self {
        Self { message: message.into(), path, line, column, token: None }
    }

    pub fn with_token(
        message: impl Into<String>,
        path: Rc<str>,
        line: usize,
        column: usize,
        token: Token,
    ) -> Self {
        Self { message: message.into(), path, line, column, token: Some(token) }
    }
}
