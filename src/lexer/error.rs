use thiserror::Error;

/// Lexical errors: unrecognised character, unterminated interpolated
/// string, unterminated comment. Always carries `(line, column)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("lex error at {line}:{column}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self { message: message.into(), line, column }
    }
}
