//! Crate-wide error type.
//!
//! Every fallible boundary returns `Result<T, BishError>`. All error
//! kinds are fatal per spec.md §7 — there is no recovery, the first
//! detected error aborts compilation.

use std::rc::Rc;

use thiserror::Error;

use crate::ir::DebugInfo;
use crate::lexer::LexError;
use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum BishError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("type error at {debug}: {message}")]
    Type { message: String, debug: DebugInfo },

    #[error("link error: {0}")]
    Link(String),

    /// Indicates a compiler bug (an invariant the passes are supposed to
    /// maintain was violated), not bad user input.
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl BishError {
    pub fn ty(message: impl Into<String>, debug: DebugInfo) -> Self {
        BishError::Type { message: message.into(), debug }
    }

    pub fn link(message: impl Into<String>) -> Self {
        BishError::Link(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        BishError::Internal(message.into())
    }
}

/// Reusable placeholder path for errors raised outside any single file
/// (e.g. during registry lookups).
pub fn anon_path() -> Rc<str> {
    Rc::from("<bish>")
}
