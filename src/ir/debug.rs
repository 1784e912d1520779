//! Debug-info tuples carried by every IR node.
//!
//! Every node keeps the `(path, line, start, end)` tuple captured at the
//! token position where parsing of that node began, so later passes can
//! report diagnostics without re-walking the source.

use std::rc::Rc;

/// Position/extent info attached to an IR node for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    pub path: Rc<str>,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl DebugInfo {
    pub fn new(path: Rc<str>, line: usize, start: usize, end: usize) -> Self {
        Self { path, line, start, end }
    }

    /// A placeholder used for synthetic nodes that have no source position
    /// (e.g. nodes inserted by lowering passes).
    pub fn synthetic(path: Rc<str>) -> Self {
        Self { path, line: 0, start: 0, end: 0 }
    }
}

impl std::fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}
