//! Lexical variable scopes and the global function table maintained
//! while parsing (spec.md §4.2's `ParseScope`).

use std::collections::HashMap;
use std::rc::Rc;

use crate::ir::{Arena, DebugInfo, Name, Node, NodeId, NodeKind, VariableNode, FunctionNode};

use super::error::ParseError;

/// A stack of per-block variable scopes plus a flat, process-wide
/// function table, both live only for the duration of one parse.
#[derive(Default)]
pub struct ParseScope {
    var_scopes: Vec<HashMap<String, NodeId>>,
    functions: HashMap<String, NodeId>,
}

impl ParseScope {
    pub fn new() -> Self {
        Self { var_scopes: vec![HashMap::new()], functions: HashMap::new() }
    }

    pub fn push_block(&mut self) {
        self.var_scopes.push(HashMap::new());
    }

    pub fn pop_block(&mut self) {
        self.var_scopes.pop();
        debug_assert!(!self.var_scopes.is_empty(), "popped the outermost variable scope");
    }

    fn find(&self, name: &str) -> Option<NodeId> {
        self.var_scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    /// Installs a variable directly into the current innermost scope
    /// (used for the built-in `args` and for formal parameters, which
    /// are always fresh bindings rather than lookups).
    pub fn declare(&mut self, arena: &mut Arena, name: &str, debug: DebugInfo) -> NodeId {
        let id = arena.alloc(Node::new(
            debug,
            NodeKind::Variable(VariableNode { name: Name::new(name), is_global: false, ref_surrogate: None }),
        ));
        self.var_scopes.last_mut().expect("ParseScope always has at least the outermost scope").insert(name.to_string(), id);
        id
    }

    /// Resolves `name` in any enclosing scope; if none binds it, creates
    /// a new `Variable`, installs it in the innermost scope, and returns
    /// it. Used at binding/write sites (assignment targets, loop
    /// variables).
    pub fn lookup_or_new_var(&mut self, arena: &mut Arena, name: &str, debug: DebugInfo) -> NodeId {
        if let Some(id) = self.find(name) {
            return id;
        }
        self.declare(arena, name, debug)
    }

    /// Resolves `name` to its defining `Variable`. Fails with an
    /// "undefined variable" error if no defining entry exists anywhere
    /// in the scope chain. Used at read sites (`atom ::= location`).
    pub fn get_defined_variable(
        &self,
        name: &str,
        path: Rc<str>,
        line: usize,
        column: usize,
    ) -> Result<NodeId, ParseError> {
        self.find(name)
            .ok_or_else(|| ParseError::new(format!("undefined variable '{}'", name), path, line, column))
    }

    /// Analogous to `lookup_or_new_var` but against the global function
    /// table, so forward calls and later definitions reconcile to the
    /// same node. A freshly created entry is a dummy (`body: None`).
    pub fn lookup_or_new_function(&mut self, arena: &mut Arena, name: Name, debug: DebugInfo) -> NodeId {
        let key = name.render(".");
        if let Some(id) = self.functions.get(&key) {
            return *id;
        }
        let id = arena.alloc(Node::new(
            debug,
            NodeKind::Function(FunctionNode { name, args: Vec::new(), body: None, retval_global: None }),
        ));
        self.functions.insert(key, id);
        id
    }

    pub fn function_by_name(&self, key: &str) -> Option<NodeId> {
        self.functions.get(key).copied()
    }

    pub fn register_function(&mut self, key: String, id: NodeId) {
        self.functions.insert(key, id);
    }

    pub fn functions(&self) -> &HashMap<String, NodeId> {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DebugInfo;

    fn dbg() -> DebugInfo {
        DebugInfo::new(Rc::from("test"), 1, 0, 0)
    }

    #[test]
    fn lookup_or_new_var_reuses_across_nested_blocks() {
        let mut arena = Arena::new();
        let mut scope = ParseScope::new();
        let outer = scope.lookup_or_new_var(&mut arena, "x", dbg());
        scope.push_block();
        let inner = scope.lookup_or_new_var(&mut arena, "x", dbg());
        assert_eq!(outer, inner);
        scope.pop_block();
    }

    #[test]
    fn shadowing_in_inner_scope_creates_new_variable() {
        let mut arena = Arena::new();
        let mut scope = ParseScope::new();
        scope.declare(&mut arena, "x", dbg());
        scope.push_block();
        let shadowed = scope.declare(&mut arena, "x", dbg());
        scope.pop_block();
        let outer = scope.get_defined_variable("x", Rc::from("test"), 1, 0).unwrap();
        assert_ne!(outer, shadowed);
    }

    #[test]
    fn get_defined_variable_errors_when_undefined() {
        let scope = ParseScope::new();
        assert!(scope.get_defined_variable("missing", Rc::from("test"), 1, 0).is_err());
    }

    #[test]
    fn lookup_or_new_function_reconciles_forward_calls() {
        let mut arena = Arena::new();
        let mut scope = ParseScope::new();
        let forward = scope.lookup_or_new_function(&mut arena, Name::new("f"), dbg());
        let later = scope.lookup_or_new_function(&mut arena, Name::new("f"), dbg());
        assert_eq!(forward, later);
    }
}
