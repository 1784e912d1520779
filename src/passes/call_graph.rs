//! Call graph construction and queries (spec.md §4.10).
//!
//! Built by visiting every `FunctionCall` under each function body and
//! recording the edge `(enclosing-function → target)`. Used by the
//! import linker to pull in a needed function's own transitive
//! dependencies.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ir::{Arena, ForSource, InterpItem, NodeId, NodeKind};

#[derive(Debug, Default, Clone)]
pub struct CallGraph {
    calls: HashMap<NodeId, Vec<NodeId>>,
    callers: HashMap<NodeId, Vec<NodeId>>,
}

impl CallGraph {
    pub fn build(arena: &Arena, functions: &[NodeId]) -> Self {
        let mut cg = CallGraph::default();
        for &f in functions {
            cg.calls.entry(f).or_default();
            cg.callers.entry(f).or_default();
            if let Some(body) = arena.get(f).kind.as_function().body {
                collect_calls(arena, body, f, &mut cg);
            }
        }
        cg
    }

    /// Direct calls made by `f`.
    pub fn calls(&self, f: NodeId) -> &[NodeId] {
        self.calls.get(&f).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Functions that call `f`.
    pub fn callers(&self, f: NodeId) -> &[NodeId] {
        self.callers.get(&f).map(Vec::as_slice).unwrap_or(&[])
    }

    /// BFS over the `calls` edges from `root`, deduplicated, excluding
    /// `root` itself.
    pub fn transitive_calls(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        visited.insert(root);
        let mut worklist = VecDeque::new();
        worklist.push_back(root);
        let mut result = Vec::new();
        while let Some(f) = worklist.pop_front() {
            for &callee in self.calls(f) {
                if visited.insert(callee) {
                    worklist.push_back(callee);
                    result.push(callee);
                }
            }
        }
        result
    }
}

/// Read-only recursive walk recording every `FunctionCall` reachable
/// under `id` as an edge from `enclosing`. Does not need to cross into
/// other functions' bodies (those are walked from their own top-level
/// call in `build`), but nested blocks/ifs/loops within `enclosing`
/// must all be covered.
fn collect_calls(arena: &Arena, id: NodeId, enclosing: NodeId, cg: &mut CallGraph) {
    match &arena.get(id).kind {
        NodeKind::FunctionCall(call) => {
            cg.calls.entry(enclosing).or_default().push(call.target);
            cg.callers.entry(call.target).or_default().push(enclosing);
            for &a in &call.args {
                collect_calls(arena, a, enclosing, cg);
            }
        }
        NodeKind::Block(b) => {
            for &s in &b.statements {
                collect_calls(arena, s, enclosing, cg);
            }
        }
        NodeKind::Assignment(a) => {
            collect_calls(arena, a.target, enclosing, cg);
            for &v in &a.values {
                collect_calls(arena, v, enclosing, cg);
            }
        }
        NodeKind::IfStatement(i) => {
            for &c in &i.clauses {
                collect_calls(arena, c, enclosing, cg);
            }
            if let Some(e) = i.else_block {
                collect_calls(arena, e, enclosing, cg);
            }
        }
        NodeKind::PredicatedBlock(p) => {
            collect_calls(arena, p.condition, enclosing, cg);
            collect_calls(arena, p.body, enclosing, cg);
        }
        NodeKind::ForLoop(f) => {
            match f.source {
                ForSource::Range { lower, upper } => {
                    collect_calls(arena, lower, enclosing, cg);
                    collect_calls(arena, upper, enclosing, cg);
                }
                ForSource::Iterable(it) => collect_calls(arena, it, enclosing, cg),
            }
            collect_calls(arena, f.body, enclosing, cg);
        }
        NodeKind::ReturnStatement(r) => {
            if let Some(v) = r.value {
                collect_calls(arena, v, enclosing, cg);
            }
        }
        NodeKind::BinOp(b) => {
            collect_calls(arena, b.left, enclosing, cg);
            collect_calls(arena, b.right, enclosing, cg);
        }
        NodeKind::UnaryOp(u) => collect_calls(arena, u.operand, enclosing, cg),
        NodeKind::Location(l) => {
            if let Some(idx) = l.index {
                collect_calls(arena, idx, enclosing, cg);
            }
        }
        NodeKind::StringLit(s) => collect_calls(arena, s.content, enclosing, cg),
        NodeKind::InterpolatedString(s) => {
            for item in &s.items {
                if let InterpItem::Variable(v) = item {
                    collect_calls(arena, *v, enclosing, cg);
                }
            }
        }
        NodeKind::IORedirection(io) => {
            for &s in &io.segments {
                collect_calls(arena, s, enclosing, cg);
            }
        }
        NodeKind::ExternCall(e) => collect_calls(arena, e.body, enclosing, cg),
        NodeKind::Variable(_)
        | NodeKind::Function(_)
        | NodeKind::Module(_)
        | NodeKind::ImportStatement(_)
        | NodeKind::LoopControlStatement(_)
        | NodeKind::Integer(_)
        | NodeKind::Fractional(_)
        | NodeKind::Boolean(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    #[test]
    fn direct_and_transitive_calls() {
        let m = parse_module(
            "def a() { b(); } def b() { c(); } def c() { } x = a();",
            "t.bish",
        )
        .unwrap();
        let functions = m.module().functions.clone();
        let cg = CallGraph::build(&m.arena, &functions);

        let a = functions.iter().copied().find(|&f| m.arena.get(f).kind.as_function().name.bare() == "a").unwrap();
        let b = functions.iter().copied().find(|&f| m.arena.get(f).kind.as_function().name.bare() == "b").unwrap();
        let c = functions.iter().copied().find(|&f| m.arena.get(f).kind.as_function().name.bare() == "c").unwrap();

        assert_eq!(cg.calls(a), &[b]);
        let transitive = cg.transitive_calls(a);
        assert!(transitive.contains(&b));
        assert!(transitive.contains(&c));
    }
}
