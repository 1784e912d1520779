//! Uniform default-recursing traversal over the IR (spec.md §4.3).
//!
//! A `Visitor` has one method per node variant; the default
//! implementation of each calls [`walk_children`], which recurses into
//! every child in deterministic left-to-right order. Concrete passes
//! override only the variants they care about and call
//! `walk_children(self, id, arena)` from inside their override when they
//! still want the default recursion for that node's children.

use super::arena::Arena;
use super::node::{ForSource, InterpItem, NodeId, NodeKind};

/// Implemented by every pass that walks the IR. The default method
/// bodies all just recurse; override the variants a pass needs to act
/// on and call `walk_children` explicitly to keep recursing underneath.
pub trait Visitor {
    fn visit(&mut self, arena: &mut Arena, id: NodeId) {
        walk_children(self, arena, id);
    }
}

/// Visits every child of `id` in left-to-right order, dispatching back
/// through `v.visit`. This is the single place that knows how each
/// variant decomposes into children, so passes never have to repeat it.
pub fn walk_children<V: Visitor + ?Sized>(v: &mut V, arena: &mut Arena, id: NodeId) {
    // Clone the list of child ids up front: a pass may append new
    // statements into the very block/module it is visiting (e.g.
    // call-lifting during parsing, argument hoisting during lowering),
    // and iterating over a snapshot keeps that safe (spec.md §5).
    match &arena.get(id).kind {
        NodeKind::Module(m) => {
            let globals = m.global_variables.clone();
            let functions = m.functions.clone();
            for g in globals {
                v.visit(arena, g);
            }
            for f in functions {
                v.visit(arena, f);
            }
        }
        NodeKind::Block(b) => {
            let stmts = b.statements.clone();
            for s in stmts {
                v.visit(arena, s);
            }
        }
        NodeKind::Variable(_) => {}
        NodeKind::Location(l) => {
            let index = l.index;
            if let Some(idx) = index {
                v.visit(arena, idx);
            }
        }
        NodeKind::Function(f) => {
            let args = f.args.clone();
            let body = f.body;
            for a in args {
                v.visit(arena, a);
            }
            if let Some(b) = body {
                v.visit(arena, b);
            }
        }
        NodeKind::FunctionCall(c) => {
            let args = c.args.clone();
            for a in args {
                v.visit(arena, a);
            }
        }
        NodeKind::ExternCall(e) => {
            let body = e.body;
            v.visit(arena, body);
        }
        NodeKind::IORedirection(io) => {
            let segments = io.segments.clone();
            for s in segments {
                v.visit(arena, s);
            }
        }
        NodeKind::Assignment(a) => {
            let target = a.target;
            let values = a.values.clone();
            v.visit(arena, target);
            for val in values {
                v.visit(arena, val);
            }
        }
        NodeKind::ImportStatement(_) => {}
        NodeKind::ReturnStatement(r) => {
            if let Some(val) = r.value {
                v.visit(arena, val);
            }
        }
        NodeKind::LoopControlStatement(_) => {}
        NodeKind::IfStatement(i) => {
            let clauses = i.clauses.clone();
            let else_block = i.else_block;
            for c in clauses {
                v.visit(arena, c);
            }
            if let Some(e) = else_block {
                v.visit(arena, e);
            }
        }
        NodeKind::ForLoop(f) => {
            let variable = f.variable;
            let source = f.source.clone();
            let body = f.body;
            v.visit(arena, variable);
            match source {
                ForSource::Range { lower, upper } => {
                    v.visit(arena, lower);
                    v.visit(arena, upper);
                }
                ForSource::Iterable(it) => v.visit(arena, it),
            }
            v.visit(arena, body);
        }
        NodeKind::BinOp(b) => {
            let (l, r) = (b.left, b.right);
            v.visit(arena, l);
            v.visit(arena, r);
        }
        NodeKind::UnaryOp(u) => {
            let operand = u.operand;
            v.visit(arena, operand);
        }
        NodeKind::Integer(_) | NodeKind::Fractional(_) | NodeKind::Boolean(_) => {}
        NodeKind::StringLit(s) => {
            let content = s.content;
            v.visit(arena, content);
        }
        NodeKind::InterpolatedString(s) => {
            let vars: Vec<NodeId> = s
                .items
                .iter()
                .filter_map(|item| match item {
                    InterpItem::Variable(v) => Some(*v),
                    _ => None,
                })
                .collect();
            for var in vars {
                v.visit(arena, var);
            }
        }
        NodeKind::PredicatedBlock(p) => {
            let (cond, body) = (p.condition, p.body);
            v.visit(arena, cond);
            v.visit(arena, body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    struct CountNodes {
        n: usize,
    }
    impl Visitor for CountNodes {
        fn visit(&mut self, arena: &mut Arena, id: NodeId) {
            self.n += 1;
            walk_children(self, arena, id);
        }
    }

    #[test]
    fn default_recursion_visits_every_reachable_node() {
        let mut m = parse_module("a = 1; b = a + 2;", "t.bish").unwrap();
        let mut counter = CountNodes { n: 0 };
        let root = m.root;
        counter.visit(&mut m.arena, root);
        assert!(counter.n > 5);
    }
}
