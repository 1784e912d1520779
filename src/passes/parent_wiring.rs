//! Parent-wiring pass (spec.md §4.4).
//!
//! Walks the tree in pre-order, setting every non-root node's `parent`
//! pointer to its immediate structural container (the `Block` it's a
//! statement of, the `Function` that owns a top-level statement, the
//! `Module` that owns a top-level `Function`, …). After this pass every
//! reachable non-root node has `meta.parent.is_some()`, which later
//! passes rely on (e.g. the return-value pass walks up from a
//! `FunctionCall` to its enclosing `Block`).

use crate::ir::{walk_children, Arena, NodeId, Visitor};

pub fn run(arena: &mut Arena, root: NodeId) {
    let mut pass = ParentWiring { stack: Vec::new() };
    pass.visit(arena, root);
}

struct ParentWiring {
    stack: Vec<NodeId>,
}

impl Visitor for ParentWiring {
    fn visit(&mut self, arena: &mut Arena, id: NodeId) {
        if let Some(&parent) = self.stack.last() {
            arena.get_mut(id).meta.parent = Some(parent);
        }
        self.stack.push(id);
        walk_children(self, arena, id);
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    #[test]
    fn every_non_root_node_gets_a_parent() {
        // Walk the same reachable tree the wiring pass itself traverses
        // (functions/global_variables/main, transitively) rather than the
        // raw arena — the arena may additionally hold nodes that were
        // allocated but never wired into the tree (e.g. the `args`
        // built-in when a script never references it), which have no
        // parent by design and aren't part of this invariant.
        let mut m = parse_module("def f(x) { return x + 1; } a = f(2);", "t.bish").unwrap();
        let root = m.root;
        run(&mut m.arena, root);

        struct CollectReachable {
            ids: Vec<NodeId>,
        }
        impl Visitor for CollectReachable {
            fn visit(&mut self, arena: &mut Arena, id: NodeId) {
                self.ids.push(id);
                walk_children(self, arena, id);
            }
        }
        let mut collector = CollectReachable { ids: Vec::new() };
        collector.visit(&mut m.arena, root);

        for id in collector.ids {
            if id == root {
                assert!(m.arena.get(id).meta.parent.is_none());
            } else {
                assert!(m.arena.get(id).meta.parent.is_some(), "node {:?} missing parent", id);
            }
        }
    }

    #[test]
    fn block_statement_parent_is_the_block() {
        let mut m = parse_module("{ a = 1; }", "t.bish").unwrap();
        let root = m.root;
        run(&mut m.arena, root);
        let main_body = m.arena.get(m.module().main).kind.as_function().body.unwrap();
        let inner_block = m.arena.get(main_body).kind.as_block().statements[0];
        let stmt = m.arena.get(inner_block).kind.as_block().statements[0];
        assert_eq!(m.arena.get(stmt).meta.parent, Some(inner_block));
    }
}
