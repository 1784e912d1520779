//! Return-value lowering pass (spec.md §4.8).
//!
//! Bash functions cannot return arbitrary values. This pass runs in two
//! steps, in order:
//!
//! 1. For every function with at least one `return expr`, allocate a
//!    global `_global_retval_<n>` and rewrite each such return into
//!    `Assignment(retval, expr)` followed by a bare `return`.
//! 2. Walk every statement list (function bodies and the module's
//!    global assignments) and hoist any `FunctionCall` whose target has
//!    a retval — one that isn't already inside an `IORedirection`,
//!    which runs the call in a subshell via `$(...)` and needs no
//!    hoisting — into a standalone statement immediately before the
//!    current one, followed by `Assignment(tmp, retval)`, with the call
//!    replaced in place by a reference to `tmp`.

use crate::ir::{Arena, AssignmentNode, LocationNode, Name, Node, NodeId, NodeKind, VariableNode};
use crate::util::UniqueNamer;

pub fn run(arena: &mut Arena, functions: &[NodeId], globals: &mut Vec<NodeId>, namer: &mut UniqueNamer) {
    for &f in functions {
        rewrite_returns_in_function(arena, namer, f);
    }

    for &f in functions {
        if let Some(body) = arena.get(f).kind.as_function().body {
            let mut stmts = arena.get(body).kind.as_block().statements.clone();
            lift_calls_in_statement_list(arena, namer, &mut stmts);
            arena.get_mut(body).kind.as_block_mut().statements = stmts;
        }
    }
    lift_calls_in_statement_list(arena, namer, globals);
}

// --- Step 1: allocate retval globals, rewrite `return expr` ---------------

fn rewrite_returns_in_function(arena: &mut Arena, namer: &mut UniqueNamer, f: NodeId) {
    let mut retval: Option<NodeId> = None;
    if let Some(body) = arena.get(f).kind.as_function().body {
        rewrite_returns_in_block(arena, namer, body, &mut retval);
    }
    if let Some(rv) = retval {
        arena.get_mut(f).kind.as_function_mut().retval_global = Some(rv);
    }
}

fn rewrite_returns_in_block(arena: &mut Arena, namer: &mut UniqueNamer, block_id: NodeId, retval: &mut Option<NodeId>) {
    let mut stmts = arena.get(block_id).kind.as_block().statements.clone();
    let mut i = 0;
    while i < stmts.len() {
        let stmt = stmts[i];
        match arena.get(stmt).kind.clone() {
            NodeKind::ReturnStatement(r) => {
                // A return whose value is itself an extern call is left
                // alone: codegen special-cases it into `echo "…"; exit`
                // directly rather than routing it through a retval
                // global (spec.md §4.8/§4.9).
                let is_extern = r.value.is_some_and(|v| matches!(arena.get(v).kind, NodeKind::ExternCall(_)));
                if let Some(value) = r.value.filter(|_| !is_extern) {
                    let rv = ensure_retval(arena, namer, retval);
                    let debug = arena.get(stmt).meta.debug.clone();
                    let target = arena.alloc(Node::new(
                        debug.clone(),
                        NodeKind::Location(LocationNode { variable: rv, index: None }),
                    ));
                    let assign = arena.alloc(Node::new(
                        debug,
                        NodeKind::Assignment(AssignmentNode { target, values: vec![value] }),
                    ));
                    arena.get_mut(stmt).kind.as_return_mut().value = None;
                    stmts.insert(i, assign);
                    i += 1;
                }
            }
            NodeKind::IfStatement(ifs) => {
                for c in &ifs.clauses {
                    let body = arena.get(*c).kind.as_predicated_block().body;
                    rewrite_returns_in_block(arena, namer, body, retval);
                }
                if let Some(e) = ifs.else_block {
                    rewrite_returns_in_block(arena, namer, e, retval);
                }
            }
            NodeKind::ForLoop(fl) => {
                rewrite_returns_in_block(arena, namer, fl.body, retval);
            }
            NodeKind::Block(_) => {
                rewrite_returns_in_block(arena, namer, stmt, retval);
            }
            _ => {}
        }
        i += 1;
    }
    arena.get_mut(block_id).kind.as_block_mut().statements = stmts;
}

fn ensure_retval(arena: &mut Arena, namer: &mut UniqueNamer, retval: &mut Option<NodeId>) -> NodeId {
    if let Some(rv) = *retval {
        return rv;
    }
    let name = namer.fresh("_global_retval_");
    let path = arena.get(0).meta.debug.path.clone();
    let rv = arena.alloc(Node::new(
        crate::ir::DebugInfo::synthetic(path),
        NodeKind::Variable(VariableNode { name: Name::new(name), is_global: true, ref_surrogate: None }),
    ));
    *retval = Some(rv);
    rv
}

// --- Step 2: hoist calls-with-return-value out of expression position -----

fn lift_calls_in_statement_list(arena: &mut Arena, namer: &mut UniqueNamer, stmts: &mut Vec<NodeId>) {
    let mut i = 0;
    while i < stmts.len() {
        let stmt = stmts[i];
        recurse_into_nested_blocks(arena, namer, stmt);

        let mut inserted = 0;
        loop {
            let Some(call_id) = find_liftable_call(arena, stmt, false) else { break };
            let target = arena.get(call_id).kind.as_function_call().target;
            let Some(retval) = arena.get(target).kind.as_function().retval_global else {
                // Shouldn't happen: find_liftable_call only returns calls
                // whose target has a retval, but guard anyway.
                break;
            };
            let debug = arena.get(call_id).meta.debug.clone();
            let tmp_name = namer.fresh("_ret_tmp_");
            let tmp = arena.alloc(Node::new(
                debug.clone(),
                NodeKind::Variable(VariableNode { name: Name::new(tmp_name), is_global: false, ref_surrogate: None }),
            ));
            let tmp_target = arena.alloc(Node::new(
                debug.clone(),
                NodeKind::Location(LocationNode { variable: tmp, index: None }),
            ));
            let retval_loc = arena.alloc(Node::new(
                debug.clone(),
                NodeKind::Location(LocationNode { variable: retval, index: None }),
            ));
            let capture = arena.alloc(Node::new(
                debug,
                NodeKind::Assignment(AssignmentNode { target: tmp_target, values: vec![retval_loc] }),
            ));

            let reference = arena.alloc(Node::new(
                arena.get(call_id).meta.debug.clone(),
                NodeKind::Location(LocationNode { variable: tmp, index: None }),
            ));
            replace_child(arena, stmt, call_id, reference);

            stmts.insert(i + inserted, call_id);
            inserted += 1;
            stmts.insert(i + inserted, capture);
            inserted += 1;
        }
        i += 1 + inserted;
    }
}

fn recurse_into_nested_blocks(arena: &mut Arena, namer: &mut UniqueNamer, id: NodeId) {
    match arena.get(id).kind.clone() {
        NodeKind::Block(b) => {
            let mut stmts = b.statements;
            lift_calls_in_statement_list(arena, namer, &mut stmts);
            arena.get_mut(id).kind.as_block_mut().statements = stmts;
        }
        NodeKind::IfStatement(ifs) => {
            for c in &ifs.clauses {
                let body = arena.get(*c).kind.as_predicated_block().body;
                recurse_into_nested_blocks(arena, namer, body);
            }
            if let Some(e) = ifs.else_block {
                recurse_into_nested_blocks(arena, namer, e);
            }
        }
        NodeKind::ForLoop(fl) => recurse_into_nested_blocks(arena, namer, fl.body),
        NodeKind::FunctionCall(call) => {
            let mut args = call.args;
            lift_calls_in_statement_list(arena, namer, &mut args);
            arena.get_mut(id).kind.as_function_call_mut().args = args;
        }
        _ => {}
    }
}

/// Finds the first `FunctionCall` reachable from `id`'s own expression
/// tree (not descending into nested `Block`/`IfStatement`/`ForLoop`
/// bodies, which `recurse_into_nested_blocks` already handled) whose
/// target has a retval and which is not already wrapped in an
/// `IORedirection`.
fn find_liftable_call(arena: &Arena, id: NodeId, under_redirection: bool) -> Option<NodeId> {
    match &arena.get(id).kind {
        NodeKind::FunctionCall(call) => {
            let target = call.target;
            let args = call.args.clone();
            if !under_redirection && arena.get(target).kind.as_function().retval_global.is_some() {
                return Some(id);
            }
            for a in args {
                if let Some(found) = find_liftable_call(arena, a, under_redirection) {
                    return Some(found);
                }
            }
            None
        }
        NodeKind::Assignment(a) => {
            if let Some(found) = find_liftable_call(arena, a.target, under_redirection) {
                return Some(found);
            }
            for &v in &a.values {
                if let Some(found) = find_liftable_call(arena, v, under_redirection) {
                    return Some(found);
                }
            }
            None
        }
        NodeKind::ReturnStatement(r) => r.value.and_then(|v| find_liftable_call(arena, v, under_redirection)),
        NodeKind::BinOp(b) => find_liftable_call(arena, b.left, under_redirection)
            .or_else(|| find_liftable_call(arena, b.right, under_redirection)),
        NodeKind::UnaryOp(u) => find_liftable_call(arena, u.operand, under_redirection),
        NodeKind::Location(l) => l.index.and_then(|idx| find_liftable_call(arena, idx, under_redirection)),
        NodeKind::StringLit(s) => find_liftable_call(arena, s.content, under_redirection),
        NodeKind::InterpolatedString(s) => s.items.iter().find_map(|item| match item {
            crate::ir::InterpItem::Variable(v) => find_liftable_call(arena, *v, under_redirection),
            _ => None,
        }),
        NodeKind::IORedirection(io) => io.segments.iter().find_map(|&s| find_liftable_call(arena, s, true)),
        NodeKind::ExternCall(e) => find_liftable_call(arena, e.body, under_redirection),
        _ => None,
    }
}

/// Rewrites the single occurrence of `old` among `id`'s immediate
/// expression children to `new`. Mirrors the same traversal shape as
/// [`find_liftable_call`].
fn replace_child(arena: &mut Arena, id: NodeId, old: NodeId, new: NodeId) -> bool {
    let kind = arena.get(id).kind.clone();
    match kind {
        NodeKind::FunctionCall(call) => {
            if call.target == old {
                arena.get_mut(id).kind.as_function_call_mut().target = new;
                return true;
            }
            for a in call.args {
                if replace_child(arena, a, old, new) {
                    return true;
                }
            }
            false
        }
        NodeKind::Assignment(a) => {
            if a.target == old {
                arena.get_mut(id).kind.as_assignment_mut().target = new;
                return true;
            }
            if replace_child(arena, a.target, old, new) {
                return true;
            }
            for (i, &v) in a.values.iter().enumerate() {
                if v == old {
                    arena.get_mut(id).kind.as_assignment_mut().values[i] = new;
                    return true;
                }
                if replace_child(arena, v, old, new) {
                    return true;
                }
            }
            false
        }
        NodeKind::ReturnStatement(r) => {
            if r.value == Some(old) {
                arena.get_mut(id).kind.as_return_mut().value = Some(new);
                return true;
            }
            r.value.is_some_and(|v| replace_child(arena, v, old, new))
        }
        NodeKind::BinOp(b) => {
            if b.left == old {
                arena.get_mut(id).kind.as_binop_mut().left = new;
                return true;
            }
            if b.right == old {
                arena.get_mut(id).kind.as_binop_mut().right = new;
                return true;
            }
            replace_child(arena, b.left, old, new) || replace_child(arena, b.right, old, new)
        }
        NodeKind::UnaryOp(u) => {
            if u.operand == old {
                arena.get_mut(id).kind.as_unaryop_mut().operand = new;
                return true;
            }
            replace_child(arena, u.operand, old, new)
        }
        NodeKind::Location(l) => match l.index {
            Some(idx) if idx == old => {
                arena.get_mut(id).kind.as_location_mut().index = Some(new);
                true
            }
            Some(idx) => replace_child(arena, idx, old, new),
            None => false,
        },
        NodeKind::StringLit(s) => {
            if s.content == old {
                arena.get_mut(id).kind.as_string_mut().content = new;
                return true;
            }
            replace_child(arena, s.content, old, new)
        }
        NodeKind::InterpolatedString(s) => {
            for (i, item) in s.items.iter().enumerate() {
                if let crate::ir::InterpItem::Variable(v) = item {
                    if *v == old {
                        arena.get_mut(id).kind.as_interp_mut().items[i] = crate::ir::InterpItem::Variable(new);
                        return true;
                    }
                    if replace_child(arena, *v, old, new) {
                        return true;
                    }
                }
            }
            false
        }
        NodeKind::IORedirection(io) => {
            for (i, &s) in io.segments.iter().enumerate() {
                if s == old {
                    arena.get_mut(id).kind.as_io_redirection_mut().segments[i] = new;
                    return true;
                }
                if replace_child(arena, s, old, new) {
                    return true;
                }
            }
            false
        }
        NodeKind::ExternCall(e) => {
            if e.body == old {
                arena.get_mut(id).kind.as_extern_call_mut().body = new;
                return true;
            }
            replace_child(arena, e.body, old, new)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn prepared(src: &str) -> crate::ir::Module {
        let mut m = parse_module(src, "t.bish").unwrap();
        let root = m.root;
        crate::passes::parent_wiring::run(&mut m.arena, root);
        let functions = m.module().functions.clone();
        let globals = m.module().global_variables.clone();
        crate::passes::type_check::run(&mut m.arena, &functions, &globals).unwrap();
        m
    }

    #[test]
    fn function_with_return_value_gets_a_retval_global() {
        let mut m = prepared("def add(x, y) { return x + y; } c = add(1, 2);");
        let functions = m.module().functions.clone();
        let mut globals = m.module().global_variables.clone();
        let mut namer = UniqueNamer::new();
        run(&mut m.arena, &functions, &mut globals, &mut namer);
        m.module_mut().global_variables = globals;

        let add_fn = functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "add")
            .unwrap();
        assert!(m.arena.get(add_fn).kind.as_function().retval_global.is_some());
    }

    #[test]
    fn return_with_value_becomes_assignment_then_bare_return() {
        let mut m = prepared("def add(x, y) { return x + y; } c = add(1, 2);");
        let functions = m.module().functions.clone();
        let mut globals = m.module().global_variables.clone();
        let mut namer = UniqueNamer::new();
        run(&mut m.arena, &functions, &mut globals, &mut namer);
        m.module_mut().global_variables = globals;

        let add_fn = functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "add")
            .unwrap();
        let body = m.arena.get(add_fn).kind.as_function().body.unwrap();
        let stmts = &m.arena.get(body).kind.as_block().statements;
        assert_eq!(stmts.len(), 2);
        assert!(matches!(m.arena.get(stmts[0]).kind, NodeKind::Assignment(_)));
        let ret = m.arena.get(stmts[1]).kind.as_return();
        assert!(ret.value.is_none());
    }

    #[test]
    fn call_with_retval_used_in_expression_is_hoisted() {
        let mut m = prepared("def add(x, y) { return x + y; } c = add(1, 2);");
        let functions = m.module().functions.clone();
        let mut globals = m.module().global_variables.clone();
        let mut namer = UniqueNamer::new();
        run(&mut m.arena, &functions, &mut globals, &mut namer);
        m.module_mut().global_variables = globals.clone();

        // `c`'s own statement should no longer embed the call directly;
        // the call runs as a standalone statement, its retval captured
        // into a local, and `c`'s assignment value is that local.
        let c_assign = *globals.last().unwrap();
        let c_value = m.arena.get(c_assign).kind.as_assignment().values[0];
        assert!(matches!(m.arena.get(c_value).kind, NodeKind::Location(_)));

        let has_standalone_call = globals.iter().any(|&g| matches!(m.arena.get(g).kind, NodeKind::FunctionCall(_)));
        assert!(has_standalone_call);
    }

    #[test]
    fn return_of_extern_call_is_left_for_codegen() {
        let mut m = prepared("def list() { return @(ls $PWD); }");
        let functions = m.module().functions.clone();
        let mut globals = m.module().global_variables.clone();
        let mut namer = UniqueNamer::new();
        run(&mut m.arena, &functions, &mut globals, &mut namer);

        let list_fn = functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "list")
            .unwrap();
        assert!(m.arena.get(list_fn).kind.as_function().retval_global.is_none());

        let body = m.arena.get(list_fn).kind.as_function().body.unwrap();
        let stmts = &m.arena.get(body).kind.as_block().statements;
        assert_eq!(stmts.len(), 1);
        let ret = m.arena.get(stmts[0]).kind.as_return();
        assert!(matches!(m.arena.get(ret.value.unwrap()).kind, NodeKind::ExternCall(_)));
    }
}
