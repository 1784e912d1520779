//! By-reference pass (spec.md §4.7).
//!
//! Bash passes parameters by value, but Bish arrays must be passed by
//! reference. For each `Array(_)`-typed formal parameter, this pass
//! synthesises a global "reference surrogate" variable
//! (`_global_ref_<n>`) and rewrites every call site's hoisted argument
//! assignment to write into that surrogate instead of a fresh local —
//! so the callee can read the same global the caller wrote.

use crate::ir::{Arena, NodeId, NodeKind, Type};
use crate::util::UniqueNamer;

pub fn run(arena: &mut Arena, functions: &[NodeId], globals: &[NodeId], namer: &mut UniqueNamer) {
    // For each function, synthesise a surrogate for every Array(_)
    // formal and record it on the Variable node itself, per spec.md §3
    // ("Variable.ref_surrogate").
    for &f in functions {
        let args = arena.get(f).kind.as_function().args.clone();
        for arg in args {
            let is_array = arena.get(arg).meta.ty.is_array();
            if !is_array {
                continue;
            }
            let name = namer.fresh("_global_ref_");
            let debug = arena.get(arg).meta.debug.clone();
            let ty = arena.get(arg).meta.ty.clone();
            let surrogate = arena.alloc(crate::ir::Node::new(
                debug,
                NodeKind::Variable(crate::ir::VariableNode {
                    name: crate::ir::Name::new(name),
                    is_global: true,
                    ref_surrogate: None,
                }),
            ));
            arena.get_mut(surrogate).meta.ty = ty;
            arena.get_mut(arg).kind.as_variable_mut().ref_surrogate = Some(surrogate);
        }
    }

    // Now rewrite every call site: for each argument position whose
    // formal parameter carries a surrogate, redirect the hoisted
    // assignment's target to the surrogate instead of its original
    // fresh local. Call sites can live either inside a function body
    // or among the module's top-level global assignments (spec.md §4.2
    // moves the first assignment to each module-scope variable there).
    for &f in functions {
        if let Some(body) = arena.get(f).kind.as_function().body {
            rewrite_calls_in(arena, body);
        }
    }
    for &g in globals {
        rewrite_calls_in(arena, g);
    }
}

fn rewrite_calls_in(arena: &mut Arena, id: NodeId) {
    let kind = arena.get(id).kind.clone();
    match kind {
        NodeKind::Block(b) => {
            for s in b.statements {
                rewrite_calls_in(arena, s);
            }
        }
        NodeKind::IfStatement(i) => {
            for c in i.clauses {
                let pb = arena.get(c).kind.as_predicated_block().clone();
                rewrite_calls_in(arena, pb.condition);
                rewrite_calls_in(arena, pb.body);
            }
            if let Some(e) = i.else_block {
                rewrite_calls_in(arena, e);
            }
        }
        NodeKind::ForLoop(f) => {
            match f.source {
                crate::ir::ForSource::Range { lower, upper } => {
                    rewrite_calls_in(arena, lower);
                    rewrite_calls_in(arena, upper);
                }
                crate::ir::ForSource::Iterable(it) => rewrite_calls_in(arena, it),
            }
            rewrite_calls_in(arena, f.body)
        }
        NodeKind::FunctionCall(call) => {
            let formal_args = arena.get(call.target).kind.as_function().args.clone();
            for (i, &arg_assign) in call.args.iter().enumerate() {
                rewrite_calls_in(arena, arg_assign);
                let Some(&formal) = formal_args.get(i) else { continue };
                let Some(surrogate) = arena.get(formal).kind.as_variable().ref_surrogate else { continue };
                let target = arena.get(arg_assign).kind.as_assignment().target;
                arena.get_mut(target).kind.as_location_mut().variable = surrogate;
            }
        }
        NodeKind::Assignment(a) => {
            rewrite_calls_in(arena, a.target);
            for v in a.values {
                rewrite_calls_in(arena, v);
            }
        }
        NodeKind::ReturnStatement(r) => {
            if let Some(v) = r.value {
                rewrite_calls_in(arena, v);
            }
        }
        NodeKind::BinOp(b) => {
            rewrite_calls_in(arena, b.left);
            rewrite_calls_in(arena, b.right);
        }
        NodeKind::UnaryOp(u) => rewrite_calls_in(arena, u.operand),
        NodeKind::Location(l) => {
            if let Some(idx) = l.index {
                rewrite_calls_in(arena, idx);
            }
        }
        NodeKind::StringLit(s) => rewrite_calls_in(arena, s.content),
        NodeKind::InterpolatedString(s) => {
            let vars: Vec<NodeId> = s
                .items
                .iter()
                .filter_map(|item| match item {
                    crate::ir::InterpItem::Variable(v) => Some(*v),
                    _ => None,
                })
                .collect();
            for v in vars {
                rewrite_calls_in(arena, v);
            }
        }
        NodeKind::IORedirection(io) => {
            for s in io.segments {
                rewrite_calls_in(arena, s);
            }
        }
        NodeKind::ExternCall(e) => rewrite_calls_in(arena, e.body),
        NodeKind::Variable(_)
        | NodeKind::Function(_)
        | NodeKind::Module(_)
        | NodeKind::ImportStatement(_)
        | NodeKind::LoopControlStatement(_)
        | NodeKind::Integer(_)
        | NodeKind::Fractional(_)
        | NodeKind::Boolean(_)
        | NodeKind::PredicatedBlock(_) => {}
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

    // `a`, the hoisted call argument, and `x` are all first-time
    // top-level assignments, so the parser's global-extraction moves
    // all three out of `main.body` into `Module.global_variables`; the
    // call itself lives as the value of whichever global assignment
    // holds it (here, `x`'s).
    fn find_call(m: &crate::ir::Module) -> NodeId {
        m.module()
            .global_variables
            .iter()
            .copied()
            .find_map(|g| {
                let values = &m.arena.get(g).kind.as_assignment().values;
                values
                    .iter()
                    .copied()
                    .find(|&v| matches!(m.arena.get(v).kind, NodeKind::FunctionCall(_)))
            })
            .expect("no call site found among global assignments")
    }

    #[test]
    fn array_parameter_gets_a_reference_surrogate() {
        let mut m = prepared("def sum(arr) { return arr[0]; } a = [1,2,3]; x = sum(a);");
        let mut namer = UniqueNamer::new();
        let functions = m.module().functions.clone();
        let globals = m.module().global_variables.clone();
        run(&mut m.arena, &functions, &globals, &mut namer);

        let sum_fn = functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "sum")
            .unwrap();
        let arg = m.arena.get(sum_fn).kind.as_function().args[0];
        assert!(m.arena.get(arg).kind.as_variable().ref_surrogate.is_some());
    }

    #[test]
    fn call_site_assignment_writes_to_the_surrogate() {
        let mut m = prepared("def sum(arr) { return arr[0]; } a = [1,2,3]; x = sum(a);");
        let mut namer = UniqueNamer::new();
        let functions = m.module().functions.clone();
        let globals = m.module().global_variables.clone();
        run(&mut m.arena, &functions, &globals, &mut namer);

        let sum_fn = functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "sum")
            .unwrap();
        let arg = m.arena.get(sum_fn).kind.as_function().args[0];
        let surrogate = m.arena.get(arg).kind.as_variable().ref_surrogate.unwrap();

        let call_id = find_call(&m);
        let call = m.arena.get(call_id).kind.as_function_call();
        let arg_assign = call.args[0];
        let target_loc = m.arena.get(arg_assign).kind.as_assignment().target;
        assert_eq!(m.arena.get(target_loc).kind.as_location().variable, surrogate);
    }
}
