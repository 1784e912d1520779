//! Type inferencer / checker (spec.md §4.6).
//!
//! A single pass run after parent-wiring. Most rules are bottom-up
//! (infer a node's type from its children); `Assignment` and
//! `ReturnStatement` additionally propagate back up into the variable
//! or function they bind. Visited nodes are tracked by id so that a
//! `Function` or `Variable` reachable from many call sites is only
//! type-checked once (spec.md §4.3's "idempotent on shared nodes").

use std::collections::HashSet;

use crate::error::BishError;
use crate::ir::{Arena, BinOperator, ForSource, NodeId, NodeKind, Type};

pub fn run(arena: &mut Arena, functions: &[NodeId], globals: &[NodeId]) -> Result<(), BishError> {
    let mut checker = TypeChecker { arena, visited: HashSet::new() };
    for &g in globals {
        checker.check(g)?;
    }
    for &f in functions {
        checker.check(f)?;
    }
    Ok(())
}

struct TypeChecker<'a> {
    arena: &'a mut Arena,
    visited: HashSet<NodeId>,
}

impl TypeChecker<'_> {
    fn mismatch(&self, id: NodeId, message: impl Into<String>) -> BishError {
        BishError::ty(message, self.arena.get(id).meta.debug.clone())
    }

    fn check(&mut self, id: NodeId) -> Result<(), BishError> {
        // Functions and Variables may be reached from many call sites;
        // everything else is only ever reached once by construction
        // (single-owner tree), but the visited guard is cheap and keeps
        // this pass correct even if that invariant ever loosens.
        if !self.visited.insert(id) {
            return Ok(());
        }
        match self.arena.get(id).kind.clone() {
            NodeKind::Integer(_) => self.arena.get_mut(id).meta.ty = Type::Integer,
            NodeKind::Fractional(_) => self.arena.get_mut(id).meta.ty = Type::Fractional,
            NodeKind::Boolean(_) => self.arena.get_mut(id).meta.ty = Type::Boolean,
            NodeKind::StringLit(s) => {
                self.check(s.content)?;
                self.arena.get_mut(id).meta.ty = Type::String;
            }
            NodeKind::InterpolatedString(s) => {
                for item in &s.items {
                    if let crate::ir::InterpItem::Variable(v) = item {
                        self.check(*v)?;
                    }
                }
            }
            NodeKind::Variable(_) => {
                // Variable types are set by whichever Assignment or
                // Location first establishes them; visiting it bare
                // (e.g. as a bound loop variable with no prior writes)
                // leaves it Undef until something constrains it.
            }
            NodeKind::Location(l) => {
                self.check(l.variable)?;
                if let Some(idx) = l.index {
                    self.check(idx)?;
                }
                let var_ty = self.arena.get(l.variable).meta.ty.clone();
                let ty = if l.index.is_some() { var_ty.element_type().clone() } else { var_ty };
                self.arena.get_mut(id).meta.ty = ty;
            }
            NodeKind::Assignment(a) => {
                self.check(a.target)?;
                let mut value_ty = Type::Undef;
                for &v in &a.values {
                    self.check(v)?;
                    let vt = self.arena.get(v).meta.ty.clone();
                    if !value_ty.is_undef() && vt != value_ty {
                        return Err(self.mismatch(v, format!("mixed types in array initialiser: {} vs {}", value_ty, vt)));
                    }
                    value_ty = vt;
                }
                let target_ty = if a.is_array_initializer() { Type::array_of(value_ty.clone()) } else { value_ty.clone() };
                let loc = self.arena.get(a.target).kind.as_location().clone();
                let var_ty = self.arena.get(loc.variable).meta.ty.clone();
                if !var_ty.is_undef() {
                    if !target_ty.is_undef() && var_ty != target_ty {
                        return Err(self.mismatch(id, format!("invalid type in assignment: variable is {}, value is {}", var_ty, target_ty)));
                    }
                } else {
                    self.arena.get_mut(loc.variable).meta.ty = target_ty.clone();
                    self.arena.get_mut(a.target).meta.ty = target_ty.clone();
                }
                self.arena.get_mut(id).meta.ty = self.arena.get(a.target).meta.ty.clone();
            }
            NodeKind::BinOp(b) => {
                self.check(b.left)?;
                self.check(b.right)?;
                self.propagate_if_undef(b.left, b.right);
                let lt = self.arena.get(b.left).meta.ty.clone();
                let rt = self.arena.get(b.right).meta.ty.clone();
                if !lt.is_undef() && !rt.is_undef() && lt != rt {
                    return Err(self.mismatch(id, format!("operand type mismatch: {} vs {}", lt, rt)));
                }
                let ty = if b.op.is_comparison() || b.op.is_logical() {
                    Type::Boolean
                } else {
                    lt
                };
                self.arena.get_mut(id).meta.ty = ty;
            }
            NodeKind::UnaryOp(u) => {
                self.check(u.operand)?;
                self.arena.get_mut(id).meta.ty = self.arena.get(u.operand).meta.ty.clone();
            }
            NodeKind::ForLoop(f) => {
                match f.source {
                    ForSource::Range { lower, upper } => {
                        self.check(lower)?;
                        self.check(upper)?;
                        self.propagate_if_undef(lower, upper);
                        let lt = self.arena.get(lower).meta.ty.clone();
                        let ut = self.arena.get(upper).meta.ty.clone();
                        if !lt.is_undef() && !ut.is_undef() && lt != ut {
                            return Err(self.mismatch(id, format!("for-loop bounds type mismatch: {} vs {}", lt, ut)));
                        }
                        self.arena.get_mut(f.variable).meta.ty = lt;
                    }
                    ForSource::Iterable(it) => {
                        self.check(it)?;
                        let elem_ty = self.arena.get(it).meta.ty.element_type().clone();
                        self.arena.get_mut(f.variable).meta.ty = elem_ty;
                    }
                }
                self.check(f.body)?;
            }
            NodeKind::IfStatement(i) => {
                for c in &i.clauses {
                    let pb = self.arena.get(*c).kind.as_predicated_block().clone();
                    self.check(pb.condition)?;
                    self.check(pb.body)?;
                }
                if let Some(e) = i.else_block {
                    self.check(e)?;
                }
            }
            NodeKind::Block(b) => {
                for &s in &b.statements {
                    self.check(s)?;
                }
            }
            NodeKind::FunctionCall(c) => {
                // Bind actual argument types onto the callee's formals
                // *before* checking the callee's body: a parameter-typed
                // return expression (e.g. `return x + y;`) needs the
                // formal's type already in place the first time the
                // callee is checked, or its return type infers `Undef`
                // and never gets fixed up (the visited-set keeps the
                // callee from being re-checked on a later call).
                let formal_args = self.arena.get(c.target).kind.as_function().args.clone();
                for (i, &arg_assign) in c.args.iter().enumerate() {
                    self.check(arg_assign)?;
                    if let Some(&formal) = formal_args.get(i) {
                        let actual_ty = self.arena.get(arg_assign).meta.ty.clone();
                        let formal_ty = self.arena.get(formal).meta.ty.clone();
                        if !formal_ty.is_undef() && !actual_ty.is_undef() && formal_ty != actual_ty {
                            return Err(self.mismatch(arg_assign, format!("argument type mismatch: expected {}, found {}", formal_ty, actual_ty)));
                        } else if formal_ty.is_undef() {
                            self.arena.get_mut(formal).meta.ty = actual_ty;
                        }
                    }
                }
                self.check(c.target)?;
                self.arena.get_mut(id).meta.ty = self.arena.get(c.target).meta.ty.clone();
            }
            NodeKind::ExternCall(e) => {
                self.check(e.body)?;
                self.arena.get_mut(id).meta.ty = Type::Undef;
            }
            NodeKind::IORedirection(io) => {
                for &s in &io.segments {
                    self.check(s)?;
                }
                self.arena.get_mut(id).meta.ty = Type::Undef;
            }
            NodeKind::ReturnStatement(r) => {
                if let Some(v) = r.value {
                    self.check(v)?;
                    let vt = self.arena.get(v).meta.ty.clone();
                    self.arena.get_mut(id).meta.ty = vt.clone();
                    let func_id = self.enclosing_function(id)?;
                    let func_ty = self.arena.get(func_id).meta.ty.clone();
                    if !func_ty.is_undef() && !vt.is_undef() && func_ty != vt {
                        return Err(self.mismatch(id, format!("conflicting return types for function: {} vs {}", func_ty, vt)));
                    }
                    if func_ty.is_undef() {
                        self.arena.get_mut(func_id).meta.ty = vt;
                    }
                }
            }
            NodeKind::LoopControlStatement(_) | NodeKind::ImportStatement(_) => {}
            NodeKind::Function(f) => {
                for &a in &f.args {
                    self.check(a)?;
                }
                if let Some(body) = f.body {
                    self.check(body)?;
                }
            }
            NodeKind::Module(_) | NodeKind::PredicatedBlock(_) => {
                // Visited directly through their owning Module/IfStatement.
            }
        }
        Ok(())
    }

    fn propagate_if_undef(&mut self, a: NodeId, b: NodeId) {
        let at = self.arena.get(a).meta.ty.clone();
        let bt = self.arena.get(b).meta.ty.clone();
        if at.is_undef() && !bt.is_undef() {
            self.arena.get_mut(a).meta.ty = bt;
        } else if bt.is_undef() && !at.is_undef() {
            self.arena.get_mut(b).meta.ty = at;
        }
    }

    /// Walks parent pointers from a `ReturnStatement` up to its
    /// enclosing `Function` (relies on the parent-wiring pass having
    /// already run).
    fn enclosing_function(&self, mut id: NodeId) -> Result<NodeId, BishError> {
        loop {
            let parent = self.arena.get(id).meta.parent.ok_or_else(|| {
                BishError::internal("return statement has no enclosing function (parent-wiring did not run)")
            })?;
            if matches!(self.arena.get(parent).kind, NodeKind::Function(_)) {
                return Ok(parent);
            }
            id = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn checked(src: &str) -> Result<crate::ir::Module, BishError> {
        let mut m = parse_module(src, "t.bish").map_err(BishError::from)?;
        let root = m.root;
        crate::passes::parent_wiring::run(&mut m.arena, root);
        let functions = m.module().functions.clone();
        let globals = m.module().global_variables.clone();
        run(&mut m.arena, &functions, &globals)?;
        Ok(m)
    }

    #[test]
    fn literal_and_binop_types_are_inferred() {
        let m = checked("a = 1; b = 2; c = a + b;").unwrap();
        let c_assign = m.module().global_variables[2];
        assert_eq!(m.arena.get(c_assign).meta.ty, Type::Integer);
    }

    #[test]
    fn comparison_yields_boolean() {
        let m = checked("a = 1 < 2;").unwrap();
        let assign = m.module().global_variables[0];
        assert_eq!(m.arena.get(assign).meta.ty, Type::Boolean);
    }

    #[test]
    fn mismatched_binop_operands_are_an_error() {
        assert!(checked(r#"a = 1 + "x";"#).is_err());
    }

    #[test]
    fn function_return_type_propagates_to_call_site() {
        let m = checked("def add(x, y) { return x + y; } c = add(1, 2);").unwrap();
        let c_assign = m.module().global_variables[2];
        assert_eq!(m.arena.get(c_assign).meta.ty, Type::Integer);
    }

    #[test]
    fn for_loop_over_array_gives_element_type_to_loop_variable() {
        let m = checked("a = [1, 2, 3]; for (x in a) { b = x + 1; }").unwrap();
        let main_body = m.arena.get(m.module().main).kind.as_function().body.unwrap();
        let for_stmt = m.arena.get(main_body).kind.as_block().statements[0];
        let for_node = m.arena.get(for_stmt).kind.as_for().clone();
        assert_eq!(m.arena.get(for_node.variable).meta.ty, Type::Integer);
    }
}
