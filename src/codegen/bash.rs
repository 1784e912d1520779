//! Bash code generator (spec.md §4.9).
//!
//! A recursive emitter over the IR, not a `Visitor` impl: unlike the
//! post-parse passes, almost every node kind needs to know the ambient
//! rendering context (are we inside `$(( ))`? building a call's argument
//! list? the condition of an `if`?) to choose correct Bash text, so the
//! emitter carries that context itself as explicit stacks rather than
//! pushing it through `walk_children`.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::error::BishError;
use crate::ir::{Arena, BinOpNode, BinOperator, ForSource, LocationNode, ModuleNode, NodeId, NodeKind, Type};

use super::buffer::LineOrientedBuffer;

pub fn generate(arena: &Arena, module: &ModuleNode, out: &mut dyn Write, library_mode: bool) -> Result<(), BishError> {
    let mut buf = LineOrientedBuffer::new(out);
    {
        let mut emitter = Emitter::new(arena, &mut buf);
        emitter.emit_module(module, library_mode)?;
    }
    buf.flush().map_err(|e| BishError::internal(format!("failed writing generated script: {e}")))
}

/// A small boolean stack with push-true/push-false/pop semantics,
/// matching spec.md §4.9's description of the generator's context
/// stacks (`block_braces`, `functioncall_wrap`, `quote_variable`,
/// `comparison_wrap`).
struct FlagStack(Vec<bool>);

impl FlagStack {
    fn new(initial: bool) -> Self {
        Self(vec![initial])
    }

    fn enable(&mut self) {
        self.0.push(true);
    }

    fn disable(&mut self) {
        self.0.push(false);
    }

    fn reset(&mut self) {
        self.0.pop();
    }

    fn top(&self) -> bool {
        *self.0.last().unwrap_or(&false)
    }
}

/// Per-function bookkeeping for [`Emitter::lexeme_for`]: Bash's `local`
/// is function-scoped, not block-scoped, so a loop variable that shadows
/// an outer one in Bish source must get a distinct Bash identifier
/// within the same function to avoid clobbering it.
#[derive(Default)]
struct FunctionScope {
    taken: HashSet<String>,
    chosen: HashMap<NodeId, String>,
}

struct Emitter<'a, 'w> {
    arena: &'a Arena,
    buf: &'a mut LineOrientedBuffer<'w>,
    quote_variable: FlagStack,
    functioncall_wrap: FlagStack,
    comparison_wrap: FlagStack,
    block_braces: FlagStack,
    let_scopes: Vec<FunctionScope>,
}

impl<'a, 'w> Emitter<'a, 'w> {
    fn new(arena: &'a Arena, buf: &'a mut LineOrientedBuffer<'w>) -> Self {
        Self {
            arena,
            buf,
            quote_variable: FlagStack::new(true),
            functioncall_wrap: FlagStack::new(false),
            comparison_wrap: FlagStack::new(false),
            block_braces: FlagStack::new(false),
            let_scopes: Vec::new(),
        }
    }

    // -- module / function / block --------------------------------------

    fn emit_module(&mut self, module: &ModuleNode, library_mode: bool) -> Result<(), BishError> {
        self.buf.write_str("# Generated by the Bish compiler. Do not edit by hand.");
        self.buf.end_line();

        for &f in &module.functions {
            if f == module.main {
                continue;
            }
            self.emit_function(f)?;
        }
        if !library_mode {
            self.emit_function(module.main)?;
        }

        self.buf.write_str("args=( \"$0\" \"$@\" );");
        self.buf.end_line();

        for &g in &module.global_variables {
            self.emit_statement(g)?;
        }

        if !library_mode {
            let main_name = self.arena.get(module.main).kind.as_function().name.render("_");
            self.buf.write_str(&main_name);
            self.buf.write_str(";");
            self.buf.end_line();
        }
        Ok(())
    }

    fn emit_function(&mut self, f: NodeId) -> Result<(), BishError> {
        let func = self.arena.get(f).kind.as_function().clone();
        let Some(body) = func.body else {
            return Err(BishError::internal(format!("unresolved function '{}' reached codegen", func.name)));
        };

        let fname = func.name.render("_");
        self.buf.write_str(&format!("function {fname} ()"));
        self.buf.end_line();
        self.buf.write_str("{");
        self.buf.end_line();
        self.buf.indent();
        self.let_scopes.push(FunctionScope::default());

        for (i, &arg) in func.args.iter().enumerate() {
            let lexeme = self.lexeme_for(arg);
            let surrogate = self.arena.get(arg).kind.as_variable().ref_surrogate;
            let line = if let Some(sref) = surrogate {
                let sname = self.lexeme_for(sref);
                format!("local {lexeme}=( \"${{{sname}[@]}}\" );")
            } else {
                format!("local {lexeme}=\"${}\";", i + 1)
            };
            self.buf.write_str(&line);
            self.buf.end_line();
        }

        let stmts = self.arena.get(body).kind.as_block().statements.clone();
        if stmts.is_empty() && func.args.is_empty() {
            self.buf.write_str(":");
            self.buf.write_str(";");
            self.buf.end_line();
        } else {
            for &s in &stmts {
                self.emit_statement(s)?;
            }
        }

        self.let_scopes.pop();
        self.buf.dedent();
        self.buf.write_str("}");
        self.buf.end_line();
        Ok(())
    }

    /// Emits a block's statements (no surrounding braces of its own);
    /// callers that need literal `{ }` wrap it themselves by consulting
    /// `block_braces`.
    fn emit_block(&mut self, block_id: NodeId) -> Result<(), BishError> {
        let wrap = self.block_braces.top();
        if wrap {
            self.buf.write_str("{");
            self.buf.end_line();
            self.buf.indent();
        }
        let stmts = self.arena.get(block_id).kind.as_block().statements.clone();
        if stmts.is_empty() {
            self.buf.write_str(":");
            self.buf.write_str(";");
            self.buf.end_line();
        } else {
            for &s in &stmts {
                self.emit_statement(s)?;
            }
        }
        if wrap {
            self.buf.dedent();
            self.buf.write_str("}");
            self.buf.end_line();
        }
        Ok(())
    }

    // -- statements -------------------------------------------------------

    fn emit_statement(&mut self, id: NodeId) -> Result<(), BishError> {
        match self.arena.get(id).kind.clone() {
            NodeKind::ImportStatement(_) => Ok(()),
            NodeKind::Assignment(_) => self.emit_assignment_stmt(id),
            NodeKind::FunctionCall(_) => {
                self.functioncall_wrap.disable();
                let text = self.expr(id)?;
                self.functioncall_wrap.reset();
                self.buf.write_str(&text);
                self.buf.write_str(";");
                self.buf.end_line();
                Ok(())
            }
            NodeKind::ExternCall(_) => {
                self.functioncall_wrap.disable();
                let text = self.expr(id)?;
                self.functioncall_wrap.reset();
                self.buf.write_str(&text);
                self.buf.write_str(";");
                self.buf.end_line();
                Ok(())
            }
            NodeKind::IORedirection(_) => {
                let text = self.expr(id)?;
                self.buf.write_str(&text);
                self.buf.write_str(";");
                self.buf.end_line();
                Ok(())
            }
            NodeKind::ReturnStatement(r) => self.emit_return(r.value),
            NodeKind::LoopControlStatement(l) => {
                let kw = match l.kind {
                    crate::ir::LoopControlKind::Break => "break",
                    crate::ir::LoopControlKind::Continue => "continue",
                };
                self.buf.write_str(kw);
                self.buf.write_str(";");
                self.buf.end_line();
                Ok(())
            }
            NodeKind::IfStatement(_) => self.emit_if(id),
            NodeKind::ForLoop(_) => self.emit_for(id),
            NodeKind::Block(_) => {
                self.block_braces.enable();
                let r = self.emit_block(id);
                self.block_braces.reset();
                r
            }
            other => Err(BishError::internal(format!("unexpected statement node in codegen: {other:?}"))),
        }
    }

    fn emit_assignment_stmt(&mut self, id: NodeId) -> Result<(), BishError> {
        let a = self.arena.get(id).kind.as_assignment().clone();
        let NodeKind::Location(loc) = self.arena.get(a.target).kind.clone() else {
            return Err(BishError::internal("assignment target is not a Location"));
        };
        let is_global = self.arena.get(loc.variable).kind.as_variable().is_global;
        let lexeme = self.lexeme_for(loc.variable);
        let prefix = if is_global { "" } else { "local " };

        self.functioncall_wrap.enable();
        let rhs = if a.is_array_initializer() {
            let mut vals = Vec::with_capacity(a.values.len());
            for &v in &a.values {
                vals.push(self.expr(v)?);
            }
            format!("( {} )", vals.join(" "))
        } else {
            let value_ty = self.arena.get(a.values[0]).meta.ty.clone();
            let text = self.expr(a.values[0])?;
            if value_ty.is_array() {
                format!("( {text} )")
            } else {
                text
            }
        };
        self.functioncall_wrap.reset();

        let line = if let Some(idx) = loc.index {
            self.quote_variable.disable();
            let idx_text = self.expr(idx)?;
            self.quote_variable.reset();
            format!("{prefix}{lexeme}[{idx_text}]={rhs};")
        } else {
            format!("{prefix}{lexeme}={rhs};")
        };
        self.buf.write_str(&line);
        self.buf.end_line();
        Ok(())
    }

    fn emit_return(&mut self, value: Option<NodeId>) -> Result<(), BishError> {
        match value {
            None => {
                self.buf.write_str("return;");
                self.buf.end_line();
            }
            Some(v) => {
                let NodeKind::ExternCall(e) = self.arena.get(v).kind.clone() else {
                    return Err(BishError::internal("return-value lowering left a non-extern value on a return"));
                };
                let body = self.render_interp_raw(e.body)?;
                self.buf.write_str(&format!("echo \"$({body})\";"));
                self.buf.end_line();
                self.buf.write_str("exit;");
                self.buf.end_line();
            }
        }
        Ok(())
    }

    fn emit_if(&mut self, id: NodeId) -> Result<(), BishError> {
        let ifs = self.arena.get(id).kind.as_if().clone();
        for (i, &clause) in ifs.clauses.iter().enumerate() {
            let pb = self.arena.get(clause).kind.as_predicated_block().clone();
            let cond = self.render_condition(pb.condition)?;
            let kw = if i == 0 { "if" } else { "elif" };
            self.buf.write_str(&format!("{kw} [[ {cond} ]]; then"));
            self.buf.end_line();
            self.buf.indent();
            self.block_braces.disable();
            self.emit_block(pb.body)?;
            self.block_braces.reset();
            self.buf.dedent();
        }
        if let Some(e) = ifs.else_block {
            self.buf.write_str("else");
            self.buf.end_line();
            self.buf.indent();
            self.block_braces.disable();
            self.emit_block(e)?;
            self.block_braces.reset();
            self.buf.dedent();
        }
        self.buf.write_str("fi");
        self.buf.end_line();
        Ok(())
    }

    fn emit_for(&mut self, id: NodeId) -> Result<(), BishError> {
        let f = self.arena.get(id).kind.as_for().clone();
        let var_lexeme = self.lexeme_for(f.variable);
        self.buf.write_str(&format!("local {var_lexeme};"));
        self.buf.end_line();

        let header = match f.source {
            ForSource::Range { lower, upper } => {
                self.quote_variable.disable();
                let lo = self.expr(lower)?;
                let hi = self.expr(upper)?;
                self.quote_variable.reset();
                format!("for {var_lexeme} in $(seq {lo} {hi}); do")
            }
            ForSource::Iterable(it) => {
                let is_array = self.arena.get(it).meta.ty.is_array();
                if is_array {
                    if let NodeKind::Location(loc) = self.arena.get(it).kind.clone() {
                        let arr_lexeme = self.lexeme_for(loc.variable);
                        format!("for {var_lexeme} in \"${{{arr_lexeme}[@]}}\"; do")
                    } else {
                        let text = self.expr(it)?;
                        format!("for {var_lexeme} in {text}; do")
                    }
                } else {
                    let text = self.expr(it)?;
                    format!("for {var_lexeme} in {text}; do")
                }
            }
        };
        self.buf.write_str(&header);
        self.buf.end_line();
        self.buf.indent();
        self.block_braces.disable();
        self.emit_block(f.body)?;
        self.block_braces.reset();
        self.buf.dedent();
        self.buf.write_str("done");
        self.buf.end_line();
        Ok(())
    }

    // -- expressions --------------------------------------------------------

    fn expr(&mut self, id: NodeId) -> Result<String, BishError> {
        match self.arena.get(id).kind.clone() {
            NodeKind::Integer(n) => Ok(n.value.to_string()),
            NodeKind::Fractional(n) => Ok(n.value.to_string()),
            NodeKind::Boolean(b) => Ok(if b.value { "1".to_string() } else { "0".to_string() }),
            NodeKind::StringLit(s) => {
                let body = self.render_interp(s.content)?;
                Ok(format!("\"{body}\""))
            }
            NodeKind::Location(l) => self.read_location(&l),
            NodeKind::BinOp(b) if b.op.is_comparison() => {
                let raw = self.comparison_raw(&b)?;
                if self.comparison_wrap.top() {
                    Ok(format!("$([[ {raw} ]] && echo 1 || echo 0)"))
                } else {
                    Ok(raw)
                }
            }
            NodeKind::BinOp(b) if b.op.is_logical() => {
                let raw = self.logical_raw(id)?;
                Ok(format!("$([[ {raw} ]] && echo 1 || echo 0)"))
            }
            NodeKind::BinOp(b) => {
                self.quote_variable.disable();
                let l = self.expr(b.left)?;
                let r = self.expr(b.right)?;
                self.quote_variable.reset();
                let op = arithmetic_op(b.op);
                Ok(format!("$(( {l} {op} {r} ))"))
            }
            NodeKind::UnaryOp(u) if u.op == crate::ir::UnaryOperator::Negate => {
                self.quote_variable.disable();
                let operand = self.expr(u.operand)?;
                self.quote_variable.reset();
                Ok(format!("$(( -{operand} ))"))
            }
            NodeKind::UnaryOp(u) => {
                let raw = self.logical_raw(u.operand)?;
                Ok(format!("$(! [[ {raw} ]] && echo 1 || echo 0)"))
            }
            NodeKind::FunctionCall(_) => self.render_call(id),
            NodeKind::ExternCall(e) => {
                let body = self.render_interp_raw(e.body)?;
                if self.functioncall_wrap.top() {
                    Ok(format!("$( {body} )"))
                } else {
                    Ok(body)
                }
            }
            NodeKind::IORedirection(io) => {
                self.functioncall_wrap.disable();
                let mut parts = Vec::with_capacity(io.segments.len());
                for &s in &io.segments {
                    parts.push(self.expr(s)?);
                }
                self.functioncall_wrap.reset();
                Ok(format!("$( {} )", parts.join(" | ")))
            }
            other => Err(BishError::internal(format!("unexpected node in expression position: {other:?}"))),
        }
    }

    /// Raw (unwrapped) text for a single comparison, safe to embed
    /// directly inside `[[ ]]` or combine with `&&`/`||`.
    fn comparison_raw(&mut self, b: &BinOpNode) -> Result<String, BishError> {
        self.quote_variable.disable();
        let l = self.expr(b.left)?;
        let r = self.expr(b.right)?;
        self.quote_variable.reset();

        let is_string = matches!(self.arena.get(b.left).meta.ty, Type::String) || matches!(self.arena.get(b.right).meta.ty, Type::String);
        let op = comparison_op(b.op, is_string);
        Ok(format!("{l} {op} {r}"))
    }

    /// Recursively builds the flat, never-self-wrapped raw predicate
    /// text for a comparison or logical chain, falling back to
    /// `<value> -eq 1` for anything else — the shared core of `And`/`Or`
    /// composition and of `Not`'s operand (spec.md §4.9).
    fn logical_raw(&mut self, id: NodeId) -> Result<String, BishError> {
        match self.arena.get(id).kind.clone() {
            NodeKind::BinOp(b) if b.op.is_comparison() => self.comparison_raw(&b),
            NodeKind::BinOp(b) if b.op.is_logical() => {
                let l = self.logical_raw(b.left)?;
                let r = self.logical_raw(b.right)?;
                let j = if b.op == BinOperator::And { "&&" } else { "||" };
                Ok(format!("{l} {j} {r}"))
            }
            _ => {
                let v = self.expr(id)?;
                Ok(format!("{v} -eq 1"))
            }
        }
    }

    /// An `if` condition: `comparison_wrap` is disabled so a plain
    /// comparison renders raw (the brackets themselves are the
    /// comparator); anything else — a logical chain, which always
    /// self-wraps into a captured 0/1 value, or a bare value — is
    /// compared against `1`.
    fn render_condition(&mut self, id: NodeId) -> Result<String, BishError> {
        let is_plain_comparison = matches!(&self.arena.get(id).kind, NodeKind::BinOp(b) if b.op.is_comparison());
        self.comparison_wrap.disable();
        self.functioncall_wrap.enable();
        let text = self.expr(id)?;
        self.functioncall_wrap.reset();
        self.comparison_wrap.reset();
        if is_plain_comparison {
            Ok(text)
        } else {
            Ok(format!("{text} -eq 1"))
        }
    }

    fn render_call(&mut self, call_id: NodeId) -> Result<String, BishError> {
        let call = self.arena.get(call_id).kind.as_function_call().clone();
        let func = self.arena.get(call.target).kind.as_function().clone();
        let mut parts = vec![func.name.render("_")];

        for (i, &arg_assign) in call.args.iter().enumerate() {
            let is_surrogate = func
                .args
                .get(i)
                .map(|&f| self.arena.get(f).kind.as_variable().ref_surrogate.is_some())
                .unwrap_or(false);
            if is_surrogate {
                continue;
            }
            let target = self.arena.get(arg_assign).kind.as_assignment().target;
            let NodeKind::Location(loc) = self.arena.get(target).kind.clone() else {
                return Err(BishError::internal("call argument assignment target is not a Location"));
            };
            self.quote_variable.enable();
            let text = self.read_location(&loc)?;
            self.quote_variable.reset();
            parts.push(text);
        }

        let joined = parts.join(" ");
        if self.functioncall_wrap.top() {
            Ok(format!("$( {joined} )"))
        } else {
            Ok(joined)
        }
    }

    fn read_location(&mut self, l: &LocationNode) -> Result<String, BishError> {
        let quote = self.quote_variable.top();
        let ty = self.arena.get(l.variable).meta.ty.clone();
        let lexeme = self.lexeme_for(l.variable);

        let unquoted = match (&ty, l.index) {
            (Type::Array(_), None) => format!("${{{lexeme}[@]}}"),
            (_, Some(idx)) => {
                self.quote_variable.disable();
                let idx_text = self.expr(idx)?;
                self.quote_variable.reset();
                format!("${{{lexeme}[{idx_text}]}}")
            }
            (_, None) => format!("${lexeme}"),
        };
        Ok(if quote { format!("\"{unquoted}\"") } else { unquoted })
    }

    fn render_interp(&mut self, content_id: NodeId) -> Result<String, BishError> {
        let items = self.arena.get(content_id).kind.as_interp().items.clone();
        let mut out = String::new();
        for item in items {
            match item {
                crate::ir::InterpItem::Literal(s) => out.push_str(&escape_in_dquotes(&s)),
                crate::ir::InterpItem::Raw(s) => out.push_str(&s),
                crate::ir::InterpItem::Variable(loc_id) => {
                    let NodeKind::Location(l) = self.arena.get(loc_id).kind.clone() else {
                        return Err(BishError::internal("interpolation item is not a Location"));
                    };
                    self.quote_variable.disable();
                    let text = self.read_location(&l)?;
                    self.quote_variable.reset();
                    out.push_str(&text);
                }
            }
        }
        Ok(out)
    }

    /// Same as [`render_interp`] but with no surrounding string quotes
    /// and no escaping of literal text — used for `ExternCall` bodies,
    /// which are already standalone shell fragments.
    fn render_interp_raw(&mut self, content_id: NodeId) -> Result<String, BishError> {
        let items = self.arena.get(content_id).kind.as_interp().items.clone();
        let mut out = String::new();
        for item in items {
            match item {
                crate::ir::InterpItem::Literal(s) => out.push_str(&s),
                crate::ir::InterpItem::Raw(s) => out.push_str(&s),
                crate::ir::InterpItem::Variable(loc_id) => {
                    let NodeKind::Location(l) = self.arena.get(loc_id).kind.clone() else {
                        return Err(BishError::internal("interpolation item is not a Location"));
                    };
                    let text = self.read_location(&l)?;
                    out.push_str(&text);
                }
            }
        }
        Ok(out)
    }

    /// Resolves (and, on first use, assigns) the Bash identifier for a
    /// `Variable`. Globals use their bare name everywhere; locals are
    /// disambiguated per-function since Bash `local` doesn't nest with
    /// Bish's block scoping.
    fn lexeme_for(&mut self, var_id: NodeId) -> String {
        let var = self.arena.get(var_id).kind.as_variable();
        let bare = var.name.bare().to_string();
        if var.is_global {
            return bare;
        }
        let Some(scope) = self.let_scopes.last_mut() else {
            return bare;
        };
        if let Some(existing) = scope.chosen.get(&var_id) {
            return existing.clone();
        }
        let chosen = if scope.taken.insert(bare.clone()) { bare } else { format!("{bare}_{var_id}") };
        scope.chosen.insert(var_id, chosen.clone());
        chosen
    }
}

fn arithmetic_op(op: BinOperator) -> &'static str {
    match op {
        BinOperator::Add => "+",
        BinOperator::Sub => "-",
        BinOperator::Mul => "*",
        BinOperator::Div => "/",
        BinOperator::Mod => "%",
        _ => unreachable!("arithmetic_op called on non-arithmetic operator"),
    }
}

fn comparison_op(op: BinOperator, is_string: bool) -> &'static str {
    match (op, is_string) {
        (BinOperator::Eq, true) => "==",
        (BinOperator::Ne, true) => "!=",
        (BinOperator::Lt, true) => "<",
        (BinOperator::Gt, true) => ">",
        (BinOperator::Le, true) => "-le",
        (BinOperator::Ge, true) => "-ge",
        (BinOperator::Eq, false) => "-eq",
        (BinOperator::Ne, false) => "-ne",
        (BinOperator::Lt, false) => "-lt",
        (BinOperator::Le, false) => "-le",
        (BinOperator::Gt, false) => "-gt",
        (BinOperator::Ge, false) => "-ge",
        _ => unreachable!("comparison_op called on non-comparison operator"),
    }
}

fn escape_in_dquotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes;
    use crate::parser::parse_module;
    use crate::util::UniqueNamer;

    fn lowered(src: &str) -> crate::ir::Module {
        let mut m = parse_module(src, "t.bish").unwrap();
        let root = m.root;
        passes::parent_wiring::run(&mut m.arena, root);
        let functions = m.module().functions.clone();
        let globals = m.module().global_variables.clone();
        passes::type_check::run(&mut m.arena, &functions, &globals).unwrap();
        let mut namer = UniqueNamer::new();
        passes::by_reference::run(&mut m.arena, &functions, &globals, &mut namer);
        let mut globals_mut = m.module().global_variables.clone();
        passes::return_value::run(&mut m.arena, &functions, &mut globals_mut, &mut namer);
        m.module_mut().global_variables = globals_mut;
        m
    }

    fn generated(src: &str, library_mode: bool) -> String {
        let m = lowered(src);
        let mut out = Vec::new();
        generate(&m.arena, m.module(), &mut out, library_mode).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn simple_arithmetic_assignment() {
        let out = generated("a = 1 + 2;", false);
        assert!(out.contains("a=$(( 1 + 2 ));"), "{out}");
        assert!(out.contains("args=( \"$0\" \"$@\" );"), "{out}");
        assert!(out.contains("main;"), "{out}");
    }

    #[test]
    fn function_call_with_return_value() {
        let out = generated("def add(x, y) { return x + y; } c = add(1, 2);", false);
        assert!(out.contains("function add ()"), "{out}");
        assert!(out.contains("local x=\"$1\";"), "{out}");
        assert!(out.contains("local y=\"$2\";"), "{out}");
        assert!(out.lines().any(|l| l.trim_start().starts_with("add \"$_") && l.trim_end().ends_with(';')), "{out}");
    }

    #[test]
    fn array_iteration_uses_quoted_expansion() {
        let out = generated("a = [1, 2, 3]; for (x in a) { b = x; }", false);
        assert!(out.contains("a=( 1 2 3 );"), "{out}");
        assert!(out.contains("for x in \"${a[@]}\"; do"), "{out}");
    }

    #[test]
    fn logical_and_condition_is_lifted_and_compared_to_one() {
        let out = generated("if (1 < 2 and 2 < 3) { a = 1; }", false);
        assert!(out.contains("if [[ $([[ 1 -lt 2 && 2 -lt 3 ]] && echo 1 || echo 0) -eq 1 ]]; then"), "{out}");
    }

    #[test]
    fn plain_comparison_condition_stays_raw() {
        let out = generated("if (1 < 2) { a = 1; }", false);
        assert!(out.contains("if [[ 1 -lt 2 ]]; then"), "{out}");
    }

    #[test]
    fn extern_pipe_is_captured() {
        let out = generated(r#"dir = "/tmp"; a = @(ls $dir | wc -l);"#, false);
        assert!(out.contains("$( ls \"$dir\" | wc -l )") || out.contains("ls \"$dir\" | wc -l"), "{out}");
    }

    #[test]
    fn empty_function_body_injects_a_noop() {
        let out = generated("def nothing() { } nothing();", false);
        assert!(out.contains(":"), "{out}");
    }

    #[test]
    fn library_mode_omits_main_but_keeps_the_seed() {
        let out = generated("def f() { return @(echo hi); } a = 1;", true);
        assert!(!out.contains("function main ()"), "{out}");
        assert!(!out.trim_end().ends_with("main;"), "{out}");
        assert!(out.contains("args=( \"$0\" \"$@\" );"), "{out}");
    }

    #[test]
    fn array_parameter_reads_from_its_surrogate() {
        let out = generated("def sum(arr) { return arr[0]; } a = [1,2,3]; x = sum(a);", false);
        assert!(out.contains("local arr=( \"${_global_ref_1[@]}\" );"), "{out}");
        assert!(!out.contains("sum arr"), "{out}");
    }

    #[test]
    fn shadowed_loop_variables_get_distinct_lexemes() {
        let out = generated("def f() { for (i in 1..2) { a = i; } for (i in 3..4) { b = i; } }", true);
        assert!(out.matches("local i").count() >= 1, "{out}");
    }
}
