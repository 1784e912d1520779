//! Recursive-descent parser: grammar → IR, building symbol tables
//! in-flight (spec.md §4.2).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ir::{
    Arena, AssignmentNode, BinOpNode, BinOperator, BooleanNode, DebugInfo, ExternCallNode,
    ForLoopNode, ForSource, FractionalNode, FunctionCallNode, FunctionNode, IORedirectionKind,
    IORedirectionNode, IfStatementNode, ImportStatementNode, InterpItem, InterpolatedStringNode,
    IntegerNode, LocationNode, LoopControlKind, LoopControlStatementNode, Module, ModuleNode,
    Name, Node, NodeId, NodeKind, PredicatedBlockNode, ReturnStatementNode, StringNode, Type,
    UnaryOpNode, UnaryOperator,
};
use crate::lexer::{LexError, Token, TokenType, Tokenizer};
use crate::util::UniqueNamer;

use super::error::ParseError;
use super::scope::ParseScope;

/// Entry point: parses `source` (the contents of `path`) into a
/// `Module`. The source is treated as if wrapped in a synthetic outer
/// `{ … }` — the whole file becomes the body of a synthetic `main`.
pub fn parse_module(source: &str, path: impl AsRef<Path>) -> Result<Module, ParseError> {
    let path_buf = path.as_ref().to_path_buf();
    let path_rc: Rc<str> = Rc::from(path_buf.to_string_lossy().into_owned());
    let namespace_id = namespace_id_from_path(&path_buf);

    let mut parser = Parser::new(source, path_rc.clone());

    let args_debug = parser.here();
    let args_id = parser.scope.declare(&mut parser.arena, "args", args_debug);
    parser.arena.get_mut(args_id).meta.ty = Type::array_of(Type::String);
    parser.namer.mark_used("args");

    let main_debug = parser.here();
    let main_id = parser.arena.alloc(Node::new(
        main_debug,
        NodeKind::Function(FunctionNode {
            name: Name::new("main"),
            args: Vec::new(),
            body: None,
            retval_global: None,
        }),
    ));
    parser.scope.register_function("main".to_string(), main_id);

    let main_block = parser.parse_top_level()?;
    parser.arena.get_mut(main_id).kind.as_function_mut().body = Some(main_block);

    let globals = extract_globals(&mut parser.arena, main_block);
    let functions: Vec<NodeId> = parser.scope.functions().values().copied().collect();

    let module_debug = DebugInfo::new(path_rc, 1, 0, 0);
    let module_id = parser.arena.alloc(Node::new(
        module_debug,
        NodeKind::Module(ModuleNode {
            functions,
            global_variables: globals,
            main: main_id,
            path: path_buf,
            namespace_id,
        }),
    ));

    Ok(Module { arena: parser.arena, root: module_id })
}

fn namespace_id_from_path(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "module".to_string())
}

/// After parsing the synthetic `main` body, moves the *first* assignment
/// to each distinct variable at module (top-level) scope into the
/// returned list of global-variable assignments, leaving subsequent
/// reassignments of the same variable in place.
fn extract_globals(arena: &mut Arena, main_block: NodeId) -> Vec<NodeId> {
    let original = arena.get(main_block).kind.as_block().statements.clone();
    let mut seen = HashSet::new();
    let mut remaining = Vec::new();
    let mut globals = Vec::new();

    for stmt_id in original {
        let assign_var = match &arena.get(stmt_id).kind {
            NodeKind::Assignment(a) => Some(arena.get(a.target).kind.as_location().variable),
            _ => None,
        };
        match assign_var {
            Some(var_id) if seen.insert(var_id) => {
                arena.get_mut(var_id).kind.as_variable_mut().is_global = true;
                globals.push(stmt_id);
            }
            _ => remaining.push(stmt_id),
        }
    }

    arena.get_mut(main_block).kind.as_block_mut().statements = remaining;
    globals
}

pub struct Parser {
    tok: Tokenizer,
    path: Rc<str>,
    arena: Arena,
    scope: ParseScope,
    stmt_buffers: Vec<Vec<NodeId>>,
    namer: UniqueNamer,
}

impl Parser {
    fn new(source: &str, path: Rc<str>) -> Self {
        Self {
            tok: Tokenizer::new(source),
            path,
            arena: Arena::new(),
            scope: ParseScope::new(),
            stmt_buffers: Vec::new(),
            namer: UniqueNamer::new(),
        }
    }

    // -- token-stream plumbing -------------------------------------------------

    fn here(&mut self) -> DebugInfo {
        let line = self.tok.peek().map(|t| t.line).unwrap_or_else(|_| self.tok.line());
        DebugInfo::new(self.path.clone(), line, self.tok.offset(), self.tok.offset())
    }

    fn lex_err(&self, e: LexError) -> ParseError {
        ParseError::new(e.message, self.path.clone(), e.line, e.column)
    }

    fn peek_ty(&mut self) -> Result<TokenType, ParseError> {
        self.tok.peek().map(|t| t.ty).map_err(|e| self.lex_err(e))
    }

    fn check(&mut self, ty: TokenType) -> Result<bool, ParseError> {
        Ok(self.peek_ty()? == ty)
    }

    fn advance_tok(&mut self) -> Result<Token, ParseError> {
        self.tok.next().map_err(|e| self.lex_err(e))
    }

    fn expect(&mut self, ty: TokenType) -> Result<Token, ParseError> {
        let tok = self.advance_tok()?;
        if tok.ty != ty {
            return Err(ParseError::with_token(
                format!("expected {:?}, found {:?} ({:?})", ty, tok.ty, tok.lexeme),
                self.path.clone(),
                tok.line,
                tok.column,
                tok.clone(),
            ));
        }
        Ok(tok)
    }

    fn expect_symbol_text(&mut self) -> Result<String, ParseError> {
        Ok(self.expect(TokenType::Symbol)?.lexeme)
    }

    fn error_here(&mut self, msg: impl Into<String>) -> ParseError {
        let d = self.here();
        ParseError::new(msg.into(), self.path.clone(), d.line, 0)
    }

    fn error_at(&self, d: &DebugInfo, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg.into(), self.path.clone(), d.line, 0)
    }

    fn declare_var(&mut self, name: &str, debug: DebugInfo) -> NodeId {
        self.namer.mark_used(name.to_string());
        self.scope.declare(&mut self.arena, name, debug)
    }

    fn declare_or_lookup_var(&mut self, name: &str, debug: DebugInfo) -> NodeId {
        self.namer.mark_used(name.to_string());
        self.scope.lookup_or_new_var(&mut self.arena, name, debug)
    }

    fn current_block_mut(&mut self) -> &mut Vec<NodeId> {
        self.stmt_buffers.last_mut().expect("statement parsed outside of any block")
    }

    // -- blocks & top level -----------------------------------------------------

    fn parse_top_level(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.stmt_buffers.push(Vec::new());
        while !self.check(TokenType::EOS)? {
            if let Some(id) = self.parse_stmt()? {
                self.current_block_mut().push(id);
            }
        }
        let statements = self.stmt_buffers.pop().expect("just pushed above");
        Ok(self.arena.alloc(Node::new(debug, NodeKind::Block(crate::ir::BlockNode { statements }))))
    }

    fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::LBrace)?;
        self.scope.push_block();
        self.stmt_buffers.push(Vec::new());
        while !self.check(TokenType::RBrace)? {
            if self.check(TokenType::EOS)? {
                self.scope.pop_block();
                self.stmt_buffers.pop();
                return Err(self.error_at(&debug, "unterminated block, expected '}'"));
            }
            if let Some(id) = self.parse_stmt()? {
                self.current_block_mut().push(id);
            }
        }
        self.expect(TokenType::RBrace)?;
        let statements = self.stmt_buffers.pop().expect("just pushed above");
        self.scope.pop_block();
        Ok(self.arena.alloc(Node::new(debug, NodeKind::Block(crate::ir::BlockNode { statements }))))
    }

    // -- statements ---------------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Option<NodeId>, ParseError> {
        match self.peek_ty()? {
            TokenType::Import => self.parse_import(),
            TokenType::Return => self.parse_return(),
            TokenType::Break => self.parse_loop_control(LoopControlKind::Break),
            TokenType::Continue => self.parse_loop_control(LoopControlKind::Continue),
            TokenType::If => self.parse_if().map(Some),
            TokenType::For => self.parse_for().map(Some),
            TokenType::Def => {
                self.parse_def()?;
                Ok(None)
            }
            TokenType::LBrace => self.parse_block().map(Some),
            TokenType::At => {
                let id = self.parse_externcall()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Some(id))
            }
            TokenType::Symbol => self.parse_assign_or_call().map(Some),
            other => {
                let tok = self.advance_tok()?;
                Err(ParseError::with_token(
                    format!("unexpected token {:?} at start of statement", other),
                    self.path.clone(),
                    tok.line,
                    tok.column,
                    tok,
                ))
            }
        }
    }

    fn parse_import(&mut self) -> Result<Option<NodeId>, ParseError> {
        let debug = self.here();
        self.expect(TokenType::Import)?;
        let name = self.expect_symbol_text()?;
        self.expect(TokenType::Semicolon)?;
        Ok(Some(self.arena.alloc(Node::new(debug, NodeKind::ImportStatement(ImportStatementNode { name })))))
    }

    fn parse_return(&mut self) -> Result<Option<NodeId>, ParseError> {
        let debug = self.here();
        self.expect(TokenType::Return)?;
        let value = if self.check(TokenType::Semicolon)? { None } else { Some(self.parse_expr()?) };
        self.expect(TokenType::Semicolon)?;
        Ok(Some(self.arena.alloc(Node::new(debug, NodeKind::ReturnStatement(ReturnStatementNode { value })))))
    }

    fn parse_loop_control(&mut self, kind: LoopControlKind) -> Result<Option<NodeId>, ParseError> {
        let debug = self.here();
        self.advance_tok()?;
        self.expect(TokenType::Semicolon)?;
        Ok(Some(self.arena.alloc(Node::new(debug, NodeKind::LoopControlStatement(LoopControlStatementNode { kind })))))
    }

    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::If)?;
        let mut clauses = vec![self.parse_if_clause()?];
        let mut else_block = None;
        loop {
            if !self.check(TokenType::Else)? {
                break;
            }
            self.advance_tok()?;
            if self.check(TokenType::If)? {
                self.advance_tok()?;
                clauses.push(self.parse_if_clause()?);
                continue;
            }
            else_block = Some(self.parse_block()?);
            break;
        }
        Ok(self.arena.alloc(Node::new(debug, NodeKind::IfStatement(IfStatementNode { clauses, else_block }))))
    }

    fn parse_if_clause(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenType::RParen)?;
        let body = self.parse_block()?;
        Ok(self.arena.alloc(Node::new(debug, NodeKind::PredicatedBlock(PredicatedBlockNode { condition, body }))))
    }

    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::For)?;
        self.expect(TokenType::LParen)?;
        let var_debug = self.here();
        let var_name = self.expect_symbol_text()?;
        self.expect(TokenType::In)?;
        let first = self.parse_atom()?;
        let source = if self.check(TokenType::DoubleDot)? {
            self.advance_tok()?;
            let upper = self.parse_atom()?;
            ForSource::Range { lower: first, upper }
        } else {
            ForSource::Iterable(first)
        };
        self.expect(TokenType::RParen)?;

        self.scope.push_block();
        let variable = self.declare_var(&var_name, var_debug);
        let body = self.parse_block()?;
        self.scope.pop_block();

        Ok(self.arena.alloc(Node::new(debug, NodeKind::ForLoop(ForLoopNode { variable, source, body }))))
    }

    fn parse_def(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::Def)?;
        let name = self.parse_qname_raw()?;
        if name.qualifiers().is_empty() && name.bare() == "main" {
            return Err(self.error_at(&debug, "cannot redefine the reserved 'main' function"));
        }
        self.expect(TokenType::LParen)?;
        self.scope.push_block();
        let mut args = Vec::new();
        if !self.check(TokenType::RParen)? {
            loop {
                let pdebug = self.here();
                let pname = self.expect_symbol_text()?;
                args.push(self.declare_var(&pname, pdebug));
                if self.check(TokenType::Comma)? {
                    self.advance_tok()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        let func_id = self.scope.lookup_or_new_function(&mut self.arena, name.clone(), debug.clone());
        if !self.arena.get(func_id).kind.as_function().is_dummy() {
            self.scope.pop_block();
            return Err(self.error_at(&debug, format!("function '{}' is already defined", name)));
        }

        let body = self.parse_block()?;
        self.scope.pop_block();

        let f = self.arena.get_mut(func_id).kind.as_function_mut();
        f.args = args;
        f.body = Some(body);

        Ok(func_id)
    }

    fn parse_assign_or_call(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        let name = self.parse_qname_raw()?;
        if self.check(TokenType::LParen)? {
            let call_id = self.parse_funcall_tail(name, debug)?;
            self.expect(TokenType::Semicolon)?;
            return Ok(call_id);
        }

        let key = name.render(".");
        let var_id = self.declare_or_lookup_var(&key, debug.clone());
        let index = if self.check(TokenType::LBracket)? {
            self.advance_tok()?;
            let idx = self.parse_expr()?;
            self.expect(TokenType::RBracket)?;
            Some(idx)
        } else {
            None
        };
        let loc_id = self.arena.alloc(Node::new(debug.clone(), NodeKind::Location(LocationNode { variable: var_id, index })));
        self.expect(TokenType::Equals)?;

        let values = if self.check(TokenType::LBracket)? {
            self.advance_tok()?;
            let mut vs = Vec::new();
            if !self.check(TokenType::RBracket)? {
                loop {
                    vs.push(self.parse_expr()?);
                    if self.check(TokenType::Comma)? {
                        self.advance_tok()?;
                        continue;
                    }
                    break;
                }
            }
            self.expect(TokenType::RBracket)?;
            vs
        } else {
            vec![self.parse_expr()?]
        };

        let assign_id = self.arena.alloc(Node::new(debug, NodeKind::Assignment(AssignmentNode { target: loc_id, values })));
        self.expect(TokenType::Semicolon)?;
        Ok(assign_id)
    }

    // -- expressions ----------------------------------------------------------

    fn parse_expr(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        let mut segments = vec![self.parse_logical()?];
        while self.check(TokenType::Pipe)? {
            self.advance_tok()?;
            segments.push(self.parse_logical()?);
        }
        if segments.len() == 1 {
            Ok(segments.remove(0))
        } else {
            Ok(self.arena.alloc(Node::new(
                debug,
                NodeKind::IORedirection(IORedirectionNode { kind: IORedirectionKind::Pipe, segments }),
            )))
        }
    }

    fn parse_logical(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_equality()?;
        loop {
            let op = match self.peek_ty()? {
                TokenType::And => BinOperator::And,
                TokenType::Or => BinOperator::Or,
                _ => break,
            };
            let debug = self.here();
            self.advance_tok()?;
            let right = self.parse_equality()?;
            left = self.arena.alloc(Node::new(debug, NodeKind::BinOp(BinOpNode { op, left, right })));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<NodeId, ParseError> {
        let left = self.parse_relative()?;
        let op = match self.peek_ty()? {
            TokenType::DoubleEquals => Some(BinOperator::Eq),
            TokenType::NotEquals => Some(BinOperator::Ne),
            _ => None,
        };
        match op {
            Some(op) => {
                let debug = self.here();
                self.advance_tok()?;
                let right = self.parse_relative()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::BinOp(BinOpNode { op, left, right }))))
            }
            None => Ok(left),
        }
    }

    fn parse_relative(&mut self) -> Result<NodeId, ParseError> {
        let left = self.parse_arith()?;
        let op = match self.peek_ty()? {
            TokenType::LAngle => Some(BinOperator::Lt),
            TokenType::LAngleEquals => Some(BinOperator::Le),
            TokenType::RAngle => Some(BinOperator::Gt),
            TokenType::RAngleEquals => Some(BinOperator::Ge),
            _ => None,
        };
        match op {
            Some(op) => {
                let debug = self.here();
                self.advance_tok()?;
                let right = self.parse_arith()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::BinOp(BinOpNode { op, left, right }))))
            }
            None => Ok(left),
        }
    }

    fn parse_arith(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek_ty()? {
                TokenType::Plus => BinOperator::Add,
                TokenType::Minus => BinOperator::Sub,
                _ => break,
            };
            let debug = self.here();
            self.advance_tok()?;
            let right = self.parse_term()?;
            left = self.arena.alloc(Node::new(debug, NodeKind::BinOp(BinOpNode { op, left, right })));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<NodeId, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_ty()? {
                TokenType::Star => BinOperator::Mul,
                TokenType::Slash => BinOperator::Div,
                TokenType::Percent => BinOperator::Mod,
                _ => break,
            };
            let debug = self.here();
            self.advance_tok()?;
            let right = self.parse_unary()?;
            left = self.arena.alloc(Node::new(debug, NodeKind::BinOp(BinOpNode { op, left, right })));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        match self.peek_ty()? {
            TokenType::Minus => {
                self.advance_tok()?;
                let operand = self.parse_unary()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::UnaryOp(UnaryOpNode { op: UnaryOperator::Negate, operand }))))
            }
            TokenType::Not => {
                self.advance_tok()?;
                let operand = self.parse_unary()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::UnaryOp(UnaryOpNode { op: UnaryOperator::Not, operand }))))
            }
            _ => self.parse_factor(),
        }
    }

    fn parse_factor(&mut self) -> Result<NodeId, ParseError> {
        match self.peek_ty()? {
            TokenType::LParen => {
                self.advance_tok()?;
                let e = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                Ok(e)
            }
            TokenType::At => self.parse_externcall(),
            TokenType::Symbol => {
                let debug = self.here();
                let name = self.parse_qname_raw()?;
                if self.check(TokenType::LParen)? {
                    self.parse_funcall_tail(name, debug)
                } else {
                    self.finish_location(name, debug)
                }
            }
            _ => self.parse_atom(),
        }
    }

    /// `atom ::= location | NUM | '"' interp '"' | 'true' | 'false'`.
    fn parse_atom(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        match self.peek_ty()? {
            TokenType::Symbol => {
                let name = self.parse_qname_raw()?;
                self.finish_location(name, debug)
            }
            TokenType::Int => self.parse_integer(),
            TokenType::Fractional => self.parse_fractional(),
            TokenType::Quote => self.parse_string(),
            TokenType::True => {
                self.advance_tok()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::Boolean(BooleanNode { value: true }))))
            }
            TokenType::False => {
                self.advance_tok()?;
                Ok(self.arena.alloc(Node::new(debug, NodeKind::Boolean(BooleanNode { value: false }))))
            }
            other => Err(self.error_at(&debug, format!("expected a value, found {:?}", other))),
        }
    }

    fn finish_location(&mut self, name: Name, debug: DebugInfo) -> Result<NodeId, ParseError> {
        let key = name.render(".");
        let var_id = self.scope.get_defined_variable(&key, self.path.clone(), debug.line, 0)?;
        let index = if self.check(TokenType::LBracket)? {
            self.advance_tok()?;
            let idx = self.parse_expr()?;
            self.expect(TokenType::RBracket)?;
            Some(idx)
        } else {
            None
        };
        Ok(self.arena.alloc(Node::new(debug, NodeKind::Location(LocationNode { variable: var_id, index }))))
    }

    fn parse_qname_raw(&mut self) -> Result<Name, ParseError> {
        let first = self.expect_symbol_text()?;
        if self.check(TokenType::Dot)? {
            self.advance_tok()?;
            let second = self.expect_symbol_text()?;
            Ok(Name::with_qualifiers(vec![first], second))
        } else {
            Ok(Name::new(first))
        }
    }

    /// Parses the `'(' [exprlist] ')'` tail of a call whose `qname` has
    /// already been parsed, applying the call-site lowering invariant:
    /// every argument expression is hoisted into a fresh local
    /// assignment inserted into the enclosing block just before the
    /// call site (spec.md §3 / §4.2).
    fn parse_funcall_tail(&mut self, name: Name, debug: DebugInfo) -> Result<NodeId, ParseError> {
        self.expect(TokenType::LParen)?;
        let mut arg_exprs = Vec::new();
        if !self.check(TokenType::RParen)? {
            loop {
                arg_exprs.push(self.parse_expr()?);
                if self.check(TokenType::Comma)? {
                    self.advance_tok()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenType::RParen)?;

        let target = self.scope.lookup_or_new_function(&mut self.arena, name, debug.clone());

        let mut call_args = Vec::with_capacity(arg_exprs.len());
        for value in arg_exprs {
            let uname = self.namer.fresh("_");
            let var_id = self.declare_var(&uname, debug.clone());
            let loc_id = self.arena.alloc(Node::new(debug.clone(), NodeKind::Location(LocationNode { variable: var_id, index: None })));
            let assign_id = self.arena.alloc(Node::new(debug.clone(), NodeKind::Assignment(AssignmentNode { target: loc_id, values: vec![value] })));
            self.current_block_mut().push(assign_id);
            call_args.push(assign_id);
        }

        Ok(self.arena.alloc(Node::new(debug, NodeKind::FunctionCall(FunctionCallNode { target, args: call_args }))))
    }

    fn parse_integer(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        let tok = self.expect(TokenType::Int)?;
        let value: i64 = tok.lexeme.parse().map_err(|_| self.error_at(&debug, "invalid integer literal"))?;
        Ok(self.arena.alloc(Node::new(debug, NodeKind::Integer(IntegerNode { value }))))
    }

    fn parse_fractional(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        let tok = self.expect(TokenType::Fractional)?;
        let value: f64 = tok.lexeme.parse().map_err(|_| self.error_at(&debug, "invalid fractional literal"))?;
        Ok(self.arena.alloc(Node::new(debug, NodeKind::Fractional(FractionalNode { value }))))
    }

    fn parse_string(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::Quote)?;
        let items = self.parse_interp_items('"')?;
        match self.tok.consume_char() {
            Some('"') => {}
            _ => return Err(self.error_at(&debug, "unterminated string literal")),
        }
        let content = self.arena.alloc(Node::new(debug.clone(), NodeKind::InterpolatedString(InterpolatedStringNode { items })));
        Ok(self.arena.alloc(Node::new(debug, NodeKind::StringLit(StringNode { content }))))
    }

    fn parse_externcall(&mut self) -> Result<NodeId, ParseError> {
        let debug = self.here();
        self.expect(TokenType::At)?;
        self.expect(TokenType::LParen)?;
        let items = self.parse_interp_items(')')?;
        match self.tok.consume_char() {
            Some(')') => {}
            _ => return Err(self.error_at(&debug, "unterminated extern call")),
        }
        let body = self.arena.alloc(Node::new(debug.clone(), NodeKind::InterpolatedString(InterpolatedStringNode { items })));
        Ok(self.arena.alloc(Node::new(debug, NodeKind::ExternCall(ExternCallNode { body }))))
    }

    /// Scans raw text (bypassing normal tokenization) up to `closing`,
    /// splitting it into literal runs, `$qname` variable references, and
    /// opaque `$(any-balanced)` shell fragments.
    fn parse_interp_items(&mut self, closing: char) -> Result<Vec<InterpItem>, ParseError> {
        let debug = self.here();
        let mut items = Vec::new();
        loop {
            match self.tok.peek_char() {
                None => return Err(self.error_at(&debug, "unterminated interpolated string")),
                Some(c) if c == closing => break,
                Some('$') => {
                    self.tok.consume_char();
                    if self.tok.peek_char() == Some('(') {
                        self.tok.consume_char();
                        let inner = self.tok.scan_balanced_parens();
                        self.tok.consume_char();
                        items.push(InterpItem::Raw(format!("$({})", inner)));
                    } else {
                        let first = self.tok.scan_identifier();
                        if first.is_empty() {
                            return Err(self.error_at(&debug, "expected identifier after '$'"));
                        }
                        let key = if self.tok.peek_char() == Some('.') {
                            self.tok.consume_char();
                            let second = self.tok.scan_identifier();
                            format!("{}.{}", first, second)
                        } else {
                            first
                        };
                        let var_id = self.scope.get_defined_variable(&key, self.path.clone(), debug.line, 0)?;
                        let loc_id = self.arena.alloc(Node::new(debug.clone(), NodeKind::Location(LocationNode { variable: var_id, index: None })));
                        items.push(InterpItem::Variable(loc_id));
                    }
                }
                Some(_) => {
                    let text = self.tok.scan_until(&['$', closing], false);
                    if !text.is_empty() {
                        items.push(InterpItem::Literal(text));
                    }
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_assignment_is_hoisted_to_a_global() {
        let m = parse_module("x = 1 + 2;", "t.bish").unwrap();
        assert_eq!(m.module().global_variables.len(), 1);
        let main_body = m.module().main;
        let block = m.arena.get(m.arena.get(main_body).kind.as_function().body.unwrap()).kind.as_block();
        assert!(block.statements.is_empty());
    }

    #[test]
    fn reassignment_of_a_global_stays_in_main() {
        let m = parse_module("x = 1; x = 2;", "t.bish").unwrap();
        assert_eq!(m.module().global_variables.len(), 1);
        let main_body = m.arena.get(m.module().main).kind.as_function().body.unwrap();
        assert_eq!(m.arena.get(main_body).kind.as_block().statements.len(), 1);
    }

    #[test]
    fn call_arguments_are_lowered_to_local_assignments() {
        let m = parse_module("def add(a, b) { return a + b; } c = add(1, 2);", "t.bish").unwrap();
        // _1 = 1; _2 = 2; c = add(_1, _2) — all three are first-time
        // top-level assignments, so all three become globals.
        assert_eq!(m.module().global_variables.len(), 3);
        assert_eq!(m.module().functions.len(), 2); // main + add
    }

    #[test]
    fn undefined_variable_is_a_parse_error() {
        assert!(parse_module("y = x + 1;", "t.bish").is_err());
    }

    #[test]
    fn if_else_if_else_chain_parses_all_clauses() {
        let m = parse_module("if (true) { } else if (false) { } else { }", "t.bish").unwrap();
        let main_body = m.arena.get(m.module().main).kind.as_function().body.unwrap();
        let stmts = &m.arena.get(main_body).kind.as_block().statements;
        assert_eq!(stmts.len(), 1);
        let if_node = m.arena.get(stmts[0]).kind.as_if();
        assert_eq!(if_node.clauses.len(), 2);
        assert!(if_node.else_block.is_some());
    }

    #[test]
    fn for_loop_range_parses_lower_and_upper() {
        let m = parse_module("for (i in 1..5) { }", "t.bish").unwrap();
        let main_body = m.arena.get(m.module().main).kind.as_function().body.unwrap();
        let stmts = &m.arena.get(main_body).kind.as_block().statements;
        let for_node = m.arena.get(stmts[0]).kind.as_for();
        match &for_node.source {
            ForSource::Range { .. } => {}
            ForSource::Iterable(_) => panic!("expected a range source"),
        }
    }

    #[test]
    fn string_interpolation_splits_literal_variable_and_raw_segments() {
        let m = parse_module(r#"name = "x"; greeting = "hi $name, $(whoami)"; "#, "t.bish").unwrap();
        let greeting_assign = m.module().global_variables[1];
        let values = &m.arena.get(greeting_assign).kind.as_assignment().values;
        let string_id = values[0];
        let interp_id = m.arena.get(string_id).kind.as_string().content;
        let items = &m.arena.get(interp_id).kind.as_interp().items;
        assert!(items.iter().any(|i| matches!(i, InterpItem::Variable(_))));
        assert!(items.iter().any(|i| matches!(i, InterpItem::Raw(s) if s == "$(whoami)")));
    }

    #[test]
    fn redefining_main_is_rejected() {
        assert!(parse_module("def main() { }", "t.bish").is_err());
    }

    #[test]
    fn pipe_builds_an_io_redirection_node() {
        let m = parse_module(r#"x = "a" | "b"; "#, "t.bish").unwrap();
        let assign = m.module().global_variables[0];
        let value = m.arena.get(assign).kind.as_assignment().values[0];
        let io = m.arena.get(value).kind.as_io_redirection();
        assert_eq!(io.segments.len(), 2);
    }
}
