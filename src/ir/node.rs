//! IR node variants.
//!
//! Nodes live in a per-module [`super::arena::Arena`] and reference each
//! other through [`NodeId`] indices rather than owned pointers; see
//! `DESIGN.md` for why this repo resolves spec.md's "parent pointers in a
//! tree" open question this way.

use super::debug::DebugInfo;
use super::name::Name;
use super::ty::Type;

pub type NodeId = usize;

/// Metadata every node variant carries: inferred type, parent link
/// (filled by the parent-wiring pass), and source debug info.
#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub ty: Type,
    pub parent: Option<NodeId>,
    pub debug: DebugInfo,
}

impl NodeMeta {
    pub fn new(debug: DebugInfo) -> Self {
        Self { ty: Type::Undef, parent: None, debug }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub meta: NodeMeta,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(debug: DebugInfo, kind: NodeKind) -> Self {
        Self { meta: NodeMeta::new(debug), kind }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Module(ModuleNode),
    Block(BlockNode),
    Variable(VariableNode),
    Location(LocationNode),
    Function(FunctionNode),
    FunctionCall(FunctionCallNode),
    ExternCall(ExternCallNode),
    IORedirection(IORedirectionNode),
    Assignment(AssignmentNode),
    ImportStatement(ImportStatementNode),
    ReturnStatement(ReturnStatementNode),
    LoopControlStatement(LoopControlStatementNode),
    IfStatement(IfStatementNode),
    ForLoop(ForLoopNode),
    BinOp(BinOpNode),
    UnaryOp(UnaryOpNode),
    Integer(IntegerNode),
    Fractional(FractionalNode),
    StringLit(StringNode),
    Boolean(BooleanNode),
    InterpolatedString(InterpolatedStringNode),
    PredicatedBlock(PredicatedBlockNode),
}

/// Root node: owns every function, global assignment, and the `main`
/// entry point transitively reachable from them.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub functions: Vec<NodeId>,
    pub global_variables: Vec<NodeId>,
    pub main: NodeId,
    pub path: std::path::PathBuf,
    pub namespace_id: String,
}

/// An ordered sequence of statements with an associated lexical scope at
/// parse time (the scope itself does not survive past parsing).
#[derive(Debug, Clone, Default)]
pub struct BlockNode {
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct VariableNode {
    pub name: Name,
    pub is_global: bool,
    /// Set by the by-reference pass for `Array(_)`-typed function
    /// parameters: the global variable that stands in for this parameter.
    pub ref_surrogate: Option<NodeId>,
}

/// `(Variable, optional index expression)`. Absent index = scalar access.
#[derive(Debug, Clone)]
pub struct LocationNode {
    pub variable: NodeId,
    pub index: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: Name,
    pub args: Vec<NodeId>,
    /// `None` body marks a forward declaration / dummy created when a
    /// call site is parsed before the definition.
    pub body: Option<NodeId>,
    /// Set by the return-value pass for functions that return a value.
    pub retval_global: Option<NodeId>,
}

impl FunctionNode {
    pub fn is_dummy(&self) -> bool {
        self.body.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionCallNode {
    pub target: NodeId,
    /// Each argument expression, lowered at parse time into an
    /// `Assignment` into a fresh local variable (see spec.md §3 /
    /// "call-site lowering invariant").
    pub args: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ExternCallNode {
    pub body: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IORedirectionKind {
    Pipe,
}

#[derive(Debug, Clone)]
pub struct IORedirectionNode {
    pub kind: IORedirectionKind,
    pub segments: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct AssignmentNode {
    pub target: NodeId,
    pub values: Vec<NodeId>,
}

impl AssignmentNode {
    pub fn is_array_initializer(&self) -> bool {
        self.values.len() > 1
    }
}

#[derive(Debug, Clone)]
pub struct ImportStatementNode {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ReturnStatementNode {
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControlKind {
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub struct LoopControlStatementNode {
    pub kind: LoopControlKind,
}

/// `condition + body` pair, used for each `if`/`else if` clause.
#[derive(Debug, Clone)]
pub struct PredicatedBlockNode {
    pub condition: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct IfStatementNode {
    pub clauses: Vec<NodeId>,
    pub else_block: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub enum ForSource {
    Range { lower: NodeId, upper: NodeId },
    Iterable(NodeId),
}

#[derive(Debug, Clone)]
pub struct ForLoopNode {
    pub variable: NodeId,
    pub source: ForSource,
    pub body: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOperator::Lt
                | BinOperator::Le
                | BinOperator::Gt
                | BinOperator::Ge
                | BinOperator::Eq
                | BinOperator::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOperator::And | BinOperator::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOperator::Add | BinOperator::Sub | BinOperator::Mul | BinOperator::Div | BinOperator::Mod
        )
    }
}

#[derive(Debug, Clone)]
pub struct BinOpNode {
    pub op: BinOperator,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone)]
pub struct UnaryOpNode {
    pub op: UnaryOperator,
    pub operand: NodeId,
}

#[derive(Debug, Clone)]
pub struct IntegerNode {
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct FractionalNode {
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct StringNode {
    pub content: NodeId,
}

#[derive(Debug, Clone)]
pub struct BooleanNode {
    pub value: bool,
}

/// An item inside an interpolated string: literal text, a variable
/// reference (`Location`), or an opaque raw shell fragment
/// (`$(any-balanced)` inside an extern-call body, passed through
/// verbatim).
#[derive(Debug, Clone)]
pub enum InterpItem {
    Literal(String),
    Variable(NodeId),
    Raw(String),
}

#[derive(Debug, Clone, Default)]
pub struct InterpolatedStringNode {
    pub items: Vec<InterpItem>,
}

// ---------------------------------------------------------------------
// Narrowing accessors: passes almost always know which variant they are
// looking at (by construction); these panic with a clear message on
// mismatch instead of silently doing the wrong thing, which would be an
// internal invariant failure rather than a user-facing error.
// ---------------------------------------------------------------------

macro_rules! narrow {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        impl NodeKind {
            pub fn $get(&self) -> &$ty {
                match self {
                    NodeKind::$variant(inner) => inner,
                    other => panic!(concat!("expected ", stringify!($variant), ", found {:?}"), other),
                }
            }

            pub fn $get_mut(&mut self) -> &mut $ty {
                match self {
                    NodeKind::$variant(inner) => inner,
                    other => panic!(concat!("expected ", stringify!($variant), ", found {:?}"), other),
                }
            }
        }
    };
}

narrow!(as_module, as_module_mut, Module, ModuleNode);
narrow!(as_block, as_block_mut, Block, BlockNode);
narrow!(as_variable, as_variable_mut, Variable, VariableNode);
narrow!(as_location, as_location_mut, Location, LocationNode);
narrow!(as_function, as_function_mut, Function, FunctionNode);
narrow!(as_function_call, as_function_call_mut, FunctionCall, FunctionCallNode);
narrow!(as_extern_call, as_extern_call_mut, ExternCall, ExternCallNode);
narrow!(as_io_redirection, as_io_redirection_mut, IORedirection, IORedirectionNode);
narrow!(as_assignment, as_assignment_mut, Assignment, AssignmentNode);
narrow!(as_import, as_import_mut, ImportStatement, ImportStatementNode);
narrow!(as_return, as_return_mut, ReturnStatement, ReturnStatementNode);
narrow!(as_loop_control, as_loop_control_mut, LoopControlStatement, LoopControlStatementNode);
narrow!(as_if, as_if_mut, IfStatement, IfStatementNode);
narrow!(as_for, as_for_mut, ForLoop, ForLoopNode);
narrow!(as_binop, as_binop_mut, BinOp, BinOpNode);
narrow!(as_unaryop, as_unaryop_mut, UnaryOp, UnaryOpNode);
narrow!(as_integer, as_integer_mut, Integer, IntegerNode);
narrow!(as_fractional, as_fractional_mut, Fractional, FractionalNode);
narrow!(as_string, as_string_mut, StringLit, StringNode);
narrow!(as_boolean, as_boolean_mut, Boolean, BooleanNode);
narrow!(as_interp, as_interp_mut, InterpolatedString, InterpolatedStringNode);
narrow!(as_predicated_block, as_predicated_block_mut, PredicatedBlock, PredicatedBlockNode);
