//! Typed intermediate representation.
//!
//! Architecture: `source text → Tokenizer → Parser → IR (Module) →
//! post-parse passes → lowering passes → Bash code generator`.

pub mod arena;
pub mod debug;
pub mod name;
pub mod node;
pub mod ty;
pub mod visitor;

pub use arena::{shift_node_ids, Arena, Module};
pub use debug::DebugInfo;
pub use name::Name;
pub use node::*;
pub use ty::Type;
pub use visitor::{walk_children, Visitor};
