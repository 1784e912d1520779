//! Post-parse and pre-codegen passes, run in a fixed order (spec.md §4).
//!
//! Post-parse: import-linking → parent-wiring → type-checking.
//! Pre-codegen lowering: by-reference → return-values.

pub mod by_reference;
pub mod call_graph;
pub mod import_linker;
pub mod parent_wiring;
pub mod return_value;
pub mod type_check;

pub use call_graph::CallGraph;
