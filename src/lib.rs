//! The Bish compiler: a small imperative language that compiles to Bash
//! (spec.md / SPEC_FULL.md).
//!
//! Pipeline: `source text → lexer → parser (produces IR directly) →
//! import-linking → parent-wiring → type-checking → by-reference
//! lowering → return-value lowering → code generation`.

pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod passes;
pub mod util;

use std::io::Read;
use std::path::Path;

pub use config::Config;
pub use error::BishError;

/// Per-invocation switches that aren't tied to a single `Config` (which
/// is about *where things live*, not *how this particular compile
/// behaves*).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Omit the `main` function definition and the synthetic call to it
    /// (spec.md §4.9's library-mode distinction), producing a script
    /// meant to be sourced rather than run. The `args=(...)` seed and
    /// global-variable initialisers are still emitted.
    pub library_mode: bool,
    /// Name of the registered [`codegen::CodeGenerator`] to use.
    pub backend: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { library_mode: false, backend: "bash".to_string() }
    }
}

/// Compiles already-loaded `source` (whose on-disk location is `path`,
/// used for import resolution and diagnostics) into a generated script.
pub fn compile_source(source: &str, path: &Path, config: &Config, options: &CompileOptions) -> Result<String, BishError> {
    let mut module = parser::parse_module(source, path)?;

    passes::import_linker::run(&mut module, config)?;

    let root = module.root;
    passes::parent_wiring::run(&mut module.arena, root);

    let functions = module.module().functions.clone();
    let mut globals = module.module().global_variables.clone();
    passes::type_check::run(&mut module.arena, &functions, &globals)?;

    let mut namer = util::UniqueNamer::new();
    seed_namer(&mut module, &mut namer);

    passes::by_reference::run(&mut module.arena, &functions, &globals, &mut namer);
    passes::return_value::run(&mut module.arena, &functions, &mut globals, &mut namer);
    module.module_mut().global_variables = globals;

    let registry = codegen::BackendRegistry::with_default_backends();
    let mut generator = registry
        .get(&options.backend)
        .ok_or_else(|| BishError::internal(format!("unknown codegen backend '{}'", options.backend)))?;

    let mut out = Vec::new();
    generator.generate(&module.arena, module.module(), &mut out, options.library_mode)?;
    String::from_utf8(out).map_err(|e| BishError::internal(format!("generated script was not valid UTF-8: {e}")))
}

/// Reads `path` (or stdin, when `path` is `-`) and compiles it.
pub fn compile_file(path: &Path, config: &Config, options: &CompileOptions) -> Result<String, BishError> {
    let source = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| BishError::internal(format!("failed reading stdin: {e}")))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| BishError::internal(format!("cannot read '{}': {}", path.display(), e)))?
    };
    compile_source(&source, path, config, options)
}

/// Marks every variable name already in use as the module comes out of
/// the parser, so the by-reference and return-value passes' synthetic
/// names (`_global_ref_<n>`, `_global_retval_<n>`) never collide with a
/// name the programmer actually wrote.
fn seed_namer(module: &mut ir::Module, namer: &mut util::UniqueNamer) {
    for (_, node) in module.arena.iter() {
        if let ir::NodeKind::Variable(v) = &node.kind {
            namer.mark_used(v.name.bare().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn compiles_simple_arithmetic_to_a_script() {
        let config = Config::default();
        let options = CompileOptions::default();
        let out = compile_source("a = 1 + 2;", &PathBuf::from("t.bish"), &config, &options).unwrap();
        assert!(out.contains("a=$(( 1 + 2 ));"));
        assert!(out.contains("main;"));
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let config = Config::default();
        let options = CompileOptions { backend: "zsh".to_string(), ..Default::default() };
        assert!(compile_source("a = 1;", &PathBuf::from("t.bish"), &config, &options).is_err());
    }
}
