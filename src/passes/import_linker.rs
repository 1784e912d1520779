//! Import linker (spec.md §4.5).
//!
//! Invoked once per `Module`, recursively. For each `ImportStatement`
//! reachable in the module: resolve `dirname(module.path)/<name>.bish`,
//! parse and recursively link the referenced module, compute which of
//! its functions are actually called (`FindCallsToModule`), pull those
//! in together with their own transitive callees (namespace-prefixed),
//! splice the linked module's arena into the importer's, and rewrite
//! every dummy call target to point at the real, spliced function.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::BishError;
use crate::ir::{shift_node_ids, Module, NodeId, NodeKind};
use crate::parser::parse_module;

use super::{call_graph::CallGraph, parent_wiring, type_check};

pub fn run(module: &mut Module, config: &Config) -> Result<(), BishError> {
    let mut imported = HashSet::new();
    link_imports(module, config, &mut imported)?;

    if let Some(dummy) = module.module().functions.iter().copied().find(|&f| module.arena.get(f).kind.as_function().is_dummy()) {
        let name = module.arena.get(dummy).kind.as_function().name.render(".");
        return Err(BishError::link(format!("unresolved function '{}'", name)));
    }
    Ok(())
}

fn link_imports(module: &mut Module, config: &Config, imported: &mut HashSet<String>) -> Result<(), BishError> {
    let import_names: Vec<String> = module
        .arena
        .iter()
        .filter_map(|(_, node)| match &node.kind {
            NodeKind::ImportStatement(i) => Some(i.name.clone()),
            _ => None,
        })
        .collect();

    for name in import_names {
        if !imported.insert(name.clone()) {
            continue;
        }
        link_one(module, config, &name)?;
    }
    Ok(())
}

fn link_one(module: &mut Module, config: &Config, name: &str) -> Result<(), BishError> {
    let import_path = resolve_import_path(&module.module().path, name);
    let source = std::fs::read_to_string(&import_path)
        .map_err(|e| BishError::link(format!("cannot read imported module '{}' ({}): {}", name, import_path.display(), e)))?;

    let mut m2 = parse_module(&source, &import_path)?;

    // Recursively link m2's own imports before splicing, so every
    // cross-module call inside m2 already points at a real function by
    // the time it's merged into the importer.
    let mut nested_imported = HashSet::new();
    link_imports(&mut m2, config, &mut nested_imported)?;
    if let Some(dummy) = m2.module().functions.iter().copied().find(|&f| m2.arena.get(f).kind.as_function().is_dummy()) {
        let dummy_name = m2.arena.get(dummy).kind.as_function().name.render(".");
        return Err(BishError::link(format!("unresolved function '{}' in imported module '{}'", dummy_name, name)));
    }

    let m2_root = m2.root;
    parent_wiring::run(&mut m2.arena, m2_root);
    let m2_functions = m2.module().functions.clone();
    let m2_globals = m2.module().global_variables.clone();
    type_check::run(&mut m2.arena, &m2_functions, &m2_globals)?;

    let is_stdlib = same_file(&import_path, &config.stdlib_path);
    let namespace_id = m2.module().namespace_id.clone();

    // FindCallsToModule(m2): every dummy FunctionCall target in the
    // importer whose name matches a real function defined in m2.
    let mut dummy_to_real: HashMap<NodeId, NodeId> = HashMap::new();
    for (_, node) in module.arena.iter() {
        let NodeKind::FunctionCall(call) = &node.kind else { continue };
        let target = call.target;
        let target_fn = module.arena.get(target).kind.as_function();
        if !target_fn.is_dummy() {
            continue;
        }
        let target_name = &target_fn.name;
        let matches_qualified = target_name.qualifiers() == [name.to_string()];
        let matches_stdlib_bare = is_stdlib && target_name.qualifiers().is_empty();
        if !matches_qualified && !matches_stdlib_bare {
            continue;
        }
        if let Some(&real) = m2_functions_by_bare(&m2, &m2_functions).get(target_name.bare()) {
            dummy_to_real.insert(target, real);
        }
    }

    if dummy_to_real.is_empty() {
        // Nothing in the importer actually calls into this module; still
        // a legal import (spec.md places no requirement that an import
        // be used), just nothing to splice.
        return Ok(());
    }

    // Transitively pull in callees of every directly-needed function.
    let cg = CallGraph::build(&m2.arena, &m2_functions);
    let mut needed: HashSet<NodeId> = dummy_to_real.values().copied().collect();
    let mut worklist: Vec<NodeId> = needed.iter().copied().collect();
    while let Some(f) = worklist.pop() {
        for &callee in cg.transitive_calls(f) {
            if needed.insert(callee) {
                worklist.push(callee);
            }
        }
    }

    let offset = module.arena.append(m2.arena);
    let end = module.arena.len();
    for i in offset..end {
        let mut kind = module.arena.get(i).kind.clone();
        shift_node_ids(&mut kind, offset);
        module.arena.get_mut(i).kind = kind;
    }

    for &f in &needed {
        let shifted = f + offset;
        let mut qualified = module.arena.get(shifted).kind.as_function().name.clone();
        qualified.prepend_qualifier(namespace_id.clone());
        module.arena.get_mut(shifted).kind.as_function_mut().name = qualified;
        if !module.module().functions.contains(&shifted) {
            module.module_mut().functions.push(shifted);
        }
    }

    for (&dummy, &real) in &dummy_to_real {
        let shifted_real = real + offset;
        rewrite_call_targets(module, dummy, shifted_real);
        module.module_mut().functions.retain(|&f| f != dummy);
    }

    Ok(())
}

fn m2_functions_by_bare(m2: &Module, functions: &[NodeId]) -> HashMap<String, NodeId> {
    functions
        .iter()
        .copied()
        .filter(|&f| !m2.arena.get(f).kind.as_function().is_dummy())
        .map(|f| (m2.arena.get(f).kind.as_function().name.bare().to_string(), f))
        .collect()
}

fn rewrite_call_targets(module: &mut Module, dummy: NodeId, real: NodeId) {
    let len = module.arena.len();
    for i in 0..len {
        if let NodeKind::FunctionCall(call) = &module.arena.get(i).kind {
            if call.target == dummy {
                module.arena.get_mut(i).kind.as_function_call_mut().target = real;
            }
        }
    }
}

fn resolve_import_path(module_path: &std::path::Path, name: &str) -> PathBuf {
    let dir = module_path.parent().unwrap_or_else(|| std::path::Path::new("."));
    dir.join(format!("{}.bish", name))
}

fn same_file(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &std::path::Path, file: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn pulls_in_called_function_with_namespace_prefix() {
        let dir = std::env::temp_dir().join(format!("bish_import_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_temp(&dir, "lib.bish", "def greet(s) { return \"hi \" + s; }");

        let main_src = "import lib; x = lib.greet(\"x\");";
        let main_path = dir.join("main.bish");
        let mut m = parse_module(main_src, &main_path).unwrap();

        let config = Config { stdlib_path: dir.join("stdlib.bish"), backend: "bash".to_string() };
        run(&mut m, &config).unwrap();

        let greet = m
            .module()
            .functions
            .iter()
            .copied()
            .find(|&f| m.arena.get(f).kind.as_function().name.bare() == "greet")
            .expect("greet should be linked in");
        assert_eq!(m.arena.get(greet).kind.as_function().name.render("."), "lib.greet");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
