//! Code generation backends (spec.md §4.9).
//!
//! A single `bash` backend ships today; the [`CodeGenerator`] trait and
//! [`BackendRegistry`] exist so a second target (e.g. POSIX `sh`) could
//! register alongside it without touching the driver — a `HashMap<String,
//! _>` of factories, the same shape as a command dispatch table keyed by
//! name rather than hardcoded `match` arms.

mod bash;
mod buffer;

use std::collections::HashMap;
use std::io::Write;

use crate::error::BishError;
use crate::ir::{Arena, ModuleNode};

pub trait CodeGenerator {
    fn generate(&mut self, arena: &Arena, module: &ModuleNode, out: &mut dyn Write, library_mode: bool) -> Result<(), BishError>;
}

struct BashGenerator;

impl BashGenerator {
    fn new() -> Box<dyn CodeGenerator> {
        Box::new(Self)
    }
}

impl CodeGenerator for BashGenerator {
    fn generate(&mut self, arena: &Arena, module: &ModuleNode, out: &mut dyn Write, library_mode: bool) -> Result<(), BishError> {
        bash::generate(arena, module, out, library_mode)
    }
}

pub type GeneratorFactory = fn() -> Box<dyn CodeGenerator>;

pub struct BackendRegistry {
    factories: HashMap<String, GeneratorFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// A registry pre-populated with every backend this crate ships.
    pub fn with_default_backends() -> Self {
        let mut registry = Self::new();
        registry.register("bash", BashGenerator::new);
        registry
    }

    pub fn register(&mut self, name: &str, factory: GeneratorFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Box<dyn CodeGenerator>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backends_include_bash() {
        let registry = BackendRegistry::with_default_backends();
        assert!(registry.names().contains(&"bash"));
        assert!(registry.get("bash").is_some());
        assert!(registry.get("zsh").is_none());
    }
}
