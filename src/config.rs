//! Ambient configuration (spec.md §4.12).
//!
//! Threaded explicitly through the driver and the import linker rather
//! than read from global state, so a library embedder can run several
//! compilations with different stdlib locations in the same process.

use std::path::PathBuf;

/// Compile-time fallback for [`Config::stdlib_path`] when `BISH_STDLIB`
/// is unset.
pub const DEFAULT_STDLIB_PATH: &str = "/usr/local/share/bish/stdlib.bish";

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the module the import linker treats as the standard
    /// library (spec.md §4.5's stdlib-bare-name fallback).
    pub stdlib_path: PathBuf,
    /// Name of the codegen backend to select from the registry.
    pub backend: String,
}

impl Default for Config {
    fn default() -> Self {
        Self { stdlib_path: PathBuf::from(DEFAULT_STDLIB_PATH), backend: "bash".to_string() }
    }
}

impl Config {
    /// Resolves `BISH_STDLIB` from the environment, falling back to
    /// [`DEFAULT_STDLIB_PATH`].
    pub fn from_env() -> Self {
        let stdlib_path = std::env::var_os("BISH_STDLIB").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_STDLIB_PATH));
        Self { stdlib_path, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_compile_time_stdlib_path() {
        let c = Config::default();
        assert_eq!(c.stdlib_path, PathBuf::from(DEFAULT_STDLIB_PATH));
        assert_eq!(c.backend, "bash");
    }
}
