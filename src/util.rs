//! Small cross-cutting helpers shared by the parser and the lowering
//! passes.

use std::collections::HashSet;

/// Generates collision-free synthetic identifiers. Used for:
/// - hoisted call-argument locals (prefix `"_"` → `_1`, `_2`, …)
/// - by-reference surrogates (prefix `"_global_ref_"`)
/// - return-value globals (prefix `"_global_retval_"`)
///
/// On a collision with a name already in use, falls back to appending
/// `_<k>` until a free name is found, per spec.md §4.2's unique-name
/// generator contract (`_<n>` then `_<n>_<k>`).
#[derive(Debug, Default)]
pub struct UniqueNamer {
    used: HashSet<String>,
    counter: usize,
}

impl UniqueNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_used(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    pub fn fresh(&mut self, prefix: &str) -> String {
        loop {
            self.counter += 1;
            let candidate = format!("{prefix}{}", self.counter);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            let mut k = 1usize;
            loop {
                let alt = format!("{}_{}", candidate, k);
                if self.used.insert(alt.clone()) {
                    return alt;
                }
                k += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_sequential_names() {
        let mut n = UniqueNamer::new();
        assert_eq!(n.fresh("_"), "_1");
        assert_eq!(n.fresh("_"), "_2");
    }

    #[test]
    fn falls_back_on_collision() {
        let mut n = UniqueNamer::new();
        n.mark_used("_1");
        assert_eq!(n.fresh("_"), "_1_1");
    }

    #[test]
    fn prefixes_are_independent() {
        let mut n = UniqueNamer::new();
        assert_eq!(n.fresh("_global_ref_"), "_global_ref_1");
        assert_eq!(n.fresh("_global_retval_"), "_global_retval_1");
    }
}
