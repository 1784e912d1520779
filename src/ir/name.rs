//! Namespaced symbol names.
//!
//! A [`Name`] is an identifier with zero or more namespace qualifiers,
//! ordered outer to inner. Bish source writes qualifiers with `.`
//! (`lib.greet`); the Bash code generator renders them with `_`
//! (`lib_greet`) since Bash function/variable names cannot contain dots.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Eq)]
pub struct Name {
    qualifiers: Vec<String>,
    bare: String,
}

impl Name {
    pub fn new(bare: impl Into<String>) -> Self {
        Self { qualifiers: Vec::new(), bare: bare.into() }
    }

    pub fn with_qualifiers(qualifiers: Vec<String>, bare: impl Into<String>) -> Self {
        Self { qualifiers, bare: bare.into() }
    }

    pub fn bare(&self) -> &str {
        &self.bare
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    /// Renders the name with `sep` joining qualifiers and the bare name,
    /// e.g. `render(".")` → `lib.greet`, `render("_")` → `lib_greet`.
    pub fn render(&self, sep: &str) -> String {
        if self.qualifiers.is_empty() {
            self.bare.clone()
        } else {
            let mut parts = self.qualifiers.clone();
            parts.push(self.bare.clone());
            parts.join(sep)
        }
    }

    pub fn has_qualifier(&self, q: &str) -> bool {
        self.qualifiers.iter().any(|existing| existing == q)
    }

    /// Adds a qualifier in front of any existing ones (outermost position).
    pub fn prepend_qualifier(&mut self, q: impl Into<String>) {
        self.qualifiers.insert(0, q.into());
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.qualifiers == other.qualifiers && self.bare == other.bare
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.qualifiers.hash(state);
        self.bare.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.qualifiers, &self.bare).cmp(&(&other.qualifiers, &other.bare))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bare_name_without_separator() {
        let n = Name::new("greet");
        assert_eq!(n.render("."), "greet");
        assert_eq!(n.render("_"), "greet");
    }

    #[test]
    fn renders_qualified_name_with_separator() {
        let n = Name::with_qualifiers(vec!["lib".to_string()], "greet");
        assert_eq!(n.render("."), "lib.greet");
        assert_eq!(n.render("_"), "lib_greet");
    }

    #[test]
    fn prepend_qualifier_adds_outermost() {
        let mut n = Name::with_qualifiers(vec!["inner".to_string()], "f");
        n.prepend_qualifier("outer");
        assert_eq!(n.render("."), "outer.inner.f");
    }

    #[test]
    fn equality_is_structural() {
        let a = Name::with_qualifiers(vec!["lib".to_string()], "f");
        let b = Name::with_qualifiers(vec!["lib".to_string()], "f");
        let c = Name::new("f");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ordering_is_by_qualifiers_then_bare() {
        let a = Name::new("a");
        let b = Name::new("b");
        let qa = Name::with_qualifiers(vec!["z".to_string()], "a");
        assert!(a < b);
        assert!(a < qa);
    }
}
