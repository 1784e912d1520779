//! The Bish type system: a small tagged variant with one level of array
//! nesting used in practice.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Undef,
    Integer,
    Fractional,
    String,
    Boolean,
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Type::Undef)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    /// The element type of an array, or the type itself if not an array.
    pub fn element_type(&self) -> &Type {
        match self {
            Type::Array(elem) => elem,
            other => other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Undef => write!(f, "undef"),
            Type::Integer => write!(f, "int"),
            Type::Fractional => write!(f, "fractional"),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "bool"),
            Type::Array(elem) => write!(f, "array({})", elem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        assert_eq!(Type::array_of(Type::Integer), Type::array_of(Type::Integer));
        assert_ne!(Type::array_of(Type::Integer), Type::array_of(Type::String));
    }

    #[test]
    fn element_type_unwraps_one_level() {
        let t = Type::array_of(Type::String);
        assert_eq!(t.element_type(), &Type::String);
        assert_eq!(Type::Integer.element_type(), &Type::Integer);
    }
}
