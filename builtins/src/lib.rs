//! Primitive types of genko and the operators they support. Operators are not
//! declared in source code: the generics resolver asks this crate whether a primitive
//! supports a given operator, and what the result of applying it is.

use ast::Operator;

pub const TYPE_BOOL: &str = "bool";
pub const TYPE_INT: &str = "int";
pub const TYPE_FLOAT: &str = "float";
pub const TYPE_CHAR: &str = "char";
pub const TYPE_STRING: &str = "string";

pub const PRIMITIVE_TYPES: &[&str] = &[TYPE_BOOL, TYPE_INT, TYPE_FLOAT, TYPE_CHAR, TYPE_STRING];

/// This enum does not match the actual primitive types of `genko` on purpose, as builtin operators
/// are a little different. For example, we care about whether or not a builtin is implemented on *numbers*,
/// since all operator builtins that exist for integers also exist for floating point numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinType {
    Number,     // `int | float`
    Comparable, // `int | char | float`
    Equatable,  // `bool | string | int | char | float`
}

impl BuiltinType {
    /// Primitive types which implement the builtin
    pub fn members(&self) -> &'static [&'static str] {
        match self {
            BuiltinType::Number => &[TYPE_INT, TYPE_FLOAT],
            BuiltinType::Comparable => &[TYPE_INT, TYPE_CHAR, TYPE_FLOAT],
            BuiltinType::Equatable => &[TYPE_BOOL, TYPE_STRING, TYPE_INT, TYPE_CHAR, TYPE_FLOAT],
        }
    }

    pub fn contains(&self, ty_name: &str) -> bool {
        self.members().contains(&ty_name)
    }
}

pub const ARITHMETIC: &[(&str, BuiltinType)] = &[
    ("+", BuiltinType::Number),
    ("-", BuiltinType::Number),
    ("*", BuiltinType::Number),
    ("/", BuiltinType::Number),
];
pub const COMPARISON: &[(&str, BuiltinType)] = &[
    ("==", BuiltinType::Equatable),
    ("!=", BuiltinType::Equatable),
    ("<=", BuiltinType::Comparable),
    (">=", BuiltinType::Comparable),
    ("<", BuiltinType::Comparable),
    (">", BuiltinType::Comparable),
];

pub fn is_primitive(ty_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&ty_name)
}

fn builtin_of(op: Operator) -> Option<BuiltinType> {
    ARITHMETIC
        .iter()
        .chain(COMPARISON.iter())
        .find(|(sym, _)| *sym == op.as_str())
        .map(|(_, builtin)| *builtin)
}

/// Does the primitive type named `ty_name` support the operator? User types never do
pub fn supports(op: Operator, ty_name: &str) -> bool {
    builtin_of(op).map_or(false, |builtin| builtin.contains(ty_name))
}

/// Comparisons evaluate to a boolean, while arithmetic operators evaluate to the type of
/// their operands
pub fn returns_bool(op: Operator) -> bool {
    COMPARISON.iter().any(|(sym, _)| *sym == op.as_str())
}

/// Primitive types which support the operator, for diagnostics
pub fn supported_by(op: Operator) -> &'static [&'static str] {
    builtin_of(op).map_or(&[], |builtin| builtin.members())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_on_numbers_only() {
        assert!(supports(Operator::Add, "int"));
        assert!(supports(Operator::Div, "float"));
        assert!(!supports(Operator::Add, "string"));
        assert!(!supports(Operator::Mul, "bool"));
    }

    #[test]
    fn ordering_and_equality() {
        assert!(supports(Operator::Lt, "char"));
        assert!(!supports(Operator::GtEq, "bool"));
        assert!(supports(Operator::Equals, "bool"));
        assert!(supports(Operator::NotEquals, "string"));
    }

    #[test]
    fn user_types_support_nothing() {
        assert!(!supports(Operator::Equals, "Point"));
        assert!(supported_by(Operator::Add).iter().all(|ty| is_primitive(ty)));
    }

    #[test]
    fn result_types() {
        assert!(returns_bool(Operator::LtEq));
        assert!(!returns_bool(Operator::Sub));
    }
}
