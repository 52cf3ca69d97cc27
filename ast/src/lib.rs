//! Abstract Syntax Tree representation of genko's source code

use std::fmt::{Display, Formatter, Result as FmtResult};

use location::SpanTuple;
use symbol::Symbol;

/// A type as written by the programmer, i.e. when declaring arguments, fields and return
/// types, or when specifying the type arguments of a call
///
/// ```ignore
/// func f(arg: Box[int]) {}
/// func g(arg: Pair[int, Box[float]]) {}
///
/// where a = id[string]("hello");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub name: Symbol,
    pub generics: Vec<Type>,
    pub location: SpanTuple,
}

/// A value with its associated type. This is used for function arguments or type fields
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub location: SpanTuple,
    pub symbol: Symbol,
    pub ty: Type,
}

/// A generic parameter declaration
/// ```ignore
/// //      v
/// func id[T](value: T) -> T { value }
/// //      ^
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParameter {
    pub name: Symbol,
    pub location: SpanTuple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Equals,
    NotEquals,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Symbol,
    pub generics: Vec<GenericParameter>,
    pub args: Vec<TypedValue>,
    pub return_type: Option<Type>,
}

/// Common parts of a "call", to a function, method, or a type. This does not differentiate between
/// a function call or type instantiation and does not reflect the differences in syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub to: Symbol,
    pub generics: Vec<Type>,
    pub args: Vec<Ast>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Char(char),
    Bool(bool),
    Str(String),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(fl) => write!(f, "{fl:?}"),
            Value::Char(c) => write!(f, "'{c}'"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block {
        stmts: Vec<Ast>,
        last_is_expr: bool,
    },
    Function {
        decl: Declaration,
        block: Box<Ast>,
    },
    Type {
        name: Symbol,
        generics: Vec<GenericParameter>,
        fields: Vec<TypedValue>,
    },
    /// The arguments of a type instantiation are [`Node::VarAssign`]s, one per field
    TypeInstantiation(Call),
    FunctionCall(Call),
    MethodCall {
        instance: Box<Ast>,
        call: Call,
    },
    BinaryOp(Operator, Box<Ast>, Box<Ast>),
    FieldAccess(Box<Ast>, Symbol),
    IfElse {
        if_condition: Box<Ast>,
        if_block: Box<Ast>,
        else_block: Option<Box<Ast>>,
    },
    VarDeclaration {
        mutable: bool,
        to_declare: Symbol,
        value: Box<Ast>,
    },
    VarAssign {
        to_assign: Symbol,
        value: Box<Ast>,
    },
    VarOrEmptyType(Symbol),
    Return(Option<Box<Ast>>),
    Constant(Value),
    Empty,
}

/// The [`Ast`] structure is a wrapper around the [`Node`] sum type, which contains
/// extra information such as the node's [`SpanTuple`]
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub location: SpanTuple,
    pub node: Node,
}

impl Ast {
    /// Function and type declarations, which get hoisted out of the blocks they are
    /// declared in during resolution
    pub fn is_declaration(&self) -> bool {
        matches!(self.node, Node::Function { .. } | Node::Type { .. })
    }

    /// Name of the declaration, the called function or type, or the variable this node
    /// refers to
    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.node {
            Node::Function { decl, .. } => Some(&decl.name),
            Node::Type { name, .. } => Some(name),
            Node::TypeInstantiation(call) | Node::FunctionCall(call) => Some(&call.to),
            Node::MethodCall { call, .. } => Some(&call.to),
            Node::FieldAccess(_, field) => Some(field),
            Node::VarDeclaration { to_declare, .. } => Some(to_declare),
            Node::VarAssign { to_assign, .. } => Some(to_assign),
            Node::VarOrEmptyType(sym) => Some(sym),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use location::{Location, Source};

    fn loc() -> SpanTuple {
        SpanTuple::with_source_ref(Source::Empty, Location::new(1, 1), Location::new(1, 1))
    }

    #[test]
    fn declarations_are_recognized() {
        let ty = Ast {
            location: loc(),
            node: Node::Type {
                name: Symbol::from("Marker"),
                generics: vec![],
                fields: vec![],
            },
        };
        let var = Ast {
            location: loc(),
            node: Node::VarOrEmptyType(Symbol::from("Marker")),
        };

        assert!(ty.is_declaration());
        assert!(!var.is_declaration());
        assert_eq!(ty.symbol(), var.symbol());
    }

    #[test]
    fn operator_strings() {
        assert_eq!(Operator::LtEq.as_str(), "<=");
        assert_eq!(Operator::NotEquals.as_str(), "!=");
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Str(String::from("hi")).to_string(), "\"hi\"");
        assert_eq!(Value::Char('c').to_string(), "'c'");
    }
}
