//! Types as the resolver sees them. A [`Ty`] is either a primitive, a user-defined type
//! applied to a list of type arguments, or a placeholder standing for a generic parameter
//! which has not been bound yet. A [`Binding`] maps generic parameters to the types they
//! are replaced with during one instantiation.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use error::{ErrKind, Error};
use symbol::Symbol;

/// Identity of a function or type declaration in the [`crate::decls::DeclTable`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub usize);

/// A generic parameter, identified by its name and the declaration introducing it. Two
/// parameters named `T` on an outer and an inner function are different parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParameter {
    pub name: Symbol,
    pub owner: DeclId,
}

impl Display for TypeParameter {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Char,
    Str,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Bool => builtins::TYPE_BOOL,
            Primitive::Int => builtins::TYPE_INT,
            Primitive::Float => builtins::TYPE_FLOAT,
            Primitive::Char => builtins::TYPE_CHAR,
            Primitive::Str => builtins::TYPE_STRING,
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        match name {
            builtins::TYPE_BOOL => Some(Primitive::Bool),
            builtins::TYPE_INT => Some(Primitive::Int),
            builtins::TYPE_FLOAT => Some(Primitive::Float),
            builtins::TYPE_CHAR => Some(Primitive::Char),
            builtins::TYPE_STRING => Some(Primitive::Str),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ty {
    Primitive(Primitive),
    /// A user type. Types declared inside generic declarations carry the types bound to
    /// their enclosing declarations' parameters first, then their own type arguments
    Named {
        decl: DeclId,
        name: Symbol,
        args: Vec<Ty>,
    },
    Placeholder(TypeParameter),
}

impl Ty {
    pub const BOOL: Ty = Ty::Primitive(Primitive::Bool);
    pub const INT: Ty = Ty::Primitive(Primitive::Int);
    pub const FLOAT: Ty = Ty::Primitive(Primitive::Float);
    pub const CHAR: Ty = Ty::Primitive(Primitive::Char);
    pub const STRING: Ty = Ty::Primitive(Primitive::Str);

    pub fn contains_placeholder(&self) -> bool {
        match self {
            Ty::Primitive(_) => false,
            Ty::Placeholder(_) => true,
            Ty::Named { args, .. } => args.iter().any(Ty::contains_placeholder),
        }
    }

    /// Does the type mention a parameter introduced by the given declaration
    pub fn mentions_params_of(&self, owner: DeclId) -> bool {
        match self {
            Ty::Primitive(_) => false,
            Ty::Placeholder(param) => param.owner == owner,
            Ty::Named { args, .. } => args.iter().any(|arg| arg.mentions_params_of(owner)),
        }
    }

    /// Nesting depth of the type: `int` has a depth of 1, `Box[Box[int]]` a depth of 3
    pub fn depth(&self) -> usize {
        match self {
            Ty::Primitive(_) | Ty::Placeholder(_) => 1,
            Ty::Named { args, .. } => 1 + args.iter().map(Ty::depth).max().unwrap_or(0),
        }
    }

    /// Replace every placeholder with the type it is bound to. Every placeholder must be
    /// bound
    pub fn substitute(&self, binding: &Binding) -> Result<Ty, Error> {
        match self {
            Ty::Primitive(_) => Ok(self.clone()),
            Ty::Placeholder(param) => binding.get_specialized(param),
            Ty::Named { decl, name, args } => Ok(Ty::Named {
                decl: *decl,
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.substitute(binding))
                    .collect::<Result<Vec<Ty>, Error>>()?,
            }),
        }
    }

    /// Replace the placeholders which are bound, and keep the others as they are
    pub fn substitute_known(&self, binding: &Binding) -> Ty {
        match self {
            Ty::Primitive(_) => self.clone(),
            Ty::Placeholder(param) => binding.get(param).cloned().unwrap_or_else(|| self.clone()),
            Ty::Named { decl, name, args } => Ty::Named {
                decl: *decl,
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute_known(binding)).collect(),
            },
        }
    }
}

impl From<&ast::Value> for Ty {
    fn from(value: &ast::Value) -> Ty {
        match value {
            ast::Value::Integer(_) => Ty::INT,
            ast::Value::Float(_) => Ty::FLOAT,
            ast::Value::Char(_) => Ty::CHAR,
            ast::Value::Bool(_) => Ty::BOOL,
            ast::Value::Str(_) => Ty::STRING,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Ty::Primitive(prim) => write!(f, "{}", prim.name()),
            Ty::Placeholder(param) => write!(f, "{param}"),
            Ty::Named { name, args, .. } => {
                write!(f, "{name}")?;
                if let Some((first, rest)) = args.split_first() {
                    write!(f, "[{first}")?;
                    for arg in rest {
                        write!(f, ", {arg}")?;
                    }
                    write!(f, "]")?;
                }

                Ok(())
            }
        }
    }
}

/// Map from generic parameters to the types replacing them in one instantiation. Ordered,
/// so that two bindings containing the same associations are equal and hash the same
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Binding(BTreeMap<TypeParameter, Ty>);

impl Binding {
    pub fn empty() -> Binding {
        Binding::default()
    }

    /// Create a binding from two sets of types: the generic parameters to resolve, and
    /// the types they resolve to.
    pub fn create(params: &[TypeParameter], resolved: Vec<Ty>) -> Result<Binding, Error> {
        if params.len() != resolved.len() {
            let mut err_msg = String::from("missing types in generic expansion");
            err_msg.push_str("\ngeneric types: ");
            err_msg.push_str(&join(params));
            err_msg.push_str("\nresolved types: ");
            err_msg.push_str(&join(&resolved));

            return Err(Error::new(ErrKind::Mismatch).with_msg(err_msg));
        }

        let mut binding = Binding::empty();
        for (param, ty) in params.iter().zip(resolved) {
            binding.declare(param.clone(), ty)?;
        }

        Ok(binding)
    }

    /// Declare a new type "match" in the binding. This function associates a generic type
    /// with its resolved counterpart, and errors out if the parameter was already bound
    pub fn declare(&mut self, param: TypeParameter, ty: Ty) -> Result<(), Error> {
        match self.0.get(&param) {
            None => {
                self.0.insert(param, ty);
                Ok(())
            }
            Some(existing) => Err(Error::new(ErrKind::Mismatch).with_msg(format!(
                "mapping type to already mapped generic type: {param} <- {existing} with {ty}"
            ))),
        }
    }

    pub fn get(&self, param: &TypeParameter) -> Option<&Ty> {
        self.0.get(param)
    }

    /// Get the type associated with a generic type in a previous call to `declare()`
    pub fn get_specialized(&self, param: &TypeParameter) -> Result<Ty, Error> {
        self.0.get(param).cloned().ok_or_else(|| {
            Error::new(ErrKind::UndeclaredType)
                .with_msg(format!("undeclared generic type: `{}`", param.name))
        })
    }

    /// Types associated with a list of parameters, in the order of the list
    pub fn types_of(&self, params: &[TypeParameter]) -> Result<Vec<Ty>, Error> {
        params.iter().map(|p| self.get_specialized(p)).collect()
    }

    /// Union of two bindings. Associations from `other` take precedence
    pub fn extend(&self, other: &Binding) -> Binding {
        let mut map = self.0.clone();
        map.extend(other.0.iter().map(|(p, ty)| (p.clone(), ty.clone())));

        Binding(map)
    }

    /// Keep only the associations of the given parameters
    pub fn restrict(&self, params: &[TypeParameter]) -> Binding {
        Binding(
            self.0
                .iter()
                .filter(|(p, _)| params.contains(p))
                .map(|(p, ty)| (p.clone(), ty.clone()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeParameter, &Ty)> {
        self.0.iter()
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "[")?;
        for (i, (param, ty)) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param} = {ty}")?;
        }
        write!(f, "]")
    }
}

fn join<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

/// Two arguments required different types for the same generic parameter
#[derive(Debug, PartialEq)]
pub struct Conflict {
    pub param: TypeParameter,
    pub first: Ty,
    pub second: Ty,
}

/// Match a declared type against the type of an actual value, binding the placeholders of
/// the declared type along the way. Returns `Ok(false)` if the types cannot match, and a
/// [`Conflict`] if a placeholder would be bound to two different types.
///
/// ```ignore
/// unify(Box[T], Box[int], {}) -> Ok(true), { T = int }
/// unify(Box[T], int, {}) -> Ok(false)
/// unify(T, string, { T = int }) -> Err(Conflict)
/// ```
pub fn unify(pattern: &Ty, actual: &Ty, binding: &mut Binding) -> Result<bool, Conflict> {
    match (pattern, actual) {
        (Ty::Placeholder(param), _) => match binding.get(param) {
            Some(bound) if bound == actual => Ok(true),
            Some(bound) => Err(Conflict {
                param: param.clone(),
                first: bound.clone(),
                second: actual.clone(),
            }),
            None => {
                binding.0.insert(param.clone(), actual.clone());
                Ok(true)
            }
        },
        (
            Ty::Named {
                decl: l_decl,
                args: l_args,
                ..
            },
            Ty::Named {
                decl: r_decl,
                args: r_args,
                ..
            },
        ) if l_decl == r_decl && l_args.len() == r_args.len() => {
            for (l_arg, r_arg) in l_args.iter().zip(r_args) {
                if !unify(l_arg, r_arg, binding)? {
                    return Ok(false);
                }
            }

            Ok(true)
        }
        (pattern, actual) => Ok(pattern == actual),
    }
}

/// Mangle a name to resolve it to its proper expanded name.
/// The format used is the following:
/// <name> '+' <T0> '+' <T1>...
pub fn mangle(name: &str, types: &[Ty]) -> String {
    let mut mangled = String::from(name);
    for ty in types {
        mangled.push('+');
        mangled.push_str(&ty.to_string());
    }

    mangled
}

/// Performs the opposite conversion, turning a mangled name into a valid
/// genko function name with generics.
pub fn demangle(mangled_name: &str) -> &str {
    original_name(mangled_name)
}

/// Fetch the original name contained in a mangled name.
///
/// ```rust
/// use generics::original_name;
///
/// let mangled = "type_of+int";
/// let original_name = original_name(mangled);
///
/// assert_eq!(original_name, "type_of");
/// ```
pub fn original_name(mangled_name: &str) -> &str {
    match mangled_name.find('+') {
        None => mangled_name,
        Some(first_separator) => &mangled_name[..first_separator],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, owner: usize) -> TypeParameter {
        TypeParameter {
            name: Symbol::from(name),
            owner: DeclId(owner),
        }
    }

    fn named(decl: usize, name: &str, args: Vec<Ty>) -> Ty {
        Ty::Named {
            decl: DeclId(decl),
            name: Symbol::from(name),
            args,
        }
    }

    #[test]
    fn mangle_no_generics() {
        assert_eq!(mangle("mangled", &[]), "mangled");
    }

    #[test]
    fn mangle_one_generic() {
        assert_eq!(mangle("mangled", &[Ty::BOOL]), "mangled+bool");
    }

    #[test]
    fn mangle_multi_generic() {
        let complex = named(0, "ComplexType", vec![]);
        assert_eq!(
            mangle("mangled", &[Ty::FLOAT, complex]),
            "mangled+float+ComplexType"
        );
    }

    #[test]
    fn mangle_nested_generic() {
        let boxed = named(0, "Box", vec![Ty::INT]);
        assert_eq!(mangle("id", &[boxed]), "id+Box[int]");
    }

    #[test]
    fn get_original_name_back() {
        let generics = [Ty::FLOAT, named(2, "ComplexType", vec![])];
        assert_eq!(original_name(&mangle("og_fn", &generics)), "og_fn");
        assert_eq!(demangle("og_fn"), "og_fn");
    }

    #[test]
    fn create_binding_different_size() {
        let params = [param("T", 0)];

        assert!(Binding::create(&params, vec![Ty::INT, Ty::FLOAT]).is_err());
    }

    #[test]
    fn declare_twice() {
        let mut binding = Binding::empty();

        assert!(binding.declare(param("T", 0), Ty::INT).is_ok());
        assert!(binding.declare(param("T", 0), Ty::INT).is_err());
        assert!(binding.declare(param("T", 1), Ty::INT).is_ok());
    }

    #[test]
    fn substitute_nested() {
        let t = param("T", 0);
        let binding = Binding::create(&[t.clone()], vec![Ty::CHAR]).unwrap();
        let ty = named(1, "Pair", vec![Ty::Placeholder(t.clone()), named(2, "Box", vec![Ty::Placeholder(t)])]);

        let substituted = ty.substitute(&binding).unwrap();

        assert!(ty.contains_placeholder());
        assert!(!substituted.contains_placeholder());
        assert_eq!(substituted.to_string(), "Pair[char, Box[char]]");
    }

    #[test]
    fn substitute_unbound() {
        let ty = named(1, "Box", vec![Ty::Placeholder(param("U", 0))]);
        let err = ty.substitute(&Binding::empty()).unwrap_err();

        assert_eq!(err.kind(), ErrKind::UndeclaredType);
        assert_eq!(
            ty.substitute_known(&Binding::empty()),
            ty,
        );
    }

    #[test]
    fn depth() {
        assert_eq!(Ty::INT.depth(), 1);
        assert_eq!(named(0, "Box", vec![]).depth(), 1);
        assert_eq!(named(0, "Box", vec![named(0, "Box", vec![Ty::INT])]).depth(), 3);
    }

    #[test]
    fn unify_through_named() {
        let t = param("T", 0);
        let mut binding = Binding::empty();

        let pattern = named(1, "Box", vec![Ty::Placeholder(t.clone())]);
        let actual = named(1, "Box", vec![Ty::STRING]);

        assert_eq!(unify(&pattern, &actual, &mut binding), Ok(true));
        assert_eq!(binding.get(&t), Some(&Ty::STRING));
        assert_eq!(unify(&pattern, &Ty::STRING, &mut binding), Ok(false));
    }

    #[test]
    fn unify_conflict() {
        let t = param("T", 0);
        let mut binding = Binding::empty();

        assert_eq!(unify(&Ty::Placeholder(t.clone()), &Ty::INT, &mut binding), Ok(true));

        let conflict = unify(&Ty::Placeholder(t.clone()), &Ty::FLOAT, &mut binding).unwrap_err();
        assert_eq!(conflict.param, t);
        assert_eq!(conflict.first, Ty::INT);
        assert_eq!(conflict.second, Ty::FLOAT);
    }

    #[test]
    fn structurally_equal_bindings() {
        let (t, u) = (param("T", 0), param("U", 0));
        let lhs = Binding::create(&[t.clone(), u.clone()], vec![Ty::INT, Ty::BOOL]).unwrap();
        let rhs = Binding::create(&[u, t], vec![Ty::BOOL, Ty::INT]).unwrap();

        assert_eq!(lhs, rhs);
        assert_eq!(lhs.to_string(), "[T = int, U = bool]");
    }
}
