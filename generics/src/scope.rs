//! Lexical scopes. The root scope contains the top-level declarations, and every function
//! or type declaration opens a scope containing its generic parameters and, for functions,
//! the declarations nested in its body. Lookups walk from the innermost scope outwards, so
//! inner declarations and parameters shadow outer ones.

use std::collections::HashMap;

use symbol::Symbol;

use crate::ty::{DeclId, TypeParameter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Root,
    Decl(DeclId),
}

#[derive(Debug, Default)]
pub struct Scope {
    pub(crate) parent: Option<ScopeId>,
    pub(crate) types: HashMap<Symbol, DeclId>,
    pub(crate) functions: HashMap<Symbol, Vec<DeclId>>,
    pub(crate) generics: HashMap<Symbol, TypeParameter>,
}

impl Scope {
    pub fn new(parent: ScopeId) -> Scope {
        Scope {
            parent: Some(parent),
            ..Scope::default()
        }
    }
}

/// What a type name refers to
#[derive(Debug, PartialEq)]
pub enum TypeEntry<'s> {
    Generic(&'s TypeParameter),
    Decl(DeclId),
}

#[derive(Debug)]
pub struct Scopes(HashMap<ScopeId, Scope>);

impl Default for Scopes {
    fn default() -> Scopes {
        let mut scopes = HashMap::new();
        scopes.insert(ScopeId::Root, Scope::default());

        Scopes(scopes)
    }
}

impl Scopes {
    pub fn insert(&mut self, id: ScopeId, scope: Scope) {
        self.0.insert(id, scope);
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.0.get(&id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.0.get_mut(&id)
    }

    pub fn entry(&mut self, id: ScopeId) -> &mut Scope {
        self.0.entry(id).or_default()
    }

    /// Iterate on a scope and all of its enclosing scopes, innermost first
    fn chain(&self, from: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        std::iter::successors(self.0.get(&from), move |scope| {
            scope.parent.and_then(|parent| self.0.get(&parent))
        })
    }

    /// Generic parameters shadow types declared in the same scope
    pub fn lookup_type(&self, from: ScopeId, name: &Symbol) -> Option<TypeEntry> {
        self.chain(from).find_map(|scope| {
            scope
                .generics
                .get(name)
                .map(TypeEntry::Generic)
                .or_else(|| scope.types.get(name).copied().map(TypeEntry::Decl))
        })
    }

    /// All the functions with the given name visible from a scope, innermost first
    pub fn lookup_functions(&self, from: ScopeId, name: &Symbol) -> Vec<DeclId> {
        self.chain(from)
            .filter_map(|scope| scope.functions.get(name))
            .flatten()
            .copied()
            .collect()
    }

    /// Names of every type and generic parameter visible from a scope
    pub fn visible_types(&self, from: ScopeId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .chain(from)
            .flat_map(|scope| scope.generics.keys().chain(scope.types.keys()))
            .map(Symbol::access)
            .collect();
        names.extend(builtins::PRIMITIVE_TYPES.iter().copied());

        names
    }

    /// Names of every function visible from a scope
    pub fn visible_functions(&self, from: ScopeId) -> Vec<&str> {
        self.chain(from)
            .flat_map(|scope| scope.functions.keys())
            .map(Symbol::access)
            .collect()
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

    fn scopes() -> Scopes {
        let mut scopes = Scopes::default();
        let root = scopes.get_mut(ScopeId::Root).unwrap();
        root.types.insert(Symbol::from("T"), DeclId(0));
        root.functions.insert(Symbol::from("f"), vec![DeclId(1)]);

        let mut outer = Scope::new(ScopeId::Root);
        outer.generics.insert(Symbol::from("T"), param("T", 1));
        outer.functions.insert(Symbol::from("f"), vec![DeclId(2)]);
        scopes.insert(ScopeId::Decl(DeclId(1)), outer);

        scopes
    }

    #[test]
    fn generic_shadows_type() {
        let scopes = scopes();
        let t = param("T", 1);

        assert_eq!(
            scopes.lookup_type(ScopeId::Decl(DeclId(1)), &Symbol::from("T")),
            Some(TypeEntry::Generic(&t))
        );
        assert_eq!(
            scopes.lookup_type(ScopeId::Root, &Symbol::from("T")),
            Some(TypeEntry::Decl(DeclId(0)))
        );
    }

    #[test]
    fn functions_innermost_first() {
        let scopes = scopes();

        assert_eq!(
            scopes.lookup_functions(ScopeId::Decl(DeclId(1)), &Symbol::from("f")),
            vec![DeclId(2), DeclId(1)]
        );
        assert!(scopes
            .lookup_functions(ScopeId::Root, &Symbol::from("g"))
            .is_empty());
    }

    #[test]
    fn visible_names_include_primitives() {
        let scopes = scopes();
        let visible = scopes.visible_types(ScopeId::Root);

        assert!(visible.contains(&"T"));
        assert!(visible.contains(&"int"));
    }
}
