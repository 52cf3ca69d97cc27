//! Every function and type declaration of a program, wherever it is declared, gets an entry
//! in the [`DeclTable`] and a lexical scope of its own. Declarations nested in function
//! bodies are registered in the scope of the function declaring them, and are hoisted out
//! of the body when it gets monomorphized.
//!
//! Declaring is done once for the whole program by [`declare`]. Signatures are resolved in a
//! second step, once every type name is known, by [`DeclTable::resolve_signatures`].

use std::collections::HashMap;

use ast::{Ast, GenericParameter, Node, TypedValue};
use error::{ErrKind, Error};
use location::SpanTuple;
use symbol::Symbol;

use crate::diagnostics::{self, Expected, Got};
use crate::scope::{Scope, ScopeId, Scopes, TypeEntry};
use crate::ty::{DeclId, Primitive, Ty, TypeParameter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Type,
}

/// Errors halt the resolution of the unit they happen in. Each top-level declaration is a
/// unit, along with everything declared inside it. The top-level statements, which share
/// their variables, form the last one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    Decl(DeclId),
    Entry,
}

/// Resolved types of a declaration's arguments and return type, or of its fields. They
/// may contain placeholders for the generic parameters in scope of the declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Signature {
    Function {
        args: Vec<(Symbol, Ty)>,
        return_type: Option<Ty>,
    },
    Type {
        fields: Vec<(Symbol, Ty)>,
    },
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub id: DeclId,
    pub kind: DeclKind,
    pub name: Symbol,
    /// Unique, human readable name: `outer::Inner`. Overloads of a function in the same
    /// scope get a numbered suffix
    pub path: String,
    /// Generic parameters introduced by this declaration only
    pub generics: Vec<TypeParameter>,
    pub parent: Option<DeclId>,
    pub unit: Unit,
    pub ast: Ast,
    pub signature: Option<Signature>,
}

impl Decl {
    pub fn scope(&self) -> ScopeId {
        ScopeId::Decl(self.id)
    }

    pub fn location(&self) -> &SpanTuple {
        &self.ast.location
    }

    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn body(&self) -> Option<&Ast> {
        match &self.ast.node {
            Node::Function { block, .. } => Some(block),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[(Symbol, Ty)] {
        match &self.signature {
            Some(Signature::Type { fields }) => fields,
            _ => &[],
        }
    }

    pub fn args(&self) -> &[(Symbol, Ty)] {
        match &self.signature {
            Some(Signature::Function { args, .. }) => args,
            _ => &[],
        }
    }

    pub fn return_type(&self) -> Option<&Ty> {
        match &self.signature {
            Some(Signature::Function { return_type, .. }) => return_type.as_ref(),
            _ => None,
        }
    }

    /// Location of the declared return type, or of the whole declaration if there is none
    pub fn return_type_location(&self) -> &SpanTuple {
        match &self.ast.node {
            Node::Function { decl, .. } => decl
                .return_type
                .as_ref()
                .map_or(&self.ast.location, |ty| &ty.location),
            _ => &self.ast.location,
        }
    }
}

#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<Decl>,
    scopes: Scopes,
    entry: Vec<Ast>,
    children: HashMap<DeclId, Vec<DeclId>>,
}

impl DeclTable {
    /// Fetch a declaration. Ids are only ever created by the table, so they always refer
    /// to an existing declaration
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Top-level statements which are not declarations
    pub fn entry(&self) -> &[Ast] {
        &self.entry
    }

    /// Declarations nested directly inside another one
    pub fn children(&self, id: DeclId) -> &[DeclId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn lookup_type(&self, scope: ScopeId, name: &Symbol) -> Option<TypeEntry> {
        self.scopes.lookup_type(scope, name)
    }

    /// Type declaration a name refers to in a scope, if any
    pub fn lookup_type_decl(&self, scope: ScopeId, name: &Symbol) -> Option<DeclId> {
        match self.scopes.lookup_type(scope, name) {
            Some(TypeEntry::Decl(id)) => Some(id),
            _ => None,
        }
    }

    pub fn lookup_functions(&self, scope: ScopeId, name: &Symbol) -> Vec<DeclId> {
        self.scopes.lookup_functions(scope, name)
    }

    /// Generic parameters of the declarations enclosing `id`, outermost first
    pub fn ancestor_params(&self, id: DeclId) -> Vec<TypeParameter> {
        let mut chain = vec![];
        let mut current = self.decl(id).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.decl(parent).parent;
        }

        chain
            .iter()
            .rev()
            .flat_map(|parent| self.decl(*parent).generics.iter().cloned())
            .collect()
    }

    /// Every generic parameter a declaration can refer to: its ancestors', then its own.
    /// A binding for this declaration must be total over these parameters
    pub fn all_params(&self, id: DeclId) -> Vec<TypeParameter> {
        let mut params = self.ancestor_params(id);
        params.extend(self.decl(id).generics.iter().cloned());

        params
    }

    /// The type a type declaration defines, with placeholders for all of its parameters
    pub fn self_ty(&self, id: DeclId) -> Ty {
        Ty::Named {
            decl: id,
            name: Symbol::from(self.decl(id).path.as_str()),
            args: self
                .all_params(id)
                .into_iter()
                .map(Ty::Placeholder)
                .collect(),
        }
    }

    /// Resolve a type as written in the source code, from a given scope
    pub fn resolve_type(&self, ty: &ast::Type, scope: ScopeId) -> Result<Ty, Error> {
        let name = ty.name.access();

        if let Some(prim) = Primitive::from_name(name) {
            return match ty.generics.len() {
                0 => Ok(Ty::Primitive(prim)),
                count => Err(diagnostics::generic_count_mismatch(
                    &ty.location,
                    name,
                    Expected(0),
                    Got(count),
                )),
            };
        }

        match self.scopes.lookup_type(scope, &ty.name) {
            Some(TypeEntry::Generic(param)) => match ty.generics.len() {
                0 => Ok(Ty::Placeholder(param.clone())),
                count => Err(diagnostics::generic_count_mismatch(
                    &ty.location,
                    name,
                    Expected(0),
                    Got(count),
                )),
            },
            Some(TypeEntry::Decl(id)) => {
                let decl = self.decl(id);
                if decl.generics.len() != ty.generics.len() {
                    return Err(diagnostics::generic_count_mismatch(
                        &ty.location,
                        name,
                        Expected(decl.generics.len()),
                        Got(ty.generics.len()),
                    ));
                }

                let mut args: Vec<Ty> = self
                    .ancestor_params(id)
                    .into_iter()
                    .map(Ty::Placeholder)
                    .collect();
                for generic in &ty.generics {
                    args.push(self.resolve_type(generic, scope)?);
                }

                Ok(Ty::Named {
                    decl: id,
                    name: Symbol::from(decl.path.as_str()),
                    args,
                })
            }
            None => Err(diagnostics::undeclared_type(
                &ty.location,
                name,
                self.scopes.visible_types(scope),
            )),
        }
    }

    fn resolve_typed_values(
        &self,
        values: &[TypedValue],
        scope: ScopeId,
        what: &str,
    ) -> Result<Vec<(Symbol, Ty)>, Error> {
        let mut seen: HashMap<&Symbol, &SpanTuple> = HashMap::new();

        values
            .iter()
            .map(|value| {
                if let Some(previous) = seen.insert(&value.symbol, &value.location) {
                    return Err(diagnostics::duplicate_declaration(
                        &value.location,
                        what,
                        value.symbol.access(),
                        previous,
                    ));
                }

                Ok((value.symbol.clone(), self.resolve_type(&value.ty, scope)?))
            })
            .collect()
    }

    fn resolve_signature(&self, decl: &Decl) -> Result<Signature, Error> {
        match &decl.ast.node {
            Node::Function { decl: fn_decl, .. } => {
                let args = self.resolve_typed_values(&fn_decl.args, decl.scope(), "argument")?;
                let return_type = fn_decl
                    .return_type
                    .as_ref()
                    .map(|ty| self.resolve_type(ty, decl.scope()))
                    .transpose()?;

                Ok(Signature::Function { args, return_type })
            }
            Node::Type { fields, .. } => Ok(Signature::Type {
                fields: self.resolve_typed_values(fields, decl.scope(), "field")?,
            }),
            _ => Err(Error::new(ErrKind::Mismatch)
                .with_msg(format!("`{}` is not a declaration", decl.path))
                .with_loc(decl.location().clone())),
        }
    }

    /// Resolve the types used in every declaration's signature. A declaration whose
    /// signature fails to resolve keeps no signature, and the error is returned alongside
    /// the unit it belongs to.
    pub fn resolve_signatures(&mut self) -> Vec<(Unit, Error)> {
        let resolved: Vec<Result<Signature, Error>> = self
            .decls
            .iter()
            .map(|decl| self.resolve_signature(decl))
            .collect();

        let mut errors = vec![];
        for (decl, signature) in self.decls.iter_mut().zip(resolved) {
            match signature {
                Ok(signature) => decl.signature = Some(signature),
                Err(e) => errors.push((decl.unit, e)),
            }
        }

        errors
    }
}

fn first_arg(ast: &Ast) -> Option<&ast::Type> {
    match &ast.node {
        Node::Function { decl, .. } => decl.args.first().map(|arg| &arg.ty),
        _ => None,
    }
}

fn same_type_text(lhs: &ast::Type, rhs: &ast::Type) -> bool {
    lhs.name == rhs.name
        && lhs.generics.len() == rhs.generics.len()
        && lhs
            .generics
            .iter()
            .zip(&rhs.generics)
            .all(|(l, r)| same_type_text(l, r))
}

/// Two functions with the same name can live in the same scope if they take a different
/// type of first argument, which is what the method call syntax dispatches on
fn same_receiver(lhs: Option<&ast::Type>, rhs: Option<&ast::Type>) -> bool {
    match (lhs, rhs) {
        (None, None) => true,
        (Some(lhs), Some(rhs)) => same_type_text(lhs, rhs),
        _ => false,
    }
}

#[derive(Default)]
struct Declarator {
    table: DeclTable,
    // top-level declarations failing to register do not belong to any unit
    errors: Vec<(Option<Unit>, Error)>,
}

impl Declarator {
    fn generic_params(
        &self,
        owner: DeclId,
        params: &[GenericParameter],
    ) -> Result<Vec<TypeParameter>, Error> {
        let mut seen: HashMap<&Symbol, &SpanTuple> = HashMap::new();

        params
            .iter()
            .map(|param| {
                if Primitive::from_name(param.name.access()).is_some() {
                    return Err(Error::new(ErrKind::Mismatch)
                        .with_msg(format!(
                            "primitive type `{}` cannot be used as a generic parameter",
                            param.name
                        ))
                        .with_loc(param.location.clone()));
                }
                if let Some(previous) = seen.insert(&param.name, &param.location) {
                    return Err(diagnostics::duplicate_declaration(
                        &param.location,
                        "generic parameter",
                        param.name.access(),
                        previous,
                    ));
                }

                Ok(TypeParameter {
                    name: param.name.clone(),
                    owner,
                })
            })
            .collect()
    }

    fn try_register(
        &mut self,
        id: DeclId,
        ast: &Ast,
        scope: ScopeId,
        parent: Option<DeclId>,
        unit: Unit,
    ) -> Result<(), Error> {
        let (kind, name, params) = match &ast.node {
            Node::Function { decl, .. } => (DeclKind::Function, &decl.name, &decl.generics),
            Node::Type { name, generics, .. } => (DeclKind::Type, name, generics),
            _ => return Ok(()),
        };

        if kind == DeclKind::Type && Primitive::from_name(name.access()).is_some() {
            return Err(Error::new(ErrKind::Mismatch)
                .with_msg(format!("cannot redeclare primitive type `{name}`"))
                .with_loc(ast.location.clone()));
        }

        let generics = self.generic_params(id, params)?;
        let mut path = match parent {
            Some(parent) => format!("{}::{}", self.table.decl(parent).path, name),
            None => String::from(name.access()),
        };

        let enclosing = self.table.scopes.entry(scope);
        match kind {
            DeclKind::Type => {
                if let Some(previous) = enclosing.types.get(name) {
                    return Err(diagnostics::duplicate_declaration(
                        &ast.location,
                        "type",
                        name.access(),
                        self.table.decls[previous.0].location(),
                    ));
                }

                enclosing.types.insert(name.clone(), id);
            }
            DeclKind::Function => {
                let overloads = enclosing.functions.entry(name.clone()).or_default();
                for previous in overloads.iter() {
                    let previous = &self.table.decls[previous.0];
                    if same_receiver(first_arg(ast), first_arg(&previous.ast)) {
                        return Err(diagnostics::duplicate_declaration(
                            &ast.location,
                            "function",
                            name.access(),
                            previous.location(),
                        ));
                    }
                }

                if !overloads.is_empty() {
                    path = format!("{path}#{}", overloads.len());
                }
                overloads.push(id);
            }
        }

        let mut own = Scope::new(scope);
        for param in &generics {
            own.generics.insert(param.name.clone(), param.clone());
        }
        self.table.scopes.insert(ScopeId::Decl(id), own);

        if let Some(parent) = parent {
            self.table.children.entry(parent).or_default().push(id);
        }

        self.table.decls.push(Decl {
            id,
            kind,
            name: name.clone(),
            path,
            generics,
            parent,
            unit,
            ast: ast.clone(),
            signature: None,
        });

        Ok(())
    }

    /// Register a declaration, then the declarations nested in its body. A `None` unit
    /// means the declaration is a unit of its own
    fn register(&mut self, ast: &Ast, scope: ScopeId, parent: Option<DeclId>, unit: Option<Unit>) {
        let id = DeclId(self.table.decls.len());
        let decl_unit = unit.unwrap_or(Unit::Decl(id));

        match self.try_register(id, ast, scope, parent, decl_unit) {
            Ok(()) => {
                if let Node::Function { block, .. } = &ast.node {
                    self.nested(block, ScopeId::Decl(id), Some(id), decl_unit);
                }
            }
            Err(e) => self.errors.push((unit, e)),
        }
    }

    fn nested(&mut self, ast: &Ast, scope: ScopeId, parent: Option<DeclId>, unit: Unit) {
        match &ast.node {
            Node::Block { stmts, .. } => stmts.iter().for_each(|stmt| {
                if stmt.is_declaration() {
                    self.register(stmt, scope, parent, Some(unit))
                } else {
                    self.nested(stmt, scope, parent, unit)
                }
            }),
            Node::IfElse {
                if_block,
                else_block,
                ..
            } => {
                self.nested(if_block, scope, parent, unit);
                if let Some(else_block) = else_block {
                    self.nested(else_block, scope, parent, unit);
                }
            }
            Node::VarDeclaration { value, .. } | Node::VarAssign { value, .. } => {
                self.nested(value, scope, parent, unit)
            }
            Node::Return(Some(value)) => self.nested(value, scope, parent, unit),
            _ => {}
        }
    }
}

/// Register every declaration of a program. The program is expected to be the top-level
/// block returned by the parser
pub fn declare(program: &Ast) -> (DeclTable, Vec<(Option<Unit>, Error)>) {
    let mut declarator = Declarator::default();

    let stmts = match &program.node {
        Node::Block { stmts, .. } => stmts.as_slice(),
        _ => std::slice::from_ref(program),
    };

    for stmt in stmts {
        if stmt.is_declaration() {
            declarator.register(stmt, ScopeId::Root, None, None);
        } else {
            declarator.nested(stmt, ScopeId::Root, None, Unit::Entry);
            declarator.table.entry.push(stmt.clone());
        }
    }

    (declarator.table, declarator.errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(program: Ast) -> DeclTable {
        let (mut table, errors) = declare(&program);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(table.resolve_signatures().is_empty());

        table
    }

    fn find<'t>(table: &'t DeclTable, path: &str) -> &'t Decl {
        table.iter().find(|decl| decl.path == path).unwrap()
    }

    #[test]
    fn top_level_and_nested() {
        let table = table(xparser::ast! {
            type Box[T](inner: T);
            func unbox[T](b: Box[T]) -> T {
                func peek[U](v: U) -> U { v }
                peek(b.inner)
            }
            unbox(Box(inner: 15));
        });

        assert_eq!(table.len(), 3);
        assert_eq!(table.entry().len(), 1);

        let peek = find(&table, "unbox::peek");
        let unbox = find(&table, "unbox");
        assert_eq!(peek.parent, Some(unbox.id));
        assert_eq!(peek.unit, Unit::Decl(unbox.id));
        assert_eq!(table.children(unbox.id), &[peek.id]);

        let params: Vec<String> = table
            .all_params(peek.id)
            .iter()
            .map(|p| p.name.to_string())
            .collect();
        assert_eq!(params, vec!["T", "U"]);
    }

    #[test]
    fn inner_type_carries_outer_params() {
        let table = table(xparser::ast! {
            func outer[T](value: T) -> T {
                type Wrapper(inner: T);
                func unwrap(w: Wrapper) -> T { w.inner }
                unwrap(Wrapper(inner: value))
            }
        });

        let unwrap = find(&table, "outer::unwrap");
        let wrapper = find(&table, "outer::Wrapper");

        assert_eq!(unwrap.args()[0].1, table.self_ty(wrapper.id));
        assert_eq!(unwrap.args()[0].1.to_string(), "outer::Wrapper[T]");
        assert!(wrapper.fields()[0].1.contains_placeholder());
    }

    #[test]
    fn generic_shadowing() {
        let table = table(xparser::ast! {
            func outer[T](a: T) -> T {
                func inner[T](b: T) -> T { b }
                a
            }
        });

        let outer = find(&table, "outer");
        let inner = find(&table, "outer::inner");

        match &inner.args()[0].1 {
            Ty::Placeholder(param) => assert_eq!(param.owner, inner.id),
            other => panic!("unexpected type {other}"),
        }
        match &outer.args()[0].1 {
            Ty::Placeholder(param) => assert_eq!(param.owner, outer.id),
            other => panic!("unexpected type {other}"),
        }
    }

    #[test]
    fn undeclared_return_type() {
        let (mut table, errors) = declare(&xparser::ast! {
            func f[T](a: T) -> U { a }
        });
        assert!(errors.is_empty());

        let errors = table.resolve_signatures();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, Unit::Decl(DeclId(0)));
        assert_eq!(errors[0].1.kind(), ErrKind::UndeclaredType);
    }

    #[test]
    fn generic_argument_count() {
        let (mut table, _) = declare(&xparser::ast! {
            type Box[T](inner: T);
            func f(b: Box[int, int]) {}
        });

        let errors = table.resolve_signatures();
        assert_eq!(errors[0].1.kind(), ErrKind::Mismatch);
    }

    #[test]
    fn duplicate_type() {
        let (table, errors) = declare(&xparser::ast! {
            type Marker;
            type Marker;
        });

        assert_eq!(table.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, None);
        assert_eq!(errors[0].1.hints().len(), 1);
    }

    #[test]
    fn overloads_on_receiver() {
        let (table, errors) = declare(&xparser::ast! {
            type Point(x: int);
            type Circle(r: int);
            func describe(p: Point) -> int { p.x }
            func describe(c: Circle) -> int { c.r }
        });

        assert!(errors.is_empty());
        assert_eq!(
            table.lookup_functions(ScopeId::Root, &Symbol::from("describe")).len(),
            2
        );
        assert!(table.iter().any(|decl| decl.path == "describe#1"));
    }

    #[test]
    fn duplicate_function_same_receiver() {
        let (_, errors) = declare(&xparser::ast! {
            func describe(a: int) -> int { a }
            func describe(b: int) -> int { b }
        });

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.kind(), ErrKind::Mismatch);
    }

    #[test]
    fn duplicate_generic_parameter() {
        let (_, errors) = declare(&xparser::ast! {
            func f[T, T](a: T) -> T { a }
        });

        assert_eq!(errors[0].1.kind(), ErrKind::Mismatch);
    }

    #[test]
    fn redeclare_primitive() {
        let (_, errors) = declare(&xparser::ast! {
            type int(x: float);
        });

        assert_eq!(errors[0].1.kind(), ErrKind::Mismatch);
    }
}
