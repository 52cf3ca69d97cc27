//! Monomorphization. Every pair of a generic declaration and a binding for its parameters
//! gets expanded once into a [`Specialization`] with a mangled name, and the generic
//! declaration itself never makes it to the output.
//!
//! ```ignore
//! func id[T](value: T) -> T { value }
//!
//! id(15);
//! id("hello");
//! ```
//!
//! expands to
//!
//! ```ignore
//! func id+int(value: int) -> int { value }
//! func id+string(value: string) -> string { value }
//!
//! id+int(15);
//! id+string("hello");
//! ```
//!
//! Instantiations are cached: the constraints of a declaration are checked against a
//! binding the first time the pair is seen, and every later use reuses the outcome. A
//! binding containing types deeper than [`MAX_TYPE_DEPTH`], or an instantiation nested
//! deeper than [`MAX_INSTANTIATION_DEPTH`], is reported as a cycle.

use std::collections::HashMap;

use ast::{Ast, Node, TypedValue};
use error::{ErrKind, Error};
use location::SpanTuple;
use symbol::Symbol;

use crate::constraints::ConstraintMap;
use crate::decls::{DeclKind, DeclTable, Unit};
use crate::diagnostics::{self, format, Expected, Got};
use crate::duck;
use crate::typer::Typer;
use crate::ty::{mangle, original_name, Binding, DeclId, Ty};

pub const MAX_INSTANTIATION_DEPTH: usize = 64;
pub const MAX_TYPE_DEPTH: usize = 32;

/// Number of instantiations shown when reporting a cycle
const CHAIN_LENGTH: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct InstanceKey {
    decl: DeclId,
    binding: Binding,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SpecId(usize);

#[derive(Clone, Copy, Debug)]
enum Entry {
    Ready(SpecId),
    Failed(ErrKind),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Specialization {
    Function {
        name: String,
        origin: DeclId,
        binding: Binding,
        location: SpanTuple,
        args: Vec<(Symbol, Ty)>,
        return_type: Option<Ty>,
        block: Ast,
    },
    Type {
        name: String,
        origin: DeclId,
        binding: Binding,
        location: SpanTuple,
        ty: Ty,
        fields: Vec<(Symbol, Ty)>,
    },
}

/// Name of the specialization of a concrete type
pub(crate) fn ty_name(ty: &Ty) -> String {
    match ty {
        Ty::Named { name, args, .. } => mangle(name.access(), args),
        other => other.to_string(),
    }
}

fn ast_type(ty: &Ty, location: &SpanTuple) -> ast::Type {
    ast::Type {
        name: Symbol::from(ty_name(ty)),
        generics: vec![],
        location: location.clone(),
    }
}

fn typed_values(values: &[(Symbol, Ty)], location: &SpanTuple) -> Vec<TypedValue> {
    values
        .iter()
        .map(|(symbol, ty)| TypedValue {
            location: location.clone(),
            symbol: symbol.clone(),
            ty: ast_type(ty, location),
        })
        .collect()
}

impl Specialization {
    pub fn name(&self) -> &str {
        match self {
            Specialization::Function { name, .. } | Specialization::Type { name, .. } => name,
        }
    }

    pub fn origin(&self) -> DeclId {
        match self {
            Specialization::Function { origin, .. } | Specialization::Type { origin, .. } => {
                *origin
            }
        }
    }

    pub fn binding(&self) -> &Binding {
        match self {
            Specialization::Function { binding, .. } | Specialization::Type { binding, .. } => {
                binding
            }
        }
    }

    fn types(&self) -> Vec<&Ty> {
        match self {
            Specialization::Function {
                args, return_type, ..
            } => args.iter().map(|(_, ty)| ty).chain(return_type).collect(),
            Specialization::Type { ty, fields, .. } => {
                fields.iter().map(|(_, ty)| ty).chain(Some(ty)).collect()
            }
        }
    }

    /// The declaration this specialization stands for, without generics
    pub fn to_ast(&self) -> Ast {
        match self {
            Specialization::Function {
                name,
                location,
                args,
                return_type,
                block,
                ..
            } => Ast {
                location: location.clone(),
                node: Node::Function {
                    decl: ast::Declaration {
                        name: Symbol::from(name.as_str()),
                        generics: vec![],
                        args: typed_values(args, location),
                        return_type: return_type.as_ref().map(|ty| ast_type(ty, location)),
                    },
                    block: Box::new(block.clone()),
                },
            },
            Specialization::Type {
                name,
                location,
                fields,
                ..
            } => Ast {
                location: location.clone(),
                node: Node::Type {
                    name: Symbol::from(name.as_str()),
                    generics: vec![],
                    fields: typed_values(fields, location),
                },
            },
        }
    }
}

/// The result of resolving a program: every specialization which was needed, and the
/// program's top-level statements rewritten to use them
#[derive(Debug)]
pub struct MonoProgram {
    specializations: Vec<Specialization>,
    entry: Vec<Ast>,
    checks: HashMap<String, usize>,
    names: HashMap<String, usize>,
}

impl MonoProgram {
    pub fn specializations(&self) -> &[Specialization] {
        &self.specializations
    }

    pub fn entry(&self) -> &[Ast] {
        &self.entry
    }

    pub fn get(&self, name: &str) -> Option<&Specialization> {
        self.names.get(name).map(|idx| &self.specializations[*idx])
    }

    pub fn function(&self, name: &str) -> Option<&Specialization> {
        self.get(name)
            .filter(|spec| matches!(spec, Specialization::Function { .. }))
    }

    pub fn ty(&self, name: &str) -> Option<&Specialization> {
        self.get(name)
            .filter(|spec| matches!(spec, Specialization::Type { .. }))
    }

    /// Specializations of a declaration, by the declaration's name
    pub fn instances_of(&self, original: &str) -> Vec<&Specialization> {
        self.specializations
            .iter()
            .filter(|spec| original_name(spec.name()) == original)
            .collect()
    }

    /// How many times the constraints of a specialization were checked
    pub fn check_count(&self, name: &str) -> usize {
        self.checks.get(name).copied().unwrap_or(0)
    }

    pub fn has_placeholders(&self) -> bool {
        self.specializations
            .iter()
            .flat_map(Specialization::types)
            .any(Ty::contains_placeholder)
    }

    /// The whole program as a single block: specialized types, specialized functions,
    /// then the top-level statements
    pub fn to_ast(&self) -> Ast {
        let mut stmts: Vec<Ast> = self
            .specializations
            .iter()
            .filter(|spec| matches!(spec, Specialization::Type { .. }))
            .chain(
                self.specializations
                    .iter()
                    .filter(|spec| matches!(spec, Specialization::Function { .. })),
            )
            .map(Specialization::to_ast)
            .collect();
        stmts.extend(self.entry.iter().cloned());

        let location = stmts
            .first()
            .map(|stmt| stmt.location.clone())
            .unwrap_or_else(|| {
                SpanTuple::with_source_ref(
                    location::Source::Empty,
                    location::Location::new(1, 1),
                    location::Location::new(1, 1),
                )
            });

        Ast {
            location,
            node: Node::Block {
                stmts,
                last_is_expr: false,
            },
        }
    }
}

pub struct Monomorphizer<'table> {
    pub(crate) table: &'table DeclTable,
    constraints: &'table ConstraintMap,
    cache: HashMap<InstanceKey, Entry>,
    specs: Vec<Option<Specialization>>,
    stack: Vec<String>,
    checks: HashMap<String, usize>,
    broken: HashMap<Unit, ErrKind>,
    entry: Vec<Ast>,
}

impl<'table> Monomorphizer<'table> {
    pub fn new(table: &'table DeclTable, constraints: &'table ConstraintMap) -> Monomorphizer<'table> {
        Monomorphizer {
            table,
            constraints,
            cache: HashMap::new(),
            specs: vec![],
            stack: vec![],
            checks: HashMap::new(),
            broken: HashMap::new(),
            entry: vec![],
        }
    }

    /// Declarations of a broken unit cannot be instantiated anymore: their uses are
    /// reported instead
    pub fn mark_broken(&mut self, unit: Unit, kind: ErrKind) {
        self.broken.entry(unit).or_insert(kind);
    }

    /// Has the instantiation of a declaration with a binding already been attempted
    pub fn is_cached(&self, decl: DeclId, binding: &Binding) -> bool {
        self.cache.contains_key(&InstanceKey {
            decl,
            binding: binding.clone(),
        })
    }

    fn cached(&self, entry: Entry, name: &str, loc: &SpanTuple) -> Result<String, Error> {
        match entry {
            Entry::Ready(_) => Ok(name.to_string()),
            Entry::Failed(kind) => Err(Error::new(kind)
                .with_msg(format!("cannot instantiate {}", format::name(name)))
                .with_loc(loc.clone())),
        }
    }

    pub(crate) fn check_unit(&self, id: DeclId, loc: &SpanTuple) -> Result<(), Error> {
        let decl = self.table.decl(id);

        match self.broken.get(&decl.unit) {
            None => Ok(()),
            Some(kind) => Err(Error::new(*kind)
                .with_msg(format!(
                    "cannot use {}: its declaration contains errors",
                    format::name(&decl.path)
                ))
                .with_loc(loc.clone())
                .with_hint(
                    Error::hint()
                        .with_msg(String::from("declared here"))
                        .with_loc(decl.location().clone()),
                )),
        }
    }

    fn check_depth(&self, name: &str, binding: &Binding, loc: &SpanTuple) -> Result<(), Error> {
        let too_deep = binding.iter().any(|(_, ty)| ty.depth() > MAX_TYPE_DEPTH);

        if !too_deep && self.stack.len() < MAX_INSTANTIATION_DEPTH {
            return Ok(());
        }

        let chain = self
            .stack
            .iter()
            .rev()
            .take(CHAIN_LENGTH)
            .rev()
            .map(|name| format::name(name))
            .collect::<Vec<String>>()
            .join(" -> ");

        Err(Error::new(ErrKind::CyclicInstantiation)
            .with_msg(format!(
                "instantiation of {} never terminates",
                format::name(original_name(name))
            ))
            .with_loc(loc.clone())
            .with_hint(Error::hint().with_msg(format!(
                "instantiated from {chain}, each step requiring a new specialization"
            ))))
    }

    /// Run one expansion with the instantiation stack and the cache kept up to date
    fn expand<F>(
        &mut self,
        key: InstanceKey,
        name: String,
        loc: &SpanTuple,
        expansion: F,
    ) -> Result<String, Error>
    where
        F: FnOnce(&mut Self, &InstanceKey, &str) -> Result<(), Error>,
    {
        if let Some(entry) = self.cache.get(&key) {
            return self.cached(*entry, &name, loc);
        }

        self.stack.push(name.clone());
        let result = expansion(self, &key, &name);
        self.stack.pop();

        match result {
            Ok(()) => Ok(name),
            Err(e) => {
                log!(mono, "failed to instantiate `{name}`: {}", e.kind().as_str());

                if let Some(Entry::Ready(spec)) = self.cache.get(&key) {
                    self.specs[spec.0] = None;
                }
                self.cache.insert(key, Entry::Failed(e.kind()));

                Err(e.or_loc(loc))
            }
        }
    }

    fn push(&mut self, key: &InstanceKey, spec: Specialization) -> SpecId {
        let id = SpecId(self.specs.len());
        self.specs.push(Some(spec));
        self.cache.insert(key.clone(), Entry::Ready(id));

        id
    }

    fn count_check(&mut self, name: &str) {
        *self.checks.entry(name.to_string()).or_default() += 1;
    }

    /// Instantiate the user types mentioned in a concrete type
    fn instantiate_mentioned(&mut self, ty: &Ty, loc: &SpanTuple) -> Result<(), Error> {
        if let Ty::Named { args, .. } = ty {
            for arg in args {
                self.instantiate_mentioned(arg, loc)?;
            }
            self.instantiate_type(ty, loc)?;
        }

        Ok(())
    }

    /// Instantiate a function declaration with a binding total over all of its parameters,
    /// and return the name of the specialization
    pub fn instantiate_function(
        &mut self,
        id: DeclId,
        binding: &Binding,
        loc: &SpanTuple,
    ) -> Result<String, Error> {
        self.check_unit(id, loc)?;

        let table = self.table;
        let decl = table.decl(id);
        let binding = binding.restrict(&table.all_params(id));
        let types = binding
            .types_of(&table.all_params(id))
            .map_err(|e| e.with_loc(loc.clone()))?;

        let key = InstanceKey {
            decl: id,
            binding: binding.clone(),
        };
        let name = mangle(&decl.path, &types);

        self.expand(key, name, loc, |mono, key, name| {
            mono.check_depth(name, &binding, loc)?;

            log!(mono, "instantiating `{name}` with {binding}");
            mono.count_check(name);
            if let Some(set) = mono.constraints.get(id) {
                duck::check(table, &binding, set, loc)?;
            }

            let args = decl
                .args()
                .iter()
                .map(|(arg, ty)| Ok((arg.clone(), ty.substitute(&binding)?)))
                .collect::<Result<Vec<(Symbol, Ty)>, Error>>()
                .map_err(|e: Error| e.or_loc(decl.location()))?;
            let return_type = decl
                .return_type()
                .map(|ty| ty.substitute(&binding))
                .transpose()
                .map_err(|e| e.or_loc(decl.return_type_location()))?;

            for ty in args.iter().map(|(_, ty)| ty).chain(return_type.iter()) {
                mono.instantiate_mentioned(ty, loc)?;
            }

            let body = match decl.body() {
                Some(body) => body,
                None => return Ok(()),
            };

            let spec = mono.push(
                key,
                Specialization::Function {
                    name: name.to_string(),
                    origin: id,
                    binding: binding.clone(),
                    location: decl.location().clone(),
                    args: args.clone(),
                    return_type: return_type.clone(),
                    block: body.clone(),
                },
            );

            let (block, body_ty) = {
                let mut typer = Typer::function(
                    mono,
                    decl.scope(),
                    binding.clone(),
                    &args,
                    return_type.clone(),
                    name,
                );
                typer.type_node(body)?
            };

            if !ends_with_return(body) && body_ty != return_type {
                let err = diagnostics::incompatible_return_type(
                    decl.return_type_location(),
                    &decl.path,
                    Expected(return_type.as_ref()),
                    Got(body_ty.as_ref()),
                );

                return Err(match binding.is_empty() {
                    true => err,
                    false => err.with_hint(
                        Error::hint().with_msg(format!("when instantiated with {binding}")),
                    ),
                });
            }

            for child in table.children(id) {
                let child_decl = table.decl(*child);
                if child_decl.is_generic() {
                    continue;
                }

                match child_decl.kind {
                    DeclKind::Function => {
                        mono.instantiate_function(*child, &binding, child_decl.location())?;
                    }
                    DeclKind::Type => {
                        let ty = table
                            .self_ty(*child)
                            .substitute(&binding)
                            .map_err(|e| e.with_loc(child_decl.location().clone()))?;
                        mono.instantiate_type(&ty, child_decl.location())?;
                    }
                }
            }

            if let Some(Specialization::Function { block: spec_block, .. }) =
                mono.specs[spec.0].as_mut()
            {
                *spec_block = block;
            }

            Ok(())
        })
    }

    /// Instantiate the type declaration a concrete type refers to, and return the name of
    /// the specialization
    pub fn instantiate_type(&mut self, ty: &Ty, loc: &SpanTuple) -> Result<String, Error> {
        let (id, args) = match ty {
            Ty::Named { decl, args, .. } => (*decl, args),
            other => return Ok(ty_name(other)),
        };

        self.check_unit(id, loc)?;

        let table = self.table;
        let decl = table.decl(id);
        let binding = Binding::create(&table.all_params(id), args.clone())
            .map_err(|e| e.with_loc(loc.clone()))?;

        let key = InstanceKey {
            decl: id,
            binding: binding.clone(),
        };
        let name = ty_name(ty);

        self.expand(key, name, loc, |mono, key, name| {
            mono.check_depth(name, &binding, loc)?;

            log!(mono, "instantiating type `{name}`");
            mono.count_check(name);
            if let Some(set) = mono.constraints.get(id) {
                duck::check(table, &binding, set, loc)?;
            }

            let fields = decl
                .fields()
                .iter()
                .map(|(field, ty)| Ok((field.clone(), ty.substitute(&binding)?)))
                .collect::<Result<Vec<(Symbol, Ty)>, Error>>()
                .map_err(|e: Error| e.or_loc(decl.location()))?;

            mono.push(
                key,
                Specialization::Type {
                    name: name.to_string(),
                    origin: id,
                    binding: binding.clone(),
                    location: decl.location().clone(),
                    ty: ty.clone(),
                    fields: fields.clone(),
                },
            );

            for (_, field_ty) in &fields {
                mono.instantiate_mentioned(field_ty, loc)?;
            }

            Ok(())
        })
    }

    /// Resolve the top-level statements of the program, which share their variables
    pub fn instantiate_entry(&mut self, stmts: &[Ast]) -> Result<(), Error> {
        let mut resolved = vec![];
        {
            let mut typer = Typer::entry(self);
            for stmt in stmts {
                let (stmt, _) = typer.type_node(stmt)?;
                if !matches!(stmt.node, Node::Empty) {
                    resolved.push(stmt);
                }
            }
        }

        self.entry.extend(resolved);

        Ok(())
    }

    pub fn finish(self) -> MonoProgram {
        let specializations: Vec<Specialization> = self.specs.into_iter().flatten().collect();
        let names = specializations
            .iter()
            .enumerate()
            .map(|(idx, spec)| (spec.name().to_string(), idx))
            .collect();

        let program = MonoProgram {
            specializations,
            entry: self.entry,
            checks: self.checks,
            names,
        };
        debug_assert!(!program.has_placeholders());

        program
    }
}

fn ends_with_return(body: &Ast) -> bool {
    match &body.node {
        Node::Block { stmts, .. } => stmts.last().map_or(false, ends_with_return),
        Node::Return(_) => true,
        Node::IfElse {
            if_block,
            else_block: Some(else_block),
            ..
        } => ends_with_return(if_block) && ends_with_return(else_block),
        _ => false,
    }
}
