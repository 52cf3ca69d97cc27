//! The constraint builder walks the body of every declaration and records what is done
//! with values whose type is a generic parameter: which fields are accessed on them, which
//! methods are called on them, and which operators they are used with. These requirements
//! are what a concrete type has to provide in order to be bound to the parameter.
//!
//! ```ignore
//! func describe[T](value: T) -> int {
//!     value.width * value.area(2)
//! }
//! ```
//!
//! records that `T` must have a field `width`, and a method `area` taking an `int`.
//!
//! Bodies are typed symbolically: the type of an expression may contain placeholders, or
//! be unknown altogether, in which case nothing gets recorded for it.

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use ast::{Ast, Node, Operator};
use error::Error;
use location::SpanTuple;
use symbol::Symbol;

use crate::decls::{Decl, DeclTable};
use crate::diagnostics;
use crate::scope::ScopeId;
use crate::ty::{unify, Binding, DeclId, Ty, TypeParameter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    Field(Symbol),
    /// Arguments are the types of the other operands of the call, when they are known.
    /// The method is looked up from the scope the call happens in
    Method {
        name: Symbol,
        args: Vec<Option<Ty>>,
        scope: ScopeId,
    },
    Operator(Operator),
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Constraint::Field(field) => write!(f, "has field `{field}`"),
            Constraint::Method { name, args, .. } => {
                write!(f, "has method `{name}` taking (")?;
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    match arg {
                        Some(ty) => write!(f, "{ty}")?,
                        None => write!(f, "_")?,
                    }
                }
                write!(f, ")")
            }
            Constraint::Operator(op) => write!(f, "supports operator `{}`", op.as_str()),
        }
    }
}

/// A constraint recorded on a generic parameter, and the expression which required it
#[derive(Clone, Debug)]
pub struct Requirement {
    pub param: TypeParameter,
    pub constraint: Constraint,
    pub location: SpanTuple,
}

/// Requirements in the order they were collected, without duplicates
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet(Vec<Requirement>);

impl ConstraintSet {
    /// Record a requirement, unless an identical one was already recorded for this
    /// parameter. Returns whether the requirement is new
    pub fn record(&mut self, requirement: Requirement) -> bool {
        let exists = self.0.iter().any(|existing| {
            existing.param == requirement.param && existing.constraint == requirement.constraint
        });

        if !exists {
            self.0.push(requirement);
        }

        !exists
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.0.iter()
    }

    /// Requirements recorded on a single parameter
    pub fn of<'s>(&'s self, param: &'s TypeParameter) -> impl Iterator<Item = &'s Requirement> {
        self.0.iter().filter(move |req| &req.param == param)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Constraint sets of every generic declaration. A requirement on a parameter belongs to
/// the declaration introducing that parameter, even when recorded in a nested declaration
#[derive(Debug, Default)]
pub struct ConstraintMap(HashMap<DeclId, ConstraintSet>);

impl ConstraintMap {
    pub fn get(&self, decl: DeclId) -> Option<&ConstraintSet> {
        self.0.get(&decl)
    }

    fn record(&mut self, requirement: Requirement) -> bool {
        self.0
            .entry(requirement.param.owner)
            .or_default()
            .record(requirement)
    }
}

/// Local variables, one frame per block
type Env = Vec<HashMap<Symbol, Option<Ty>>>;

fn lookup_var(env: &Env, name: &Symbol) -> Option<Option<Ty>> {
    env.iter().rev().find_map(|frame| frame.get(name)).cloned()
}

/// Does a function accept arguments of the given types, as far as we know them
fn accepts(callee: &Decl, args: &[Option<Ty>]) -> bool {
    let mut binding = Binding::empty();

    callee.args().len() == args.len()
        && callee
            .args()
            .iter()
            .zip(args)
            .all(|((_, declared), actual)| match actual {
                Some(actual) => unify(declared, actual, &mut binding) == Ok(true),
                None => true,
            })
}

pub struct ConstraintBuilder<'table> {
    table: &'table DeclTable,
    constraints: ConstraintMap,
}

impl<'table> ConstraintBuilder<'table> {
    pub fn new(table: &'table DeclTable) -> ConstraintBuilder<'table> {
        ConstraintBuilder {
            table,
            constraints: ConstraintMap::default(),
        }
    }

    pub fn finish(self) -> ConstraintMap {
        self.constraints
    }

    /// Collect the requirements a declaration's body puts on the generic parameters in
    /// scope. Types do not have a body, and their fields were checked when resolving their
    /// signature
    pub fn collect(&mut self, id: DeclId) -> Result<(), Error> {
        let decl = self.table.decl(id);
        let body = match decl.body() {
            Some(body) => body,
            None => return Ok(()),
        };

        log!(constraints, "collecting in `{}`", decl.path);

        let mut env: Env = vec![decl
            .args()
            .iter()
            .map(|(name, ty)| (name.clone(), Some(ty.clone())))
            .collect()];

        self.visit(body, decl.scope(), &mut env).map(|_| ())
    }

    fn record(&mut self, param: &TypeParameter, constraint: Constraint, location: &SpanTuple) {
        let requirement = Requirement {
            param: param.clone(),
            constraint,
            location: location.clone(),
        };

        log!(
            constraints,
            "`{}` {} ({})",
            param.name,
            requirement.constraint,
            location.position()
        );

        self.constraints.record(requirement);
    }

    fn visit_generics(&self, generics: &[ast::Type], scope: ScopeId) -> Result<Vec<Ty>, Error> {
        generics
            .iter()
            .map(|ty| self.table.resolve_type(ty, scope))
            .collect()
    }

    fn visit_args(
        &mut self,
        args: &[Ast],
        scope: ScopeId,
        env: &mut Env,
    ) -> Result<Vec<Option<Ty>>, Error> {
        let mut tys = vec![];
        for arg in args {
            tys.push(self.visit(arg, scope, env)?);
        }

        Ok(tys)
    }

    /// Type of a field on a user type, if the field exists
    fn field_ty(&self, ty: &Ty, field: &Symbol) -> Option<Ty> {
        match ty {
            Ty::Named { decl, args, .. } => {
                let binding = Binding::create(&self.table.all_params(*decl), args.clone()).ok()?;

                self.table
                    .decl(*decl)
                    .fields()
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, ty)| ty.substitute_known(&binding))
            }
            _ => None,
        }
    }

    /// Result type of a call, when the callee can be found and its generic parameters
    /// inferred from what we know of the arguments
    fn call_ty(
        &self,
        name: &Symbol,
        generics: &[Ty],
        args: &[Option<Ty>],
        scope: ScopeId,
    ) -> Option<Ty> {
        let candidates: Vec<&Decl> = self
            .table
            .lookup_functions(scope, name)
            .into_iter()
            .map(|id| self.table.decl(id))
            .filter(|decl| decl.signature.is_some() && decl.args().len() == args.len())
            .collect();

        let callee = candidates
            .iter()
            .find(|decl| accepts(decl, args))
            .or_else(|| candidates.first())?;

        let mut binding = Binding::empty();
        if !generics.is_empty() {
            let explicit = Binding::create(&callee.generics, generics.to_vec()).ok()?;
            binding = binding.extend(&explicit);
        }
        for ((_, declared), actual) in callee.args().iter().zip(args) {
            if let Some(actual) = actual {
                let _ = unify(declared, actual, &mut binding);
            }
        }

        let return_type = callee.return_type()?.substitute_known(&binding);
        match return_type.mentions_params_of(callee.id) {
            true => None,
            false => Some(return_type),
        }
    }

    /// Type of an instantiation, when its generic parameters can be inferred from what we
    /// know of the fields
    fn instance_ty(
        &self,
        name: &Symbol,
        generics: &[Ty],
        fields: &[(Symbol, Option<Ty>)],
        scope: ScopeId,
    ) -> Option<Ty> {
        let id = self.table.lookup_type_decl(scope, name)?;
        let decl = self.table.decl(id);

        let mut binding = match generics.is_empty() {
            true => Binding::empty(),
            false => Binding::create(&decl.generics, generics.to_vec()).ok()?,
        };
        for (field, actual) in fields {
            let declared = decl.fields().iter().find(|(name, _)| name == field);
            if let (Some((_, declared)), Some(actual)) = (declared, actual) {
                let _ = unify(declared, actual, &mut binding);
            }
        }

        let ty = self.table.self_ty(id).substitute_known(&binding);
        match ty.mentions_params_of(id) {
            true => None,
            false => Some(ty),
        }
    }

    fn visit(&mut self, ast: &Ast, scope: ScopeId, env: &mut Env) -> Result<Option<Ty>, Error> {
        match &ast.node {
            Node::Block {
                stmts,
                last_is_expr,
            } => {
                env.push(HashMap::new());
                let mut last = None;
                for stmt in stmts {
                    last = self.visit(stmt, scope, env)?;
                }
                env.pop();

                Ok(if *last_is_expr { last } else { None })
            }
            // nested declarations are collected on their own
            Node::Function { .. } | Node::Type { .. } | Node::Empty => Ok(None),
            Node::Constant(value) => Ok(Some(Ty::from(value))),
            Node::VarDeclaration {
                to_declare, value, ..
            } => {
                let ty = self.visit(value, scope, env)?;
                if let Some(frame) = env.last_mut() {
                    frame.insert(to_declare.clone(), ty);
                }

                Ok(None)
            }
            Node::VarAssign { value, .. } => self.visit(value, scope, env).map(|_| None),
            Node::Return(value) => {
                if let Some(value) = value {
                    self.visit(value, scope, env)?;
                }

                Ok(None)
            }
            Node::VarOrEmptyType(name) => match lookup_var(env, name) {
                Some(ty) => Ok(ty),
                None => match self.table.lookup_type_decl(scope, name) {
                    Some(id) if self.table.decl(id).is_generic() => Ok(None),
                    Some(id) => Ok(Some(self.table.self_ty(id))),
                    None => {
                        let mut candidates: Vec<&str> = env
                            .iter()
                            .flat_map(|frame| frame.keys())
                            .map(Symbol::access)
                            .collect();
                        candidates.extend(self.table.scopes().visible_types(scope));

                        Err(diagnostics::undeclared_name(
                            &ast.location,
                            "variable",
                            name.access(),
                            candidates,
                        ))
                    }
                },
            },
            Node::IfElse {
                if_condition,
                if_block,
                else_block,
            } => {
                self.visit(if_condition, scope, env)?;
                let if_ty = self.visit(if_block, scope, env)?;
                match else_block {
                    Some(else_block) => {
                        let else_ty = self.visit(else_block, scope, env)?;
                        Ok(if_ty.or(else_ty))
                    }
                    None => Ok(None),
                }
            }
            Node::BinaryOp(op, lhs, rhs) => {
                let lhs = self.visit(lhs, scope, env)?;
                let rhs = self.visit(rhs, scope, env)?;

                for operand in [&lhs, &rhs] {
                    if let Some(Ty::Placeholder(param)) = operand {
                        self.record(param, Constraint::Operator(*op), &ast.location);
                    }
                }

                match builtins::returns_bool(*op) {
                    true => Ok(Some(Ty::BOOL)),
                    false => Ok(lhs.or(rhs)),
                }
            }
            Node::FieldAccess(instance, field) => match self.visit(instance, scope, env)? {
                Some(Ty::Placeholder(param)) => {
                    self.record(&param, Constraint::Field(field.clone()), &ast.location);
                    Ok(None)
                }
                Some(ty) => Ok(self.field_ty(&ty, field)),
                None => Ok(None),
            },
            Node::MethodCall { instance, call } => {
                let receiver = self.visit(instance, scope, env)?;
                let args = self.visit_args(&call.args, scope, env)?;
                let generics = self.visit_generics(&call.generics, scope)?;

                match receiver {
                    Some(Ty::Placeholder(param)) => {
                        let constraint = Constraint::Method {
                            name: call.to.clone(),
                            args,
                            scope,
                        };
                        self.record(&param, constraint, &ast.location);

                        Ok(None)
                    }
                    receiver => {
                        let mut all_args = vec![receiver];
                        all_args.extend(args);

                        Ok(self.call_ty(&call.to, &generics, &all_args, scope))
                    }
                }
            }
            Node::FunctionCall(call) => {
                if self.table.lookup_functions(scope, &call.to).is_empty()
                    && self.table.lookup_type_decl(scope, &call.to).is_none()
                {
                    return Err(diagnostics::undeclared_name(
                        &ast.location,
                        "function",
                        call.to.access(),
                        self.table.scopes().visible_functions(scope),
                    ));
                }

                let args = self.visit_args(&call.args, scope, env)?;
                let generics = self.visit_generics(&call.generics, scope)?;

                Ok(self.call_ty(&call.to, &generics, &args, scope))
            }
            Node::TypeInstantiation(call) => {
                let mut fields = vec![];
                for arg in &call.args {
                    match &arg.node {
                        Node::VarAssign { to_assign, value } => {
                            fields.push((to_assign.clone(), self.visit(value, scope, env)?))
                        }
                        _ => {
                            self.visit(arg, scope, env)?;
                        }
                    }
                }
                let generics = self.visit_generics(&call.generics, scope)?;

                Ok(self.instance_ty(&call.to, &generics, &fields, scope))
            }
        }
    }
}
