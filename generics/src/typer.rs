//! Typing of concrete code: the bodies of specializations, once every generic parameter
//! in scope is bound, and the top-level statements of the program. Every call and type
//! instantiation gets its generic arguments resolved, explicitly or from the types of its
//! arguments, and is rewritten to refer to the specialization it needs.

use std::collections::HashMap;

use ast::{Ast, Call, Node, Operator};
use error::{ErrKind, Error};
use location::SpanTuple;
use symbol::Symbol;

use crate::decls::{Decl, DeclTable};
use crate::diagnostics::{self, format, Expected, Got};
use crate::mono::Monomorphizer;
use crate::scope::{ScopeId, TypeEntry};
use crate::ty::{original_name, unify, Binding, Ty};

#[derive(Clone, Debug)]
struct Local {
    ty: Option<Ty>,
    mutable: bool,
}

/// A rewritten node and its type, if it has one
type Typed = (Ast, Option<Ty>);

pub(crate) struct Typer<'mono, 'table> {
    mono: &'mono mut Monomorphizer<'table>,
    scope: ScopeId,
    /// Total over every generic parameter visible from `scope`
    binding: Binding,
    env: Vec<HashMap<Symbol, Local>>,
    return_type: Option<Ty>,
    /// Name of the specialization being typed, if any
    function: Option<String>,
}

fn known(tys: &[Option<Ty>]) -> Vec<Ty> {
    tys.iter().flatten().cloned().collect()
}

/// A value of the wrong type given to a call or a field. When the value is the result of
/// a generic call, it is the instantiated return type which does not fit
fn arg_mismatch(arg: &Ast, expected: Option<&Ty>, got: Option<&Ty>) -> Error {
    match &arg.node {
        Node::FunctionCall(call) if call.to.access() != original_name(call.to.access()) => {
            diagnostics::incompatible_return_type(
                &arg.location,
                original_name(call.to.access()),
                Expected(expected),
                Got(got),
            )
        }
        _ => diagnostics::type_mismatch(&arg.location, Expected(expected), Got(got)),
    }
}

impl<'mono, 'table> Typer<'mono, 'table> {
    pub(crate) fn function(
        mono: &'mono mut Monomorphizer<'table>,
        scope: ScopeId,
        binding: Binding,
        args: &[(Symbol, Ty)],
        return_type: Option<Ty>,
        name: &str,
    ) -> Typer<'mono, 'table> {
        let frame = args
            .iter()
            .map(|(arg, ty)| {
                (
                    arg.clone(),
                    Local {
                        ty: Some(ty.clone()),
                        mutable: false,
                    },
                )
            })
            .collect();

        Typer {
            mono,
            scope,
            binding,
            env: vec![frame],
            return_type,
            function: Some(name.to_string()),
        }
    }

    pub(crate) fn entry(mono: &'mono mut Monomorphizer<'table>) -> Typer<'mono, 'table> {
        Typer {
            mono,
            scope: ScopeId::Root,
            binding: Binding::empty(),
            env: vec![HashMap::new()],
            return_type: None,
            function: None,
        }
    }

    fn table(&self) -> &'table DeclTable {
        self.mono.table
    }

    fn lookup_local(&self, name: &Symbol) -> Option<&Local> {
        self.env.iter().rev().find_map(|frame| frame.get(name))
    }

    fn local_names(&self) -> Vec<&str> {
        self.env
            .iter()
            .flat_map(|frame| frame.keys())
            .map(Symbol::access)
            .collect()
    }

    fn resolve_explicit(&self, generics: &[ast::Type]) -> Result<Vec<Ty>, Error> {
        generics
            .iter()
            .map(|ty| {
                self.table()
                    .resolve_type(ty, self.scope)?
                    .substitute(&self.binding)
                    .map_err(|e| e.or_loc(&ty.location))
            })
            .collect()
    }

    /// The part of our binding a declaration visible from here can refer to
    fn inherited(&self, decl: &Decl) -> Binding {
        self.binding
            .restrict(&self.table().ancestor_params(decl.id))
    }

    /// Can the function be called with arguments of these types. Only as many arguments
    /// as given are checked
    fn accepts(&self, callee: &Decl, tys: &[Option<Ty>]) -> bool {
        if callee.signature.is_none() {
            return false;
        }

        let inherited = self.inherited(callee);
        let mut binding = inherited.clone();

        callee
            .args()
            .iter()
            .zip(tys)
            .all(|((_, declared), actual)| match actual {
                Some(actual) => {
                    unify(&declared.substitute_known(&inherited), actual, &mut binding) == Ok(true)
                }
                None => false,
            })
    }

    pub(crate) fn type_node(&mut self, ast: &Ast) -> Result<Typed, Error> {
        let with = |node: Node| Ast {
            location: ast.location.clone(),
            node,
        };

        match &ast.node {
            Node::Block {
                stmts,
                last_is_expr,
            } => {
                self.env.push(HashMap::new());
                let result = self.stmts(stmts);
                self.env.pop();

                let (stmts, last) = result?;
                let ty = if *last_is_expr { last } else { None };

                Ok((
                    with(Node::Block {
                        stmts,
                        last_is_expr: *last_is_expr,
                    }),
                    ty,
                ))
            }
            // hoisted out and specialized on their own
            Node::Function { .. } | Node::Type { .. } | Node::Empty => Ok((with(Node::Empty), None)),
            Node::Constant(value) => Ok((ast.clone(), Some(Ty::from(value)))),
            Node::VarDeclaration {
                mutable,
                to_declare,
                value,
            } => {
                let (value, ty) = self.type_node(value)?;
                if let Some(frame) = self.env.last_mut() {
                    frame.insert(
                        to_declare.clone(),
                        Local {
                            ty,
                            mutable: *mutable,
                        },
                    );
                }

                Ok((
                    with(Node::VarDeclaration {
                        mutable: *mutable,
                        to_declare: to_declare.clone(),
                        value: Box::new(value),
                    }),
                    None,
                ))
            }
            Node::VarAssign { to_assign, value } => {
                let (value, _) = self.assign(&ast.location, to_assign, value)?;

                Ok((
                    with(Node::VarAssign {
                        to_assign: to_assign.clone(),
                        value: Box::new(value),
                    }),
                    None,
                ))
            }
            Node::VarOrEmptyType(name) => self.var_or_empty_type(ast, name),
            Node::IfElse {
                if_condition,
                if_block,
                else_block,
            } => self.if_else(ast, if_condition, if_block, else_block.as_deref()),
            Node::BinaryOp(op, lhs, rhs) => self.binary_op(ast, *op, lhs, rhs),
            Node::FieldAccess(instance, field) => self.field_access(ast, instance, field),
            Node::Return(value) => self.ret(ast, value.as_deref()),
            Node::FunctionCall(call) => {
                let table = self.table();
                if call.args.is_empty()
                    && table.lookup_functions(self.scope, &call.to).is_empty()
                    && table.lookup_type_decl(self.scope, &call.to).is_some()
                {
                    return self.type_instantiation(ast, call);
                }

                let mut args = vec![];
                let mut tys = vec![];
                for arg in &call.args {
                    let (arg, ty) = self.type_node(arg)?;
                    args.push(arg);
                    tys.push(ty);
                }

                self.call(ast, call, args, tys, false)
            }
            Node::MethodCall { instance, call } => {
                let (receiver, receiver_ty) = self.type_node(instance)?;

                let mut args = vec![receiver];
                let mut tys = vec![receiver_ty];
                for arg in &call.args {
                    let (arg, ty) = self.type_node(arg)?;
                    args.push(arg);
                    tys.push(ty);
                }

                self.call(ast, call, args, tys, true)
            }
            Node::TypeInstantiation(call) => self.type_instantiation(ast, call),
        }
    }

    fn stmts(&mut self, stmts: &[Ast]) -> Result<(Vec<Ast>, Option<Ty>), Error> {
        let mut typed = vec![];
        let mut last = None;

        for stmt in stmts.iter().filter(|stmt| !stmt.is_declaration()) {
            let (stmt, ty) = self.type_node(stmt)?;
            typed.push(stmt);
            last = ty;
        }

        Ok((typed, last))
    }

    fn assign(&mut self, loc: &SpanTuple, to_assign: &Symbol, value: &Ast) -> Result<Typed, Error> {
        let local = match self.lookup_local(to_assign) {
            Some(local) => local.clone(),
            None => {
                return Err(diagnostics::undeclared_name(
                    loc,
                    "variable",
                    to_assign.access(),
                    self.local_names(),
                ))
            }
        };

        if !local.mutable {
            return Err(Error::new(ErrKind::Mismatch)
                .with_msg(format!(
                    "cannot assign twice to immutable variable {}",
                    format::name(to_assign.access())
                ))
                .with_loc(loc.clone())
                .with_hint(Error::hint().with_msg(format!(
                    "declare it using `where mut {to_assign}` to allow reassignments"
                ))));
        }

        let (value, ty) = self.type_node(value)?;
        if ty != local.ty {
            return Err(diagnostics::type_mismatch(
                &value.location,
                Expected(local.ty.as_ref()),
                Got(ty.as_ref()),
            ));
        }

        Ok((value, ty))
    }

    fn var_or_empty_type(&mut self, ast: &Ast, name: &Symbol) -> Result<Typed, Error> {
        if let Some(local) = self.lookup_local(name) {
            return Ok((ast.clone(), local.ty.clone()));
        }

        let table = self.table();
        match table.lookup_type_decl(self.scope, name) {
            Some(_) => {
                let call = Call {
                    to: name.clone(),
                    generics: vec![],
                    args: vec![],
                };

                self.type_instantiation(ast, &call)
            }
            None => {
                let mut candidates = self.local_names();
                candidates.extend(table.scopes().visible_types(self.scope));

                Err(diagnostics::undeclared_name(
                    &ast.location,
                    "variable",
                    name.access(),
                    candidates,
                ))
            }
        }
    }

    fn if_else(
        &mut self,
        ast: &Ast,
        if_condition: &Ast,
        if_block: &Ast,
        else_block: Option<&Ast>,
    ) -> Result<Typed, Error> {
        let (condition, condition_ty) = self.type_node(if_condition)?;
        if condition_ty != Some(Ty::BOOL) {
            return Err(diagnostics::type_mismatch(
                &condition.location,
                Expected(Some(&Ty::BOOL)),
                Got(condition_ty.as_ref()),
            ));
        }

        let (if_block, if_ty) = self.type_node(if_block)?;
        let (else_block, ty) = match else_block {
            Some(else_block) => {
                let (else_block, else_ty) = self.type_node(else_block)?;
                let ty = match (if_ty, else_ty) {
                    (Some(lhs), Some(rhs)) if lhs != rhs => {
                        return Err(diagnostics::type_mismatch(
                            &else_block.location,
                            Expected(Some(&lhs)),
                            Got(Some(&rhs)),
                        ))
                    }
                    (lhs, rhs) => lhs.or(rhs),
                };

                (Some(Box::new(else_block)), ty)
            }
            None => (None, None),
        };

        Ok((
            Ast {
                location: ast.location.clone(),
                node: Node::IfElse {
                    if_condition: Box::new(condition),
                    if_block: Box::new(if_block),
                    else_block,
                },
            },
            ty,
        ))
    }

    fn binary_op(&mut self, ast: &Ast, op: Operator, lhs: &Ast, rhs: &Ast) -> Result<Typed, Error> {
        let (lhs, lhs_ty) = self.type_node(lhs)?;
        let (rhs, rhs_ty) = self.type_node(rhs)?;

        let ty = match (&lhs_ty, &rhs_ty) {
            (Some(l_ty), Some(r_ty)) if l_ty == r_ty => l_ty.clone(),
            _ => {
                return Err(diagnostics::type_mismatch(
                    &rhs.location,
                    Expected(lhs_ty.as_ref()),
                    Got(rhs_ty.as_ref()),
                ))
            }
        };

        let supported = match &ty {
            Ty::Primitive(prim) => builtins::supports(op, prim.name()),
            _ => false,
        };
        if !supported {
            return Err(diagnostics::unsupported_operator(&ast.location, op, &ty));
        }

        let result = match builtins::returns_bool(op) {
            true => Ty::BOOL,
            false => ty,
        };

        Ok((
            Ast {
                location: ast.location.clone(),
                node: Node::BinaryOp(op, Box::new(lhs), Box::new(rhs)),
            },
            Some(result),
        ))
    }

    fn field_access(&mut self, ast: &Ast, instance: &Ast, field: &Symbol) -> Result<Typed, Error> {
        let (instance, instance_ty) = self.type_node(instance)?;
        let table = self.table();
        let loc = &ast.location;

        let field_ty = match &instance_ty {
            Some(ty @ Ty::Named { decl, args, .. }) => {
                let decl_id = *decl;
                let decl = table.decl(decl_id);

                match decl.fields().iter().find(|(name, _)| name == field) {
                    Some((_, declared)) => {
                        let binding = Binding::create(&table.all_params(decl_id), args.clone())
                            .map_err(|e| e.with_loc(loc.clone()))?;
                        declared
                            .substitute(&binding)
                            .map_err(|e| e.with_loc(loc.clone()))?
                    }
                    None => {
                        return Err(diagnostics::missing_field(
                            loc,
                            ty,
                            field.access(),
                            decl.fields().iter().map(|(name, _)| name.access()),
                        ))
                    }
                }
            }
            Some(ty) => {
                return Err(diagnostics::missing_field(
                    loc,
                    ty,
                    field.access(),
                    std::iter::empty::<&str>(),
                ))
            }
            None => {
                return Err(Error::new(ErrKind::Mismatch)
                    .with_msg(format!(
                        "cannot access field {} of an expression with {}",
                        format::name(field.access()),
                        format::ty(None)
                    ))
                    .with_loc(loc.clone()))
            }
        };

        Ok((
            Ast {
                location: loc.clone(),
                node: Node::FieldAccess(Box::new(instance), field.clone()),
            },
            Some(field_ty),
        ))
    }

    fn ret(&mut self, ast: &Ast, value: Option<&Ast>) -> Result<Typed, Error> {
        let function = match &self.function {
            Some(function) => function.clone(),
            None => {
                return Err(Error::new(ErrKind::Mismatch)
                    .with_msg(String::from("`return` outside of a function"))
                    .with_loc(ast.location.clone()))
            }
        };

        let (value, ty) = match value {
            Some(value) => {
                let (value, ty) = self.type_node(value)?;
                (Some(Box::new(value)), ty)
            }
            None => (None, None),
        };

        if ty != self.return_type {
            return Err(diagnostics::incompatible_return_type(
                &ast.location,
                original_name(&function),
                Expected(self.return_type.as_ref()),
                Got(ty.as_ref()),
            ));
        }

        Ok((
            Ast {
                location: ast.location.clone(),
                node: Node::Return(value),
            },
            None,
        ))
    }

    /// Bind the generic parameters of a declaration from the types of the values given
    /// for its arguments or fields
    fn infer(
        &self,
        loc: &SpanTuple,
        name: &Symbol,
        known: &Binding,
        expected: &[(&Ty, &Ast, &Option<Ty>)],
        binding: &mut Binding,
    ) -> Result<(), Error> {
        for (declared, value, actual) in expected {
            let pattern = declared.substitute_known(known);

            match actual {
                None => return Err(arg_mismatch(value, Some(&pattern), None)),
                Some(actual) => match unify(&pattern, actual, binding) {
                    Ok(true) => {}
                    Ok(false) => return Err(arg_mismatch(value, Some(&pattern), Some(actual))),
                    Err(conflict) => {
                        return Err(diagnostics::conflicting_inference(
                            loc,
                            name.access(),
                            &conflict,
                        ))
                    }
                },
            }
        }

        Ok(())
    }

    /// Binding for a declaration's own generic parameters, from explicit generic arguments
    /// if there are any
    fn explicit_binding(
        &self,
        loc: &SpanTuple,
        decl: &Decl,
        generics: &[ast::Type],
    ) -> Result<Binding, Error> {
        let binding = self.inherited(decl);
        let explicit = self.resolve_explicit(generics)?;

        if explicit.is_empty() {
            return Ok(binding);
        }

        if explicit.len() != decl.generics.len() {
            return Err(diagnostics::generic_count_mismatch(
                loc,
                decl.name.access(),
                Expected(decl.generics.len()),
                Got(explicit.len()),
            ));
        }

        let explicit =
            Binding::create(&decl.generics, explicit).map_err(|e| e.with_loc(loc.clone()))?;

        Ok(binding.extend(&explicit))
    }

    fn call(
        &mut self,
        ast: &Ast,
        call: &Call,
        args: Vec<Ast>,
        tys: Vec<Option<Ty>>,
        method: bool,
    ) -> Result<Typed, Error> {
        let table = self.table();
        let loc = &ast.location;
        let candidates: Vec<&'table Decl> = table
            .lookup_functions(self.scope, &call.to)
            .into_iter()
            .map(|id| table.decl(id))
            .collect();

        match (method, tys.first()) {
            (true, Some(Some(receiver)))
                if !candidates.iter().any(|f| self.accepts(f, &tys[..1])) =>
            {
                return Err(diagnostics::missing_method(
                    loc,
                    receiver,
                    call.to.access(),
                    &known(&tys[1..]),
                ))
            }
            _ if candidates.is_empty() => {
                return Err(diagnostics::undeclared_name(
                    loc,
                    "function",
                    call.to.access(),
                    table.scopes().visible_functions(self.scope),
                ))
            }
            _ => {}
        }

        let viable: Vec<&'table Decl> = candidates
            .iter()
            .copied()
            .filter(|f| f.signature.is_none() || f.args().len() == tys.len())
            .collect();
        let callee = match viable
            .iter()
            .find(|f| self.accepts(f, &tys))
            .or_else(|| viable.first())
        {
            Some(callee) => *callee,
            None => {
                let expected = candidates.first().map_or(0, |f| f.args().len());
                return Err(diagnostics::argument_count_mismatch(
                    loc,
                    call.to.access(),
                    Expected(expected),
                    Got(tys.len()),
                ));
            }
        };

        self.mono.check_unit(callee.id, loc)?;

        let known = self.explicit_binding(loc, callee, &call.generics)?;
        let mut binding = known.clone();
        let expected: Vec<(&Ty, &Ast, &Option<Ty>)> = callee
            .args()
            .iter()
            .zip(args.iter().zip(&tys))
            .map(|((_, declared), (arg, ty))| (declared, arg, ty))
            .collect();
        self.infer(loc, &call.to, &known, &expected, &mut binding)?;

        if let Some(param) = callee.generics.iter().find(|p| binding.get(p).is_none()) {
            return Err(diagnostics::uninferable(loc, call.to.access(), param));
        }

        let name = self.mono.instantiate_function(callee.id, &binding, loc)?;
        let return_type = callee
            .return_type()
            .map(|ty| ty.substitute(&binding))
            .transpose()
            .map_err(|e| e.or_loc(loc))?;

        Ok((
            Ast {
                location: loc.clone(),
                node: Node::FunctionCall(Call {
                    to: Symbol::from(name),
                    generics: vec![],
                    args,
                }),
            },
            return_type,
        ))
    }

    fn type_instantiation(&mut self, ast: &Ast, call: &Call) -> Result<Typed, Error> {
        let table = self.table();
        let loc = &ast.location;

        let id = match table.lookup_type(self.scope, &call.to) {
            Some(TypeEntry::Decl(id)) => id,
            Some(TypeEntry::Generic(param)) => {
                return Err(Error::new(ErrKind::Mismatch)
                    .with_msg(format!(
                        "cannot instantiate generic parameter {}",
                        format::name(param.name.access())
                    ))
                    .with_loc(loc.clone()))
            }
            None => {
                return Err(diagnostics::undeclared_type(
                    loc,
                    call.to.access(),
                    table.scopes().visible_types(self.scope),
                ))
            }
        };

        self.mono.check_unit(id, loc)?;
        let decl = table.decl(id);

        let mut fields: Vec<(Symbol, Ast, Option<Ty>, SpanTuple)> = vec![];
        for arg in &call.args {
            let (field, value) = match &arg.node {
                Node::VarAssign { to_assign, value } => (to_assign, value),
                _ => {
                    return Err(Error::new(ErrKind::Mismatch)
                        .with_msg(format!(
                            "arguments of a type instantiation must name the field they initialize: `{}(field: value)`",
                            call.to
                        ))
                        .with_loc(arg.location.clone()))
                }
            };

            if fields.iter().any(|(name, ..)| name == field) {
                return Err(Error::new(ErrKind::Mismatch)
                    .with_msg(format!("field {} initialized twice", format::name(field.access())))
                    .with_loc(arg.location.clone()));
            }

            let (value, ty) = self.type_node(value)?;
            fields.push((field.clone(), value, ty, arg.location.clone()));
        }

        let mut expected = vec![];
        for (field, value, ty, location) in &fields {
            match decl.fields().iter().find(|(name, _)| name == field) {
                Some((_, declared)) => expected.push((declared, value, ty)),
                None => {
                    let err = Error::new(ErrKind::Mismatch)
                        .with_msg(format!(
                            "type {} has no field named {}",
                            format::name(call.to.access()),
                            format::name(field.access())
                        ))
                        .with_loc(location.clone());

                    return Err(match diagnostics::did_you_mean(
                        field.access(),
                        decl.fields().iter().map(|(name, _)| name.access()),
                    ) {
                        Some(hint) => err.with_hint(hint),
                        None => err,
                    });
                }
            }
        }

        if let Some((missing, _)) = decl
            .fields()
            .iter()
            .find(|(name, _)| !fields.iter().any(|(given, ..)| given == name))
        {
            return Err(Error::new(ErrKind::Mismatch)
                .with_msg(format!(
                    "missing field {} in instantiation of type {}",
                    format::name(missing.access()),
                    format::name(call.to.access())
                ))
                .with_loc(loc.clone()));
        }

        let known = self.explicit_binding(loc, decl, &call.generics)?;
        let mut binding = known.clone();
        self.infer(loc, &call.to, &known, &expected, &mut binding)?;

        if let Some(param) = decl.generics.iter().find(|p| binding.get(p).is_none()) {
            return Err(diagnostics::uninferable(loc, call.to.access(), param));
        }

        let ty = table
            .self_ty(id)
            .substitute(&binding)
            .map_err(|e| e.or_loc(loc))?;
        let name = self.mono.instantiate_type(&ty, loc)?;

        let args = fields
            .into_iter()
            .map(|(field, value, _, location)| Ast {
                location,
                node: Node::VarAssign {
                    to_assign: field,
                    value: Box::new(value),
                },
            })
            .collect();

        Ok((
            Ast {
                location: loc.clone(),
                node: Node::TypeInstantiation(Call {
                    to: Symbol::from(name),
                    generics: vec![],
                    args,
                }),
            },
            Some(ty),
        ))
    }
}
