//! Structural compatibility. A type can be bound to a generic parameter if it provides
//! everything the constraint set of the parameter requires: nothing is declared upfront,
//! and two types with the same shape are equally acceptable.

use error::{ErrKind, Error};
use location::SpanTuple;

use crate::constraints::{Constraint, ConstraintSet, Requirement};
use crate::decls::DeclTable;
use crate::diagnostics::{self, format};
use crate::ty::{unify, Binding, Ty};

fn has_field(table: &DeclTable, ty: &Ty, field: &str) -> bool {
    match ty {
        Ty::Named { decl, .. } => table
            .decl(*decl)
            .fields()
            .iter()
            .any(|(name, _)| name.access() == field),
        _ => false,
    }
}

fn field_names<'t>(table: &'t DeclTable, ty: &Ty) -> Vec<&'t str> {
    match ty {
        Ty::Named { decl, .. } => table
            .decl(*decl)
            .fields()
            .iter()
            .map(|(name, _)| name.access())
            .collect(),
        _ => vec![],
    }
}

fn supports(ty: &Ty, op: ast::Operator) -> bool {
    match ty {
        Ty::Primitive(prim) => builtins::supports(op, prim.name()),
        _ => false,
    }
}

/// Is there a function visible from the call site which can be called as `candidate.name(args)`
fn has_method(
    table: &DeclTable,
    binding: &Binding,
    candidate: &Ty,
    requirement: &Requirement,
) -> bool {
    let (name, args, scope) = match &requirement.constraint {
        Constraint::Method { name, args, scope } => (name, args, *scope),
        _ => return false,
    };

    // Arguments typed after the parameters of a nested generic declaration are only known
    // once that declaration is instantiated, and are checked by its typer then
    let args: Vec<Option<Ty>> = args
        .iter()
        .map(|arg| {
            arg.as_ref()
                .map(|ty| ty.substitute_known(binding))
                .filter(|ty| !ty.contains_placeholder())
        })
        .collect();

    table
        .lookup_functions(scope, name)
        .into_iter()
        .map(|id| table.decl(id))
        .filter(|f| f.signature.is_some() && f.args().len() == args.len() + 1)
        .any(|f| {
            let mut method_binding = Binding::empty();
            let (receiver, rest) = match f.args().split_first() {
                Some(split) => split,
                None => return false,
            };

            unify(
                &receiver.1.substitute_known(binding),
                candidate,
                &mut method_binding,
            ) == Ok(true)
                && rest.iter().zip(&args).all(|((_, declared), actual)| match actual {
                    Some(actual) => {
                        unify(
                            &declared.substitute_known(binding),
                            actual,
                            &mut method_binding,
                        ) == Ok(true)
                    }
                    None => true,
                })
        })
}

fn unsatisfied(table: &DeclTable, candidate: &Ty, requirement: &Requirement, loc: &SpanTuple) -> Error {
    let err = match &requirement.constraint {
        Constraint::Field(field) => diagnostics::missing_field(
            loc,
            candidate,
            field.access(),
            field_names(table, candidate),
        ),
        Constraint::Operator(op) => diagnostics::unsupported_operator(loc, *op, candidate),
        Constraint::Method { name, args, .. } => {
            let known: Vec<Ty> = args.iter().flatten().cloned().collect();
            diagnostics::missing_method(loc, candidate, name.access(), &known)
        }
    };

    err.with_hint(
        Error::hint()
            .with_msg(format!(
                "generic parameter {} {} because of this expression",
                format::name(requirement.param.name.access()),
                requirement.constraint
            ))
            .with_loc(requirement.location.clone()),
    )
}

/// Check that the types bound to generic parameters satisfy every requirement recorded on
/// them. Requirements are checked in the order they were collected, and the first one to
/// fail is reported at `loc`, where the instantiation happens.
pub fn check(
    table: &DeclTable,
    binding: &Binding,
    set: &ConstraintSet,
    loc: &SpanTuple,
) -> Result<(), Error> {
    for requirement in set.iter() {
        let candidate = binding
            .get_specialized(&requirement.param)
            .map_err(|e| e.with_loc(loc.clone()))?;

        let satisfied = match &requirement.constraint {
            Constraint::Field(field) => has_field(table, &candidate, field.access()),
            Constraint::Operator(op) => supports(&candidate, *op),
            Constraint::Method { .. } => has_method(table, binding, &candidate, requirement),
        };

        if !satisfied {
            let err = unsatisfied(table, &candidate, requirement, loc);
            debug_assert_eq!(err.kind(), ErrKind::MissingCapability);

            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintBuilder, ConstraintMap};
    use crate::decls::{self, Decl};
    use crate::ty::DeclId;
    use ast::Ast;

    use location::{Location, Source};

    fn loc() -> SpanTuple {
        SpanTuple::with_source_ref(Source::Empty, Location::new(1, 1), Location::new(1, 1))
    }

    fn setup(program: Ast) -> (DeclTable, ConstraintMap) {
        let (mut table, errors) = decls::declare(&program);
        assert!(errors.is_empty());
        assert!(table.resolve_signatures().is_empty());

        let constraints = {
            let mut builder = ConstraintBuilder::new(&table);
            for id in table.iter().map(|decl| decl.id).collect::<Vec<DeclId>>() {
                builder.collect(id).unwrap();
            }
            builder.finish()
        };

        (table, constraints)
    }

    fn find<'t>(table: &'t DeclTable, path: &str) -> &'t Decl {
        table.iter().find(|decl| decl.path == path).unwrap()
    }

    fn check_with(table: &DeclTable, constraints: &ConstraintMap, func: &str, ty: Ty) -> Result<(), Error> {
        let decl = find(table, func);
        let binding = Binding::create(&decl.generics, vec![ty]).unwrap();

        check(table, &binding, constraints.get(decl.id).unwrap(), &loc())
    }

    fn user_type(table: &DeclTable, name: &str) -> Ty {
        table.self_ty(find(table, name).id)
    }

    #[test]
    fn same_shape_is_accepted() {
        let (table, constraints) = setup(xparser::ast! {
            type Point(x: int, y: int);
            type Vector(x: int, y: int, z: int);
            func first[T](value: T) -> int { value.x }
        });

        assert!(check_with(&table, &constraints, "first", user_type(&table, "Point")).is_ok());
        assert!(check_with(&table, &constraints, "first", user_type(&table, "Vector")).is_ok());
    }

    #[test]
    fn missing_field() {
        let (table, constraints) = setup(xparser::ast! {
            type Marker;
            func first[T](value: T) -> int { value.x }
        });

        let err = check_with(&table, &constraints, "first", user_type(&table, "Marker")).unwrap_err();
        assert_eq!(err.kind(), ErrKind::MissingCapability);
        assert_eq!(err.hints().len(), 1);

        let err = check_with(&table, &constraints, "first", Ty::INT).unwrap_err();
        assert_eq!(err.kind(), ErrKind::MissingCapability);
    }

    #[test]
    fn operators_on_primitives_only() {
        let (table, constraints) = setup(xparser::ast! {
            type Point(x: int);
            func add[T](a: T, b: T) -> T { a + b }
        });

        assert!(check_with(&table, &constraints, "add", Ty::INT).is_ok());
        assert!(check_with(&table, &constraints, "add", Ty::FLOAT).is_ok());
        assert!(check_with(&table, &constraints, "add", Ty::STRING).is_err());
        assert!(check_with(&table, &constraints, "add", Ty::BOOL).is_err());
        assert!(check_with(&table, &constraints, "add", user_type(&table, "Point")).is_err());
    }

    #[test]
    fn method_through_free_function() {
        let (table, constraints) = setup(xparser::ast! {
            type Circle(r: int);
            type Square(side: int);
            func area(c: Circle) -> int { c.r * c.r * 3 }
            func total[T](shape: T) -> int { shape.area() }
        });

        assert!(check_with(&table, &constraints, "total", user_type(&table, "Circle")).is_ok());

        let err =
            check_with(&table, &constraints, "total", user_type(&table, "Square")).unwrap_err();
        assert_eq!(err.kind(), ErrKind::MissingCapability);
    }

    #[test]
    fn method_argument_types_matter() {
        let (table, constraints) = setup(xparser::ast! {
            type Circle(r: int);
            func scale(c: Circle, factor: float) -> Circle { c }
            func grow[T](shape: T) -> int {
                shape.scale(2);
                0
            }
        });

        let err =
            check_with(&table, &constraints, "grow", user_type(&table, "Circle")).unwrap_err();
        assert_eq!(err.kind(), ErrKind::MissingCapability);
    }

    #[test]
    fn inner_generic_arguments_are_unknown() {
        let (table, constraints) = setup(xparser::ast! {
            type Circle(r: int);
            type Square(side: int);
            func scale(c: Circle, factor: int) -> int { c.r * factor }
            func outer[T](value: T) -> int {
                func inner[U](v: U, t: T) -> int { t.scale(v) }
                inner(2, value)
            }
        });

        assert!(check_with(&table, &constraints, "outer", user_type(&table, "Circle")).is_ok());

        let err =
            check_with(&table, &constraints, "outer", user_type(&table, "Square")).unwrap_err();
        assert_eq!(err.kind(), ErrKind::MissingCapability);
    }

    #[test]
    fn first_failure_in_collection_order() {
        let (table, constraints) = setup(xparser::ast! {
            type Marker;
            func both[T](value: T) -> int {
                where a = value.first;
                value.second()
            }
        });

        let err = check_with(&table, &constraints, "both", user_type(&table, "Marker")).unwrap_err();
        assert!(err.msg().unwrap().contains("first"));
    }
}
