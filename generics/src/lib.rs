//! Resolution of generic functions and types. Resolving a program goes through the
//! following steps:
//!
//! 1. Every declaration gets registered, along with its generic parameters, in its own
//!    scope ([`decls::declare`])
//! 2. The types used in signatures are resolved ([`DeclTable::resolve_signatures`])
//! 3. The body of every function is visited to find out what it requires of its generic
//!    parameters ([`ConstraintBuilder`])
//! 4. Starting from the non-generic declarations and the top-level statements, every use
//!    of a generic declaration is specialized for the types it is used with, after checking
//!    that these types provide what the declaration requires ([`Monomorphizer`])
//!
//! An error stops the resolution of the unit it happens in, meaning the top-level
//! declaration containing it, or the top-level statements. The other units are still
//! resolved, so that as many errors as possible get reported at once.

#[macro_use]
pub mod log;

pub mod constraints;
pub mod decls;
mod diagnostics;
pub mod duck;
pub mod mono;
pub mod scope;
pub mod ty;
mod typer;

use std::collections::HashMap;

use ast::Ast;
use error::{ErrKind, Error, ErrorHandler};

pub use constraints::{Constraint, ConstraintBuilder, ConstraintMap, ConstraintSet, Requirement};
pub use decls::{Decl, DeclKind, DeclTable, Signature, Unit};
pub use mono::{MonoProgram, Monomorphizer, Specialization};
pub use ty::{demangle, mangle, original_name, Binding, DeclId, Primitive, Ty, TypeParameter};

/// Keeps track of the units which failed, and of the first error of each of them
#[derive(Default)]
struct Session {
    errors: ErrorHandler,
    broken: HashMap<Unit, ErrKind>,
}

impl Session {
    fn is_broken(&self, unit: Unit) -> bool {
        self.broken.contains_key(&unit)
    }

    /// Report an error in a unit. Only the first error of a unit is kept, as the following
    /// ones are likely consequences of it
    fn fail(&mut self, unit: Option<Unit>, err: Error) {
        match unit {
            Some(unit) if self.is_broken(unit) => {
                log!(generics, "ignoring follow-up error: {}", err.kind().as_str())
            }
            Some(unit) => {
                self.broken.insert(unit, err.kind());
                self.errors.add(err);
            }
            None => self.errors.add(err),
        }
    }
}

pub trait ResolveGenerics {
    /// Specialize every generic declaration used in the program. The resulting program
    /// does not contain any generic parameter anymore
    fn resolve_generics(&self) -> Result<MonoProgram, ErrorHandler>;
}

impl ResolveGenerics for Ast {
    fn resolve_generics(&self) -> Result<MonoProgram, ErrorHandler> {
        let mut session = Session::default();

        let (mut table, errors) = decls::declare(self);
        errors
            .into_iter()
            .for_each(|(unit, err)| session.fail(unit, err));
        log!(generics, "declared {} functions and types", table.len());

        table
            .resolve_signatures()
            .into_iter()
            .for_each(|(unit, err)| session.fail(Some(unit), err));

        let constraints = {
            let mut builder = ConstraintBuilder::new(&table);
            for decl in table.iter() {
                if decl.signature.is_none() || session.is_broken(decl.unit) {
                    continue;
                }

                if let Err(e) = builder.collect(decl.id) {
                    session.fail(Some(decl.unit), e);
                }
            }

            builder.finish()
        };

        let mut mono = Monomorphizer::new(&table, &constraints);
        for (unit, kind) in &session.broken {
            mono.mark_broken(*unit, *kind);
        }
        for err in session.errors.errors() {
            log!(generics, "{}: {}", err.kind().as_str(), err.msg().unwrap_or_default());
        }

        let roots = table
            .iter()
            .filter(|decl| decl.parent.is_none() && !decl.is_generic());
        for decl in roots {
            if session.is_broken(decl.unit) || mono.is_cached(decl.id, &Binding::empty()) {
                continue;
            }

            let result = match decl.kind {
                DeclKind::Function => {
                    mono.instantiate_function(decl.id, &Binding::empty(), decl.location())
                }
                DeclKind::Type => mono.instantiate_type(&table.self_ty(decl.id), decl.location()),
            };

            if let Err(e) = result {
                mono.mark_broken(decl.unit, e.kind());
                session.fail(Some(decl.unit), e);
            }
        }

        if !session.is_broken(Unit::Entry) {
            if let Err(e) = mono.instantiate_entry(table.entry()) {
                session.fail(Some(Unit::Entry), e);
            }
        }

        match session.errors.has_errors() {
            true => Err(session.errors),
            false => Ok(mono.finish()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(program: Ast) -> Result<MonoProgram, ErrorHandler> {
        program.resolve_generics()
    }

    #[test]
    fn non_generic_program() {
        let program = resolve(xparser::ast! {
            type Point(x: int, y: int);
            func norm(p: Point) -> int { p.x * p.x + p.y * p.y }
            norm(Point(x: 1, y: 2));
        })
        .unwrap();

        assert!(program.function("norm").is_some());
        assert!(program.ty("Point").is_some());
        assert_eq!(program.entry().len(), 1);
    }

    #[test]
    fn unused_generic_is_not_specialized() {
        let program = resolve(xparser::ast! {
            func id[T](value: T) -> T { value }
        })
        .unwrap();

        assert!(program.specializations().is_empty());
    }

    #[test]
    fn errors_stop_their_unit() {
        let errors = resolve(xparser::ast! {
            func broken[T](value: T) -> T {
                where a = missing(value);
                also_missing(a)
            }
            func other(a: Bx) -> int { 0 }
            broken(1);
        })
        .unwrap_err();

        assert_eq!(
            errors.kinds(),
            vec![
                ErrKind::UndeclaredType,
                ErrKind::UndeclaredName,
                ErrKind::UndeclaredName
            ]
        );
    }

    #[test]
    fn use_of_broken_declaration() {
        let errors = resolve(xparser::ast! {
            func broken[T](value: T) -> U { value }
            broken(1);
        })
        .unwrap_err();

        assert_eq!(errors.errors().len(), 2);
        assert_eq!(errors.kinds()[0], ErrKind::UndeclaredType);
    }

    #[test]
    fn errors_in_independent_units() {
        let errors = resolve(xparser::ast! {
            func add[T](a: T, b: T) -> T { a + b }
            func f() -> bool { add(true, false) }
            func g() -> int { add(1, 'c') }
        })
        .unwrap_err();

        assert_eq!(
            errors.kinds(),
            vec![ErrKind::MissingCapability, ErrKind::ConflictingInference]
        );
    }
}
