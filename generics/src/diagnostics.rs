//! Builders for the errors emitted during generics resolution. Each category of
//! [`ErrKind`] gets its messages built here, so that the passes only have to decide *when*
//! to fail.

use colored::Colorize;
use error::{ErrKind, Error};
use location::SpanTuple;

use crate::ty::{Conflict, Ty, TypeParameter};

/// Maximum edit distance for a name to be suggested as a replacement
const SUGGESTION_DISTANCE: usize = 2;

pub(crate) mod format {
    use colored::Colorize;

    use crate::ty::Ty;

    pub fn number(value: usize) -> String {
        match value {
            0 => format!("{}", "no".purple()),
            rest => format!("{}", rest.to_string().purple()),
        }
    }

    pub fn plural(to_pluralize: &str, value: usize) -> String {
        match value {
            1 => to_pluralize.to_string(),
            _ => format!("{to_pluralize}s"),
        }
    }

    pub fn ty(ty: Option<&Ty>) -> String {
        match ty {
            Some(ty) => format!("`{}`", ty.to_string().purple()),
            None => format!("{}", "no type".green()),
        }
    }

    pub fn name(name: &str) -> String {
        format!("`{}`", name.yellow())
    }

    pub fn ty_vec(tys: &[Ty]) -> String {
        tys.iter()
            .map(|t| ty(Some(t)))
            .collect::<Vec<String>>()
            .join(", ")
    }

    pub fn names(names: &[&str]) -> String {
        names
            .iter()
            .map(|n| format!("`{}`", n.purple()))
            .collect::<Vec<String>>()
            .join(" | ")
    }
}

pub(crate) struct Expected<T>(pub T);
pub(crate) struct Got<T>(pub T);

/// Find the closest candidate to a misspelled name, if one is close enough
pub(crate) fn did_you_mean<'c>(
    name: &str,
    candidates: impl IntoIterator<Item = &'c str>,
) -> Option<Error> {
    candidates
        .into_iter()
        .filter(|candidate| *candidate != name)
        .map(|candidate| (distance::levenshtein(name, candidate), candidate))
        .filter(|(dist, _)| *dist <= SUGGESTION_DISTANCE)
        .min()
        .map(|(_, candidate)| {
            Error::hint().with_msg(format!("did you mean {}?", format::name(candidate)))
        })
}

fn with_suggestion(err: Error, suggestion: Option<Error>) -> Error {
    match suggestion {
        Some(hint) => err.with_hint(hint),
        None => err,
    }
}

pub(crate) fn undeclared_type<'c>(
    loc: &SpanTuple,
    name: &str,
    candidates: impl IntoIterator<Item = &'c str>,
) -> Error {
    let err = Error::new(ErrKind::UndeclaredType)
        .with_msg(format!(
            "undeclared type {}: not a type nor a generic parameter in scope",
            format::name(name)
        ))
        .with_loc(loc.clone());

    with_suggestion(err, did_you_mean(name, candidates))
}

pub(crate) fn undeclared_name<'c>(
    loc: &SpanTuple,
    what: &str,
    name: &str,
    candidates: impl IntoIterator<Item = &'c str>,
) -> Error {
    let err = Error::new(ErrKind::UndeclaredName)
        .with_msg(format!("unknown {what} {}", format::name(name)))
        .with_loc(loc.clone());

    with_suggestion(err, did_you_mean(name, candidates))
}

pub(crate) fn generic_count_mismatch(
    loc: &SpanTuple,
    name: &str,
    expected: Expected<usize>,
    got: Got<usize>,
) -> Error {
    Error::new(ErrKind::Mismatch)
        .with_msg(format!(
            "generic argument count mismatch for {}: expected {} generic {}, got {}",
            format::name(name),
            format::number(expected.0),
            format::plural("argument", expected.0),
            format::number(got.0),
        ))
        .with_loc(loc.clone())
}

pub(crate) fn argument_count_mismatch(
    loc: &SpanTuple,
    name: &str,
    expected: Expected<usize>,
    got: Got<usize>,
) -> Error {
    Error::new(ErrKind::Mismatch)
        .with_msg(format!(
            "argument count mismatch in call to {}: expected {} {}, got {} {}",
            format::name(name),
            format::number(expected.0),
            format::plural("argument", expected.0),
            format::number(got.0),
            format::plural("argument", got.0),
        ))
        .with_loc(loc.clone())
}

pub(crate) fn type_mismatch(
    loc: &SpanTuple,
    expected: Expected<Option<&Ty>>,
    got: Got<Option<&Ty>>,
) -> Error {
    Error::new(ErrKind::Mismatch)
        .with_msg(format!(
            "type mismatch found: expected {}, got {}",
            format::ty(expected.0),
            format::ty(got.0)
        ))
        .with_loc(loc.clone())
}

pub(crate) fn incompatible_return_type(
    loc: &SpanTuple,
    function: &str,
    expected: Expected<Option<&Ty>>,
    got: Got<Option<&Ty>>,
) -> Error {
    Error::new(ErrKind::IncompatibleReturnType)
        .with_msg(format!(
            "incompatible return type for {}: expected {}, got {}",
            format::name(function),
            format::ty(expected.0),
            format::ty(got.0)
        ))
        .with_loc(loc.clone())
}

pub(crate) fn duplicate_declaration(
    loc: &SpanTuple,
    what: &str,
    name: &str,
    previous: &SpanTuple,
) -> Error {
    Error::new(ErrKind::Mismatch)
        .with_msg(format!("{what} {} declared twice", format::name(name)))
        .with_loc(loc.clone())
        .with_hint(
            Error::hint()
                .with_msg(String::from("previous declaration here"))
                .with_loc(previous.clone()),
        )
}

pub(crate) fn conflicting_inference(loc: &SpanTuple, callee: &str, conflict: &Conflict) -> Error {
    Error::new(ErrKind::ConflictingInference)
        .with_msg(format!(
            "conflicting types inferred for generic parameter {} of {}: {} and {}",
            format::name(conflict.param.name.access()),
            format::name(callee),
            format::ty(Some(&conflict.first)),
            format::ty(Some(&conflict.second)),
        ))
        .with_loc(loc.clone())
}

pub(crate) fn uninferable(loc: &SpanTuple, callee: &str, param: &TypeParameter) -> Error {
    Error::new(ErrKind::Mismatch)
        .with_msg(format!(
            "cannot infer generic parameter {} of {}",
            format::name(param.name.access()),
            format::name(callee)
        ))
        .with_loc(loc.clone())
        .with_hint(Error::hint().with_msg(format!(
            "specify the generic arguments explicitly: `{}[...]`",
            callee
        )))
}

pub(crate) fn missing_field<'c>(
    loc: &SpanTuple,
    ty: &Ty,
    field: &str,
    available: impl IntoIterator<Item = &'c str>,
) -> Error {
    let err = Error::new(ErrKind::MissingCapability)
        .with_msg(format!(
            "type {} has no field {}",
            format::ty(Some(ty)),
            format::name(field)
        ))
        .with_loc(loc.clone());

    with_suggestion(err, did_you_mean(field, available))
}

pub(crate) fn unsupported_operator(loc: &SpanTuple, op: ast::Operator, ty: &Ty) -> Error {
    let supported = builtins::supported_by(op);

    Error::new(ErrKind::MissingCapability)
        .with_msg(format!(
            "type {} does not support operator `{}`",
            format::ty(Some(ty)),
            op.as_str().yellow()
        ))
        .with_loc(loc.clone())
        .with_hint(Error::hint().with_msg(format!(
            "`{}` is only implemented for {}",
            op.as_str(),
            format::names(supported)
        )))
}

pub(crate) fn missing_method(loc: &SpanTuple, ty: &Ty, method: &str, args: &[Ty]) -> Error {
    let shape = match args.is_empty() {
        true => String::new(),
        false => format!(" taking {}", format::ty_vec(args)),
    };

    Error::new(ErrKind::MissingCapability)
        .with_msg(format!(
            "type {} has no method {}{shape}",
            format::ty(Some(ty)),
            format::name(method),
        ))
        .with_loc(loc.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    use location::{Location, Source};

    fn loc() -> SpanTuple {
        SpanTuple::with_source_ref(Source::Empty, Location::new(1, 1), Location::new(1, 1))
    }

    #[test]
    fn suggest_close_name() {
        let hint = did_you_mean("Piont", ["Point", "Marker", "float"]).unwrap();

        assert_eq!(hint.kind(), ErrKind::Hint);
        assert!(hint.msg().unwrap().contains("Point"));
    }

    #[test]
    fn no_suggestion_when_too_far() {
        assert!(did_you_mean("Wrapper", ["int", "Box"]).is_none());
    }

    #[test]
    fn undeclared_type_has_hint() {
        let err = undeclared_type(&loc(), "Bx", ["Box", "bool"]);

        assert_eq!(err.kind(), ErrKind::UndeclaredType);
        assert_eq!(err.hints().len(), 1);
    }

    #[test]
    fn operator_hint_lists_types() {
        let err = unsupported_operator(&loc(), ast::Operator::Add, &Ty::BOOL);

        assert_eq!(err.kind(), ErrKind::MissingCapability);
        assert!(err.hints()[0].msg().unwrap().contains("float"));
    }
}
