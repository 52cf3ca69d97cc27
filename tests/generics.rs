use std::fs;
use std::path::PathBuf;

use error::{ErrKind, ErrorHandler};
use genko::{MonoProgram, Specialization};
use location::Source;

#[derive(Clone, Copy, Debug)]
enum Expected {
    Resolves,
    FailsWith(ErrKind),
}

use Expected::*;

const MANIFEST: &[(&str, Expected)] = &[
    ("identity", Resolves),
    ("missing_field", FailsWith(ErrKind::MissingCapability)),
    ("nested_types", Resolves),
    ("undeclared_return_generic", FailsWith(ErrKind::UndeclaredType)),
    ("duck_typing", Resolves),
    ("branches", Resolves),
    ("methods", Resolves),
    ("missing_method", FailsWith(ErrKind::MissingCapability)),
    ("missing_operator", FailsWith(ErrKind::MissingCapability)),
    ("conflicting_inference", FailsWith(ErrKind::ConflictingInference)),
    ("cyclic", FailsWith(ErrKind::CyclicInstantiation)),
    ("return_mismatch", FailsWith(ErrKind::IncompatibleReturnType)),
    ("undeclared_argument_type", FailsWith(ErrKind::UndeclaredType)),
    ("explicit_generics", Resolves),
    ("generic_count", FailsWith(ErrKind::Mismatch)),
    ("multiple_parameters", Resolves),
    ("unused_generic", Resolves),
    ("syntax_error", FailsWith(ErrKind::Parsing)),
    ("independent_units", FailsWith(ErrKind::MissingCapability)),
];

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("generics")
        .join(format!("{name}.jk"))
}

fn resolve(name: &str) -> Result<MonoProgram, ErrorHandler> {
    let path = fixture(name);
    let input = fs::read_to_string(&path).unwrap();

    genko::resolve_source(&input, Source::Path(&path))
}

#[test]
fn manifest() {
    let failures: Vec<String> = MANIFEST
        .iter()
        .filter_map(|(name, expected)| match (expected, resolve(name)) {
            (Resolves, Ok(program)) if !program.has_placeholders() => None,
            (Resolves, Ok(_)) => Some(format!("{name}: placeholders left in program")),
            (Resolves, Err(errors)) => Some(format!("{name}: failed with {:?}", errors.kinds())),
            (FailsWith(_), Ok(_)) => Some(format!("{name}: resolved but should have failed")),
            (FailsWith(kind), Err(errors)) if errors.kinds().first() == Some(kind) => None,
            (FailsWith(kind), Err(errors)) => Some(format!(
                "{name}: expected {kind:?}, got {:?}",
                errors.kinds()
            )),
        })
        .collect();

    assert!(failures.is_empty(), "{failures:#?}");
}

#[test]
fn identity_has_two_specializations() {
    let program = resolve("identity").unwrap();

    let names: Vec<&str> = program
        .instances_of("id")
        .into_iter()
        .map(Specialization::name)
        .collect();
    assert_eq!(names, vec!["id+int", "id+string"]);
}

#[test]
fn cached_specialization_is_checked_once() {
    let program = resolve("identity").unwrap();

    assert_eq!(program.check_count("id+int"), 1);
    assert_eq!(program.check_count("id+string"), 1);
}

#[test]
fn nested_generic_types_terminate() {
    let program = resolve("nested_types").unwrap();

    for name in ["Box+int", "Crate+int", "Box+char", "Crate+char"] {
        assert!(program.ty(name).is_some(), "missing type {name}");
    }
    assert!(program.function("unpack+int").is_some());
    assert!(program.function("unpack+char").is_some());
    assert_eq!(program.instances_of("unpack::open").len(), 2);
}

#[test]
fn bad_signature_stops_before_body() {
    let errors = resolve("undeclared_return_generic").unwrap_err();

    assert!(errors
        .kinds()
        .iter()
        .all(|kind| *kind == ErrKind::UndeclaredType));
}

#[test]
fn same_shape_same_result() {
    let program = resolve("duck_typing").unwrap();

    assert!(program.function("norm+Point").is_some());
    assert!(program.function("norm+Vector").is_some());
}

#[test]
fn overloaded_methods() {
    let program = resolve("methods").unwrap();

    assert!(program.function("total+Circle").is_some());
    assert!(program.function("total+Square").is_some());
}

#[test]
fn errors_are_reported_per_unit() {
    let errors = resolve("independent_units").unwrap_err();

    assert_eq!(
        errors.kinds(),
        vec![ErrKind::MissingCapability, ErrKind::ConflictingInference]
    );
}

#[test]
fn errors_point_at_the_fixture() {
    let errors = resolve("missing_field").unwrap_err();
    let err = &errors.errors()[0];

    assert!(err.loc().is_some());
    assert!(!err.hints().is_empty());
}

#[test]
fn multiple_parameters_swap() {
    let program = resolve("multiple_parameters").unwrap();

    assert!(program.function("swap+int+bool").is_some());
    assert!(program.function("swap+bool+int").is_some());
    assert!(program.ty("Pair+int+bool").is_some());
    assert!(program.ty("Pair+bool+int").is_some());
}

#[test]
fn unused_generics_produce_nothing() {
    let program = resolve("unused_generic").unwrap();

    assert!(program.specializations().is_empty());
    assert!(program.entry().is_empty());
}
