//! genko resolves the generic functions and types of a program, and produces an equivalent
//! program where every generic declaration has been replaced by the specializations it is
//! used with. See the [`generics`] crate for the details of the resolution.

use error::{Error, ErrorHandler};
use generics::ResolveGenerics;
use location::Source;

pub use generics::{MonoProgram, Specialization};

/// Parse and resolve a whole program. Parsing errors are reported through the same
/// [`ErrorHandler`] as resolution errors.
pub fn resolve_source(input: &str, source: Source) -> Result<MonoProgram, ErrorHandler> {
    let ast = xparser::parse(input, source).map_err(|e| ErrorHandler::from(Error::from(e)))?;

    generics::log!(generics, "parsed input, resolving generics");

    ast.resolve_generics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use error::ErrKind;

    #[test]
    fn parse_error_is_reported() {
        let errors = resolve_source("func (", Source::Input("func (")).unwrap_err();

        assert_eq!(errors.kinds(), vec![ErrKind::Parsing]);
    }

    #[test]
    fn resolve_simple_program() {
        let input = "func id[T](value: T) -> T { value } id(15);";
        let program = resolve_source(input, Source::Input(input)).unwrap();

        assert!(program.function("id+int").is_some());
        assert!(!program.has_placeholders());
    }
}
