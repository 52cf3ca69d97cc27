mod constructs;
mod tokens;

pub use constructs::*;
pub use tokens::*;

use ast::Ast;
use location::{Location, Source, SpanTuple};

use ast::Node;
use nom_locate::position;
use nom_locate::LocatedSpan;

#[derive(Debug, PartialEq, Eq)]
pub enum Error<'i> {
    Msg(String),
    Nom(nom::Err<(ParseInput<'i>, nom::error::ErrorKind)>),
    Incomplete(nom::Needed),
    Mult(Vec<Error<'i>>),
}

impl<'i> Error<'i> {
    pub fn emit(&self) {
        error::Error::from(self).emit()
    }

    /// The furthest position the parser reached before failing, which is usually the most
    /// helpful place to point at
    fn span(&self) -> Option<ParseInput<'i>> {
        match self {
            Error::Nom(nom::Err::Error((span, _)) | nom::Err::Failure((span, _))) => Some(*span),
            Error::Mult(errs) => errs
                .iter()
                .filter_map(Error::span)
                .max_by_key(|span| span.location_offset()),
            Error::Msg(_) | Error::Nom(nom::Err::Incomplete(_)) | Error::Incomplete(_) => None,
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            Error::Msg(m) => Some(m.clone()),
            Error::Incomplete(needed) => Some(format!("incomplete input: {needed:?}")),
            Error::Mult(errs) => errs.iter().find_map(Error::message),
            Error::Nom(_) => None,
        }
    }
}

/// Build an error carrying both a message and the position it happened at
pub(crate) fn located<'i>(input: ParseInput<'i>, msg: &str) -> nom::Err<Error<'i>> {
    nom::Err::Error(Error::Mult(vec![
        Error::Msg(String::from(msg)),
        nom::error::ParseError::from_error_kind(input, nom::error::ErrorKind::Verify),
    ]))
}

pub type ParseInput<'i> = LocatedSpan<&'i str, Source<'i>>;
pub type ParseResult<'i, I, T> = nom::IResult<I, T, Error<'i>>;

/// Parses the entire user input into a block of statements
pub fn parse<'i>(input: &'i str, source: Source<'i>) -> Result<Ast, Error<'i>> {
    let input = LocatedSpan::new_extra(input, source);

    let (input, start) = position::<ParseInput, Error>(input)?;
    let (input, stmts) = constructs::many_exprs(input)?;
    let (input, end) = position::<ParseInput, Error>(input)?;

    Ok(Ast {
        location: constructs::pos_to_loc(input, start, end),
        node: Node::Block {
            stmts,
            last_is_expr: false,
        },
    })
}

/// Helpful macro for unit testing the parser
#[cfg(test)]
#[macro_export]
macro_rules! span {
    ($s:literal) => {
        nom_locate::LocatedSpan::new_extra($s, location::Source::Input($s))
    };
}

/// Nom errors are automatically parsing errors
impl<'i> From<nom::Err<(ParseInput<'i>, nom::error::ErrorKind)>> for Error<'i> {
    fn from(e: nom::Err<(ParseInput<'i>, nom::error::ErrorKind)>) -> Error<'i> {
        Error::Nom(e)
    }
}

/// Likewise, if we need to convert from a nom::Err<xparser::Error> to an xparser::Error.
/// While this pattern may seem weird, nom sometimes requires you to wrap errors in an
/// Error or Failure state in order to specify to parse combinators how to proceed. Thus, we
/// might need to lower the wrapped errors back into our regular errors
impl<'i> From<nom::Err<Error<'i>>> for Error<'i> {
    fn from(e: nom::Err<Error<'i>>) -> Error<'i> {
        match e {
            nom::Err::Incomplete(n) => Error::Incomplete(n),
            nom::Err::Error(inner) | nom::Err::Failure(inner) => inner,
        }
    }
}

impl<'i> nom::error::ParseError<ParseInput<'i>> for Error<'i> {
    fn from_error_kind(span: ParseInput<'i>, k: nom::error::ErrorKind) -> Error<'i> {
        Error::Nom(nom::Err::Error((span, k)))
    }

    fn append(span: ParseInput<'i>, k: nom::error::ErrorKind, other: Error<'i>) -> Error<'i> {
        let mut vec = match other {
            Error::Mult(v) => v,
            e => vec![e],
        };

        vec.push(Error::from_error_kind(span, k));

        Error::Mult(vec)
    }
}

/// Parsing errors are reported like every other error, pointing at the furthest position
/// the parser could reach
impl<'i> From<&Error<'i>> for error::Error {
    fn from(err: &Error<'i>) -> error::Error {
        let span = err.span();
        let msg = match (err.message(), &span) {
            (Some(msg), _) => msg,
            (None, Some(span)) => match span.fragment().lines().next() {
                Some(rest) if !rest.trim().is_empty() => {
                    format!("unexpected input: `{}`", rest.trim())
                }
                _ => String::from("unexpected end of input"),
            },
            (None, None) => String::from("invalid input"),
        };

        let parse_err = error::Error::new(error::ErrKind::Parsing).with_msg(msg);

        match span {
            Some(span) => {
                let loc: Location = span.into();
                parse_err.with_loc(SpanTuple::with_source_ref(span.extra, loc.clone(), loc))
            }
            None => parse_err,
        }
    }
}

impl<'i> From<Error<'i>> for error::Error {
    fn from(err: Error<'i>) -> error::Error {
        error::Error::from(&err)
    }
}

/// Parse a list of token trees to a genko [`ast::Ast`]
#[macro_export]
macro_rules! ast {
        ($($tok:tt)*) => {
            {
                let ast = xparser::parse(
                    stringify!($($tok)*),
                    location::Source::Input(stringify!($($tok)*)))
                .unwrap();

                ast
            }
        }
    }
