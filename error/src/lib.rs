//! Errors produced while parsing and resolving genko programs. An [`Error`] has a kind, an
//! optional message and location, and a list of hints which are errors themselves. The
//! generics resolver never recovers from an error on behalf of its caller: errors are
//! collected in an [`ErrorHandler`] and emitted once resolution is over.

use std::fmt::{Display, Formatter};
use std::io;

use colored::Colorize;

use location::{SourceOwned, SpanTuple};

/// Process exit code used whenever parsing or resolution fails
pub const FAILURE_EXIT_CODE: i32 = 1;

/// The role of the error handler is to keep track of errors and emit them properly
/// once done
#[derive(Default, Debug)]
pub struct ErrorHandler {
    errors: Vec<Error>,
}

impl ErrorHandler {
    /// Emit all the errors contained in a handler
    pub fn emit(&self) {
        if let Some(first_err) = self.errors.first() {
            first_err.emit();
        }
        self.errors.iter().skip(1).for_each(|e| {
            eprintln!();
            e.emit()
        });
    }

    /// Add a new error to the handler
    pub fn add(&mut self, err: Error) {
        self.errors.push(err)
    }

    /// Has the error handler seen errors or not
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Kinds of all the errors seen so far, in the order they were added
    pub fn kinds(&self) -> Vec<ErrKind> {
        self.errors.iter().map(Error::kind).collect()
    }
}

impl From<Error> for ErrorHandler {
    fn from(err: Error) -> ErrorHandler {
        ErrorHandler { errors: vec![err] }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrKind {
    Hint,
    Parsing,
    IO,
    /// A type name which is neither a known type nor a generic parameter in scope
    UndeclaredType,
    /// A variable or function which cannot be found
    UndeclaredName,
    /// Two arguments imply different types for the same generic parameter
    ConflictingInference,
    /// A type lacks a field, method or operator it is required to have
    MissingCapability,
    /// Generic expansion which never terminates
    CyclicInstantiation,
    /// A return type which disagrees with the body or with how the result is used
    IncompatibleReturnType,
    /// Argument counts, argument types, generic argument counts, duplicate declarations
    Mismatch,
}

impl ErrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrKind::Hint => "hint",
            ErrKind::Parsing => "parsing",
            ErrKind::IO => "i/o",
            ErrKind::UndeclaredType => "undeclared type",
            ErrKind::UndeclaredName => "undeclared name",
            ErrKind::ConflictingInference => "conflicting inference",
            ErrKind::MissingCapability => "missing capability",
            ErrKind::CyclicInstantiation => "cyclic instantiation",
            ErrKind::IncompatibleReturnType => "incompatible return type",
            ErrKind::Mismatch => "mismatch",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Error {
    kind: ErrKind,
    msg: Option<String>,
    loc: Option<SpanTuple>,
    hints: Vec<Error>,
}

fn get_path_str(loc: &SpanTuple) -> String {
    match loc.source() {
        SourceOwned::Path(p) => format!("{}", p.display()),
        SourceOwned::Input(_) => String::from("<source>"),
        SourceOwned::Empty => String::from("<?>"),
    }
}

impl Error {
    fn emit_full_loc(&self, loc: &SpanTuple) {
        let (before_ctx, after_ctx) = loc.generate_context();
        let path = get_path_str(loc);

        if let Some(msg) = &self.msg {
            eprintln!(
                "{} [{}]: {}:{}:{}: {}",
                "error".black().on_yellow(),
                self.kind.as_str().yellow(),
                path.yellow(),
                loc.start().line(),
                loc.start().column(),
                msg
            );
            eprintln!();
        }

        if let Some(ctx) = before_ctx {
            ctx.emit('|', '_')
        };
        loc.emit(">".red().bold(), "^".purple());
        after_ctx.emit('|', '_');
    }

    fn emit_hint(&self) {
        eprintln!();
        eprint!("{}: ", "hint".black().on_green());
        if let Some(loc) = &self.loc {
            let path = get_path_str(loc);
            eprint!(
                "{}:{}:{}: ",
                path.green(),
                loc.start().line(),
                loc.start().column()
            );
        }
        if let Some(msg) = &self.msg {
            eprintln!("{msg}");
        }
        eprintln!();

        if let Some(loc) = &self.loc {
            loc.emit("|".green(), "^".green());
        }
    }

    pub fn emit(&self) {
        if let Some(loc) = &self.loc {
            self.emit_full_loc(loc);
        } else if let Some(msg) = &self.msg {
            eprintln!(
                "{} [{}]: {msg}",
                "error".black().on_yellow(),
                self.kind.as_str().yellow()
            )
        }

        self.hints.iter().for_each(|hint| hint.emit_hint());
    }

    pub fn new(kind: ErrKind) -> Error {
        Error {
            kind,
            msg: None,
            loc: None,
            hints: vec![],
        }
    }

    pub fn hint() -> Error {
        Error::new(ErrKind::Hint)
    }

    pub fn with_msg(self, msg: String) -> Error {
        Error {
            msg: Some(msg),
            ..self
        }
    }

    pub fn with_loc(self, loc: SpanTuple) -> Error {
        Error {
            loc: Some(loc),
            ..self
        }
    }

    /// Only set the location if the error does not have one already. This is useful when
    /// bubbling errors up from helpers which might not know where they are being used
    pub fn or_loc(self, loc: &SpanTuple) -> Error {
        match self.loc {
            Some(_) => self,
            None => self.with_loc(loc.clone()),
        }
    }

    // Add a hint to emit alongside the error
    pub fn with_hint(self, hint: Error) -> Error {
        let mut new_hints = self.hints;
        new_hints.push(hint);

        Error {
            hints: new_hints,
            ..self
        }
    }

    pub fn kind(&self) -> ErrKind {
        self.kind
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn loc(&self) -> Option<&SpanTuple> {
        self.loc.as_ref()
    }

    pub fn hints(&self) -> &[Error] {
        &self.hints
    }
}

/// I/O errors keep their messages
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::new(ErrKind::IO).with_msg(e.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(msg) = &self.msg {
            write!(f, ": {msg}")?;
        }

        if let Some(loc) = &self.loc {
            write!(
                f,
                " at line {} column {}",
                loc.start().line(),
                loc.start().column()
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
