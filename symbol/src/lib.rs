//! Symbols are the names used throughout a genko program: variables, functions, types and
//! generic parameters. They are cheap to compare and hash, which is what the resolution
//! passes do with them most of the time.

// FIXME: Intern symbols once the resolver starts cloning them in hot loops

use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn access(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Symbol {
        Symbol(String::from(s))
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Symbol {
        Symbol(s)
    }
}

impl From<&Symbol> for String {
    fn from(s: &Symbol) -> String {
        s.0.clone()
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_symbol() {
        assert_eq!(Symbol::from("T"), Symbol::from(String::from("T")));
        assert_ne!(Symbol::from("T"), Symbol::from("U"));
    }

    #[test]
    fn access_gives_back_name() {
        let sym = Symbol::from("inner_box");

        assert_eq!(sym.access(), "inner_box");
        assert_eq!(sym.to_string(), "inner_box");
    }
}
