use crate::{
    lang::tokenizing::{CLOSE_BLOCK, OPEN_BLOCK, Token},
    runtime::error::{self, ErrorKind, ScriptError},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// Prefix marking a parameter reference inside a function body.
pub const PARAM_PREFIX: &str = "@@";

/// Prefix every constant name starts with.
pub const CONST_PREFIX: char = '*';

/// A user defined function: the parameter names and the unparsed text of the body.  Nothing is
/// captured from the defining scope; the body is re-parsed on every call after the actual
/// arguments are spliced in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Functor {
    params: Vec<String>,
    block: String,
}

/// Prints the parameter list and body the way they are written when defining a function.
impl Display for Functor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, " (")?;

        for param in &self.params {
            write!(f, " {}", param)?;
        }

        write!(f, " ) {} {} {}", OPEN_BLOCK, self.block.trim(), CLOSE_BLOCK)
    }
}

impl Functor {
    /// Create a functor from its parameter names and body text.
    pub fn new(params: Vec<String>, block: String) -> Functor {
        Functor { params, block }
    }

    /// The declared parameter names.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The unparsed body text.
    pub fn block(&self) -> &str {
        &self.block
    }

    /// Produce the body text with every whitespace delimited `@@param` replaced by the source form
    /// of the matching actual argument.  Nested blocks and quotes are included, everything else is
    /// copied through untouched, whitespace and all.
    pub fn bind(&self, actuals: &[Token]) -> String {
        let mut bound = String::with_capacity(self.block.len());
        let mut rest = self.block.as_str();

        while !rest.is_empty() {
            let space = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
            bound.push_str(&rest[..space]);
            rest = &rest[space..];

            let length = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let lex = &rest[..length];

            let actual = lex
                .strip_prefix(PARAM_PREFIX)
                .and_then(|name| self.params.iter().position(|param| param == name))
                .and_then(|index| actuals.get(index));

            match actual {
                Some(token) => bound.push_str(&token.to_string()),
                None => bound.push_str(lex),
            }

            rest = &rest[length..];
        }

        bound
    }
}

/// The named functions of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionDictionary {
    functions: BTreeMap<String, Rc<Functor>>,
}

/// List every function as it would be defined, sorted by name.
impl Display for FunctionDictionary {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        for (name, functor) in self.functions.iter() {
            writeln!(formatter, "{}{}", name, functor)?;
        }

        Ok(())
    }
}

impl FunctionDictionary {
    /// Create an empty dictionary.
    pub fn new() -> FunctionDictionary {
        FunctionDictionary::default()
    }

    /// Define or redefine a function.
    pub fn define(&mut self, name: &str, functor: Functor) {
        let _ = self.functions.insert(name.to_string(), Rc::new(functor));
    }

    /// Find a function by name.
    pub fn lookup(&self, name: &str) -> Option<Rc<Functor>> {
        self.functions.get(name).cloned()
    }

    /// Remove a function, returning whether it existed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    /// Insert or overwrite every function of the other dictionary.
    pub fn merge(&mut self, other: FunctionDictionary) {
        self.functions.extend(other.functions);
    }

    /// Discard this dictionary and take the other one wholesale.
    pub fn replace(&mut self, other: FunctionDictionary) {
        *self = other;
    }

    /// The function names in sorted order.
    pub fn names(&self) -> Vec<&String> {
        self.functions.keys().collect()
    }

    /// How many functions are defined.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Are there no functions at all?
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Named constants.  Once defined a constant can't be changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDictionary {
    constants: BTreeMap<String, String>,
}

/// List every constant, sorted by name.
impl Display for ConstantDictionary {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        for (name, value) in self.constants.iter() {
            writeln!(formatter, "{} = {}", name, value)?;
        }

        Ok(())
    }
}

impl ConstantDictionary {
    /// Create an empty constant dictionary.
    pub fn new() -> ConstantDictionary {
        ConstantDictionary::default()
    }

    /// Is this text shaped like a constant name?
    pub fn is_constant_name(name: &str) -> bool {
        name.len() > 1 && name.starts_with(CONST_PREFIX)
    }

    /// Define a new constant.  Bad names and redefinitions are errors.
    pub fn define(&mut self, name: &str, value: String) -> error::Result<()> {
        if !ConstantDictionary::is_constant_name(name) {
            let message = format!("{} is not a constant name starting with {}.", name, CONST_PREFIX);

            return ScriptError::new(ErrorKind::Dictionary, message).into_result();
        }

        if let Some(existing) = self.constants.get(name) {
            let message = format!("{} already exists as a constant with value {}.", name, existing);

            return ScriptError::new(ErrorKind::Dictionary, message).into_result();
        }

        let _ = self.constants.insert(name.to_string(), value);
        Ok(())
    }

    /// The value of a constant, if defined.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.constants.get(name)
    }

    /// Insert or overwrite every constant of the other dictionary.
    pub fn merge(&mut self, other: ConstantDictionary) {
        self.constants.extend(other.constants);
    }

    /// Discard this dictionary and take the other one wholesale.
    pub fn replace(&mut self, other: ConstantDictionary) {
        *self = other;
    }

    /// How many constants are defined.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Are there no constants at all?
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::source_buffer::SourceLocation;

    fn functor(params: &[&str], block: &str) -> Functor {
        Functor::new(params.iter().map(|p| p.to_string()).collect(), block.to_string())
    }

    #[test]
    fn bind_replaces_whole_parameter_lexes_only() {
        let f = functor(&["a", "b"], " put -to @@a @@b\n  THEN $[ put @@ab @@b ]$ ");
        let location = SourceLocation::new();
        let bound = f.bind(&[
            Token::Tuple(location.clone(), "x".into()),
            Token::Quoted(location.clone(), "hi there".into()),
        ]);

        assert_eq!(bound, " put -to @x ${ hi there }$\n  THEN $[ put @@ab ${ hi there }$ ]$ ");
    }

    #[test]
    fn display_matches_definition_form() {
        assert_eq!(functor(&["p1", "p2"], " put @@p1 ").to_string(), " ( p1 p2 ) $[ put @@p1 ]$");
    }

    #[test]
    fn constants_refuse_redefinition() {
        let mut constants = ConstantDictionary::new();

        assert!(constants.define("*pi", "3.14".into()).is_ok());
        assert!(constants.define("*pi", "3".into()).is_err());
        assert!(constants.define("pi", "3".into()).is_err());
        assert_eq!(constants.get("*pi").map(String::as_str), Some("3.14"));
    }

    #[test]
    fn merge_prefers_incoming_entries() {
        let mut a = FunctionDictionary::new();
        a.define("x", functor(&[], "put x"));
        a.define("y", functor(&[], "put old"));

        let mut b = FunctionDictionary::new();
        b.define("y", functor(&[], "put new"));
        b.define("z", functor(&[], "put z"));

        let mut replaced = a.clone();
        replaced.replace(b.clone());
        a.merge(b.clone());

        assert_eq!(a.names(), vec!["x", "y", "z"]);
        assert_eq!(a.lookup("y").unwrap().block(), "put new");
        assert_eq!(replaced, b);
    }
}
