use crate::{
    lang::{
        source_buffer::SourceLocation,
        tokenizing::{Token, TokenList},
    },
    runtime::{
        data_structures::{
            function_dictionary::ConstantDictionary, tuple_store::TuplePtr, value::Value,
        },
        error::{self, ErrorKind, ScriptError},
        interpreter::Interpreter,
    },
};
use std::{
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// Opens a parameter list.
pub const OPEN_PARAMS: &str = "(";

/// Closes a parameter list.
pub const CLOSE_PARAMS: &str = ")";

fn stream_error<T>(location: Option<SourceLocation>, message: String) -> error::Result<T> {
    ScriptError::new(ErrorKind::Stream, message).at(location).into_result()
}

/// A cursor over a shared, immutable list of tokens.  Commands consume arguments from the front
/// and hand back what's left.  Cloning copies only the cursor, so a loop body parsed once can be
/// replayed every iteration without re-tokenizing or copying the tokens themselves.
#[derive(Clone)]
pub struct ArgStream {
    tokens: Rc<[Token]>,
    cursor: usize,
}

impl Default for ArgStream {
    fn default() -> Self {
        Self::empty()
    }
}

/// Print the unconsumed part of the stream.
impl Display for ArgStream {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let remaining: Vec<String> = self.remaining().iter().map(Token::to_string).collect();
        write!(f, "{}", remaining.join(" "))
    }
}

impl ArgStream {
    /// Create a stream over the given tokens.
    pub fn new(tokens: TokenList) -> ArgStream {
        ArgStream {
            tokens: tokens.into(),
            cursor: 0,
        }
    }

    /// A stream with nothing in it.  Commands that end the current line return this.
    pub fn empty() -> ArgStream {
        ArgStream::new(TokenList::new())
    }

    /// Are there unconsumed arguments?
    pub fn has_more(&self) -> bool {
        self.cursor < self.tokens.len()
    }

    /// How many arguments are left.
    pub fn size_remaining(&self) -> usize {
        self.tokens.len() - self.cursor
    }

    /// The unconsumed arguments.
    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.cursor..]
    }

    /// Look at the next argument without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// Look further ahead, `peek_at(0)` being `peek()`.
    pub fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + offset)
    }

    /// Where the next argument is, or where the last one was once the stream is used up.
    pub fn location(&self) -> Option<SourceLocation> {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|token| token.location().clone())
    }

    /// Consume the next argument.  Reading past the end is a stream error, never a default.
    pub fn next_arg(&mut self) -> error::Result<Token> {
        match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                Ok(token.clone())
            }

            None => stream_error(
                self.location(),
                format!(
                    "{} represents too few arguments, the argument stream is exhausted.",
                    self.size_remaining()
                ),
            ),
        }
    }

    /// If the next argument is a dash-command consume it and return its text.
    pub fn parse_dash_command(&mut self) -> Option<String> {
        let dash_command = self.peek()?.dash_command()?.to_string();

        self.cursor += 1;
        Some(dash_command)
    }

    /// Consume the next argument if it is the given bare word.
    pub fn skip_word(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_word(word)) {
            self.cursor += 1;
            return true;
        }

        false
    }

    /// Consume the next argument only if it is a block, returning where the body starts and its
    /// raw text.
    pub fn next_block(&mut self) -> Option<(SourceLocation, String)> {
        match self.peek()? {
            Token::Block(location, text) => {
                let block = (location.clone(), text.clone());

                self.cursor += 1;
                Some(block)
            }

            _ => None,
        }
    }

    /// Consume a block that must be there.
    pub fn require_block(&mut self, purpose: &str) -> error::Result<(SourceLocation, String)> {
        match self.next_block() {
            Some(block) => Ok(block),
            None => stream_error(self.location(), format!("Expected a $[ block ]$ for {}.", purpose)),
        }
    }

    /// Consume a tuple name reference, returning the name.
    pub fn next_tuple_name(&mut self) -> error::Result<String> {
        match self.next_arg()? {
            Token::Tuple(_, name) => Ok(name),
            other => stream_error(
                Some(other.location().clone()),
                format!("{} is not a tuple name.", other),
            ),
        }
    }

    /// Consume a bare word or quotation and return its text as written.
    pub fn next_word(&mut self) -> error::Result<String> {
        match self.next_arg()? {
            Token::Word(_, text) | Token::Quoted(_, text) => Ok(text),
            other => stream_error(
                Some(other.location().clone()),
                format!("Expected a word, found {}.", other),
            ),
        }
    }

    /// Consume a reference to a tuple cell: either `@name`, which must exist, or `~`, which pops
    /// the stack.
    pub fn next_tuple_or_pop(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<TuplePtr> {
        match self.next_arg()? {
            Token::Tuple(_, name) => interpreter.require_tuple(&name),
            Token::Pop(_) => interpreter.pop(),
            other => stream_error(
                Some(other.location().clone()),
                format!("Expected a tuple name or {}, found {}.", Token::Pop(SourceLocation::new()), other),
            ),
        }
    }

    /// Consume the next argument and resolve it to a value.  In order of precedence: the pop
    /// sentinel pops the tuple stack, a tuple name reads the named tuple which must exist, a
    /// quotation is used verbatim, and a bare word is used as is, unless it names a constant in
    /// which case the constant's value is used.
    pub fn next_resolving(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<Value> {
        match self.next_arg()? {
            Token::Pop(_) => interpreter.pop_value(),

            Token::Tuple(_, name) => {
                let tuple = interpreter.require_tuple(&name)?;
                let value = tuple.borrow().value().clone();

                Ok(value)
            }

            Token::Quoted(_, text) => Ok(Value::String(text)),

            Token::Word(_, word) => {
                if ConstantDictionary::is_constant_name(&word)
                    && let Some(value) = interpreter.constants().get(&word)
                {
                    return Ok(Value::String(value.clone()));
                }

                Ok(Value::String(word))
            }

            block @ Token::Block(_, _) => stream_error(
                Some(block.location().clone()),
                "Expected a value, found a block.".to_string(),
            ),
        }
    }

    /// Resolve the next argument and coerce it to an integer.
    pub fn next_int(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<i64> {
        self.next_resolving(interpreter)?.to_int(interpreter)
    }

    /// Resolve the next argument and coerce it to a boolean.
    pub fn next_bool(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<bool> {
        self.next_resolving(interpreter)?.to_bool(interpreter)
    }

    /// Resolve the next argument to its text with surrounding whitespace trimmed.
    pub fn next_string(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<String> {
        Ok(self.next_resolving(interpreter)?.to_text().trim().to_string())
    }

    /// Consume a `( arg ... )` list, returning the arguments unresolved.
    pub fn next_param_list(&mut self) -> error::Result<Vec<Token>> {
        if !self.skip_word(OPEN_PARAMS) {
            return stream_error(
                self.location(),
                format!("Expected a {} parameter list {}.", OPEN_PARAMS, CLOSE_PARAMS),
            );
        }

        let mut params = Vec::new();

        while !self.skip_word(CLOSE_PARAMS) {
            params.push(self.next_arg()?);
        }

        Ok(params)
    }
}
