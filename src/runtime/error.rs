
use std::{ error::Error,
           fmt::{ self, Debug, Display, Formatter },
           process::{ ExitCode, Termination } };
use crate::{ runtime::{ data_structures::image::ImageError, interpreter::CallStack },
             lang::source_buffer::SourceLocation };

use super::interpreter::Interpreter;



pub type Result<T> = std::result::Result<T, ScriptError>;



/// What went wrong, broadly.  Every kind ends the same way, as a failed command, the kind only
/// sharpens the diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind
{
    /// The token stream ran out or held something that can't be read where it appeared.
    Stream,

    /// A tuple was missing, the stack was empty, or a value couldn't be coerced.
    Resolution,

    /// A control-flow keyword without its block, or one used outside its construct.
    Structure,

    /// An undefined function, a bad definition, or an image that can't be loaded.
    Dictionary,

    /// Files and other resources outside the interpreter.
    External,

    /// Nesting went past the session's limit.
    Limit,

    /// A command rejected its arguments.
    Command
}


impl Display for ErrorKind
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        let name = match self
            {
                ErrorKind::Stream     => "stream",
                ErrorKind::Resolution => "resolution",
                ErrorKind::Structure  => "structure",
                ErrorKind::Dictionary => "dictionary",
                ErrorKind::External   => "external",
                ErrorKind::Limit      => "limit",
                ErrorKind::Command    => "command"
            };

        write!(f, "{}", name)
    }
}



/// Any error raised while tokenizing or executing a script.  Inside a command these travel as
/// `Err` values; the dispatcher turns them into a failed command result and logs them, so they
/// never end the session.
#[derive(Clone)]
pub struct ScriptError
{
    kind: ErrorKind,
    location: Option<SourceLocation>,
    message: String,

    /// Empty when the error was raised away from the interpreter and hasn't been stamped yet.
    call_stack: CallStack
}


impl Error for ScriptError
{
}


/// Returned from main the error is reported on stderr and the process fails.
impl Termination for ScriptError
{
    fn report(self) -> ExitCode
    {
        eprintln!("stackline: {}", self);
        ExitCode::FAILURE
    }
}


/// `path (line, column): kind error: message`, followed by the call stack innermost first.
impl Display for ScriptError
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        if let Some(location) = &self.location
        {
            write!(f, "{}: ", location)?;
        }

        write!(f, "{} error: {}", self.kind, self.message)?;

        for item in self.call_stack.iter().rev()
        {
            write!(f, "\n    in {}", item)?;
        }

        Ok(())
    }
}


impl Debug for ScriptError
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result
    {
        write!(f, "{}", self)
    }
}


impl ScriptError
{
    /// An error of the given kind, not yet tied to a place in the script.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> ScriptError
    {
        ScriptError
            {
                kind,
                location: None,
                message: message.into(),
                call_stack: CallStack::new()
            }
    }

    /// Place the error in the script.
    pub fn at(mut self, location: Option<SourceLocation>) -> ScriptError
    {
        self.location = location;
        self
    }

    /// Wrap the error in `Err`.
    pub fn into_result<T>(self) -> Result<T>
    {
        Err(self)
    }

    /// Fill in whatever the error doesn't know yet from the interpreter's current position.
    pub fn with_context(mut self,
                        location: &Option<SourceLocation>,
                        call_stack: &CallStack) -> ScriptError
    {
        if self.location.is_none()
        {
            self.location = location.clone();
        }

        if self.call_stack.is_empty()
        {
            self.call_stack = call_stack.clone();
        }

        self
    }

    pub fn kind(&self) -> ErrorKind
    {
        self.kind
    }

    pub fn location(&self) -> &Option<SourceLocation>
    {
        &self.location
    }

    pub fn message(&self) -> &str
    {
        &self.message
    }

    pub fn call_stack(&self) -> &CallStack
    {
        &self.call_stack
    }
}


impl From<std::io::Error> for ScriptError
{
    fn from(error: std::io::Error) -> ScriptError
    {
        ScriptError::new(ErrorKind::External, error.to_string())
    }
}


impl From<ImageError> for ScriptError
{
    fn from(error: ImageError) -> ScriptError
    {
        ScriptError::new(ErrorKind::Dictionary, format!("bad dictionary image, {}", error))
    }
}



/// Fail with an error of the given kind at the interpreter's current location and call stack.
pub fn script_error_kind<T>(interpreter: &dyn Interpreter, kind: ErrorKind, message: String) -> Result<T>
{
    ScriptError::new(kind, message)
        .with_context(interpreter.current_location(), interpreter.call_stack())
        .into_result()
}


/// Fail at the interpreter's current location and call stack.  Used by commands rejecting their
/// arguments.
pub fn script_error<T>(interpreter: &dyn Interpreter, message: String) -> Result<T>
{
    script_error_kind(interpreter, ErrorKind::Command, message)
}


pub fn script_error_str<T>(interpreter: &dyn Interpreter, message: &str) -> Result<T>
{
    script_error(interpreter, message.to_string())
}


#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn context_fills_only_what_is_missing()
    {
        let here = SourceLocation::new_from_info("a.sl", 3, 7);
        let there = SourceLocation::new_from_info("b.sl", 1, 1);

        let error = ScriptError::new(ErrorKind::Resolution, "Tuple stack underflow.")
            .at(Some(here.clone()))
            .with_context(&Some(there), &CallStack::new());

        assert_eq!(error.location(), &Some(here));
        assert_eq!(error.kind(), ErrorKind::Resolution);
        assert_eq!(error.to_string(), "a.sl (3, 7): resolution error: Tuple stack underflow.");
    }
}
