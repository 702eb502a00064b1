use crate::{
    lang::{arg_stream::ArgStream, source_buffer::SourceLocation, tokenizing::Token},
    runtime::{
        data_structures::{
            command_registry::{CommandFactory, CommandInfo, CommandRegistry},
            frame_stack::FrameStack,
            function_dictionary::{ConstantDictionary, FunctionDictionary, Functor},
            tuple_store::{TupleStore, TuplePtr},
            value::Value,
        },
        error,
    },
};
use std::{
    fmt::{self, Display, Formatter},
    io::Write,
    rc::Rc,
};

pub mod session;

/// A call stack item is a record of the executing command or function's name and the location
/// within the source from which it was dispatched.
#[derive(Clone)]
pub struct CallItem {
    location: SourceLocation,
    name: String,
}

impl CallItem {
    /// Create a new call stack item.
    pub fn new(name: String, location: SourceLocation) -> CallItem {
        CallItem { location, name }
    }

    /// Where the command was dispatched from.
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The name of the command or function being executed.
    pub fn name(&self) -> &String {
        &self.name
    }
}

impl Display for CallItem {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.name)
    }
}

/// The commands and functions executing at a given moment, innermost last.
pub type CallStack = Vec<CallItem>;

/// The outcome of a command.  Failure stops the rest of the line but never the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandResult {
    Success,
    Failure,
}

impl CommandResult {
    /// Did the command succeed?
    pub fn is_success(&self) -> bool {
        *self == CommandResult::Success
    }
}

/// What a command hands back: the arguments it didn't consume, and how it went.
pub type CommandOutcome = (ArgStream, CommandResult);

/// A built-in command.  A fresh instance is created for every dispatch and `reinit` is called
/// before `execute`, so any switches parsed by one invocation never leak into the next.
pub trait Command {
    /// Return every per-invocation setting to its default.
    fn reinit(&mut self);

    /// Consume this command's arguments from the stream and run.  Errors are reported by the
    /// dispatcher and turn into a failed result.
    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        args: ArgStream,
    ) -> error::Result<CommandOutcome>;
}

/// Simplify registering a built-in command with the interpreter.
///
/// Required parameters are the interpreter to register with, the name of the command, the type
/// implementing it, which must implement `Default`, a one line description, and the command's
/// usage signature.
#[macro_export]
macro_rules! add_command {
    (
        $interpreter:expr ,
        $name:expr ,
        $command:ty ,
        $description:expr ,
        $signature:expr
    ) => {{
        use std::rc::Rc;
        use $crate::runtime::interpreter::Command;

        // Record where in the Rust source the command was registered from.
        $interpreter.add_command(
            file!().to_string(),
            line!() as usize,
            column!() as usize,
            $name.to_string(),
            Rc::new(|| Box::new(<$command>::default()) as Box<dyn Command>),
            $description.to_string(),
            $signature.to_string(),
        );
    }};
}

/// Access to the tuple store: named tuples and the tuple stack.
pub trait TupleManagement {
    /// The whole store.
    fn tuples(&self) -> &TupleStore;

    /// The whole store, mutably.
    fn tuples_mut(&mut self) -> &mut TupleStore;

    /// Find a named tuple.  Not finding one is a normal outcome.
    fn find_tuple(&self, name: &str) -> Option<TuplePtr> {
        self.tuples().get(name)
    }

    /// Find a named tuple that has to exist.
    fn require_tuple(&self, name: &str) -> error::Result<TuplePtr>;

    /// Assign a value to a named tuple, creating it if needed.
    fn set_tuple(&mut self, name: &str, value: Value) -> TuplePtr {
        self.tuples_mut().set(name, value)
    }

    /// Push a value onto the tuple stack.
    fn push(&mut self, value: Value) {
        self.tuples_mut().push_value(value);
    }

    /// Push an existing tuple onto the stack.
    fn push_tuple(&mut self, tuple: TuplePtr) {
        self.tuples_mut().push(tuple);
    }

    /// Pop the top tuple.  Underflow is an error stamped with the current location.
    fn pop(&mut self) -> error::Result<TuplePtr>;

    /// Pop the top tuple and take its value.
    fn pop_value(&mut self) -> error::Result<Value> {
        let tuple = self.pop()?;
        let value = tuple.borrow().value().clone();

        Ok(value)
    }
}

/// Registration and lookup of built-in commands.
pub trait CommandManagement {
    /// Register a built-in command.
    #[allow(clippy::too_many_arguments)]
    fn add_command(
        &mut self,
        file: String,
        line: usize,
        column: usize,
        name: String,
        factory: Rc<CommandFactory>,
        description: String,
        signature: String,
    );

    /// Find a command by name.
    fn find_command(&self, name: &str) -> Option<&CommandInfo>;

    /// Every registered command.
    fn commands(&self) -> &CommandRegistry;

    /// If currently set, the location of the command being executed.
    fn current_location(&self) -> &Option<SourceLocation>;

    /// The current call stack.
    fn call_stack(&self) -> &CallStack;

    /// Push a name and location onto the call stack.
    fn call_stack_push(&mut self, name: String, location: SourceLocation);

    /// Pop the innermost call stack entry.
    fn call_stack_pop(&mut self) -> error::Result<()>;
}

/// The user defined functions and constants.
pub trait FunctionManagement {
    /// The function dictionary.
    fn functions(&self) -> &FunctionDictionary;

    /// The function dictionary, mutably.
    fn functions_mut(&mut self) -> &mut FunctionDictionary;

    /// The constant dictionary.
    fn constants(&self) -> &ConstantDictionary;

    /// The constant dictionary, mutably.
    fn constants_mut(&mut self) -> &mut ConstantDictionary;

    /// Call a functor with unresolved actual arguments.  The actuals are spliced into the body,
    /// which then runs inside a function frame and a fresh local tuple layer.  A name is used for
    /// the call stack.
    fn invoke_functor(
        &mut self,
        name: &str,
        location: &SourceLocation,
        functor: Rc<Functor>,
        actuals: &[Token],
    ) -> error::Result<CommandResult>;
}

/// Running argument streams, blocks, and whole sources.
pub trait ExecutionManagement {
    /// The loop and function frames plus any pending unwind request.
    fn frames(&self) -> &FrameStack;

    /// The frames, mutably.
    fn frames_mut(&mut self) -> &mut FrameStack;

    /// Dispatch commands from the stream until it is used up, a command fails, an unwind is
    /// requested, or the session is ending.  Returns the result of the last command run.
    fn execute(&mut self, args: ArgStream) -> CommandResult;

    /// Tokenize and execute the text of a block.
    fn execute_block(&mut self, location: &SourceLocation, text: &str) -> error::Result<CommandResult>;

    /// Run every line of a source string, stopping at the first failure.
    fn process_source(&mut self, path: &str, source: &str) -> error::Result<CommandResult>;

    /// Find, read, and run a source file.  The file's directory is searched for nested includes
    /// while it runs.
    fn process_source_file(&mut self, path: &str) -> error::Result<CommandResult>;

    /// Has the session been asked to end?
    fn is_goodbye(&self) -> bool;

    /// Ask the session to end once the current command returns.
    fn set_goodbye(&mut self);
}

/// Core interpreter trait, bringing the management traits together with the session's
/// environment: search paths and the output stream.
pub trait Interpreter:
    TupleManagement + CommandManagement + FunctionManagement + ExecutionManagement
{
    /// Add a directory to the search path list.  The directory must exist.
    fn add_search_path(&mut self, path: &str) -> error::Result<()>;

    /// Add the directory holding a file to the search paths.
    fn add_search_path_for_file(&mut self, file_path: &str) -> error::Result<()>;

    /// Drop the most recently added search path.
    fn drop_search_path(&mut self) -> error::Result<()>;

    /// The search paths, oldest first.
    fn search_paths(&self) -> &Vec<String>;

    /// Find a file directly or in the search paths, newest first, returning its full path.
    fn find_file(&self, path: &str) -> error::Result<String>;

    /// Where printed output goes.
    fn output(&mut self) -> &mut dyn Write;

    /// Should included files be echoed as they are run?
    fn echo_includes(&self) -> bool;

    /// Turn echoing of included lines on or off.
    fn set_echo_includes(&mut self, echo: bool);

    /// Clear the tuple stack, the frames, and the call stack.  Named tuples and dictionaries
    /// survive.
    fn reset(&mut self);
}
