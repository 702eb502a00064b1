use std::{ fs::{ canonicalize, metadata },
           io::{ stdout, Write },
           path::{ Path, PathBuf },
           rc::Rc };
use tracing::{ error, info, trace };
use crate::{ lang::{ arg_stream::ArgStream,
                     source_buffer::SourceLocation,
                     tokenizing::{ tokenize_block, tokenize_from_file, tokenize_lines, Token, TokenList } },
             runtime::{ built_ins::register_core_commands,
                        data_structures::{ command_registry::{ CommandFactory, CommandInfo, CommandRegistry },
                                           contextual_data::ContextualData,
                                           frame_stack::{ FrameKind, FrameStack, Unwind },
                                           function_dictionary::{ ConstantDictionary,
                                                                  FunctionDictionary,
                                                                  Functor },
                                           tuple_store::{ TuplePtr, TupleStore, RESULT_TUPLE },
                                           value::Value },
                        error::{ self, script_error, script_error_kind, script_error_str, ErrorKind },
                        interpreter::{ CallItem,
                                       CallStack,
                                       CommandManagement,
                                       CommandOutcome,
                                       CommandResult,
                                       ExecutionManagement,
                                       FunctionManagement,
                                       Interpreter,
                                       TupleManagement } } };



/// The search paths used to find script and image files.
pub type SearchPaths = Vec<String>;


/// How many blocks, function calls and includes may be running inside one another before a call
/// is refused.  Every level costs native stack, the limit keeps a runaway recursion a failed
/// command instead of a crashed process.
pub const DEFAULT_MAX_DEPTH: usize = 100;


/// Tuple arguments reach a function body under names of this form, which no script can declare.
const SUBSTITUTE_PREFIX: &str = "///";



/// One interpreter session.  A session owns all of its state, nothing is shared between sessions,
/// and it is not meant to leave the thread that created it.
pub struct Session
{
    /// The search paths used to find files, newest last.
    search_paths: SearchPaths,

    /// Named tuples and the tuple stack.
    tuples: TupleStore,

    /// Loop and function frames.
    frames: FrameStack,


    /// User defined functions.
    functions: FunctionDictionary,

    /// Named constants.
    constants: ConstantDictionary,

    /// The built-in commands.
    commands: CommandRegistry,


    /// The location of the command being executed.
    current_location: Option<SourceLocation>,

    /// The commands and functions currently executing.
    call_stack: CallStack,


    /// Where printed output goes.
    output: Box<dyn Write>,

    /// Log each line of an included file as it runs.
    echo_includes: bool,

    /// Set by `bye`.
    goodbye: bool,

    /// How many `execute` calls are active.  Only the outermost one records results in `@?`.
    nesting: usize,

    /// The deepest `nesting` allowed before blocks, calls and includes are refused.
    max_depth: usize,

    /// Numbers the substitute names handed to function bodies for their tuple arguments.
    substitutes: usize
}


impl Interpreter for Session
{
    fn add_search_path(&mut self, path: &str) -> error::Result<()>
    {
        if let Err(err) = metadata(path)
        {
            script_error(self, format!("Could not append search path {}: {}.", path, err))?;
        }

        self.search_paths.push(path.to_string());
        Ok(())
    }

    fn add_search_path_for_file(&mut self, file_path: &str) -> error::Result<()>
    {
        if let Some(parent) = Path::new(file_path).parent()
        {
            let parent_str = parent.to_string_lossy();
            self.add_search_path(&parent_str)?;
        }

        Ok(())
    }

    fn drop_search_path(&mut self) -> error::Result<()>
    {
        if self.search_paths.is_empty()
        {
            script_error_str(self, "Search path stack underflow.")?;
        }

        let _ = self.search_paths.pop();
        Ok(())
    }

    fn search_paths(&self) -> &Vec<String>
    {
        &self.search_paths
    }

    fn find_file(&self, path: &str) -> error::Result<String>
    {
        let canonical_text = |full_path: &Path| -> error::Result<String>
            {
                let canonical = canonicalize(full_path)?;

                match canonical.to_str()
                {
                    Some(canonical) => Ok(canonical.to_string()),
                    None => script_error_str(self, "Path contains invalid characters.")
                }
            };

        if Path::new(path).exists()
        {
            return canonical_text(Path::new(path));
        }

        for directory in self.search_paths.iter().rev()
        {
            let full_path = PathBuf::from(directory).join(path);

            if full_path.exists()
            {
                return canonical_text(&full_path);
            }
        }

        script_error(self, format!("File {} not found.", path))
    }

    fn output(&mut self) -> &mut dyn Write
    {
        self.output.as_mut()
    }

    fn echo_includes(&self) -> bool
    {
        self.echo_includes
    }

    fn set_echo_includes(&mut self, echo: bool)
    {
        self.echo_includes = echo;
    }

    fn reset(&mut self)
    {
        self.tuples.clear();
        self.frames.reset();
        self.call_stack.clear();
        self.current_location = None;
        self.goodbye = false;
        self.nesting = 0;
    }
}


impl TupleManagement for Session
{
    fn tuples(&self) -> &TupleStore
    {
        &self.tuples
    }

    fn tuples_mut(&mut self) -> &mut TupleStore
    {
        &mut self.tuples
    }

    fn require_tuple(&self, name: &str) -> error::Result<TuplePtr>
    {
        match self.tuples.get(name)
        {
            Some(tuple) => Ok(tuple),
            None => script_error_kind(self, ErrorKind::Resolution, format!("Tuple @{} does not exist.", name))
        }
    }

    fn pop(&mut self) -> error::Result<TuplePtr>
    {
        let result = self.tuples.pop();

        result.map_err(|err| err.with_context(&self.current_location, &self.call_stack))
    }
}


impl CommandManagement for Session
{
    fn add_command(&mut self,
                   file: String,
                   line: usize,
                   column: usize,
                   name: String,
                   factory: Rc<CommandFactory>,
                   description: String,
                   signature: String)
    {
        let location = SourceLocation::new_from_info(&file, line, column);

        self.commands.insert(CommandInfo::new(location, name, description, signature, factory));
    }

    fn find_command(&self, name: &str) -> Option<&CommandInfo>
    {
        self.commands.try_get(name)
    }

    fn commands(&self) -> &CommandRegistry
    {
        &self.commands
    }

    fn current_location(&self) -> &Option<SourceLocation>
    {
        &self.current_location
    }

    fn call_stack(&self) -> &CallStack
    {
        &self.call_stack
    }

    fn call_stack_push(&mut self, name: String, location: SourceLocation)
    {
        self.call_stack.push(CallItem::new(name, location));
    }

    fn call_stack_pop(&mut self) -> error::Result<()>
    {
        if self.call_stack.is_empty()
        {
            script_error_str(self, "Call stack underflow.")?;
        }

        let _ = self.call_stack.pop();
        Ok(())
    }
}


impl FunctionManagement for Session
{
    fn functions(&self) -> &FunctionDictionary
    {
        &self.functions
    }

    fn functions_mut(&mut self) -> &mut FunctionDictionary
    {
        &mut self.functions
    }

    fn constants(&self) -> &ConstantDictionary
    {
        &self.constants
    }

    fn constants_mut(&mut self) -> &mut ConstantDictionary
    {
        &mut self.constants
    }

    fn invoke_functor(&mut self,
                      name: &str,
                      location: &SourceLocation,
                      functor: Rc<Functor>,
                      actuals: &[Token]) -> error::Result<CommandResult>
    {
        if actuals.len() != functor.params().len()
        {
            return script_error(self, format!("Function {} takes {} arguments, {} given.",
                                              name,
                                              functor.params().len(),
                                              actuals.len()));
        }

        self.check_depth()?;

        // Named actuals are passed by name.  Each one is looked up now, in the caller's scope,
        // created if missing so there is a cell to assign through, and handed to the body under
        // a substitute name that refers to that same cell.  Locals the body declares can then
        // never hide a parameter.
        let mut bound = Vec::with_capacity(actuals.len());
        let mut aliases = Vec::new();

        for actual in actuals
        {
            match actual
            {
                Token::Tuple(at, tuple) =>
                    {
                        let cell = match self.tuples.get(tuple)
                            {
                                Some(cell) => cell,
                                None => self.tuples.set(tuple, Value::None)
                            };

                        self.substitutes += 1;

                        let substitute = format!("{}{}", SUBSTITUTE_PREFIX, self.substitutes);

                        bound.push(Token::Tuple(at.clone(), substitute.clone()));
                        aliases.push(( substitute, cell ));
                    }

                other => bound.push(other.clone())
            }
        }

        let body = functor.bind(&bound);
        let tokens = tokenize_block(&SourceLocation::new_from_path(&format!("<function {}>", name)),
                                    &body)?;

        let depth = self.frames.push(FrameKind::Function);
        self.tuples.mark_context();

        for ( substitute, cell ) in aliases
        {
            let _ = self.tuples.alias_local(&substitute, cell);
        }

        self.call_stack_push(name.to_string(), location.clone());

        let result = self.execute(ArgStream::new(tokens));

        let _ = self.frames.consume(Unwind::Return);
        self.frames.pop_to(depth);
        self.tuples.release_context();
        let _ = self.call_stack.pop();

        Ok(result)
    }
}


impl ExecutionManagement for Session
{
    fn frames(&self) -> &FrameStack
    {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut FrameStack
    {
        &mut self.frames
    }

    fn execute(&mut self, mut args: ArgStream) -> CommandResult
    {
        let mut result = CommandResult::Success;

        self.nesting += 1;

        while    args.has_more()
              && !self.goodbye
              && self.frames.pending().is_none()
        {
            let ( remaining, outcome ) = self.dispatch(args);

            args = remaining;
            result = outcome;

            if self.nesting == 1
            {
                let _ = self.tuples.set(RESULT_TUPLE, Value::Bool(result.is_success()));
            }

            if !result.is_success()
            {
                break;
            }
        }

        self.nesting -= 1;
        result
    }

    fn execute_block(&mut self, location: &SourceLocation, text: &str) -> error::Result<CommandResult>
    {
        self.check_depth()?;

        let tokens = tokenize_block(location, text)?;

        Ok(self.execute(ArgStream::new(tokens)))
    }

    fn process_source(&mut self, path: &str, source: &str) -> error::Result<CommandResult>
    {
        let lines = tokenize_lines(path, source)?;

        Ok(self.run_lines(lines, false))
    }

    fn process_source_file(&mut self, path: &str) -> error::Result<CommandResult>
    {
        self.check_depth()?;

        let full_path = self.find_file(path)?;
        let lines = tokenize_from_file(&full_path)?;

        self.add_search_path_for_file(&full_path)?;
        let result = self.run_lines(lines, self.echo_includes);
        self.drop_search_path()?;

        Ok(result)
    }

    fn is_goodbye(&self) -> bool
    {
        self.goodbye
    }

    fn set_goodbye(&mut self)
    {
        self.goodbye = true;
    }
}


impl Session
{
    /// Create a session with the core commands registered, writing to stdout.
    pub fn new() -> Session
    {
        let mut session = Session
            {
                search_paths: SearchPaths::new(),

                tuples: TupleStore::new(),
                frames: FrameStack::new(),

                functions: FunctionDictionary::new(),
                constants: ConstantDictionary::new(),
                commands: CommandRegistry::new(),

                current_location: None,
                call_stack: CallStack::with_capacity(40),

                output: Box::new(stdout()),
                echo_includes: false,
                goodbye: false,
                nesting: 0,
                max_depth: DEFAULT_MAX_DEPTH,
                substitutes: 0
            };

        register_core_commands(&mut session);
        session
    }

    /// Change how deeply blocks, function calls and includes may nest.  The caller is responsible
    /// for running the session on a stack large enough for the new limit.
    pub fn set_max_depth(&mut self, max_depth: usize)
    {
        self.max_depth = max_depth;
    }

    pub fn max_depth(&self) -> usize
    {
        self.max_depth
    }

    /// Refuse to nest another level once the limit is reached.
    fn check_depth(&self) -> error::Result<()>
    {
        if self.nesting >= self.max_depth
        {
            return script_error_kind(self,
                                     ErrorKind::Limit,
                                     format!("Recursion too deep, more than {} levels of blocks, \
                                              calls and includes.",
                                             self.max_depth));
        }

        Ok(())
    }

    /// Send printed output somewhere else, an in-memory buffer for example.
    pub fn set_output(&mut self, output: Box<dyn Write>)
    {
        self.output = output;
    }

    /// Run one top level line.  Any unwind request or frame left behind by an abandoned line is
    /// cleared first.
    pub fn run_line(&mut self, tokens: TokenList) -> CommandResult
    {
        if self.nesting == 0
        {
            self.frames.reset();
        }

        self.execute(ArgStream::new(tokens))
    }

    /// Run lines in order.  Stops at the first failing line, at `bye`, or when an unwind request
    /// has to travel out to a loop or function the lines were run from.
    fn run_lines(&mut self, lines: Vec<TokenList>, echo: bool) -> CommandResult
    {
        let mut result = CommandResult::Success;

        for line in lines
        {
            if echo
            {
                let text: Vec<String> = line.iter().map(Token::to_string).collect();
                info!("{}", text.join(" "));
            }

            result = self.run_line(line);

            if    !result.is_success()
               || self.goodbye
               || self.frames.pending().is_some()
            {
                break;
            }
        }

        result
    }

    /// Take the next token of the stream as a command and run it.  Errors from the command are
    /// logged here and become a failed result.
    fn dispatch(&mut self, mut args: ArgStream) -> CommandOutcome
    {
        let token = match args.next_arg()
            {
                Ok(token) => token,
                Err(err) =>
                    {
                        error!("{}", err);
                        return ( ArgStream::empty(), CommandResult::Failure );
                    }
            };

        let location = token.location().clone();
        let previous = self.current_location.replace(location.clone());

        trace!(command = %token, "dispatch");

        let outcome = match &token
            {
                Token::Word(_, name) => self.dispatch_word(name, &location, args),
                Token::Tuple(_, name) => self.dispatch_tuple(name, &location, args),
                other => script_error(self, format!("{} is not a command.", other))
            };

        let outcome = match outcome
            {
                Ok(outcome) => outcome,
                Err(err) =>
                    {
                        error!("{}", err);
                        ( ArgStream::empty(), CommandResult::Failure )
                    }
            };

        self.current_location = previous;
        outcome
    }

    /// A word at command position is a built-in command, or failing that a named function.
    fn dispatch_word(&mut self,
                     name: &str,
                     location: &SourceLocation,
                     mut args: ArgStream) -> error::Result<CommandOutcome>
    {
        if let Some(factory) = self.commands.try_get(name).map(CommandInfo::factory)
        {
            let mut command = factory();

            command.reinit();
            self.call_stack_push(name.to_string(), location.clone());

            let result = command.execute(self, args)
                                .map_err(|err| err.with_context(&self.current_location,
                                                                &self.call_stack));

            let _ = self.call_stack.pop();
            return result;
        }

        if let Some(functor) = self.functions.lookup(name)
        {
            let actuals = args.next_param_list()?;
            let result = self.invoke_functor(name, location, functor, &actuals)?;

            return Ok(( args, result ));
        }

        script_error_kind(self, ErrorKind::Dictionary, format!("Command \"{}\" not found.", name))
    }

    /// A tuple at command position is invoked if it holds a functor.
    fn dispatch_tuple(&mut self,
                      name: &str,
                      location: &SourceLocation,
                      mut args: ArgStream) -> error::Result<CommandOutcome>
    {
        let tuple = self.require_tuple(name)?;
        let functor = match tuple.borrow().value()
            {
                Value::Functor(functor) => Some(functor.clone()),
                _ => None
            };

        match functor
        {
            Some(functor) =>
                {
                    let actuals = args.next_param_list()?;
                    let result = self.invoke_functor(&format!("@{}", name), location, functor, &actuals)?;

                    Ok(( args, result ))
                }

            None => script_error_kind(self,
                                      ErrorKind::Dictionary,
                                      format!("Tuple @{} does not hold a function.", name))
        }
    }
}


impl Default for Session
{
    fn default() -> Self
    {
        Self::new()
    }
}
