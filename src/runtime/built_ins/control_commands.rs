use crate::{
    add_command,
    lang::{
        arg_stream::ArgStream,
        source_buffer::SourceLocation,
        tokenizing::{tokenize_block, Token},
    },
    runtime::{
        built_ins::command_support::{run_block, success, CommandBase},
        data_structures::{
            data_sink::DataSink,
            frame_stack::{FrameKind, Unwind},
            value::Value,
        },
        error::{self, script_error, script_error_kind, ErrorKind},
        interpreter::{Command, CommandOutcome, CommandResult, Interpreter},
    },
};
use std::cell::Cell;

const THEN: &str = "THEN";
const ELSE: &str = "ELSE";
const CATCH: &str = "CATCH";

/// Skip a keyword and the block that has to follow it.  A keyword with no block is malformed.
fn skip_clause(
    interpreter: &dyn Interpreter,
    args: &mut ArgStream,
    keyword: &str,
) -> error::Result<()> {
    if args.skip_word(keyword) && args.next_block().is_none() {
        return script_error_kind(
            interpreter,
            ErrorKind::Structure,
            format!("{} is missing its $[ block ]$.", keyword),
        );
    }

    Ok(())
}

/// Read a condition that must be a boolean.
fn condition_value(interpreter: &dyn Interpreter, value: &Value) -> error::Result<bool> {
    match value.to_bool(interpreter) {
        Ok(condition) => Ok(condition),
        Err(_) => script_error_kind(
            interpreter,
            ErrorKind::Structure,
            format!(
                "Condition must be true or false, found {} {}.",
                value.type_name(),
                value
            ),
        ),
    }
}

/// Run a loop body until `next_iteration` says to stop, the body fails, or the body breaks out.
/// One loop frame is pushed for the whole loop and popped on every way out.  A pending return is
/// left for the enclosing function.
fn run_loop<F>(
    interpreter: &mut dyn Interpreter,
    body: &ArgStream,
    mut next_iteration: F,
) -> error::Result<CommandResult>
where
    F: FnMut(&mut dyn Interpreter) -> error::Result<bool>,
{
    let depth = interpreter.frames_mut().push(FrameKind::Loop);
    let outcome = run_iterations(interpreter, body, &mut next_iteration);
    let frames = interpreter.frames_mut();

    let _ = frames.consume(Unwind::Break);
    let _ = frames.consume(Unwind::Continue);
    frames.pop_to(depth);

    outcome
}

fn run_iterations<F>(
    interpreter: &mut dyn Interpreter,
    body: &ArgStream,
    next_iteration: &mut F,
) -> error::Result<CommandResult>
where
    F: FnMut(&mut dyn Interpreter) -> error::Result<bool>,
{
    while next_iteration(interpreter)? {
        if !interpreter.execute(body.clone()).is_success() {
            return Ok(CommandResult::Failure);
        }

        match interpreter.frames().pending() {
            Some(Unwind::Break) | Some(Unwind::Return) => break,
            Some(Unwind::Continue) => {
                let _ = interpreter.frames_mut().consume(Unwind::Continue);
            }
            None => {}
        }

        if interpreter.is_goodbye() {
            break;
        }
    }

    Ok(CommandResult::Success)
}

/// Parse a loop body once, it is replayed from clones of the stream.
fn loop_body(args: &mut ArgStream, purpose: &str) -> error::Result<ArgStream> {
    let (location, text) = args.require_block(purpose)?;

    Ok(ArgStream::new(tokenize_block(&location, &text)?))
}

/// `IF [-!] @cond THEN $[..]$ [ELSE $[..]$]`
///
/// When the condition holds the THEN command that follows runs its block and drops the ELSE
/// clause.  When it doesn't, the THEN clause is dropped here and the ELSE command runs.
#[derive(Default)]
struct IfCommand {
    base: CommandBase,
    invert: bool,
}

impl Command for IfCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.invert = false;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-!" => self.invert = !self.invert,
                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let name = args.next_tuple_name()?;
        let tuple = interpreter.require_tuple(&name)?;
        let value = tuple.borrow().value().clone();
        let condition = condition_value(interpreter, &value)? != self.invert;

        if condition {
            if !args.peek().is_some_and(|token| token.is_word(THEN)) {
                skip_clause(interpreter, &mut args, ELSE)?;
            }
        } else {
            skip_clause(interpreter, &mut args, THEN)?;
        }

        success(args)
    }
}

/// `THEN $[..]$ [ELSE $[..]$]`
#[derive(Default)]
struct ThenCommand;

impl Command for ThenCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let block = args.require_block(THEN)?;

        let (mut args, result) = run_block(interpreter, args, &block)?;

        if result.is_success() {
            skip_clause(interpreter, &mut args, ELSE)?;
        }

        Ok((args, result))
    }
}

/// `ELSE $[..]$`
#[derive(Default)]
struct ElseCommand;

impl Command for ElseCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let block = args.require_block(ELSE)?;

        run_block(interpreter, args, &block)
    }
}

/// Where a WHILE reads its condition from.
enum Condition {
    Named(String),
    Pop,
}

/// `WHILE @cond|~ $[..]$`
#[derive(Default)]
struct WhileCommand {
    base: CommandBase,
}

impl Command for WhileCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            self.base.dash_command(interpreter, &dash_command, &mut args)?;
        }

        self.base.check_dash_commands(interpreter)?;

        let condition = match args.next_arg()? {
            Token::Tuple(_, name) => {
                let _ = interpreter.require_tuple(&name)?;
                Condition::Named(name)
            }
            Token::Pop(_) => Condition::Pop,
            other => {
                return script_error(
                    interpreter,
                    format!("WHILE needs a tuple name or ~ as its condition, found {}.", other),
                )
            }
        };

        let body = loop_body(&mut args, "WHILE")?;

        let result = run_loop(interpreter, &body, |interpreter| {
            let value = match &condition {
                Condition::Named(name) => {
                    let tuple = interpreter.require_tuple(name)?;
                    tuple.borrow().value().clone()
                }
                Condition::Pop => interpreter.pop_value()?,
            };

            condition_value(interpreter, &value)
        })?;

        Ok((args, result))
    }
}

/// `DO [-undo] @iter [to] @limit $[..]$`
#[derive(Default)]
struct DoCommand {
    base: CommandBase,
    undo: bool,
}

impl Command for DoCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.undo = false;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-undo" => self.undo = true,
                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let iterator = args.next_tuple_name()?;
        let start = {
            let tuple = interpreter.require_tuple(&iterator)?;
            let value = tuple.borrow().value().clone();

            value.to_int(interpreter)?
        };

        let _ = args.skip_word("to");
        let limit = args.next_int(interpreter)?;
        let body = loop_body(&mut args, "DO")?;

        let undo = self.undo;
        let counter = Cell::new(start);

        let result = run_loop(interpreter, &body, |interpreter| {
            let current = counter.get();
            let more = if undo { current > limit } else { current < limit };

            if more {
                let _ = interpreter.set_tuple(&iterator, Value::Int(current));
                counter.set(if undo { current - 1 } else { current + 1 });
            }

            Ok(more)
        })?;

        Ok((args, result))
    }
}

/// `FOR @item in ~@source $[..]$`
#[derive(Default)]
struct ForCommand {
    base: CommandBase,
}

impl Command for ForCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            self.base.dash_command(interpreter, &dash_command, &mut args)?;
        }

        self.base.check_dash_commands(interpreter)?;

        let item = args.next_tuple_name()?;

        if !args.skip_word("in") {
            return script_error(interpreter, "FOR expects the word in after the item tuple.".to_string());
        }

        let source = args.next_resolving(interpreter)?.to_text();
        let words: Vec<String> = source.split_whitespace().map(str::to_string).collect();
        let body = loop_body(&mut args, "FOR")?;

        let mut remaining = words.into_iter();

        let result = run_loop(interpreter, &body, |interpreter| match remaining.next() {
            Some(word) => {
                let _ = interpreter.set_tuple(&item, Value::String(word));
                Ok(true)
            }
            None => Ok(false),
        })?;

        Ok((args, result))
    }
}

/// `SWITCH ~@selector [-case ~@value $[..]$]... [-default|-- $[..]$]`
#[derive(Default)]
struct SwitchCommand {
    base: CommandBase,
}

impl Command for SwitchCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let selector = args.next_string(interpreter)?;
        let mut chosen: Option<(SourceLocation, String)> = None;
        let mut default: Option<(SourceLocation, String)> = None;

        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-case" => {
                    let case = args.next_string(interpreter)?;
                    let block = args.require_block("-case")?;

                    if chosen.is_none() && case == selector {
                        chosen = Some(block);
                    }
                }

                "-default" | "--" => default = Some(args.require_block("-default")?),

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        match chosen.or(default) {
            Some(block) => run_block(interpreter, args, &block),
            None => success(args),
        }
    }
}

/// `TRY $[..]$ [CATCH $[..]$]`
#[derive(Default)]
struct TryCommand;

impl Command for TryCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let attempt = args.require_block("TRY")?;
        let handler = if args.skip_word(CATCH) {
            Some(args.require_block(CATCH)?)
        } else {
            None
        };

        let (args, result) = run_block(interpreter, args, &attempt)?;

        match (result, handler) {
            (CommandResult::Failure, Some(handler)) => run_block(interpreter, args, &handler),
            (result, _) => Ok((args, result)),
        }
    }
}

/// `THROW [~@message]`
#[derive(Default)]
struct ThrowCommand;

impl Command for ThrowCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let message = if args.has_more() {
            args.next_string(interpreter)?
        } else {
            "THROW".to_string()
        };

        script_error(interpreter, message)
    }
}

/// Request that the enclosing loop or function stops early.
fn request_unwind(
    interpreter: &mut dyn Interpreter,
    args: ArgStream,
    unwind: Unwind,
) -> error::Result<CommandOutcome> {
    interpreter.frames_mut().request(unwind)?;

    success(args)
}

/// `BREAK`
#[derive(Default)]
struct BreakCommand;

impl Command for BreakCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        request_unwind(interpreter, args, Unwind::Break)
    }
}

/// `CONTINUE`
#[derive(Default)]
struct ContinueCommand;

impl Command for ContinueCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        request_unwind(interpreter, args, Unwind::Continue)
    }
}

/// `RETURN`
#[derive(Default)]
struct ReturnCommand;

impl Command for ReturnCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        request_unwind(interpreter, args, Unwind::Return)
    }
}

/// `bye`
#[derive(Default)]
struct ByeCommand;

impl Command for ByeCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        _args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        interpreter.set_goodbye();

        success(ArgStream::empty())
    }
}

/// `\\ [-to datasink] ${ text }$`
struct CommentCommand {
    base: CommandBase,
}

impl Default for CommentCommand {
    fn default() -> Self {
        CommentCommand {
            base: CommandBase::with_destination(DataSink::Null),
        }
    }
}

impl Command for CommentCommand {
    fn reinit(&mut self) {
        self.base = CommandBase::with_destination(DataSink::Null);
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            self.base.dash_command(interpreter, &dash_command, &mut args)?;
        }

        self.base.check_dash_commands(interpreter)?;

        let comment = args.next_resolving(interpreter)?;
        self.base.put(interpreter, comment)?;

        success(args)
    }
}

pub fn register_control_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "IF",
        IfCommand,
        "Test a boolean tuple, running the THEN or the ELSE clause that follows.",
        "IF [-!] @cond THEN $[ .. ]$ [ELSE $[ .. ]$]"
    );

    add_command!(
        interpreter,
        "THEN",
        ThenCommand,
        "Run a block, then skip any ELSE clause.",
        "THEN $[ .. ]$"
    );

    add_command!(interpreter, "ELSE", ElseCommand, "Run a block.", "ELSE $[ .. ]$");

    add_command!(
        interpreter,
        "WHILE",
        WhileCommand,
        "Run a block while a named or popped condition is true.",
        "WHILE @cond|~ $[ .. ]$"
    );

    add_command!(
        interpreter,
        "DO",
        DoCommand,
        "Count a tuple up to, or with -undo down to, a limit running a block each step.",
        "DO [-undo] @iter [to] ~@limit $[ .. ]$"
    );

    add_command!(
        interpreter,
        "FOR",
        ForCommand,
        "Run a block once for each word of a value.",
        "FOR @item in ~@source $[ .. ]$"
    );

    add_command!(
        interpreter,
        "SWITCH",
        SwitchCommand,
        "Run the block of the first case equal to the selector, or the default.",
        "SWITCH ~@selector [-case ~@value $[ .. ]$]... [-default|-- $[ .. ]$]"
    );

    add_command!(
        interpreter,
        "TRY",
        TryCommand,
        "Run a block, running the CATCH block if it fails.",
        "TRY $[ .. ]$ [CATCH $[ .. ]$]"
    );

    add_command!(
        interpreter,
        "THROW",
        ThrowCommand,
        "Fail with a message.",
        "THROW [~@message]"
    );

    add_command!(interpreter, "BREAK", BreakCommand, "Leave the innermost loop.", "BREAK");

    add_command!(
        interpreter,
        "CONTINUE",
        ContinueCommand,
        "Go on to the next iteration of the innermost loop.",
        "CONTINUE"
    );

    add_command!(interpreter, "RETURN", ReturnCommand, "Leave the current function.", "RETURN");

    add_command!(interpreter, "bye", ByeCommand, "End the session.", "bye");

    add_command!(
        interpreter,
        "\\\\",
        CommentCommand,
        "A comment, the quotation is discarded unless sent somewhere with -to.",
        "\\\\ [-to datasink] ${ text }$"
    );
}
