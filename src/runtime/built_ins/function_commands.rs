use crate::{
    add_command,
    lang::{arg_stream::ArgStream, tokenizing::Token},
    runtime::{
        built_ins::command_support::{success, CommandBase},
        data_structures::{function_dictionary::Functor, value::Value},
        error::{self, script_error},
        interpreter::{Command, CommandOutcome, Interpreter},
    },
};
use std::rc::Rc;

/// Read a `( name ... )` parameter list and the body block that follows it.
fn parse_functor(interpreter: &dyn Interpreter, args: &mut ArgStream) -> error::Result<Functor> {
    let mut params = Vec::new();

    for token in args.next_param_list()? {
        match token {
            Token::Word(_, name) => params.push(name),
            other => {
                return script_error(interpreter, format!("{} is not a parameter name.", other));
            }
        }
    }

    let (_, block) = args.require_block("the function body")?;

    Ok(Functor::new(params, block))
}

/// Pull a functor out of a resolved value.
fn expect_functor(interpreter: &dyn Interpreter, value: &Value) -> error::Result<Rc<Functor>> {
    Ok(value.as_functor(interpreter)?.clone())
}

/// `FUNC [-list | -show name | -delete name] name ( params ) $[..]$`
#[derive(Default)]
struct FuncCommand {
    base: CommandBase,
}

impl Command for FuncCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let mut listed = false;

        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-list" => {
                    let listing = interpreter.functions().to_string();
                    self.base.put(interpreter, Value::String(listing))?;
                    listed = true;
                }

                "-show" => {
                    let name = args.next_word()?;
                    let Some(functor) = interpreter.functions().lookup(&name) else {
                        return script_error(interpreter, format!("Function {} is not defined.", name));
                    };

                    self.base.put(interpreter, Value::String(format!("{}{}", name, functor)))?;
                    listed = true;
                }

                "-delete" => {
                    let name = args.next_word()?;

                    if !interpreter.functions_mut().delete(&name) {
                        return script_error(interpreter, format!("Function {} is not defined.", name));
                    }

                    listed = true;
                }

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        if listed {
            return success(args);
        }

        let name = args.next_word()?;
        let functor = parse_functor(interpreter, &mut args)?;

        interpreter.functions_mut().define(&name, functor);
        success(args)
    }
}

/// `FUN ( params ) $[..]$`
#[derive(Default)]
struct FunCommand {
    base: CommandBase,
}

impl Command for FunCommand {
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

        let functor = parse_functor(interpreter, &mut args)?;
        self.base.put(interpreter, Value::Functor(Rc::new(functor)))?;

        success(args)
    }
}

/// `defun name ~@functor`
#[derive(Default)]
struct DefunCommand;

impl Command for DefunCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let name = args.next_word()?;
        let value = args.next_resolving(interpreter)?;
        let functor = expect_functor(interpreter, &value)?;

        interpreter.functions_mut().define(&name, (*functor).clone());
        success(args)
    }
}

/// `CALL ~@functor ( args )`
#[derive(Default)]
struct CallCommand;

impl Command for CallCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let location = args.location().unwrap_or_default();
        let value = args.next_resolving(interpreter)?;
        let functor = expect_functor(interpreter, &value)?;
        let actuals = args.next_param_list()?;

        let result = interpreter.invoke_functor("CALL", &location, functor, &actuals)?;

        Ok((args, result))
    }
}

/// `LOCAL @name [~@value]`
#[derive(Default)]
struct LocalCommand;

impl Command for LocalCommand {
    fn reinit(&mut self) {}

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        let name = args.next_tuple_name()?;
        let value = match args.peek() {
            Some(Token::Tuple(_, _)) | Some(Token::Pop(_)) | Some(Token::Quoted(_, _)) => {
                args.next_resolving(interpreter)?
            }
            _ => Value::None,
        };

        if interpreter.tuples_mut().declare_local(&name, value).is_none() {
            return script_error(interpreter, format!("LOCAL @{} outside of a function body.", name));
        }

        success(args)
    }
}

pub fn register_function_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "FUNC",
        FuncCommand,
        "Define, list, show or delete named functions.",
        "FUNC [-list | -show name | -delete name] name ( params ) $[ .. ]$"
    );

    add_command!(
        interpreter,
        "FUN",
        FunCommand,
        "Put an anonymous function.",
        "FUN [-to datasink] ( params ) $[ .. ]$"
    );

    add_command!(
        interpreter,
        "defun",
        DefunCommand,
        "Name a function value.",
        "defun name ~@functor"
    );

    add_command!(
        interpreter,
        "CALL",
        CallCommand,
        "Invoke a function value.",
        "CALL ~@functor ( args )"
    );

    add_command!(
        interpreter,
        "LOCAL",
        LocalCommand,
        "Declare a tuple local to the current function, optionally with a value.",
        "LOCAL @name [~@value]"
    );
}
