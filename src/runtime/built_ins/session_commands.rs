use crate::{
    add_command,
    lang::arg_stream::ArgStream,
    runtime::{
        built_ins::command_support::{success, CommandBase},
        data_structures::value::Value,
        error::{self, script_error},
        interpreter::{Command, CommandOutcome, Interpreter},
    },
};
use tracing::debug;

/// `include [-s] ~@path`
#[derive(Default)]
struct IncludeCommand {
    base: CommandBase,
    silent: bool,
}

impl Command for IncludeCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.silent = false;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-s" => self.silent = true,
                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let path = args.next_string(interpreter)?;
        let echo = interpreter.echo_includes();

        debug!(path = %path, "include");

        if self.silent {
            interpreter.set_echo_includes(false);
        }

        let result = interpreter.process_source_file(&path);

        interpreter.set_echo_includes(echo);

        Ok((args, result?))
    }
}

/// `usage [-cmd name]` and `help`
#[derive(Default)]
struct UsageCommand {
    base: CommandBase,
    command: Option<String>,
}

impl Command for UsageCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.command = None;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-cmd" => self.command = Some(args.next_word()?),
                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let text = match &self.command {
            None => interpreter.commands().to_string(),

            Some(name) => match interpreter.find_command(name) {
                Some(info) => format!("{}\n    {}", info.signature, info.description),
                None => return script_error(interpreter, format!("Command \"{}\" not found.", name)),
            },
        };

        self.base.put(interpreter, Value::String(text))?;
        success(args)
    }
}

pub fn register_session_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "include",
        IncludeCommand,
        "Run a script file line by line, -s keeps it from being echoed.",
        "include [-s] ~@path"
    );

    add_command!(
        interpreter,
        "usage",
        UsageCommand,
        "Put the command listing, or the usage of one command.",
        "usage [-cmd name] [-to datasink]"
    );

    add_command!(
        interpreter,
        "help",
        UsageCommand,
        "Put the command listing, or the usage of one command.",
        "help [-cmd name] [-to datasink]"
    );
}
