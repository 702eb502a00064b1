use crate::{
    lang::{arg_stream::ArgStream, source_buffer::SourceLocation, tokenizing::Token},
    runtime::{
        data_structures::{
            data_sink::{DataSink, DataSource},
            value::Value,
        },
        error::{self, script_error},
        interpreter::{CommandOutcome, CommandResult, Interpreter},
    },
};
use std::{fs, rc::Rc};
use tracing::warn;

/// The per-invocation state every command shares: where the result goes, where the input comes
/// from, and any switches the command didn't understand.
#[derive(Default)]
pub struct CommandBase {
    destination: DataSink,
    source: Option<DataSource>,
    unknown_dash_commands: Vec<String>,
}

impl CommandBase {
    /// Back to defaults: results are pushed and there is no source.
    pub fn reinit(&mut self) {
        *self = CommandBase::default();
    }

    /// Start from a destination other than the stack.
    pub fn with_destination(destination: DataSink) -> CommandBase {
        CommandBase {
            destination,
            ..CommandBase::default()
        }
    }

    /// Where the result goes.
    pub fn destination(&self) -> &DataSink {
        &self.destination
    }

    /// Where input comes from, if a `-from` was given.
    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    /// Handle a switch the command itself doesn't know.  `-to` and `-from` are understood here,
    /// anything else is remembered and fails the command in `check_dash_commands`.
    pub fn dash_command(
        &mut self,
        interpreter: &dyn Interpreter,
        dash_command: &str,
        args: &mut ArgStream,
    ) -> error::Result<()> {
        match dash_command {
            "-to" => {
                let token = args.next_arg()?;

                match DataSink::from_token(&token) {
                    Some(destination) => self.destination = destination,
                    None => return bad_device(interpreter, "destination", &token),
                }
            }

            "-from" => {
                let token = args.next_arg()?;

                match DataSource::from_token(&token) {
                    Some(source) => self.source = Some(source),
                    None => return bad_device(interpreter, "source", &token),
                }
            }

            _ => {
                warn!(dash_command, "unknown dash-command");
                self.unknown_dash_commands.push(dash_command.to_string());
            }
        }

        Ok(())
    }

    /// Fail if any unknown switch was seen.  Called once switch scanning is done.
    pub fn check_dash_commands(&self, interpreter: &dyn Interpreter) -> error::Result<()> {
        if self.unknown_dash_commands.is_empty() {
            return Ok(());
        }

        let command = interpreter
            .call_stack()
            .last()
            .map(|item| item.name().clone())
            .unwrap_or_default();

        script_error(
            interpreter,
            format!(
                "Unknown dash-command {} in {}",
                self.unknown_dash_commands.join(" "),
                command
            ),
        )
    }

    /// Send a value to the destination.
    pub fn put(&self, interpreter: &mut dyn Interpreter, value: Value) -> error::Result<()> {
        self.put_formatted(interpreter, value, true, false)
    }

    /// Send a value to the destination.  The newline and trailing space only matter when printing.
    pub fn put_formatted(
        &self,
        interpreter: &mut dyn Interpreter,
        value: Value,
        newline: bool,
        space: bool,
    ) -> error::Result<()> {
        match &self.destination {
            DataSink::Push => interpreter.push(value),

            DataSink::Tuple(name) => {
                let _ = interpreter.set_tuple(name, value);
            }

            DataSink::Std => {
                let mut text = value.to_text();

                if space {
                    text.push(' ');
                }

                if newline {
                    text.push('\n');
                }

                let output = interpreter.output();
                output.write_all(text.as_bytes())?;
                output.flush()?;
            }

            DataSink::Null => {}

            DataSink::File(path) => match value {
                Value::Bytes(bytes) => fs::write(path, bytes.as_slice())?,
                other => fs::write(path, other.to_text())?,
            },
        }

        Ok(())
    }

    /// Read the `-from` source, if one was given.  Files are found through the search paths and
    /// come back as text when they hold valid UTF-8, as bytes otherwise.
    pub fn fetch(&self, interpreter: &mut dyn Interpreter) -> error::Result<Option<Value>> {
        let value = match &self.source {
            None => return Ok(None),

            Some(DataSource::Pop) => interpreter.pop_value()?,

            Some(DataSource::Tuple(name)) => {
                let tuple = interpreter.require_tuple(name)?;
                tuple.borrow().value().clone()
            }

            Some(DataSource::File(path)) => {
                let full_path = interpreter.find_file(&path.to_string_lossy())?;
                let bytes = fs::read(full_path)?;

                match String::from_utf8(bytes) {
                    Ok(text) => Value::String(text),
                    Err(err) => Value::Bytes(Rc::new(err.into_bytes())),
                }
            }
        };

        Ok(Some(value))
    }
}

fn bad_device<T>(interpreter: &dyn Interpreter, role: &str, token: &Token) -> error::Result<T> {
    script_error(interpreter, format!("{} can't be used as a {}.", token, role))
}

/// Execute a block's text and pass the remaining stream back with the block's result.
pub fn run_block(
    interpreter: &mut dyn Interpreter,
    args: ArgStream,
    block: &(SourceLocation, String),
) -> error::Result<CommandOutcome> {
    let result = interpreter.execute_block(&block.0, &block.1)?;

    Ok((args, result))
}

/// A command that finished without producing anything.
pub fn success(args: ArgStream) -> error::Result<CommandOutcome> {
    Ok((args, CommandResult::Success))
}
