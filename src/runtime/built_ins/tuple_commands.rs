use crate::{
    add_command,
    lang::arg_stream::ArgStream,
    runtime::{
        built_ins::command_support::{success, CommandBase},
        data_structures::value::{ToValue, Value},
        error::{self, script_error},
        interpreter::{Command, CommandOutcome, Interpreter},
    },
};

/// `put [-n] [-s] [-# ~@number] [-from datasource] [-to datasink] [~@value]`
#[derive(Default)]
struct PutCommand {
    base: CommandBase,
    no_newline: bool,
    space: bool,
    number: Option<i64>,
}

impl Command for PutCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.no_newline = false;
        self.space = false;
        self.number = None;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-n" => self.no_newline = true,
                "-s" => self.space = true,
                "-#" => self.number = Some(args.next_int(interpreter)?),
                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let value = match (self.number, self.base.fetch(interpreter)?) {
            (Some(number), _) => Value::Int(number),
            (None, Some(value)) => value,
            (None, None) => args.next_resolving(interpreter)?,
        };

        self.base
            .put_formatted(interpreter, value, !self.no_newline, self.space)?;

        success(args)
    }
}

/// `tuple -assign @t ~@v | -delete @t | -exists @t | -null @t | -true @t | -false @t |
/// -value ~@t | -type ~@t | -typename ~@t | -map`
#[derive(Default)]
struct TupleCommand {
    base: CommandBase,
}

impl Command for TupleCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-assign" => {
                    let target = args.next_tuple_name()?;
                    let value = args.next_resolving(interpreter)?;

                    let _ = interpreter.set_tuple(&target, value);
                }

                "-delete" => {
                    let name = args.next_tuple_name()?;

                    if !interpreter.tuples_mut().delete(&name) {
                        return script_error(interpreter, format!("Tuple @{} does not exist.", name));
                    }
                }

                "-exists" => {
                    let name = args.next_tuple_name()?;
                    let exists = interpreter.find_tuple(&name).is_some();

                    self.base.put(interpreter, Value::Bool(exists))?;
                }

                "-null" => {
                    let name = args.next_tuple_name()?;
                    let _ = interpreter.set_tuple(&name, Value::None);
                }

                "-true" => {
                    let name = args.next_tuple_name()?;
                    let _ = interpreter.set_tuple(&name, Value::Bool(true));
                }

                "-false" => {
                    let name = args.next_tuple_name()?;
                    let _ = interpreter.set_tuple(&name, Value::Bool(false));
                }

                "-value" => {
                    let value = args.next_resolving(interpreter)?;
                    self.base.put(interpreter, value)?;
                }

                "-type" | "-typename" => {
                    let value = args.next_resolving(interpreter)?;
                    self.base.put(interpreter, value.type_name().to_value())?;
                }

                "-map" => {
                    let text = interpreter.tuples().to_string();
                    self.base.put(interpreter, Value::String(text))?;
                }

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;
        success(args)
    }
}

/// Text form of the stack, top first.
fn show_stack(interpreter: &dyn Interpreter) -> String {
    let stack = interpreter.tuples().stack();

    if stack.is_empty() {
        return "(empty)".to_string();
    }

    let values: Vec<String> = stack
        .iter()
        .rev()
        .map(|tuple| tuple.borrow().value().to_string())
        .collect();

    format!("top <== {}", values.join(" "))
}

/// `lifo -push @t | -pop @t | -popval | -dup | -swap | -over | -pick n | -rot | -depth |
/// -clear | -drop | -show`
#[derive(Default)]
struct LifoCommand {
    base: CommandBase,
}

impl LifoCommand {
    /// Copy the value at the given depth to the top in a fresh tuple.
    fn copy_to_top(interpreter: &mut dyn Interpreter, index: usize) -> error::Result<()> {
        let value = match interpreter.tuples().peek(index) {
            Some(tuple) => tuple.borrow().value().clone(),
            None => {
                return script_error(
                    interpreter,
                    format!(
                        "Index {} out of range of tuple stack depth {}.",
                        index,
                        interpreter.tuples().depth()
                    ),
                );
            }
        };

        interpreter.push(value);
        Ok(())
    }

    /// Move the tuple at the given depth to the top.
    fn move_to_top(interpreter: &mut dyn Interpreter, index: usize) -> error::Result<()> {
        let tuple = interpreter
            .tuples_mut()
            .remove(index)
            .map_err(|err| err.with_context(interpreter.current_location(), interpreter.call_stack()))?;

        interpreter.push_tuple(tuple);
        Ok(())
    }
}

impl Command for LifoCommand {
    fn reinit(&mut self) {
        self.base.reinit();
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "-push" => {
                    let name = args.next_tuple_name()?;
                    let tuple = interpreter.require_tuple(&name)?;

                    interpreter.push_tuple(tuple);
                }

                "-pop" => {
                    let name = args.next_tuple_name()?;
                    let value = interpreter.pop_value()?;

                    let _ = interpreter.set_tuple(&name, value);
                }

                "-popval" => {
                    let value = interpreter.pop_value()?;
                    self.base.put(interpreter, value)?;
                }

                "-dup" => LifoCommand::copy_to_top(interpreter, 0)?,
                "-over" => LifoCommand::copy_to_top(interpreter, 1)?,
                "-swap" => LifoCommand::move_to_top(interpreter, 1)?,
                "-rot" => LifoCommand::move_to_top(interpreter, 2)?,

                "-pick" => {
                    let index = args.next_int(interpreter)?;

                    match usize::try_from(index) {
                        Ok(index) => LifoCommand::copy_to_top(interpreter, index)?,
                        Err(_) => {
                            return script_error(interpreter, format!("Can't pick negative index {}.", index));
                        }
                    }
                }

                "-depth" => {
                    let depth = interpreter.tuples().depth();
                    self.base.put(interpreter, depth.to_value())?;
                }

                "-clear" => interpreter.tuples_mut().clear(),

                "-drop" => {
                    let _ = interpreter.pop()?;
                }

                "-show" => {
                    let text = show_stack(interpreter);
                    self.base.put(interpreter, Value::String(text))?;
                }

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;
        success(args)
    }
}

pub fn register_tuple_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "put",
        PutCommand,
        "Put a value to the stack, a tuple, the output or a file.",
        "put [-n] [-s] [-# ~@number] [-from datasource] [-to datasink] [~@value]"
    );

    add_command!(
        interpreter,
        "tuple",
        TupleCommand,
        "Assign, delete, test and inspect named tuples.",
        "tuple -assign @t ~@v | -delete @t | -exists @t | -null @t | -true @t | -false @t | \
         -value ~@t | -type ~@t | -typename ~@t | -map"
    );

    add_command!(
        interpreter,
        "lifo",
        LifoCommand,
        "Manipulate the tuple stack.",
        "lifo -push @t | -pop @t | -popval | -dup | -swap | -over | -pick n | -rot | -depth | \
         -clear | -drop | -show"
    );
}
