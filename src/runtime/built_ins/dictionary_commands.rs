use crate::{
    add_command,
    lang::arg_stream::ArgStream,
    runtime::{
        built_ins::command_support::{success, CommandBase},
        data_structures::{image::DictionaryImage, value::Value},
        error::{self, script_error},
        interpreter::{Command, CommandOutcome, Interpreter},
    },
};
use std::rc::Rc;
use tracing::debug;

/// What a `dict` invocation was asked to do.
#[derive(Clone, Copy, PartialEq, Eq)]
enum DictAction {
    List,
    Save,
    Restore,
    Merge,
    Peek,
}

/// Listing of a function and a constant dictionary together.
fn listing(functions: &impl ToString, constants: &impl ToString) -> String {
    format!("{}{}", functions.to_string(), constants.to_string())
}

/// `dict -list | -save | -restore | -merge | -peek [-from datasource] [-to datasink]`
#[derive(Default)]
struct DictCommand {
    base: CommandBase,
    action: Option<DictAction>,
}

impl DictCommand {
    /// Read an image from the source, the tuple stack when no `-from` was given.
    fn read_image(&self, interpreter: &mut dyn Interpreter) -> error::Result<DictionaryImage> {
        let value = match self.base.fetch(interpreter)? {
            Some(value) => value,
            None => interpreter.pop_value()?,
        };

        let image = match &value {
            Value::Bytes(bytes) => DictionaryImage::deserialize(bytes.as_slice())?,
            Value::String(text) => DictionaryImage::deserialize(text.as_bytes())?,
            other => {
                return script_error(
                    interpreter,
                    format!("A dictionary image can't be read from {} {}.", other.type_name(), other),
                );
            }
        };

        debug!(
            functions = image.functions.len(),
            constants = image.constants.len(),
            "read dictionary image"
        );

        Ok(image)
    }
}

impl Command for DictCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.action = None;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            let action = match dash_command.as_str() {
                "-list" => DictAction::List,
                "-save" => DictAction::Save,
                "-restore" => DictAction::Restore,
                "-merge" => DictAction::Merge,
                "-peek" => DictAction::Peek,
                _ => {
                    self.base.dash_command(interpreter, &dash_command, &mut args)?;
                    continue;
                }
            };

            if self.action.is_some_and(|existing| existing != action) {
                return script_error(interpreter, format!("dict: {} conflicts with an earlier action.", dash_command));
            }

            self.action = Some(action);
        }

        self.base.check_dash_commands(interpreter)?;

        match self.action.unwrap_or(DictAction::List) {
            DictAction::List => {
                let text = listing(interpreter.functions(), interpreter.constants());
                self.base.put(interpreter, Value::String(text))?;
            }

            DictAction::Save => {
                let bytes = DictionaryImage::serialize(interpreter.functions(), interpreter.constants())?;
                self.base.put(interpreter, Value::Bytes(Rc::new(bytes)))?;
            }

            DictAction::Restore => {
                let image = self.read_image(interpreter)?;

                interpreter.functions_mut().replace(image.functions);
                interpreter.constants_mut().replace(image.constants);
            }

            DictAction::Merge => {
                let image = self.read_image(interpreter)?;

                interpreter.functions_mut().merge(image.functions);
                interpreter.constants_mut().merge(image.constants);
            }

            DictAction::Peek => {
                let image = self.read_image(interpreter)?;
                let text = listing(&image.functions, &image.constants);

                self.base.put(interpreter, Value::String(text))?;
            }
        }

        success(args)
    }
}

/// `const -create *name ~@value | -list`
#[derive(Default)]
struct ConstCommand {
    base: CommandBase,
}

impl Command for ConstCommand {
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
                "-create" => {
                    let name = args.next_word()?;
                    let value = args.next_resolving(interpreter)?.to_text();

                    interpreter
                        .constants_mut()
                        .define(&name, value)
                        .map_err(|err| {
                            err.with_context(interpreter.current_location(), interpreter.call_stack())
                        })?;
                }

                "-list" => {
                    let text = interpreter.constants().to_string();
                    self.base.put(interpreter, Value::String(text))?;
                }

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;
        success(args)
    }
}

pub fn register_dictionary_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "dict",
        DictCommand,
        "List, save, restore, merge or peek at function and constant dictionary images.",
        "dict -list | -save | -restore | -merge | -peek [-from datasource] [-to datasink]"
    );

    add_command!(
        interpreter,
        "const",
        ConstCommand,
        "Create or list constants.",
        "const -create *name ~@value | -list"
    );
}
