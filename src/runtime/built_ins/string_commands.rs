use std::rc::Rc;

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

/// The operation a `string` invocation performs, the last one named wins.
#[derive(Default)]
enum Operation {
    /// The operand itself.
    #[default]
    Identity,
    Blank,
    Blanks(i64),
    Cat(String),
    Eq(String),
    Len,
    New,
    Newline,
    Replace(String, String),
    ReplaceFirst(String, String),
    StartsWith(String),
    Substring(i64, i64),
    Trim,
    Upper,
    Lower,
    ToBytes,
    FromBytes(Rc<Vec<u8>>),
}

/// `string [-to datasink] [-- ~@s] -bl ~@s | -bls ~@s ~@n | -cat ~@a ~@b | -eq ~@a ~@b |
/// -len ~@s | -new | -nl ~@s | -repl ~@s ~@target ~@replacement | -repl1 ... |
/// -startswith ~@s ~@prefix | -substr ~@s ~@begin ~@end | -trim ~@s | -upper ~@s |
/// -lower ~@s | -tobytes ~@s | -frombytes ~@bytes`
///
/// An operand given with `--` takes the place of the first operand of the operation.
#[derive(Default)]
struct StringCommand {
    base: CommandBase,
    operand: Option<String>,
    operation: Operation,
}

impl StringCommand {
    /// The operand named by `--`, or else the next argument's text.
    fn operand(&mut self, interpreter: &mut dyn Interpreter, args: &mut ArgStream) -> error::Result<()> {
        if self.operand.is_none() {
            self.operand = Some(next_text(interpreter, args)?);
        }

        Ok(())
    }

    fn evaluate(&mut self, interpreter: &mut dyn Interpreter) -> error::Result<Value> {
        let operation = std::mem::take(&mut self.operation);

        let text = match (&operation, self.operand.take()) {
            (Operation::New, _) => return Ok(Value::String(String::new())),
            (Operation::FromBytes(bytes), _) => {
                return match String::from_utf8(bytes.as_ref().clone()) {
                    Ok(text) => Ok(Value::String(text)),
                    Err(_) => script_error(interpreter, "Bytes are not valid UTF-8 text.".to_string()),
                };
            }
            (_, Some(text)) => text,
            (_, None) => return script_error(interpreter, "No string to operate on.".to_string()),
        };

        let value = match operation {
            Operation::Blank => Value::String(text + " "),
            Operation::Blanks(count) => {
                let count = usize::try_from(count).unwrap_or(0);
                Value::String(text + &" ".repeat(count))
            }
            Operation::Cat(right) => Value::String(text + &right),
            Operation::Eq(right) => Value::Bool(text == right),
            Operation::Len => (text.chars().count() as i64).to_value(),
            Operation::Newline => Value::String(text + "\n"),
            Operation::Replace(target, replacement) => Value::String(text.replace(&target, &replacement)),
            Operation::ReplaceFirst(target, replacement) => {
                Value::String(text.replacen(&target, &replacement, 1))
            }
            Operation::StartsWith(prefix) => Value::Bool(text.starts_with(&prefix)),
            Operation::Substring(begin, end) => Value::String(substring(interpreter, &text, begin, end)?),
            Operation::Trim => Value::String(text.trim().to_string()),
            Operation::Upper => Value::String(text.to_uppercase()),
            Operation::Lower => Value::String(text.to_lowercase()),
            Operation::ToBytes => Value::Bytes(Rc::new(text.into_bytes())),
            Operation::Identity | Operation::New | Operation::FromBytes(_) => Value::String(text),
        };

        Ok(value)
    }
}

/// Resolve the next argument to its text, leaving whitespace alone.
fn next_text(interpreter: &mut dyn Interpreter, args: &mut ArgStream) -> error::Result<String> {
    Ok(args.next_resolving(interpreter)?.to_text())
}

/// Characters `begin` up to but not including `end`.
fn substring(interpreter: &dyn Interpreter, text: &str, begin: i64, end: i64) -> error::Result<String> {
    let length = text.chars().count();

    match (usize::try_from(begin), usize::try_from(end)) {
        (Ok(begin), Ok(end)) if begin <= end && end <= length => {
            Ok(text.chars().skip(begin).take(end - begin).collect())
        }
        _ => script_error(
            interpreter,
            format!("Substring {} to {} is out of range of a {} character string.", begin, end, length),
        ),
    }
}

impl Command for StringCommand {
    fn reinit(&mut self) {
        self.base.reinit();
        self.operand = None;
        self.operation = Operation::Identity;
    }

    fn execute(
        &mut self,
        interpreter: &mut dyn Interpreter,
        mut args: ArgStream,
    ) -> error::Result<CommandOutcome> {
        while let Some(dash_command) = args.parse_dash_command() {
            match dash_command.as_str() {
                "--" | "-string" => self.operand = Some(next_text(interpreter, &mut args)?),

                "-bl" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Blank;
                }

                "-bls" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Blanks(args.next_int(interpreter)?);
                }

                "-cat" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Cat(next_text(interpreter, &mut args)?);
                }

                "-eq" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Eq(next_text(interpreter, &mut args)?);
                }

                "-len" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Len;
                }

                "-new" => self.operation = Operation::New,

                "-nl" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Newline;
                }

                "-repl" | "-repl1" => {
                    self.operand(interpreter, &mut args)?;

                    let target = next_text(interpreter, &mut args)?;
                    let replacement = next_text(interpreter, &mut args)?;

                    self.operation = if dash_command == "-repl" {
                        Operation::Replace(target, replacement)
                    } else {
                        Operation::ReplaceFirst(target, replacement)
                    };
                }

                "-startswith" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::StartsWith(next_text(interpreter, &mut args)?);
                }

                "-substr" => {
                    self.operand(interpreter, &mut args)?;

                    let begin = args.next_int(interpreter)?;
                    let end = args.next_int(interpreter)?;

                    self.operation = Operation::Substring(begin, end);
                }

                "-trim" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Trim;
                }

                "-upper" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Upper;
                }

                "-lower" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::Lower;
                }

                "-tobytes" => {
                    self.operand(interpreter, &mut args)?;
                    self.operation = Operation::ToBytes;
                }

                "-frombytes" => {
                    let tuple = args.next_tuple_or_pop(interpreter)?;
                    let bytes = tuple.borrow().value().as_bytes(interpreter)?.clone();

                    self.operation = Operation::FromBytes(bytes);
                }

                _ => self.base.dash_command(interpreter, &dash_command, &mut args)?,
            }
        }

        self.base.check_dash_commands(interpreter)?;

        let value = self.evaluate(interpreter)?;
        self.base.put(interpreter, value)?;

        success(args)
    }
}

pub fn register_string_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "string",
        StringCommand,
        "Build, compare and take apart strings.",
        "string [-to datasink] [-- ~@s] -bl ~@s | -bls ~@s ~@n | -cat ~@a ~@b | -eq ~@a ~@b | \
         -len ~@s | -new | -nl ~@s | -repl ~@s ~@target ~@replacement | -repl1 ... | \
         -startswith ~@s ~@prefix | -substr ~@s ~@begin ~@end | -trim ~@s | -upper ~@s | \
         -lower ~@s | -tobytes ~@s | -frombytes ~@bytes"
    );
}
