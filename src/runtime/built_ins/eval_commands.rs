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
use std::cmp::Ordering;

/// Coerce an operand to a number or fail naming the operator.
fn number(interpreter: &dyn Interpreter, op: &str, value: &Value) -> error::Result<Value> {
    match value.to_number() {
        Some(number) => Ok(number),
        None => script_error(
            interpreter,
            format!("{} needs numbers, found {} {}.", op, value.type_name(), value),
        ),
    }
}

/// `+ - * / % max min` on integers, or on floats when either side is one.
fn arithmetic(interpreter: &dyn Interpreter, op: &str, a: &Value, b: &Value) -> error::Result<Value> {
    let a = number(interpreter, op, a)?;
    let b = number(interpreter, op, b)?;

    if Value::either_is_float(&a, &b) {
        let x = a.to_float(interpreter)?;
        let y = b.to_float(interpreter)?;

        if (op == "/" || op == "%") && y == 0.0 {
            return script_error(interpreter, format!("Division by zero in {}.", op));
        }

        let result = match op {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            "/" => x / y,
            "%" => x % y,
            "max" => x.max(y),
            _ => x.min(y),
        };

        return Ok(Value::Float(result));
    }

    let x = a.to_int(interpreter)?;
    let y = b.to_int(interpreter)?;

    let result = match op {
        "+" => x.checked_add(y),
        "-" => x.checked_sub(y),
        "*" => x.checked_mul(y),
        "/" | "%" if y == 0 => {
            return script_error(interpreter, format!("Division by zero in {}.", op));
        }
        "/" => x.checked_div(y),
        "%" => x.checked_rem(y),
        "max" => Some(x.max(y)),
        _ => Some(x.min(y)),
    };

    match result {
        Some(result) => Ok(Value::Int(result)),
        None => script_error(interpreter, format!("Integer overflow in {} {} {}.", x, op, y)),
    }
}

/// `<< >> & | ^` on integers only.
fn bitwise(interpreter: &dyn Interpreter, op: &str, a: &Value, b: &Value) -> error::Result<Value> {
    let x = a.to_int(interpreter)?;
    let y = b.to_int(interpreter)?;

    let result = match op {
        "<<" | ">>" => {
            let Ok(shift) = u32::try_from(y) else {
                return script_error(interpreter, format!("Bad shift amount {}.", y));
            };

            let shifted = if op == "<<" { x.checked_shl(shift) } else { x.checked_shr(shift) };

            match shifted {
                Some(result) => result,
                None => return script_error(interpreter, format!("Bad shift amount {}.", y)),
            }
        }
        "&" => x & y,
        "|" => x | y,
        _ => x ^ y,
    };

    Ok(Value::Int(result))
}

/// Compare numerically when both sides are numbers, otherwise as trimmed text.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.to_number(), b.to_number()) {
        (Some(Value::Int(x)), Some(Value::Int(y))) => Some(x.cmp(&y)),
        (Some(x), Some(y)) => {
            let x = match x {
                Value::Int(value) => value as f64,
                Value::Float(value) => value,
                _ => return None,
            };
            let y = match y {
                Value::Int(value) => value as f64,
                Value::Float(value) => value,
                _ => return None,
            };

            x.partial_cmp(&y)
        }
        _ => Some(a.to_text().trim().cmp(b.to_text().trim())),
    }
}

/// Work out the result of a binary operator.
fn evaluate(interpreter: &dyn Interpreter, op: &str, a: &Value, b: &Value) -> error::Result<Value> {
    match op {
        "+" | "-" | "*" | "/" | "%" | "max" | "min" => arithmetic(interpreter, op, a, b),
        "<<" | ">>" | "&" | "|" | "^" => bitwise(interpreter, op, a, b),

        "&&" => Ok(Value::Bool(a.to_bool(interpreter)? && b.to_bool(interpreter)?)),
        "||" => Ok(Value::Bool(a.to_bool(interpreter)? || b.to_bool(interpreter)?)),

        "==" | "!=" | "<" | ">" | "<=" | ">=" => {
            let ordering = compare(a, b);

            let result = match op {
                "==" => ordering == Some(Ordering::Equal),
                "!=" => ordering != Some(Ordering::Equal),
                "<" => ordering == Some(Ordering::Less),
                ">" => ordering == Some(Ordering::Greater),
                "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            };

            Ok(Value::Bool(result))
        }

        _ => script_error(interpreter, format!("Unknown operator {}.", op)),
    }
}

/// `eval [-to datasink] op ~@a [~@b]`
#[derive(Default)]
struct EvalCommand {
    base: CommandBase,
}

impl Command for EvalCommand {
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

        let op = args.next_word()?;

        let result = if op == "!" {
            let value = args.next_resolving(interpreter)?;
            Value::Bool(!value.to_bool(interpreter)?)
        } else {
            let a = args.next_resolving(interpreter)?;
            let b = args.next_resolving(interpreter)?;

            evaluate(interpreter, &op, &a, &b)?
        };

        self.base.put(interpreter, result)?;
        success(args)
    }
}

pub fn register_eval_commands(interpreter: &mut dyn Interpreter) {
    add_command!(
        interpreter,
        "eval",
        EvalCommand,
        "Evaluate an arithmetic, bitwise, logical or comparison operator.",
        "eval [-to datasink] op ~@a [~@b]"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_fall_back_to_text() {
        assert_eq!(compare(&Value::from("10"), &Value::Int(9)), Some(Ordering::Greater));
        assert_eq!(compare(&Value::from(" abc "), &Value::from("abc")), Some(Ordering::Equal));
        assert_eq!(compare(&Value::from("abc"), &Value::from("abd")), Some(Ordering::Less));
        assert_eq!(compare(&Value::Float(1.5), &Value::Int(1)), Some(Ordering::Greater));
    }
}
