use crate::runtime::interpreter::Interpreter;

/// State and helpers shared by all commands.
pub mod command_support;

/// IF, loops, SWITCH, TRY and the unwinding commands.
pub mod control_commands;

/// Named and anonymous functions.
pub mod function_commands;

/// Dictionary images and constants.
pub mod dictionary_commands;

/// put, tuple and lifo.
pub mod tuple_commands;

/// string
pub mod string_commands;

/// eval
pub mod eval_commands;

/// Commands that work with the session itself.
pub mod session_commands;

/// Register every core command with an interpreter.
pub fn register_core_commands(interpreter: &mut dyn Interpreter) {
    control_commands::register_control_commands(interpreter);
    function_commands::register_function_commands(interpreter);
    dictionary_commands::register_dictionary_commands(interpreter);
    tuple_commands::register_tuple_commands(interpreter);
    string_commands::register_string_commands(interpreter);
    eval_commands::register_eval_commands(interpreter);
    session_commands::register_session_commands(interpreter);
}
