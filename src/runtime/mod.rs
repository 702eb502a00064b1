/// All of the core data structures used by the interpreter.
pub mod data_structures;

/// The built-in commands.
pub mod built_ins;

/// Error reporting for scripts and the interpreter.
pub mod error;

/// The interpreter traits and the session that implements them.
#[macro_use]
pub mod interpreter;
