/// The Value enumeration, everything a tuple can hold.
pub mod value;

/// Hold the ContextualData trait, used for managing contexts in the interpreter.
pub mod contextual_data;

/// Named tuples and the tuple stack.
pub mod tuple_store;

/// Loop and function frames and the unwind requests that travel through them.
pub mod frame_stack;

/// User defined functions and constants.
pub mod function_dictionary;

/// Saving and loading function and constant dictionaries.
pub mod image;

/// Where command results go and where command input comes from.
pub mod data_sink;

/// The registry of built-in commands.
pub mod command_registry;
