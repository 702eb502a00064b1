/// Module for the managing source code, tokens, and the argument stream.
#[macro_use]
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as the
/// interpreter itself.
#[macro_use]
pub mod runtime;

/// Configuration file loading.
pub mod config;
