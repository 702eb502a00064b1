/// Module for managing the original source code and locations within it.
#[macro_use]
pub mod source_buffer;

/// Module for turning script text into lines of tokens.
pub mod tokenizing;

/// The argument stream commands consume their arguments from.
pub mod arg_stream;
