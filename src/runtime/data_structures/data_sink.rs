use crate::lang::tokenizing::Token;
use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

/// Names the standard output stream as a destination or source.
pub const STD_DEVICE: &str = "STD:";

/// Names the discarding sink.
pub const NULL_DEVICE: &str = "NULL:";

/// Where a command sends its result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DataSink {
    /// Push onto the tuple stack.  What every command does unless told otherwise.
    #[default]
    Push,

    /// Assign to a named tuple, creating it if needed.
    Tuple(String),

    /// Print on the session's output.
    Std,

    /// Throw the result away.
    Null,

    /// Write to a file.
    File(PathBuf),
}

impl Display for DataSink {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DataSink::Push => write!(f, "~"),
            DataSink::Tuple(name) => write!(f, "@{}", name),
            DataSink::Std => write!(f, "{}", STD_DEVICE),
            DataSink::Null => write!(f, "{}", NULL_DEVICE),
            DataSink::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl DataSink {
    /// Interpret the argument following a `-to` switch.
    pub fn from_token(token: &Token) -> Option<DataSink> {
        match token {
            Token::Pop(_) => Some(DataSink::Push),
            Token::Tuple(_, name) => Some(DataSink::Tuple(name.clone())),
            Token::Word(_, word) if word == STD_DEVICE => Some(DataSink::Std),
            Token::Word(_, word) if word == NULL_DEVICE => Some(DataSink::Null),
            Token::Word(_, path) | Token::Quoted(_, path) => Some(DataSink::File(path.into())),
            Token::Block(_, _) => None,
        }
    }
}

/// Where a command reads its input from when given a `-from` switch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    /// Pop the tuple stack.
    Pop,

    /// Read a named tuple, which must exist.
    Tuple(String),

    /// Read a whole file.
    File(PathBuf),
}

impl DataSource {
    /// Interpret the argument following a `-from` switch.
    pub fn from_token(token: &Token) -> Option<DataSource> {
        match token {
            Token::Pop(_) => Some(DataSource::Pop),
            Token::Tuple(_, name) => Some(DataSource::Tuple(name.clone())),
            Token::Word(_, path) | Token::Quoted(_, path) => Some(DataSource::File(path.into())),
            Token::Block(_, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::source_buffer::SourceLocation;

    #[test]
    fn devices_are_recognized_by_name() {
        let here = SourceLocation::new();

        assert_eq!(DataSink::from_token(&Token::Word(here.clone(), "STD:".into())), Some(DataSink::Std));
        assert_eq!(DataSink::from_token(&Token::Word(here.clone(), "NULL:".into())), Some(DataSink::Null));
        assert_eq!(DataSink::from_token(&Token::Pop(here.clone())), Some(DataSink::Push));
        assert_eq!(
            DataSink::from_token(&Token::Quoted(here.clone(), "out.img".into())),
            Some(DataSink::File("out.img".into()))
        );
        assert_eq!(DataSink::from_token(&Token::Block(here, "x".into())), None);
    }
}
