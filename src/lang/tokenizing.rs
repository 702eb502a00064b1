use crate::{
    lang::source_buffer::{SourceBuffer, SourceLocation},
    runtime::error::{self, ErrorKind, ScriptError},
};
use std::{
    fmt::{self, Debug, Display, Formatter},
    fs::read_to_string,
};

/// Opens a quoted literal.
pub const OPEN_QUOTE: &str = "${";

/// Closes a quoted literal.
pub const CLOSE_QUOTE: &str = "}$";

/// Opens a block of deferred script text.
pub const OPEN_BLOCK: &str = "$[";

/// Closes a block of deferred script text.
pub const CLOSE_BLOCK: &str = "]$";

/// The anonymous pop sentinel.
pub const POP_MARKER: &str = "~";

/// Prefix of a tuple name reference.
pub const TUPLE_PREFIX: char = '@';

/// A token is one argument in an argument stream.  Each one remembers where in the script text
/// it was found.
#[derive(Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare literal.  Command names, dash-commands, numbers and constant names are all words
    /// until a command decides what to make of them.
    Word(SourceLocation, String),

    /// The text of a `${ ... }$` quotation, trimmed.
    Quoted(SourceLocation, String),

    /// A reference to a tuple by name, stored without the leading `@`.
    Tuple(SourceLocation, String),

    /// The `~` sentinel: take the value from the top of the tuple stack.
    Pop(SourceLocation),

    /// The unparsed text of a `$[ ... ]$` block.  The location is where the body text starts so
    /// that tokens parsed out of it later report their true position.
    Block(SourceLocation, String),
}

/// A list of tokens found in the source code.
pub type TokenList = Vec<Token>;

/// Tokens print in a form the tokenizer would read back as the same token.  Functor parameter
/// binding relies on this when it splices actual arguments into block text.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::Word(_, word) => write!(f, "{}", word),
            Token::Quoted(_, text) => write!(f, "{} {} {}", OPEN_QUOTE, text, CLOSE_QUOTE),
            Token::Tuple(_, name) => write!(f, "{}{}", TUPLE_PREFIX, name),
            Token::Pop(_) => write!(f, "{}", POP_MARKER),
            Token::Block(_, text) => write!(f, "{} {} {}", OPEN_BLOCK, text.trim(), CLOSE_BLOCK),
        }
    }
}

/// Include the location for debugging purposes.
impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self)
    }
}

impl Token {
    /// Get the token's location in the original source text.
    pub fn location(&self) -> &SourceLocation {
        match self {
            Token::Word(location, _) => location,
            Token::Quoted(location, _) => location,
            Token::Tuple(location, _) => location,
            Token::Pop(location) => location,
            Token::Block(location, _) => location,
        }
    }

    /// The word text if this is a bare literal.
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Word(_, word) => Some(word),
            _ => None,
        }
    }

    /// Is this token exactly the given bare word?
    pub fn is_word(&self, expected: &str) -> bool {
        self.word() == Some(expected)
    }

    /// The switch text if this token is a dash-command.  A leading `-` followed by a digit is a
    /// negative number and a lone `-` is the subtraction operator, neither is a switch.
    pub fn dash_command(&self) -> Option<&str> {
        let word = self.word()?;
        let mut chars = word.chars();

        match (chars.next(), chars.next()) {
            (Some('-'), Some(second)) if !second.is_ascii_digit() => Some(word),
            _ => None,
        }
    }

    /// Check if the token is a tuple name reference.
    pub fn is_tuple(&self) -> bool {
        matches!(self, Token::Tuple(_, _))
    }

    /// Check if the token is the pop sentinel.
    pub fn is_pop(&self) -> bool {
        matches!(self, Token::Pop(_))
    }

    /// Check if the token is a block.
    pub fn is_block(&self) -> bool {
        matches!(self, Token::Block(_, _))
    }
}

/// One whitespace delimited piece of source text.
struct Lex<'a> {
    location: SourceLocation,
    start: usize,
    text: &'a str,

    /// A new line was crossed while skipping to this lex.
    after_newline: bool,
}

/// Check if the given character is considered whitespace.
fn is_whitespace(next: &char) -> bool {
    *next == ' ' || *next == '\t' || *next == '\r' || *next == '\n'
}

/// Skip the rest of the current line, leaving the new line itself in the buffer.
fn skip_comment(buffer: &mut SourceBuffer) {
    while let Some(next) = buffer.peek_next()
        && next != '\n'
    {
        let _ = buffer.next_char();
    }
}

/// Pull the next lex out of the buffer, or None at the end of the text.
fn next_lex<'a>(buffer: &mut SourceBuffer<'a>) -> Option<Lex<'a>> {
    let mut after_newline = false;

    while let Some(next) = buffer.peek_next()
        && is_whitespace(&next)
    {
        if next == '\n' {
            after_newline = true;
        }

        let _ = buffer.next_char();
    }

    let _ = buffer.peek_next()?;

    let location = buffer.location().clone();
    let start = buffer.offset();

    while let Some(next) = buffer.peek_next()
        && !is_whitespace(&next)
    {
        let _ = buffer.next_char();
    }

    Some(Lex {
        location,
        start,
        text: buffer.slice(start, buffer.offset()),
        after_newline,
    })
}

/// Collect a quotation.  The opening `${` has already been consumed.
fn process_quote(opener: &SourceLocation, buffer: &mut SourceBuffer) -> error::Result<String> {
    let start = buffer.offset();

    while let Some(lex) = next_lex(buffer) {
        if lex.text == CLOSE_QUOTE {
            return Ok(buffer.slice(start, lex.start).trim().to_string());
        }
    }

    ScriptError::new(ErrorKind::Stream, format!("Missing {} for quotation.", CLOSE_QUOTE))
        .at(Some(opener.clone()))
        .into_result()
}

/// Collect the raw text of a block, honoring nested blocks, quotes and comments.  The opening
/// `$[` has already been consumed.
fn process_block(
    opener: &SourceLocation,
    buffer: &mut SourceBuffer,
) -> error::Result<(SourceLocation, String)> {
    let body_location = buffer.location().clone();
    let start = buffer.offset();
    let mut depth = 1;

    while let Some(lex) = next_lex(buffer) {
        match lex.text {
            OPEN_BLOCK => depth += 1,

            CLOSE_BLOCK => {
                depth -= 1;

                if depth == 0 {
                    return Ok((body_location, buffer.slice(start, lex.start).to_string()));
                }
            }

            OPEN_QUOTE => {
                let _ = process_quote(&lex.location, buffer)?;
            }

            text if text.starts_with('#') => skip_comment(buffer),

            _ => {}
        }
    }

    ScriptError::new(ErrorKind::Stream, format!("Missing {} for block.", CLOSE_BLOCK))
        .at(Some(opener.clone()))
        .into_result()
}

/// Turn the next lex into a token.  Returns None at the end of the text, otherwise the token and
/// whether a new line was crossed before it.
fn next_token(buffer: &mut SourceBuffer) -> error::Result<Option<(Token, bool)>> {
    // A comment that starts a line still counts as the line break for the token after it.
    let mut after_newline = false;

    loop {
        let Some(lex) = next_lex(buffer) else {
            return Ok(None);
        };

        after_newline |= lex.after_newline;

        let token = match lex.text {
            OPEN_QUOTE => Token::Quoted(lex.location.clone(), process_quote(&lex.location, buffer)?),

            OPEN_BLOCK => {
                let (location, text) = process_block(&lex.location, buffer)?;
                Token::Block(location, text)
            }

            CLOSE_QUOTE | CLOSE_BLOCK => {
                let message = format!("Unexpected {} without a matching opener.", lex.text);

                return ScriptError::new(ErrorKind::Stream, message)
                    .at(Some(lex.location))
                    .into_result();
            }

            POP_MARKER => Token::Pop(lex.location),

            text if text.starts_with('#') => {
                skip_comment(buffer);
                continue;
            }

            text if text.len() > 1 && text.starts_with(TUPLE_PREFIX) => {
                Token::Tuple(lex.location, text[1..].to_string())
            }

            text => Token::Word(lex.location, text.to_string()),
        };

        return Ok(Some((token, after_newline)));
    }
}

/// Tokenize script text into lines.  Every physical line becomes its own token list, except that
/// quotations and blocks carry on across new lines until they are closed.
pub fn tokenize_lines(path: &str, source: &str) -> error::Result<Vec<TokenList>> {
    let mut buffer = SourceBuffer::new(path, source);
    let mut lines = Vec::new();
    let mut current = TokenList::new();

    while let Some((token, after_newline)) = next_token(&mut buffer)? {
        if after_newline && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        current.push(token);
    }

    if !current.is_empty() {
        lines.push(current);
    }

    Ok(lines)
}

/// Tokenize the body of a block as a single token list, new lines are plain whitespace here.
pub fn tokenize_block(location: &SourceLocation, text: &str) -> error::Result<TokenList> {
    let mut buffer = SourceBuffer::new_at(location.clone(), text);
    let mut tokens = TokenList::new();

    while let Some((token, _)) = next_token(&mut buffer)? {
        tokens.push(token);
    }

    Ok(tokens)
}

/// Load a script file and tokenize it into lines.
pub fn tokenize_from_file(path: &str) -> error::Result<Vec<TokenList>> {
    match read_to_string(path) {
        Ok(source) => tokenize_lines(path, &source),
        Err(error) => {
            ScriptError::new(ErrorKind::External, format!("Could not read file {}: {}", path, error))
                .into_result()
        }
    }
}

/// Would more input close a quotation or block left open in this text?  The REPL keeps reading
/// lines while this holds.
pub fn needs_continuation(source: &str) -> bool {
    let mut buffer = SourceBuffer::new("<input>", source);
    let mut depth: usize = 0;
    let mut in_quote = false;

    while let Some(lex) = next_lex(&mut buffer) {
        if in_quote {
            in_quote = lex.text != CLOSE_QUOTE;
            continue;
        }

        match lex.text {
            OPEN_QUOTE => in_quote = true,
            OPEN_BLOCK => depth += 1,
            CLOSE_BLOCK => depth = depth.saturating_sub(1),
            text if text.starts_with('#') => skip_comment(&mut buffer),
            _ => {}
        }
    }

    in_quote || depth > 0
}
