
use std::fmt::{ self,
                Display,
                Formatter };



/// The location in the script text where a token was found.  Locations travel with every token,
/// block and error so that diagnostics can point back at the offending text, even when that text
/// lives inside a block that is re-parsed long after the line holding it was read.
///
/// This is a read-only structure.  Use the field accessor methods to get the values.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Hash)]
pub struct SourceLocation
{
    /// Either the path to the script file or a tag describing where the text came from.  Lines
    /// typed at the REPL are tagged "\<repl\>".
    path: String,

    /// The 1 based line number in the source text.
    line: usize,

    /// The 1 based column number in the source text.
    column: usize
}


impl Default for SourceLocation
{
    fn default() -> Self
    {
        Self::new()
    }
}


/// Used for error reporting to show where in the script an error originated.
impl Display for SourceLocation
{
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), fmt::Error>
    {
        write!(formatter, "{} ({}, {})", self.path, self.line, self.column)
    }
}


impl SourceLocation
{
    /// Create a new SourceLocation with default values.
    pub fn new() -> SourceLocation
    {
        SourceLocation { path: "unspecified".to_string(), line: 1, column: 1 }
    }

    /// Create a new SourceLocation at the start of the given source.
    pub fn new_from_path(path: &str) -> Self
    {
        SourceLocation { path: path.to_owned(), line: 1, column: 1 }
    }

    /// Create a new SourceLocation with all of the needed information.  This is useful in
    /// conjunction with the location_here! macro.
    pub fn new_from_info(path: &str, line: usize, column: usize) -> Self
    {
        SourceLocation { path: path.to_owned(), line, column }
    }

    /// The path to the source or a meaningful description of it.
    pub fn path(&self) -> &String
    {
        &self.path
    }

    /// The 1 based line number.
    pub fn line(&self) -> usize
    {
        self.line
    }

    /// The 1 based column number.
    pub fn column(&self) -> usize
    {
        self.column
    }
}



/// Helper macro to get the location of the macro invocation.  Commands registered from Rust use
/// this so the command listing can say where each one came from.
#[macro_export]
macro_rules! location_here
{
    () =>
    {
        $crate::lang::source_buffer::SourceLocation::new_from_info(file!(),
                                                                   line!() as usize,
                                                                   column!() as usize)
    };
}



/// A forward only cursor over script text.  As characters are consumed the logical location of
/// the cursor is maintained, and the byte offset is kept so the tokenizer can slice out the raw
/// text of quotes and blocks without copying it character by character.
///
/// The SourceBuffer only borrows the text, which must outlive it.
pub struct SourceBuffer<'a>
{
    /// The text being processed.
    source: &'a str,

    /// Byte offset of the next unconsumed character.
    offset: usize,

    /// The logical location of the cursor.
    location: SourceLocation
}


impl<'a> SourceBuffer<'a>
{
    /// Create a new SourceBuffer for text found at the start of the given path or tag.
    pub fn new(path: &str, source: &'a str) -> Self
    {
        SourceBuffer::new_at(SourceLocation::new_from_path(path), source)
    }

    /// Create a buffer for text that started somewhere other than the top of its source, such as
    /// the body of a block.  Locations reported for its tokens continue from `location`.
    pub fn new_at(location: SourceLocation, source: &'a str) -> Self
    {
        SourceBuffer { source, offset: 0, location }
    }

    /// The location the cursor is at.
    pub fn location(&self) -> &SourceLocation
    {
        &self.location
    }

    /// Byte offset of the cursor.
    pub fn offset(&self) -> usize
    {
        self.offset
    }

    /// Borrow the raw text between two offsets previously reported by `offset`.
    pub fn slice(&self, start: usize, end: usize) -> &'a str
    {
        &self.source[start..end]
    }

    /// Take a peek at the next character without consuming it.
    pub fn peek_next(&self) -> Option<char>
    {
        self.source[self.offset..].chars().next()
    }

    /// Get and consume the next character.
    pub fn next_char(&mut self) -> Option<char>
    {
        let next = self.peek_next()?;

        self.offset += next.len_utf8();
        self.increment_location(next);

        Some(next)
    }

    /// Advance one column for regular characters.  Reset the column to 1 and increment the line
    /// for new line characters.
    fn increment_location(&mut self, next: char)
    {
        if next == '\n'
        {
            self.location.line += 1;
            self.location.column = 1;
        }
        else
        {
            self.location.column += 1;
        }
    }
}
