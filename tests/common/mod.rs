#![allow(dead_code)]

use stackline::runtime::{
    data_structures::value::Value,
    interpreter::{session::Session, CommandResult, ExecutionManagement, TupleManagement},
};
use std::{
    cell::RefCell,
    env::temp_dir,
    io::{self, Write},
    path::PathBuf,
    process,
    rc::Rc,
};

/// An output stream the test can read back after the session has written to it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A fresh session whose printed output is captured.
pub fn session() -> (Session, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let mut session = Session::new();

    session.set_output(Box::new(buffer.clone()));
    (session, buffer)
}

/// Run script text, panicking only if it can't be tokenized.
pub fn run(session: &mut Session, source: &str) -> CommandResult {
    session
        .process_source("<test>", source)
        .expect("source should tokenize")
}

/// Run script text in a fresh session.
pub fn run_fresh(source: &str) -> (Session, CommandResult) {
    let (mut session, _) = session();
    let result = run(&mut session, source);

    (session, result)
}

/// The value on top of the tuple stack.
pub fn top(session: &Session) -> Option<Value> {
    session.tuples().peek(0).map(|tuple| tuple.borrow().value().clone())
}

/// The value of a named tuple.
pub fn tuple(session: &Session, name: &str) -> Option<Value> {
    session.find_tuple(name).map(|tuple| tuple.borrow().value().clone())
}

/// The values on the tuple stack, bottom first.
pub fn stack_values(session: &Session) -> Vec<Value> {
    session
        .tuples()
        .stack()
        .iter()
        .map(|tuple| tuple.borrow().value().clone())
        .collect()
}

/// How deep the tuple stack is.
pub fn depth(session: &Session) -> usize {
    session.tuples().depth()
}

/// A path in the temp directory unique to this test process.
pub fn temp_path(name: &str) -> PathBuf {
    temp_dir().join(format!("stackline-{}-{}", process::id(), name))
}
