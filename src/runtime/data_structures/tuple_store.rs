use crate::runtime::{
    data_structures::{contextual_data::ContextualData, value::Value},
    error::{self, ErrorKind, ScriptError},
};
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// Name of the predefined tuple holding `true`.
pub const TRUE_TUPLE: &str = "true";

/// Name of the predefined tuple holding `false`.
pub const FALSE_TUPLE: &str = "false";

/// Name of the tuple holding the result of the last top level command.
pub const RESULT_TUPLE: &str = "?";

/// A mutable value cell, optionally named.  The same name always refers to the same cell;
/// assigning replaces the value, never the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    key: Option<String>,
    value: Value,
}

/// Tuples are shared between the named map and the stack, so they're handled by reference.
pub type TuplePtr = Rc<RefCell<Tuple>>;

impl Tuple {
    /// Create a named tuple.
    pub fn new_named(key: &str, value: Value) -> TuplePtr {
        Rc::new(RefCell::new(Tuple {
            key: Some(key.to_string()),
            value,
        }))
    }

    /// Create a tuple with no name, the kind that lives only on the stack.
    pub fn new_anonymous(value: Value) -> TuplePtr {
        Rc::new(RefCell::new(Tuple { key: None, value }))
    }

    /// The tuple's name, if it has one.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the value held by the cell.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// One layer of named tuples.
type TupleMap = HashMap<String, TuplePtr>;

/// The session's variables.  Named tuples live in a global map with a stack of local layers above
/// it for function bodies, and anonymous tuples live on a LIFO stack that commands use to hand
/// results to one another.  The two structures share the tuple type but are otherwise
/// independent.
pub struct TupleStore {
    globals: TupleMap,
    locals: Vec<TupleMap>,
    stack: Vec<TuplePtr>,
}

impl Default for TupleStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Local layers come and go with function invocations.
impl ContextualData for TupleStore {
    fn mark_context(&mut self) {
        self.locals.push(TupleMap::new());
    }

    fn release_context(&mut self) {
        let _ = self.locals.pop();
    }
}

/// List the visible named tuples, one per line, sorted by name.
impl Display for TupleStore {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        for name in self.names() {
            if let Some(tuple) = self.get(&name) {
                let tuple = tuple.borrow();

                // A name bound to another name's tuple, a function's tuple argument for example.
                if let Some(key) = tuple.key()
                    && key != name
                {
                    write!(formatter, "@{} -> ", name)?;
                }

                writeln!(
                    formatter,
                    "@{} = {} ({})",
                    tuple.key().unwrap_or(name.as_str()),
                    tuple.value(),
                    tuple.value().type_name()
                )?;
            }
        }

        Ok(())
    }
}

impl TupleStore {
    /// Create a store holding only the predefined tuples.
    pub fn new() -> TupleStore {
        let mut store = TupleStore {
            globals: TupleMap::new(),
            locals: Vec::new(),
            stack: Vec::new(),
        };

        let _ = store.set(TRUE_TUPLE, Value::Bool(true));
        let _ = store.set(FALSE_TUPLE, Value::Bool(false));

        store
    }

    /// Find the visible tuple of the given name.  Local layers are searched innermost first, then
    /// the globals.  A missing name is a normal outcome, not an error.
    pub fn get(&self, name: &str) -> Option<TuplePtr> {
        self.locals
            .iter()
            .rev()
            .chain(std::iter::once(&self.globals))
            .find_map(|layer| layer.get(name))
            .cloned()
    }

    /// Does a tuple of this name exist?
    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Assign a value by name.  An existing visible tuple keeps its identity and just takes the
    /// new value, otherwise a new global tuple is created.
    pub fn set(&mut self, name: &str, value: Value) -> TuplePtr {
        if let Some(tuple) = self.get(name) {
            tuple.borrow_mut().set_value(value);
            return tuple;
        }

        let tuple = Tuple::new_named(name, value);
        let _ = self.globals.insert(name.to_string(), tuple.clone());

        tuple
    }

    /// Create a tuple in the innermost local layer, shadowing any outer tuple of the same name.
    /// Returns None when no local layer is active.
    pub fn declare_local(&mut self, name: &str, value: Value) -> Option<TuplePtr> {
        let layer = self.locals.last_mut()?;
        let tuple = Tuple::new_named(name, value);
        let _ = layer.insert(name.to_string(), tuple.clone());

        Some(tuple)
    }

    /// Bind a name in the innermost local layer to an existing tuple, so both names reach the same
    /// cell.  Returns false when no local layer is active.
    pub fn alias_local(&mut self, name: &str, tuple: TuplePtr) -> bool {
        match self.locals.last_mut() {
            Some(layer) => {
                let _ = layer.insert(name.to_string(), tuple);
                true
            }

            None => false,
        }
    }

    /// Is there a local layer to declare into?
    pub fn has_local_context(&self) -> bool {
        !self.locals.is_empty()
    }

    /// Remove the innermost visible tuple of the given name.  Returns whether one was found.
    pub fn delete(&mut self, name: &str) -> bool {
        for layer in self.locals.iter_mut().rev() {
            if layer.remove(name).is_some() {
                return true;
            }
        }

        self.globals.remove(name).is_some()
    }

    /// The sorted names of all visible tuples.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .locals
            .iter()
            .chain(std::iter::once(&self.globals))
            .flat_map(|layer| layer.keys().cloned())
            .collect();

        names.sort();
        names.dedup();
        names
    }

    /// Push a tuple onto the stack.
    pub fn push(&mut self, tuple: TuplePtr) {
        self.stack.push(tuple);
    }

    /// Push a value onto the stack in a fresh anonymous tuple.
    pub fn push_value(&mut self, value: Value) {
        self.push(Tuple::new_anonymous(value));
    }

    /// Pop the top tuple off the stack.  An empty stack is an error, never a silent default.
    pub fn pop(&mut self) -> error::Result<TuplePtr> {
        match self.stack.pop() {
            Some(tuple) => Ok(tuple),
            None => ScriptError::new(ErrorKind::Resolution, "Tuple stack underflow.").into_result(),
        }
    }

    /// Look at a tuple on the stack without removing it, 0 being the top.
    pub fn peek(&self, index: usize) -> Option<&TuplePtr> {
        self.stack.len().checked_sub(index + 1).map(|at| &self.stack[at])
    }

    /// Remove the tuple at the given depth, 0 being the top.
    pub fn remove(&mut self, index: usize) -> error::Result<TuplePtr> {
        match self.stack.len().checked_sub(index + 1) {
            Some(at) => Ok(self.stack.remove(at)),
            None => {
                let message = format!(
                    "Index {} out of range of tuple stack depth {}.",
                    index,
                    self.stack.len()
                );

                ScriptError::new(ErrorKind::Resolution, message).into_result()
            }
        }
    }

    /// How many tuples are on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop everything on the stack.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// The stack from bottom to top.
    pub fn stack(&self) -> &[TuplePtr] {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_tuples_exist() {
        let store = TupleStore::new();

        assert_eq!(store.get("true").unwrap().borrow().value(), &Value::Bool(true));
        assert_eq!(store.get("false").unwrap().borrow().value(), &Value::Bool(false));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn set_keeps_cell_identity() {
        let mut store = TupleStore::new();
        let first = store.set("x", Value::Int(1));
        let second = store.set("x", Value::Int(2));

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().value(), &Value::Int(2));
    }

    #[test]
    fn locals_shadow_and_release() {
        let mut store = TupleStore::new();
        let _ = store.set("x", Value::Int(1));

        store.mark_context();
        let _ = store.declare_local("x", Value::Int(2));
        let _ = store.set("y", Value::Int(3));

        assert_eq!(store.get("x").unwrap().borrow().value(), &Value::Int(2));

        store.release_context();

        assert_eq!(store.get("x").unwrap().borrow().value(), &Value::Int(1));
        assert!(store.exists("y"));
        assert!(store.declare_local("z", Value::None).is_none());
    }

    #[test]
    fn aliases_reach_the_outer_cell_past_locals() {
        let mut store = TupleStore::new();
        let outer = store.set("x", Value::Int(1));

        assert!(!store.alias_local("///1", outer.clone()));

        store.mark_context();
        assert!(store.alias_local("///1", outer.clone()));
        let _ = store.declare_local("x", Value::Int(2));
        let _ = store.set("///1", Value::Int(3));

        assert_eq!(store.get("x").unwrap().borrow().value(), &Value::Int(2));
        assert!(store.to_string().contains("@///1 -> @x = 3 (int)"));

        store.release_context();

        assert!(Rc::ptr_eq(&store.get("x").unwrap(), &outer));
        assert_eq!(outer.borrow().value(), &Value::Int(3));
        assert!(!store.exists("///1"));
    }

    #[test]
    fn stack_is_lifo_and_reports_underflow() {
        let mut store = TupleStore::new();

        store.push_value(Value::Int(1));
        store.push_value(Value::Int(2));

        assert_eq!(store.peek(1).unwrap().borrow().value(), &Value::Int(1));
        assert_eq!(store.pop().unwrap().borrow().value(), &Value::Int(2));
        assert_eq!(store.pop().unwrap().borrow().value(), &Value::Int(1));
        assert!(store.pop().is_err());
        assert!(store.remove(0).is_err());
    }
}
