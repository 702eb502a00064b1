use crate::{lang::source_buffer::SourceLocation, runtime::interpreter::Command};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    rc::Rc,
};

/// Builds a fresh instance of a command for each dispatch.
pub type CommandFactory = dyn Fn() -> Box<dyn Command>;

/// What the registry keeps about each built-in command.
#[derive(Clone)]
pub struct CommandInfo {
    /// Where in the Rust source the command was registered.
    pub location: SourceLocation,

    /// The name the command is dispatched by.
    pub name: String,

    /// A one line description for the help listing.
    pub description: String,

    /// How the command is invoked.
    pub signature: String,

    factory: Rc<CommandFactory>,
}

impl CommandInfo {
    /// Describe a command.
    pub fn new(
        location: SourceLocation,
        name: String,
        description: String,
        signature: String,
        factory: Rc<CommandFactory>,
    ) -> CommandInfo {
        CommandInfo {
            location,
            name,
            description,
            signature,
            factory,
        }
    }

    /// The factory for new instances of the command.
    pub fn factory(&self) -> Rc<CommandFactory> {
        self.factory.clone()
    }
}

/// The registry of built-in commands, keyed by name.  Names are case sensitive.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandInfo>,
}

/// The help listing: every command with its description, sorted by name.
impl Display for CommandRegistry {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        let max_size = self.commands.keys().map(String::len).max().unwrap_or(0);

        writeln!(formatter, "{} commands defined.\n", self.commands.len())?;

        for name in self.names() {
            let info = &self.commands[name];
            writeln!(formatter, "{:width$}  --  {}", name, info.description, width = max_size)?;
        }

        Ok(())
    }
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> CommandRegistry {
        CommandRegistry::default()
    }

    /// Register a command, replacing any earlier one of the same name.
    pub fn insert(&mut self, info: CommandInfo) {
        let _ = self.commands.insert(info.name.clone(), info);
    }

    /// Find a command by name.
    pub fn try_get(&self, name: &str) -> Option<&CommandInfo> {
        self.commands.get(name)
    }

    /// The sorted command names.
    pub fn names(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.commands.keys().collect();

        names.sort();
        names
    }

    /// How many commands are registered.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Is the registry empty?
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
