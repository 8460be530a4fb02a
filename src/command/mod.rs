use std::fmt;
use std::sync::Arc;

use crate::argument::{Argument, Value};
use crate::dispatch::ResultHandler;
use crate::information::{InformationProviders, RequiredInformation};
use crate::requirement::Requirement;

mod container;
mod manager;
mod name;
mod tree;

pub use container::{ArgumentContainer, CommandContainer, Container};
pub use manager::CommandManager;
pub use name::CommandName;
pub use tree::{CommandId, CommandTree};

/// Runs a command. A returned value becomes a value result; `None` means
/// the handler has nothing to report.
pub trait Handler: Send + Sync {
    fn handle(
        &self,
        command: &CommandContainer,
        info: &InformationProviders,
        results: &mut ResultHandler,
    ) -> Option<Value>;
}

impl<F> Handler for F
where
    F: Fn(&CommandContainer, &InformationProviders, &mut ResultHandler) -> Option<Value> + Send + Sync,
{
    fn handle(
        &self,
        command: &CommandContainer,
        info: &InformationProviders,
        results: &mut ResultHandler,
    ) -> Option<Value> {
        self(command, info, results)
    }
}

/// A command declaration. Where it sits in the tree is recorded by the
/// [`CommandManager`] that registered it.
pub struct Command {
    /// Breaks ties between commands matching the same word. Lower wins.
    pub order: i32,
    pub name: CommandName,
    pub aliases: Vec<CommandName>,
    pub description: String,
    pub handler: Option<Arc<dyn Handler>>,
    pub arguments: Vec<Arc<Argument>>,
    pub requirements: Vec<Arc<Requirement>>,
    pub required_info: Vec<RequiredInformation>,
}

impl Command {
    pub fn new<N: Into<CommandName>>(name: N) -> Command {
        Command {
            order: 0,
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            handler: None,
            arguments: Vec::new(),
            requirements: Vec::new(),
            required_info: Vec::new(),
        }
    }

    pub fn with_order(mut self, order: i32) -> Command {
        self.order = order;
        self
    }

    pub fn with_alias<N: Into<CommandName>>(mut self, alias: N) -> Command {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: &str) -> Command {
        self.description = description.to_owned();
        self
    }

    pub fn with_argument(mut self, argument: Argument) -> Command {
        self.arguments.push(Arc::new(argument));
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Command {
        self.requirements.push(Arc::new(requirement));
        self
    }

    pub fn with_required_info(mut self, info: RequiredInformation) -> Command {
        self.required_info.push(info);
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Command
    where
        F: Fn(&CommandContainer, &InformationProviders, &mut ResultHandler) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// The name followed by the aliases.
    pub fn names(&self) -> impl Iterator<Item = &CommandName> {
        std::iter::once(&self.name).chain(self.aliases.iter())
    }

    pub fn matches_exact(&self, word: &str) -> bool {
        self.names().any(|n| !n.is_pattern() && n.matches(word))
    }

    pub fn matches_pattern(&self, word: &str) -> bool {
        self.names().any(|n| n.is_pattern() && n.matches(word))
    }

    pub fn argument(&self, name: &str) -> Option<&Arc<Argument>> {
        self.arguments.iter().find(|a| a.name == name)
    }

    pub fn has_required_arguments(&self) -> bool {
        self.arguments.iter().any(|a| !a.optional)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("order", &self.order)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
