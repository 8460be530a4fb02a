use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Command, CommandId, Handler};
use crate::argument::{Argument, Value};
use crate::dispatch::ResultHandler;
use crate::information::InformationProviders;
use crate::input::Input;

/// An argument bound to its input and resolved value.
#[derive(Clone)]
pub struct ArgumentContainer {
    pub argument: Arc<Argument>,
    /// The consumed input. `None` if the default was used.
    pub input: Option<Input>,
    pub value: Option<Value>,
    /// True if an input was consumed for the argument.
    pub defined: bool,
}

impl ArgumentContainer {
    pub fn name(&self) -> &str {
        &self.argument.name
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for ArgumentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentContainer")
            .field("argument", &self.argument.name)
            .field("input", &self.input)
            .field("defined", &self.defined)
            .finish()
    }
}

/// A matched command with its resolved arguments, ready to be dispatched.
#[derive(Clone)]
pub struct CommandContainer {
    pub id: CommandId,
    pub command: Arc<Command>,
    /// One container per declared argument, in declaration order.
    pub arguments: Vec<ArgumentContainer>,
    /// Replaces the handler of the command if set.
    pub handler: Option<Arc<dyn Handler>>,
}

impl CommandContainer {
    pub fn argument(&self, name: &str) -> Option<&ArgumentContainer> {
        self.arguments.iter().find(|a| a.name() == name)
    }

    /// The resolved value of the named argument.
    pub fn value<T: Any>(&self, name: &str) -> Option<&T> {
        self.argument(name).and_then(|a| a.value::<T>())
    }

    /// The handler that runs for this container: the override, or the one
    /// declared on the command.
    pub fn handler(&self) -> Option<&Arc<dyn Handler>> {
        self.handler.as_ref().or_else(|| self.command.handler.as_ref())
    }

    pub fn with_handler<F>(mut self, handler: F) -> CommandContainer
    where
        F: Fn(&CommandContainer, &InformationProviders, &mut ResultHandler) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for CommandContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContainer")
            .field("command", &self.command.name)
            .field("arguments", &self.arguments)
            .field("handler_override", &self.handler.is_some())
            .finish()
    }
}

/// What a dispatch result is about.
#[derive(Clone, Debug)]
pub enum Container {
    Command(Arc<CommandContainer>),
    /// The argument at `index` of `command.arguments`.
    Argument {
        command: Arc<CommandContainer>,
        index: usize,
    },
}

impl Container {
    pub fn command(&self) -> &Arc<CommandContainer> {
        match self {
            Container::Command(command) => command,
            Container::Argument { command, .. } => command,
        }
    }

    pub fn argument(&self) -> Option<&ArgumentContainer> {
        match self {
            Container::Command(_) => None,
            Container::Argument { command, index } => command.arguments.get(*index),
        }
    }
}
