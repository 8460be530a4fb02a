use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::argument::Value;
use crate::command::{CommandContainer, Container};
use crate::information::RequiredInformation;
use crate::requirement::UnsatisfiedRequirement;

/// One outcome of dispatching a command. Gate failures are reported here
/// next to ordinary values; none of them fails the dispatch call.
#[derive(Clone)]
pub enum CommandResult {
    Value {
        value: Value,
        container: Container,
    },
    UnsatisfiedRequirements {
        unsatisfied: Vec<UnsatisfiedRequirement>,
        container: Container,
    },
    MissingInformation {
        missing: Vec<RequiredInformation>,
        /// The command or argument that asked for the information.
        requester: Container,
    },
}

impl CommandResult {
    pub fn container(&self) -> &Container {
        match self {
            CommandResult::Value { container, .. } => container,
            CommandResult::UnsatisfiedRequirements { container, .. } => container,
            CommandResult::MissingInformation { requester, .. } => requester,
        }
    }

    /// The command container an argument result belongs to. `None` for
    /// results about a command itself.
    pub fn root(&self) -> Option<&Arc<CommandContainer>> {
        match self.container() {
            Container::Command(_) => None,
            Container::Argument { command, .. } => Some(command),
        }
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        match self {
            CommandResult::Value { value, .. } => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, CommandResult::Value { .. })
    }
}

impl fmt::Debug for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Value { container, .. } => f
                .debug_struct("Value")
                .field("container", container)
                .finish(),
            CommandResult::UnsatisfiedRequirements {
                unsatisfied,
                container,
            } => f
                .debug_struct("UnsatisfiedRequirements")
                .field("unsatisfied", unsatisfied)
                .field("container", container)
                .finish(),
            CommandResult::MissingInformation { missing, requester } => f
                .debug_struct("MissingInformation")
                .field("missing", missing)
                .field("requester", requester)
                .finish(),
        }
    }
}

/// Handed to each command and argument handler. Collects the results it
/// reports and whether it asked to cancel the command handler.
pub struct ResultHandler {
    container: Container,
    results: Vec<CommandResult>,
    cancelled: bool,
}

impl ResultHandler {
    pub fn new(container: Container) -> ResultHandler {
        ResultHandler {
            container,
            results: Vec::new(),
            cancelled: false,
        }
    }

    /// What the handler runs for.
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn result(&mut self, value: Value) {
        self.results.push(CommandResult::Value {
            value,
            container: self.container.clone(),
        });
    }

    pub fn information_missing(&mut self, missing: Vec<RequiredInformation>, cancel: bool) {
        self.results.push(CommandResult::MissingInformation {
            missing,
            requester: self.container.clone(),
        });
        self.cancelled |= cancel;
    }

    pub fn requirements_unsatisfied(&mut self, unsatisfied: Vec<UnsatisfiedRequirement>, cancel: bool) {
        self.results.push(CommandResult::UnsatisfiedRequirements {
            unsatisfied,
            container: self.container.clone(),
        });
        self.cancelled |= cancel;
    }

    /// Keeps the command handler from running. Other argument handlers of the
    /// same command still run.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn should_cancel(&self) -> bool {
        self.cancelled
    }

    pub fn results(&self) -> &[CommandResult] {
        &self.results
    }

    pub(crate) fn into_results(self) -> (Vec<CommandResult>, bool) {
        (self.results, self.cancelled)
    }
}
