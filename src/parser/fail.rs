use std::sync::Arc;

use thiserror::Error;

use crate::argument::{Argument, TransformError};
use crate::command::{ArgumentContainer, Command, CommandContainer};
use crate::input::Input;
use crate::tokenizer::TokenizeError;

/// How far parsing got before it failed.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    /// Commands parsed completely before the failing one.
    pub parsed: Vec<CommandContainer>,
    /// Arguments of the failing command bound so far, in declaration order.
    pub arguments: Vec<ArgumentContainer>,
    /// Character offset in the line where the next unconsumed token starts.
    pub position: usize,
}

fn names(arguments: &[Arc<Argument>]) -> String {
    arguments
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone)]
pub enum ParseFail {
    #[error("command not found: `{input}`")]
    CommandNotFound { input: Input, state: ParseState },
    #[error("{command}: missing arguments {}", names(.missing))]
    ArgumentsMissing {
        command: Arc<Command>,
        missing: Vec<Arc<Argument>>,
        state: ParseState,
    },
    #[error("{command}: invalid input `{input}` for {argument}")]
    InvalidInputForArgument {
        command: Arc<Command>,
        argument: Arc<Argument>,
        input: Input,
        state: ParseState,
    },
    #[error("{command}: no input for {argument}")]
    NoInputForArgument {
        command: Arc<Command>,
        argument: Arc<Argument>,
        state: ParseState,
    },
    #[error("{command}: cannot parse `{input}` for {argument}: {cause}")]
    ArgumentInputParseFail {
        command: Arc<Command>,
        argument: Arc<Argument>,
        input: Input,
        #[source]
        cause: TransformError,
        state: ParseState,
    },
    #[error("{command}: `{input}` combines {expected} with non-flag {incompatible}")]
    IncompatibleInputTypesForShortArguments {
        command: Arc<Command>,
        expected: Arc<Argument>,
        incompatible: Arc<Argument>,
        input: Input,
        state: ParseState,
    },
    #[error("{command}: no argument named `{name}`")]
    ArgumentNotFound {
        command: Arc<Command>,
        name: String,
        state: ParseState,
    },
    #[error("malformed input: {cause}")]
    MalformedInput {
        #[from]
        cause: TokenizeError,
    },
}

impl ParseFail {
    /// The partial state. `None` for input that could not be tokenized.
    pub fn state(&self) -> Option<&ParseState> {
        match self {
            ParseFail::CommandNotFound { state, .. }
            | ParseFail::ArgumentsMissing { state, .. }
            | ParseFail::InvalidInputForArgument { state, .. }
            | ParseFail::NoInputForArgument { state, .. }
            | ParseFail::ArgumentInputParseFail { state, .. }
            | ParseFail::IncompatibleInputTypesForShortArguments { state, .. }
            | ParseFail::ArgumentNotFound { state, .. } => Some(state),
            ParseFail::MalformedInput { .. } => None,
        }
    }

    /// The command whose arguments failed, if any.
    pub fn command(&self) -> Option<&Arc<Command>> {
        match self {
            ParseFail::ArgumentsMissing { command, .. }
            | ParseFail::InvalidInputForArgument { command, .. }
            | ParseFail::NoInputForArgument { command, .. }
            | ParseFail::ArgumentInputParseFail { command, .. }
            | ParseFail::IncompatibleInputTypesForShortArguments { command, .. }
            | ParseFail::ArgumentNotFound { command, .. } => Some(command),
            ParseFail::CommandNotFound { .. } | ParseFail::MalformedInput { .. } => None,
        }
    }

    /// Character offset in the line the failure points at.
    pub fn position(&self) -> usize {
        match self {
            ParseFail::MalformedInput { cause } => cause.position(),
            other => other.state().map_or(0, |s| s.position),
        }
    }
}
