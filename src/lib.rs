//! An embeddable command console.
//!
//! Hosts declare a tree of commands with typed arguments and gates, then hand
//! raw lines to [`CommandProcessor`] which parses them into containers and
//! dispatches them.
#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

pub mod argument;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod information;
pub mod input;
pub mod logger;
pub mod parser;
pub mod processor;
pub mod queue;
pub mod requirement;
pub mod tokenizer;

pub use argument::{types, Argument, ArgumentHandler, ArgumentType, TransformError, Value};
pub use command::{
    ArgumentContainer, Command, CommandContainer, CommandId, CommandManager, CommandName,
    Container, Handler,
};
pub use dispatch::{CommandResult, DispatchHandler, Dispatcher, Interceptor, ResultHandler};
pub use information::{Information, InformationId, InformationProviders, RequiredInformation};
pub use input::Input;
pub use parser::{ParseFail, ParseState};
pub use processor::CommandProcessor;
pub use queue::{CommandFactoryQueue, CreatedCommands, Placement, UnresolvedDependencies};
pub use requirement::{Reason, Requirement, RequirementSubject, UnsatisfiedRequirement};
pub use tokenizer::{tokenize, Token, TokenCursor, TokenizeError};
