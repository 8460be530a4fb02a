use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::command::{ArgumentContainer, CommandContainer};
use crate::dispatch::ResultHandler;
use crate::information::{InformationProviders, RequiredInformation};
use crate::input::Input;
use crate::requirement::Requirement;

pub mod types;

/// A resolved argument value, a handler result or a required value of a
/// requirement. Read it back with `downcast_ref`.
pub type Value = Arc<dyn Any + Send + Sync>;

pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// A transformer could not convert an input the validator accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert `{input}` into {expected}: {reason}")]
pub struct TransformError {
    pub input: String,
    pub expected: String,
    pub reason: String,
}

impl TransformError {
    pub fn new<R: ToString>(input: &Input, expected: &str, reason: R) -> TransformError {
        TransformError {
            input: input.to_literal(),
            expected: expected.to_owned(),
            reason: reason.to_string(),
        }
    }
}

pub trait Validator: Send + Sync {
    fn validate(&self, input: &Input) -> bool;
}

impl<F> Validator for F
where
    F: Fn(&Input) -> bool + Send + Sync,
{
    fn validate(&self, input: &Input) -> bool {
        self(input)
    }
}

type Transformer = dyn Fn(&Input) -> Result<Value, TransformError> + Send + Sync;
type Collector = dyn Fn(Vec<Value>) -> Value + Send + Sync;
type Possibilities = dyn Fn() -> Vec<Input> + Send + Sync;

/// How inputs of an argument are checked and converted.
///
/// The value type `T` is fixed when the type is created: the transformer
/// yields a `T` and a multiple argument of this type resolves to a `Vec<T>`.
#[derive(Clone)]
pub struct ArgumentType {
    name: String,
    boolean: bool,
    default: Option<Value>,
    validator: Arc<dyn Validator>,
    transformer: Arc<Transformer>,
    collector: Arc<Collector>,
    possibilities: Arc<Possibilities>,
}

impl ArgumentType {
    pub fn new<T, V, F>(name: &str, validator: V, transformer: F) -> ArgumentType
    where
        T: Any + Send + Sync + Clone,
        V: Fn(&Input) -> bool + Send + Sync + 'static,
        F: Fn(&Input) -> Result<T, TransformError> + Send + Sync + 'static,
    {
        ArgumentType {
            name: name.to_owned(),
            boolean: false,
            default: None,
            validator: Arc::new(validator),
            transformer: Arc::new(move |input: &Input| transformer(input).map(value)),
            collector: Arc::new(|values: Vec<Value>| {
                let items: Vec<T> = values
                    .iter()
                    .filter_map(|v| v.downcast_ref::<T>().cloned())
                    .collect();
                value(items)
            }),
            possibilities: Arc::new(Vec::<Input>::new),
        }
    }

    pub fn with_possibilities<F>(mut self, possibilities: F) -> ArgumentType
    where
        F: Fn() -> Vec<Input> + Send + Sync + 'static,
    {
        self.possibilities = Arc::new(possibilities);
        self
    }

    pub fn with_default<T: Any + Send + Sync>(mut self, default: T) -> ArgumentType {
        self.default = Some(value(default));
        self
    }

    /// Marks the type as a flag: a named argument of this type without a
    /// value is bound to `true`.
    pub(crate) fn flag(mut self) -> ArgumentType {
        self.boolean = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_boolean(&self) -> bool {
        self.boolean
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    pub fn validate(&self, input: &Input) -> bool {
        self.validator.validate(input)
    }

    pub fn transform(&self, input: &Input) -> Result<Value, TransformError> {
        (self.transformer)(input)
    }

    /// Packs values produced by `transform` into a `Vec<T>`.
    pub fn collect(&self, values: Vec<Value>) -> Value {
        (self.collector)(values)
    }

    /// Candidate inputs for completion. Not used for validation.
    pub fn possibilities(&self) -> Vec<Input> {
        (self.possibilities)()
    }
}

impl fmt::Debug for ArgumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentType")
            .field("name", &self.name)
            .field("boolean", &self.boolean)
            .finish()
    }
}

pub trait ArgumentHandler: Send + Sync {
    fn handle(
        &self,
        argument: &ArgumentContainer,
        command: &CommandContainer,
        info: &InformationProviders,
        results: &mut ResultHandler,
    ) -> Option<Value>;
}

impl<F> ArgumentHandler for F
where
    F: Fn(&ArgumentContainer, &CommandContainer, &InformationProviders, &mut ResultHandler) -> Option<Value>
        + Send
        + Sync,
{
    fn handle(
        &self,
        argument: &ArgumentContainer,
        command: &CommandContainer,
        info: &InformationProviders,
        results: &mut ResultHandler,
    ) -> Option<Value> {
        self(argument, command, info, results)
    }
}

/// A declared argument of a command. Immutable once the command is built.
pub struct Argument {
    pub id: String,
    pub name: String,
    /// The letter used in `-xyz`. Defaults to the first character of `name`.
    pub short_name: Option<char>,
    pub description: String,
    pub optional: bool,
    /// Consumes every following input the validator accepts, or the elements
    /// of a list input. Resolves to a `Vec<T>`.
    pub multiple: bool,
    pub kind: ArgumentType,
    pub default: Option<Value>,
    pub requirements: Vec<Arc<Requirement>>,
    pub required_info: Vec<RequiredInformation>,
    pub handler: Option<Arc<dyn ArgumentHandler>>,
}

impl Argument {
    pub fn new(name: &str, kind: ArgumentType) -> Argument {
        Argument {
            id: name.to_owned(),
            name: name.to_owned(),
            short_name: name.chars().next(),
            description: String::new(),
            optional: false,
            multiple: false,
            kind,
            default: None,
            requirements: Vec::new(),
            required_info: Vec::new(),
            handler: None,
        }
    }

    pub fn optional(mut self) -> Argument {
        self.optional = true;
        self
    }

    pub fn multiple(mut self) -> Argument {
        self.multiple = true;
        self
    }

    pub fn with_id(mut self, id: &str) -> Argument {
        self.id = id.to_owned();
        self
    }

    pub fn with_short_name(mut self, short_name: Option<char>) -> Argument {
        self.short_name = short_name;
        self
    }

    pub fn with_description(mut self, description: &str) -> Argument {
        self.description = description.to_owned();
        self
    }

    pub fn with_default<T: Any + Send + Sync>(mut self, default: T) -> Argument {
        self.default = Some(value(default));
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Argument {
        self.requirements.push(Arc::new(requirement));
        self
    }

    pub fn with_required_info(mut self, info: RequiredInformation) -> Argument {
        self.required_info.push(info);
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Argument
    where
        F: Fn(&ArgumentContainer, &CommandContainer, &InformationProviders, &mut ResultHandler) -> Option<Value>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn is_boolean(&self) -> bool {
        self.kind.is_boolean()
    }

    /// The value bound when the argument is optional and no input was given.
    /// A multiple argument without a default resolves to an empty `Vec<T>`.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(default) = &self.default {
            Some(default.clone())
        } else if self.multiple {
            Some(self.kind.collect(Vec::new()))
        } else {
            self.kind.default_value()
        }
    }

    pub fn possibilities(&self) -> Vec<Input> {
        self.kind.possibilities()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("kind", &self.kind.name())
            .field("optional", &self.optional)
            .field("multiple", &self.multiple)
            .finish()
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "[{}: {}]", self.name, self.kind.name())
        } else {
            write!(f, "<{}: {}>", self.name, self.kind.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn multiple_defaults_to_an_empty_vec() {
        let arg = Argument::new("names", types::string()).multiple().optional();
        let default = arg.default_value().unwrap();
        assert_eq!(default.downcast_ref::<Vec<String>>(), Some(&vec![]));
    }

    #[test]
    fn explicit_default_wins() {
        let arg = Argument::new("n", types::integer::<i32>()).optional().with_default(7i32);
        assert_eq!(arg.default_value().unwrap().downcast_ref::<i32>(), Some(&7));
        assert_eq!(arg.short_name, Some('n'));
        assert_eq!(arg.to_string(), "[n: i32]");
    }

    #[test]
    fn collect_packs_typed_values() {
        let kind = types::integer::<u8>();
        let values = vec![
            kind.transform(&Input::single("1")).unwrap(),
            kind.transform(&Input::single("2")).unwrap(),
        ];
        assert_eq!(kind.collect(values).downcast_ref::<Vec<u8>>(), Some(&vec![1, 2]));
    }
}
