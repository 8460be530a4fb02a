//! Preconditions checked before a handler may run.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::argument::{value, Value};
use crate::command::CommandContainer;
use crate::information::{InformationId, InformationProviders, RequiredInformation};

/// What a requirement is tested against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementSubject {
    /// The resolved value of the argument declaring the requirement. On a
    /// command there is no such value and the requirement is skipped.
    Own,
    /// The resolved value of the named argument of the same command.
    Argument(String),
    Information(InformationId),
}

impl fmt::Display for RequirementSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementSubject::Own => write!(f, "own value"),
            RequirementSubject::Argument(name) => write!(f, "argument `{}`", name),
            RequirementSubject::Information(id) => write!(f, "information {}", id),
        }
    }
}

pub trait Tester: Send + Sync {
    fn test(&self, requirement: &Requirement, value: &Value) -> bool;
}

impl<F> Tester for F
where
    F: Fn(&Requirement, &Value) -> bool + Send + Sync,
{
    fn test(&self, requirement: &Requirement, value: &Value) -> bool {
        self(requirement, value)
    }
}

pub struct Requirement {
    pub required: Value,
    pub subject: RequirementSubject,
    pub description: String,
    tester: Arc<dyn Tester>,
}

impl Requirement {
    pub fn new<R, F>(required: R, subject: RequirementSubject, tester: F) -> Requirement
    where
        R: Any + Send + Sync,
        F: Fn(&Requirement, &Value) -> bool + Send + Sync + 'static,
    {
        Requirement {
            required: value(required),
            subject,
            description: String::new(),
            tester: Arc::new(tester),
        }
    }

    /// A requirement whose subject is a `T` and whose tester compares it with
    /// the required `R`. A subject of another type never satisfies it.
    pub fn typed<T, R, F>(required: R, subject: RequirementSubject, test: F) -> Requirement
    where
        T: Any,
        R: Any + Send + Sync,
        F: Fn(&R, &T) -> bool + Send + Sync + 'static,
    {
        Requirement::new(required, subject, move |req: &Requirement, v: &Value| {
            match (req.required::<R>(), v.downcast_ref::<T>()) {
                (Some(required), Some(v)) => test(required, v),
                _ => false,
            }
        })
    }

    /// Tests information of type `T` carrying `tags`.
    pub fn information<T, R, F>(tags: &[&str], required: R, test: F) -> Requirement
    where
        T: Any,
        R: Any + Send + Sync,
        F: Fn(&R, &T) -> bool + Send + Sync + 'static,
    {
        let subject = RequirementSubject::Information(InformationId::new::<T>(tags));
        Requirement::typed(required, subject, test)
    }

    pub fn with_description(mut self, description: &str) -> Requirement {
        self.description = description.to_owned();
        self
    }

    pub fn required<R: Any>(&self) -> Option<&R> {
        self.required.downcast_ref::<R>()
    }

    pub fn test(&self, value: &Value) -> bool {
        self.tester.test(self, value)
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("subject", &self.subject)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The information the requirement is about could not be found.
    MissingInformation,
    Unsatisfied,
}

#[derive(Clone)]
pub struct UnsatisfiedRequirement {
    pub requirement: Arc<Requirement>,
    pub subject: RequirementSubject,
    /// The value that was tested, if one was found.
    pub value: Option<Value>,
    pub reason: Reason,
}

impl fmt::Debug for UnsatisfiedRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsatisfiedRequirement")
            .field("subject", &self.subject)
            .field("reason", &self.reason)
            .field("description", &self.requirement.description)
            .finish()
    }
}

/// The outcome of checking the requirements and the required information of
/// a command or an argument. Every entry is checked; nothing short-circuits.
#[derive(Debug, Default)]
pub struct Gate {
    pub unsatisfied: Vec<UnsatisfiedRequirement>,
    pub missing: Vec<RequiredInformation>,
}

impl Gate {
    pub fn passed(&self) -> bool {
        self.unsatisfied.is_empty() && self.missing.is_empty()
    }
}

pub fn check(
    requirements: &[Arc<Requirement>],
    required_info: &[RequiredInformation],
    own: Option<&Value>,
    container: &CommandContainer,
    providers: &InformationProviders,
) -> Gate {
    let mut gate = Gate::default();

    for info in required_info {
        if !info.is_present(providers) {
            trace!("gate: missing information {}", info.id);
            gate.missing.push(info.clone());
        }
    }

    for requirement in requirements {
        let subject = match &requirement.subject {
            RequirementSubject::Own => own.cloned(),
            RequirementSubject::Argument(name) => {
                container.argument(name).and_then(|arg| arg.value.clone())
            }
            RequirementSubject::Information(id) => match providers.find(id, true) {
                Some(info) => Some(info.value),
                None => {
                    trace!("gate: no information {} to test", id);
                    gate.unsatisfied.push(UnsatisfiedRequirement {
                        requirement: requirement.clone(),
                        subject: requirement.subject.clone(),
                        value: None,
                        reason: Reason::MissingInformation,
                    });
                    continue;
                }
            },
        };

        // A subject without a value (an unbound argument) is not tested.
        let subject = match subject {
            Some(subject) => subject,
            None => continue,
        };

        if !requirement.test(&subject) {
            trace!("gate: unsatisfied requirement on {}", requirement.subject);
            gate.unsatisfied.push(UnsatisfiedRequirement {
                requirement: requirement.clone(),
                subject: requirement.subject.clone(),
                value: Some(subject),
                reason: Reason::Unsatisfied,
            });
        }
    }

    gate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{types, Argument};
    use crate::command::{ArgumentContainer, Command, CommandContainer, CommandManager};
    use crate::input::Input;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Level(u32);

    fn container_with_amount(amount: Option<i64>) -> CommandContainer {
        let mut manager = CommandManager::new();
        let id = manager.register(
            Command::new("give")
                .with_argument(Argument::new("amount", types::integer::<i64>()).optional()),
            "test",
        );
        let command = manager.command(id).unwrap().clone();
        CommandContainer {
            id,
            arguments: vec![ArgumentContainer {
                argument: command.arguments[0].clone(),
                input: amount.map(|a| Input::single(a.to_string())),
                value: amount.map(value),
                defined: amount.is_some(),
            }],
            command,
            handler: None,
        }
    }

    #[test]
    fn information_requirements() {
        let requirement = Arc::new(Requirement::information::<Level, u32, _>(
            &["player"],
            10,
            |required, level| level.0 >= *required,
        ));
        let container = container_with_amount(None);

        let mut info = InformationProviders::new();
        let gate = check(&[requirement.clone()], &[], None, &container, &info);
        assert_eq!(gate.unsatisfied.len(), 1);
        assert_eq!(gate.unsatisfied[0].reason, Reason::MissingInformation);

        info.register_value(&["player"], Level(3));
        let gate = check(&[requirement.clone()], &[], None, &container, &info);
        assert_eq!(gate.unsatisfied[0].reason, Reason::Unsatisfied);
        assert!(!gate.passed());

        let mut info = InformationProviders::new();
        info.register_value(&["player"], Level(12));
        assert!(check(&[requirement], &[], None, &container, &info).passed());
    }

    #[test]
    fn argument_subjects_are_skipped_without_a_value() {
        let requirement = Arc::new(Requirement::typed::<i64, i64, _>(
            100,
            RequirementSubject::Argument("amount".to_owned()),
            |max, amount| amount <= max,
        ));
        let info = InformationProviders::new();

        let unbound = container_with_amount(None);
        assert!(check(&[requirement.clone()], &[], None, &unbound, &info).passed());

        let small = container_with_amount(Some(5));
        assert!(check(&[requirement.clone()], &[], None, &small, &info).passed());

        let big = container_with_amount(Some(500));
        let gate = check(&[requirement], &[], None, &big, &info);
        assert_eq!(gate.unsatisfied.len(), 1);
        assert_eq!(gate.unsatisfied[0].value.as_ref().and_then(|v| v.downcast_ref::<i64>()), Some(&500));
    }

    #[test]
    fn everything_is_checked() {
        let own = Arc::new(Requirement::typed::<i64, i64, _>(
            0,
            RequirementSubject::Own,
            |min, v| v > min,
        ));
        let missing = RequiredInformation::new::<Level>(&[]);
        let container = container_with_amount(None);
        let info = InformationProviders::new();

        let gate = check(
            &[own.clone(), own],
            &[missing.clone()],
            Some(&value(-1i64)),
            &container,
            &info,
        );
        assert_eq!(gate.unsatisfied.len(), 2);
        assert_eq!(gate.missing, vec![missing]);
    }
}
