use crate::command::{CommandContainer, CommandManager};
use crate::dispatch::{CommandResult, Dispatcher};
use crate::information::InformationProviders;
use crate::parser::{self, ParseFail};

/// The commands of a console and the dispatcher running them.
#[derive(Default)]
pub struct CommandProcessor {
    manager: CommandManager,
    dispatcher: Dispatcher,
}

impl CommandProcessor {
    pub fn new() -> CommandProcessor {
        CommandProcessor::default()
    }

    pub fn with_manager(manager: CommandManager) -> CommandProcessor {
        CommandProcessor {
            manager,
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn manager(&self) -> &CommandManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut CommandManager {
        &mut self.manager
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn parse(&self, raw: &str, owner: Option<&str>) -> Result<Vec<CommandContainer>, ParseFail> {
        parser::parse(&self.manager, raw, owner)
    }

    pub fn parse_with_owner_fn(
        &self,
        raw: &str,
        owner_of: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Vec<CommandContainer>, ParseFail> {
        parser::parse_with_owner_fn(&self.manager, raw, owner_of)
    }

    pub fn dispatch(&self, containers: Vec<CommandContainer>, info: &InformationProviders) -> Vec<CommandResult> {
        self.dispatcher.dispatch(containers, info)
    }

    /// Parses the whole line first; nothing is dispatched if it fails.
    pub fn parse_and_dispatch(
        &self,
        raw: &str,
        owner: Option<&str>,
        info: &InformationProviders,
    ) -> Result<Vec<CommandResult>, ParseFail> {
        let containers = self.parse(raw, owner)?;
        debug!("processor: dispatching {} commands", containers.len());
        Ok(self.dispatch(containers, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{types, value, Argument};
    use crate::command::Command;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_dispatch() {
        let mut processor = CommandProcessor::new();
        processor.manager_mut().register(
            Command::new("add")
                .with_argument(Argument::new("a", types::integer::<i64>()))
                .with_argument(Argument::new("b", types::integer::<i64>()))
                .with_handler(|c, _, _| {
                    let a = c.value::<i64>("a")?;
                    let b = c.value::<i64>("b")?;
                    Some(value(a + b))
                }),
            "test",
        );

        let info = InformationProviders::new();
        let results = processor.parse_and_dispatch("add 1 2 add 3 4", None, &info).unwrap();
        let sums: Vec<i64> = results.iter().filter_map(|r| r.value::<i64>().copied()).collect();
        assert_eq!(sums, vec![3, 7]);

        assert!(processor.parse_and_dispatch("add 1", None, &info).is_err());
        assert!(processor.parse_and_dispatch("add 1 2", Some("someone"), &info).is_err());
    }
}
