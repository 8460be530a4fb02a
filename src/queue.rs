//! Registration of commands declared before the commands they attach to.
use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::command::{Command, CommandId, CommandManager};

/// Where a built command goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Root,
    SubCommandOf(CommandId),
}

/// The commands a queue has built so far, in build order.
pub struct CreatedCommands<'a> {
    manager: &'a CommandManager,
    ids: &'a [CommandId],
}

impl<'a> CreatedCommands<'a> {
    pub fn ids(&self) -> &[CommandId] {
        self.ids
    }

    pub fn manager(&self) -> &CommandManager {
        self.manager
    }

    /// The first created command with `name` as its name or an exact alias.
    pub fn find(&self, name: &str) -> Option<CommandId> {
        self.ids
            .iter()
            .copied()
            .find(|id| self.manager.command(*id).map_or(false, |c| c.matches_exact(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

type Factory = dyn FnOnce(&CreatedCommands<'_>) -> (Command, Placement);
type DependencyCheck = dyn Fn(&CreatedCommands<'_>) -> bool;

struct QueuedCommand {
    location: String,
    name: String,
    factory: Box<Factory>,
    check: Box<DependencyCheck>,
    provider: Box<dyn Fn() -> String>,
}

/// A queued command whose dependency never appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckCommand {
    /// What the command waits for, as described by its provider.
    pub dependency: String,
    pub name: String,
    pub location: String,
}

impl fmt::Display for StuckCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sub command {} for command {} (in {}) is missing.",
            self.dependency, self.name, self.location
        )
    }
}

fn describe(stuck: &[StuckCommand]) -> String {
    stuck
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Missing or cyclic dependencies between queued commands. This is a
/// mistake in the command declarations, not in user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved command dependencies:\n{}", describe(.stuck))]
pub struct UnresolvedDependencies {
    pub stuck: Vec<StuckCommand>,
}

/// Builds commands once the commands they depend on exist.
///
/// A command is built as soon as its dependency check passes against the
/// commands this queue created. The others wait for [`resolve`].
///
/// [`resolve`]: CommandFactoryQueue::resolve
pub struct CommandFactoryQueue {
    owner: String,
    created: Vec<CommandId>,
    pending: VecDeque<QueuedCommand>,
    /// Built commands whose parent was gone when they were registered.
    orphaned: Vec<StuckCommand>,
}

impl CommandFactoryQueue {
    /// Top-level commands built by the queue are registered for `owner`.
    pub fn new(owner: &str) -> CommandFactoryQueue {
        CommandFactoryQueue {
            owner: owner.to_owned(),
            created: Vec::new(),
            pending: VecDeque::new(),
            orphaned: Vec::new(),
        }
    }

    pub fn created(&self) -> &[CommandId] {
        &self.created
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Builds the command now if `check` passes, otherwise defers it.
    /// `provider` describes the dependency for diagnostics.
    pub fn queue_command<F, C, P>(
        &mut self,
        manager: &mut CommandManager,
        location: &str,
        name: &str,
        factory: F,
        check: C,
        provider: P,
    ) -> Option<CommandId>
    where
        F: FnOnce(&CreatedCommands<'_>) -> (Command, Placement) + 'static,
        C: Fn(&CreatedCommands<'_>) -> bool + 'static,
        P: Fn() -> String + 'static,
    {
        let queued = QueuedCommand {
            location: location.to_owned(),
            name: name.to_owned(),
            factory: Box::new(factory),
            check: Box::new(check),
            provider: Box::new(provider),
        };

        if self.is_ready(manager, &queued) {
            self.build(manager, queued)
        } else {
            trace!("queue: deferring {} ({})", queued.name, queued.location);
            self.pending.push_back(queued);
            None
        }
    }

    fn is_ready(&self, manager: &CommandManager, queued: &QueuedCommand) -> bool {
        let created = CreatedCommands {
            manager,
            ids: &self.created,
        };
        (queued.check)(&created)
    }

    fn build(&mut self, manager: &mut CommandManager, queued: QueuedCommand) -> Option<CommandId> {
        let QueuedCommand {
            location,
            name,
            factory,
            provider,
            ..
        } = queued;
        let (command, placement) = {
            let created = CreatedCommands {
                manager: &*manager,
                ids: &self.created,
            };
            factory(&created)
        };

        let id = match placement {
            Placement::Root => Some(manager.register(command, &self.owner)),
            Placement::SubCommandOf(parent) => manager.register_sub_command(parent, command),
        };

        match id {
            Some(id) => {
                debug!("queue: built {} ({})", name, location);
                self.created.push(id);
            }
            None => {
                error!("queue: parent of {} ({}) is not registered, dropping it", name, location);
                self.orphaned.push(StuckCommand {
                    dependency: provider(),
                    name,
                    location,
                });
            }
        }

        id
    }

    /// Builds every deferred command whose dependencies are now met, until a
    /// full pass over the deferred ones builds nothing. Returns all commands
    /// built by this queue. Commands left over, and commands whose parent
    /// was not registered, are dropped and reported.
    pub fn resolve(&mut self, manager: &mut CommandManager) -> Result<Vec<CommandId>, UnresolvedDependencies> {
        let mut idle = 0;
        while idle < self.pending.len() {
            let queued = match self.pending.pop_front() {
                Some(queued) => queued,
                None => break,
            };

            if self.is_ready(manager, &queued) {
                self.build(manager, queued);
                idle = 0;
            } else {
                self.pending.push_back(queued);
                idle += 1;
            }
        }

        manager.prepare();

        if self.pending.is_empty() && self.orphaned.is_empty() {
            trace!("queue: resolved {} commands", self.created.len());
            return Ok(self.created.clone());
        }

        let mut stuck: Vec<StuckCommand> = self.orphaned.drain(..).collect();
        stuck.extend(self.pending.drain(..).map(|queued| StuckCommand {
            dependency: (queued.provider)(),
            name: queued.name,
            location: queued.location,
        }));
        error!("queue: {} commands have unresolved dependencies", stuck.len());
        Err(UnresolvedDependencies { stuck })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queue(
        queue: &mut CommandFactoryQueue,
        manager: &mut CommandManager,
        name: &'static str,
        parent: Option<&'static str>,
    ) -> Option<CommandId> {
        queue.queue_command(
            manager,
            "tests.rs",
            name,
            move |created: &CreatedCommands<'_>| {
                let placement = match parent.and_then(|p| created.find(p)) {
                    Some(id) => Placement::SubCommandOf(id),
                    None => Placement::Root,
                };
                (Command::new(name), placement)
            },
            move |created: &CreatedCommands<'_>| parent.map_or(true, |p| created.contains(p)),
            move || parent.unwrap_or("-").to_owned(),
        )
    }

    fn paths(manager: &CommandManager) -> Vec<String> {
        let mut paths: Vec<String> = manager
            .all_commands()
            .into_iter()
            .map(|id| manager.tree().path(id).join(" "))
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let declared = [("config", None), ("set", Some("config")), ("key", Some("set"))];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in &orders {
            let mut manager = CommandManager::new();
            let mut q = CommandFactoryQueue::new("test");
            for i in order {
                let (name, parent) = declared[*i];
                queue(&mut q, &mut manager, name, parent);
            }

            let created = q.resolve(&mut manager).unwrap();
            assert_eq!(created.len(), 3);
            assert_eq!(paths(&manager), vec!["config", "config set", "config set key"]);
            assert_eq!(q.pending(), 0);
        }
    }

    #[test]
    fn ready_commands_are_built_immediately() {
        let mut manager = CommandManager::new();
        let mut q = CommandFactoryQueue::new("test");
        assert!(queue(&mut q, &mut manager, "config", None).is_some());
        assert!(queue(&mut q, &mut manager, "set", Some("config")).is_some());
        assert!(queue(&mut q, &mut manager, "orphan", Some("nowhere")).is_none());
        assert_eq!(q.pending(), 1);
        assert_eq!(manager.owner_of(q.created()[1]), Some("test"));
    }

    #[test]
    fn cycles_name_every_stuck_command() {
        let mut manager = CommandManager::new();
        let mut q = CommandFactoryQueue::new("test");
        queue(&mut q, &mut manager, "a", Some("b"));
        queue(&mut q, &mut manager, "b", Some("a"));
        queue(&mut q, &mut manager, "c", None);

        let err = q.resolve(&mut manager).unwrap_err();
        let names: Vec<&str> = err.stuck.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        let message = err.to_string();
        assert!(message.contains("Sub command b for command a (in tests.rs) is missing."));
        assert!(message.contains("Sub command a for command b (in tests.rs) is missing."));
        assert_eq!(q.pending(), 0);
        assert_eq!(paths(&manager), vec!["c"]);
    }

    #[test]
    fn unregistered_parents_are_reported() {
        let mut manager = CommandManager::new();
        let gone = manager.register(Command::new("guild"), "test");
        assert!(manager.unregister(gone, None));

        let mut q = CommandFactoryQueue::new("test");
        let built = q.queue_command(
            &mut manager,
            "tests.rs",
            "list",
            move |_: &CreatedCommands<'_>| (Command::new("list"), Placement::SubCommandOf(gone)),
            |_: &CreatedCommands<'_>| true,
            || "guild".to_owned(),
        );
        assert!(built.is_none());
        queue(&mut q, &mut manager, "config", None);

        let err = q.resolve(&mut manager).unwrap_err();
        assert_eq!(
            err.stuck,
            vec![StuckCommand {
                dependency: "guild".to_owned(),
                name: "list".to_owned(),
                location: "tests.rs".to_owned(),
            }]
        );
        assert_eq!(paths(&manager), vec!["config"]);
        assert!(q.resolve(&mut manager).is_ok());
    }
}
