use std::sync::Arc;

use super::{Command, CommandId, CommandTree};

struct Registration {
    id: CommandId,
    owner: String,
}

/// Registered top-level commands, grouped by owner, and the tree holding
/// them with their sub-commands.
#[derive(Default)]
pub struct CommandManager {
    tree: CommandTree,
    registrations: Vec<Registration>,
}

impl CommandManager {
    pub fn new() -> CommandManager {
        CommandManager::default()
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Registers a top-level command.
    pub fn register(&mut self, command: Command, owner: &str) -> CommandId {
        trace!("register: {} (owner={})", command.name, owner);
        let id = self.tree.insert(command, None);
        self.registrations.push(Registration {
            id,
            owner: owner.to_owned(),
        });
        id
    }

    /// Attaches a sub-command. Returns `None` if `parent` is not registered.
    pub fn register_sub_command(&mut self, parent: CommandId, command: Command) -> Option<CommandId> {
        if !self.tree.contains(parent) {
            return None;
        }

        trace!("register: {} under {:?}", command.name, self.tree.path(parent));
        Some(self.tree.insert(command, Some(parent)))
    }

    /// Removes a top-level command and its sub-commands. With `owner` set,
    /// only a registration by that owner is removed.
    pub fn unregister(&mut self, id: CommandId, owner: Option<&str>) -> bool {
        let before = self.registrations.len();
        self.registrations
            .retain(|r| !(r.id == id && owner.map_or(true, |o| r.owner == o)));
        if self.registrations.len() == before {
            return false;
        }

        self.tree.remove(id);
        true
    }

    /// Returns the number of removed top-level commands.
    pub fn unregister_owner(&mut self, owner: &str) -> usize {
        let removed: Vec<CommandId> = self
            .registrations
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.id)
            .collect();

        for id in &removed {
            self.unregister(*id, Some(owner));
        }

        removed.len()
    }

    pub fn is_registered(&self, id: CommandId, owner: Option<&str>) -> bool {
        self.registrations
            .iter()
            .any(|r| r.id == id && owner.map_or(true, |o| r.owner == o))
    }

    /// The owner of the top-level command `id` belongs to.
    pub fn owner_of(&self, id: CommandId) -> Option<&str> {
        let root = self.tree.ancestors(id).last().copied().unwrap_or(id);
        self.registrations
            .iter()
            .find(|r| r.id == root)
            .map(|r| r.owner.as_str())
    }

    pub fn command(&self, id: CommandId) -> Option<&Arc<Command>> {
        self.tree.get(id)
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.tree.parent(id)
    }

    pub fn sub_commands(&self, id: CommandId) -> &[CommandId] {
        self.tree.sub_commands(id)
    }

    /// Top-level commands in registration order, all of them if `owner` is
    /// `None`.
    pub fn root_commands(&self, owner: Option<&str>) -> Vec<CommandId> {
        self.registrations
            .iter()
            .filter(|r| owner.map_or(true, |o| r.owner == o))
            .map(|r| r.id)
            .collect()
    }

    /// Every registered command, each top-level command followed by its
    /// sub-commands.
    pub fn all_commands(&self) -> Vec<CommandId> {
        self.registrations
            .iter()
            .flat_map(|r| self.tree.descendants(r.id))
            .collect()
    }

    pub fn find_root(&self, word: &str, owner: Option<&str>) -> Option<CommandId> {
        self.resolve(word, &self.root_commands(owner))
    }

    pub fn find_sub_command(&self, parent: CommandId, word: &str) -> Option<CommandId> {
        self.resolve(word, self.tree.sub_commands(parent))
    }

    /// Follows `path` from a top-level command, e.g. `["config", "set"]`.
    pub fn find_by_path(&self, path: &[&str], owner: Option<&str>) -> Option<CommandId> {
        let (first, rest) = path.split_first()?;
        let mut current = self.find_root(first, owner)?;
        for word in rest {
            current = self.find_sub_command(current, word)?;
        }
        Some(current)
    }

    /// Picks the command `word` refers to among `candidates`. Commands with an
    /// exact name or alias equal to `word` are preferred over pattern
    /// matches. Among several matches the lowest `order` wins, then the
    /// earliest candidate.
    pub fn resolve(&self, word: &str, candidates: &[CommandId]) -> Option<CommandId> {
        let pick = |exact: bool| {
            candidates
                .iter()
                .enumerate()
                .filter_map(|(position, id)| self.tree.get(*id).map(|c| (position, *id, c)))
                .filter(|(_, _, c)| {
                    if exact {
                        c.matches_exact(word)
                    } else {
                        c.matches_pattern(word)
                    }
                })
                .min_by_key(|(position, _, c)| (c.order, *position))
                .map(|(_, id, _)| id)
        };

        pick(true).or_else(|| pick(false))
    }

    /// Repairs the tree links. See [`CommandTree::prepare`].
    pub fn prepare(&mut self) -> usize {
        self.tree.prepare()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandName;
    use pretty_assertions::assert_eq;

    #[test]
    fn exact_names_win_over_patterns() {
        let mut manager = CommandManager::new();
        let exact = manager.register(Command::new("a"), "test");
        let pattern = manager.register(Command::new(CommandName::pattern(r"a\d+").unwrap()), "test");

        assert_eq!(manager.find_root("a", None), Some(exact));
        assert_eq!(manager.find_root("a1", None), Some(pattern));
        assert_eq!(manager.find_root("b", None), None);
    }

    #[test]
    fn order_then_registration_breaks_ties() {
        let mut manager = CommandManager::new();
        let first = manager.register(Command::new("x"), "test");
        let low = manager.register(Command::new("y").with_alias("x").with_order(-1), "test");
        let late = manager.register(Command::new("z").with_alias("x").with_order(-1), "test");
        let p1 = manager.register(Command::new(CommandName::pattern("p.").unwrap()), "test");
        let _p2 = manager.register(Command::new(CommandName::pattern("p1").unwrap()), "test");

        assert_eq!(manager.find_root("x", None), Some(low));
        assert!(manager.unregister(low, None));
        assert_eq!(manager.find_root("x", None), Some(late));
        assert!(manager.unregister(late, None));
        assert_eq!(manager.find_root("x", None), Some(first));
        assert_eq!(manager.find_root("p1", None), Some(p1));
    }

    #[test]
    fn owners() {
        let mut manager = CommandManager::new();
        let a = manager.register(Command::new("a"), "alice");
        let b = manager.register(Command::new("b"), "bob");
        let b2 = manager.register(Command::new("b2"), "bob");
        let sub = manager.register_sub_command(b, Command::new("sub")).unwrap();

        assert_eq!(manager.find_root("a", Some("bob")), None);
        assert_eq!(manager.find_root("a", Some("alice")), Some(a));
        assert_eq!(manager.owner_of(sub), Some("bob"));
        assert!(manager.is_registered(a, Some("alice")));
        assert!(!manager.is_registered(a, Some("bob")));
        assert!(!manager.unregister(a, Some("bob")));

        assert_eq!(manager.all_commands(), vec![a, b, sub, b2]);
        assert_eq!(manager.unregister_owner("bob"), 2);
        assert_eq!(manager.all_commands(), vec![a]);
        assert!(manager.command(sub).is_none());
        assert_eq!(manager.register_sub_command(b, Command::new("late")), None);
    }

    #[test]
    fn paths() {
        let mut manager = CommandManager::new();
        let config = manager.register(Command::new("config"), "test");
        let set = manager.register_sub_command(config, Command::new("set")).unwrap();
        assert_eq!(manager.find_by_path(&["config", "set"], None), Some(set));
        assert_eq!(manager.find_by_path(&["config", "get"], None), None);
        assert_eq!(manager.find_by_path(&[], None), None);
    }
}
