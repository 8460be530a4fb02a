use std::sync::Arc;

use super::Command;

/// A handle to a command in a [`CommandTree`]. Handles are never reused, so
/// a handle of a removed command stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(usize);

impl CommandId {
    pub fn index(self) -> usize {
        self.0
    }
}

struct Node {
    command: Arc<Command>,
    parent: Option<CommandId>,
    sub_commands: Vec<CommandId>,
    removed: bool,
}

/// An arena of commands. A command appears in the sub-commands of its
/// parent iff its parent link points to that parent.
#[derive(Default)]
pub struct CommandTree {
    nodes: Vec<Node>,
}

impl CommandTree {
    pub fn new() -> CommandTree {
        CommandTree::default()
    }

    /// Adds a command, as a sub-command of `parent` if given. The parent must
    /// be alive.
    pub fn insert(&mut self, command: Command, parent: Option<CommandId>) -> CommandId {
        let id = CommandId(self.nodes.len());
        debug_assert!(parent.map_or(true, |p| self.contains(p)));
        self.nodes.push(Node {
            command: Arc::new(command),
            parent,
            sub_commands: Vec::new(),
            removed: false,
        });

        if let Some(parent) = parent {
            self.nodes[parent.0].sub_commands.push(id);
        }

        id
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.nodes.get(id.0).map_or(false, |n| !n.removed)
    }

    fn node(&self, id: CommandId) -> Option<&Node> {
        self.nodes.get(id.0).filter(|n| !n.removed)
    }

    pub fn get(&self, id: CommandId) -> Option<&Arc<Command>> {
        self.node(id).map(|n| &n.command)
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn sub_commands(&self, id: CommandId) -> &[CommandId] {
        self.node(id).map(|n| n.sub_commands.as_slice()).unwrap_or(&[])
    }

    /// The parent, the grandparent and so on.
    pub fn ancestors(&self, id: CommandId) -> Vec<CommandId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// `id` and everything below it, depth-first.
    pub fn descendants(&self, id: CommandId) -> Vec<CommandId> {
        let mut found = Vec::new();
        if self.contains(id) {
            self.collect_descendants(id, &mut found);
        }
        found
    }

    fn collect_descendants(&self, id: CommandId, found: &mut Vec<CommandId>) {
        found.push(id);
        for sub in self.sub_commands(id) {
            self.collect_descendants(*sub, found);
        }
    }

    /// Names from the root command down to `id`, e.g. `["config", "set"]`.
    pub fn path(&self, id: CommandId) -> Vec<String> {
        let mut path: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|a| self.get(a))
            .map(|c| c.name.to_string())
            .collect();
        if let Some(command) = self.get(id) {
            path.push(command.name.to_string());
        }
        path
    }

    /// Removes a command and its sub-commands.
    pub fn remove(&mut self, id: CommandId) -> bool {
        if !self.contains(id) {
            return false;
        }

        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].sub_commands.retain(|s| *s != id);
        }

        for removed in self.descendants(id) {
            self.nodes[removed.0].removed = true;
        }

        true
    }

    /// Restores the parent/sub-command invariant from the parent links and
    /// drops links to removed commands. Returns the number of links fixed.
    pub fn prepare(&mut self) -> usize {
        let mut fixed = 0;
        let parents: Vec<(CommandId, Option<CommandId>)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed)
            .map(|(i, n)| (CommandId(i), n.parent))
            .collect();

        for i in 0..self.nodes.len() {
            if self.nodes[i].removed {
                continue;
            }

            let id = CommandId(i);
            let expected: Vec<CommandId> = parents
                .iter()
                .filter(|(_, p)| *p == Some(id))
                .map(|(c, _)| *c)
                .collect();

            let node = &mut self.nodes[i];
            let before = node.sub_commands.len();
            node.sub_commands.retain(|s| expected.contains(s));
            fixed += before - node.sub_commands.len();
            for child in expected {
                if !node.sub_commands.contains(&child) {
                    node.sub_commands.push(child);
                    fixed += 1;
                }
            }
        }

        if fixed > 0 {
            warn!("command tree: repaired {} parent/sub-command links", fixed);
        }

        fixed
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
