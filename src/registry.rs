//! Command registry for a multi-call binary
//!
//! The registry owns the root command (the multi-call binary itself) and every
//! command that should be reachable both as a subcommand of the root and as its
//! own installed symlink. Commands are kept in a single insertion-ordered map,
//! with aliases indexed separately, so there is exactly one view of what is
//! registered.

use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

/// The capabilities the registry, resolver and installer need from a command.
///
/// Anything with a name and optional aliases can be registered; how the command
/// actually runs is up to the execution engine behind it.
pub trait Invocable: Sized {
    /// The name the command is registered, resolved and installed under.
    fn name(&self) -> &str;

    /// Alternative names accepted during alias-aware resolution.
    fn aliases(&self) -> &[String] {
        &[]
    }

    /// Detach and return the direct children of this command, each with its own subtree.
    fn take_subcommands(&mut self) -> Vec<Self> {
        Vec::new()
    }
}

/// A root command plus the ordered set of commands exploded from it.
#[derive(Debug, Clone)]
pub struct Registry<C> {
    root: C,
    commands: IndexMap<String, C>,
    aliases: HashMap<String, String>,
}

impl<C: Invocable> Registry<C> {
    #[must_use]
    pub fn new(root: C) -> Self {
        Self {
            root,
            commands: IndexMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a command, making it a subcommand of the root and an installable symlink.
    ///
    /// No duplicate validation is performed: registering a name twice replaces the
    /// earlier command in place, and the earlier command's aliases are forgotten.
    pub fn add_command(&mut self, cmd: C) {
        let name = cmd.name().to_string();
        if let Some(previous) = self.commands.get(&name) {
            debug!("Command '{name}' shadows an earlier registration");
            for alias in previous.aliases() {
                if self.aliases.get(alias) == Some(&name) {
                    self.aliases.remove(alias);
                }
            }
        }
        for alias in cmd.aliases() {
            self.aliases.insert(alias.clone(), name.clone());
        }
        self.commands.insert(name, cmd);
    }

    /// Register every direct child of `other`, preserving each child's own subtree.
    pub fn import_commands(&mut self, mut other: C) {
        for cmd in other.take_subcommands() {
            self.add_command(cmd);
        }
    }

    /// The root command. Subcommands attached here are not exploded into symlinks.
    #[must_use]
    pub fn root(&self) -> &C {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut C {
        &mut self.root
    }

    /// Registered commands in registration order. Root-only subcommands are not included.
    pub fn commands(&self) -> impl ExactSizeIterator<Item = &C> {
        self.commands.values()
    }

    /// Look up a registered command by its exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&C> {
        self.commands.get(name)
    }

    /// Look up a registered command by one of its aliases.
    #[must_use]
    pub fn find_alias(&self, alias: &str) -> Option<&C> {
        self.aliases
            .get(alias)
            .and_then(|name| self.commands.get(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
