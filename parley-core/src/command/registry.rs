//! The catalog of commands, groups and argument types.
//!
//! One [`Registry`] belongs to one bot instance; nothing here is global. Commands are kept in
//! registration order, which is also the order their patterns are tried in.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use super::arguments::types::{default_types, TArgumentType};
use super::builder::CommandBuilder;
use super::errors::RegistrationError;
use super::group::CommandGroup;
use super::Command;

#[derive(Default)]
struct Catalog {
    commands: Vec<Arc<Command>>,
    groups: Vec<Arc<CommandGroup>>,
    types: Vec<TArgumentType>,
}

impl Catalog {
    fn name_taken(&self, name: &str, except: Option<&str>) -> bool {
        self.commands
            .iter()
            .filter(|c| Some(c.name.as_str()) != except)
            .any(|c| c.name == name || c.aliases.iter().any(|a| a == name))
    }

    /// Checks everything a new or replacement command must not collide with.
    fn check_conflicts(&self, command: &Command, replacing: Option<&str>) -> Result<(), RegistrationError> {
        if !self.groups.iter().any(|g| g.id == command.group_id) {
            return Err(RegistrationError::UnknownGroup(command.group_id.clone()));
        }

        for name in std::iter::once(&command.name).chain(&command.aliases) {
            if self.name_taken(name, replacing) {
                return Err(RegistrationError::DuplicateName(name.clone()));
            }
        }

        let others = self
            .commands
            .iter()
            .filter(|c| Some(c.name.as_str()) != replacing)
            .collect::<Vec<_>>();

        if others
            .iter()
            .any(|c| c.group_id == command.group_id && c.member_name == command.member_name)
        {
            return Err(RegistrationError::DuplicateMemberName {
                member_name: command.member_name.clone(),
                group: command.group_id.clone(),
            });
        }
        if command.unknown {
            if let Some(existing) = others.iter().find(|c| c.unknown) {
                return Err(RegistrationError::DuplicateUnknownCommand(existing.name.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct Registry {
    catalog: RwLock<Catalog>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register_group(&self, group: CommandGroup) -> Result<Arc<CommandGroup>, RegistrationError> {
        let mut catalog = self.write();
        if catalog.groups.iter().any(|g| g.id == group.id) {
            return Err(RegistrationError::DuplicateGroup(group.id));
        }

        debug!("registry: registered group {}", group.id);
        let group = Arc::new(group);
        catalog.groups.push(group.clone());
        Ok(group)
    }

    pub fn register_groups(&self, groups: impl IntoIterator<Item = CommandGroup>) -> Result<(), RegistrationError> {
        for group in groups {
            self.register_group(group)?;
        }
        Ok(())
    }

    pub fn register_command(&self, builder: CommandBuilder) -> Result<Arc<Command>, RegistrationError> {
        let command = builder.build(self)?;

        let mut catalog = self.write();
        catalog.check_conflicts(&command, None)?;

        debug!("registry: registered command {}:{}", command.group_id, command.member_name);
        let command = Arc::new(command);
        catalog.commands.push(command.clone());
        Ok(command)
    }

    pub fn register_commands(&self, builders: impl IntoIterator<Item = CommandBuilder>) -> Result<(), RegistrationError> {
        for builder in builders {
            self.register_command(builder)?;
        }
        Ok(())
    }

    pub fn register_type(&self, kind: TArgumentType) -> Result<(), RegistrationError> {
        let mut catalog = self.write();
        if catalog.types.iter().any(|t| t.id() == kind.id()) {
            return Err(RegistrationError::DuplicateType(kind.id().to_owned()));
        }

        debug!("registry: registered argument type {}", kind.id());
        catalog.types.push(kind);
        Ok(())
    }

    pub fn register_types(&self, types: impl IntoIterator<Item = TArgumentType>) -> Result<(), RegistrationError> {
        for kind in types {
            self.register_type(kind)?;
        }
        Ok(())
    }

    /// Registers the built-in argument types: string, integer, float, boolean, user, channel,
    /// role, command and group.
    pub fn register_default_types(&self) -> Result<(), RegistrationError> {
        self.register_types(default_types())
    }

    /// Swaps a registered command for a new definition of it, keeping its place in the catalog.
    /// The name, group and member name cannot change.
    pub fn reregister_command(&self, builder: CommandBuilder) -> Result<Arc<Command>, RegistrationError> {
        let command = builder.build(self)?;

        let mut catalog = self.write();
        let Some(index) = catalog.commands.iter().position(|c| c.name == command.name) else {
            return Err(RegistrationError::UnknownCommand(command.name));
        };

        let old = &catalog.commands[index];
        if old.group_id != command.group_id {
            return Err(RegistrationError::ImmutableField("group"));
        }
        if old.member_name != command.member_name {
            return Err(RegistrationError::ImmutableField("member name"));
        }
        catalog.check_conflicts(&command, Some(&command.name))?;

        info!("registry: reloaded command {}:{}", command.group_id, command.member_name);
        let command = Arc::new(command);
        catalog.commands[index] = command.clone();
        Ok(command)
    }

    pub fn unregister_command(&self, name: &str) -> Result<Arc<Command>, RegistrationError> {
        let mut catalog = self.write();
        let Some(index) = catalog.commands.iter().position(|c| c.name == name) else {
            return Err(RegistrationError::UnknownCommand(name.to_owned()));
        };

        let command = catalog.commands.remove(index);
        info!("registry: unloaded command {}:{}", command.group_id, command.member_name);
        Ok(command)
    }

    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.read().commands.clone()
    }

    pub fn groups(&self) -> Vec<Arc<CommandGroup>> {
        self.read().groups.clone()
    }

    /// The commands of a group, in registration order.
    pub fn group_commands(&self, group_id: &str) -> Vec<Arc<Command>> {
        self.read()
            .commands
            .iter()
            .filter(|c| c.group_id == group_id)
            .cloned()
            .collect()
    }

    pub fn unknown_command(&self) -> Option<Arc<Command>> {
        self.read().commands.iter().find(|c| c.unknown).cloned()
    }

    pub fn resolve_type(&self, id: &str) -> Option<TArgumentType> {
        self.read().types.iter().find(|t| t.id() == id).cloned()
    }

    /// The single command `name` identifies exactly, if there is one.
    pub fn resolve_command(&self, name: &str) -> Option<Arc<Command>> {
        match &self.find_commands(name, true)[..] {
            [command] => Some(command.clone()),
            _ => None,
        }
    }

    pub fn resolve_group(&self, id: &str) -> Option<Arc<CommandGroup>> {
        let id = id.to_lowercase();
        self.read().groups.iter().find(|g| g.id == id).cloned()
    }

    /// Searches commands by name, alias or `group:member`.
    ///
    /// An exact search matches those verbatim. An inexact search matches names and aliases
    /// containing `query`, unless exactly one name or alias equals it, in which case only that
    /// command is returned. An empty query returns every command.
    pub fn find_commands(&self, query: &str, exact: bool) -> Vec<Arc<Command>> {
        let catalog = self.read();
        if query.is_empty() {
            return catalog.commands.clone();
        }

        let query = query.to_lowercase();
        let qualified = |c: &Command| format!("{}:{}", c.group_id, c.member_name) == query;
        let named = |c: &Command| c.name == query || c.aliases.iter().any(|a| *a == query);

        let matched = catalog
            .commands
            .iter()
            .filter(|c| {
                if exact {
                    named(c) || qualified(c)
                } else {
                    c.name.contains(&query) || c.aliases.iter().any(|a| a.contains(&query)) || qualified(c)
                }
            })
            .cloned()
            .collect::<Vec<_>>();

        if !exact {
            if let Some(verbatim) = matched.iter().find(|c| named(c)) {
                return vec![verbatim.clone()];
            }
        }
        matched
    }

    /// Searches groups by id or name, with the same exact/inexact rules as
    /// [`find_commands`](Registry::find_commands).
    pub fn find_groups(&self, query: &str, exact: bool) -> Vec<Arc<CommandGroup>> {
        let catalog = self.read();
        if query.is_empty() {
            return catalog.groups.clone();
        }

        let query = query.to_lowercase();
        let named = |g: &CommandGroup| g.id == query || g.name.to_lowercase() == query;

        let matched = catalog
            .groups
            .iter()
            .filter(|g| named(g) || (!exact && (g.id.contains(&query) || g.name.to_lowercase().contains(&query))))
            .cloned()
            .collect::<Vec<_>>();

        if !exact {
            if let Some(verbatim) = matched.iter().find(|g| named(g)) {
                return vec![verbatim.clone()];
            }
        }
        matched
    }
}
