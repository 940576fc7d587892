use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::callbacks::Location;
use crate::usr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacroId(pub u32);

/// One `#define` (or command-line `-D`) of a macro name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub id: MacroId,
    /// First definition of the redefinition chain this one belongs to.
    pub chain_head: MacroId,
    pub name: String,
    /// `Some` for function-like macros.
    pub parameters: Option<Vec<String>>,
    pub body: String,
    /// `None` for built-in and command-line definitions.
    pub location: Option<Location>,
    pub usr: String,
    /// The `#define` is the guard of an include-guarded header.
    pub used_for_header_guard: bool,
}

impl MacroDefinition {
    pub fn is_function_like(&self) -> bool {
        self.parameters.is_some()
    }

    pub fn is_command_line(&self) -> bool {
        self.location.is_none()
    }
}

/// Macro definitions in effect at the current point of a translation unit.
#[derive(Debug, Default)]
pub struct MacroTable {
    definitions: HashMap<String, MacroDefinition>,
    next_id: u32,
}

/// What a `#define` looks like before it is registered.
pub(crate) struct PendingDefinition<'a> {
    pub name: &'a str,
    pub parameters: Option<Vec<String>>,
    pub body: String,
    pub location: Option<Location>,
    pub file_path: Option<&'a str>,
    pub used_for_header_guard: bool,
}

impl MacroTable {
    pub fn definition(&self, name: &str) -> Option<&MacroDefinition> {
        self.definitions.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Whether the definition of `name` in effect at end of file is an
    /// include guard.
    pub fn is_header_guard(&self, name: &str) -> bool {
        self.definitions
            .get(name)
            .is_some_and(|definition| definition.used_for_header_guard)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Register a definition. A redefinition joins the chain of the
    /// definition it replaces and keeps its USR.
    pub(crate) fn define(&mut self, pending: PendingDefinition<'_>) -> &MacroDefinition {
        let id = MacroId(self.next_id);
        self.next_id += 1;

        let (chain_head, usr) = match self.definitions.get(pending.name) {
            Some(previous) => (previous.chain_head, previous.usr.clone()),
            None => {
                let usr = match (pending.file_path, pending.location) {
                    (Some(path), Some(location)) => usr::macro_usr(path, location.offset, pending.name),
                    _ => usr::command_line_macro_usr(pending.name),
                };
                (id, usr)
            }
        };

        let definition = MacroDefinition {
            id,
            chain_head,
            name: pending.name.to_string(),
            parameters: pending.parameters,
            body: pending.body,
            location: pending.location,
            usr,
            used_for_header_guard: pending.used_for_header_guard,
        };
        match self.definitions.entry(definition.name.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(definition);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(definition),
        }
    }

    pub(crate) fn undefine(&mut self, name: &str) -> Option<MacroDefinition> {
        self.definitions.remove(name)
    }
}
