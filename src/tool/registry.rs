//! Name-keyed registry of the capabilities one agent may invoke.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::{BoxedTool, ToolDefinition};

/// A collection of tools owned by a single agent.
///
/// Names are unique per registry; a duplicate insertion is a configuration
/// error and prevents the agent from being built. Lookup happens once per
/// tool call, by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, BoxedTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a tool with the same name is
    /// already registered.
    pub fn add(&mut self, tool: BoxedTool) -> Result<()> {
        use std::collections::btree_map::Entry;

        let name = tool.name().to_owned();
        match self.tools.entry(name) {
            Entry::Occupied(e) => Err(Error::configuration(format!(
                "tool with name '{}' already registered",
                e.key()
            ))),
            Entry::Vacant(e) => {
                e.insert(tool);
                Ok(())
            }
        }
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoxedTool> {
        self.tools.get(name)
    }

    /// Check whether a tool with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions of every registered tool, in name order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Names of every registered tool.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
