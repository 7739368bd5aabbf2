//! Operation catalog and read-only permission filter

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use super::Handler;
use crate::protocol::Tool;
use crate::schema::ToolSchema;
use crate::{Error, Result};

/// Whether an operation may run in read-only mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Never mutates backend state
    ReadOnlySafe,
    /// May mutate backend state
    WriteRequired,
}

impl Permission {
    /// True for [`Permission::ReadOnlySafe`]
    #[must_use]
    pub fn is_read_only(self) -> bool {
        self == Self::ReadOnlySafe
    }
}

/// Static table entry binding an operation name to its handler
#[derive(Clone, Copy)]
pub struct OperationSpec {
    /// Operation name, matching its `tools.yaml` entry
    pub name: &'static str,
    /// Read-only classification
    pub permission: Permission,
    /// Implementation
    pub handler: Handler,
}

impl OperationSpec {
    /// Read-only operation
    pub const fn read(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            permission: Permission::ReadOnlySafe,
            handler,
        }
    }

    /// Mutating operation
    pub const fn write(name: &'static str, handler: Handler) -> Self {
        Self {
            name,
            permission: Permission::WriteRequired,
            handler,
        }
    }
}

impl fmt::Debug for OperationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationSpec")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// Registered operation: handler plus its advertised definition
#[derive(Clone)]
pub struct Operation {
    /// Operation name
    pub name: &'static str,
    /// Read-only classification
    pub permission: Permission,
    /// Implementation
    pub handler: Handler,
    /// Description, input schema and annotations
    pub definition: Tool,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// All registered operations, in registration order
#[derive(Debug, Default)]
pub struct OperationCatalog {
    operations: Vec<Operation>,
    index: HashMap<&'static str, usize>,
}

impl OperationCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every spec to its schema definition
    ///
    /// Specs without a definition are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails when two specs share a name.
    pub fn from_schema(schema: &ToolSchema, specs: &[OperationSpec]) -> Result<Self> {
        let mut catalog = Self::new();
        for spec in specs {
            let Some(definition) = schema.get(spec.name) else {
                warn!(operation = spec.name, "No tool definition found, skipping operation");
                continue;
            };
            catalog.register(Operation {
                name: spec.name,
                permission: spec.permission,
                handler: spec.handler,
                definition: definition.clone(),
            })?;
        }
        debug!(operations = catalog.len(), "Built operation catalog");
        Ok(catalog)
    }

    /// Add an operation
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name is already registered.
    pub fn register(&mut self, operation: Operation) -> Result<()> {
        if self.index.contains_key(operation.name) {
            return Err(Error::Config(format!(
                "operation '{}' is registered twice",
                operation.name
            )));
        }
        self.index.insert(operation.name, self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// Look up an operation by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.index.get(name).map(|&i| &self.operations[i])
    }

    /// Operations visible in the given mode
    ///
    /// Everything when `read_only` is false, only [`Permission::ReadOnlySafe`]
    /// entries otherwise.
    pub fn exposed(&self, read_only: bool) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(move |op| !read_only || op.permission.is_read_only())
    }

    /// Number of registered operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True when nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::noop_handler;
    use serde_json::json;

    fn operation(name: &'static str, permission: Permission) -> Operation {
        Operation {
            name,
            permission,
            handler: noop_handler,
            definition: Tool {
                name: name.to_string(),
                title: None,
                description: None,
                input_schema: json!({"type": "object"}),
                annotations: None,
            },
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut catalog = OperationCatalog::new();
        catalog.register(operation("list_tags", Permission::ReadOnlySafe)).unwrap();
        let err = catalog
            .register(operation("list_tags", Permission::ReadOnlySafe))
            .unwrap_err();
        assert!(err.to_string().contains("registered twice"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn read_only_mode_exposes_only_safe_operations() {
        let mut catalog = OperationCatalog::new();
        catalog.register(operation("list_tags", Permission::ReadOnlySafe)).unwrap();
        catalog.register(operation("create_tag", Permission::WriteRequired)).unwrap();
        catalog.register(operation("delete_tag", Permission::WriteRequired)).unwrap();

        let all: Vec<_> = catalog.exposed(false).map(|op| op.name).collect();
        assert_eq!(all, vec!["list_tags", "create_tag", "delete_tag"]);

        let safe: Vec<_> = catalog.exposed(true).map(|op| op.name).collect();
        assert_eq!(safe, vec!["list_tags"]);
    }

    #[test]
    fn specs_without_definition_are_skipped() {
        let schema = ToolSchema::from_yaml(
            "version: v1.0\ntools:\n  - name: list_tags\n    inputSchema: {type: object}\n",
        )
        .unwrap();
        let specs = [
            OperationSpec::read("list_tags", noop_handler),
            OperationSpec::write("create_tag", noop_handler),
        ];

        let catalog = OperationCatalog::from_schema(&schema, &specs).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("list_tags").is_some());
        assert!(catalog.get("create_tag").is_none());
    }
}
