//! Advertised tool surface: meta-tools or one tool per operation
//!
//! In meta mode related operations are bundled behind a single tool whose
//! `action` argument picks the operation. This keeps `tools/list` small for
//! agents with limited context while leaving every operation reachable.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, json};
use tracing::{debug, info};

use super::catalog::{Operation, OperationCatalog};
use crate::protocol::{Tool, ToolAnnotations};

/// Name of the discriminator argument of every meta-tool
pub const ACTION_ARGUMENT: &str = "action";

/// How operations are advertised
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// Grouped meta-tools selected by `action`
    #[default]
    Meta,
    /// One tool per operation
    Granular,
}

impl FromStr for ToolMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meta" => Ok(Self::Meta),
            "granular" => Ok(Self::Granular),
            other => Err(format!("unknown tool mode '{other}' (expected meta or granular)")),
        }
    }
}

/// Static description of a meta-tool bundle
#[derive(Debug, Clone, Copy)]
pub struct MetaToolSpec {
    /// Tool name
    pub name: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Leading sentence of the description
    pub summary: &'static str,
    /// Operation names, in advertised order
    pub actions: &'static [&'static str],
}

/// Meta-tool bundles in advertised order
pub const META_TOOLS: &[MetaToolSpec] = &[
    MetaToolSpec {
        name: "manage_environments",
        title: "Manage Environments",
        summary: "Inspect and manage Docker and Kubernetes environments, their tags and access policies.",
        actions: &[
            "list_environments",
            "get_environment",
            "delete_environment",
            "update_environment_tags",
            "update_environment_user_accesses",
            "update_environment_team_accesses",
        ],
    },
    MetaToolSpec {
        name: "manage_environment_groups",
        title: "Manage Environment Groups",
        summary: "Manage environment groups used to target stack and job deployments.",
        actions: &[
            "list_environment_groups",
            "create_environment_group",
            "update_environment_group",
            "delete_environment_group",
        ],
    },
    MetaToolSpec {
        name: "manage_access_groups",
        title: "Manage Access Groups",
        summary: "Manage access groups and the user and team access policies they grant.",
        actions: &[
            "list_access_groups",
            "create_access_group",
            "update_access_group_name",
            "update_access_group_user_accesses",
            "update_access_group_team_accesses",
            "add_environment_to_access_group",
            "remove_environment_from_access_group",
        ],
    },
    MetaToolSpec {
        name: "manage_tags",
        title: "Manage Tags",
        summary: "Manage environment tags.",
        actions: &["list_tags", "create_tag", "delete_tag"],
    },
    MetaToolSpec {
        name: "manage_stacks",
        title: "Manage Stacks",
        summary: "Deploy and manage compose stacks on environment groups.",
        actions: &[
            "list_stacks",
            "get_stack_file",
            "create_stack",
            "update_stack",
            "delete_stack",
        ],
    },
    MetaToolSpec {
        name: "manage_teams",
        title: "Manage Teams",
        summary: "Manage teams and their members.",
        actions: &[
            "list_teams",
            "create_team",
            "update_team_name",
            "update_team_members",
            "delete_team",
        ],
    },
    MetaToolSpec {
        name: "manage_users",
        title: "Manage Users",
        summary: "Manage users and their roles.",
        actions: &[
            "list_users",
            "get_user",
            "create_user",
            "update_user_role",
            "delete_user",
        ],
    },
    MetaToolSpec {
        name: "manage_settings",
        title: "Manage Settings",
        summary: "Read and change server settings.",
        actions: &["get_settings", "update_settings"],
    },
    MetaToolSpec {
        name: "manage_registries",
        title: "Manage Registries",
        summary: "Manage container image registries.",
        actions: &[
            "list_registries",
            "get_registry",
            "create_registry",
            "update_registry",
            "delete_registry",
        ],
    },
    MetaToolSpec {
        name: "manage_templates",
        title: "Manage Templates",
        summary: "Manage custom application templates.",
        actions: &[
            "list_custom_templates",
            "get_custom_template",
            "get_custom_template_file",
            "create_custom_template",
            "update_custom_template",
            "delete_custom_template",
        ],
    },
    MetaToolSpec {
        name: "manage_edge_jobs",
        title: "Manage Edge Jobs",
        summary: "Schedule and inspect scripts run on edge environments.",
        actions: &[
            "list_edge_jobs",
            "get_edge_job",
            "get_edge_job_file",
            "create_edge_job",
            "delete_edge_job",
        ],
    },
    MetaToolSpec {
        name: "manage_backups",
        title: "Manage Backups",
        summary: "Configure and run S3 backups of the server.",
        actions: &[
            "get_backup_status",
            "get_backup_s3_settings",
            "update_backup_s3_settings",
            "run_s3_backup",
        ],
    },
    MetaToolSpec {
        name: "manage_system",
        title: "System Information",
        summary: "Inspect the server itself.",
        actions: &["get_system_status"],
    },
    MetaToolSpec {
        name: "manage_docker",
        title: "Docker API",
        summary: "Call the Docker Engine API of an environment.",
        actions: &["docker_proxy"],
    },
    MetaToolSpec {
        name: "manage_kubernetes",
        title: "Kubernetes API",
        summary: "Call the Kubernetes API of an environment.",
        actions: &["kubernetes_proxy", "get_kubernetes_resource_stripped"],
    },
];

/// Bundle of operations behind one advertised tool
#[derive(Debug, Clone)]
pub struct MetaTool {
    /// Tool name
    pub name: &'static str,
    /// Exposed actions, in advertised order
    pub actions: Vec<&'static str>,
    /// Advertised definition
    pub definition: Tool,
}

impl MetaTool {
    /// Build from the exposed subset of `spec`'s actions
    ///
    /// Returns `None` when none of the actions are exposed.
    fn build(spec: &MetaToolSpec, operations: &[&Operation]) -> Option<Self> {
        if operations.is_empty() {
            return None;
        }
        let actions: Vec<&'static str> = operations.iter().map(|op| op.name).collect();

        let mut properties = Map::new();
        properties.insert(
            ACTION_ARGUMENT.to_string(),
            json!({
                "type": "string",
                "enum": actions,
                "description": "The operation to perform",
            }),
        );
        for op in operations {
            for (key, schema) in op.definition.properties().into_iter().flatten() {
                properties.entry(key.clone()).or_insert_with(|| schema.clone());
            }
        }

        let description = format!(
            "{} Available actions: {}.",
            spec.summary,
            actions.join(", ")
        );

        Some(Self {
            name: spec.name,
            definition: Tool {
                name: spec.name.to_string(),
                title: Some(spec.title.to_string()),
                description: Some(description),
                input_schema: json!({
                    "type": "object",
                    "properties": properties,
                    "required": [ACTION_ARGUMENT],
                }),
                annotations: Some(aggregate_annotations(spec.title, operations)),
            },
            actions,
        })
    }
}

/// Combine action hints: read-only and idempotent only if every action is,
/// destructive and open-world if any action is
fn aggregate_annotations(title: &str, operations: &[&Operation]) -> ToolAnnotations {
    let hint = |op: &Operation, pick: fn(&ToolAnnotations) -> Option<bool>| {
        op.definition.annotations.as_ref().and_then(pick)
    };
    ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: Some(operations.iter().all(|op| {
            hint(op, |a| a.read_only_hint).unwrap_or(op.permission.is_read_only())
        })),
        destructive_hint: Some(
            operations
                .iter()
                .any(|op| hint(op, |a| a.destructive_hint).unwrap_or(false)),
        ),
        idempotent_hint: Some(
            operations
                .iter()
                .all(|op| hint(op, |a| a.idempotent_hint).unwrap_or(false)),
        ),
        open_world_hint: Some(
            operations
                .iter()
                .any(|op| hint(op, |a| a.open_world_hint).unwrap_or(false)),
        ),
    }
}

/// What an advertised tool name resolves to
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A single operation
    Operation(&'a Operation),
    /// A meta-tool; the operation is chosen by `action`
    Meta(&'a MetaTool),
}

/// Immutable tool surface built once at startup
#[derive(Debug)]
pub struct ToolRegistry {
    catalog: OperationCatalog,
    read_only: bool,
    mode: ToolMode,
    meta_tools: Vec<MetaTool>,
    meta_index: HashMap<&'static str, usize>,
    advertised: Vec<Tool>,
}

impl ToolRegistry {
    /// Apply the permission filter and build the advertised surface
    #[must_use]
    pub fn new(catalog: OperationCatalog, mode: ToolMode, read_only: bool) -> Self {
        let mut meta_tools = Vec::new();
        let mut advertised = Vec::new();

        match mode {
            ToolMode::Meta => {
                for spec in META_TOOLS {
                    let operations: Vec<&Operation> = spec
                        .actions
                        .iter()
                        .filter_map(|name| catalog.get(name))
                        .filter(|op| !read_only || op.permission.is_read_only())
                        .collect();
                    match MetaTool::build(spec, &operations) {
                        Some(meta) => {
                            advertised.push(meta.definition.clone());
                            meta_tools.push(meta);
                        }
                        None => debug!(tool = spec.name, "No exposed actions, not registering"),
                    }
                }
            }
            ToolMode::Granular => {
                advertised.extend(catalog.exposed(read_only).map(|op| op.definition.clone()));
            }
        }

        let meta_index = meta_tools
            .iter()
            .enumerate()
            .map(|(i, meta)| (meta.name, i))
            .collect();

        info!(
            mode = ?mode,
            read_only,
            tools = advertised.len(),
            operations = catalog.exposed(read_only).count(),
            "Tool registry built"
        );

        Self {
            catalog,
            read_only,
            mode,
            meta_tools,
            meta_index,
            advertised,
        }
    }

    /// Tools returned by `tools/list`
    #[must_use]
    pub fn tools(&self) -> &[Tool] {
        &self.advertised
    }

    /// Resolve an advertised tool name
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Target<'_>> {
        match self.mode {
            ToolMode::Meta => self
                .meta_index
                .get(name)
                .map(|&i| Target::Meta(&self.meta_tools[i])),
            ToolMode::Granular => self
                .catalog
                .get(name)
                .filter(|op| !self.read_only || op.permission.is_read_only())
                .map(Target::Operation),
        }
    }

    /// Operation behind a meta-tool action
    #[must_use]
    pub fn action(&self, meta: &MetaTool, action: &str) -> Option<&Operation> {
        meta.actions
            .iter()
            .find(|name| **name == action)
            .and_then(|name| self.catalog.get(name))
    }

    /// Whether write operations are hidden
    #[must_use]
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Advertising mode
    #[must_use]
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    /// Underlying catalog
    #[must_use]
    pub fn catalog(&self) -> &OperationCatalog {
        &self.catalog
    }
}
