//! Portainer backend collaborator
//!
//! [`PortainerBackend`] is the only surface the tool layer talks to. The
//! production implementation is [`PortainerClient`] (REST over `reqwest`);
//! tests substitute in-memory fakes.

mod api;
mod client;
pub mod models;

pub use client::{MAX_PROXY_RESPONSE_BYTES, PortainerClient};
pub use models::*;

use async_trait::async_trait;

use crate::Result;

/// Operations the tool layer can invoke on a Portainer server
///
/// Every method is a single logical call from the caller's point of view.
/// Updates documented as "merged" read the current object and write back a
/// full replacement; they are not atomic and the last writer wins.
#[async_trait]
pub trait PortainerBackend: Send + Sync {
    // ── System ──────────────────────────────────────────────────────────

    /// Server status including version
    async fn get_system_status(&self) -> Result<SystemStatus>;

    /// Server version string (e.g. `2.31.2`)
    async fn get_version(&self) -> Result<String> {
        Ok(self.get_system_status().await?.version)
    }

    // ── Environments ────────────────────────────────────────────────────

    /// All environments
    async fn list_environments(&self) -> Result<Vec<Environment>>;
    /// One environment
    async fn get_environment(&self, id: i64) -> Result<Environment>;
    /// Remove an environment
    async fn delete_environment(&self, id: i64) -> Result<()>;
    /// Replace an environment's tags
    async fn update_environment_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()>;
    /// Replace an environment's user access policies
    async fn update_environment_user_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()>;
    /// Replace an environment's team access policies
    async fn update_environment_team_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()>;

    // ── Environment groups ──────────────────────────────────────────────

    /// All environment groups
    async fn list_environment_groups(&self) -> Result<Vec<EnvironmentGroup>>;
    /// Create a static environment group, returning its id
    async fn create_environment_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64>;
    /// Merged update of an environment group
    async fn update_environment_group(&self, id: i64, update: &EnvironmentGroupUpdate) -> Result<()>;
    /// Remove an environment group
    async fn delete_environment_group(&self, id: i64) -> Result<()>;

    // ── Access groups ───────────────────────────────────────────────────

    /// All access groups
    async fn list_access_groups(&self) -> Result<Vec<AccessGroup>>;
    /// Create an access group, returning its id
    async fn create_access_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64>;
    /// Merged update of an access group
    async fn update_access_group(&self, id: i64, update: &AccessGroupUpdate) -> Result<()>;
    /// Move an environment into an access group
    async fn add_environment_to_access_group(&self, group_id: i64, environment_id: i64) -> Result<()>;
    /// Remove an environment from an access group
    async fn remove_environment_from_access_group(
        &self,
        group_id: i64,
        environment_id: i64,
    ) -> Result<()>;

    // ── Tags ────────────────────────────────────────────────────────────

    /// All tags
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    /// Create a tag, returning its id
    async fn create_tag(&self, name: &str) -> Result<i64>;
    /// Remove a tag
    async fn delete_tag(&self, id: i64) -> Result<()>;

    // ── Stacks ──────────────────────────────────────────────────────────

    /// All edge stacks
    async fn list_stacks(&self) -> Result<Vec<Stack>>;
    /// Compose file of a stack
    async fn get_stack_file(&self, id: i64) -> Result<String>;
    /// Deploy a new stack to environment groups, returning its id
    async fn create_stack(&self, name: &str, file: &str, environment_group_ids: &[i64]) -> Result<i64>;
    /// Redeploy a stack; `None` groups keeps the current targets (merged)
    async fn update_stack(
        &self,
        id: i64,
        file: &str,
        environment_group_ids: Option<&[i64]>,
    ) -> Result<()>;
    /// Remove a stack
    async fn delete_stack(&self, id: i64) -> Result<()>;

    // ── Teams ───────────────────────────────────────────────────────────

    /// All teams with members
    async fn list_teams(&self) -> Result<Vec<Team>>;
    /// Create a team, returning its id
    async fn create_team(&self, name: &str) -> Result<i64>;
    /// Rename a team
    async fn update_team_name(&self, id: i64, name: &str) -> Result<()>;
    /// Make `user_ids` the exact member set of a team
    async fn update_team_members(&self, id: i64, user_ids: &[i64]) -> Result<()>;
    /// Remove a team
    async fn delete_team(&self, id: i64) -> Result<()>;

    // ── Users ───────────────────────────────────────────────────────────

    /// All users
    async fn list_users(&self) -> Result<Vec<User>>;
    /// One user
    async fn get_user(&self, id: i64) -> Result<User>;
    /// Create a user, returning its id
    async fn create_user(&self, user: &UserCreate) -> Result<i64>;
    /// Change a user's role
    async fn update_user_role(&self, id: i64, role: UserRole) -> Result<()>;
    /// Remove a user
    async fn delete_user(&self, id: i64) -> Result<()>;

    // ── Settings ────────────────────────────────────────────────────────

    /// Server settings
    async fn get_settings(&self) -> Result<Settings>;
    /// Partial settings update
    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()>;

    // ── Registries ──────────────────────────────────────────────────────

    /// All registries
    async fn list_registries(&self) -> Result<Vec<Registry>>;
    /// One registry
    async fn get_registry(&self, id: i64) -> Result<Registry>;
    /// Create a registry, returning its id
    async fn create_registry(&self, registry: &RegistryCreate) -> Result<i64>;
    /// Merged update of a registry
    async fn update_registry(&self, id: i64, update: &RegistryUpdate) -> Result<()>;
    /// Remove a registry
    async fn delete_registry(&self, id: i64) -> Result<()>;

    // ── Custom templates ────────────────────────────────────────────────

    /// All custom templates
    async fn list_custom_templates(&self) -> Result<Vec<CustomTemplate>>;
    /// One custom template
    async fn get_custom_template(&self, id: i64) -> Result<CustomTemplate>;
    /// File content of a custom template
    async fn get_custom_template_file(&self, id: i64) -> Result<String>;
    /// Create a template from inline content, returning its id
    async fn create_custom_template(&self, template: &TemplateCreate) -> Result<i64>;
    /// Merged update of a custom template
    async fn update_custom_template(&self, id: i64, update: &TemplateUpdate) -> Result<()>;
    /// Remove a custom template
    async fn delete_custom_template(&self, id: i64) -> Result<()>;

    // ── Edge jobs ───────────────────────────────────────────────────────

    /// All edge jobs
    async fn list_edge_jobs(&self) -> Result<Vec<EdgeJob>>;
    /// One edge job
    async fn get_edge_job(&self, id: i64) -> Result<EdgeJob>;
    /// Script content of an edge job
    async fn get_edge_job_file(&self, id: i64) -> Result<String>;
    /// Create an edge job, returning its id
    async fn create_edge_job(&self, job: &EdgeJobCreate) -> Result<i64>;
    /// Remove an edge job
    async fn delete_edge_job(&self, id: i64) -> Result<()>;

    // ── Backups ─────────────────────────────────────────────────────────

    /// Status of the last S3 backup
    async fn get_backup_status(&self) -> Result<BackupStatus>;
    /// Current S3 backup settings
    async fn get_backup_s3_settings(&self) -> Result<S3BackupSettings>;
    /// Replace S3 backup settings
    async fn update_backup_s3_settings(&self, settings: &S3BackupSettings) -> Result<()>;
    /// Run an S3 backup now with the stored settings
    async fn run_s3_backup(&self, password: Option<&str>) -> Result<()>;

    // ── API proxies ─────────────────────────────────────────────────────

    /// Forward a request to an environment's Docker API
    async fn proxy_docker_request(&self, request: &ProxyRequest) -> Result<ProxyResponse>;
    /// Forward a request to an environment's Kubernetes API
    async fn proxy_kubernetes_request(&self, request: &ProxyRequest) -> Result<ProxyResponse>;
}
