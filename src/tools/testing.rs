//! Test doubles for the tool layer

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::{ResultEnvelope, ToolContext};
use crate::portainer::*;
use crate::{Error, Result};

/// Handler that answers `ok` without touching the backend
pub(crate) fn noop_handler<'a>(
    _: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async { Ok(ResultEnvelope::text("ok")) }.boxed()
}

/// Backend that records every call and returns canned data
#[derive(Default)]
pub(crate) struct MockBackend {
    calls: Mutex<Vec<(String, String)>>,
    hang: AtomicBool,
    failure: Mutex<Option<(u16, String)>>,
    proxy_response: Mutex<Option<ProxyResponse>>,
}

impl MockBackend {
    /// Names of the methods called so far
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Debug rendering of the arguments of the last call to `name`
    pub(crate) fn last_args(&self, name: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, args)| args.clone())
    }

    /// Make every subsequent call block forever
    pub(crate) fn hang(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent call fail with an API error
    pub(crate) fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().unwrap() = Some((status, message.to_string()));
    }

    /// Response returned by the proxy methods
    pub(crate) fn respond_with(&self, status: u16, body: &str) {
        *self.proxy_response.lock().unwrap() = Some(ProxyResponse {
            status,
            body: body.to_string(),
        });
    }

    async fn enter(&self, name: &str, args: String) -> Result<()> {
        self.calls.lock().unwrap().push((name.to_string(), args));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some((status, message)) = self.failure.lock().unwrap().clone() {
            return Err(Error::Api { status, message });
        }
        Ok(())
    }
}

pub(crate) fn environment(id: i64) -> Environment {
    Environment {
        id,
        name: format!("env-{id}"),
        status: "active".into(),
        environment_type: "docker-local".into(),
        url: "unix:///var/run/docker.sock".into(),
        group_id: 1,
        tag_ids: vec![1],
        user_accesses: AccessMap::from([(2, AccessLevel::StandardUser)]),
        team_accesses: AccessMap::new(),
    }
}

fn template(id: i64) -> CustomTemplate {
    CustomTemplate {
        id,
        title: "nginx".into(),
        description: "web server".into(),
        note: String::new(),
        logo: String::new(),
        platform: "linux".into(),
        template_type: 2,
        created_by_user_id: 1,
    }
}

fn edge_job(id: i64) -> EdgeJob {
    EdgeJob {
        id,
        name: "cleanup".into(),
        cron_expression: "0 3 * * *".into(),
        recurring: true,
        environment_ids: vec![1],
        environment_group_ids: Vec::new(),
    }
}

fn registry(id: i64) -> Registry {
    Registry {
        id,
        name: "hub".into(),
        registry_type: 6,
        type_name: "dockerhub".into(),
        url: "docker.io".into(),
        authentication: false,
        username: String::new(),
    }
}

const CREATED_ID: i64 = 42;

#[async_trait]
impl PortainerBackend for MockBackend {
    async fn get_system_status(&self) -> Result<SystemStatus> {
        self.enter("get_system_status", String::new()).await?;
        Ok(SystemStatus {
            version: "2.31.2".into(),
            instance_id: "test-instance".into(),
        })
    }

    async fn list_environments(&self) -> Result<Vec<Environment>> {
        self.enter("list_environments", String::new()).await?;
        Ok(vec![environment(1), environment(2)])
    }

    async fn get_environment(&self, id: i64) -> Result<Environment> {
        self.enter("get_environment", format!("{id}")).await?;
        Ok(environment(id))
    }

    async fn delete_environment(&self, id: i64) -> Result<()> {
        self.enter("delete_environment", format!("{id}")).await
    }

    async fn update_environment_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()> {
        self.enter("update_environment_tags", format!("{id} {tag_ids:?}")).await
    }

    async fn update_environment_user_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()> {
        self.enter("update_environment_user_accesses", format!("{id} {accesses:?}"))
            .await
    }

    async fn update_environment_team_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()> {
        self.enter("update_environment_team_accesses", format!("{id} {accesses:?}"))
            .await
    }

    async fn list_environment_groups(&self) -> Result<Vec<EnvironmentGroup>> {
        self.enter("list_environment_groups", String::new()).await?;
        Ok(vec![EnvironmentGroup {
            id: 1,
            name: "edge".into(),
            environment_ids: vec![1, 2],
            tag_ids: Vec::new(),
        }])
    }

    async fn create_environment_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64> {
        self.enter("create_environment_group", format!("{name} {environment_ids:?}"))
            .await?;
        Ok(CREATED_ID)
    }

    async fn update_environment_group(&self, id: i64, update: &EnvironmentGroupUpdate) -> Result<()> {
        self.enter("update_environment_group", format!("{id} {update:?}"))
            .await
    }

    async fn delete_environment_group(&self, id: i64) -> Result<()> {
        self.enter("delete_environment_group", format!("{id}")).await
    }

    async fn list_access_groups(&self) -> Result<Vec<AccessGroup>> {
        self.enter("list_access_groups", String::new()).await?;
        Ok(vec![AccessGroup {
            id: 1,
            name: "Unassigned".into(),
            environment_ids: vec![1],
            user_accesses: AccessMap::new(),
            team_accesses: AccessMap::new(),
        }])
    }

    async fn create_access_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64> {
        self.enter("create_access_group", format!("{name} {environment_ids:?}"))
            .await?;
        Ok(CREATED_ID)
    }

    async fn update_access_group(&self, id: i64, update: &AccessGroupUpdate) -> Result<()> {
        self.enter("update_access_group", format!("{id} {update:?}")).await
    }

    async fn add_environment_to_access_group(&self, group_id: i64, environment_id: i64) -> Result<()> {
        self.enter("add_environment_to_access_group", format!("{group_id} {environment_id}"))
            .await
    }

    async fn remove_environment_from_access_group(
        &self,
        group_id: i64,
        environment_id: i64,
    ) -> Result<()> {
        self.enter(
            "remove_environment_from_access_group",
            format!("{group_id} {environment_id}"),
        )
        .await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.enter("list_tags", String::new()).await?;
        Ok(vec![Tag {
            id: 1,
            name: "prod".into(),
        }])
    }

    async fn create_tag(&self, name: &str) -> Result<i64> {
        self.enter("create_tag", name.to_string()).await?;
        Ok(CREATED_ID)
    }

    async fn delete_tag(&self, id: i64) -> Result<()> {
        self.enter("delete_tag", format!("{id}")).await
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.enter("list_stacks", String::new()).await?;
        Ok(vec![Stack {
            id: 1,
            name: "web".into(),
            environment_group_ids: vec![1],
            created_at: 1_700_000_000,
        }])
    }

    async fn get_stack_file(&self, id: i64) -> Result<String> {
        self.enter("get_stack_file", format!("{id}")).await?;
        Ok("services:\n  web:\n    image: nginx\n".into())
    }

    async fn create_stack(&self, name: &str, file: &str, environment_group_ids: &[i64]) -> Result<i64> {
        self.enter("create_stack", format!("{name} {} {environment_group_ids:?}", file.len()))
            .await?;
        Ok(CREATED_ID)
    }

    async fn update_stack(
        &self,
        id: i64,
        file: &str,
        environment_group_ids: Option<&[i64]>,
    ) -> Result<()> {
        self.enter("update_stack", format!("{id} {} {environment_group_ids:?}", file.len()))
            .await
    }

    async fn delete_stack(&self, id: i64) -> Result<()> {
        self.enter("delete_stack", format!("{id}")).await
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        self.enter("list_teams", String::new()).await?;
        Ok(vec![Team {
            id: 1,
            name: "ops".into(),
            member_ids: vec![2, 3],
        }])
    }

    async fn create_team(&self, name: &str) -> Result<i64> {
        self.enter("create_team", name.to_string()).await?;
        Ok(CREATED_ID)
    }

    async fn update_team_name(&self, id: i64, name: &str) -> Result<()> {
        self.enter("update_team_name", format!("{id} {name}")).await
    }

    async fn update_team_members(&self, id: i64, user_ids: &[i64]) -> Result<()> {
        self.enter("update_team_members", format!("{id} {user_ids:?}")).await
    }

    async fn delete_team(&self, id: i64) -> Result<()> {
        self.enter("delete_team", format!("{id}")).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.enter("list_users", String::new()).await?;
        Ok(vec![User {
            id: 1,
            username: "admin".into(),
            role: "admin".into(),
        }])
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        self.enter("get_user", format!("{id}")).await?;
        Ok(User {
            id,
            username: "alice".into(),
            role: "user".into(),
        })
    }

    async fn create_user(&self, user: &UserCreate) -> Result<i64> {
        self.enter("create_user", format!("{} {:?}", user.username, user.role))
            .await?;
        Ok(CREATED_ID)
    }

    async fn update_user_role(&self, id: i64, role: UserRole) -> Result<()> {
        self.enter("update_user_role", format!("{id} {role:?}")).await
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        self.enter("delete_user", format!("{id}")).await
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.enter("get_settings", String::new()).await?;
        Ok(Settings {
            authentication_method: "internal".into(),
            enable_edge_compute: true,
            enable_telemetry: false,
            snapshot_interval: "5m".into(),
            logo_url: String::new(),
        })
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        self.enter("update_settings", format!("{update:?}")).await
    }

    async fn list_registries(&self) -> Result<Vec<Registry>> {
        self.enter("list_registries", String::new()).await?;
        Ok(vec![registry(1)])
    }

    async fn get_registry(&self, id: i64) -> Result<Registry> {
        self.enter("get_registry", format!("{id}")).await?;
        Ok(registry(id))
    }

    async fn create_registry(&self, registry: &RegistryCreate) -> Result<i64> {
        self.enter("create_registry", format!("{} {}", registry.name, registry.registry_type))
            .await?;
        Ok(CREATED_ID)
    }

    async fn update_registry(&self, id: i64, update: &RegistryUpdate) -> Result<()> {
        self.enter("update_registry", format!("{id} {:?} {:?}", update.name, update.url))
            .await
    }

    async fn delete_registry(&self, id: i64) -> Result<()> {
        self.enter("delete_registry", format!("{id}")).await
    }

    async fn list_custom_templates(&self) -> Result<Vec<CustomTemplate>> {
        self.enter("list_custom_templates", String::new()).await?;
        Ok(vec![template(1)])
    }

    async fn get_custom_template(&self, id: i64) -> Result<CustomTemplate> {
        self.enter("get_custom_template", format!("{id}")).await?;
        Ok(template(id))
    }

    async fn get_custom_template_file(&self, id: i64) -> Result<String> {
        self.enter("get_custom_template_file", format!("{id}")).await?;
        Ok("services: {}\n".into())
    }

    async fn create_custom_template(&self, template: &TemplateCreate) -> Result<i64> {
        self.enter(
            "create_custom_template",
            format!("{} {} {}", template.title, template.platform, template.template_type),
        )
        .await?;
        Ok(CREATED_ID)
    }

    async fn update_custom_template(&self, id: i64, update: &TemplateUpdate) -> Result<()> {
        self.enter(
            "update_custom_template",
            format!("{id} {:?} {:?}", update.title, update.platform),
        )
        .await
    }

    async fn delete_custom_template(&self, id: i64) -> Result<()> {
        self.enter("delete_custom_template", format!("{id}")).await
    }

    async fn list_edge_jobs(&self) -> Result<Vec<EdgeJob>> {
        self.enter("list_edge_jobs", String::new()).await?;
        Ok(vec![edge_job(1)])
    }

    async fn get_edge_job(&self, id: i64) -> Result<EdgeJob> {
        self.enter("get_edge_job", format!("{id}")).await?;
        Ok(edge_job(id))
    }

    async fn get_edge_job_file(&self, id: i64) -> Result<String> {
        self.enter("get_edge_job_file", format!("{id}")).await?;
        Ok("#!/bin/sh\ndocker system prune -f\n".into())
    }

    async fn create_edge_job(&self, job: &EdgeJobCreate) -> Result<i64> {
        self.enter(
            "create_edge_job",
            format!("{} {} {}", job.name, job.cron_expression, job.recurring),
        )
        .await?;
        Ok(CREATED_ID)
    }

    async fn delete_edge_job(&self, id: i64) -> Result<()> {
        self.enter("delete_edge_job", format!("{id}")).await
    }

    async fn get_backup_status(&self) -> Result<BackupStatus> {
        self.enter("get_backup_status", String::new()).await?;
        Ok(BackupStatus {
            failed: false,
            timestamp_utc: "2025-01-01T03:00:00Z".into(),
        })
    }

    async fn get_backup_s3_settings(&self) -> Result<S3BackupSettings> {
        self.enter("get_backup_s3_settings", String::new()).await?;
        Ok(S3BackupSettings {
            access_key_id: "AKIA".into(),
            secret_access_key: "secret".into(),
            bucket_name: "backups".into(),
            password: "archive-pass".into(),
            ..Default::default()
        })
    }

    async fn update_backup_s3_settings(&self, settings: &S3BackupSettings) -> Result<()> {
        self.enter(
            "update_backup_s3_settings",
            format!("{} {} {}", settings.bucket_name, settings.s3_compatible_host, settings.cron_rule),
        )
        .await
    }

    async fn run_s3_backup(&self, password: Option<&str>) -> Result<()> {
        self.enter("run_s3_backup", format!("{}", password.is_some())).await
    }

    async fn proxy_docker_request(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        self.enter(
            "proxy_docker_request",
            format!("{} {} {}", request.environment_id, request.method, request.path),
        )
        .await?;
        Ok(self.canned_proxy_response())
    }

    async fn proxy_kubernetes_request(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        self.enter(
            "proxy_kubernetes_request",
            format!("{} {} {}", request.environment_id, request.method, request.path),
        )
        .await?;
        Ok(self.canned_proxy_response())
    }
}

impl MockBackend {
    fn canned_proxy_response(&self) -> ProxyResponse {
        self.proxy_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(ProxyResponse {
                status: 200,
                body: "[]".into(),
            })
    }
}
