//! REST client for the Portainer API
//!
//! # Security
//!
//! The API token is attached as a sensitive default header and is never
//! logged or included in error messages.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::PortainerBackend;
use super::api::{
    ApiErrorBody, Created, EdgeGroupPayload, EdgeJobPayload, FileContent, RawBackupStatus,
    RawCustomTemplate, RawEdgeGroup, RawEdgeJob, RawEdgeStack, RawEndpoint, RawEndpointGroup,
    RawRegistry, RawS3Settings, RawSettings, RawSystemStatus, RawTag, RawTeam, RawTeamMembership,
    RawUser, RegistryPayload, SettingsPayload, StackFile, TEAM_MEMBER_ROLE, TemplatePayload,
    policies_from_access_map,
};
use super::models::{
    AccessGroup, AccessGroupUpdate, AccessMap, BackupStatus, CustomTemplate, EdgeJob,
    EdgeJobCreate, Environment, EnvironmentGroup, EnvironmentGroupUpdate, ProxyRequest,
    ProxyResponse, Registry, RegistryCreate, RegistryUpdate, S3BackupSettings, Settings,
    SettingsUpdate, Stack, SystemStatus, Tag, Team, TemplateCreate, TemplateUpdate, User,
    UserCreate, UserRole,
};
use crate::{Error, Result};

/// Largest proxied response body accepted before the read is aborted (10 MiB)
pub const MAX_PROXY_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Header carrying the Portainer API token
const API_KEY_HEADER: &str = "X-API-Key";

/// Edge stack deployment type for compose files
const DEPLOYMENT_TYPE_COMPOSE: i64 = 0;

/// HTTP client for one Portainer server
#[derive(Debug, Clone)]
pub struct PortainerClient {
    http: Client,
    base_url: String,
}

impl PortainerClient {
    /// Build a client for `base_url` authenticated with `token`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the token is not a valid header value
    /// or the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str, skip_tls_verify: bool, timeout: Duration) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(token)
            .map_err(|_| Error::Config("API token contains invalid header characters".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and turn non-2xx statuses into [`Error::Api`]
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(ApiErrorBody::into_message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.trim().to_string()
                }
            });

        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(method = "GET", path, "Portainer request");
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(response.json().await?)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!(method = "POST", path, "Portainer request");
        let response = self.send(self.http.post(self.url(path)).json(body)).await?;
        Ok(response.json().await?)
    }

    async fn post_empty<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        debug!(method = "POST", path, "Portainer request");
        self.send(self.http.post(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        debug!(method = "PUT", path, "Portainer request");
        self.send(self.http.put(self.url(path)).json(body)).await?;
        Ok(())
    }

    async fn put_empty(&self, path: &str) -> Result<()> {
        debug!(method = "PUT", path, "Portainer request");
        self.send(self.http.put(self.url(path))).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(method = "DELETE", path, "Portainer request");
        self.send(self.http.delete(self.url(path))).await?;
        Ok(())
    }

    async fn create(&self, path: &str, body: &serde_json::Value) -> Result<i64> {
        let created: Created = self.post(path, body).await?;
        Ok(created.id)
    }

    async fn raw_endpoints(&self) -> Result<Vec<RawEndpoint>> {
        self.get("/api/endpoints").await
    }

    async fn team_memberships(&self) -> Result<Vec<RawTeamMembership>> {
        self.get("/api/team_memberships").await
    }

    /// Forward a request below `/api/endpoints/{id}/{kind}` and read the body
    /// up to [`MAX_PROXY_RESPONSE_BYTES`]
    async fn proxy(&self, kind: &str, request: &ProxyRequest) -> Result<ProxyResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::Internal(format!("invalid HTTP method '{}'", request.method)))?;
        tool_args::validate::api_path("path", &request.path)?;
        let path = format!("/api/endpoints/{}/{kind}{}", request.environment_id, request.path);
        debug!(method = %method, path = %path, "Portainer proxy request");

        let query: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|kv| (kv.key.as_str(), kv.value.as_str()))
            .collect();

        let mut headers = HeaderMap::new();
        for kv in &request.headers {
            let name = HeaderName::from_bytes(kv.key.as_bytes())
                .map_err(|_| Error::Internal(format!("invalid header name '{}'", kv.key)))?;
            let value = HeaderValue::from_str(&kv.value)
                .map_err(|_| Error::Internal(format!("invalid value for header '{}'", kv.key)))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .http
            .request(method, self.url(&path))
            .query(&query)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        if let Some(length) = response.content_length()
            && length > MAX_PROXY_RESPONSE_BYTES as u64
        {
            return Err(oversized_response());
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if body.len() + chunk.len() > MAX_PROXY_RESPONSE_BYTES {
                return Err(oversized_response());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ProxyResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

fn oversized_response() -> Error {
    Error::Transport(format!(
        "response body exceeds the {} MiB limit",
        MAX_PROXY_RESPONSE_BYTES / (1024 * 1024)
    ))
}

#[async_trait]
impl PortainerBackend for PortainerClient {
    async fn get_system_status(&self) -> Result<SystemStatus> {
        let raw: RawSystemStatus = self.get("/api/system/status").await?;
        Ok(raw.into())
    }

    // ── Environments ────────────────────────────────────────────────────

    async fn list_environments(&self) -> Result<Vec<Environment>> {
        Ok(self.raw_endpoints().await?.into_iter().map(Into::into).collect())
    }

    async fn get_environment(&self, id: i64) -> Result<Environment> {
        let raw: RawEndpoint = self.get(&format!("/api/endpoints/{id}")).await?;
        Ok(raw.into())
    }

    async fn delete_environment(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/endpoints/{id}")).await
    }

    async fn update_environment_tags(&self, id: i64, tag_ids: &[i64]) -> Result<()> {
        self.put(&format!("/api/endpoints/{id}"), &json!({ "TagIDs": tag_ids }))
            .await
    }

    async fn update_environment_user_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()> {
        let body = json!({ "UserAccessPolicies": policies_from_access_map(accesses) });
        self.put(&format!("/api/endpoints/{id}"), &body).await
    }

    async fn update_environment_team_accesses(&self, id: i64, accesses: &AccessMap) -> Result<()> {
        let body = json!({ "TeamAccessPolicies": policies_from_access_map(accesses) });
        self.put(&format!("/api/endpoints/{id}"), &body).await
    }

    // ── Environment groups ──────────────────────────────────────────────

    async fn list_environment_groups(&self) -> Result<Vec<EnvironmentGroup>> {
        let raw: Vec<RawEdgeGroup> = self.get("/api/edge_groups").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn create_environment_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64> {
        let payload = EdgeGroupPayload {
            name: name.to_string(),
            dynamic: false,
            tag_ids: Vec::new(),
            endpoints: environment_ids.to_vec(),
            partial_match: false,
        };
        let created: Created = self.post("/api/edge_groups", &payload).await?;
        Ok(created.id)
    }

    async fn update_environment_group(&self, id: i64, update: &EnvironmentGroupUpdate) -> Result<()> {
        let path = format!("/api/edge_groups/{id}");
        let current: RawEdgeGroup = self.get(&path).await?;
        let payload = EdgeGroupPayload {
            name: update.name.clone().unwrap_or(current.name),
            dynamic: current.dynamic,
            tag_ids: update.tag_ids.clone().unwrap_or(current.tag_ids),
            endpoints: update.environment_ids.clone().unwrap_or(current.endpoints),
            partial_match: current.partial_match,
        };
        self.put(&path, &payload).await
    }

    async fn delete_environment_group(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/edge_groups/{id}")).await
    }

    // ── Access groups ───────────────────────────────────────────────────

    async fn list_access_groups(&self) -> Result<Vec<AccessGroup>> {
        let groups: Vec<RawEndpointGroup> = self.get("/api/endpoint_groups").await?;
        let environments = self.raw_endpoints().await?;
        Ok(groups
            .into_iter()
            .map(|group| group.into_access_group(&environments))
            .collect())
    }

    async fn create_access_group(&self, name: &str, environment_ids: &[i64]) -> Result<i64> {
        self.create(
            "/api/endpoint_groups",
            &json!({ "Name": name, "AssociatedEndpoints": environment_ids }),
        )
        .await
    }

    async fn update_access_group(&self, id: i64, update: &AccessGroupUpdate) -> Result<()> {
        let path = format!("/api/endpoint_groups/{id}");
        let current: RawEndpointGroup = self.get(&path).await?;
        let user_policies = update
            .user_accesses
            .as_ref()
            .map_or(current.user_access_policies, policies_from_access_map);
        let team_policies = update
            .team_accesses
            .as_ref()
            .map_or(current.team_access_policies, policies_from_access_map);
        let body = json!({
            "Name": update.name.as_deref().unwrap_or(&current.name),
            "UserAccessPolicies": user_policies,
            "TeamAccessPolicies": team_policies,
        });
        self.put(&path, &body).await
    }

    async fn add_environment_to_access_group(&self, group_id: i64, environment_id: i64) -> Result<()> {
        self.put_empty(&format!("/api/endpoint_groups/{group_id}/endpoints/{environment_id}"))
            .await
    }

    async fn remove_environment_from_access_group(
        &self,
        group_id: i64,
        environment_id: i64,
    ) -> Result<()> {
        self.delete(&format!("/api/endpoint_groups/{group_id}/endpoints/{environment_id}"))
            .await
    }

    // ── Tags ────────────────────────────────────────────────────────────

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let raw: Vec<RawTag> = self.get("/api/tags").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn create_tag(&self, name: &str) -> Result<i64> {
        self.create("/api/tags", &json!({ "Name": name })).await
    }

    async fn delete_tag(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/tags/{id}")).await
    }

    // ── Stacks ──────────────────────────────────────────────────────────

    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        let raw: Vec<RawEdgeStack> = self.get("/api/edge_stacks").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn get_stack_file(&self, id: i64) -> Result<String> {
        let file: StackFile = self.get(&format!("/api/edge_stacks/{id}/file")).await?;
        Ok(file.content)
    }

    async fn create_stack(&self, name: &str, file: &str, environment_group_ids: &[i64]) -> Result<i64> {
        self.create(
            "/api/edge_stacks/create/string",
            &json!({
                "Name": name,
                "StackFileContent": file,
                "EdgeGroups": environment_group_ids,
                "DeploymentType": DEPLOYMENT_TYPE_COMPOSE,
            }),
        )
        .await
    }

    async fn update_stack(
        &self,
        id: i64,
        file: &str,
        environment_group_ids: Option<&[i64]>,
    ) -> Result<()> {
        let path = format!("/api/edge_stacks/{id}");
        let groups = match environment_group_ids {
            Some(ids) => ids.to_vec(),
            None => self.get::<RawEdgeStack>(&path).await?.edge_groups,
        };
        let body = json!({
            "StackFileContent": file,
            "EdgeGroups": groups,
            "DeploymentType": DEPLOYMENT_TYPE_COMPOSE,
            "UpdateVersion": true,
        });
        self.put(&path, &body).await
    }

    async fn delete_stack(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/edge_stacks/{id}")).await
    }

    // ── Teams ───────────────────────────────────────────────────────────

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let teams: Vec<RawTeam> = self.get("/api/teams").await?;
        let memberships = self.team_memberships().await?;
        Ok(teams
            .into_iter()
            .map(|team| Team {
                member_ids: memberships
                    .iter()
                    .filter(|m| m.team_id == team.id)
                    .map(|m| m.user_id)
                    .collect(),
                id: team.id,
                name: team.name,
            })
            .collect())
    }

    async fn create_team(&self, name: &str) -> Result<i64> {
        self.create("/api/teams", &json!({ "Name": name })).await
    }

    async fn update_team_name(&self, id: i64, name: &str) -> Result<()> {
        self.put(&format!("/api/teams/{id}"), &json!({ "Name": name }))
            .await
    }

    async fn update_team_members(&self, id: i64, user_ids: &[i64]) -> Result<()> {
        let wanted: BTreeSet<i64> = user_ids.iter().copied().collect();
        let current: Vec<RawTeamMembership> = self
            .team_memberships()
            .await?
            .into_iter()
            .filter(|m| m.team_id == id)
            .collect();

        for membership in current.iter().filter(|m| !wanted.contains(&m.user_id)) {
            self.delete(&format!("/api/team_memberships/{}", membership.id))
                .await?;
        }

        let existing: BTreeSet<i64> = current.iter().map(|m| m.user_id).collect();
        for user_id in wanted.difference(&existing) {
            let body = json!({ "UserID": user_id, "TeamID": id, "Role": TEAM_MEMBER_ROLE });
            self.post_empty("/api/team_memberships", &body).await?;
        }
        Ok(())
    }

    async fn delete_team(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/teams/{id}")).await
    }

    // ── Users ───────────────────────────────────────────────────────────

    async fn list_users(&self) -> Result<Vec<User>> {
        let raw: Vec<RawUser> = self.get("/api/users").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn get_user(&self, id: i64) -> Result<User> {
        let raw: RawUser = self.get(&format!("/api/users/{id}")).await?;
        Ok(raw.into())
    }

    async fn create_user(&self, user: &UserCreate) -> Result<i64> {
        self.create(
            "/api/users",
            &json!({
                "Username": user.username,
                "Password": user.password,
                "Role": user.role.role_id(),
            }),
        )
        .await
    }

    async fn update_user_role(&self, id: i64, role: UserRole) -> Result<()> {
        self.put(&format!("/api/users/{id}"), &json!({ "Role": role.role_id() }))
            .await
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/users/{id}")).await
    }

    // ── Settings ────────────────────────────────────────────────────────

    async fn get_settings(&self) -> Result<Settings> {
        let raw: RawSettings = self.get("/api/settings").await?;
        Ok(raw.into())
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<()> {
        let payload = SettingsPayload {
            enable_edge_compute_features: update.enable_edge_compute,
            enable_telemetry: update.enable_telemetry,
            snapshot_interval: update.snapshot_interval.clone(),
            logo_url: update.logo_url.clone(),
        };
        self.put("/api/settings", &payload).await
    }

    // ── Registries ──────────────────────────────────────────────────────

    async fn list_registries(&self) -> Result<Vec<Registry>> {
        let raw: Vec<RawRegistry> = self.get("/api/registries").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn get_registry(&self, id: i64) -> Result<Registry> {
        let raw: RawRegistry = self.get(&format!("/api/registries/{id}")).await?;
        Ok(raw.into())
    }

    async fn create_registry(&self, registry: &RegistryCreate) -> Result<i64> {
        let payload = RegistryPayload {
            name: registry.name.clone(),
            registry_type: Some(registry.registry_type),
            url: registry.url.clone(),
            authentication: registry.authentication,
            username: registry.username.clone(),
            password: Some(registry.password.clone()),
        };
        let created: Created = self.post("/api/registries", &payload).await?;
        Ok(created.id)
    }

    async fn update_registry(&self, id: i64, update: &RegistryUpdate) -> Result<()> {
        let path = format!("/api/registries/{id}");
        let current: RawRegistry = self.get(&path).await?;
        let payload = RegistryPayload {
            name: update.name.clone().unwrap_or(current.name),
            registry_type: None,
            url: update.url.clone().unwrap_or(current.url),
            authentication: update.authentication.unwrap_or(current.authentication),
            username: update.username.clone().unwrap_or(current.username),
            password: update.password.clone(),
        };
        self.put(&path, &payload).await
    }

    async fn delete_registry(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/registries/{id}")).await
    }

    // ── Custom templates ────────────────────────────────────────────────

    async fn list_custom_templates(&self) -> Result<Vec<CustomTemplate>> {
        let raw: Vec<RawCustomTemplate> = self.get("/api/custom_templates").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn get_custom_template(&self, id: i64) -> Result<CustomTemplate> {
        let raw: RawCustomTemplate = self.get(&format!("/api/custom_templates/{id}")).await?;
        Ok(raw.into())
    }

    async fn get_custom_template_file(&self, id: i64) -> Result<String> {
        let file: FileContent = self.get(&format!("/api/custom_templates/{id}/file")).await?;
        Ok(file.content)
    }

    async fn create_custom_template(&self, template: &TemplateCreate) -> Result<i64> {
        let payload = TemplatePayload {
            title: template.title.clone(),
            description: template.description.clone(),
            note: template.note.clone(),
            logo: template.logo.clone(),
            platform: template.platform,
            template_type: template.template_type,
            file_content: template.file_content.clone(),
        };
        let created: Created = self
            .post("/api/custom_templates/create/string", &payload)
            .await?;
        Ok(created.id)
    }

    async fn update_custom_template(&self, id: i64, update: &TemplateUpdate) -> Result<()> {
        let path = format!("/api/custom_templates/{id}");
        let current: RawCustomTemplate = self.get(&path).await?;
        let file_content = match &update.file_content {
            Some(content) => content.clone(),
            None => self.get_custom_template_file(id).await?,
        };
        let payload = TemplatePayload {
            title: update.title.clone().unwrap_or(current.title),
            description: update.description.clone().unwrap_or(current.description),
            note: update.note.clone().unwrap_or(current.note),
            logo: update.logo.clone().unwrap_or(current.logo),
            platform: update.platform.unwrap_or(current.platform),
            template_type: update.template_type.unwrap_or(current.template_type),
            file_content,
        };
        self.put(&path, &payload).await
    }

    async fn delete_custom_template(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/custom_templates/{id}")).await
    }

    // ── Edge jobs ───────────────────────────────────────────────────────

    async fn list_edge_jobs(&self) -> Result<Vec<EdgeJob>> {
        let raw: Vec<RawEdgeJob> = self.get("/api/edge_jobs").await?;
        Ok(raw.into_iter().map(Into::into).collect())
    }

    async fn get_edge_job(&self, id: i64) -> Result<EdgeJob> {
        let raw: RawEdgeJob = self.get(&format!("/api/edge_jobs/{id}")).await?;
        Ok(raw.into())
    }

    async fn get_edge_job_file(&self, id: i64) -> Result<String> {
        let file: FileContent = self.get(&format!("/api/edge_jobs/{id}/file")).await?;
        Ok(file.content)
    }

    async fn create_edge_job(&self, job: &EdgeJobCreate) -> Result<i64> {
        let payload = EdgeJobPayload {
            name: job.name.clone(),
            cron_expression: job.cron_expression.clone(),
            recurring: job.recurring,
            endpoints: job.environment_ids.clone(),
            edge_groups: job.environment_group_ids.clone(),
            file_content: job.file_content.clone(),
        };
        let created: Created = self.post("/api/edge_jobs/create/string", &payload).await?;
        Ok(created.id)
    }

    async fn delete_edge_job(&self, id: i64) -> Result<()> {
        self.delete(&format!("/api/edge_jobs/{id}")).await
    }

    // ── Backups ─────────────────────────────────────────────────────────

    async fn get_backup_status(&self) -> Result<BackupStatus> {
        let raw: RawBackupStatus = self.get("/api/backup/s3/status").await?;
        Ok(raw.into())
    }

    async fn get_backup_s3_settings(&self) -> Result<S3BackupSettings> {
        let raw: RawS3Settings = self.get("/api/backup/s3/settings").await?;
        Ok(raw.into())
    }

    async fn update_backup_s3_settings(&self, settings: &S3BackupSettings) -> Result<()> {
        self.post_empty("/api/backup/s3/settings", &RawS3Settings::from(settings))
            .await
    }

    async fn run_s3_backup(&self, password: Option<&str>) -> Result<()> {
        let mut settings: RawS3Settings = self.get("/api/backup/s3/settings").await?;
        if let Some(password) = password {
            settings.password = password.to_string();
        }
        self.post_empty("/api/backup/s3/execute", &settings).await
    }

    // ── API proxies ─────────────────────────────────────────────────────

    async fn proxy_docker_request(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        self.proxy("docker", request).await
    }

    async fn proxy_kubernetes_request(&self, request: &ProxyRequest) -> Result<ProxyResponse> {
        self.proxy("kubernetes", request).await
    }
}
