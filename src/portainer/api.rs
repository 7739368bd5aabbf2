//! Raw Portainer REST API payloads and their conversion into [`super::models`]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::models::{
    AccessGroup, AccessLevel, AccessMap, BackupStatus, CustomTemplate, EdgeJob, Environment,
    EnvironmentGroup, Registry, S3BackupSettings, Settings, Stack, SystemStatus, Tag,
    TEMPLATE_PLATFORMS, User, UserRole, registry_type_name,
};

/// `{"RoleId": n}` entry of a Portainer access policy map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct AccessPolicy {
    #[serde(rename = "RoleId", default)]
    pub role_id: i64,
}

/// Access policies keyed by stringified user/team id
pub(super) type AccessPolicies = HashMap<String, AccessPolicy>;

/// Convert Portainer policies, dropping entries with unknown ids or roles
pub(super) fn access_map_from_policies(policies: &AccessPolicies) -> AccessMap {
    policies
        .iter()
        .filter_map(|(id, policy)| {
            let id = id.parse::<i64>().ok()?;
            match AccessLevel::from_role_id(policy.role_id) {
                Some(level) => Some((id, level)),
                None => {
                    warn!(id, role_id = policy.role_id, "Ignoring access policy with unknown role");
                    None
                }
            }
        })
        .collect()
}

/// Convert an access map into the Portainer policy shape
pub(super) fn policies_from_access_map(map: &AccessMap) -> AccessPolicies {
    map.iter()
        .map(|(id, level)| {
            (
                id.to_string(),
                AccessPolicy {
                    role_id: level.role_id(),
                },
            )
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawEndpoint {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub endpoint_type: i64,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub user_access_policies: AccessPolicies,
    #[serde(default)]
    pub team_access_policies: AccessPolicies,
}

fn endpoint_type_name(endpoint_type: i64) -> &'static str {
    match endpoint_type {
        1 => "docker-local",
        2 => "docker-agent",
        3 => "azure-aci",
        4 => "docker-edge-agent",
        5 => "kubernetes-local",
        6 => "kubernetes-agent",
        7 => "kubernetes-edge-agent",
        _ => "unknown",
    }
}

impl From<RawEndpoint> for Environment {
    fn from(raw: RawEndpoint) -> Self {
        let status = match raw.status {
            1 => "active",
            2 => "inactive",
            _ => "unknown",
        };
        Self {
            id: raw.id,
            name: raw.name,
            status: status.to_string(),
            environment_type: endpoint_type_name(raw.endpoint_type).to_string(),
            url: raw.url,
            group_id: raw.group_id,
            tag_ids: raw.tag_ids,
            user_accesses: access_map_from_policies(&raw.user_access_policies),
            team_accesses: access_map_from_policies(&raw.team_access_policies),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawEdgeGroup {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub endpoints: Vec<i64>,
    #[serde(default)]
    pub partial_match: bool,
}

impl From<RawEdgeGroup> for EnvironmentGroup {
    fn from(raw: RawEdgeGroup) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            environment_ids: raw.endpoints,
            tag_ids: raw.tag_ids,
        }
    }
}

/// Body of `POST /api/edge_groups` and `PUT /api/edge_groups/{id}`
#[derive(Debug, Serialize)]
pub(super) struct EdgeGroupPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Dynamic")]
    pub dynamic: bool,
    #[serde(rename = "TagIDs")]
    pub tag_ids: Vec<i64>,
    #[serde(rename = "Endpoints")]
    pub endpoints: Vec<i64>,
    #[serde(rename = "PartialMatch")]
    pub partial_match: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawEndpointGroup {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_access_policies: AccessPolicies,
    #[serde(default)]
    pub team_access_policies: AccessPolicies,
}

impl RawEndpointGroup {
    /// Convert, resolving membership from the environments' `GroupId`
    pub(super) fn into_access_group(self, environments: &[RawEndpoint]) -> AccessGroup {
        let environment_ids = environments
            .iter()
            .filter(|e| e.group_id == self.id)
            .map(|e| e.id)
            .collect();
        AccessGroup {
            id: self.id,
            name: self.name,
            environment_ids,
            user_accesses: access_map_from_policies(&self.user_access_policies),
            team_accesses: access_map_from_policies(&self.team_access_policies),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTag {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
}

impl From<RawTag> for Tag {
    fn from(raw: RawTag) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawEdgeStack {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub edge_groups: Vec<i64>,
    #[serde(default)]
    pub creation_date: i64,
}

impl From<RawEdgeStack> for Stack {
    fn from(raw: RawEdgeStack) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            environment_group_ids: raw.edge_groups,
            created_at: raw.creation_date,
        }
    }
}

/// Response of the `.../file` endpoints of stacks
#[derive(Debug, Deserialize)]
pub(super) struct StackFile {
    #[serde(rename = "StackFileContent", default)]
    pub content: String,
}

/// Response of the `.../file` endpoints of templates and edge jobs
#[derive(Debug, Deserialize)]
pub(super) struct FileContent {
    #[serde(rename = "FileContent", default)]
    pub content: String,
}

/// Any created object; only the id is used
#[derive(Debug, Deserialize)]
pub(super) struct Created {
    #[serde(alias = "ID", alias = "Id", alias = "id")]
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawTeam {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawTeamMembership {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "UserID")]
    pub user_id: i64,
    #[serde(rename = "TeamID")]
    pub team_id: i64,
}

/// Regular (non-leader) team membership role
pub(super) const TEAM_MEMBER_ROLE: i64 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawUser {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: i64,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        let role = UserRole::from_role_id(raw.role).map_or("unknown", UserRole::as_str);
        Self {
            id: raw.id,
            username: raw.username,
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawSettings {
    #[serde(default)]
    pub authentication_method: i64,
    #[serde(default)]
    pub enable_edge_compute_features: bool,
    #[serde(default)]
    pub enable_telemetry: bool,
    #[serde(default)]
    pub snapshot_interval: String,
    #[serde(rename = "LogoURL", default)]
    pub logo_url: String,
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let method = match raw.authentication_method {
            1 => "internal",
            2 => "ldap",
            3 => "oauth",
            _ => "unknown",
        };
        Self {
            authentication_method: method.to_string(),
            enable_edge_compute: raw.enable_edge_compute_features,
            enable_telemetry: raw.enable_telemetry,
            snapshot_interval: raw.snapshot_interval,
            logo_url: raw.logo_url,
        }
    }
}

/// Body of `PUT /api/settings`; absent fields are left untouched by the server
#[derive(Debug, Default, Serialize)]
pub(super) struct SettingsPayload {
    #[serde(rename = "EnableEdgeComputeFeatures", skip_serializing_if = "Option::is_none")]
    pub enable_edge_compute_features: Option<bool>,
    #[serde(rename = "EnableTelemetry", skip_serializing_if = "Option::is_none")]
    pub enable_telemetry: Option<bool>,
    #[serde(rename = "SnapshotInterval", skip_serializing_if = "Option::is_none")]
    pub snapshot_interval: Option<String>,
    #[serde(rename = "LogoURL", skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawRegistry {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Type", default)]
    pub registry_type: i64,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub authentication: bool,
    #[serde(default)]
    pub username: String,
}

impl From<RawRegistry> for Registry {
    fn from(raw: RawRegistry) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            registry_type: raw.registry_type,
            type_name: registry_type_name(raw.registry_type).to_string(),
            url: raw.url,
            authentication: raw.authentication,
            username: raw.username,
        }
    }
}

/// Body of `POST /api/registries` and `PUT /api/registries/{id}`
#[derive(Debug, Serialize)]
pub(super) struct RegistryPayload {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub registry_type: Option<i64>,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Authentication")]
    pub authentication: bool,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawCustomTemplate {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub platform: i64,
    #[serde(rename = "Type", default)]
    pub template_type: i64,
    #[serde(default)]
    pub created_by_user_id: i64,
}

impl From<RawCustomTemplate> for CustomTemplate {
    fn from(raw: RawCustomTemplate) -> Self {
        let platform = usize::try_from(raw.platform - 1)
            .ok()
            .and_then(|i| TEMPLATE_PLATFORMS.get(i).copied())
            .unwrap_or("unknown");
        Self {
            id: raw.id,
            title: raw.title,
            description: raw.description,
            note: raw.note,
            logo: raw.logo,
            platform: platform.to_string(),
            template_type: raw.template_type,
            created_by_user_id: raw.created_by_user_id,
        }
    }
}

/// Body of `POST /api/custom_templates/create/string` and `PUT /api/custom_templates/{id}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct TemplatePayload {
    pub title: String,
    pub description: String,
    pub note: String,
    pub logo: String,
    pub platform: i64,
    #[serde(rename = "Type")]
    pub template_type: i64,
    pub file_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawEdgeJob {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cron_expression: String,
    #[serde(default)]
    pub recurring: bool,
    /// Keyed by stringified environment id
    #[serde(default)]
    pub endpoints: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub edge_groups: Vec<i64>,
}

impl From<RawEdgeJob> for EdgeJob {
    fn from(raw: RawEdgeJob) -> Self {
        let mut environment_ids: Vec<i64> = raw
            .endpoints
            .keys()
            .filter_map(|id| id.parse().ok())
            .collect();
        environment_ids.sort_unstable();
        Self {
            id: raw.id,
            name: raw.name,
            cron_expression: raw.cron_expression,
            recurring: raw.recurring,
            environment_ids,
            environment_group_ids: raw.edge_groups,
        }
    }
}

/// Body of `POST /api/edge_jobs/create/string`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct EdgeJobPayload {
    pub name: String,
    pub cron_expression: String,
    pub recurring: bool,
    pub endpoints: Vec<i64>,
    pub edge_groups: Vec<i64>,
    pub file_content: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawBackupStatus {
    #[serde(rename = "Failed", default)]
    pub failed: bool,
    #[serde(rename = "TimestampUTC", default)]
    pub timestamp_utc: String,
}

impl From<RawBackupStatus> for BackupStatus {
    fn from(raw: RawBackupStatus) -> Self {
        Self {
            failed: raw.failed,
            timestamp_utc: raw.timestamp_utc,
        }
    }
}

/// S3 backup settings as stored and accepted by the server
#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct RawS3Settings {
    #[serde(rename = "AccessKeyID", default)]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey", default)]
    pub secret_access_key: String,
    #[serde(rename = "Region", default)]
    pub region: String,
    #[serde(rename = "BucketName", default)]
    pub bucket_name: String,
    #[serde(rename = "S3CompatibleHost", default)]
    pub s3_compatible_host: String,
    #[serde(rename = "CronRule", default)]
    pub cron_rule: String,
    #[serde(rename = "Password", default)]
    pub password: String,
}

impl From<RawS3Settings> for S3BackupSettings {
    fn from(raw: RawS3Settings) -> Self {
        Self {
            access_key_id: raw.access_key_id,
            secret_access_key: raw.secret_access_key,
            region: raw.region,
            bucket_name: raw.bucket_name,
            s3_compatible_host: raw.s3_compatible_host,
            cron_rule: raw.cron_rule,
            password: raw.password,
        }
    }
}

impl From<&S3BackupSettings> for RawS3Settings {
    fn from(settings: &S3BackupSettings) -> Self {
        Self {
            access_key_id: settings.access_key_id.clone(),
            secret_access_key: settings.secret_access_key.clone(),
            region: settings.region.clone(),
            bucket_name: settings.bucket_name.clone(),
            s3_compatible_host: settings.s3_compatible_host.clone(),
            cron_rule: settings.cron_rule.clone(),
            password: settings.password.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RawSystemStatus {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "InstanceID", default)]
    pub instance_id: String,
}

impl From<RawSystemStatus> for SystemStatus {
    fn from(raw: RawSystemStatus) -> Self {
        Self {
            version: raw.version,
            instance_id: raw.instance_id,
        }
    }
}

/// Error body returned by the Portainer API
#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
}

impl ApiErrorBody {
    /// Human-readable message, preferring `details` when it adds information
    pub(super) fn into_message(self) -> String {
        match (self.message.is_empty(), self.details.is_empty()) {
            (false, false) if self.message != self.details => {
                format!("{} ({})", self.message, self.details)
            }
            (false, _) => self.message,
            (true, _) => self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_converts_status_type_and_policies() {
        let raw: RawEndpoint = serde_json::from_value(json!({
            "Id": 3,
            "Name": "prod",
            "Type": 6,
            "URL": "tcp://10.0.0.3:9001",
            "GroupId": 2,
            "Status": 2,
            "TagIds": [1, 4],
            "UserAccessPolicies": {"7": {"RoleId": 1}, "8": {"RoleId": 99}},
            "TeamAccessPolicies": {"2": {"RoleId": 4}}
        }))
        .unwrap();
        let env = Environment::from(raw);
        assert_eq!(env.status, "inactive");
        assert_eq!(env.environment_type, "kubernetes-agent");
        assert_eq!(
            env.user_accesses,
            AccessMap::from([(7, AccessLevel::EnvironmentAdministrator)])
        );
        assert_eq!(env.team_accesses, AccessMap::from([(2, AccessLevel::ReadonlyUser)]));
    }

    #[test]
    fn policies_round_trip_through_access_map() {
        let map = AccessMap::from([(1, AccessLevel::OperatorUser), (2, AccessLevel::HelpdeskUser)]);
        let policies = policies_from_access_map(&map);
        assert_eq!(policies["1"].role_id, 5);
        assert_eq!(access_map_from_policies(&policies), map);
    }

    #[test]
    fn access_group_membership_comes_from_environments() {
        let group: RawEndpointGroup =
            serde_json::from_value(json!({"Id": 2, "Name": "edge"})).unwrap();
        let envs: Vec<RawEndpoint> = serde_json::from_value(json!([
            {"Id": 1, "GroupId": 1},
            {"Id": 5, "GroupId": 2},
            {"Id": 6, "GroupId": 2}
        ]))
        .unwrap();
        assert_eq!(group.into_access_group(&envs).environment_ids, vec![5, 6]);
    }

    #[test]
    fn edge_job_environment_ids_are_sorted_keys() {
        let raw: RawEdgeJob = serde_json::from_value(json!({
            "Id": 1,
            "Name": "cleanup",
            "CronExpression": "0 3 * * *",
            "Recurring": true,
            "Endpoints": {"9": {}, "2": {}},
            "EdgeGroups": [4]
        }))
        .unwrap();
        let job = EdgeJob::from(raw);
        assert_eq!(job.environment_ids, vec![2, 9]);
        assert_eq!(job.environment_group_ids, vec![4]);
    }

    #[test]
    fn created_accepts_any_id_casing() {
        for body in [json!({"ID": 4}), json!({"Id": 4}), json!({"id": 4})] {
            assert_eq!(serde_json::from_value::<Created>(body).unwrap().id, 4);
        }
    }

    #[test]
    fn api_error_message_combines_details() {
        let body = ApiErrorBody {
            message: "Invalid request payload".into(),
            details: "Name is required".into(),
        };
        assert_eq!(body.into_message(), "Invalid request payload (Name is required)");
        let body = ApiErrorBody {
            message: String::new(),
            details: "boom".into(),
        };
        assert_eq!(body.into_message(), "boom");
    }
}
