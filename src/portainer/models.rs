//! Portainer resources in the shape returned to agents
//!
//! These are flattened views of the raw API objects: access policies become
//! `id -> access level` maps, numeric enums become readable strings, and
//! secrets are never serialized back out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tool_args::KeyValue;

/// Access level granted to a user or team on an environment or access group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Full control over the environment
    EnvironmentAdministrator,
    /// Read-only access plus console/log access for support staff
    HelpdeskUser,
    /// Deploy and manage resources
    StandardUser,
    /// View resources only
    ReadonlyUser,
    /// Operate existing resources (restart, logs) without deploying
    OperatorUser,
}

/// Accepted access level names, in role-id order
pub const ACCESS_LEVELS: &[&str] = &[
    "environment_administrator",
    "helpdesk_user",
    "standard_user",
    "readonly_user",
    "operator_user",
];

impl AccessLevel {
    const ALL: [Self; 5] = [
        Self::EnvironmentAdministrator,
        Self::HelpdeskUser,
        Self::StandardUser,
        Self::ReadonlyUser,
        Self::OperatorUser,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        ACCESS_LEVELS[self.index()]
    }

    /// Portainer role id backing this access level
    #[must_use]
    pub fn role_id(self) -> i64 {
        self.index() as i64 + 1
    }

    /// Access level for a Portainer role id
    #[must_use]
    pub fn from_role_id(role_id: i64) -> Option<Self> {
        usize::try_from(role_id - 1)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    fn index(self) -> usize {
        match self {
            Self::EnvironmentAdministrator => 0,
            Self::HelpdeskUser => 1,
            Self::StandardUser => 2,
            Self::ReadonlyUser => 3,
            Self::OperatorUser => 4,
        }
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown access level '{s}'"))
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User or team id to access level
pub type AccessMap = BTreeMap<i64, AccessLevel>;

/// Portainer user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Administrator
    Admin,
    /// Standard user
    User,
    /// Edge administrator
    EdgeAdmin,
}

/// Accepted user role names
pub const USER_ROLES: &[&str] = &["admin", "user", "edge_admin"];

impl UserRole {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::EdgeAdmin => "edge_admin",
        }
    }

    /// Portainer role id
    #[must_use]
    pub fn role_id(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::User => 2,
            Self::EdgeAdmin => 3,
        }
    }

    /// Role for a Portainer role id
    #[must_use]
    pub fn from_role_id(role_id: i64) -> Option<Self> {
        match role_id {
            1 => Some(Self::Admin),
            2 => Some(Self::User),
            3 => Some(Self::EdgeAdmin),
            _ => None,
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            "edge_admin" => Ok(Self::EdgeAdmin),
            other => Err(format!("unknown user role '{other}'")),
        }
    }
}

/// Managed Docker or Kubernetes environment (Portainer "endpoint")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Environment id
    pub id: i64,
    /// Display name
    pub name: String,
    /// `active`, `inactive` or `unknown`
    pub status: String,
    /// Platform/connection type, e.g. `docker-local`, `kubernetes-agent`
    #[serde(rename = "type")]
    pub environment_type: String,
    /// Connection URL
    pub url: String,
    /// Access group the environment belongs to
    pub group_id: i64,
    /// Attached tag ids
    pub tag_ids: Vec<i64>,
    /// Per-user access
    pub user_accesses: AccessMap,
    /// Per-team access
    pub team_accesses: AccessMap,
}

/// Group of environments used to target edge deployments (Portainer "edge group")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentGroup {
    /// Group id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Member environment ids
    pub environment_ids: Vec<i64>,
    /// Tag ids
    pub tag_ids: Vec<i64>,
}

/// Partial update for an environment group; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentGroupUpdate {
    /// New name
    pub name: Option<String>,
    /// Replacement member list
    pub environment_ids: Option<Vec<i64>>,
    /// Replacement tag list
    pub tag_ids: Option<Vec<i64>>,
}

/// Group of environments sharing access policies (Portainer "endpoint group")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGroup {
    /// Group id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Environments in the group
    pub environment_ids: Vec<i64>,
    /// Per-user access
    pub user_accesses: AccessMap,
    /// Per-team access
    pub team_accesses: AccessMap,
}

/// Partial update for an access group; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessGroupUpdate {
    /// New name
    pub name: Option<String>,
    /// Replacement user access map
    pub user_accesses: Option<AccessMap>,
    /// Replacement team access map
    pub team_accesses: Option<AccessMap>,
}

/// Environment tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag id
    pub id: i64,
    /// Tag name
    pub name: String,
}

/// Edge stack deployed to environment groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    /// Stack id
    pub id: i64,
    /// Stack name
    pub name: String,
    /// Targeted environment group ids
    pub environment_group_ids: Vec<i64>,
    /// Creation time (unix seconds)
    pub created_at: i64,
}

/// Team with its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Team id
    pub id: i64,
    /// Team name
    pub name: String,
    /// Member user ids
    pub member_ids: Vec<i64>,
}

/// Portainer user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: i64,
    /// Login name
    pub username: String,
    /// `admin`, `user`, `edge_admin` or `unknown`
    pub role: String,
}

/// New user
#[derive(Debug, Clone, PartialEq)]
pub struct UserCreate {
    /// Login name
    pub username: String,
    /// Initial password
    pub password: String,
    /// Role
    pub role: UserRole,
}

/// Server settings relevant to agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// `internal`, `ldap`, `oauth` or `unknown`
    pub authentication_method: String,
    /// Edge compute features enabled
    pub enable_edge_compute: bool,
    /// Anonymous telemetry enabled
    pub enable_telemetry: bool,
    /// Environment snapshot interval (e.g. `5m`)
    pub snapshot_interval: String,
    /// Custom logo URL
    pub logo_url: String,
}

/// Partial settings update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    /// Edge compute features
    pub enable_edge_compute: Option<bool>,
    /// Telemetry
    pub enable_telemetry: Option<bool>,
    /// Snapshot interval
    pub snapshot_interval: Option<String>,
    /// Logo URL
    pub logo_url: Option<String>,
}

/// Container image registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    /// Registry id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Registry type id (1-7)
    #[serde(rename = "type")]
    pub registry_type: i64,
    /// Registry type name, e.g. `dockerhub`
    pub type_name: String,
    /// Registry URL
    pub url: String,
    /// Whether credentials are configured
    pub authentication: bool,
    /// Username used for authentication
    pub username: String,
}

/// Registry type names indexed by `type - 1`
pub const REGISTRY_TYPES: &[&str] = &[
    "quay", "azure", "custom", "gitlab", "proget", "dockerhub", "ecr",
];

/// Name of a registry type id, `unknown` when out of range
#[must_use]
pub fn registry_type_name(registry_type: i64) -> &'static str {
    usize::try_from(registry_type - 1)
        .ok()
        .and_then(|i| REGISTRY_TYPES.get(i).copied())
        .unwrap_or("unknown")
}

/// New registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryCreate {
    /// Display name
    pub name: String,
    /// Registry type id (1-7)
    pub registry_type: i64,
    /// Registry URL
    pub url: String,
    /// Whether credentials are used
    pub authentication: bool,
    /// Username
    pub username: String,
    /// Password or token
    pub password: String,
}

/// Partial registry update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryUpdate {
    /// Display name
    pub name: Option<String>,
    /// Registry URL
    pub url: Option<String>,
    /// Whether credentials are used
    pub authentication: Option<bool>,
    /// Username
    pub username: Option<String>,
    /// Password or token
    pub password: Option<String>,
}

/// Custom application template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTemplate {
    /// Template id
    pub id: i64,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Free-form note
    pub note: String,
    /// Logo URL
    pub logo: String,
    /// `linux` or `windows`
    pub platform: String,
    /// Template type id: 1 swarm, 2 compose, 3 kubernetes
    #[serde(rename = "type")]
    pub template_type: i64,
    /// Creator user id
    pub created_by_user_id: i64,
}

/// Template platforms indexed by `platform - 1`
pub const TEMPLATE_PLATFORMS: &[&str] = &["linux", "windows"];

/// New custom template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCreate {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Note
    pub note: String,
    /// Logo URL
    pub logo: String,
    /// Platform id: 1 linux, 2 windows
    pub platform: i64,
    /// Template type id (1-3)
    pub template_type: i64,
    /// Compose or manifest content
    pub file_content: String,
}

/// Partial template update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateUpdate {
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Note
    pub note: Option<String>,
    /// Logo URL
    pub logo: Option<String>,
    /// Platform id
    pub platform: Option<i64>,
    /// Template type id
    pub template_type: Option<i64>,
    /// Compose or manifest content
    pub file_content: Option<String>,
}

/// Scheduled script executed on edge environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeJob {
    /// Job id
    pub id: i64,
    /// Job name
    pub name: String,
    /// 5-field cron expression
    pub cron_expression: String,
    /// Whether the job repeats
    pub recurring: bool,
    /// Targeted environment ids
    pub environment_ids: Vec<i64>,
    /// Targeted environment group ids
    pub environment_group_ids: Vec<i64>,
}

/// New edge job
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeJobCreate {
    /// Job name
    pub name: String,
    /// 5-field cron expression
    pub cron_expression: String,
    /// Whether the job repeats
    pub recurring: bool,
    /// Targeted environment ids
    pub environment_ids: Vec<i64>,
    /// Targeted environment group ids
    pub environment_group_ids: Vec<i64>,
    /// Script content
    pub file_content: String,
}

/// Outcome of the last scheduled S3 backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// Whether the last run failed
    pub failed: bool,
    /// Time of the last run (UTC)
    pub timestamp_utc: String,
}

/// S3 backup configuration
///
/// `secret_access_key` and `password` are accepted on input but never
/// serialized back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3BackupSettings {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    #[serde(default, skip_serializing)]
    pub secret_access_key: String,
    /// Bucket region
    pub region: String,
    /// Bucket name
    pub bucket_name: String,
    /// Custom S3-compatible endpoint
    pub s3_compatible_host: String,
    /// Schedule (5-field cron), empty for manual only
    pub cron_rule: String,
    /// Archive encryption password
    #[serde(default, skip_serializing)]
    pub password: String,
}

/// Server status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Server version, e.g. `2.31.2`
    pub version: String,
    /// Instance identifier
    pub instance_id: String,
}

/// Request forwarded to an environment's Docker or Kubernetes API
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    /// Target environment id
    pub environment_id: i64,
    /// HTTP method
    pub method: String,
    /// API path (starts with `/`)
    pub path: String,
    /// Query parameters
    pub query: Vec<KeyValue>,
    /// Extra request headers
    pub headers: Vec<KeyValue>,
    /// Raw request body
    pub body: Option<String>,
}

/// Response from a proxied API call
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn access_level_role_ids_round_trip() {
        for (i, name) in ACCESS_LEVELS.iter().enumerate() {
            let level: AccessLevel = name.parse().unwrap();
            assert_eq!(level.as_str(), *name);
            assert_eq!(level.role_id(), i as i64 + 1);
            assert_eq!(AccessLevel::from_role_id(level.role_id()), Some(level));
        }
        assert_eq!(AccessLevel::from_role_id(0), None);
        assert_eq!(AccessLevel::from_role_id(6), None);
        assert!("superuser".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn access_level_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(AccessLevel::ReadonlyUser).unwrap(),
            json!("readonly_user")
        );
    }

    #[test]
    fn user_role_mapping() {
        for name in USER_ROLES {
            let role: UserRole = name.parse().unwrap();
            assert_eq!(UserRole::from_role_id(role.role_id()), Some(role));
        }
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn registry_type_names() {
        assert_eq!(registry_type_name(1), "quay");
        assert_eq!(registry_type_name(6), "dockerhub");
        assert_eq!(registry_type_name(0), "unknown");
        assert_eq!(registry_type_name(8), "unknown");
    }

    #[test]
    fn backup_secrets_are_not_serialized() {
        let settings = S3BackupSettings {
            access_key_id: "AKIA".into(),
            secret_access_key: "shh".into(),
            password: "also-shh".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["accessKeyId"], "AKIA");
        assert!(value.get("secretAccessKey").is_none());
        assert!(value.get("password").is_none());
    }

    #[test]
    fn environment_serializes_type_and_access_maps() {
        let env = Environment {
            id: 1,
            name: "local".into(),
            status: "active".into(),
            environment_type: "docker-local".into(),
            url: "unix:///var/run/docker.sock".into(),
            group_id: 1,
            tag_ids: vec![2],
            user_accesses: AccessMap::from([(3, AccessLevel::StandardUser)]),
            team_accesses: AccessMap::new(),
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["type"], "docker-local");
        assert_eq!(value["userAccesses"]["3"], "standard_user");
    }
}
