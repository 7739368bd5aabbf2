//! Access group handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::{access_map, failed, id, name, optional_ids};
use crate::Result;
use crate::portainer::AccessGroupUpdate;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_access_groups", list_access_groups),
    OperationSpec::write("create_access_group", create_access_group),
    OperationSpec::write("update_access_group_name", update_access_group_name),
    OperationSpec::write("update_access_group_user_accesses", update_access_group_user_accesses),
    OperationSpec::write("update_access_group_team_accesses", update_access_group_team_accesses),
    OperationSpec::write("add_environment_to_access_group", add_environment_to_access_group),
    OperationSpec::write(
        "remove_environment_from_access_group",
        remove_environment_from_access_group,
    ),
];

fn list_access_groups<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let groups = ctx
            .backend()
            .list_access_groups()
            .await
            .map_err(failed("failed to list access groups"))?;
        Ok(ResultEnvelope::json(&groups))
    }
    .boxed()
}

fn create_access_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let name = name(args, "name")?;
        let environment_ids = optional_ids(args, "environmentIds")?.unwrap_or_default();
        let id = ctx
            .backend()
            .create_access_group(&name, &environment_ids)
            .await
            .map_err(failed("failed to create access group"))?;
        Ok(ResultEnvelope::text(format!(
            "Access group created successfully with ID: {id}"
        )))
    }
    .boxed()
}

fn update_access_group_name<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = AccessGroupUpdate {
            name: Some(name(args, "name")?),
            ..AccessGroupUpdate::default()
        };
        ctx.backend()
            .update_access_group(id, &update)
            .await
            .map_err(failed("failed to update access group name"))?;
        Ok(ResultEnvelope::text("Access group name updated successfully"))
    }
    .boxed()
}

fn update_access_group_user_accesses<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = AccessGroupUpdate {
            user_accesses: Some(access_map(args, "userAccesses")?),
            ..AccessGroupUpdate::default()
        };
        ctx.backend()
            .update_access_group(id, &update)
            .await
            .map_err(failed("failed to update access group user accesses"))?;
        Ok(ResultEnvelope::text("Access group user accesses updated successfully"))
    }
    .boxed()
}

fn update_access_group_team_accesses<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = AccessGroupUpdate {
            team_accesses: Some(access_map(args, "teamAccesses")?),
            ..AccessGroupUpdate::default()
        };
        ctx.backend()
            .update_access_group(id, &update)
            .await
            .map_err(failed("failed to update access group team accesses"))?;
        Ok(ResultEnvelope::text("Access group team accesses updated successfully"))
    }
    .boxed()
}

fn add_environment_to_access_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let group_id = id(args, "id")?;
        let environment_id = id(args, "environmentId")?;
        ctx.backend()
            .add_environment_to_access_group(group_id, environment_id)
            .await
            .map_err(failed("failed to add environment to access group"))?;
        Ok(ResultEnvelope::text("Environment added to access group successfully"))
    }
    .boxed()
}

fn remove_environment_from_access_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let group_id = id(args, "id")?;
        let environment_id = id(args, "environmentId")?;
        ctx.backend()
            .remove_environment_from_access_group(group_id, environment_id)
            .await
            .map_err(failed("failed to remove environment from access group"))?;
        Ok(ResultEnvelope::text("Environment removed from access group successfully"))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::MockBackend;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn rename_leaves_policies_untouched() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({"id": 2, "name": "production"})).unwrap();

        update_access_group_name(&ctx, &args).await.unwrap();

        let recorded = backend.last_args("update_access_group").unwrap();
        assert!(recorded.contains("name: Some(\"production\")"));
        assert!(recorded.contains("user_accesses: None"));
        assert!(recorded.contains("team_accesses: None"));
    }

    #[tokio::test]
    async fn create_without_environments_sends_empty_list() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({"name": "staging"})).unwrap();

        create_access_group(&ctx, &args).await.unwrap();

        assert_eq!(backend.last_args("create_access_group").unwrap(), "staging []");
    }
}
