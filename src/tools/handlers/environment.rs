//! Environment handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::{access_map, failed, id};
use crate::Result;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_environments", list_environments),
    OperationSpec::read("get_environment", get_environment),
    OperationSpec::write("delete_environment", delete_environment),
    OperationSpec::write("update_environment_tags", update_environment_tags),
    OperationSpec::write("update_environment_user_accesses", update_environment_user_accesses),
    OperationSpec::write("update_environment_team_accesses", update_environment_team_accesses),
];

fn list_environments<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let environments = ctx
            .backend()
            .list_environments()
            .await
            .map_err(failed("failed to list environments"))?;
        Ok(ResultEnvelope::json(&environments))
    }
    .boxed()
}

fn get_environment<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let environment = ctx
            .backend()
            .get_environment(id)
            .await
            .map_err(failed("failed to get environment"))?;
        Ok(ResultEnvelope::json(&environment))
    }
    .boxed()
}

fn delete_environment<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_environment(id)
            .await
            .map_err(failed("failed to delete environment"))?;
        Ok(ResultEnvelope::text("Environment deleted successfully"))
    }
    .boxed()
}

fn update_environment_tags<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let tag_ids = super::ids(args, "tagIds")?;
        ctx.backend()
            .update_environment_tags(id, &tag_ids)
            .await
            .map_err(failed("failed to update environment tags"))?;
        Ok(ResultEnvelope::text("Environment tags updated successfully"))
    }
    .boxed()
}

fn update_environment_user_accesses<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let accesses = access_map(args, "userAccesses")?;
        ctx.backend()
            .update_environment_user_accesses(id, &accesses)
            .await
            .map_err(failed("failed to update environment user accesses"))?;
        Ok(ResultEnvelope::text("Environment user accesses updated successfully"))
    }
    .boxed()
}

fn update_environment_team_accesses<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let accesses = access_map(args, "teamAccesses")?;
        ctx.backend()
            .update_environment_team_accesses(id, &accesses)
            .await
            .map_err(failed("failed to update environment team accesses"))?;
        Ok(ResultEnvelope::text("Environment team accesses updated successfully"))
    }
    .boxed()
}
