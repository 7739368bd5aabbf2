//! Team handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::{failed, id, ids, name};
use crate::Result;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_teams", list_teams),
    OperationSpec::write("create_team", create_team),
    OperationSpec::write("update_team_name", update_team_name),
    OperationSpec::write("update_team_members", update_team_members),
    OperationSpec::write("delete_team", delete_team),
];

fn list_teams<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let teams = ctx
            .backend()
            .list_teams()
            .await
            .map_err(failed("failed to list teams"))?;
        Ok(ResultEnvelope::json(&teams))
    }
    .boxed()
}

fn create_team<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let name = name(args, "name")?;
        let id = ctx
            .backend()
            .create_team(&name)
            .await
            .map_err(failed("failed to create team"))?;
        Ok(ResultEnvelope::text(format!("Team created successfully with ID: {id}")))
    }
    .boxed()
}

fn update_team_name<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let name = name(args, "name")?;
        ctx.backend()
            .update_team_name(id, &name)
            .await
            .map_err(failed("failed to update team name"))?;
        Ok(ResultEnvelope::text("Team name updated successfully"))
    }
    .boxed()
}

fn update_team_members<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let user_ids = ids(args, "userIds")?;
        ctx.backend()
            .update_team_members(id, &user_ids)
            .await
            .map_err(failed("failed to update team members"))?;
        Ok(ResultEnvelope::text("Team members updated successfully"))
    }
    .boxed()
}

fn delete_team<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_team(id)
            .await
            .map_err(failed("failed to delete team"))?;
        Ok(ResultEnvelope::text("Team deleted successfully"))
    }
    .boxed()
}
