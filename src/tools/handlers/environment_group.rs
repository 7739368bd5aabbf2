//! Environment group handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{ArgError, Arguments};

use super::{failed, id, ids, name, optional_ids, optional_name};
use crate::Result;
use crate::portainer::EnvironmentGroupUpdate;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_environment_groups", list_environment_groups),
    OperationSpec::write("create_environment_group", create_environment_group),
    OperationSpec::write("update_environment_group", update_environment_group),
    OperationSpec::write("delete_environment_group", delete_environment_group),
];

fn list_environment_groups<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let groups = ctx
            .backend()
            .list_environment_groups()
            .await
            .map_err(failed("failed to list environment groups"))?;
        Ok(ResultEnvelope::json(&groups))
    }
    .boxed()
}

fn create_environment_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let name = name(args, "name")?;
        let environment_ids = ids(args, "environmentIds")?;
        let id = ctx
            .backend()
            .create_environment_group(&name, &environment_ids)
            .await
            .map_err(failed("failed to create environment group"))?;
        Ok(ResultEnvelope::text(format!(
            "Environment group created successfully with ID: {id}"
        )))
    }
    .boxed()
}

fn update_environment_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = EnvironmentGroupUpdate {
            name: optional_name(args, "name")?,
            environment_ids: optional_ids(args, "environmentIds")?,
            tag_ids: optional_ids(args, "tagIds")?,
        };
        if update == EnvironmentGroupUpdate::default() {
            return Err(ArgError::invalid(
                "name",
                "at least one of name, environmentIds or tagIds must be provided",
            )
            .into());
        }
        ctx.backend()
            .update_environment_group(id, &update)
            .await
            .map_err(failed("failed to update environment group"))?;
        Ok(ResultEnvelope::text("Environment group updated successfully"))
    }
    .boxed()
}

fn delete_environment_group<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_environment_group(id)
            .await
            .map_err(failed("failed to delete environment group"))?;
        Ok(ResultEnvelope::text("Environment group deleted successfully"))
    }
    .boxed()
}
