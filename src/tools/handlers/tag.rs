//! Tag handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::{failed, id, name};
use crate::Result;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_tags", list_tags),
    OperationSpec::write("create_tag", create_tag),
    OperationSpec::write("delete_tag", delete_tag),
];

fn list_tags<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let tags = ctx
            .backend()
            .list_tags()
            .await
            .map_err(failed("failed to list tags"))?;
        Ok(ResultEnvelope::json(&tags))
    }
    .boxed()
}

fn create_tag<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let name = name(args, "name")?;
        let id = ctx
            .backend()
            .create_tag(&name)
            .await
            .map_err(failed("failed to create tag"))?;
        Ok(ResultEnvelope::text(format!("Tag created successfully with ID: {id}")))
    }
    .boxed()
}

fn delete_tag<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_tag(id)
            .await
            .map_err(failed("failed to delete tag"))?;
        Ok(ResultEnvelope::text("Tag deleted successfully"))
    }
    .boxed()
}
