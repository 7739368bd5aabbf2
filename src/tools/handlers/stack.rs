//! Stack handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{Arguments, validate};

use super::{failed, id, ids, name, optional_ids};
use crate::Result;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_stacks", list_stacks),
    OperationSpec::read("get_stack_file", get_stack_file),
    OperationSpec::write("create_stack", create_stack),
    OperationSpec::write("update_stack", update_stack),
    OperationSpec::write("delete_stack", delete_stack),
];

fn list_stacks<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let stacks = ctx
            .backend()
            .list_stacks()
            .await
            .map_err(failed("failed to list stacks"))?;
        Ok(ResultEnvelope::json(&stacks))
    }
    .boxed()
}

fn get_stack_file<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let file = ctx
            .backend()
            .get_stack_file(id)
            .await
            .map_err(failed("failed to get stack file"))?;
        Ok(ResultEnvelope::text(file))
    }
    .boxed()
}

fn create_stack<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let name = name(args, "name")?;
        let file = args.string("file", true)?;
        validate::non_empty("file", &file)?;
        let group_ids = ids(args, "environmentGroupIds")?;
        let id = ctx
            .backend()
            .create_stack(&name, &file, &group_ids)
            .await
            .map_err(failed("failed to create stack"))?;
        Ok(ResultEnvelope::text(format!("Stack created successfully with ID: {id}")))
    }
    .boxed()
}

fn update_stack<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let file = args.string("file", true)?;
        validate::non_empty("file", &file)?;
        let group_ids = optional_ids(args, "environmentGroupIds")?;
        ctx.backend()
            .update_stack(id, &file, group_ids.as_deref())
            .await
            .map_err(failed("failed to update stack"))?;
        Ok(ResultEnvelope::text("Stack updated successfully"))
    }
    .boxed()
}

fn delete_stack<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_stack(id)
            .await
            .map_err(failed("failed to delete stack"))?;
        Ok(ResultEnvelope::text("Stack deleted successfully"))
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
    async fn stack_file_is_returned_as_raw_text() {
        let ctx = ToolContext::new(Arc::new(MockBackend::default()));
        let args = Arguments::from_value(json!({"id": 1})).unwrap();
        let envelope = get_stack_file(&ctx, &args).await.unwrap();
        assert!(envelope.text_content().starts_with("services:\n"));
    }

    #[tokio::test]
    async fn update_keeps_targets_when_groups_absent() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({"id": 1, "file": "services: {}"})).unwrap();

        update_stack(&ctx, &args).await.unwrap();

        assert_eq!(backend.last_args("update_stack").unwrap(), "1 12 None");
    }
}
