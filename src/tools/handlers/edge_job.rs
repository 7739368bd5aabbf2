//! Edge job handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{ArgError, Arguments, validate};

use super::{failed, id, name, optional_ids};
use crate::Result;
use crate::portainer::EdgeJobCreate;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_edge_jobs", list_edge_jobs),
    OperationSpec::read("get_edge_job", get_edge_job),
    OperationSpec::read("get_edge_job_file", get_edge_job_file),
    OperationSpec::write("create_edge_job", create_edge_job),
    OperationSpec::write("delete_edge_job", delete_edge_job),
];

fn list_edge_jobs<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let jobs = ctx
            .backend()
            .list_edge_jobs()
            .await
            .map_err(failed("failed to list edge jobs"))?;
        Ok(ResultEnvelope::json(&jobs))
    }
    .boxed()
}

fn get_edge_job<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let job = ctx
            .backend()
            .get_edge_job(id)
            .await
            .map_err(failed("failed to get edge job"))?;
        Ok(ResultEnvelope::json(&job))
    }
    .boxed()
}

fn get_edge_job_file<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let file = ctx
            .backend()
            .get_edge_job_file(id)
            .await
            .map_err(failed("failed to get edge job file"))?;
        Ok(ResultEnvelope::text(file))
    }
    .boxed()
}

fn create_edge_job<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let cron_expression = args.string("cronExpression", true)?;
        validate::cron_expression("cronExpression", &cron_expression)?;
        let job = EdgeJobCreate {
            name: name(args, "name")?,
            cron_expression,
            recurring: args.boolean("recurring", false)?,
            environment_ids: optional_ids(args, "environmentIds")?.unwrap_or_default(),
            environment_group_ids: optional_ids(args, "environmentGroupIds")?.unwrap_or_default(),
            file_content: name(args, "fileContent")?,
        };
        if job.environment_ids.is_empty() && job.environment_group_ids.is_empty() {
            return Err(ArgError::invalid(
                "environmentIds",
                "at least one environment or environment group must be targeted",
            )
            .into());
        }
        let id = ctx
            .backend()
            .create_edge_job(&job)
            .await
            .map_err(failed("failed to create edge job"))?;
        Ok(ResultEnvelope::text(format!(
            "Edge job created successfully with ID: {id}"
        )))
    }
    .boxed()
}

fn delete_edge_job<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_edge_job(id)
            .await
            .map_err(failed("failed to delete edge job"))?;
        Ok(ResultEnvelope::text("Edge job deleted successfully"))
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
    async fn four_field_cron_is_rejected() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({
            "name": "prune",
            "cronExpression": "* * * *",
            "environmentIds": [1],
            "fileContent": "docker system prune -f"
        }))
        .unwrap();

        let err = create_edge_job(&ctx, &args).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid cronExpression parameter: cron expression must have exactly 5 fields, got 4"
        );
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn job_needs_a_target() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({
            "name": "prune",
            "cronExpression": "* * * * *",
            "fileContent": "docker system prune -f"
        }))
        .unwrap();

        let err = create_edge_job(&ctx, &args).await.unwrap_err();

        assert!(err.to_string().contains("at least one environment"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn valid_job_is_created() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({
            "name": "prune",
            "cronExpression": "0 3 * * *",
            "recurring": true,
            "environmentGroupIds": [2],
            "fileContent": "docker system prune -f"
        }))
        .unwrap();

        create_edge_job(&ctx, &args).await.unwrap();

        assert_eq!(backend.last_args("create_edge_job").unwrap(), "prune 0 3 * * * true");
    }
}
