//! System handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::Arguments;

use super::failed;
use crate::Result;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] =
    &[OperationSpec::read("get_system_status", get_system_status)];

fn get_system_status<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let status = ctx
            .backend()
            .get_system_status()
            .await
            .map_err(failed("failed to get system status"))?;
        Ok(ResultEnvelope::json(&status))
    }
    .boxed()
}
