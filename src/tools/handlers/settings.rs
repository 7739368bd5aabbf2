//! Settings handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{ArgError, Arguments};

use super::{failed, optional_name, optional_url};
use crate::Result;
use crate::portainer::SettingsUpdate;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("get_settings", get_settings),
    OperationSpec::write("update_settings", update_settings),
];

fn get_settings<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let settings = ctx
            .backend()
            .get_settings()
            .await
            .map_err(failed("failed to get settings"))?;
        Ok(ResultEnvelope::json(&settings))
    }
    .boxed()
}

fn update_settings<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let update = SettingsUpdate {
            enable_edge_compute: args.optional_boolean("enableEdgeCompute")?,
            enable_telemetry: args.optional_boolean("enableTelemetry")?,
            snapshot_interval: optional_name(args, "snapshotInterval")?,
            logo_url: optional_url(args, "logoUrl")?,
        };
        if update == SettingsUpdate::default() {
            return Err(ArgError::invalid(
                "settings",
                "at least one of enableEdgeCompute, enableTelemetry, snapshotInterval or logoUrl must be provided",
            )
            .into());
        }
        ctx.backend()
            .update_settings(&update)
            .await
            .map_err(failed("failed to update settings"))?;
        Ok(ResultEnvelope::text("Settings updated successfully"))
    }
    .boxed()
}
