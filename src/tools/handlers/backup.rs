//! Backup handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{Arguments, validate};

use super::{failed, name, optional_url};
use crate::Result;
use crate::portainer::S3BackupSettings;
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("get_backup_status", get_backup_status),
    OperationSpec::read("get_backup_s3_settings", get_backup_s3_settings),
    OperationSpec::write("update_backup_s3_settings", update_backup_s3_settings),
    OperationSpec::write("run_s3_backup", run_s3_backup),
];

fn get_backup_status<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let status = ctx
            .backend()
            .get_backup_status()
            .await
            .map_err(failed("failed to get backup status"))?;
        Ok(ResultEnvelope::json(&status))
    }
    .boxed()
}

fn get_backup_s3_settings<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let settings = ctx
            .backend()
            .get_backup_s3_settings()
            .await
            .map_err(failed("failed to get backup S3 settings"))?;
        Ok(ResultEnvelope::json(&settings))
    }
    .boxed()
}

fn update_backup_s3_settings<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let cron_rule = args.string("cronRule", false)?;
        if !cron_rule.is_empty() {
            validate::cron_expression("cronRule", &cron_rule)?;
        }
        let settings = S3BackupSettings {
            access_key_id: name(args, "accessKeyId")?,
            secret_access_key: name(args, "secretAccessKey")?,
            region: args.string("region", false)?,
            bucket_name: name(args, "bucketName")?,
            s3_compatible_host: optional_url(args, "s3CompatibleHost")?.unwrap_or_default(),
            cron_rule,
            password: args.string("password", false)?,
        };
        ctx.backend()
            .update_backup_s3_settings(&settings)
            .await
            .map_err(failed("failed to update backup S3 settings"))?;
        Ok(ResultEnvelope::text("Backup S3 settings updated successfully"))
    }
    .boxed()
}

fn run_s3_backup<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let password = args.optional_string("password")?;
        ctx.backend()
            .run_s3_backup(password.as_deref())
            .await
            .map_err(failed("failed to run S3 backup"))?;
        Ok(ResultEnvelope::text("S3 backup started successfully"))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::MockBackend;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[tokio::test]
    async fn settings_never_expose_secrets() {
        let ctx = ToolContext::new(Arc::new(MockBackend::default()));
        let envelope = get_backup_s3_settings(&ctx, &Arguments::default()).await.unwrap();
        let body: Value = serde_json::from_str(envelope.text_content()).unwrap();
        assert_eq!(body["bucketName"], "backups");
        assert!(body.get("secretAccessKey").is_none());
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn compatible_host_must_be_url() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({
            "accessKeyId": "AKIA",
            "secretAccessKey": "secret",
            "bucketName": "backups",
            "s3CompatibleHost": "minio host"
        }))
        .unwrap();

        let err = update_backup_s3_settings(&ctx, &args).await.unwrap_err();

        assert!(err.to_string().starts_with("invalid s3CompatibleHost parameter"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn cron_rule_is_checked_when_present() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({
            "accessKeyId": "AKIA",
            "secretAccessKey": "secret",
            "bucketName": "backups",
            "cronRule": "@daily"
        }))
        .unwrap();

        let err = update_backup_s3_settings(&ctx, &args).await.unwrap_err();

        assert!(err.to_string().contains("exactly 5 fields, got 1"));
    }
}
