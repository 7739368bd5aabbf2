//! Registry handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{Arguments, validate};

use super::{failed, id, name, optional_name};
use crate::Result;
use crate::portainer::{REGISTRY_TYPES, RegistryCreate, RegistryUpdate};
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_registries", list_registries),
    OperationSpec::read("get_registry", get_registry),
    OperationSpec::write("create_registry", create_registry),
    OperationSpec::write("update_registry", update_registry),
    OperationSpec::write("delete_registry", delete_registry),
];

fn list_registries<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let registries = ctx
            .backend()
            .list_registries()
            .await
            .map_err(failed("failed to list registries"))?;
        Ok(ResultEnvelope::json(&registries))
    }
    .boxed()
}

fn get_registry<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let registry = ctx
            .backend()
            .get_registry(id)
            .await
            .map_err(failed("failed to get registry"))?;
        Ok(ResultEnvelope::json(&registry))
    }
    .boxed()
}

fn create_registry<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let max_type = REGISTRY_TYPES.len() as i64;
        let registry = RegistryCreate {
            name: name(args, "name")?,
            registry_type: validate::int_in_range("type", args.integer("type", true)?, 1, max_type)?,
            url: name(args, "url")?,
            authentication: args.boolean("authentication", false)?,
            username: args.string("username", false)?,
            password: args.string("password", false)?,
        };
        let id = ctx
            .backend()
            .create_registry(&registry)
            .await
            .map_err(failed("failed to create registry"))?;
        Ok(ResultEnvelope::text(format!(
            "Registry created successfully with ID: {id}"
        )))
    }
    .boxed()
}

fn update_registry<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = RegistryUpdate {
            name: optional_name(args, "name")?,
            url: optional_name(args, "url")?,
            authentication: args.optional_boolean("authentication")?,
            username: args.optional_string("username")?,
            password: args.optional_string("password")?,
        };
        ctx.backend()
            .update_registry(id, &update)
            .await
            .map_err(failed("failed to update registry"))?;
        Ok(ResultEnvelope::text("Registry updated successfully"))
    }
    .boxed()
}

fn delete_registry<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_registry(id)
            .await
            .map_err(failed("failed to delete registry"))?;
        Ok(ResultEnvelope::text("Registry deleted successfully"))
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
    async fn registry_type_outside_range_is_rejected() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        for registry_type in [0, 8] {
            let args = Arguments::from_value(
                json!({"name": "hub", "type": registry_type, "url": "docker.io"}),
            )
            .unwrap();
            let err = create_registry(&ctx, &args).await.unwrap_err();
            assert!(err.to_string().contains("must be between 1 and 7"));
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn optional_credentials_default_to_empty() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({"name": "quay", "type": 1, "url": "quay.io"})).unwrap();

        let envelope = create_registry(&ctx, &args).await.unwrap();

        assert!(!envelope.is_error());
        assert_eq!(backend.last_args("create_registry").unwrap(), "quay 1");
    }
}
