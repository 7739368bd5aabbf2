//! User handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{ArgError, Arguments, validate};

use super::{failed, id, name};
use crate::Result;
use crate::portainer::{USER_ROLES, UserCreate, UserRole};
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_users", list_users),
    OperationSpec::read("get_user", get_user),
    OperationSpec::write("create_user", create_user),
    OperationSpec::write("update_user_role", update_user_role),
    OperationSpec::write("delete_user", delete_user),
];

fn role(args: &Arguments) -> tool_args::Result<UserRole> {
    let role = args.string("role", true)?;
    validate::one_of("role", &role, USER_ROLES)?;
    role.parse().map_err(|e: String| ArgError::invalid("role", e))
}

fn list_users<'a>(ctx: &'a ToolContext, _: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let users = ctx
            .backend()
            .list_users()
            .await
            .map_err(failed("failed to list users"))?;
        Ok(ResultEnvelope::json(&users))
    }
    .boxed()
}

fn get_user<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let user = ctx
            .backend()
            .get_user(id)
            .await
            .map_err(failed("failed to get user"))?;
        Ok(ResultEnvelope::json(&user))
    }
    .boxed()
}

fn create_user<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let user = UserCreate {
            username: name(args, "username")?,
            password: name(args, "password")?,
            role: role(args)?,
        };
        let id = ctx
            .backend()
            .create_user(&user)
            .await
            .map_err(failed("failed to create user"))?;
        Ok(ResultEnvelope::text(format!("User created successfully with ID: {id}")))
    }
    .boxed()
}

fn update_user_role<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let role = role(args)?;
        ctx.backend()
            .update_user_role(id, role)
            .await
            .map_err(failed("failed to update user role"))?;
        Ok(ResultEnvelope::text("User role updated successfully"))
    }
    .boxed()
}

fn delete_user<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_user(id)
            .await
            .map_err(failed("failed to delete user"))?;
        Ok(ResultEnvelope::text("User deleted successfully"))
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
    async fn unknown_role_is_rejected_before_backend() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(json!({"id": 2, "role": "superadmin"})).unwrap();

        let err = update_user_role(&ctx, &args).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid role parameter: must be one of: admin, user, edge_admin (got 'superadmin')"
        );
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn create_passes_parsed_role() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());
        let args = Arguments::from_value(
            json!({"username": "bob", "password": "s3cret!", "role": "edge_admin"}),
        )
        .unwrap();

        create_user(&ctx, &args).await.unwrap();

        assert_eq!(backend.last_args("create_user").unwrap(), "bob EdgeAdmin");
    }
}
