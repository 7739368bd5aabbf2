//! Custom template handlers

use futures::FutureExt;
use futures::future::BoxFuture;
use tool_args::{Arguments, validate};

use super::{failed, id, name, optional_name, optional_url};
use crate::Result;
use crate::portainer::{TEMPLATE_PLATFORMS, TemplateCreate, TemplateUpdate};
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};

/// Highest template type id (1 swarm, 2 compose, 3 kubernetes)
const MAX_TEMPLATE_TYPE: i64 = 3;

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::read("list_custom_templates", list_custom_templates),
    OperationSpec::read("get_custom_template", get_custom_template),
    OperationSpec::read("get_custom_template_file", get_custom_template_file),
    OperationSpec::write("create_custom_template", create_custom_template),
    OperationSpec::write("update_custom_template", update_custom_template),
    OperationSpec::write("delete_custom_template", delete_custom_template),
];

/// Platform name to backend id (`linux` is 1)
fn platform_id(platform: &str) -> tool_args::Result<i64> {
    validate::one_of("platform", platform, TEMPLATE_PLATFORMS)?;
    let index = TEMPLATE_PLATFORMS
        .iter()
        .position(|p| *p == platform)
        .unwrap_or_default();
    Ok(index as i64 + 1)
}

fn template_type(value: i64) -> tool_args::Result<i64> {
    validate::int_in_range("type", value, 1, MAX_TEMPLATE_TYPE)
}

fn list_custom_templates<'a>(
    ctx: &'a ToolContext,
    _: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let templates = ctx
            .backend()
            .list_custom_templates()
            .await
            .map_err(failed("failed to list custom templates"))?;
        Ok(ResultEnvelope::json(&templates))
    }
    .boxed()
}

fn get_custom_template<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let template = ctx
            .backend()
            .get_custom_template(id)
            .await
            .map_err(failed("failed to get custom template"))?;
        Ok(ResultEnvelope::json(&template))
    }
    .boxed()
}

fn get_custom_template_file<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let file = ctx
            .backend()
            .get_custom_template_file(id)
            .await
            .map_err(failed("failed to get custom template file"))?;
        Ok(ResultEnvelope::text(file))
    }
    .boxed()
}

fn create_custom_template<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let template = TemplateCreate {
            title: name(args, "title")?,
            description: name(args, "description")?,
            note: args.string("note", false)?,
            logo: optional_url(args, "logo")?.unwrap_or_default(),
            platform: platform_id(&args.string("platform", true)?)?,
            template_type: template_type(args.integer("type", true)?)?,
            file_content: name(args, "fileContent")?,
        };
        let id = ctx
            .backend()
            .create_custom_template(&template)
            .await
            .map_err(failed("failed to create custom template"))?;
        Ok(ResultEnvelope::text(format!(
            "Custom template created successfully with ID: {id}"
        )))
    }
    .boxed()
}

fn update_custom_template<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        let update = TemplateUpdate {
            title: optional_name(args, "title")?,
            description: optional_name(args, "description")?,
            note: args.optional_string("note")?,
            logo: optional_url(args, "logo")?,
            platform: args
                .optional_string("platform")?
                .map(|p| platform_id(&p))
                .transpose()?,
            template_type: args
                .optional_integer("type")?
                .map(template_type)
                .transpose()?,
            file_content: optional_name(args, "fileContent")?,
        };
        ctx.backend()
            .update_custom_template(id, &update)
            .await
            .map_err(failed("failed to update custom template"))?;
        Ok(ResultEnvelope::text("Custom template updated successfully"))
    }
    .boxed()
}

fn delete_custom_template<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let id = id(args, "id")?;
        ctx.backend()
            .delete_custom_template(id)
            .await
            .map_err(failed("failed to delete custom template"))?;
        Ok(ResultEnvelope::text("Custom template deleted successfully"))
    }
    .boxed()
}
