//! Docker and Kubernetes API proxy handlers
//!
//! Proxied responses are returned as raw text; a non-success status from
//! the environment's API is reported as an error carrying the body.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tool_args::{Arguments, validate};

use super::{failed, id};
use crate::portainer::{ProxyRequest, ProxyResponse};
use crate::tools::{OperationSpec, ResultEnvelope, ToolContext};
use crate::{Error, Result};

pub(super) const OPERATIONS: &[OperationSpec] = &[
    OperationSpec::write("docker_proxy", docker_proxy),
    OperationSpec::write("kubernetes_proxy", kubernetes_proxy),
    OperationSpec::read("get_kubernetes_resource_stripped", get_kubernetes_resource_stripped),
];

/// Build a proxy request; `method` overrides the `method` argument
fn request(args: &Arguments, path_arg: &str, method: Option<&str>) -> tool_args::Result<ProxyRequest> {
    let environment_id = id(args, "environmentId")?;
    let method = match method {
        Some(method) => method.to_string(),
        None => {
            let method = args.string("method", true)?;
            validate::http_method("method", &method)?;
            method
        }
    };
    let path = args.string(path_arg, true)?;
    validate::api_path(path_arg, &path)?;

    Ok(ProxyRequest {
        environment_id,
        method,
        path,
        query: args.key_values("queryParams", false)?,
        headers: args.key_values("headers", false)?,
        body: args.optional_string("body")?,
    })
}

/// Turn an error status into an API error
fn check_status(response: ProxyResponse) -> Result<String> {
    if response.status >= 400 {
        return Err(Error::Api {
            status: response.status,
            message: response.body,
        });
    }
    Ok(response.body)
}

/// Drop `metadata.managedFields` from an object and from each `items` entry
fn strip_managed_fields(value: &mut Value) {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("managedFields");
    }
    if let Some(items) = value.get_mut("items").and_then(Value::as_array_mut) {
        items.iter_mut().for_each(strip_managed_fields);
    }
}

fn docker_proxy<'a>(ctx: &'a ToolContext, args: &'a Arguments) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let request = request(args, "dockerAPIPath", None)?;
        let body = ctx
            .backend()
            .proxy_docker_request(&request)
            .await
            .and_then(check_status)
            .map_err(failed("failed to send Docker API request"))?;
        Ok(ResultEnvelope::text(body))
    }
    .boxed()
}

fn kubernetes_proxy<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let request = request(args, "kubernetesAPIPath", None)?;
        let body = ctx
            .backend()
            .proxy_kubernetes_request(&request)
            .await
            .and_then(check_status)
            .map_err(failed("failed to send Kubernetes API request"))?;
        Ok(ResultEnvelope::text(body))
    }
    .boxed()
}

fn get_kubernetes_resource_stripped<'a>(
    ctx: &'a ToolContext,
    args: &'a Arguments,
) -> BoxFuture<'a, Result<ResultEnvelope>> {
    async move {
        let mut request = request(args, "kubernetesAPIPath", Some("GET"))?;
        request.body = None;
        let body = ctx
            .backend()
            .proxy_kubernetes_request(&request)
            .await
            .and_then(check_status)
            .map_err(failed("failed to get Kubernetes resource"))?;

        // Non-JSON bodies (e.g. pod logs) pass through untouched
        match serde_json::from_str::<Value>(&body) {
            Ok(mut value) => {
                strip_managed_fields(&mut value);
                Ok(ResultEnvelope::json(&value))
            }
            Err(_) => Ok(ResultEnvelope::text(body)),
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::MockBackend;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn args(value: Value) -> Arguments {
        Arguments::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn docker_proxy_returns_raw_body() {
        let backend = Arc::new(MockBackend::default());
        backend.respond_with(200, r#"[{"Id":"abc"}]"#);
        let ctx = ToolContext::new(backend.clone());

        let envelope = docker_proxy(
            &ctx,
            &args(json!({"environmentId": 1, "method": "GET", "dockerAPIPath": "/containers/json"})),
        )
        .await
        .unwrap();

        assert_eq!(envelope.text_content(), r#"[{"Id":"abc"}]"#);
        assert_eq!(backend.last_args("proxy_docker_request").unwrap(), "1 GET /containers/json");
    }

    #[tokio::test]
    async fn invalid_method_or_path_makes_no_call() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());

        for (value, param) in [
            (json!({"environmentId": 1, "method": "PATCH", "dockerAPIPath": "/info"}), "method"),
            (json!({"environmentId": 1, "method": "GET", "dockerAPIPath": "info"}), "dockerAPIPath"),
            (json!({"environmentId": 0, "method": "GET", "dockerAPIPath": "/info"}), "environmentId"),
        ] {
            let err = docker_proxy(&ctx, &args(value)).await.unwrap_err();
            assert!(err.to_string().starts_with(&format!("invalid {param} parameter")), "{err}");
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn paths_leaving_the_environment_proxy_make_no_call() {
        let backend = Arc::new(MockBackend::default());
        let ctx = ToolContext::new(backend.clone());

        let err = get_kubernetes_resource_stripped(
            &ctx,
            &args(json!({"environmentId": 1, "kubernetesAPIPath": "/../../../users"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid kubernetesAPIPath parameter"), "{err}");

        let err = kubernetes_proxy(
            &ctx,
            &args(json!({"environmentId": 1, "method": "DELETE", "kubernetesAPIPath": "/%2e%2e/%2E%2E/users/4"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid kubernetesAPIPath parameter"), "{err}");

        let err = docker_proxy(
            &ctx,
            &args(json!({"environmentId": 1, "method": "PUT", "dockerAPIPath": "/containers/../../../settings"})),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid dockerAPIPath parameter"), "{err}");

        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn error_status_becomes_backend_error() {
        let backend = Arc::new(MockBackend::default());
        backend.respond_with(404, "page not found");
        let ctx = ToolContext::new(backend);

        let err = kubernetes_proxy(
            &ctx,
            &args(json!({"environmentId": 2, "method": "GET", "kubernetesAPIPath": "/api/v1/nope"})),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to send Kubernetes API request: API error (status 404): page not found"
        );
    }

    #[tokio::test]
    async fn stripped_get_removes_managed_fields() {
        let backend = Arc::new(MockBackend::default());
        backend.respond_with(
            200,
            &json!({
                "kind": "PodList",
                "metadata": {"resourceVersion": "1", "managedFields": [{"manager": "kubectl"}]},
                "items": [
                    {"metadata": {"name": "web", "managedFields": [{"manager": "kubelet"}]}},
                    {"metadata": {"name": "db"}}
                ]
            })
            .to_string(),
        );
        let ctx = ToolContext::new(backend.clone());

        let envelope = get_kubernetes_resource_stripped(
            &ctx,
            &args(json!({"environmentId": 3, "kubernetesAPIPath": "/api/v1/pods", "method": "DELETE"})),
        )
        .await
        .unwrap();

        let body: Value = serde_json::from_str(envelope.text_content()).unwrap();
        assert_eq!(
            body,
            json!({
                "kind": "PodList",
                "metadata": {"resourceVersion": "1"},
                "items": [{"metadata": {"name": "web"}}, {"metadata": {"name": "db"}}]
            })
        );
        assert_eq!(backend.last_args("proxy_kubernetes_request").unwrap(), "3 GET /api/v1/pods");
    }

    #[tokio::test]
    async fn stripped_get_passes_plain_text_through() {
        let backend = Arc::new(MockBackend::default());
        backend.respond_with(200, "log line 1\nlog line 2\n");
        let ctx = ToolContext::new(backend);

        let envelope = get_kubernetes_resource_stripped(
            &ctx,
            &args(json!({"environmentId": 3, "kubernetesAPIPath": "/api/v1/namespaces/default/pods/web/log"})),
        )
        .await
        .unwrap();

        assert_eq!(envelope.text_content(), "log line 1\nlog line 2\n");
    }
}
