//! 请求分发器
//!
//! 一次请求依次经过：路由匹配、方法解析、权限检查、载荷解析、处理、收尾与格式化。
//! 任何阶段的错误都被转换为统一的错误信封

use super::request::{ApiEnvelope, ApiRequest, ApiResponse, RequestContext};
use super::resource::Resource;
use crate::error::{QuickRestError, QuickRestResult};
use crate::i18n::{t, tf};
use crate::security;
use crate::storage::ConnectionRegistry;
use crate::types::{json_value_to_data_value, DataValue};
use crate::utils::{format_response, normalize_payload, query_to_payload};
use rat_logger::{debug, error, info, warn};
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;

struct Route {
    pattern: Regex,
    resource: Arc<Resource>,
}

/// 请求分发器
pub struct ApiDispatcher {
    routes: Vec<Route>,
    registry: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for ApiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiDispatcher")
            .field(
                "routes",
                &self.routes.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>(),
            )
            .field("registry", &self.registry)
            .finish()
    }
}

impl ApiDispatcher {
    pub fn builder() -> ApiDispatcherBuilder {
        ApiDispatcherBuilder::default()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// 处理一次请求，总是返回一个信封
    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        info!("收到请求 [{}] {} {}", request_id, request.method, request.path);

        let Some((resource, args)) = self.match_route(&request.path) else {
            warn!("[{}] 未匹配任何路由: {}", request_id, request.path);
            return ApiResponse::new(
                404,
                ApiEnvelope {
                    success: false,
                    message: tf("error.not_found", &[("path", request.path.as_str())]),
                    data: serde_json::Value::Object(serde_json::Map::new()),
                },
            );
        };

        match self.handle(&request_id, resource, args, request).await {
            Ok(data) => success_response(&data),
            Err(e) => error_response(&request_id, &e),
        }
    }

    fn match_route(&self, path: &str) -> Option<(&Arc<Resource>, Vec<String>)> {
        self.routes.iter().find_map(|route| {
            let captures = route.pattern.captures(path)?;
            let args = captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect();
            Some((&route.resource, args))
        })
    }

    async fn handle(
        &self,
        request_id: &str,
        resource: &Arc<Resource>,
        args: Vec<String>,
        request: ApiRequest,
    ) -> QuickRestResult<DataValue> {
        let pk = args.iter().find_map(|arg| security::decode_id(arg).ok());
        let operation = resource.resolve(&request.method, pk.is_some()).ok_or_else(|| {
            QuickRestError::MethodNotAvailable {
                method: request.method.clone(),
            }
        })?;
        debug!(
            "[{}] 资源 {} 解析为操作 {}",
            request_id,
            resource.name(),
            operation.name()
        );

        let worker = self.registry.context().await?;
        let ctx = RequestContext {
            request_id: request_id.to_string(),
            method: request.method.clone(),
            path: request.path.clone(),
            args,
            pk,
            user: request.cookies.get("user").cloned(),
            account: request.cookies.get("account").cloned(),
            query: request.query.clone(),
            worker,
        };

        for permission in resource.permissions() {
            permission.has_permission(&ctx).await?;
        }

        let payload = parse_payload(&request)?;
        crate::debug_log!("[{}] 请求载荷: {:?}", request_id, payload);

        let started = Instant::now();
        let result = resource.invoke(operation, &ctx, payload).await;
        info!(
            "[{}] {}.{} 处理耗时 {:?}",
            request_id,
            resource.name(),
            operation.name(),
            started.elapsed()
        );

        resource.finalize_response(&ctx, result?)
    }
}

/// 读操作使用查询参数，写操作把请求体解析为JSON文档
fn parse_payload(request: &ApiRequest) -> QuickRestResult<DataValue> {
    if request.reads_query() {
        return Ok(normalize_payload(query_to_payload(&request.query)));
    }

    let text = std::str::from_utf8(&request.body).map_err(|e| QuickRestError::InvalidInputData {
        message: e.to_string(),
    })?;
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| QuickRestError::InvalidData {
            message: e.to_string(),
        })?;
    Ok(normalize_payload(json_value_to_data_value(json)))
}

/// 成功信封；结果中的 `success` / `message` 键会覆盖默认值
fn success_response(data: &DataValue) -> ApiResponse {
    let success = data.get("success").and_then(DataValue::as_bool).unwrap_or(true);
    let message = data
        .get("message")
        .and_then(DataValue::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| t("error.success"));

    ApiResponse::new(
        200,
        ApiEnvelope {
            success,
            message,
            data: format_response(data),
        },
    )
}

/// 错误信封；5xx 只在服务端记录内部消息
fn error_response(request_id: &str, e: &QuickRestError) -> ApiResponse {
    let status = e.status_code();
    let (message, data) = if status >= 500 {
        error!("[{}] 内部错误: {}", request_id, e);
        (
            t("error.internal"),
            serde_json::Value::Object(serde_json::Map::new()),
        )
    } else {
        debug!("[{}] 请求失败 {}: {}", request_id, status, e);
        (e.public_message(), e.public_data())
    };

    ApiResponse::new(
        status,
        ApiEnvelope {
            success: false,
            message,
            data,
        },
    )
}

/// 分发器构建器
#[derive(Default)]
pub struct ApiDispatcherBuilder {
    routes: Vec<(String, Arc<Resource>)>,
    registry: Option<Arc<ConnectionRegistry>>,
}

impl ApiDispatcherBuilder {
    /// 注册路由
    ///
    /// `pattern` 是匹配整条路径的正则，捕获组按顺序成为路由参数
    pub fn route<P: Into<String>>(mut self, pattern: P, resource: Arc<Resource>) -> Self {
        self.routes.push((pattern.into(), resource));
        self
    }

    /// 设置连接注册表
    pub fn registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> QuickRestResult<ApiDispatcher> {
        let registry = self
            .registry
            .ok_or_else(|| crate::quick_error!(config, "分发器必须设置连接注册表"))?;

        let routes = self
            .routes
            .into_iter()
            .map(|(pattern, resource)| {
                let anchored = format!(
                    "^{}$",
                    pattern.trim_start_matches('^').trim_end_matches('$')
                );
                let regex = Regex::new(&anchored).map_err(|e| {
                    crate::quick_error!(config, format!("无效的路由正则 {}: {}", pattern, e))
                })?;
                info!("注册路由 {} -> {}", anchored, resource.name());
                Ok(Route {
                    pattern: regex,
                    resource,
                })
            })
            .collect::<QuickRestResult<Vec<_>>>()?;

        Ok(ApiDispatcher { routes, registry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::capabilities::*;
    use crate::storage::MemoryStoreFactory;
    use async_trait::async_trait;
    use serde_json::json;

    struct Items;

    #[async_trait]
    impl ListCapability for Items {
        async fn get_queryset(&self, _ctx: &RequestContext, params: DataValue) -> QuickRestResult<DataValue> {
            if params.get("boom").is_some() {
                return Err(QuickRestError::KeyError { key: "secret-internal".to_string() });
            }
            if params.get("teapot").is_some() {
                return Err(crate::quick_error!(api, 418, "teapot", json!({"brew": false})));
            }
            Ok(DataValue::Object(
                [("params".to_string(), params)].into_iter().collect(),
            ))
        }
    }

    // 创建未重写
    impl CreateCapability for Items {}

    fn dispatcher(resource: Arc<Resource>) -> ApiDispatcher {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(crate::init);
        ApiDispatcher::builder()
            .route(r"/items/?", resource.clone())
            .route(r"/items/([^/]+)", resource)
            .registry(Arc::new(ConnectionRegistry::new(Arc::new(MemoryStoreFactory::new()))))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let d = dispatcher(Resource::list_create("items", Items).build());
        let resp = d.dispatch(ApiRequest::get("/items").with_query("q", "x")).await;
        assert_eq!(resp.status, 200);
        assert!(resp.body.success);
        assert_eq!(resp.body.data["params"]["q"], "x");
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let d = dispatcher(Resource::list_create("items", Items).build());
        let resp = d.dispatch(ApiRequest::get("/nope")).await;
        assert_eq!(resp.status, 404);
        assert!(!resp.body.success);

        let resp = d.dispatch(ApiRequest::put("/items")).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_internal_errors_are_scrubbed() {
        let d = dispatcher(Resource::list_create("items", Items).build());
        let resp = d.dispatch(ApiRequest::get("/items").with_query("boom", "1")).await;
        assert_eq!(resp.status, 500);
        assert!(!resp.body.message.contains("secret-internal"));
        assert_eq!(resp.body.data, json!({}));

        let resp = d.dispatch(ApiRequest::post("/items").with_json(&json!({}))).await;
        assert_eq!(resp.status, 500);
    }

    #[tokio::test]
    async fn test_api_error_keeps_status_and_data() {
        let d = dispatcher(Resource::list_create("items", Items).build());
        let resp = d.dispatch(ApiRequest::get("/items").with_query("teapot", "1")).await;
        assert_eq!(resp.status, 418);
        assert_eq!(resp.body.message, "teapot");
        assert_eq!(resp.body.data["brew"], false);
    }

    #[tokio::test]
    async fn test_body_errors() {
        let d = dispatcher(Resource::list_create("items", Items).build());
        let resp = d
            .dispatch(ApiRequest::post("/items").with_body(vec![0xff, 0xfe, 0x00]))
            .await;
        assert_eq!(resp.status, 400);

        let resp = d.dispatch(ApiRequest::post("/items").with_body("{not json")).await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn test_permission_runs_before_body() {
        let resource = Resource::list_create("items", Items).permission(RequireUser).build();
        let d = dispatcher(resource);

        let resp = d.dispatch(ApiRequest::post("/items").with_body("{not json")).await;
        assert_eq!(resp.status, 401);

        let resp = d
            .dispatch(ApiRequest::get("/items").with_cookie_header("user=alice; account=acme"))
            .await;
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn test_builder_requires_registry_and_valid_patterns() {
        assert!(ApiDispatcher::builder().build().is_err());

        let registry = Arc::new(ConnectionRegistry::new(Arc::new(MemoryStoreFactory::new())));
        let resource = Resource::list_create("items", Items).build();
        assert!(ApiDispatcher::builder()
            .route("/items/(", resource)
            .registry(registry)
            .build()
            .is_err());
    }
}
