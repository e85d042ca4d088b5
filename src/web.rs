//! axum HTTP 绑定
//!
//! 所有路径都交给分发器处理，路由由分发器自己的正则表完成

use crate::api::{ApiDispatcher, ApiRequest, ApiResponse};
use crate::config::ServerConfig;
use crate::error::QuickRestResult;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use rat_logger::info;
use std::sync::Arc;

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.body)).into_response()
    }
}

/// 由 axum 请求各部分组装 `ApiRequest`
fn to_api_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> ApiRequest {
    let mut request = ApiRequest::new(method.as_str(), uri.path()).with_body(body);
    if let Some(query) = uri.query() {
        request = request.with_query_string(query);
    }
    for cookie in headers.get_all(header::COOKIE) {
        if let Ok(raw) = cookie.to_str() {
            request = request.with_cookie_header(raw);
        }
    }
    request
}

async fn handle(
    State(dispatcher): State<Arc<ApiDispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResponse {
    dispatcher
        .dispatch(to_api_request(&method, &uri, &headers, body))
        .await
}

/// 构建 axum 路由
pub fn router(dispatcher: Arc<ApiDispatcher>) -> Router {
    Router::new().fallback(handle).with_state(dispatcher)
}

/// 监听配置的地址并提供服务，直到进程退出
pub async fn serve(dispatcher: Arc<ApiDispatcher>, config: &ServerConfig) -> QuickRestResult<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("HTTP服务已启动: {}", listener.local_addr()?);
    axum::serve(listener, router(dispatcher)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_conversion() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "user=alice; account=acme".parse().unwrap());
        let uri: Uri = "/users/abc?page=2&name=a%20b".parse().unwrap();

        let request = to_api_request(&Method::POST, &uri, &headers, Bytes::from_static(b"{}"));
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/users/abc");
        assert_eq!(request.query.get("name").map(String::as_str), Some("a b"));
        assert_eq!(request.cookies.get("account").map(String::as_str), Some("acme"));
        assert_eq!(&request.body[..], b"{}");
    }
}
