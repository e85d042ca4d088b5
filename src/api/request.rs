//! 请求、响应与请求上下文

use crate::model::{Manager, Model};
use crate::storage::WorkerContext;
use crate::types::ObjectId;
use crate::utils::{parse_cookie_header, parse_query_string};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 传入的API请求
///
/// 与具体HTTP框架无关，`web` 模块负责从 axum 请求转换而来
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    pub cookies: HashMap<String, String>,
}

impl ApiRequest {
    pub fn new<M: Into<String>, P: Into<String>>(method: M, path: P) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            query: HashMap::new(),
            body: Bytes::new(),
            cookies: HashMap::new(),
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new("GET", path)
    }

    pub fn post<P: Into<String>>(path: P) -> Self {
        Self::new("POST", path)
    }

    pub fn put<P: Into<String>>(path: P) -> Self {
        Self::new("PUT", path)
    }

    pub fn delete<P: Into<String>>(path: P) -> Self {
        Self::new("DELETE", path)
    }

    /// 添加一个查询参数
    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// 解析并合并原始查询字符串
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query.extend(parse_query_string(raw));
        self
    }

    /// 以JSON文档作为请求体
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// 原始请求体
    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_cookie<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.cookies.insert(key.into(), value.into());
        self
    }

    /// 解析并合并 Cookie 头
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        self.cookies.extend(parse_cookie_header(header));
        self
    }

    /// 是否为读操作（载荷来自查询参数）
    pub fn reads_query(&self) -> bool {
        matches!(self.method.as_str(), "GET" | "DELETE")
    }
}

/// 统一响应信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    pub message: String,
    pub data: serde_json::Value,
}

/// API响应：HTTP状态码加信封
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ApiEnvelope,
}

impl ApiResponse {
    pub fn new(status: u16, body: ApiEnvelope) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.body.success
    }

    /// 信封的JSON文本
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| {
            r#"{"success":false,"message":"","data":{}}"#.to_string()
        })
    }
}

/// 单次请求的上下文
///
/// 权限检查和处理器都通过它访问路由参数、Cookie 身份和当前工作线程的存储
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    /// 路由正则捕获的参数
    pub args: Vec<String>,
    /// 第一个能解码为ID令牌的路由参数
    pub pk: Option<ObjectId>,
    pub user: Option<String>,
    pub account: Option<String>,
    pub query: HashMap<String, String>,
    pub worker: WorkerContext,
}

impl RequestContext {
    /// 当前工作线程上某个模型的管理器
    pub fn manager<M: Model>(&self) -> crate::error::QuickRestResult<Manager> {
        self.worker.manager::<M>()
    }

    /// URL 中的主键，缺失时返回主键字段上的验证错误
    pub fn require_pk(&self) -> crate::error::QuickRestResult<ObjectId> {
        self.pk.ok_or_else(|| {
            let raw = self.args.first().map(String::as_str).unwrap_or("");
            let mut errors = std::collections::BTreeMap::new();
            errors.insert(
                crate::model::PK_FIELD.to_string(),
                crate::error::ErrorDetail::code_with(
                    crate::error::ErrorCode::InvalidObjectId,
                    &[("id", raw)],
                ),
            );
            crate::error::QuickRestError::fields(errors)
        })
    }
}
