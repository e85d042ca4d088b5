//! 资源能力与权限检查
//!
//! 每种能力只负责一个HTTP方法，并提供一个必须重写的扩展点。
//! 未重写的扩展点返回 `MethodNotImplemented`（500）

use super::request::RequestContext;
use crate::error::{QuickRestError, QuickRestResult};
use crate::types::DataValue;
use async_trait::async_trait;

fn not_implemented(method: &str) -> QuickRestError {
    QuickRestError::MethodNotImplemented {
        method: method.to_string(),
    }
}

/// 列表（GET，无主键）
#[async_trait]
pub trait ListCapability: Send + Sync {
    /// 按查询参数返回结果集
    async fn get_queryset(&self, _ctx: &RequestContext, _params: DataValue) -> QuickRestResult<DataValue> {
        Err(not_implemented("get_queryset"))
    }
}

/// 创建（POST）
#[async_trait]
pub trait CreateCapability: Send + Sync {
    async fn perform_create(&self, _ctx: &RequestContext, _data: DataValue) -> QuickRestResult<DataValue> {
        Err(not_implemented("perform_create"))
    }
}

/// 读取单个对象（GET，带主键）
#[async_trait]
pub trait RetrieveCapability: Send + Sync {
    async fn get_object(&self, _ctx: &RequestContext, _params: DataValue) -> QuickRestResult<DataValue> {
        Err(not_implemented("get_object"))
    }
}

/// 更新（PUT）
#[async_trait]
pub trait UpdateCapability: Send + Sync {
    async fn perform_update(&self, _ctx: &RequestContext, _data: DataValue) -> QuickRestResult<DataValue> {
        Err(not_implemented("perform_update"))
    }
}

/// 删除（DELETE）
#[async_trait]
pub trait DestroyCapability: Send + Sync {
    async fn perform_delete(&self, _ctx: &RequestContext, _params: DataValue) -> QuickRestResult<DataValue> {
        Err(not_implemented("perform_delete"))
    }
}

/// 权限检查
///
/// 在读取请求体之前执行，失败时返回的错误自带状态码
#[async_trait]
pub trait Permission: Send + Sync {
    async fn has_permission(&self, ctx: &RequestContext) -> QuickRestResult<()>;
}

/// 要求请求携带 `user` Cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireUser;

#[async_trait]
impl Permission for RequireUser {
    async fn has_permission(&self, ctx: &RequestContext) -> QuickRestResult<()> {
        match ctx.user.as_deref() {
            Some(user) if !user.is_empty() => Ok(()),
            _ => Err(QuickRestError::PermissionDenied {
                status: 401,
                message: crate::i18n::t("error.unauthorized"),
            }),
        }
    }
}
