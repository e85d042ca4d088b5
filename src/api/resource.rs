//! 资源定义
//!
//! 资源由若干独立能力组合而成，HTTP方法按能力表解析为具体操作

use super::capabilities::{
    CreateCapability, DestroyCapability, ListCapability, Permission, RetrieveCapability,
    UpdateCapability,
};
use super::request::RequestContext;
use crate::error::{QuickRestError, QuickRestResult};
use crate::types::DataValue;
use std::sync::Arc;

/// 响应收尾钩子，在格式化之前调整处理器的结果
pub type FinalizeHook =
    Arc<dyn Fn(&RequestContext, DataValue) -> QuickRestResult<DataValue> + Send + Sync>;

/// 资源操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Retrieve,
    Update,
    Destroy,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Retrieve => "retrieve",
            Operation::Update => "update",
            Operation::Destroy => "destroy",
        }
    }
}

/// REST 资源
pub struct Resource {
    name: String,
    list: Option<Arc<dyn ListCapability>>,
    create: Option<Arc<dyn CreateCapability>>,
    retrieve: Option<Arc<dyn RetrieveCapability>>,
    update: Option<Arc<dyn UpdateCapability>>,
    destroy: Option<Arc<dyn DestroyCapability>>,
    permissions: Vec<Arc<dyn Permission>>,
    finalize: Option<FinalizeHook>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("operations", &self.operations())
            .field("permissions", &self.permissions.len())
            .finish()
    }
}

impl Resource {
    pub fn builder<S: Into<String>>(name: S) -> ResourceBuilder {
        ResourceBuilder::new(name)
    }

    /// 列表 + 创建
    pub fn list_create<S, H>(name: S, handler: H) -> ResourceBuilder
    where
        S: Into<String>,
        H: ListCapability + CreateCapability + 'static,
    {
        let handler = Arc::new(handler);
        ResourceBuilder::new(name).list(handler.clone()).create(handler)
    }

    /// 读取 + 更新
    pub fn retrieve_update<S, H>(name: S, handler: H) -> ResourceBuilder
    where
        S: Into<String>,
        H: RetrieveCapability + UpdateCapability + 'static,
    {
        let handler = Arc::new(handler);
        ResourceBuilder::new(name).retrieve(handler.clone()).update(handler)
    }

    /// 读取 + 更新 + 删除
    pub fn retrieve_update_destroy<S, H>(name: S, handler: H) -> ResourceBuilder
    where
        S: Into<String>,
        H: RetrieveCapability + UpdateCapability + DestroyCapability + 'static,
    {
        let handler = Arc::new(handler);
        ResourceBuilder::new(name)
            .retrieve(handler.clone())
            .update(handler.clone())
            .destroy(handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> &[Arc<dyn Permission>] {
        &self.permissions
    }

    /// 已注册的操作
    pub fn operations(&self) -> Vec<Operation> {
        let mut ops = Vec::new();
        if self.list.is_some() {
            ops.push(Operation::List);
        }
        if self.create.is_some() {
            ops.push(Operation::Create);
        }
        if self.retrieve.is_some() {
            ops.push(Operation::Retrieve);
        }
        if self.update.is_some() {
            ops.push(Operation::Update);
        }
        if self.destroy.is_some() {
            ops.push(Operation::Destroy);
        }
        ops
    }

    /// 把HTTP方法解析为操作
    ///
    /// 同时具备列表和读取能力时，GET 带主键走读取，否则走列表
    pub fn resolve(&self, method: &str, has_pk: bool) -> Option<Operation> {
        match method {
            "GET" => match (self.list.is_some(), self.retrieve.is_some()) {
                (true, true) if has_pk => Some(Operation::Retrieve),
                (true, _) => Some(Operation::List),
                (false, true) => Some(Operation::Retrieve),
                (false, false) => None,
            },
            "POST" => self.create.as_ref().map(|_| Operation::Create),
            "PUT" => self.update.as_ref().map(|_| Operation::Update),
            "DELETE" => self.destroy.as_ref().map(|_| Operation::Destroy),
            _ => None,
        }
    }

    /// 执行操作
    pub async fn invoke(
        &self,
        operation: Operation,
        ctx: &RequestContext,
        payload: DataValue,
    ) -> QuickRestResult<DataValue> {
        let missing = || QuickRestError::MethodNotAvailable {
            method: ctx.method.clone(),
        };
        match operation {
            Operation::List => self.list.as_ref().ok_or_else(missing)?.get_queryset(ctx, payload).await,
            Operation::Create => {
                self.create.as_ref().ok_or_else(missing)?.perform_create(ctx, payload).await
            }
            Operation::Retrieve => {
                self.retrieve.as_ref().ok_or_else(missing)?.get_object(ctx, payload).await
            }
            Operation::Update => {
                self.update.as_ref().ok_or_else(missing)?.perform_update(ctx, payload).await
            }
            Operation::Destroy => {
                self.destroy.as_ref().ok_or_else(missing)?.perform_delete(ctx, payload).await
            }
        }
    }

    /// 处理器结果的收尾
    pub fn finalize_response(&self, ctx: &RequestContext, data: DataValue) -> QuickRestResult<DataValue> {
        match &self.finalize {
            Some(hook) => hook(ctx, data),
            None => Ok(data),
        }
    }
}

/// 资源构建器
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            resource: Resource {
                name: name.into(),
                list: None,
                create: None,
                retrieve: None,
                update: None,
                destroy: None,
                permissions: Vec::new(),
                finalize: None,
            },
        }
    }

    pub fn list(mut self, handler: Arc<dyn ListCapability>) -> Self {
        self.resource.list = Some(handler);
        self
    }

    pub fn create(mut self, handler: Arc<dyn CreateCapability>) -> Self {
        self.resource.create = Some(handler);
        self
    }

    pub fn retrieve(mut self, handler: Arc<dyn RetrieveCapability>) -> Self {
        self.resource.retrieve = Some(handler);
        self
    }

    pub fn update(mut self, handler: Arc<dyn UpdateCapability>) -> Self {
        self.resource.update = Some(handler);
        self
    }

    pub fn destroy(mut self, handler: Arc<dyn DestroyCapability>) -> Self {
        self.resource.destroy = Some(handler);
        self
    }

    /// 追加权限检查，按添加顺序执行
    pub fn permission<P: Permission + 'static>(mut self, permission: P) -> Self {
        self.resource.permissions.push(Arc::new(permission));
        self
    }

    pub fn finalize_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext, DataValue) -> QuickRestResult<DataValue> + Send + Sync + 'static,
    {
        self.resource.finalize = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Arc<Resource> {
        Arc::new(self.resource)
    }
}
