//! REST 请求分发模块
//!
//! 把HTTP方法映射到资源能力（列表、创建、读取、更新、删除），
//! 驱动请求解析、权限检查、业务处理和响应信封的生成

pub mod capabilities;
pub mod dispatcher;
pub mod request;
pub mod resource;

pub use capabilities::{
    CreateCapability, DestroyCapability, ListCapability, Permission, RequireUser,
    RetrieveCapability, UpdateCapability,
};
pub use dispatcher::{ApiDispatcher, ApiDispatcherBuilder};
pub use request::{ApiEnvelope, ApiRequest, ApiResponse, RequestContext};
pub use resource::{FinalizeHook, Operation, Resource, ResourceBuilder};
