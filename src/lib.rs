//! rat_quickrest - 声明式模型/字段/序列化层与 REST 请求分发
//!
//! 字段负责类型转换、必填/可空/默认值解析和嵌套关联对象的验证，
//! 模型通过管理器与文档存储交互，分发器把HTTP方法映射到资源能力并输出统一的响应信封

// 导出所有公共模块
pub mod error;
pub mod i18n;
pub mod types;
pub mod security;
pub mod utils;
pub mod model;
pub mod storage;
pub mod api;
pub mod config;

// axum 绑定（仅在启用 web-server 特性时编译）
#[cfg(feature = "web-server")]
pub mod web;

// 重新导出常用类型和函数
pub use error::{ErrorCode, ErrorDetail, QuickRestError, QuickRestResult};
pub use types::*;
pub use security::{decode_id, encode_id, install_id_secret, IdCodec};
pub use model::{
    Access, FieldDefinition, FieldType, FieldValue, Manager, Model, ModelSchema,
    ModelSchemaBuilder, Record, PK_FIELD,
    boolean_field, date_field, datetime_field, datetime_with_tz_field, dict_field, email_field,
    number_field, object_id_field, related_field, string_field, time_field,
};
pub use storage::{ConnectionRegistry, DocumentStore, MemoryStore, StoreFactory, WorkerContext};
pub use api::{
    ApiDispatcher, ApiEnvelope, ApiRequest, ApiResponse, CreateCapability, DestroyCapability,
    ListCapability, Permission, RequestContext, Resource, RetrieveCapability, UpdateCapability,
};
pub use config::{
    init_logging, AppConfig, Environment, LogLevel, LoggingConfig, QuickRestConfig,
    SecurityConfig, ServerConfig, StorageBackend, StorageConfig,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_quickrest库
///
/// 注册多语言错误消息并按环境变量选择语言
///
/// 注意：日志系统由调用者自行初始化（见 `config::init_logging`），本库不会自动初始化日志
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 按配置初始化多语言消息和ID令牌密钥，并返回对应的连接注册表
///
/// 日志仍需调用方通过 `init_logging` 显式初始化
pub fn init_with_config(config: &QuickRestConfig) -> QuickRestResult<ConnectionRegistry> {
    init();
    config.apply();
    ConnectionRegistry::from_config(&config.storage, &config.app.environment)
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
