//! # 便利配置函数模块
//!
//! 提供常用配置组合的便利函数，仍然经过各构建器的校验

use crate::config::builders::*;
use crate::config::core::*;
use crate::error::QuickRestResult;

/// 内存存储配置
pub fn memory_storage() -> QuickRestResult<StorageConfig> {
    StorageConfig::builder().memory().build()
}

/// MongoDB 存储配置
pub fn mongodb_storage<U: Into<String>, D: Into<String>>(
    uri: U,
    database: D,
) -> QuickRestResult<StorageConfig> {
    StorageConfig::builder().mongodb(uri, database).build()
}

/// 测试用的完整配置：测试环境、内存存储、监听本地随机端口
///
/// # 参数
///
/// * `name` - 应用名称
/// * `id_secret` - ID令牌密钥
pub fn testing_config<S: Into<String>>(name: S, id_secret: &str) -> QuickRestResult<QuickRestConfig> {
    QuickRestConfigBuilder::new()
        .app(
            AppConfig::builder()
                .name(name)
                .version(crate::VERSION)
                .environment(Environment::Testing)
                .build()?,
        )
        .logging(LoggingConfig::builder().level(LogLevel::Debug).console(true).build()?)
        .storage(memory_storage()?)
        .security(SecurityConfig::builder().id_secret(id_secret).build()?)
        .server(ServerConfig::builder().host("127.0.0.1").port(0).build()?)
        .build()
}
