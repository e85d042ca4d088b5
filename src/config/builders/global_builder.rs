//! # 全局配置构建器模块
//!
//! 提供全局配置的构建器实现，支持链式调用和严格验证

use crate::config::core::{
    AppConfig, Environment, LoggingConfig, QuickRestConfig, SecurityConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
use crate::error::QuickRestResult;
use rat_logger::{info, warn};

/// 全局配置构建器
///
/// 提供链式配置接口，支持流畅的API调用
#[derive(Debug, Default)]
pub struct QuickRestConfigBuilder {
    app: Option<AppConfig>,
    logging: Option<LoggingConfig>,
    storage: Option<StorageConfig>,
    security: Option<SecurityConfig>,
    server: Option<ServerConfig>,
}

impl QuickRestConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置应用配置
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// 设置日志配置
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// 设置存储配置
    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    /// 设置安全配置
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.security = Some(security);
        self
    }

    /// 设置HTTP服务配置
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.server = Some(server);
        self
    }

    /// 构建全局配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置，将返回错误
    pub fn build(self) -> QuickRestResult<QuickRestConfig> {
        let app = self
            .app
            .ok_or_else(|| crate::quick_error!(config, "应用配置必须设置"))?;

        let logging = self
            .logging
            .ok_or_else(|| crate::quick_error!(config, "日志配置必须设置"))?;

        let storage = self
            .storage
            .ok_or_else(|| crate::quick_error!(config, "存储配置必须设置"))?;

        let security = self
            .security
            .ok_or_else(|| crate::quick_error!(config, "安全配置必须设置"))?;

        let server = self
            .server
            .ok_or_else(|| crate::quick_error!(config, "HTTP服务配置必须设置"))?;

        if app.environment == Environment::Production && storage.backend == StorageBackend::Memory {
            warn!("生产环境使用内存存储，重启后数据会丢失");
        }

        info!(
            "创建全局配置: 应用={}, 环境={:?}, 存储={:?}",
            app.name, app.environment, storage.backend
        );

        Ok(QuickRestConfig {
            app,
            logging,
            storage,
            security,
            server,
        })
    }
}
