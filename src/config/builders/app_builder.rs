//! # 应用配置构建器模块
//!
//! 提供应用配置的构建器实现，支持链式调用和严格验证

use crate::config::core::{AppConfig, Environment};
use crate::error::QuickRestResult;
use rat_logger::info;

/// 读取运行环境的环境变量名
pub const ENVIRONMENT_VAR: &str = "APP_ENVIRONMENT";

impl Environment {
    /// 解析环境名称，大小写不敏感
    pub fn parse(value: &str) -> QuickRestResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEVELOPMENT" | "DEV" => Ok(Environment::Development),
            "TESTING" | "TEST" => Ok(Environment::Testing),
            "STAGING" => Ok(Environment::Staging),
            "PRODUCTION" | "PROD" => Ok(Environment::Production),
            other => Err(crate::quick_error!(config, format!("未知的环境类型: {}", other))),
        }
    }

    /// 从 `APP_ENVIRONMENT` 读取，未设置时为开发环境
    pub fn from_env() -> QuickRestResult<Self> {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => Ok(Environment::Development),
        }
    }
}

/// 应用配置构建器
#[derive(Debug)]
pub struct AppConfigBuilder {
    name: Option<String>,
    version: Option<String>,
    environment: Option<Environment>,
}

impl AppConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            name: None,
            version: None,
            environment: None,
        }
    }

    /// 设置应用名称
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 设置应用版本
    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 设置环境类型
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 从环境变量读取环境类型
    pub fn environment_from_env(mut self) -> QuickRestResult<Self> {
        self.environment = Some(Environment::from_env()?);
        Ok(self)
    }

    /// 构建应用配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置，将返回错误
    pub fn build(self) -> QuickRestResult<AppConfig> {
        let name = self
            .name
            .ok_or_else(|| crate::quick_error!(config, "应用名称必须设置"))?;
        if name.trim().is_empty() {
            return Err(crate::quick_error!(config, "应用名称不能为空"));
        }

        let version = self
            .version
            .ok_or_else(|| crate::quick_error!(config, "应用版本必须设置"))?;

        let environment = self
            .environment
            .ok_or_else(|| crate::quick_error!(config, "环境类型必须设置"))?;

        info!(
            "创建应用配置: 名称={}, 版本={}, 环境={:?}",
            name, version, environment
        );

        Ok(AppConfig {
            name,
            version,
            environment,
        })
    }
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
