//! # 配置管理模块 - 核心配置类型
//!
//! 提供统一的配置管理系统，支持构建器模式和链式配置
//! 严格遵循项目规范：所有配置项必须显式设置，严禁使用默认值

use crate::error::{QuickRestError, QuickRestResult};
use crate::security;
use rat_logger::{info, LevelFilter, LoggerBuilder, handler::term::TermConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 全局配置
///
/// 负责管理整个应用的配置，包括存储、日志、安全和HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickRestConfig {
    /// 应用配置
    pub app: AppConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 安全配置
    pub security: SecurityConfig,
    /// HTTP服务配置
    pub server: ServerConfig,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 应用名称
    pub name: String,
    /// 应用版本
    pub version: String,
    /// 环境类型
    pub environment: Environment,
}

/// 环境类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// 开发环境
    Development,
    /// 测试环境，存储强制使用内存实现
    Testing,
    /// 预发布环境
    Staging,
    /// 生产环境
    Production,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 是否输出到控制台
    pub console: bool,
}

/// 日志级别
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 错误级别
    Error,
    /// 警告级别
    Warn,
    /// 信息级别
    Info,
    /// 调试级别
    Debug,
    /// 跟踪级别
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageBackend {
    /// 进程内存储
    Memory,
    /// MongoDB
    MongoDB {
        /// 连接串
        uri: String,
        /// 数据库名
        database: String,
    },
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 存储后端
    pub backend: StorageBackend,
}

/// 安全配置
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// ID令牌签名密钥
    pub id_secret: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("id_secret", &"***")
            .finish()
    }
}

/// HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl ServerConfig {
    /// 监听地址，格式 host:port
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("toml")
}

impl QuickRestConfig {
    /// 创建全局配置构建器
    pub fn builder() -> super::builders::QuickRestConfigBuilder {
        super::builders::QuickRestConfigBuilder::new()
    }

    /// 从配置文件加载配置
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径，扩展名为 toml 时按TOML解析，否则按JSON解析
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> QuickRestResult<Self> {
        let content = std::fs::read_to_string(config_path.as_ref())?;

        let config: QuickRestConfig = if is_toml(config_path.as_ref()) {
            toml::from_str(&content)
                .map_err(|e| crate::quick_error!(config, format!("解析TOML配置文件失败: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| crate::quick_error!(config, format!("解析JSON配置文件失败: {}", e)))?
        };

        info!("从文件加载配置: {:?}", config_path.as_ref());
        Ok(config)
    }

    /// 保存配置到文件
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> QuickRestResult<()> {
        let content = if is_toml(config_path.as_ref()) {
            toml::to_string_pretty(self)
                .map_err(|e| crate::quick_error!(config, format!("序列化TOML配置失败: {}", e)))?
        } else {
            serde_json::to_string_pretty(self)
                .map_err(|e| crate::quick_error!(config, format!("序列化JSON配置失败: {}", e)))?
        };

        std::fs::write(config_path.as_ref(), content).map_err(QuickRestError::IoError)?;

        info!("保存配置到文件: {:?}", config_path.as_ref());
        Ok(())
    }

    /// 应用进程级配置：安装ID令牌密钥
    pub fn apply(&self) {
        self.security.apply();
        info!(
            "应用配置已生效: 名称={}, 环境={:?}",
            self.app.name, self.app.environment
        );
    }
}

impl AppConfig {
    /// 创建应用配置构建器
    pub fn builder() -> super::builders::AppConfigBuilder {
        super::builders::AppConfigBuilder::new()
    }
}

impl LoggingConfig {
    /// 创建日志配置构建器
    pub fn builder() -> super::builders::LoggingConfigBuilder {
        super::builders::LoggingConfigBuilder::new()
    }
}

impl StorageConfig {
    /// 创建存储配置构建器
    pub fn builder() -> super::builders::StorageConfigBuilder {
        super::builders::StorageConfigBuilder::new()
    }
}

impl SecurityConfig {
    /// 创建安全配置构建器
    pub fn builder() -> super::builders::SecurityConfigBuilder {
        super::builders::SecurityConfigBuilder::new()
    }

    /// 安装ID令牌密钥
    pub fn apply(&self) {
        security::install_id_secret(&self.id_secret);
    }
}

impl ServerConfig {
    /// 创建HTTP服务配置构建器
    pub fn builder() -> super::builders::ServerConfigBuilder {
        super::builders::ServerConfigBuilder::new()
    }
}

/// 按日志配置初始化日志系统
///
/// 库本身不会主动初始化日志，由调用方决定是否调用
pub fn init_logging(config: &LoggingConfig) -> QuickRestResult<()> {
    let mut builder = LoggerBuilder::new().with_level(config.level.to_level_filter());
    if config.console {
        builder = builder.add_terminal_with_config(TermConfig::default());
    }
    builder
        .init()
        .map_err(|e| crate::quick_error!(config, format!("日志初始化失败: {}", e)))?;
    Ok(())
}
