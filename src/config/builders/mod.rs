//! # 配置构建器模块
//!
//! 提供所有配置类型的构建器实现，支持链式调用和严格验证

pub mod app_builder;
pub mod global_builder;
pub mod logging_builder;
pub mod storage_builder;

pub use app_builder::{AppConfigBuilder, ENVIRONMENT_VAR};
pub use global_builder::QuickRestConfigBuilder;
pub use logging_builder::LoggingConfigBuilder;
pub use storage_builder::{SecurityConfigBuilder, ServerConfigBuilder, StorageConfigBuilder};
