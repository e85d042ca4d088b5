//! # 存储、安全与HTTP服务配置构建器

use crate::config::core::{SecurityConfig, ServerConfig, StorageBackend, StorageConfig};
use crate::error::QuickRestResult;
use crate::security::DEFAULT_ID_SECRET;
use rat_logger::{info, warn};

/// 存储配置构建器
#[derive(Debug, Default)]
pub struct StorageConfigBuilder {
    backend: Option<StorageBackend>,
}

impl StorageConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用内存存储
    pub fn memory(mut self) -> Self {
        self.backend = Some(StorageBackend::Memory);
        self
    }

    /// 使用 MongoDB 存储
    ///
    /// # 参数
    ///
    /// * `uri` - 连接串，如 `mongodb://localhost:27017`
    /// * `database` - 数据库名
    pub fn mongodb<U: Into<String>, D: Into<String>>(mut self, uri: U, database: D) -> Self {
        self.backend = Some(StorageBackend::MongoDB {
            uri: uri.into(),
            database: database.into(),
        });
        self
    }

    /// 构建存储配置
    pub fn build(self) -> QuickRestResult<StorageConfig> {
        let backend = self
            .backend
            .ok_or_else(|| crate::quick_error!(config, "存储后端必须设置"))?;

        if let StorageBackend::MongoDB { uri, database } = &backend {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                return Err(crate::quick_error!(
                    config,
                    format!("无效的MongoDB连接串: {}", uri)
                ));
            }
            if database.trim().is_empty() {
                return Err(crate::quick_error!(config, "MongoDB数据库名不能为空"));
            }
        }

        info!("创建存储配置: {:?}", backend);
        Ok(StorageConfig { backend })
    }
}

/// 安全配置构建器
#[derive(Debug, Default)]
pub struct SecurityConfigBuilder {
    id_secret: Option<String>,
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置ID令牌签名密钥
    pub fn id_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.id_secret = Some(secret.into());
        self
    }

    /// 构建安全配置
    pub fn build(self) -> QuickRestResult<SecurityConfig> {
        let id_secret = self
            .id_secret
            .ok_or_else(|| crate::quick_error!(config, "ID令牌密钥必须设置"))?;
        if id_secret.is_empty() {
            return Err(crate::quick_error!(config, "ID令牌密钥不能为空"));
        }
        if id_secret == DEFAULT_ID_SECRET {
            warn!("安全配置使用了默认ID令牌密钥");
        }
        Ok(SecurityConfig { id_secret })
    }
}

/// HTTP服务配置构建器
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置监听地址
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// 设置监听端口
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 构建HTTP服务配置
    pub fn build(self) -> QuickRestResult<ServerConfig> {
        let host = self
            .host
            .ok_or_else(|| crate::quick_error!(config, "监听地址必须设置"))?;
        let port = self
            .port
            .ok_or_else(|| crate::quick_error!(config, "监听端口必须设置"))?;
        info!("创建HTTP服务配置: {}:{}", host, port);
        Ok(ServerConfig { host, port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_builder_validates_mongodb() {
        assert!(StorageConfigBuilder::new().build().is_err());
        assert!(StorageConfigBuilder::new().mongodb("http://x", "db").build().is_err());
        assert!(StorageConfigBuilder::new().mongodb("mongodb://x", " ").build().is_err());
        let config = StorageConfigBuilder::new()
            .mongodb("mongodb://localhost:27017", "app")
            .build()
            .unwrap();
        assert!(matches!(config.backend, StorageBackend::MongoDB { .. }));
    }

    #[test]
    fn test_security_and_server_builders() {
        assert!(SecurityConfigBuilder::new().id_secret("").build().is_err());
        assert!(ServerConfigBuilder::new().host("0.0.0.0").build().is_err());
        let server = ServerConfigBuilder::new().host("127.0.0.1").port(8080).build().unwrap();
        assert_eq!(server.bind_addr(), "127.0.0.1:8080");
    }
}
