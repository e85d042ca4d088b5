//! 工作线程连接注册表
//!
//! 每个工作线程持有自己的存储连接，首次使用时建立且只建立一次，之后一直复用

use super::{DocumentStore, MemoryStoreFactory, StoreFactory};
use crate::config::{Environment, StorageBackend, StorageConfig};
use crate::error::QuickRestResult;
use crate::model::{Manager, Model, ModelSchema};
use dashmap::DashMap;
use rat_logger::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::OnceCell;

type StoreSlot = Arc<OnceCell<Arc<dyn DocumentStore>>>;

/// 工作线程连接注册表
pub struct ConnectionRegistry {
    factory: Arc<dyn StoreFactory>,
    slots: DashMap<String, StoreSlot>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("backend", &self.factory.backend_name())
            .field("workers", &self.slots.len())
            .finish()
    }
}

impl ConnectionRegistry {
    pub fn new(factory: Arc<dyn StoreFactory>) -> Self {
        info!("创建连接注册表，存储后端: {}", factory.backend_name());
        Self {
            factory,
            slots: DashMap::new(),
        }
    }

    /// 按存储配置创建注册表
    ///
    /// 测试环境一律使用内存存储
    pub fn from_config(config: &StorageConfig, environment: &Environment) -> QuickRestResult<Self> {
        if *environment == Environment::Testing {
            if !matches!(config.backend, StorageBackend::Memory) {
                warn!("测试环境忽略配置的存储后端，改用内存存储");
            }
            return Ok(Self::new(Arc::new(MemoryStoreFactory::new())));
        }

        match &config.backend {
            StorageBackend::Memory => Ok(Self::new(Arc::new(MemoryStoreFactory::new()))),
            #[cfg(feature = "mongodb-support")]
            StorageBackend::MongoDB { uri, database } => Ok(Self::new(Arc::new(
                super::MongoStoreFactory::new(uri.clone(), database.clone()),
            ))),
            #[cfg(not(feature = "mongodb-support"))]
            StorageBackend::MongoDB { .. } => Err(crate::quick_error!(
                config,
                "未启用 mongodb-support 特性，无法使用 MongoDB 存储"
            )),
        }
    }

    /// 当前工作线程的标识
    ///
    /// 运行时的工作线程通常同名，因此附带线程ID
    pub fn current_worker() -> String {
        let thread = std::thread::current();
        format!("{}-{:?}", thread.name().unwrap_or("worker"), thread.id())
    }

    /// 当前工作线程的上下文
    pub async fn context(&self) -> QuickRestResult<WorkerContext> {
        self.context_for(&Self::current_worker()).await
    }

    /// 指定工作线程的上下文，连接在首次访问时建立
    pub async fn context_for(&self, worker: &str) -> QuickRestResult<WorkerContext> {
        // 先取出槽位再等待，避免持有分片锁跨越 await
        let slot = self
            .slots
            .entry(worker.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let store = slot
            .get_or_try_init(|| async {
                info!("为工作线程 {} 建立存储连接", worker);
                self.factory.connect().await
            })
            .await?
            .clone();

        Ok(WorkerContext {
            worker: worker.to_string(),
            store,
        })
    }

    /// 释放某个工作线程的连接
    pub fn release(&self, worker: &str) -> bool {
        let removed = self.slots.remove(worker).is_some();
        if removed {
            debug!("释放工作线程 {} 的存储连接", worker);
        }
        removed
    }

    /// 已建立连接的工作线程数
    pub fn worker_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().initialized()).count()
    }

    /// 释放全部连接
    pub fn shutdown(&self) {
        let count = self.slots.len();
        self.slots.clear();
        info!("连接注册表已关闭，释放连接数: {}", count);
    }
}

/// 工作线程上下文，向管理器注入该线程的存储连接
#[derive(Clone)]
pub struct WorkerContext {
    worker: String,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("worker", &self.worker)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl WorkerContext {
    /// 直接使用给定存储
    pub fn new<S: Into<String>>(worker: S, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            worker: worker.into(),
            store,
        }
    }

    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// 模型类型的管理器
    pub fn manager<M: Model>(&self) -> QuickRestResult<Manager> {
        Manager::new(M::schema(), self.store.clone())
    }

    /// 模型结构的管理器
    pub fn manager_for(&self, schema: Arc<ModelSchema>) -> QuickRestResult<Manager> {
        Manager::new(schema, self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuickRestError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl StoreFactory for CountingFactory {
        fn backend_name(&self) -> &'static str {
            "counting"
        }

        async fn connect(&self) -> QuickRestResult<Arc<dyn DocumentStore>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::new(super::super::MemoryStore::new()))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl StoreFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        async fn connect(&self) -> QuickRestResult<Arc<dyn DocumentStore>> {
            Err(QuickRestError::ConnectionError {
                message: "refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_one_connection_per_worker_under_concurrency() {
        let factory = Arc::new(CountingFactory {
            connects: AtomicUsize::new(0),
        });
        let registry = Arc::new(ConnectionRegistry::new(factory.clone()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            let worker = if i % 2 == 0 { "w-a" } else { "w-b" };
            handles.push(tokio::spawn(async move {
                registry.context_for(worker).await.map(|c| c.worker().to_string())
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
        assert_eq!(registry.worker_count(), 2);

        let a1 = registry.context_for("w-a").await.unwrap();
        let a2 = registry.context_for("w-a").await.unwrap();
        assert!(Arc::ptr_eq(a1.store(), a2.store()));

        assert!(registry.release("w-a"));
        assert!(!registry.release("w-a"));
        registry.shutdown();
        assert_eq!(registry.worker_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_connect_can_retry() {
        let registry = ConnectionRegistry::new(Arc::new(FailingFactory));
        assert!(registry.context().await.is_err());
        assert!(registry.context().await.is_err());
        assert_eq!(registry.worker_count(), 0);
    }

    #[test]
    fn test_testing_environment_forces_memory() {
        let config = StorageConfig {
            backend: StorageBackend::MongoDB {
                uri: "mongodb://localhost:27017".to_string(),
                database: "app".to_string(),
            },
        };
        let registry = ConnectionRegistry::from_config(&config, &Environment::Testing).unwrap();
        assert_eq!(registry.factory.backend_name(), "memory");
    }
}
