//! 存储后端模块
//!
//! 定义文档存储接口，提供内存实现和 MongoDB 实现，以及按工作线程缓存连接的注册表

use crate::error::QuickRestResult;
use crate::types::{Document, ObjectId};
use async_trait::async_trait;
use std::sync::Arc;

mod memory;
#[cfg(feature = "mongodb-support")]
mod mongo;
mod registry;

pub use memory::{MemoryStore, MemoryStoreFactory};
#[cfg(feature = "mongodb-support")]
pub use mongo::{MongoStore, MongoStoreFactory};
pub use registry::{ConnectionRegistry, WorkerContext};

/// 文档存储接口
///
/// 所有方法只做一次调用，不缓存、不重试，错误原样返回
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 后端名称
    fn backend_name(&self) -> &'static str;

    /// 插入文档，文档中没有 `_id` 时由存储生成
    async fn insert_one(&self, collection: &str, doc: Document) -> QuickRestResult<ObjectId>;

    /// 按ID查找
    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<Option<Document>>;

    /// 按字段相等条件查找，空条件返回全部
    async fn find(&self, collection: &str, filter: &Document) -> QuickRestResult<Vec<Document>>;

    /// 按ID更新给定字段，返回匹配的记录数
    async fn update_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        doc: Document,
    ) -> QuickRestResult<u64>;

    /// 按ID删除，返回删除的记录数
    async fn delete_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<u64>;

    /// 统计满足条件的记录数
    async fn count(&self, collection: &str, filter: &Document) -> QuickRestResult<u64>;
}

/// 存储连接工厂，每个工作线程调用一次
#[async_trait]
pub trait StoreFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn connect(&self) -> QuickRestResult<Arc<dyn DocumentStore>>;
}
