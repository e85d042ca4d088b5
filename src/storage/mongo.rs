//! MongoDB 文档存储

use super::{DocumentStore, StoreFactory};
use crate::error::{QuickRestError, QuickRestResult};
use crate::model::PK_FIELD;
use crate::types::{DataValue, Document, ObjectId};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::{Client, Collection, Database};
use rat_logger::{debug, info};
use std::sync::Arc;

/// MongoDB 文档存储
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// 连接到指定数据库
    pub async fn connect(uri: &str, database: &str) -> QuickRestResult<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| QuickRestError::ConnectionError {
                message: format!("MongoDB连接失败: {}", e),
            })?;
        info!("MongoDB连接已建立: database={}", database);
        Ok(Self {
            database: client.database(database),
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.database.collection::<bson::Document>(name)
    }
}

fn to_bson_document(doc: &Document) -> bson::Document {
    let mut out = bson::Document::new();
    for (key, value) in doc {
        out.insert(key.clone(), value.to_bson());
    }
    out
}

fn from_bson_document(doc: bson::Document) -> Document {
    doc.into_iter()
        .map(|(key, value)| (key, DataValue::from_bson(value)))
        .collect()
}

fn storage_error(action: &str, e: mongodb::error::Error) -> QuickRestError {
    crate::quick_error!(storage, format!("MongoDB{}失败: {}", action, e))
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> QuickRestResult<ObjectId> {
        let bson_doc = to_bson_document(&doc);
        debug!("执行MongoDB插入到集合 {}: {:?}", collection, bson_doc);
        let result = self
            .collection(collection)
            .insert_one(bson_doc, None)
            .await
            .map_err(|e| storage_error("插入", e))?;
        match result.inserted_id {
            Bson::ObjectId(oid) => Ok(oid),
            other => Err(crate::quick_error!(
                storage,
                format!("MongoDB返回的ID不是ObjectId: {}", other)
            )),
        }
    }

    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<Option<Document>> {
        let found = self
            .collection(collection)
            .find_one(doc! { PK_FIELD: *id }, None)
            .await
            .map_err(|e| storage_error("查询", e))?;
        Ok(found.map(from_bson_document))
    }

    async fn find(&self, collection: &str, filter: &Document) -> QuickRestResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(to_bson_document(filter), None)
            .await
            .map_err(|e| storage_error("查询", e))?;
        let docs: Vec<bson::Document> = cursor
            .try_collect()
            .await
            .map_err(|e| storage_error("读取游标", e))?;
        Ok(docs.into_iter().map(from_bson_document).collect())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        mut doc: Document,
    ) -> QuickRestResult<u64> {
        doc.remove(PK_FIELD);
        let result = self
            .collection(collection)
            .update_one(
                doc! { PK_FIELD: *id },
                doc! { "$set": to_bson_document(&doc) },
                None,
            )
            .await
            .map_err(|e| storage_error("更新", e))?;
        Ok(result.matched_count)
    }

    async fn delete_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<u64> {
        let result = self
            .collection(collection)
            .delete_one(doc! { PK_FIELD: *id }, None)
            .await
            .map_err(|e| storage_error("删除", e))?;
        Ok(result.deleted_count)
    }

    async fn count(&self, collection: &str, filter: &Document) -> QuickRestResult<u64> {
        self.collection(collection)
            .count_documents(to_bson_document(filter), None)
            .await
            .map_err(|e| storage_error("计数", e))
    }
}

/// MongoDB 存储工厂，每次调用建立一个独立的客户端
#[derive(Debug, Clone)]
pub struct MongoStoreFactory {
    uri: String,
    database: String,
}

impl MongoStoreFactory {
    pub fn new<U: Into<String>, D: Into<String>>(uri: U, database: D) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }
}

#[async_trait]
impl StoreFactory for MongoStoreFactory {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn connect(&self) -> QuickRestResult<Arc<dyn DocumentStore>> {
        Ok(Arc::new(MongoStore::connect(&self.uri, &self.database).await?))
    }
}
