//! 内存文档存储
//!
//! 测试环境和本地开发使用，所有工作线程共享同一份数据

use super::{DocumentStore, StoreFactory};
use crate::error::QuickRestResult;
use crate::model::PK_FIELD;
use crate::types::{DataValue, Document, ObjectId};
use async_trait::async_trait;
use dashmap::DashMap;
use rat_logger::debug;
use std::sync::Arc;

/// 内存文档存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空全部集合
    pub fn clear(&self) {
        self.collections.clear();
    }

    fn doc_id(doc: &Document) -> Option<ObjectId> {
        doc.get(PK_FIELD).and_then(DataValue::as_object_id)
    }

    fn matches(doc: &Document, filter: &Document) -> bool {
        filter.iter().all(|(key, expected)| match doc.get(key) {
            Some(actual) => actual == expected,
            None => expected.is_null(),
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> QuickRestResult<ObjectId> {
        let id = match Self::doc_id(&doc) {
            Some(id) => id,
            None => {
                let id = ObjectId::new();
                doc.insert(PK_FIELD.to_string(), DataValue::ObjectId(id));
                id
            }
        };

        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| Self::doc_id(d) == Some(id)) {
            return Err(crate::quick_error!(
                storage,
                format!("集合 {} 中ID {} 已存在", collection, id)
            ));
        }
        docs.push(doc);
        debug!("内存存储插入: collection={}, id={}", collection, id);
        Ok(id)
    }

    async fn find_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<Option<Document>> {
        Ok(self.collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|d| Self::doc_id(d).as_ref() == Some(id))
                .cloned()
        }))
    }

    async fn find(&self, collection: &str, filter: &Document) -> QuickRestResult<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| Self::matches(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        doc: Document,
    ) -> QuickRestResult<u64> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter_mut().find(|d| Self::doc_id(d).as_ref() == Some(id)) {
            Some(existing) => {
                for (key, value) in doc {
                    if key != PK_FIELD {
                        existing.insert(key, value);
                    }
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, collection: &str, id: &ObjectId) -> QuickRestResult<u64> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| Self::doc_id(d).as_ref() != Some(id));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: &Document) -> QuickRestResult<u64> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| Self::matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }
}

/// 内存存储工厂，所有工作线程拿到同一个存储
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreFactory {
    store: Arc<MemoryStore>,
}

impl MemoryStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的内存存储
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }
}

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> QuickRestResult<Arc<dyn DocumentStore>> {
        Ok(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(pairs: &[(&str, DataValue)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("users", doc(&[("name", DataValue::from("a"))]))
            .await
            .unwrap();
        let found = store.find_by_id("users", &id).await.unwrap().unwrap();
        assert_eq!(found.get(PK_FIELD), Some(&DataValue::ObjectId(id)));

        let err = store
            .insert_one("users", doc(&[(PK_FIELD, DataValue::ObjectId(id))]))
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_filter_update_delete() {
        let store = MemoryStore::new();
        let a = store
            .insert_one("users", doc(&[("role", DataValue::from("admin"))]))
            .await
            .unwrap();
        store
            .insert_one("users", doc(&[("role", DataValue::from("guest"))]))
            .await
            .unwrap();

        let admins = doc(&[("role", DataValue::from("admin"))]);
        assert_eq!(store.count("users", &admins).await.unwrap(), 1);
        assert_eq!(store.find("users", &HashMap::new()).await.unwrap().len(), 2);

        let changed = store
            .update_by_id("users", &a, doc(&[("role", DataValue::from("guest"))]))
            .await
            .unwrap();
        assert_eq!(changed, 1);
        assert_eq!(store.count("users", &admins).await.unwrap(), 0);

        assert_eq!(store.delete_by_id("users", &a).await.unwrap(), 1);
        assert_eq!(store.delete_by_id("users", &a).await.unwrap(), 0);
        assert_eq!(store.count("missing", &HashMap::new()).await.unwrap(), 0);
    }
}
