//! 模型管理器
//!
//! 每个管理器绑定一个模型结构和一个集合，存储错误原样向上传递

use crate::error::{ErrorCode, QuickRestError, QuickRestResult};
use crate::model::record::Record;
use crate::model::schema::{ModelSchema, PK_FIELD};
use crate::model::traits::Model;
use crate::storage::DocumentStore;
use crate::types::{DataValue, Document, ObjectId};
use rat_logger::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 模型管理器
#[derive(Clone)]
pub struct Manager {
    schema: Arc<ModelSchema>,
    collection: String,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("model", &self.schema.name())
            .field("collection", &self.collection)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl Manager {
    /// 创建管理器
    ///
    /// # 错误
    ///
    /// 模型结构没有声明集合名时返回定义错误
    pub fn new(schema: Arc<ModelSchema>, store: Arc<dyn DocumentStore>) -> QuickRestResult<Self> {
        let collection = schema
            .collection()
            .ok_or_else(|| {
                crate::quick_error!(
                    definition,
                    format!("模型 {} 没有声明集合名，不能绑定管理器", schema.name())
                )
            })?
            .to_string();
        Ok(Self {
            schema,
            collection,
            store,
        })
    }

    /// 为模型类型创建管理器
    pub fn for_model<M: Model>(store: Arc<dyn DocumentStore>) -> QuickRestResult<Self> {
        Self::new(M::schema(), store)
    }

    /// 共享同一存储的关联模型管理器
    pub fn for_related(&self, schema: Arc<ModelSchema>) -> QuickRestResult<Self> {
        Self::new(schema, self.store.clone())
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// 写入记录的存储表示，返回新ID
    pub async fn create(&self, record: &Record) -> QuickRestResult<ObjectId> {
        let doc = record.db_repr()?;
        debug!("创建记录: collection={}", self.collection);
        self.store.insert_one(&self.collection, doc).await
    }

    /// 按主键更新记录，返回受影响的记录数
    pub async fn update(&self, record: &Record) -> QuickRestResult<u64> {
        let Some(id) = record.pk() else {
            let mut errors = BTreeMap::new();
            errors.insert(
                PK_FIELD.to_string(),
                crate::error::ErrorDetail::code(ErrorCode::RequiredField),
            );
            return Err(QuickRestError::fields(errors));
        };
        let mut doc = record.db_repr()?;
        doc.remove(PK_FIELD);
        debug!("更新记录: collection={}, id={}", self.collection, id);
        self.store.update_by_id(&self.collection, &id, doc).await
    }

    /// 按ID读取原始文档
    pub async fn fetch_by_id(&self, id: &ObjectId) -> QuickRestResult<Option<Document>> {
        self.store.find_by_id(&self.collection, id).await
    }

    /// 按ID读取并验证为记录
    pub async fn get(&self, id: &ObjectId) -> QuickRestResult<Option<Record>> {
        match self.fetch_by_id(id).await? {
            Some(doc) => Ok(Some(Record::from_value(
                self.schema.clone(),
                &DataValue::Object(doc),
            )?)),
            None => Ok(None),
        }
    }

    /// 按字段相等条件查询原始文档
    pub async fn find(&self, filter: &Document) -> QuickRestResult<Vec<Document>> {
        self.store.find(&self.collection, filter).await
    }

    /// 按字段相等条件查询并验证为记录
    pub async fn find_records(&self, filter: &Document) -> QuickRestResult<Vec<Record>> {
        self.find(filter)
            .await?
            .into_iter()
            .map(|doc| Record::from_value(self.schema.clone(), &DataValue::Object(doc)))
            .collect()
    }

    /// 按ID删除，返回删除的记录数
    pub async fn delete_by_id(&self, id: &ObjectId) -> QuickRestResult<u64> {
        debug!("删除记录: collection={}, id={}", self.collection, id);
        self.store.delete_by_id(&self.collection, id).await
    }

    /// 统计满足条件的记录数
    pub async fn count(&self, filter: &Document) -> QuickRestResult<u64> {
        self.store.count(&self.collection, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_object;
    use crate::model::convenience::*;
    use crate::storage::MemoryStore;
    use std::collections::HashMap;

    fn schema() -> Arc<ModelSchema> {
        ModelSchema::builder("Task")
            .collection("tasks")
            .field(PK_FIELD, object_id_field())
            .field("title", string_field().required())
            .field("done", boolean_field())
            .build()
            .unwrap()
    }

    #[test]
    fn test_requires_collection() {
        let embedded = ModelSchema::builder("Address")
            .field("city", string_field())
            .build()
            .unwrap();
        assert!(Manager::new(embedded, Arc::new(MemoryStore::new())).is_err());
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let manager = Manager::new(schema(), Arc::new(MemoryStore::new())).unwrap();

        let mut task = Record::from_value(schema(), &data_object! { "title" => "write docs" }).unwrap();
        let id = task.create(&manager).await.unwrap();

        let mut filter = HashMap::new();
        filter.insert("done".to_string(), DataValue::Bool(false));
        assert_eq!(manager.count(&filter).await.unwrap(), 1);

        task.apply_update(&data_object! { "done" => true }).unwrap();
        assert_eq!(task.update(&manager).await.unwrap(), 1);

        let stored = manager.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.value("done").unwrap(), &DataValue::Bool(true));
        assert_eq!(manager.find_records(&HashMap::new()).await.unwrap().len(), 1);

        assert_eq!(manager.delete_by_id(&id).await.unwrap(), 1);
        assert!(manager.fetch_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_without_pk_fails() {
        let manager = Manager::new(schema(), Arc::new(MemoryStore::new())).unwrap();
        let task = Record::from_value(schema(), &data_object! { "title" => "x" }).unwrap();
        let err = manager.update(&task).await.unwrap_err();
        assert!(err.detail().and_then(|d| d.get(PK_FIELD)).is_some());
    }
}
