//! Model trait 定义模块
//!
//! 模型类型只负责提供共享的模型结构，记录数据保存在 `Record` 中

use crate::error::QuickRestResult;
use crate::model::record::Record;
use crate::model::schema::ModelSchema;
use crate::types::{DataValue, ObjectId};
use std::sync::Arc;

/// 模型特征
///
/// 实现方通常把结构缓存在 `Lazy` 静态变量中：
///
/// ```ignore
/// impl Model for User {
///     fn schema() -> Arc<ModelSchema> {
///         static SCHEMA: Lazy<Arc<ModelSchema>> = Lazy::new(|| { ... });
///         SCHEMA.clone()
///     }
/// }
/// ```
pub trait Model: Send + Sync + 'static {
    /// 模型结构
    fn schema() -> Arc<ModelSchema>;

    /// 集合名
    fn collection_name() -> Option<String> {
        Self::schema().collection().map(str::to_string)
    }

    /// 所有字段取默认值的新记录
    fn new_record() -> Record {
        Record::new(Self::schema())
    }

    /// 从原始输入创建并验证记录
    fn from_value(raw: &DataValue) -> QuickRestResult<Record> {
        Record::from_value(Self::schema(), raw)
    }

    /// 只有ID、待补全的记录
    fn unloaded(id: ObjectId) -> Record {
        Record::unloaded(Self::schema(), id)
    }
}
