//! 模型定义系统模块
//!
//! 参考Django的声明式设计：字段描述验证与序列化规则，模型结构组合字段，
//! 记录保存每个实例自己的字段值，管理器负责与存储交互

pub mod convenience;
pub mod field_types;
pub mod macros;
pub mod manager;
pub mod record;
pub mod schema;
pub mod traits;

pub use convenience::*;
pub use field_types::{FieldDefinition, FieldType, SchemaRef};
pub use manager::Manager;
pub use record::{Access, FieldValue, Record};
pub use schema::{
    FieldHooks, ModelSchema, ModelSchemaBuilder, ObjectValidator, RecordHook, SetterHook, PK_FIELD,
};
pub use traits::Model;
