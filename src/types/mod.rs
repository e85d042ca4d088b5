//! 通用数据类型
//!
//! 定义请求载荷、字段值和文档存储共用的动态值类型

pub mod data_value;

// 重新导出所有公共类型
pub use data_value::{json_value_to_data_value, DataValue};
pub use bson::oid::ObjectId;

/// 存储文档：字段名到值的映射
pub type Document = std::collections::HashMap<String, DataValue>;
