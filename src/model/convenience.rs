//! 模型便捷函数模块
//!
//! 提供创建各种字段类型的便捷函数

use crate::model::field_types::{FieldDefinition, FieldType};
use crate::model::traits::Model;

/// 便捷函数：创建字符串字段
pub fn string_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::String)
}

/// 便捷函数：创建邮箱字段
pub fn email_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Email)
}

/// 便捷函数：创建数字字段
pub fn number_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Number)
}

/// 便捷函数：创建布尔字段
pub fn boolean_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Boolean)
}

/// 便捷函数：创建日期时间字段（UTC）
pub fn datetime_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::DateTime {
        auto_add: false,
        localize: true,
        timezone_offset: None,
    })
}

/// 便捷函数：创建带时区的日期时间字段
///
/// # 参数
///
/// * `timezone_offset` - 时区偏移，格式 "+08:00"，字段构建时校验
pub fn datetime_with_tz_field(timezone_offset: &str) -> FieldDefinition {
    FieldDefinition::new(FieldType::DateTime {
        auto_add: false,
        localize: true,
        timezone_offset: Some(timezone_offset.to_string()),
    })
}

/// 便捷函数：创建日期字段
pub fn date_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Date)
}

/// 便捷函数：创建时间字段
pub fn time_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Time)
}

/// 便捷函数：创建对象ID字段
pub fn object_id_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::ObjectId)
}

/// 便捷函数：创建字典字段
pub fn dict_field() -> FieldDefinition {
    FieldDefinition::new(FieldType::Dict)
}

/// 便捷函数：创建关联字段
///
/// `many` 为 true 时字段值为关联记录列表
pub fn related_field<M: Model>(many: bool) -> FieldDefinition {
    FieldDefinition::new(FieldType::Related {
        child: M::schema,
        many,
    })
}
