//! 字段类型定义模块
//!
//! 定义模型字段的类型、验证、对外序列化和存储表示

use crate::error::{ErrorCode, ErrorDetail, QuickRestError, QuickRestResult};
use crate::model::record::{FieldValue, Record};
use crate::model::schema::ModelSchema;
use crate::security;
use crate::types::DataValue;
use crate::utils::normalize_payload;
use crate::utils::time::{self, ParsedDateTime};
use chrono::{NaiveTime, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 关联模型的结构入口，通常为 `<M as Model>::schema`
pub type SchemaRef = fn() -> Arc<ModelSchema>;

/// 不本地化的日期时间按墙上时间输出，保证再次验证仍为无时区值
const NAIVE_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

static EMAIL_USER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?i)(^[-!#$%&'*+/=?^_`{}|~0-9A-Z]+(\.[-!#$%&'*+/=?^_`{}|~0-9A-Z]+)*\z"#,
        r#"|^"([\x01-\x08\x0b\x0c\x0e-\x1f!#-\[\]-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*"\z)"#,
    ))
    .expect("严重错误：邮箱用户名正则无效！")
});

// 域名标签最长63个字符，顶级标签不能以'-'结尾
static EMAIL_DOMAIN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^((?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+)(?:[A-Z0-9-]{1,62}[A-Z0-9])\z")
        .expect("严重错误：邮箱域名正则无效！")
});

/// 字段类型枚举
#[derive(Debug, Clone)]
pub enum FieldType {
    /// 布尔类型
    Boolean,
    /// 字符串类型，首尾空白会被去除
    String,
    /// 数字类型（整数或浮点）
    Number,
    /// 日期时间类型
    DateTime {
        /// 未提供值时取当前时间
        auto_add: bool,
        /// 对不带时区的输入附加时区
        localize: bool,
        /// 时区偏移，格式 "+08:00"，为空时按UTC处理
        timezone_offset: Option<String>,
    },
    /// 日期类型
    Date,
    /// 时间类型
    Time,
    /// 邮箱类型
    Email,
    /// 对象ID类型
    ObjectId,
    /// 字典类型
    Dict,
    /// 关联模型类型
    Related { child: SchemaRef, many: bool },
}

impl FieldType {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::DateTime { .. } => "datetime",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Email => "email",
            FieldType::ObjectId => "object_id",
            FieldType::Dict => "dict",
            FieldType::Related { many: true, .. } => "related_many",
            FieldType::Related { .. } => "related",
        }
    }
}

/// 字段定义
///
/// 链式设置属性后调用 `build()` 完成校验；模型结构构建时也会统一校验
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// 字段类型
    pub field_type: FieldType,
    /// 是否必填
    pub required: bool,
    /// 是否可空
    pub nullable: bool,
    /// 显式默认值
    pub default: Option<DataValue>,
    /// 可选值集合
    pub choices: Vec<DataValue>,
}

impl FieldDefinition {
    /// 创建新的字段定义
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            nullable: false,
            default: None,
            choices: Vec::new(),
        }
    }

    /// 设置为必填字段
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置为可空字段
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// 设置默认值
    pub fn default_value<V: Into<DataValue>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// 设置可选值集合
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DataValue>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// 日期时间字段：未提供值时取当前时间
    pub fn auto_add(mut self) -> Self {
        if let FieldType::DateTime { auto_add, .. } = &mut self.field_type {
            *auto_add = true;
        }
        self
    }

    /// 日期时间字段：是否为不带时区的输入附加时区
    pub fn localize(mut self, enabled: bool) -> Self {
        if let FieldType::DateTime { localize, .. } = &mut self.field_type {
            *localize = enabled;
        }
        self
    }

    /// 校验定义的合法性，默认值会按字段规则预先验证
    pub fn build(mut self) -> QuickRestResult<Self> {
        if self.required && self.nullable {
            return Err(crate::quick_error!(definition, "字段不能同时设置为必填和可空"));
        }

        match &self.field_type {
            FieldType::Related { .. } => {
                if self.default.is_some() {
                    return Err(crate::quick_error!(definition, "关联字段不支持默认值"));
                }
                if !self.choices.is_empty() {
                    return Err(crate::quick_error!(definition, "关联字段不支持可选值集合"));
                }
            }
            FieldType::DateTime { auto_add, timezone_offset, .. } => {
                if self.default.is_some() {
                    return Err(crate::quick_error!(
                        definition,
                        "日期时间字段不支持默认值，请使用 auto_add"
                    ));
                }
                if *auto_add && (self.required || self.nullable) {
                    return Err(crate::quick_error!(
                        definition,
                        "auto_add 字段不能设置为必填或可空"
                    ));
                }
                if let Some(offset) = timezone_offset {
                    time::parse_fixed_offset(offset)?;
                }
            }
            _ => {}
        }

        if let Some(default) = self.default.take() {
            if self.required || self.nullable {
                return Err(crate::quick_error!(
                    definition,
                    "设置了默认值的字段不能为必填或可空"
                ));
            }
            if self.is_null_input(&default) {
                return Err(crate::quick_error!(definition, "不能显式设置空值作为默认值"));
            }
            let validated = self.validate_value(&default).map_err(|e| {
                crate::quick_error!(definition, format!("默认值 {} 无效: {}", default, e))
            })?;
            self.default = Some(validated);
        }

        Ok(self)
    }

    /// 当前字段类型下是否视为"未提供"
    pub fn is_null_input(&self, value: &DataValue) -> bool {
        match (&self.field_type, value) {
            (_, DataValue::Null) => true,
            (FieldType::String | FieldType::Email | FieldType::ObjectId, DataValue::String(s)) => {
                s.is_empty()
            }
            (FieldType::Related { .. }, DataValue::Object(map)) => map.is_empty(),
            (FieldType::Related { .. }, DataValue::Array(items)) => items.is_empty(),
            _ => false,
        }
    }

    /// 未提供值时的取值
    pub fn resolve_default(&self) -> FieldValue {
        if self.nullable {
            return FieldValue::Value(DataValue::Null);
        }
        if let Some(default) = &self.default {
            return FieldValue::Value(default.clone());
        }
        let value = match &self.field_type {
            FieldType::Boolean => DataValue::Bool(false),
            FieldType::String | FieldType::Email => DataValue::String(String::new()),
            FieldType::Number => DataValue::Int(0),
            FieldType::Dict => DataValue::Object(HashMap::new()),
            FieldType::DateTime { auto_add: true, .. } => DataValue::DateTime(time::now()),
            FieldType::Related { many: true, .. } => return FieldValue::Records(Vec::new()),
            _ => DataValue::Null,
        };
        FieldValue::Value(value)
    }

    /// 验证原始输入
    ///
    /// `None` 表示输入中不存在该字段
    pub fn validate(&self, raw: Option<&DataValue>) -> QuickRestResult<FieldValue> {
        let value = match raw {
            Some(value) if !self.is_null_input(value) => value,
            _ => {
                if self.required {
                    return Err(QuickRestError::field(ErrorCode::RequiredField));
                }
                return Ok(self.resolve_default());
            }
        };

        match &self.field_type {
            FieldType::Related { child, many } => self.validate_related(*child, *many, value),
            _ => Ok(FieldValue::Value(self.validate_value(value)?)),
        }
    }

    /// 验证非空的标量输入
    fn validate_value(&self, value: &DataValue) -> QuickRestResult<DataValue> {
        match &self.field_type {
            FieldType::Boolean => match value {
                DataValue::Bool(b) => Ok(DataValue::Bool(*b)),
                _ => Err(QuickRestError::field(ErrorCode::InvalidBoolean)),
            },
            FieldType::String => {
                let s = validate_string(value)?;
                if !self.choices.is_empty() && !self.choices.contains(&s) {
                    return Err(QuickRestError::field(ErrorCode::InvalidStringChoice));
                }
                Ok(s)
            }
            FieldType::Email => {
                let s = validate_string(value)?;
                if let DataValue::String(email) = &s {
                    validate_email(email)?;
                }
                Ok(s)
            }
            FieldType::Number => {
                let number = match value {
                    DataValue::Int(_) | DataValue::Float(_) => value.clone(),
                    _ => return Err(QuickRestError::field(ErrorCode::InvalidNumber)),
                };
                if !self.choices.is_empty() && !self.choices.iter().any(|c| numbers_equal(c, &number)) {
                    return Err(QuickRestError::field(ErrorCode::InvalidNumberChoice));
                }
                Ok(number)
            }
            FieldType::DateTime { localize, timezone_offset, .. } => {
                validate_datetime(value, *localize, timezone_offset.as_deref())
            }
            FieldType::Date => {
                let date = match value {
                    DataValue::String(s) => time::parse_date_str(s),
                    DataValue::DateTime(dt) => Some(dt.date_naive()),
                    DataValue::NaiveDateTime(dt) => Some(dt.date()),
                    DataValue::Date(d) => Some(*d),
                    _ => None,
                };
                date.map(DataValue::Date)
                    .ok_or_else(|| QuickRestError::field(ErrorCode::InvalidDate))
            }
            FieldType::Time => {
                let t = match value {
                    DataValue::String(s) => time::parse_time_str(s),
                    DataValue::DateTime(dt) => Some(dt.time()),
                    DataValue::NaiveDateTime(dt) => Some(dt.time()),
                    DataValue::Time(t) => Some(*t),
                    DataValue::Object(map) => time_from_parts(map),
                    _ => None,
                };
                t.map(|t| DataValue::Time(DataValue::truncate_time(t)))
                    .ok_or_else(|| QuickRestError::field(ErrorCode::InvalidTime))
            }
            FieldType::ObjectId => match value {
                DataValue::ObjectId(oid) => Ok(DataValue::ObjectId(*oid)),
                DataValue::String(token) => security::decode_id(token).map(DataValue::ObjectId),
                other => Err(QuickRestError::ValidationError {
                    detail: ErrorDetail::code_with(
                        ErrorCode::InvalidObjectId,
                        &[("id", other.to_string().as_str())],
                    ),
                }),
            },
            FieldType::Dict => match value {
                DataValue::Object(_) => Ok(normalize_payload(value.clone())),
                other => Err(invalid_format("dict", other)),
            },
            FieldType::Related { .. } => Err(crate::quick_error!(
                definition,
                "关联字段必须通过 validate 验证"
            )),
        }
    }

    fn validate_related(
        &self,
        child: SchemaRef,
        many: bool,
        value: &DataValue,
    ) -> QuickRestResult<FieldValue> {
        let schema = child();
        if !many {
            return Ok(FieldValue::Record(Box::new(validate_related_item(&schema, value)?)));
        }

        let items = match value {
            DataValue::Array(items) => items,
            other => return Err(invalid_format("list", other)),
        };

        let mut records = Vec::with_capacity(items.len());
        let mut errors = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            match validate_related_item(&schema, item) {
                Ok(record) => records.push(record),
                Err(e) if e.is_validation() => {
                    errors.insert(index.to_string(), e.into_detail());
                }
                Err(e) => return Err(e),
            }
        }
        if !errors.is_empty() {
            return Err(QuickRestError::fields(errors));
        }
        Ok(FieldValue::Records(records))
    }

    /// 对外表示
    pub fn serialize(&self, value: &FieldValue) -> QuickRestResult<DataValue> {
        match value {
            FieldValue::Value(v) if self.is_null_input(v) => match self.resolve_default() {
                FieldValue::Value(DataValue::Null) => Ok(DataValue::Null),
                FieldValue::Records(_) => Ok(DataValue::Array(Vec::new())),
                FieldValue::Value(default) if !self.is_null_input(&default) => {
                    self.serialize_value(&default)
                }
                _ => Ok(DataValue::Null),
            },
            FieldValue::Value(v) => self.serialize_value(v),
            FieldValue::Record(record) => serialize_related(record),
            FieldValue::Records(records) => Ok(DataValue::Array(
                records
                    .iter()
                    .map(serialize_related)
                    .collect::<QuickRestResult<Vec<_>>>()?,
            )),
        }
    }

    fn serialize_value(&self, value: &DataValue) -> QuickRestResult<DataValue> {
        let out = match (&self.field_type, value) {
            (FieldType::String | FieldType::Email, DataValue::String(s)) => {
                DataValue::String(s.trim().to_string())
            }
            (FieldType::DateTime { .. }, DataValue::DateTime(dt)) => {
                DataValue::Int(time::datetime_to_millis(dt))
            }
            (FieldType::DateTime { localize: false, .. }, DataValue::NaiveDateTime(dt)) => {
                DataValue::String(dt.format(NAIVE_OUTPUT_FORMAT).to_string())
            }
            (FieldType::DateTime { .. }, DataValue::NaiveDateTime(dt)) => {
                DataValue::Int(time::datetime_to_millis(&time::localize(*dt)))
            }
            (FieldType::Date, DataValue::Date(d)) => {
                DataValue::String(d.format("%Y-%m-%d").to_string())
            }
            (FieldType::Time, DataValue::Time(t)) => {
                let mut parts = HashMap::new();
                parts.insert("hours".to_string(), DataValue::Int(t.hour() as i64));
                parts.insert("minutes".to_string(), DataValue::Int(t.minute() as i64));
                parts.insert("seconds".to_string(), DataValue::Int(t.second() as i64));
                DataValue::Object(parts)
            }
            (FieldType::ObjectId, DataValue::ObjectId(oid)) => {
                DataValue::String(security::encode_id(oid))
            }
            (FieldType::Dict, DataValue::Object(map)) => DataValue::Object(
                map.iter()
                    .map(|(k, v)| {
                        let v = match v {
                            DataValue::DateTime(dt) => DataValue::Int(time::datetime_to_millis(dt)),
                            other => other.clone(),
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            ),
            (_, other) => other.clone(),
        };
        Ok(out)
    }

    /// 存储表示
    pub fn to_storage(&self, value: &FieldValue) -> QuickRestResult<DataValue> {
        match value {
            FieldValue::Value(v) if self.is_null_input(v) => match self.resolve_default() {
                FieldValue::Records(_) => Ok(DataValue::Array(Vec::new())),
                FieldValue::Value(default) => Ok(default),
                FieldValue::Record(record) => record_to_storage(&record),
            },
            FieldValue::Value(v) => Ok(match (&self.field_type, v) {
                (FieldType::String | FieldType::Email, DataValue::String(s)) => {
                    DataValue::String(s.trim().to_string())
                }
                (FieldType::Date, DataValue::Date(d)) => {
                    DataValue::DateTime(time::localize(d.and_time(NaiveTime::MIN)))
                }
                (FieldType::Time, DataValue::Time(t)) => {
                    DataValue::String(t.format("%H:%M:%S").to_string())
                }
                (_, other) => other.clone(),
            }),
            FieldValue::Record(record) => record_to_storage(record),
            FieldValue::Records(records) => Ok(DataValue::Array(
                records
                    .iter()
                    .map(record_to_storage)
                    .collect::<QuickRestResult<Vec<_>>>()?,
            )),
        }
    }
}

fn invalid_format(expected: &str, actual: &DataValue) -> QuickRestError {
    QuickRestError::ValidationError {
        detail: ErrorDetail::code_with(
            ErrorCode::InvalidDataFormat,
            &[("expected", expected), ("actual", actual.type_name())],
        ),
    }
}

fn validate_string(value: &DataValue) -> QuickRestResult<DataValue> {
    let s = match value {
        DataValue::String(s) => s.trim(),
        _ => return Err(QuickRestError::field(ErrorCode::InvalidString)),
    };
    if s.is_empty() {
        return Err(QuickRestError::field(ErrorCode::RequiredField));
    }
    Ok(DataValue::String(s.to_string()))
}

fn validate_email(email: &str) -> QuickRestResult<()> {
    let mut parts = email.split('@');
    let (user, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(domain), None) => (user, domain),
        _ => return Err(QuickRestError::field(ErrorCode::InvalidEmail)),
    };
    if !EMAIL_USER_REGEX.is_match(user) || !EMAIL_DOMAIN_REGEX.is_match(domain) {
        return Err(QuickRestError::field(ErrorCode::InvalidEmail));
    }
    Ok(())
}

fn numbers_equal(a: &DataValue, b: &DataValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn validate_datetime(
    value: &DataValue,
    localize: bool,
    timezone_offset: Option<&str>,
) -> QuickRestResult<DataValue> {
    let invalid = || QuickRestError::field(ErrorCode::InvalidDatetime);
    // 毫秒时间戳表示确定的时刻，localize 只作用于无时区输入
    let from_millis = |millis: i64| -> QuickRestResult<ParsedDateTime> {
        Ok(ParsedDateTime::Aware(time::millis_to_datetime(millis)?))
    };

    let parsed = match value {
        DataValue::String(s) => time::parse_datetime_str(s).ok_or_else(invalid)?,
        DataValue::Int(millis) => from_millis(*millis)?,
        DataValue::Float(millis) if millis.is_finite() => from_millis(*millis as i64)?,
        DataValue::DateTime(dt) => ParsedDateTime::Aware(*dt),
        DataValue::NaiveDateTime(dt) => ParsedDateTime::Naive(*dt),
        _ => return Err(invalid()),
    };

    let offset = match timezone_offset {
        Some(offset) => Some(time::parse_fixed_offset(offset)?),
        None => None,
    };

    let out = match parsed {
        ParsedDateTime::Aware(dt) => DataValue::DateTime(time::truncate_to_millis(match offset {
            Some(offset) => dt.with_timezone(&offset),
            None => dt.with_timezone(&Utc).fixed_offset(),
        })),
        ParsedDateTime::Naive(dt) if localize => {
            DataValue::DateTime(time::truncate_to_millis(match offset {
                Some(offset) => time::localize_with_offset(dt, offset),
                None => time::localize(dt),
            }))
        }
        ParsedDateTime::Naive(dt) => {
            let nanos = dt.nanosecond() / 1_000_000 * 1_000_000;
            DataValue::NaiveDateTime(dt.with_nanosecond(nanos).unwrap_or(dt))
        }
    };
    Ok(out)
}

fn time_from_parts(map: &HashMap<String, DataValue>) -> Option<NaiveTime> {
    let part = |key: &str| -> Option<u32> {
        match map.get(key) {
            None => Some(0),
            Some(v) => v.as_i64().and_then(|i| u32::try_from(i).ok()),
        }
    };
    if !map.contains_key("hours") {
        return None;
    }
    NaiveTime::from_hms_opt(part("hours")?, part("minutes")?, part("seconds")?)
}

fn validate_related_item(schema: &Arc<ModelSchema>, value: &DataValue) -> QuickRestResult<Record> {
    if value.as_object().is_none() && schema.has_pk() {
        let id = FieldDefinition::new(FieldType::ObjectId)
            .required()
            .validate(Some(value))?;
        if let FieldValue::Value(DataValue::ObjectId(oid)) = id {
            return Ok(Record::unloaded(schema.clone(), oid));
        }
    }
    Record::from_value(schema.clone(), value)
}

/// 尚未加载的关联记录只输出其ID令牌
fn serialize_related(record: &Record) -> QuickRestResult<DataValue> {
    match record.pk() {
        Some(oid) if !record.is_loaded() => Ok(DataValue::String(security::encode_id(&oid))),
        _ => record.serialize(),
    }
}

/// 带主键的关联记录只存储主键
fn record_to_storage(record: &Record) -> QuickRestResult<DataValue> {
    match record.pk() {
        Some(oid) if record.schema().has_pk() => Ok(DataValue::ObjectId(oid)),
        _ => Ok(DataValue::Object(record.db_repr()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn leaf_code(err: &QuickRestError) -> Option<ErrorCode> {
        err.detail().and_then(|d| d.leaf_code())
    }

    fn value(v: FieldValue) -> DataValue {
        match v {
            FieldValue::Value(v) => v,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_required_and_nullable_are_exclusive() {
        assert!(FieldDefinition::new(FieldType::String).required().nullable().build().is_err());
        assert!(FieldDefinition::new(FieldType::Number)
            .required()
            .default_value(3)
            .build()
            .is_err());
        assert!(FieldDefinition::new(FieldType::String)
            .default_value("")
            .build()
            .is_err());
    }

    #[test]
    fn test_default_must_be_a_choice() {
        let err = FieldDefinition::new(FieldType::String)
            .choices(["a", "b"])
            .default_value("c")
            .build();
        assert!(err.is_err());

        let field = FieldDefinition::new(FieldType::String)
            .choices(["a", "b"])
            .default_value(" b ")
            .build()
            .unwrap();
        assert_eq!(value(field.validate(None).unwrap()), DataValue::from("b"));
    }

    #[test]
    fn test_absent_resolution() {
        let required = FieldDefinition::new(FieldType::Number).required().build().unwrap();
        let err = required.validate(None).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::RequiredField));

        let nullable = FieldDefinition::new(FieldType::Number).nullable().build().unwrap();
        assert_eq!(value(nullable.validate(None).unwrap()), DataValue::Null);

        let plain = FieldDefinition::new(FieldType::Number).build().unwrap();
        assert_eq!(value(plain.validate(Some(&DataValue::Null)).unwrap()), DataValue::Int(0));

        let flag = FieldDefinition::new(FieldType::Boolean).build().unwrap();
        assert_eq!(value(flag.validate(None).unwrap()), DataValue::Bool(false));
    }

    #[test]
    fn test_string_trims_and_rejects_blank() {
        let field = FieldDefinition::new(FieldType::String).build().unwrap();
        assert_eq!(
            value(field.validate(Some(&DataValue::from("  hi "))).unwrap()),
            DataValue::from("hi")
        );
        let err = field.validate(Some(&DataValue::from("   "))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::RequiredField));
        let err = field.validate(Some(&DataValue::Int(3))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidString));
    }

    #[test]
    fn test_choices_for_string_and_number() {
        let color = FieldDefinition::new(FieldType::String)
            .choices(["red", "green"])
            .build()
            .unwrap();
        let err = color.validate(Some(&DataValue::from("blue"))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidStringChoice));

        let level = FieldDefinition::new(FieldType::Number).choices([1, 2, 3]).build().unwrap();
        assert!(level.validate(Some(&DataValue::Float(2.0))).is_ok());
        let err = level.validate(Some(&DataValue::Int(5))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidNumberChoice));
    }

    #[test]
    fn test_email_validation() {
        let field = FieldDefinition::new(FieldType::Email).required().build().unwrap();
        assert!(field.validate(Some(&DataValue::from("a@b.com"))).is_ok());
        assert!(field.validate(Some(&DataValue::from("first.last+tag@mail.example.org"))).is_ok());
        for bad in ["not-an-email", "a@b@c.com", "a@localhost", "a@b.c-", "a b@c.com"] {
            let err = field.validate(Some(&DataValue::from(bad))).unwrap_err();
            assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidEmail), "{}", bad);
        }
    }

    #[test]
    fn test_datetime_inputs() {
        let field = FieldDefinition::new(FieldType::DateTime {
            auto_add: false,
            localize: true,
            timezone_offset: None,
        })
        .build()
        .unwrap();

        let from_str = value(field.validate(Some(&DataValue::from("2024-01-02 03:04:05"))).unwrap());
        let from_ms = value(field.validate(Some(&DataValue::Int(1_704_164_645_000))).unwrap());
        assert_eq!(from_str, from_ms);

        let err = field.validate(Some(&DataValue::from("later"))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidDatetime));
        assert!(field.validate(Some(&DataValue::Bool(true))).is_err());
    }

    #[test]
    fn test_datetime_with_offset_localizes_naive_input() {
        let field = FieldDefinition::new(FieldType::DateTime {
            auto_add: false,
            localize: true,
            timezone_offset: Some("+08:00".to_string()),
        })
        .build()
        .unwrap();
        match value(field.validate(Some(&DataValue::from("2024-01-02 08:00:00"))).unwrap()) {
            DataValue::DateTime(dt) => {
                assert_eq!(dt.offset().local_minus_utc(), 8 * 3600);
                assert_eq!(dt.timestamp_millis(), 1_704_153_600_000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_time_serializes_to_parts() {
        let field = FieldDefinition::new(FieldType::Time).build().unwrap();
        let v = field.validate(Some(&DataValue::from("09:15:30"))).unwrap();
        let out = field.serialize(&v).unwrap();
        assert_eq!(out.get("hours"), Some(&DataValue::Int(9)));
        assert_eq!(out.get("seconds"), Some(&DataValue::Int(30)));
        assert_eq!(field.to_storage(&v).unwrap(), DataValue::from("09:15:30"));
        assert_eq!(field.validate(Some(&out)).unwrap().as_value(), v.as_value());
    }

    #[test]
    fn test_object_id_accepts_token() {
        let field = FieldDefinition::new(FieldType::ObjectId).build().unwrap();
        let id = ObjectId::new();
        let token = security::encode_id(&id);
        assert_eq!(
            value(field.validate(Some(&DataValue::from(token.clone()))).unwrap()),
            DataValue::ObjectId(id)
        );
        let err = field.validate(Some(&DataValue::from(id.to_hex()))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidObjectId));
        assert_eq!(
            field.serialize(&FieldValue::Value(DataValue::ObjectId(id))).unwrap(),
            DataValue::String(token)
        );
    }

    #[test]
    fn test_dict_requires_mapping() {
        let field = FieldDefinition::new(FieldType::Dict).build().unwrap();
        let err = field.validate(Some(&DataValue::Int(1))).unwrap_err();
        assert_eq!(leaf_code(&err), Some(ErrorCode::InvalidDataFormat));
        assert_eq!(value(field.validate(None).unwrap()), DataValue::Object(HashMap::new()));
    }

    fn datetime(localize: bool, offset: Option<&str>) -> FieldDefinition {
        FieldDefinition::new(FieldType::DateTime {
            auto_add: false,
            localize,
            timezone_offset: offset.map(str::to_string),
        })
        .build()
        .unwrap()
    }

    fn assert_stable(field: &FieldDefinition, input: DataValue) {
        let first = field.validate(Some(&input)).unwrap();
        let out = field.serialize(&first).unwrap();
        let second = field.validate(Some(&out)).unwrap();
        assert_eq!(value(second), value(first), "{:?} -> {:?}", input, out);
    }

    #[test]
    fn test_unlocalized_millis_stay_aware() {
        let field = datetime(false, None);
        let first = value(field.validate(Some(&DataValue::from("2024-01-02T03:04:05Z"))).unwrap());
        assert!(matches!(first, DataValue::DateTime(_)));

        let out = field.serialize(&FieldValue::Value(first.clone())).unwrap();
        assert_eq!(out, DataValue::Int(1_704_164_645_000));
        assert_eq!(value(field.validate(Some(&out)).unwrap()), first);

        let naive = value(field.validate(Some(&DataValue::from("2024-01-02 03:04:05.250"))).unwrap());
        assert!(matches!(naive, DataValue::NaiveDateTime(_)));
        let out = field.serialize(&FieldValue::Value(naive.clone())).unwrap();
        assert_eq!(out, DataValue::from("2024-01-02T03:04:05.250"));
        assert_eq!(value(field.validate(Some(&out)).unwrap()), naive);
    }

    #[test]
    fn test_serialized_output_validates_to_same_value() {
        let flag = FieldDefinition::new(FieldType::Boolean).build().unwrap();
        assert_stable(&flag, DataValue::Bool(true));

        assert_stable(&datetime(true, None), DataValue::from("2024-01-02T03:04:05.678+02:00"));
        assert_stable(&datetime(true, None), DataValue::from("2024-01-02 03:04:05"));
        assert_stable(&datetime(true, None), DataValue::Int(1_704_164_645_123));
        assert_stable(&datetime(true, Some("+08:00")), DataValue::from("2024-01-02 08:00:00"));
        assert_stable(&datetime(true, Some("+08:00")), DataValue::from("2024-01-02T03:04:05Z"));
        assert_stable(&datetime(false, None), DataValue::from("2024-01-02T03:04:05Z"));
        assert_stable(&datetime(false, None), DataValue::from("2024-01-02 03:04:05"));
        assert_stable(&datetime(false, None), DataValue::Int(1_704_164_645_000));

        let date = FieldDefinition::new(FieldType::Date).build().unwrap();
        assert_stable(&date, DataValue::from("2024-02-29"));

        let time_of_day = FieldDefinition::new(FieldType::Time).build().unwrap();
        assert_stable(&time_of_day, DataValue::from("23:59:01"));

        let email = FieldDefinition::new(FieldType::Email).build().unwrap();
        assert_stable(&email, DataValue::from("  a@b.com "));

        let text = FieldDefinition::new(FieldType::String).build().unwrap();
        assert_stable(&text, DataValue::from(" hi "));

        let number = FieldDefinition::new(FieldType::Number).build().unwrap();
        assert_stable(&number, DataValue::Float(2.5));

        let id = FieldDefinition::new(FieldType::ObjectId).build().unwrap();
        assert_stable(&id, DataValue::from(security::encode_id(&ObjectId::new())));

        let mut nested = HashMap::new();
        nested.insert("owner".to_string(), DataValue::from(security::encode_id(&ObjectId::new())));
        nested.insert("count".to_string(), DataValue::Int(3));
        let mut doc = HashMap::new();
        doc.insert("meta".to_string(), DataValue::Object(nested));
        doc.insert("label".to_string(), DataValue::from("x"));
        let dict = FieldDefinition::new(FieldType::Dict).build().unwrap();
        assert_stable(&dict, DataValue::Object(doc));
    }
}
