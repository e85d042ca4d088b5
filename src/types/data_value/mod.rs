use bson::oid::ObjectId;
use bson::Bson;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// 通用数据值类型 - 请求载荷、字段值与文档存储之间的统一表示
#[derive(Clone, PartialEq)]
pub enum DataValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 带时区的日期时间
    DateTime(DateTime<FixedOffset>),
    /// 未本地化的日期时间
    NaiveDateTime(NaiveDateTime),
    /// 日期
    Date(NaiveDate),
    /// 时间
    Time(NaiveTime),
    /// 文档数据库对象ID
    ObjectId(ObjectId),
    /// 数组
    Array(Vec<DataValue>),
    /// 对象/文档
    Object(HashMap<String, DataValue>),
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Null => write!(f, "null"),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            DataValue::NaiveDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            DataValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DataValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            DataValue::ObjectId(oid) => write!(f, "ObjectId({})", oid.to_hex()),
            DataValue::Array(_) | DataValue::Object(_) => write!(f, "{}", self.to_json_value()),
        }
    }
}

impl std::fmt::Debug for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Debug 与 Display 保持一致，显示实际值而不是类型构造函数
        write!(f, "{}", self)
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl DataValue {
    /// 获取数据类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Bool(_) => "boolean",
            DataValue::Int(_) => "integer",
            DataValue::Float(_) => "float",
            DataValue::String(_) => "string",
            DataValue::DateTime(_) => "datetime",
            DataValue::NaiveDateTime(_) => "datetime",
            DataValue::Date(_) => "date",
            DataValue::Time(_) => "time",
            DataValue::ObjectId(_) => "object_id",
            DataValue::Array(_) => "list",
            DataValue::Object(_) => "dict",
        }
    }

    /// 判断是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// 判断是否为"空白"值：空值、空字符串、空数组、空对象
    ///
    /// 数字0和false不算空白，模型按别名回退取值时使用
    pub fn is_blank(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::String(s) => s.is_empty(),
            DataValue::Array(arr) => arr.is_empty(),
            DataValue::Object(obj) => obj.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 数值统一转为f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Int(i) => Some(*i as f64),
            DataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            DataValue::ObjectId(oid) => Some(*oid),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, DataValue>> {
        match self {
            DataValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(arr) => Some(arr.as_slice()),
            _ => None,
        }
    }

    /// 对象取值
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// 期望Object类型，如果不是则返回错误
    pub fn expect_object(self) -> crate::error::QuickRestResult<HashMap<String, DataValue>> {
        match self {
            DataValue::Object(map) => Ok(map),
            other => Err(crate::error::QuickRestError::ValidationError {
                detail: crate::error::ErrorDetail::code_with(
                    crate::error::ErrorCode::InvalidDataFormat,
                    &[("expected", "dict"), ("actual", other.type_name())],
                ),
            }),
        }
    }

    /// 转换为 JSON 值
    ///
    /// 对象ID输出为十六进制字符串，对外响应请使用 `utils::format_response`
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            DataValue::Null => serde_json::Value::Null,
            DataValue::Bool(b) => serde_json::Value::Bool(*b),
            DataValue::Int(i) => serde_json::Value::Number(serde_json::Number::from(*i)),
            DataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            DataValue::String(s) => serde_json::Value::String(s.clone()),
            DataValue::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            DataValue::NaiveDateTime(_) | DataValue::Date(_) | DataValue::Time(_) => {
                serde_json::Value::String(self.to_string())
            }
            DataValue::ObjectId(oid) => serde_json::Value::String(oid.to_hex()),
            DataValue::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|item| item.to_json_value()).collect())
            }
            DataValue::Object(obj) => serde_json::Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    /// 从 JSON 值解析
    pub fn from_json_value(value: serde_json::Value) -> Self {
        json_value_to_data_value(value)
    }

    /// 转换为 BSON 值
    pub fn to_bson(&self) -> Bson {
        match self {
            DataValue::Null => Bson::Null,
            DataValue::Bool(b) => Bson::Boolean(*b),
            DataValue::Int(i) => Bson::Int64(*i),
            DataValue::Float(f) => Bson::Double(*f),
            DataValue::String(s) => Bson::String(s.clone()),
            DataValue::DateTime(dt) => {
                Bson::DateTime(bson::DateTime::from_millis(dt.timestamp_millis()))
            }
            DataValue::NaiveDateTime(dt) => {
                Bson::DateTime(bson::DateTime::from_millis(dt.and_utc().timestamp_millis()))
            }
            DataValue::Date(d) => Bson::DateTime(bson::DateTime::from_millis(
                d.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
            )),
            DataValue::Time(t) => Bson::String(t.format("%H:%M:%S").to_string()),
            DataValue::ObjectId(oid) => Bson::ObjectId(*oid),
            DataValue::Array(arr) => Bson::Array(arr.iter().map(|v| v.to_bson()).collect()),
            DataValue::Object(obj) => {
                let mut doc = bson::Document::new();
                for (k, v) in obj {
                    doc.insert(k.clone(), v.to_bson());
                }
                Bson::Document(doc)
            }
        }
    }

    /// 从 BSON 值解析，存储中的日期时间统一以UTC返回
    pub fn from_bson(value: Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => DataValue::Null,
            Bson::Boolean(b) => DataValue::Bool(b),
            Bson::Int32(i) => DataValue::Int(i as i64),
            Bson::Int64(i) => DataValue::Int(i),
            Bson::Double(f) => DataValue::Float(f),
            Bson::String(s) => DataValue::String(s),
            Bson::ObjectId(oid) => DataValue::ObjectId(oid),
            Bson::DateTime(dt) => match DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()) {
                Some(utc) => DataValue::DateTime(utc.fixed_offset()),
                None => DataValue::Null,
            },
            Bson::Array(arr) => DataValue::Array(arr.into_iter().map(DataValue::from_bson).collect()),
            Bson::Document(doc) => DataValue::Object(
                doc.into_iter()
                    .map(|(k, v)| (k, DataValue::from_bson(v)))
                    .collect(),
            ),
            other => DataValue::String(other.to_string()),
        }
    }

    /// 时间值去掉亚秒部分
    pub fn truncate_time(t: NaiveTime) -> NaiveTime {
        t.with_nanosecond(0).unwrap_or(t)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Int(value as i64)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Float(value)
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::String(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(value: DateTime<Utc>) -> Self {
        DataValue::DateTime(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for DataValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        DataValue::DateTime(value)
    }
}

impl From<NaiveDate> for DataValue {
    fn from(value: NaiveDate) -> Self {
        DataValue::Date(value)
    }
}

impl From<NaiveTime> for DataValue {
    fn from(value: NaiveTime) -> Self {
        DataValue::Time(value)
    }
}

impl From<ObjectId> for DataValue {
    fn from(value: ObjectId) -> Self {
        DataValue::ObjectId(value)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(value: Vec<DataValue>) -> Self {
        DataValue::Array(value)
    }
}

impl From<HashMap<String, DataValue>> for DataValue {
    fn from(value: HashMap<String, DataValue>) -> Self {
        DataValue::Object(value)
    }
}

impl From<serde_json::Value> for DataValue {
    fn from(value: serde_json::Value) -> Self {
        json_value_to_data_value(value)
    }
}

impl<T> From<Option<T>> for DataValue
where
    T: Into<DataValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DataValue::Null,
        }
    }
}

/// 将 serde_json::Value 转换为对应的 DataValue 类型
pub fn json_value_to_data_value(value: serde_json::Value) -> DataValue {
    match value {
        serde_json::Value::Null => DataValue::Null,
        serde_json::Value::Bool(b) => DataValue::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                DataValue::Int(i)
            } else {
                DataValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => DataValue::String(s),
        serde_json::Value::Array(arr) => {
            DataValue::Array(arr.into_iter().map(json_value_to_data_value).collect())
        }
        serde_json::Value::Object(obj) => DataValue::Object(
            obj.into_iter()
                .map(|(k, v)| (k, json_value_to_data_value(v)))
                .collect(),
        ),
    }
}

/// 构造对象值的便捷宏
///
/// ```ignore
/// let payload = data_object! { "email" => "a@b.com", "age" => 18 };
/// ```
#[macro_export]
macro_rules! data_object {
    () => {
        $crate::types::DataValue::Object(::std::collections::HashMap::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::HashMap::new();
        $(map.insert($key.to_string(), $crate::types::DataValue::from($value));)+
        $crate::types::DataValue::Object(map)
    }};
}
