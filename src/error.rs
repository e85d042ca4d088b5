//! 错误类型定义模块
//!
//! 统一的错误枚举、HTTP状态码映射以及结构化的字段错误载荷

use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;
use std::collections::BTreeMap;
use thiserror::Error;

/// 库结果类型
pub type QuickRestResult<T> = Result<T, QuickRestError>;

/// 错误消息编码
///
/// 每个编码对应 i18n 目录中的一条消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    RequiredField,
    InvalidBoolean,
    InvalidDatetime,
    InvalidDate,
    InvalidTime,
    InvalidString,
    InvalidStringChoice,
    InvalidNumber,
    InvalidNumberChoice,
    InvalidEmail,
    InvalidObjectId,
    InvalidDataFormat,
    InvalidFieldMapping,
    /// 业务代码自定义的消息
    Custom,
}

impl ErrorCode {
    /// 对应的 i18n 键
    pub fn i18n_key(&self) -> &'static str {
        match self {
            ErrorCode::RequiredField => "field.required",
            ErrorCode::InvalidBoolean => "field.invalid_boolean",
            ErrorCode::InvalidDatetime => "field.invalid_datetime",
            ErrorCode::InvalidDate => "field.invalid_date",
            ErrorCode::InvalidTime => "field.invalid_time",
            ErrorCode::InvalidString => "field.invalid_string",
            ErrorCode::InvalidStringChoice => "field.invalid_string_choice",
            ErrorCode::InvalidNumber => "field.invalid_number",
            ErrorCode::InvalidNumberChoice => "field.invalid_number_choice",
            ErrorCode::InvalidEmail => "field.invalid_email",
            ErrorCode::InvalidObjectId => "field.invalid_object_id",
            ErrorCode::InvalidDataFormat => "field.invalid_data_format",
            ErrorCode::InvalidFieldMapping => "field.invalid_field_mapping",
            ErrorCode::Custom => "field.custom",
        }
    }
}

/// 结构化错误载荷
///
/// 叶子节点携带编码和已翻译的消息，嵌套节点按字段名或下标聚合子错误
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Leaf { code: ErrorCode, message: String },
    Nested(BTreeMap<String, ErrorDetail>),
}

impl ErrorDetail {
    /// 使用编码的默认消息创建叶子错误
    pub fn code(code: ErrorCode) -> Self {
        ErrorDetail::Leaf {
            code,
            message: crate::i18n::t(code.i18n_key()),
        }
    }

    /// 带参数的叶子错误
    pub fn code_with(code: ErrorCode, args: &[(&str, &str)]) -> Self {
        ErrorDetail::Leaf {
            code,
            message: crate::i18n::tf(code.i18n_key(), args),
        }
    }

    /// 自定义消息
    pub fn message<S: Into<String>>(message: S) -> Self {
        ErrorDetail::Leaf {
            code: ErrorCode::Custom,
            message: message.into(),
        }
    }

    /// 叶子错误的编码
    pub fn leaf_code(&self) -> Option<ErrorCode> {
        match self {
            ErrorDetail::Leaf { code, .. } => Some(*code),
            ErrorDetail::Nested(_) => None,
        }
    }

    /// 查找嵌套错误中的子项
    pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Nested(map) => map.get(key),
            ErrorDetail::Leaf { .. } => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, ErrorDetail::Nested(_))
    }

    /// 转为JSON值（叶子为字符串，嵌套为对象）
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            ErrorDetail::Leaf { message, .. } => serde_json::Value::String(message.clone()),
            ErrorDetail::Nested(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::Leaf { message, .. } => write!(f, "{}", message),
            ErrorDetail::Nested(_) => write!(f, "{}", self.to_json_value()),
        }
    }
}

impl Serialize for ErrorDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ErrorDetail::Leaf { message, .. } => serializer.serialize_str(message),
            ErrorDetail::Nested(map) => {
                let mut state = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    state.serialize_entry(k, v)?;
                }
                state.end()
            }
        }
    }
}

/// rat_quickrest 错误类型
///
/// 显示文本通过 i18n 目录生成，见下方 `Display` 实现
#[derive(Error, Debug)]
pub enum QuickRestError {
    /// 数据验证失败
    ValidationError { detail: ErrorDetail },

    /// 权限检查失败，状态码由权限实现决定
    PermissionDenied { status: u16, message: String },

    /// 携带显式状态码的业务错误
    ApiError {
        status: u16,
        message: String,
        data: serde_json::Value,
    },

    /// 资源没有该HTTP方法对应的处理器
    MethodNotAvailable { method: String },

    /// 必须重写的扩展点未实现
    MethodNotImplemented { method: String },

    /// 请求编码错误
    InvalidInputData { message: String },

    /// 请求数据格式错误
    InvalidData { message: String },

    /// 缺失必要的键
    KeyError { key: String },

    /// 记录尚未从存储加载
    NotHydrated { model: String, field: String },

    /// 字段或模型声明非法
    InvalidDefinition { message: String },

    /// 存储层错误
    StorageError { message: String },

    /// 数据库连接错误
    ConnectionError { message: String },

    /// 配置错误
    ConfigError { message: String },

    /// 序列化错误
    SerializationError { message: String },

    /// IO错误
    IoError(#[from] std::io::Error),

    /// 其他错误
    Other(#[from] anyhow::Error),
}

impl std::fmt::Display for QuickRestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use crate::i18n::tf;
        let text = match self {
            QuickRestError::ValidationError { detail } => {
                tf("error.validation", &[("detail", detail.to_string().as_str())])
            }
            QuickRestError::PermissionDenied { message, .. } => message.clone(),
            QuickRestError::ApiError { message, .. } => message.clone(),
            QuickRestError::MethodNotAvailable { method } => {
                tf("error.method_not_available", &[("method", method.as_str())])
            }
            QuickRestError::MethodNotImplemented { method } => {
                tf("error.method_not_implemented", &[("method", method.as_str())])
            }
            QuickRestError::InvalidInputData { message } => {
                tf("error.invalid_input_data", &[("message", message.as_str())])
            }
            QuickRestError::InvalidData { message } => {
                tf("error.invalid_data", &[("message", message.as_str())])
            }
            QuickRestError::KeyError { key } => tf("error.key_error", &[("key", key.as_str())]),
            QuickRestError::NotHydrated { model, field } => {
                tf("error.not_hydrated", &[("model", model.as_str()), ("field", field.as_str())])
            }
            QuickRestError::InvalidDefinition { message } => {
                tf("error.invalid_definition", &[("message", message.as_str())])
            }
            QuickRestError::StorageError { message } => tf("error.storage", &[("message", message.as_str())]),
            QuickRestError::ConnectionError { message } => {
                tf("error.connection", &[("message", message.as_str())])
            }
            QuickRestError::ConfigError { message } => tf("error.config", &[("message", message.as_str())]),
            QuickRestError::SerializationError { message } => {
                tf("error.serialization", &[("message", message.as_str())])
            }
            QuickRestError::IoError(e) => tf("error.io", &[("message", e.to_string().as_str())]),
            QuickRestError::Other(e) => e.to_string(),
        };
        write!(f, "{}", text)
    }
}

impl QuickRestError {
    /// 单字段验证错误
    pub fn field(code: ErrorCode) -> Self {
        QuickRestError::ValidationError {
            detail: ErrorDetail::code(code),
        }
    }

    /// 按字段名聚合的验证错误
    pub fn fields(errors: BTreeMap<String, ErrorDetail>) -> Self {
        QuickRestError::ValidationError {
            detail: ErrorDetail::Nested(errors),
        }
    }

    /// HTTP状态码
    pub fn status_code(&self) -> u16 {
        match self {
            QuickRestError::ValidationError { .. }
            | QuickRestError::MethodNotAvailable { .. }
            | QuickRestError::InvalidInputData { .. }
            | QuickRestError::InvalidData { .. } => 400,
            QuickRestError::PermissionDenied { status, .. } => *status,
            QuickRestError::ApiError { status, .. } => *status,
            _ => 500,
        }
    }

    /// 对外暴露的消息
    pub fn public_message(&self) -> String {
        match self {
            QuickRestError::ValidationError { .. } => crate::i18n::t("error.validation_title"),
            other => other.to_string(),
        }
    }

    /// 对外暴露的数据载荷
    pub fn public_data(&self) -> serde_json::Value {
        match self {
            QuickRestError::ValidationError { detail } => match detail {
                ErrorDetail::Nested(_) => detail.to_json_value(),
                ErrorDetail::Leaf { .. } => serde_json::json!({ "message": detail.to_json_value() }),
            },
            QuickRestError::ApiError { data, .. } => data.clone(),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// 取出验证错误的载荷（用于嵌套聚合）
    pub fn into_detail(self) -> ErrorDetail {
        match self {
            QuickRestError::ValidationError { detail } => detail,
            other => ErrorDetail::message(other.to_string()),
        }
    }

    /// 验证错误的载荷引用
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            QuickRestError::ValidationError { detail } => Some(detail),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, QuickRestError::ValidationError { .. })
    }
}

/// 便捷宏：快速创建常见错误
#[macro_export]
macro_rules! quick_error {
    (validation, $code:expr) => {
        $crate::error::QuickRestError::field($code)
    };
    (config, $msg:expr) => {
        $crate::error::QuickRestError::ConfigError {
            message: $msg.to_string(),
        }
    };
    (serialization, $msg:expr) => {
        $crate::error::QuickRestError::SerializationError {
            message: $msg.to_string(),
        }
    };
    (storage, $msg:expr) => {
        $crate::error::QuickRestError::StorageError {
            message: $msg.to_string(),
        }
    };
    (definition, $msg:expr) => {
        $crate::error::QuickRestError::InvalidDefinition {
            message: $msg.to_string(),
        }
    };
    (api, $status:expr, $msg:expr) => {
        $crate::error::QuickRestError::ApiError {
            status: $status,
            message: $msg.to_string(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    };
    (api, $status:expr, $msg:expr, $data:expr) => {
        $crate::error::QuickRestError::ApiError {
            status: $status,
            message: $msg.to_string(),
            data: $data,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(QuickRestError::field(ErrorCode::RequiredField).status_code(), 400);
        assert_eq!(
            QuickRestError::KeyError { key: "name".to_string() }.status_code(),
            500
        );
        assert_eq!(
            QuickRestError::PermissionDenied { status: 403, message: "forbidden".to_string() }
                .status_code(),
            403
        );
        assert_eq!(quick_error!(api, 409, "conflict").status_code(), 409);
        assert_eq!(
            QuickRestError::MethodNotImplemented { method: "get_queryset".to_string() }.status_code(),
            500
        );
    }

    #[test]
    fn test_nested_detail_serializes_as_object() {
        let mut inner = BTreeMap::new();
        inner.insert("1".to_string(), ErrorDetail::message("bad item"));
        let mut outer = BTreeMap::new();
        outer.insert("items".to_string(), ErrorDetail::Nested(inner));
        outer.insert("name".to_string(), ErrorDetail::message("required"));

        let json = serde_json::to_value(ErrorDetail::Nested(outer)).unwrap();
        assert_eq!(json["items"]["1"], "bad item");
        assert_eq!(json["name"], "required");
    }

    #[test]
    fn test_public_data_wraps_leaf() {
        let err = QuickRestError::ValidationError { detail: ErrorDetail::message("oops") };
        assert_eq!(err.public_data()["message"], "oops");
    }
}
