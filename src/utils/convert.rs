//! 请求载荷与响应数据的转换工具

use crate::error::{ErrorCode, QuickRestError, QuickRestResult};
use crate::security;
use crate::types::DataValue;
use crate::utils::time;
use std::collections::HashMap;

const TRUTHY: &[&str] = &["true", "True", "1", "yes", "Yes", "Y", "y"];
const FALSY: &[&str] = &["false", "False", "0", "no", "No", "N", "n"];

/// 是否为"真"值，查询参数中的开关使用
pub fn is_true(value: &DataValue) -> bool {
    match value {
        DataValue::Bool(b) => *b,
        DataValue::Int(i) => *i == 1,
        DataValue::String(s) => TRUTHY.contains(&s.as_str()),
        _ => false,
    }
}

/// 是否为"假"值
pub fn is_false(value: &DataValue) -> bool {
    match value {
        DataValue::Bool(b) => !*b,
        DataValue::Int(i) => *i == 0,
        DataValue::String(s) => FALSY.contains(&s.as_str()),
        _ => false,
    }
}

/// 解析为布尔值，既不是真值也不是假值时报错
pub fn parse_as_boolean(value: &DataValue) -> QuickRestResult<bool> {
    if is_true(value) {
        return Ok(true);
    }
    if is_false(value) {
        return Ok(false);
    }
    Err(QuickRestError::field(ErrorCode::InvalidBoolean))
}

/// 规整请求载荷：能解码为ID令牌的字符串一律转换为对象ID
pub fn normalize_payload(value: DataValue) -> DataValue {
    match value {
        DataValue::String(s) => match security::decode_id(&s) {
            Ok(oid) => DataValue::ObjectId(oid),
            Err(_) => DataValue::String(s),
        },
        DataValue::Array(items) => {
            DataValue::Array(items.into_iter().map(normalize_payload).collect())
        }
        DataValue::Object(map) => DataValue::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_payload(v)))
                .collect(),
        ),
        other => other,
    }
}

/// 格式化响应数据：对象ID编码为令牌，日期时间输出为毫秒时间戳
pub fn format_response(value: &DataValue) -> serde_json::Value {
    match value {
        DataValue::ObjectId(oid) => serde_json::Value::String(security::encode_id(oid)),
        DataValue::DateTime(dt) => serde_json::Value::from(time::datetime_to_millis(dt)),
        DataValue::NaiveDateTime(dt) => {
            serde_json::Value::from(time::datetime_to_millis(&time::localize(*dt)))
        }
        DataValue::Array(items) => {
            serde_json::Value::Array(items.iter().map(format_response).collect())
        }
        DataValue::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), format_response(v)))
                .collect(),
        ),
        other => other.to_json_value(),
    }
}

/// 解析查询字符串，重复的键以最后一次为准
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

/// 解析 Cookie 头
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            Some((key.trim().to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}

/// 查询参数转为对象值
pub fn query_to_payload(query: &HashMap<String, String>) -> DataValue {
    DataValue::Object(
        query
            .iter()
            .map(|(k, v)| (k.clone(), DataValue::String(v.clone())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    #[test]
    fn test_truthy_values() {
        assert!(is_true(&DataValue::from("yes")));
        assert!(is_true(&DataValue::Int(1)));
        assert!(is_false(&DataValue::from("N")));
        assert!(is_false(&DataValue::Bool(false)));
        assert_eq!(parse_as_boolean(&DataValue::from("True")).unwrap(), true);
        assert!(parse_as_boolean(&DataValue::from("maybe")).is_err());
    }

    #[test]
    fn test_normalize_and_format_are_inverse_for_ids() {
        let id = ObjectId::new();
        let token = security::encode_id(&id);
        let payload = crate::data_object! {
            "owner" => token.clone(),
            "tags" => vec![DataValue::from(token.clone()), DataValue::from("plain")],
        };

        let normalized = normalize_payload(payload);
        assert_eq!(normalized.get("owner"), Some(&DataValue::ObjectId(id)));
        assert_eq!(
            normalized.get("tags").and_then(|t| t.as_array()).map(|t| t[1].clone()),
            Some(DataValue::from("plain"))
        );

        let json = format_response(&normalized);
        assert_eq!(json["owner"], serde_json::Value::String(token.clone()));
        assert_eq!(json["tags"][0], serde_json::Value::String(token));
    }

    #[test]
    fn test_format_response_datetime_as_millis() {
        let dt = time::millis_to_datetime(1_600_000_000_000).unwrap();
        let json = format_response(&crate::data_object! { "at" => dt });
        assert_eq!(json["at"], serde_json::json!(1_600_000_000_000i64));
    }

    #[test]
    fn test_query_and_cookie_parsing() {
        let query = parse_query_string("name=J%C3%BCrgen&page=2&flag&q=a+b");
        assert_eq!(query.get("name").map(String::as_str), Some("Jürgen"));
        assert_eq!(query.get("flag").map(String::as_str), Some(""));
        assert_eq!(query.get("q").map(String::as_str), Some("a b"));

        let cookies = parse_cookie_header("user=alice; account=\"acme\"");
        assert_eq!(cookies.get("user").map(String::as_str), Some("alice"));
        assert_eq!(cookies.get("account").map(String::as_str), Some("acme"));
    }
}
