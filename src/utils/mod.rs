//! 工具函数模块

pub mod convert;
pub mod time;

pub use convert::{
    format_response, is_false, is_true, normalize_payload, parse_as_boolean, parse_cookie_header,
    parse_query_string, query_to_payload,
};
