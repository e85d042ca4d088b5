//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供字段验证和请求分发的多语言消息

use rat_embed_lang::register_translations;
use std::collections::HashMap;

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 单条消息的三种语言版本
    fn entry(
        translations: &mut HashMap<String, HashMap<String, String>>,
        key: &str,
        zh: &str,
        en: &str,
        ja: &str,
    ) {
        let mut messages = HashMap::new();
        messages.insert("zh-CN".to_string(), zh.to_string());
        messages.insert("en-US".to_string(), en.to_string());
        messages.insert("ja-JP".to_string(), ja.to_string());
        translations.insert(key.to_string(), messages);
    }

    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();
        let t = &mut translations;

        // 字段验证
        Self::entry(t, "field.required", "该字段为必填项", "This field is required", "この項目は必須です");
        Self::entry(t, "field.invalid_boolean", "无效的布尔值", "Invalid boolean value", "無効なブール値です");
        Self::entry(t, "field.invalid_datetime", "无效的日期时间", "Invalid datetime", "無効な日時です");
        Self::entry(t, "field.invalid_date", "无效的日期", "Invalid date", "無効な日付です");
        Self::entry(t, "field.invalid_time", "无效的时间", "Invalid time", "無効な時刻です");
        Self::entry(t, "field.invalid_string", "无效的字符串", "Invalid string", "無効な文字列です");
        Self::entry(t, "field.invalid_string_choice", "取值不在可选范围内", "Value is not a valid choice", "値が選択肢に含まれていません");
        Self::entry(t, "field.invalid_number", "无效的数字", "Invalid number", "無効な数値です");
        Self::entry(t, "field.invalid_number_choice", "数值不在可选范围内", "Number is not a valid choice", "数値が選択肢に含まれていません");
        Self::entry(t, "field.invalid_email", "无效的邮箱地址", "Invalid email address", "無効なメールアドレスです");
        Self::entry(t, "field.invalid_object_id", "无效的对象ID: {id}", "Invalid object id: {id}", "無効なオブジェクトID: {id}");
        Self::entry(t, "field.invalid_data_format", "数据格式无效，期望 {expected}，实际为 {actual}", "Invalid data format, expected {expected} but got {actual}", "データ形式が無効です。期待値 {expected}、実際 {actual}");
        Self::entry(t, "field.invalid_field_mapping", "模型 {model} 中字段 {field} 没有对应的定义", "Field {field} has no definition on model {model}", "モデル {model} のフィールド {field} に定義がありません");
        Self::entry(t, "field.custom", "{message}", "{message}", "{message}");

        // 请求分发
        Self::entry(t, "error.validation_title", "数据验证失败", "Validation error", "検証エラー");
        Self::entry(t, "error.validation", "数据验证失败: {detail}", "Validation failed: {detail}", "検証に失敗しました: {detail}");
        Self::entry(t, "error.method_not_available", "不支持的请求方法: {method}", "Method not available: {method}", "利用できないメソッドです: {method}");
        Self::entry(t, "error.method_not_implemented", "方法 {method} 必须在子类中实现", "Method {method} must be implemented", "メソッド {method} を実装する必要があります");
        Self::entry(t, "error.invalid_input_data", "输入数据编码无效: {message}", "Invalid input data encoding: {message}", "入力データのエンコードが無効です: {message}");
        Self::entry(t, "error.invalid_data", "无效数据: {message}", "Invalid data: {message}", "無効なデータ: {message}");
        Self::entry(t, "error.key_error", "缺少键: {key}", "Missing key: {key}", "キーがありません: {key}");
        Self::entry(t, "error.not_found", "资源不存在: {path}", "Resource not found: {path}", "リソースが見つかりません: {path}");
        Self::entry(t, "error.internal", "服务器内部错误", "Internal server error", "内部サーバーエラー");
        Self::entry(t, "error.success", "成功", "success", "成功");
        Self::entry(t, "error.unauthorized", "请先登录", "Authentication required", "ログインが必要です");

        // 模型与存储
        Self::entry(t, "error.not_hydrated", "模型 {model} 的字段 {field} 尚未从存储加载", "Field {field} of model {model} has not been loaded from storage", "モデル {model} のフィールド {field} はまだ読み込まれていません");
        Self::entry(t, "error.invalid_definition", "字段或模型定义无效: {message}", "Invalid field or model definition: {message}", "フィールドまたはモデル定義が無効です: {message}");
        Self::entry(t, "error.storage", "存储操作失败: {message}", "Storage operation failed: {message}", "ストレージ操作に失敗しました: {message}");
        Self::entry(t, "error.connection", "数据库连接失败: {message}", "Database connection failed: {message}", "データベース接続に失敗しました: {message}");
        Self::entry(t, "error.config", "配置错误: {message}", "Configuration error: {message}", "設定エラー: {message}");
        Self::entry(t, "error.serialization", "数据序列化失败: {message}", "Data serialization failed: {message}", "データシリアライズが失敗しました: {message}");
        Self::entry(t, "error.io", "IO错误: {message}", "IO error: {message}", "IOエラー: {message}");

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        Self::register_all_translations();

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}

/// 重新导出rat_embed_lang的核心函数
pub use rat_embed_lang::{current_language, set_language, t, tf};
