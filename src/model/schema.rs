//! 模型结构定义
//!
//! 描述一个模型由哪些字段组成、字段的别名与可见性，以及按字段名登记的钩子表

use crate::error::{QuickRestError, QuickRestResult};
use crate::model::field_types::{FieldDefinition, FieldType};
use crate::model::record::{FieldValue, Record};
use crate::types::DataValue;
use rat_logger::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// 主键字段名
pub const PK_FIELD: &str = "_id";

/// 字段赋值钩子，替代默认的 `FieldDefinition::validate`
pub type SetterHook =
    Arc<dyn Fn(&Record, &FieldDefinition, Option<&DataValue>) -> QuickRestResult<FieldValue> + Send + Sync>;

/// 以整条记录为输入、产出单个字段值的钩子（存储表示、对外表示）
pub type RecordHook = Arc<dyn Fn(&Record) -> QuickRestResult<DataValue> + Send + Sync>;

/// 记录级校验钩子，所有字段赋值成功后执行
pub type ObjectValidator = Arc<dyn Fn(&Record) -> QuickRestResult<()> + Send + Sync>;

/// 按字段名登记的钩子表
#[derive(Clone, Default)]
pub struct FieldHooks {
    setters: HashMap<String, SetterHook>,
    storage: HashMap<String, RecordHook>,
    serializers: HashMap<String, RecordHook>,
}

impl FieldHooks {
    fn names(&self) -> impl Iterator<Item = &String> {
        self.setters
            .keys()
            .chain(self.storage.keys())
            .chain(self.serializers.keys())
    }
}

/// 模型结构
pub struct ModelSchema {
    name: String,
    collection: Option<String>,
    fields: Vec<(String, FieldDefinition)>,
    index: HashMap<String, usize>,
    alias: HashMap<String, String>,
    public_fields: Vec<String>,
    read_only_fields: HashSet<String>,
    hooks: FieldHooks,
    object_validator: Option<ObjectValidator>,
}

impl std::fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSchema")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ModelSchema {
    /// 创建模型结构构建器
    pub fn builder<S: Into<String>>(name: S) -> ModelSchemaBuilder {
        ModelSchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 存储集合名，纯嵌入式模型没有集合
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// 按声明顺序遍历字段
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldDefinition)> {
        self.fields.iter().map(|(name, def)| (name, def))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 是否声明了主键字段
    pub fn has_pk(&self) -> bool {
        self.has_field(PK_FIELD)
    }

    /// 字段的外部别名
    pub fn alias(&self, name: &str) -> Option<&str> {
        self.alias.get(name).map(String::as_str)
    }

    /// 对外使用的键名：有别名取别名，否则为字段名
    pub fn external_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias(name).unwrap_or(name)
    }

    /// 对外可见的字段，未声明时为全部字段
    pub fn visible_fields(&self) -> Vec<&str> {
        if self.public_fields.is_empty() {
            self.field_names().collect()
        } else {
            self.public_fields.iter().map(String::as_str).collect()
        }
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.read_only_fields.contains(name)
    }

    pub fn setter(&self, name: &str) -> Option<&SetterHook> {
        self.hooks.setters.get(name)
    }

    pub fn storage_hook(&self, name: &str) -> Option<&RecordHook> {
        self.hooks.storage.get(name)
    }

    pub fn serialize_hook(&self, name: &str) -> Option<&RecordHook> {
        self.hooks.serializers.get(name)
    }

    pub fn object_validator(&self) -> Option<&ObjectValidator> {
        self.object_validator.as_ref()
    }
}

/// 模型结构构建器
pub struct ModelSchemaBuilder {
    name: String,
    collection: Option<String>,
    fields: Vec<(String, FieldDefinition)>,
    alias: HashMap<String, String>,
    public_fields: Vec<String>,
    read_only_fields: Vec<String>,
    hooks: FieldHooks,
    object_validator: Option<ObjectValidator>,
}

impl ModelSchemaBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            collection: None,
            fields: Vec::new(),
            alias: HashMap::new(),
            public_fields: Vec::new(),
            read_only_fields: Vec::new(),
            hooks: FieldHooks::default(),
            object_validator: None,
        }
    }

    /// 设置存储集合名
    pub fn collection<S: Into<String>>(mut self, collection: S) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// 声明字段，顺序即字段顺序
    pub fn field<S: Into<String>>(mut self, name: S, definition: FieldDefinition) -> Self {
        self.fields.push((name.into(), definition));
        self
    }

    /// 设置字段的外部别名
    pub fn alias<S: Into<String>, A: Into<String>>(mut self, field: S, external: A) -> Self {
        self.alias.insert(field.into(), external.into());
        self
    }

    /// 设置对外可见字段
    pub fn public_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// 设置只读字段，局部更新时忽略
    pub fn read_only_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// 登记字段赋值钩子
    pub fn setter<S, F>(mut self, field: S, hook: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Record, &FieldDefinition, Option<&DataValue>) -> QuickRestResult<FieldValue>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.setters.insert(field.into(), Arc::new(hook));
        self
    }

    /// 登记字段存储表示钩子
    pub fn storage_hook<S, F>(mut self, field: S, hook: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Record) -> QuickRestResult<DataValue> + Send + Sync + 'static,
    {
        self.hooks.storage.insert(field.into(), Arc::new(hook));
        self
    }

    /// 登记字段对外表示钩子
    pub fn serialize_hook<S, F>(mut self, field: S, hook: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Record) -> QuickRestResult<DataValue> + Send + Sync + 'static,
    {
        self.hooks.serializers.insert(field.into(), Arc::new(hook));
        self
    }

    /// 登记记录级校验
    pub fn validate_object<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Record) -> QuickRestResult<()> + Send + Sync + 'static,
    {
        self.object_validator = Some(Arc::new(validator));
        self
    }

    /// 构建模型结构
    ///
    /// # 错误
    ///
    /// 字段定义非法，或别名、可见字段、只读字段、钩子引用了未声明的字段
    pub fn build(self) -> QuickRestResult<Arc<ModelSchema>> {
        if self.name.trim().is_empty() {
            return Err(crate::quick_error!(definition, "模型名称不能为空"));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::new();
        for (name, definition) in self.fields {
            if index.contains_key(&name) {
                return Err(crate::quick_error!(
                    definition,
                    format!("模型 {} 中字段 {} 重复声明", self.name, name)
                ));
            }
            let definition = definition.build().map_err(|e| {
                crate::quick_error!(
                    definition,
                    format!("模型 {} 的字段 {} 定义无效: {}", self.name, name, e)
                )
            })?;
            if name == PK_FIELD && !matches!(definition.field_type, FieldType::ObjectId) {
                return Err(crate::quick_error!(
                    definition,
                    format!("模型 {} 的主键字段必须为对象ID类型", self.name)
                ));
            }
            index.insert(name.clone(), fields.len());
            fields.push((name, definition));
        }

        let referenced = self
            .alias
            .keys()
            .chain(self.public_fields.iter())
            .chain(self.read_only_fields.iter())
            .chain(self.hooks.names());
        for name in referenced {
            if !index.contains_key(name) {
                return Err(unknown_field(&self.name, name));
            }
        }

        debug!("构建模型结构: {}，字段数: {}", self.name, fields.len());

        Ok(Arc::new(ModelSchema {
            name: self.name,
            collection: self.collection,
            fields,
            index,
            alias: self.alias,
            public_fields: self.public_fields,
            read_only_fields: self.read_only_fields.into_iter().collect(),
            hooks: self.hooks,
            object_validator: self.object_validator,
        }))
    }
}

fn unknown_field(model: &str, field: &str) -> QuickRestError {
    QuickRestError::InvalidDefinition {
        message: crate::i18n::tf(
            "field.invalid_field_mapping",
            &[("model", model), ("field", field)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::convenience::{number_field, object_id_field, string_field};

    #[test]
    fn test_unknown_references_fail() {
        let err = ModelSchema::builder("User")
            .field("name", string_field())
            .public_fields(["name", "age"])
            .build()
            .unwrap_err();
        assert!(matches!(err, QuickRestError::InvalidDefinition { .. }));

        assert!(ModelSchema::builder("User")
            .field("name", string_field())
            .alias("nickname", "nick")
            .build()
            .is_err());

        assert!(ModelSchema::builder("User")
            .field("name", string_field())
            .serialize_hook("missing", |_| Ok(DataValue::Null))
            .build()
            .is_err());
    }

    #[test]
    fn test_invalid_field_definition_fails_schema() {
        let err = ModelSchema::builder("User")
            .field("name", string_field().required().nullable())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_duplicate_and_pk_type() {
        assert!(ModelSchema::builder("User")
            .field("name", string_field())
            .field("name", string_field())
            .build()
            .is_err());
        assert!(ModelSchema::builder("User")
            .field(PK_FIELD, number_field())
            .build()
            .is_err());
    }

    #[test]
    fn test_visible_fields_and_alias() {
        let schema = ModelSchema::builder("User")
            .collection("users")
            .field(PK_FIELD, object_id_field())
            .field("name", string_field())
            .field("age", number_field())
            .alias(PK_FIELD, "id")
            .public_fields([PK_FIELD, "name"])
            .build()
            .unwrap();
        assert!(schema.has_pk());
        assert_eq!(schema.visible_fields(), vec![PK_FIELD, "name"]);
        assert_eq!(schema.external_name(PK_FIELD), "id");
        assert_eq!(schema.external_name("age"), "age");
        assert_eq!(schema.collection(), Some("users"));
    }
}
