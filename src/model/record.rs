//! 记录实例
//!
//! 每条记录持有独立的字段槽位，字段定义本身只存在于共享的模型结构中

use crate::error::{ErrorCode, ErrorDetail, QuickRestError, QuickRestResult};
use crate::model::field_types::FieldDefinition;
use crate::model::manager::Manager;
use crate::model::schema::{ModelSchema, PK_FIELD};
use crate::security;
use crate::types::{DataValue, Document, ObjectId};
use crate::utils::format_response;
use rat_logger::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 字段的已验证取值
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// 标量值
    Value(DataValue),
    /// 单个关联记录
    Record(Box<Record>),
    /// 关联记录列表
    Records(Vec<Record>),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&DataValue> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            FieldValue::Records(r) => Some(r.as_slice()),
            _ => None,
        }
    }
}

/// 字段槽位，`Unset` 表示尚未从存储加载，与空值不同
#[derive(Debug, Clone)]
enum Slot {
    Unset,
    Value(FieldValue),
}

/// 字段读取结果
#[derive(Debug)]
pub enum Access<'a> {
    /// 已加载的值
    Loaded(&'a FieldValue),
    /// 未加载，需要按该ID从存储中补全
    Unloaded(ObjectId),
}

/// 模型记录
#[derive(Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    slots: HashMap<String, Slot>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.schema.name())
            .field("slots", &self.slots)
            .finish()
    }
}

impl Record {
    /// 创建记录，所有字段取其默认值
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        let slots = schema
            .fields()
            .map(|(name, def)| (name.clone(), Slot::Value(def.resolve_default())))
            .collect();
        Self { schema, slots }
    }

    /// 只知道ID、其余字段待加载的记录
    pub fn unloaded(schema: Arc<ModelSchema>, id: ObjectId) -> Self {
        let slots = schema
            .field_names()
            .map(|name| {
                let slot = if name == PK_FIELD {
                    Slot::Value(FieldValue::Value(DataValue::ObjectId(id)))
                } else {
                    Slot::Unset
                };
                (name.to_string(), slot)
            })
            .collect();
        Self { schema, slots }
    }

    /// 从原始输入创建并验证记录
    pub fn from_value(schema: Arc<ModelSchema>, raw: &DataValue) -> QuickRestResult<Self> {
        let mut record = Self::new(schema);
        record.set_value(raw)?;
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        self.schema.name()
    }

    /// 所有字段都已加载
    pub fn is_loaded(&self) -> bool {
        !self.slots.values().any(|slot| matches!(slot, Slot::Unset))
    }

    /// 主键
    pub fn pk(&self) -> Option<ObjectId> {
        match self.slots.get(PK_FIELD) {
            Some(Slot::Value(FieldValue::Value(DataValue::ObjectId(oid)))) => Some(*oid),
            _ => None,
        }
    }

    /// 主键的外部令牌
    pub fn pk_token(&self) -> Option<String> {
        self.pk().map(|oid| security::encode_id(&oid))
    }

    fn set_pk(&mut self, id: ObjectId) {
        if self.schema.has_pk() {
            self.slots.insert(
                PK_FIELD.to_string(),
                Slot::Value(FieldValue::Value(DataValue::ObjectId(id))),
            );
        }
    }

    /// 用原始输入填充全部字段
    ///
    /// 字段键缺失或为空时回退到别名键。所有字段都会尝试赋值，
    /// 验证错误按字段（优先别名）聚合后一次性返回，随后执行记录级校验
    pub fn set_value(&mut self, raw: &DataValue) -> QuickRestResult<()> {
        let empty = HashMap::new();
        let data = match raw {
            DataValue::Null => &empty,
            DataValue::Object(map) => map,
            other => {
                return Err(QuickRestError::ValidationError {
                    detail: ErrorDetail::code_with(
                        ErrorCode::InvalidDataFormat,
                        &[("expected", "dict"), ("actual", other.type_name())],
                    ),
                })
            }
        };

        let schema = self.schema.clone();
        let current_pk = self.pk();
        let mut errors = BTreeMap::new();
        for (name, def) in schema.fields() {
            let mut input = data.get(name.as_str());
            if input.map_or(true, DataValue::is_blank) {
                if let Some(alias_value) = schema.alias(name).and_then(|alias| data.get(alias)) {
                    input = Some(alias_value);
                }
            }

            // 已有主键的记录不接受其他主键
            if let (true, Some(current)) = (name == PK_FIELD, current_pk) {
                if let Err(detail) = check_same_pk(def, input, &current) {
                    errors.insert(schema.external_name(name).to_string(), detail);
                }
                continue;
            }

            let result = match schema.setter(name) {
                Some(hook) => hook(self, def, input),
                None => def.validate(input),
            };
            match result {
                Ok(value) => {
                    self.slots.insert(name.clone(), Slot::Value(value));
                }
                Err(e) if e.is_validation() => {
                    errors.insert(schema.external_name(name).to_string(), e.into_detail());
                }
                Err(e) => return Err(e),
            }
        }

        if !errors.is_empty() {
            debug!("模型 {} 验证失败，错误字段数: {}", schema.name(), errors.len());
            return Err(QuickRestError::fields(errors));
        }

        match schema.object_validator() {
            Some(validator) => validator(self),
            None => Ok(()),
        }
    }

    /// 局部更新：只处理输入中出现的字段，忽略主键与只读字段
    pub fn apply_update(&mut self, raw: &DataValue) -> QuickRestResult<()> {
        let data = match raw {
            DataValue::Object(map) => map,
            DataValue::Null => return Ok(()),
            other => {
                return Err(QuickRestError::ValidationError {
                    detail: ErrorDetail::code_with(
                        ErrorCode::InvalidDataFormat,
                        &[("expected", "dict"), ("actual", other.type_name())],
                    ),
                })
            }
        };

        let schema = self.schema.clone();
        let mut errors = BTreeMap::new();
        for (name, def) in schema.fields() {
            if name == PK_FIELD || schema.is_read_only(name) {
                continue;
            }
            let input = data
                .get(name.as_str())
                .or_else(|| schema.alias(name).and_then(|alias| data.get(alias)));
            let Some(input) = input else {
                continue;
            };

            let result = match schema.setter(name) {
                Some(hook) => hook(self, def, Some(input)),
                None => def.validate(Some(input)),
            };
            match result {
                Ok(value) => {
                    self.slots.insert(name.clone(), Slot::Value(value));
                }
                Err(e) if e.is_validation() => {
                    errors.insert(schema.external_name(name).to_string(), e.into_detail());
                }
                Err(e) => return Err(e),
            }
        }

        if !errors.is_empty() {
            return Err(QuickRestError::fields(errors));
        }
        match schema.object_validator() {
            Some(validator) => validator(self),
            None => Ok(()),
        }
    }

    /// 以存储表示重新走一遍验证
    pub fn validate_db_fields(&mut self) -> QuickRestResult<()> {
        let repr = self.db_repr()?;
        self.set_value(&DataValue::Object(repr))
    }

    /// 读取字段
    ///
    /// 未加载的字段返回 `Access::Unloaded`，由调用方决定是否 `hydrate`
    pub fn get(&self, name: &str) -> QuickRestResult<Access<'_>> {
        match self.slots.get(name) {
            None => Err(QuickRestError::KeyError { key: name.to_string() }),
            Some(Slot::Value(value)) => Ok(Access::Loaded(value)),
            Some(Slot::Unset) => match self.pk() {
                Some(oid) => Ok(Access::Unloaded(oid)),
                None => Err(self.not_hydrated(name)),
            },
        }
    }

    fn loaded(&self, name: &str) -> QuickRestResult<&FieldValue> {
        match self.get(name)? {
            Access::Loaded(value) => Ok(value),
            Access::Unloaded(_) => Err(self.not_hydrated(name)),
        }
    }

    fn not_hydrated(&self, name: &str) -> QuickRestError {
        QuickRestError::NotHydrated {
            model: self.schema.name().to_string(),
            field: name.to_string(),
        }
    }

    /// 读取已加载的标量字段
    pub fn value(&self, name: &str) -> QuickRestResult<&DataValue> {
        self.loaded(name)?.as_value().ok_or_else(|| {
            crate::quick_error!(definition, format!("字段 {} 不是标量字段", name))
        })
    }

    /// 读取已加载的单个关联记录
    pub fn record(&self, name: &str) -> QuickRestResult<Option<&Record>> {
        match self.loaded(name)? {
            FieldValue::Record(record) => Ok(Some(record.as_ref())),
            FieldValue::Value(v) if v.is_null() => Ok(None),
            _ => Err(crate::quick_error!(definition, format!("字段 {} 不是单个关联字段", name))),
        }
    }

    /// 读取已加载的关联记录列表
    pub fn records(&self, name: &str) -> QuickRestResult<&[Record]> {
        match self.loaded(name)? {
            FieldValue::Records(records) => Ok(records.as_slice()),
            FieldValue::Value(v) if v.is_null() => Ok(&[]),
            _ => Err(crate::quick_error!(definition, format!("字段 {} 不是关联列表字段", name))),
        }
    }

    /// 直接设置字段取值，不经过验证
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> QuickRestResult<()> {
        if !self.schema.has_field(name) {
            return Err(QuickRestError::KeyError { key: name.to_string() });
        }
        self.slots.insert(name.to_string(), Slot::Value(value));
        Ok(())
    }

    /// 存储表示
    ///
    /// 登记了存储钩子的字段优先使用钩子；空主键不写入
    pub fn db_repr(&self) -> QuickRestResult<Document> {
        let mut doc = HashMap::new();
        for (name, def) in self.schema.fields() {
            let value = match self.schema.storage_hook(name) {
                Some(hook) => hook(self)?,
                None => def.to_storage(self.loaded(name)?)?,
            };
            if name == PK_FIELD && value.is_null() {
                continue;
            }
            doc.insert(name.clone(), value);
        }
        Ok(doc)
    }

    /// 对外表示，只包含可见字段，键名使用别名
    pub fn serialize(&self) -> QuickRestResult<DataValue> {
        let mut out = HashMap::new();
        for name in self.schema.visible_fields() {
            let value = match self.schema.serialize_hook(name) {
                Some(hook) => hook(self)?,
                None => {
                    let def = self
                        .schema
                        .field(name)
                        .ok_or_else(|| QuickRestError::KeyError { key: name.to_string() })?;
                    def.serialize(self.loaded(name)?)?
                }
            };
            out.insert(self.schema.external_name(name).to_string(), value);
        }
        Ok(DataValue::Object(out))
    }

    /// 对外表示的JSON形式
    pub fn to_json(&self) -> QuickRestResult<serde_json::Value> {
        Ok(format_response(&self.serialize()?))
    }

    /// 按主键从存储补全整条记录
    ///
    /// # 错误
    ///
    /// 存储中不存在该ID时返回主键字段上的验证错误
    pub async fn hydrate(&mut self, manager: &Manager) -> QuickRestResult<()> {
        let oid = self.pk().ok_or_else(|| self.not_hydrated(PK_FIELD))?;
        debug!("补全记录: model={}, id={}", self.schema.name(), oid);

        let Some(doc) = manager.fetch_by_id(&oid).await? else {
            let token = security::encode_id(&oid);
            let mut errors = BTreeMap::new();
            errors.insert(
                PK_FIELD.to_string(),
                ErrorDetail::code_with(ErrorCode::InvalidObjectId, &[("id", token.as_str())]),
            );
            return Err(QuickRestError::fields(errors));
        };
        self.set_value(&DataValue::Object(doc))
    }

    /// 读取字段，未加载时先补全
    pub async fn get_or_hydrate(
        &mut self,
        name: &str,
        manager: &Manager,
    ) -> QuickRestResult<&FieldValue> {
        if let Access::Unloaded(_) = self.get(name)? {
            self.hydrate(manager).await?;
        }
        self.loaded(name)
    }

    /// 补全关联字段中尚未加载的子记录
    pub async fn expand(&mut self, name: &str, manager: &Manager) -> QuickRestResult<()> {
        if let Access::Unloaded(_) = self.get(name)? {
            self.hydrate(manager).await?;
        }
        let Some(Slot::Value(value)) = self.slots.get_mut(name) else {
            return Ok(());
        };
        match value {
            FieldValue::Record(record) => {
                if !record.is_loaded() {
                    let child = manager.for_related(record.schema().clone())?;
                    record.hydrate(&child).await?;
                }
            }
            FieldValue::Records(records) => {
                for record in records.iter_mut().filter(|r| !r.is_loaded()) {
                    let child = manager.for_related(record.schema().clone())?;
                    record.hydrate(&child).await?;
                }
            }
            FieldValue::Value(_) => {}
        }
        Ok(())
    }

    /// 验证后写入存储，返回新记录的ID
    pub async fn create(&mut self, manager: &Manager) -> QuickRestResult<ObjectId> {
        if !self.is_loaded() {
            self.hydrate(manager).await?;
        }
        self.validate_db_fields()?;
        let id = manager.create(self).await?;
        self.set_pk(id);
        Ok(id)
    }

    /// 验证后更新存储，返回受影响的记录数
    pub async fn update(&mut self, manager: &Manager) -> QuickRestResult<u64> {
        if !self.is_loaded() {
            self.hydrate(manager).await?;
        }
        self.validate_db_fields()?;
        manager.update(self).await
    }
}

/// 缺失或为空的主键输入保留原值，相同主键通过
fn check_same_pk(
    def: &FieldDefinition,
    input: Option<&DataValue>,
    current: &ObjectId,
) -> Result<(), ErrorDetail> {
    let input = match input {
        Some(v) if !def.is_null_input(v) => v,
        _ => return Ok(()),
    };
    match def.validate(Some(input)) {
        Ok(FieldValue::Value(DataValue::ObjectId(oid))) if oid == *current => Ok(()),
        Ok(_) => Err(ErrorDetail::code_with(
            ErrorCode::InvalidObjectId,
            &[("id", input.to_string().as_str())],
        )),
        Err(e) => Err(e.into_detail()),
    }
}
