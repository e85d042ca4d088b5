//! 模型相关的宏定义
//!
//! 提供便捷的宏来定义模型

/// 便捷宏：定义模型
///
/// 生成一个零大小的模型类型，并实现 `Model`，结构在首次使用时构建并缓存
///
/// ```ignore
/// define_model! {
///     pub struct User;
///     collection = "users",
///     fields = {
///         "_id" => object_id_field(),
///         "name" => string_field().nullable(),
///         "email" => email_field().required(),
///     }
///     alias = { "_id" => "id", }
///     public_fields = ["_id", "name", "email"],
///     configure = |builder| builder.validate_object(|_| Ok(())),
/// }
/// ```
#[macro_export]
macro_rules! define_model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident;
        $(collection = $collection:expr,)?
        fields = {
            $($field_name:expr => $field_def:expr,)*
        }
        $(alias = { $($alias_field:expr => $alias_name:expr,)* })?
        $(public_fields = [$($public:expr),* $(,)?],)?
        $(read_only_fields = [$($read_only:expr),* $(,)?],)?
        $(configure = $configure:expr,)?
    ) => {
        $(#[$meta])*
        $vis struct $name;

        impl $crate::model::Model for $name {
            fn schema() -> ::std::sync::Arc<$crate::model::ModelSchema> {
                static SCHEMA: $crate::__private::Lazy<::std::sync::Arc<$crate::model::ModelSchema>> =
                    $crate::__private::Lazy::new(|| {
                        let builder = $crate::model::ModelSchema::builder(stringify!($name));
                        $(let builder = builder.collection($collection);)?
                        $(let builder = builder.field($field_name, $field_def);)*
                        $($(let builder = builder.alias($alias_field, $alias_name);)*)?
                        $(let builder = builder.public_fields([$($public),*]);)?
                        $(let builder = builder.read_only_fields([$($read_only),*]);)?
                        $(let builder = ($configure)(builder);)?
                        builder.build().unwrap_or_else(|e| {
                            panic!("严重错误：模型 {} 定义无效: {}", stringify!($name), e)
                        })
                    });
                SCHEMA.clone()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::model::convenience::*;
    use crate::model::{Model, ModelSchemaBuilder};
    use crate::types::DataValue;

    define_model! {
        /// 测试用模型
        struct Note;
        collection = "notes",
        fields = {
            "_id" => object_id_field(),
            "body" => string_field().required(),
            "pinned" => boolean_field(),
        }
        alias = { "_id" => "id", }
        public_fields = ["_id", "body"],
        configure = |builder: ModelSchemaBuilder| builder.serialize_hook("body", |record| {
            Ok(DataValue::from(format!("> {}", record.value("body")?)))
        }),
    }

    #[test]
    fn test_define_model() {
        let schema = Note::schema();
        assert_eq!(schema.name(), "Note");
        assert_eq!(schema.collection(), Some("notes"));
        assert_eq!(schema.external_name("_id"), "id");

        let note = Note::from_value(&crate::data_object! { "body" => "hi" }).unwrap();
        let out = note.serialize().unwrap();
        assert_eq!(out.get("body"), Some(&DataValue::from("> hi")));
        assert!(out.get("pinned").is_none());
        assert!(out.as_object().map_or(false, |o| o.contains_key("id")));
    }
}
