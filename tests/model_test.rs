//! 字段与模型的集成测试

use rat_quickrest::*;
use std::sync::Arc;

define_model! {
    struct Profile;
    fields = {
        "name" => string_field().nullable(),
        "email" => email_field().required(),
        "age" => number_field(),
    }
}

define_model! {
    struct Tag;
    collection = "tags",
    fields = {
        "_id" => object_id_field(),
        "label" => string_field().required(),
    }
    alias = { "_id" => "id", }
}

define_model! {
    struct Post;
    collection = "posts",
    fields = {
        "_id" => object_id_field(),
        "title" => string_field().required(),
        "state" => string_field().choices(["draft", "published"]).default_value("draft"),
        "priority" => number_field().choices([1, 2, 3]).default_value(1),
        "tags" => related_field::<Tag>(true),
    }
    alias = { "_id" => "id", }
}

fn code_at(err: &QuickRestError, key: &str) -> Option<ErrorCode> {
    err.detail().and_then(|d| d.get(key)).and_then(ErrorDetail::leaf_code)
}

#[test]
fn test_profile_end_to_end() {
    init_once();
    let mut profile = Profile::new_record();
    profile.set_value(&data_object! { "email" => "a@b.com" }).unwrap();

    let json = profile.to_json().unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "name": null, "email": "a@b.com", "age": 0 })
    );

    let err = profile
        .set_value(&data_object! { "email" => "not-an-email" })
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(code_at(&err, "email"), Some(ErrorCode::InvalidEmail));
}

#[test]
fn test_empty_input_reports_only_required_fields() {
    init_once();
    let mut profile = Profile::new_record();
    let err = profile.set_value(&data_object! {}).unwrap_err();

    match err.detail() {
        Some(ErrorDetail::Nested(map)) => {
            assert_eq!(map.keys().collect::<Vec<_>>(), vec!["email"]);
            assert_eq!(map["email"].leaf_code(), Some(ErrorCode::RequiredField));
        }
        other => panic!("期望嵌套错误，实际为 {:?}", other),
    }
    assert_eq!(profile.value("name").unwrap(), &DataValue::Null);
}

#[test]
fn test_required_and_nullable_cannot_combine() {
    assert!(string_field().required().nullable().build().is_err());
    assert!(
        ModelSchema::builder("Broken")
            .field("x", number_field().required().nullable())
            .build()
            .is_err()
    );
}

#[test]
fn test_choices_for_strings_and_numbers() {
    init_once();
    let ok = Post::from_value(&data_object! { "title" => "t", "state" => "published", "priority" => 3.0 })
        .unwrap();
    assert_eq!(ok.value("state").unwrap(), &DataValue::from("published"));

    let err = Post::from_value(&data_object! { "title" => "t", "state" => "archived", "priority" => 7 })
        .unwrap_err();
    assert_eq!(code_at(&err, "state"), Some(ErrorCode::InvalidStringChoice));
    assert_eq!(code_at(&err, "priority"), Some(ErrorCode::InvalidNumberChoice));
}

#[test]
fn test_many_related_fails_as_a_whole() {
    init_once();
    let err = Post::from_value(&data_object! {
        "title" => "t",
        "tags" => vec![
            data_object! { "label" => "rust" },
            data_object! { "label" => "web" },
            data_object! { "label" => 5 },
        ],
    })
    .unwrap_err();

    let tags = err.detail().and_then(|d| d.get("tags")).unwrap();
    match tags {
        ErrorDetail::Nested(map) => {
            assert_eq!(map.keys().collect::<Vec<_>>(), vec!["2"]);
            assert_eq!(
                map["2"].get("label").and_then(ErrorDetail::leaf_code),
                Some(ErrorCode::InvalidString)
            );
        }
        other => panic!("期望按下标聚合的错误，实际为 {:?}", other),
    }
}

#[test]
fn test_serialize_then_validate_is_stable() {
    init_once();
    let first = Post::from_value(&data_object! {
        "title" => "  padded  ",
        "tags" => vec![data_object! { "label" => "rust" }],
    })
    .unwrap();
    let once = first.serialize().unwrap();
    let second = Post::from_value(&once).unwrap();
    assert_eq!(second.serialize().unwrap(), once);
    assert_eq!(once.get("title"), Some(&DataValue::from("padded")));
}

#[test]
fn test_id_token_round_trip() {
    let id = ObjectId::new();
    let token = encode_id(&id);
    assert_ne!(token, id.to_hex());
    assert_eq!(decode_id(&token).unwrap(), id);
    assert!(decode_id(&id.to_hex()).is_err());
}

#[tokio::test]
async fn test_lazy_hydration_through_manager() {
    init_once();
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let tags = Manager::for_model::<Tag>(store.clone()).unwrap();

    let mut tag = Tag::from_value(&data_object! { "label" => "rust" }).unwrap();
    let id = tag.create(&tags).await.unwrap();
    assert_eq!(tag.pk(), Some(id));

    let mut post = Post::from_value(&data_object! { "title" => "t", "tags" => vec![DataValue::ObjectId(id)] })
        .unwrap();
    let lazy = &post.records("tags").unwrap()[0];
    assert!(!lazy.is_loaded());
    assert!(matches!(lazy.get("label").unwrap(), Access::Unloaded(_)));

    post.expand("tags", &tags).await.unwrap();
    let loaded = &post.records("tags").unwrap()[0];
    assert_eq!(loaded.value("label").unwrap(), &DataValue::from("rust"));

    let mut missing = Tag::unloaded(ObjectId::new());
    let err = missing.hydrate(&tags).await.unwrap_err();
    assert_eq!(code_at(&err, PK_FIELD), Some(ErrorCode::InvalidObjectId));
}

fn init_once() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(init);
}
