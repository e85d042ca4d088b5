//! 用户服务演示
//!
//! 演示如何用 rat_quickrest 定义模型、组合资源并通过 axum 提供 REST 接口
//!
//! 运行：`cargo run --example user_service --features web-server [config.toml]`
//!
//! ```text
//! curl -X POST localhost:8080/users -d '{"email": "a@b.com", "role": "admin"}'
//! curl localhost:8080/users
//! curl localhost:8080/users/<id> -b user=alice
//! curl -X PUT localhost:8080/users/<id> -b user=alice -d '{"age": 30}'
//! curl -X DELETE localhost:8080/users/<id> -b user=alice
//! ```

use async_trait::async_trait;
use rat_quickrest::api::{
    CreateCapability, DestroyCapability, ListCapability, RequestContext, RequireUser, Resource,
    RetrieveCapability, UpdateCapability,
};
use rat_quickrest::config::{
    AppConfig, Environment, LogLevel, LoggingConfig, QuickRestConfig, SecurityConfig,
    ServerConfig, StorageConfig,
};
use rat_quickrest::*;
use std::sync::Arc;

define_model! {
    /// 用户模型
    pub struct User;
    collection = "users",
    fields = {
        "_id" => object_id_field(),
        "name" => string_field().nullable(),
        "email" => email_field().required(),
        "age" => number_field(),
        "role" => string_field().choices(["admin", "member"]).default_value("member"),
        "created_at" => datetime_field().auto_add(),
    }
    alias = { "_id" => "id", }
    read_only_fields = ["email", "created_at"],
}

/// /users
struct UserList;

#[async_trait]
impl ListCapability for UserList {
    async fn get_queryset(&self, ctx: &RequestContext, params: DataValue) -> QuickRestResult<DataValue> {
        let manager = ctx.manager::<User>()?;
        let mut filter = Document::new();
        if let Some(role) = params.get("role") {
            filter.insert("role".to_string(), role.clone());
        }

        let records = manager.find_records(&filter).await?;
        let items = records
            .iter()
            .map(Record::serialize)
            .collect::<QuickRestResult<Vec<_>>>()?;
        Ok(data_object! {
            "total" => items.len() as i64,
            "items" => items,
        })
    }
}

#[async_trait]
impl CreateCapability for UserList {
    async fn perform_create(&self, ctx: &RequestContext, data: DataValue) -> QuickRestResult<DataValue> {
        let manager = ctx.manager::<User>()?;
        let mut user = User::from_value(&data)?;
        user.create(&manager).await?;
        user.serialize()
    }
}

/// /users/<id>
struct UserDetail;

impl UserDetail {
    async fn load(ctx: &RequestContext) -> QuickRestResult<(Record, Manager)> {
        let manager = ctx.manager::<User>()?;
        let mut user = User::unloaded(ctx.require_pk()?);
        user.hydrate(&manager).await?;
        Ok((user, manager))
    }
}

#[async_trait]
impl RetrieveCapability for UserDetail {
    async fn get_object(&self, ctx: &RequestContext, _params: DataValue) -> QuickRestResult<DataValue> {
        let (user, _) = Self::load(ctx).await?;
        user.serialize()
    }
}

#[async_trait]
impl UpdateCapability for UserDetail {
    async fn perform_update(&self, ctx: &RequestContext, data: DataValue) -> QuickRestResult<DataValue> {
        let (mut user, manager) = Self::load(ctx).await?;
        user.apply_update(&data)?;
        user.update(&manager).await?;
        user.serialize()
    }
}

#[async_trait]
impl DestroyCapability for UserDetail {
    async fn perform_delete(&self, ctx: &RequestContext, _params: DataValue) -> QuickRestResult<DataValue> {
        let manager = ctx.manager::<User>()?;
        let deleted = manager.delete_by_id(&ctx.require_pk()?).await?;
        Ok(data_object! { "deleted" => deleted as i64 })
    }
}

fn load_config() -> QuickRestResult<QuickRestConfig> {
    if let Some(path) = std::env::args().nth(1) {
        return QuickRestConfig::from_file(path);
    }

    QuickRestConfig::builder()
        .app(
            AppConfig::builder()
                .name("user_service")
                .version(VERSION)
                .environment_from_env()?
                .build()?,
        )
        .logging(LoggingConfig::builder().level(LogLevel::Info).console(true).build()?)
        .storage(StorageConfig::builder().memory().build()?)
        .security(SecurityConfig::builder().id_secret("user-service-demo-secret").build()?)
        .server(ServerConfig::builder().host("127.0.0.1").port(8080).build()?)
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_logging(&config.logging)?;
    let registry = Arc::new(init_with_config(&config)?);

    println!("=== {} 用户服务演示 ===", get_info());
    if config.app.environment == Environment::Production {
        println!("⚠️  生产环境运行演示服务");
    }

    let users = Resource::list_create("users", UserList).build();
    let user = Resource::retrieve_update_destroy("user", UserDetail)
        .permission(RequireUser)
        .build();

    let dispatcher = ApiDispatcher::builder()
        .route(r"/users/?", users)
        .route(r"/users/([^/]+)/?", user)
        .registry(registry)
        .build()?;

    rat_quickrest::web::serve(Arc::new(dispatcher), &config.server).await?;
    Ok(())
}
