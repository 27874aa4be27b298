use super::auth::{AdminToken, RequirePrivileged};
use super::config::AppConfig;
use super::response::ApiResponse;
use crate::domain::article::{
    ArticleService, CreateArticleRequest, ListParams, PgArticleStore, UpdateArticleRequest, Viewer,
};
use crate::infra::db::setup_database;
use crate::types::NewsError;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

type HandlerResult = Result<HttpResponse, NewsError>;

// 厳選ビューの件数指定
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

/* ------------------------ /health ------------------------ */

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/* ------------------------ /news ------------------------ */

async fn list_articles(
    service: web::Data<ArticleService>,
    params: web::Query<ListParams>,
) -> HandlerResult {
    let page = service.list(&params).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page.articles, page.pagination)))
}

async fn get_article(
    service: web::Data<ArticleService>,
    id: web::Path<Uuid>,
    viewer: Viewer,
) -> HandlerResult {
    let article = service.get(id.into_inner(), viewer).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(article)))
}

async fn create_article(
    _: RequirePrivileged,
    service: web::Data<ArticleService>,
    payload: web::Json<CreateArticleRequest>,
) -> HandlerResult {
    let article = service.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(article).with_message("記事を作成しました")))
}

async fn update_article(
    _: RequirePrivileged,
    service: web::Data<ArticleService>,
    id: web::Path<Uuid>,
    payload: web::Json<UpdateArticleRequest>,
) -> HandlerResult {
    let article = service.update(id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(article).with_message("記事を更新しました")))
}

async fn delete_article(
    _: RequirePrivileged,
    service: web::Data<ArticleService>,
    id: web::Path<Uuid>,
) -> HandlerResult {
    service.delete(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("記事を削除しました")))
}

async fn publish_article(
    _: RequirePrivileged,
    service: web::Data<ArticleService>,
    id: web::Path<Uuid>,
) -> HandlerResult {
    let article = service.publish(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(article).with_message("記事を公開しました")))
}

async fn unpublish_article(
    _: RequirePrivileged,
    service: web::Data<ArticleService>,
    id: web::Path<Uuid>,
) -> HandlerResult {
    let article = service.unpublish(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(article).with_message("記事を非公開にしました")))
}

/* ------------------------ 厳選ビュー ------------------------ */

async fn featured_articles(
    service: web::Data<ArticleService>,
    params: web::Query<LimitParams>,
) -> HandlerResult {
    let articles = service.featured(params.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(articles)))
}

async fn latest_articles(
    service: web::Data<ArticleService>,
    params: web::Query<LimitParams>,
) -> HandlerResult {
    let articles = service.latest(params.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(articles)))
}

async fn most_viewed_articles(
    service: web::Data<ArticleService>,
    params: web::Query<LimitParams>,
) -> HandlerResult {
    let articles = service.most_viewed(params.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(articles)))
}

async fn articles_by_category(
    service: web::Data<ArticleService>,
    category: web::Path<String>,
    params: web::Query<LimitParams>,
) -> HandlerResult {
    let articles = service.by_category(&category, params.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(articles)))
}

async fn articles_by_author(
    service: web::Data<ArticleService>,
    author: web::Path<String>,
    params: web::Query<LimitParams>,
) -> HandlerResult {
    let articles = service.by_author(&author, params.limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(articles)))
}

/// ルーティングとエクストラクターの設定を登録する
///
/// `ArticleService`と`AdminToken`は呼び出し側が`app_data`で渡す。
/// 固定パスのルートは`/{id}`より先に登録する。
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| NewsError::invalid_field("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| NewsError::invalid_field("query", err.to_string()).into()),
    )
    // 不正なidは存在しない記事と同じ扱い
    .app_data(web::PathConfig::default().error_handler(|_, _| NewsError::NotFound.into()))
    .route("/health", web::get().to(health))
    .service(
        web::scope("/news")
            .route("", web::get().to(list_articles))
            .route("", web::post().to(create_article))
            .route("/featured", web::get().to(featured_articles))
            .route("/latest", web::get().to(latest_articles))
            .route("/most-viewed", web::get().to(most_viewed_articles))
            .route("/category/{category}", web::get().to(articles_by_category))
            .route("/author/{author}", web::get().to(articles_by_author))
            .route("/{id}", web::get().to(get_article))
            .route("/{id}", web::put().to(update_article))
            .route("/{id}", web::delete().to(delete_article))
            .route("/{id}/publish", web::put().to(publish_article))
            .route("/{id}/unpublish", web::put().to(unpublish_article)),
    );
}

/// データベースを初期化してHTTPサーバーを起動する
pub async fn run(config: AppConfig) -> Result<()> {
    let pool = setup_database(&config.database).await?;
    let service = ArticleService::new(Arc::new(PgArticleStore::new(pool)));
    let service = web::Data::new(service);
    let admin_token = web::Data::new(AdminToken::new(config.server.admin_token.clone()));

    if config.server.admin_token.is_none() {
        tracing::warn!("NEWSDESK_ADMIN_TOKENが未設定のため、特権操作はすべて拒否されます");
    }
    tracing::info!(bind = %config.server.bind, "🌐 HTTPサーバー起動");

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(admin_token.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&config.server.bind)
    .with_context(|| format!("アドレスのバインドに失敗: {}", config.server.bind))?;

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.run().await.context("HTTPサーバーが異常終了しました")
}
