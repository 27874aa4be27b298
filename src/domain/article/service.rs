use super::model::{Article, ArticleChanges, CreateArticleRequest, UpdateArticleRequest};
use super::query::{ArticleFilter, ArticleQuery, ListParams, Pagination, SortKey, SortOrder};
use super::repository::ArticleStore;
use crate::types::{NewsError, NewsResult};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// 特集記事の既定件数
pub const FEATURED_LIMIT: i64 = 6;
/// 特集以外の厳選ビューの既定件数
pub const CURATED_LIMIT: i64 = 10;
/// 厳選ビューで指定できる件数の上限
pub const MAX_CURATED_LIMIT: i64 = 50;

/// 呼び出し元の権限
///
/// 権限の判定は呼び出し側（認証レイヤー）で行い、明示的に渡す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Public,
    Privileged,
}

impl Viewer {
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged)
    }
}

/// ページ付き一覧の結果
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub pagination: Pagination,
}

/// 記事の検索・公開状態を管理するサービス
#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn ArticleStore>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// 公開記事をフィルター・並び替え・ページング付きで取得する
    ///
    /// 件数はページングと無関係に同じ条件で数える。
    pub async fn list(&self, params: &ListParams) -> NewsResult<ArticlePage> {
        let (query, page) = params.to_query()?;
        let articles = self.store.find_many(&query).await?;
        let total = self.store.count(&query.filter).await?;

        Ok(ArticlePage {
            articles,
            pagination: Pagination::new(page, total),
        })
    }

    /// 記事を1件取得する
    ///
    /// 公開記事は閲覧数を1増やし、増加後の値を返す。非公開記事は特権を持つ
    /// 呼び出し元にのみ閲覧数を変えずに返し、それ以外には存在しない記事と
    /// 同じ`NotFound`を返す。
    pub async fn get(&self, id: Uuid, viewer: Viewer) -> NewsResult<Article> {
        if let Some(article) = self.store.increment_views(id).await? {
            return Ok(article);
        }
        if viewer.is_privileged() {
            if let Some(article) = self.store.find_by_id(id).await? {
                tracing::debug!(%id, "非公開記事のプレビュー");
                return Ok(article);
            }
        }
        Err(NewsError::NotFound)
    }

    /// 記事を作成する
    pub async fn create(&self, request: CreateArticleRequest) -> NewsResult<Article> {
        request.validate()?;

        let article = Article::from_request(request, Utc::now());
        let saved = self.store.insert(&article).await?;
        tracing::info!(id = %saved.id, published = saved.is_published, "記事を作成");
        Ok(saved)
    }

    /// 記事を部分更新する
    pub async fn update(&self, id: Uuid, request: UpdateArticleRequest) -> NewsResult<Article> {
        request.validate()?;

        let existing = self.require(id).await?;
        let changes = ArticleChanges::from_update(request, &existing, Utc::now());
        let updated = self
            .store
            .update(id, &changes)
            .await?
            .ok_or(NewsError::NotFound)?;
        tracing::info!(%id, published = updated.is_published, "記事を更新");
        Ok(updated)
    }

    /// 記事を物理削除する
    pub async fn delete(&self, id: Uuid) -> NewsResult<()> {
        self.require(id).await?;
        if !self.store.delete(id).await? {
            return Err(NewsError::NotFound);
        }
        tracing::info!(%id, "記事を削除");
        Ok(())
    }

    /// 記事を公開する（公開日時は常に現在時刻で更新）
    pub async fn publish(&self, id: Uuid) -> NewsResult<Article> {
        self.transition(id, ArticleChanges::publish(Utc::now()), "記事を公開")
            .await
    }

    /// 記事を非公開にする（公開日時をクリア、繰り返しても同じ状態）
    pub async fn unpublish(&self, id: Uuid) -> NewsResult<Article> {
        self.transition(id, ArticleChanges::unpublish(Utc::now()), "記事を非公開化")
            .await
    }

    /// 特集記事（公開日時の新しい順）
    pub async fn featured(&self, limit: Option<i64>) -> NewsResult<Vec<Article>> {
        let filter = ArticleFilter {
            featured: Some(true),
            ..ArticleFilter::published()
        };
        let limit = curated_limit(limit, FEATURED_LIMIT)?;
        self.store.find_many(&ArticleQuery::newest(filter, limit)).await
    }

    /// カテゴリ完全一致（公開日時の新しい順）
    pub async fn by_category(&self, category: &str, limit: Option<i64>) -> NewsResult<Vec<Article>> {
        let filter = ArticleFilter {
            category: Some(category.to_string()),
            ..ArticleFilter::published()
        };
        let limit = curated_limit(limit, CURATED_LIMIT)?;
        self.store.find_many(&ArticleQuery::newest(filter, limit)).await
    }

    /// 著者部分一致（公開日時の新しい順）
    pub async fn by_author(&self, author: &str, limit: Option<i64>) -> NewsResult<Vec<Article>> {
        let filter = ArticleFilter {
            author: Some(author.to_string()),
            ..ArticleFilter::published()
        };
        let limit = curated_limit(limit, CURATED_LIMIT)?;
        self.store.find_many(&ArticleQuery::newest(filter, limit)).await
    }

    /// 閲覧数の多い順（閲覧数0の記事は除外）
    pub async fn most_viewed(&self, limit: Option<i64>) -> NewsResult<Vec<Article>> {
        let query = ArticleQuery {
            filter: ArticleFilter {
                min_views: Some(0),
                ..ArticleFilter::published()
            },
            sort: SortKey::Views,
            order: SortOrder::Desc,
            limit: curated_limit(limit, CURATED_LIMIT)?,
            offset: 0,
        };
        self.store.find_many(&query).await
    }

    /// 最新記事
    pub async fn latest(&self, limit: Option<i64>) -> NewsResult<Vec<Article>> {
        let limit = curated_limit(limit, CURATED_LIMIT)?;
        self.store
            .find_many(&ArticleQuery::newest(ArticleFilter::published(), limit))
            .await
    }

    /// 存在確認を行ってから状態遷移を適用する
    async fn transition(
        &self,
        id: Uuid,
        changes: ArticleChanges,
        action: &'static str,
    ) -> NewsResult<Article> {
        self.require(id).await?;
        let article = self
            .store
            .update(id, &changes)
            .await?
            .ok_or(NewsError::NotFound)?;
        tracing::info!(%id, state = ?article.publication_state(), "{}", action);
        Ok(article)
    }

    async fn require(&self, id: Uuid) -> NewsResult<Article> {
        self.store.find_by_id(id).await?.ok_or(NewsError::NotFound)
    }
}

fn curated_limit(requested: Option<i64>, default: i64) -> NewsResult<i64> {
    match requested {
        None => Ok(default),
        Some(limit) if (1..=MAX_CURATED_LIMIT).contains(&limit) => Ok(limit),
        Some(_) => Err(NewsError::invalid_field(
            "limit",
            format!("1〜{}を指定してください", MAX_CURATED_LIMIT),
        )),
    }
}
