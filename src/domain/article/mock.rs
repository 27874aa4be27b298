use super::model::{Article, ArticleChanges};
use super::query::{ArticleFilter, ArticleQuery};
use super::repository::ArticleStore;
use crate::types::NewsResult;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// テスト用のインメモリ記事ストア
///
/// この実装はテスト時にDIされ、データベースに接続せずに
/// `PgArticleStore`と同じ検索・更新の意味論を再現します。
/// 各操作はロックを保持したまま完結するため、閲覧数の加算は失われない。
/// 文字列の並び順は大文字小文字を無視した近似であり、
/// データベースの照合順序（特に非ASCII文字）とは一致しない場合がある。
#[derive(Default)]
pub struct MockArticleStore {
    articles: Mutex<Vec<Article>>,
}

impl MockArticleStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の記事で初期化したストアを作成
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Mutex::new(articles),
        }
    }

    /// 保存されている全記事のスナップショット
    pub fn snapshot(&self) -> Vec<Article> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Article>> {
        // パニックしたテストが残したロックでも中身はそのまま使う
        self.articles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArticleStore for MockArticleStore {
    async fn find_many(&self, query: &ArticleQuery) -> NewsResult<Vec<Article>> {
        let mut matched: Vec<Article> = self
            .lock()
            .iter()
            .filter(|article| query.filter.matches(article))
            .cloned()
            .collect();
        matched.sort_by(|a, b| query.compare(a, b));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &ArticleFilter) -> NewsResult<i64> {
        let total = self.lock().iter().filter(|a| filter.matches(a)).count();
        Ok(total as i64)
    }

    async fn find_by_id(&self, id: Uuid) -> NewsResult<Option<Article>> {
        Ok(self.lock().iter().find(|a| a.id == id).cloned())
    }

    async fn insert(&self, article: &Article) -> NewsResult<Article> {
        self.lock().push(article.clone());
        Ok(article.clone())
    }

    async fn update(&self, id: Uuid, changes: &ArticleChanges) -> NewsResult<Option<Article>> {
        let mut articles = self.lock();
        Ok(articles.iter_mut().find(|a| a.id == id).map(|article| {
            article.apply(changes);
            article.clone()
        }))
    }

    async fn increment_views(&self, id: Uuid) -> NewsResult<Option<Article>> {
        let mut articles = self.lock();
        Ok(articles
            .iter_mut()
            .find(|a| a.id == id && a.is_published)
            .map(|article| {
                article.views += 1;
                article.clone()
            }))
    }

    async fn delete(&self, id: Uuid) -> NewsResult<bool> {
        let mut articles = self.lock();
        let before = articles.len();
        articles.retain(|a| a.id != id);
        Ok(articles.len() < before)
    }
}
