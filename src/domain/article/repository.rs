use super::model::{Article, ArticleChanges};
use super::query::{like_pattern, ArticleFilter, ArticleQuery};
use crate::types::{NewsError, NewsResult};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const ARTICLE_COLUMNS: &str = "id, title, excerpt, content, author, category, is_published, \
     is_featured, views, read_time, published_at, created_at, updated_at";

/// 記事ストアの抽象化トレイト
///
/// 本番のPostgreSQL実装とテスト用のインメモリ実装を
/// 統一的に扱えるようにするためのインターフェースです。
/// 各操作は主キーで特定される1行、または述語で絞り込んだ行集合に対する
/// 単一ステートメントとして実行される。
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// 条件に一致する記事を並び順・範囲を適用して取得する
    async fn find_many(&self, query: &ArticleQuery) -> NewsResult<Vec<Article>>;

    /// 条件に一致する記事の件数（ページングとは無関係）
    async fn count(&self, filter: &ArticleFilter) -> NewsResult<i64>;

    /// 主キーで記事を1件取得する（公開状態は問わない）
    async fn find_by_id(&self, id: Uuid) -> NewsResult<Option<Article>>;

    /// 記事を挿入し、保存された行を返す
    async fn insert(&self, article: &Article) -> NewsResult<Article>;

    /// 部分更新を適用し、更新後の行を返す
    async fn update(&self, id: Uuid, changes: &ArticleChanges) -> NewsResult<Option<Article>>;

    /// 公開記事の閲覧数をアトミックに1増やし、増加後の行を返す
    ///
    /// 記事が存在しないか非公開の場合は`None`。
    async fn increment_views(&self, id: Uuid) -> NewsResult<Option<Article>>;

    /// 記事を物理削除する。削除した場合は`true`
    async fn delete(&self, id: Uuid) -> NewsResult<bool>;
}

/// `sqlx`を使用した本番用のPostgreSQL実装
#[derive(Clone)]
pub struct PgArticleStore {
    pool: PgPool,
}

impl PgArticleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// フィルター条件をWHERE句として追加する
///
/// 値はすべてバインドパラメータとして渡す。
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    let has_cond = filter.published.is_some()
        || filter.featured.is_some()
        || filter.search.is_some()
        || filter.category.is_some()
        || filter.author.is_some()
        || filter.min_views.is_some();
    if !has_cond {
        return;
    }

    qb.push(" WHERE ");
    let mut separated = qb.separated(" AND ");

    if let Some(published) = filter.published {
        separated.push("is_published = ").push_bind_unseparated(published);
    }
    if let Some(featured) = filter.featured {
        separated.push("is_featured = ").push_bind_unseparated(featured);
    }
    if let Some(ref search) = filter.search {
        let pattern = like_pattern(search);
        separated
            .push("(title ILIKE ")
            .push_bind_unseparated(pattern.clone())
            .push_unseparated(" OR excerpt ILIKE ")
            .push_bind_unseparated(pattern.clone())
            .push_unseparated(" OR content ILIKE ")
            .push_bind_unseparated(pattern)
            .push_unseparated(")");
    }
    if let Some(ref category) = filter.category {
        separated
            .push("category = ")
            .push_bind_unseparated(category.clone());
    }
    if let Some(ref author) = filter.author {
        separated
            .push("author ILIKE ")
            .push_bind_unseparated(like_pattern(author));
    }
    if let Some(min_views) = filter.min_views {
        separated.push("views > ").push_bind_unseparated(min_views);
    }
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    async fn find_many(&self, query: &ArticleQuery) -> NewsResult<Vec<Article>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(ARTICLE_COLUMNS).push(" FROM articles");
        push_filter(&mut qb, &query.filter);

        // 列名はSortKeyの固定値のみ
        qb.push(" ORDER BY ")
            .push(query.sort.column())
            .push(" ")
            .push(query.order.keyword())
            .push(", id ASC");
        qb.push(" LIMIT ").push_bind(query.limit);
        qb.push(" OFFSET ").push_bind(query.offset);

        qb.build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事一覧の取得", e))
    }

    async fn count(&self, filter: &ArticleFilter) -> NewsResult<i64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut qb, filter);

        qb.build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事件数の取得", e))
    }

    async fn find_by_id(&self, id: Uuid) -> NewsResult<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事の取得", e))
    }

    async fn insert(&self, article: &Article) -> NewsResult<Article> {
        let sql = format!(
            r#"
            INSERT INTO articles ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {columns}
            "#,
            columns = ARTICLE_COLUMNS
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(article.id)
            .bind(&article.title)
            .bind(&article.excerpt)
            .bind(&article.content)
            .bind(&article.author)
            .bind(&article.category)
            .bind(article.is_published)
            .bind(article.is_featured)
            .bind(article.views)
            .bind(article.read_time)
            .bind(article.published_at)
            .bind(article.created_at)
            .bind(article.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事の作成", e))
    }

    async fn update(&self, id: Uuid, changes: &ArticleChanges) -> NewsResult<Option<Article>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE articles SET ");
        let mut set = qb.separated(", ");

        if let Some(ref title) = changes.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(ref excerpt) = changes.excerpt {
            set.push("excerpt = ").push_bind_unseparated(excerpt.clone());
        }
        if let Some(ref content) = changes.content {
            set.push("content = ").push_bind_unseparated(content.clone());
        }
        if let Some(ref author) = changes.author {
            set.push("author = ").push_bind_unseparated(author.clone());
        }
        if let Some(ref category) = changes.category {
            set.push("category = ").push_bind_unseparated(category.clone());
        }
        if let Some(is_published) = changes.is_published {
            set.push("is_published = ").push_bind_unseparated(is_published);
        }
        if let Some(is_featured) = changes.is_featured {
            set.push("is_featured = ").push_bind_unseparated(is_featured);
        }
        if let Some(read_time) = changes.read_time {
            set.push("read_time = ").push_bind_unseparated(read_time);
        }
        if let Some(published_at) = changes.published_at {
            set.push("published_at = ").push_bind_unseparated(published_at);
        }
        set.push("updated_at = ").push_bind_unseparated(changes.updated_at);

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(ARTICLE_COLUMNS);

        qb.build_query_as::<Article>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事の更新", e))
    }

    async fn increment_views(&self, id: Uuid) -> NewsResult<Option<Article>> {
        // 読み取り→加算→書き込みではなく単一のUPDATEで加算する
        let sql = format!(
            r#"
            UPDATE articles SET views = views + 1
            WHERE id = $1 AND is_published = TRUE
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );
        sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| NewsError::store("閲覧数の加算", e))
    }

    async fn delete(&self, id: Uuid) -> NewsResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| NewsError::store("記事の削除", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_clause(filter: &ArticleFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut qb, filter);
        qb.sql().to_string()
    }

    // SQL組み立て系テスト（DB不要）
    mod sql {
        use super::*;

        #[test]
        fn test_empty_filter_has_no_where() {
            assert_eq!(
                where_clause(&ArticleFilter::default()),
                "SELECT COUNT(*) FROM articles"
            );
        }

        #[test]
        fn test_filter_uses_bind_parameters() {
            let filter = ArticleFilter {
                search: Some("'; DROP TABLE articles; --".to_string()),
                category: Some("tech".to_string()),
                author: Some("佐藤".to_string()),
                ..ArticleFilter::published()
            };
            let sql = where_clause(&filter);

            assert!(!sql.contains("DROP TABLE"), "入力値がSQLに埋め込まれてはならない: {}", sql);
            assert!(sql.contains("is_published = $1"));
            assert!(sql.contains("(title ILIKE $2 OR excerpt ILIKE $3 OR content ILIKE $4)"));
            assert!(sql.contains("category = $5"));
            assert!(sql.contains("author ILIKE $6"));
            assert_eq!(sql.matches(" AND ").count(), 3);
        }

        #[test]
        fn test_min_views_and_featured() {
            let filter = ArticleFilter {
                featured: Some(true),
                min_views: Some(0),
                ..ArticleFilter::published()
            };
            let sql = where_clause(&filter);
            assert!(sql.ends_with(
                " WHERE is_published = $1 AND is_featured = $2 AND views > $3"
            ));
        }
    }

    // 実データベースを使うテスト（DATABASE_URLが必要）
    #[cfg(feature = "online")]
    mod storage {
        use super::*;
        use crate::domain::article::query::{SortKey, SortOrder};

        fn store(pool: PgPool) -> PgArticleStore {
            PgArticleStore::new(pool)
        }

        fn all_published(limit: i64, offset: i64) -> ArticleQuery {
            ArticleQuery {
                filter: ArticleFilter::published(),
                sort: SortKey::Views,
                order: SortOrder::Desc,
                limit,
                offset,
            }
        }

        #[sqlx::test(fixtures("../../../fixtures/articles.sql"))]
        async fn test_find_many_filters_and_sorts(pool: PgPool) -> Result<(), anyhow::Error> {
            let store = store(pool);

            let articles = store.find_many(&all_published(100, 0)).await?;
            assert!(articles.iter().all(|a| a.is_published), "公開記事のみ");
            assert!(
                articles.windows(2).all(|w| w[0].views >= w[1].views),
                "閲覧数の降順で並ぶべき"
            );

            let total = store.count(&ArticleFilter::published()).await?;
            assert_eq!(total as usize, articles.len());

            println!("✅ 一覧取得テスト成功: {}件", articles.len());
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/articles.sql"))]
        async fn test_search_escapes_wildcards(pool: PgPool) -> Result<(), anyhow::Error> {
            let store = store(pool);
            let filter = ArticleFilter {
                search: Some("%".to_string()),
                ..ArticleFilter::published()
            };
            let total = store.count(&filter).await?;
            assert_eq!(total, 0, "%は文字どおりに照合されるべき");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/articles.sql"))]
        async fn test_increment_views_is_atomic(pool: PgPool) -> Result<(), anyhow::Error> {
            let store = store(pool);
            let target = store
                .find_many(&all_published(1, 0))
                .await?
                .pop()
                .expect("公開記事が存在するはず");

            let mut handles = Vec::new();
            for _ in 0..10 {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    store.increment_views(target.id).await
                }));
            }
            for handle in handles {
                handle.await??;
            }

            let after = store.find_by_id(target.id).await?.expect("記事が存在するはず");
            assert_eq!(after.views, target.views + 10, "同時加算が失われてはならない");
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/articles.sql"))]
        async fn test_increment_views_skips_unpublished(pool: PgPool) -> Result<(), anyhow::Error> {
            let store = store(pool);
            let draft = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM articles WHERE is_published = FALSE LIMIT 1",
            )
            .fetch_one(store.pool())
            .await?;

            assert!(store.increment_views(draft).await?.is_none());
            Ok(())
        }

        #[sqlx::test(fixtures("../../../fixtures/articles.sql"))]
        async fn test_update_and_delete(pool: PgPool) -> Result<(), anyhow::Error> {
            let store = store(pool);
            let target = store
                .find_many(&all_published(1, 0))
                .await?
                .pop()
                .expect("公開記事が存在するはず");

            let now = chrono::Utc::now();
            let updated = store
                .update(target.id, &ArticleChanges::unpublish(now))
                .await?
                .expect("更新後の行が返るべき");
            assert!(!updated.is_published);
            assert!(updated.published_at.is_none());
            assert_eq!(updated.title, target.title, "指定外の列は変わらない");

            assert!(store.delete(target.id).await?);
            assert!(!store.delete(target.id).await?);
            assert!(store.find_by_id(target.id).await?.is_none());
            Ok(())
        }
    }
}
