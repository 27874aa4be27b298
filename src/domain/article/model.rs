use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// 1分あたりの読了語数
pub const WORDS_PER_MINUTE: usize = 200;

// 記事エンティティ（articlesテーブルの1行）
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub views: i64,
    pub read_time: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// 記事の公開状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Unpublished,
    Published,
}

impl Article {
    /// 作成リクエストから新規記事を組み立てる
    ///
    /// 読了時間が未指定なら本文から算出し、公開状態で作成された場合のみ
    /// 公開日時を`now`に設定する。
    pub fn from_request(request: CreateArticleRequest, now: DateTime<Utc>) -> Self {
        let read_time = request
            .read_time
            .unwrap_or_else(|| estimate_read_time(&request.content));
        let published_at = request.is_published.then_some(now);

        Self {
            id: Uuid::new_v4(),
            title: request.title,
            excerpt: request.excerpt,
            content: request.content,
            author: request.author,
            category: request.category,
            is_published: request.is_published,
            is_featured: request.is_featured,
            views: 0,
            read_time,
            published_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// 現在の公開状態を取得
    pub fn publication_state(&self) -> PublicationState {
        if self.is_published {
            PublicationState::Published
        } else {
            PublicationState::Unpublished
        }
    }

    /// 変更内容を記事に適用する（インメモリストア用）
    pub fn apply(&mut self, changes: &ArticleChanges) {
        if let Some(ref title) = changes.title {
            self.title = title.clone();
        }
        if let Some(ref excerpt) = changes.excerpt {
            self.excerpt = excerpt.clone();
        }
        if let Some(ref content) = changes.content {
            self.content = content.clone();
        }
        if let Some(ref author) = changes.author {
            self.author = author.clone();
        }
        if let Some(ref category) = changes.category {
            self.category = category.clone();
        }
        if let Some(is_published) = changes.is_published {
            self.is_published = is_published;
        }
        if let Some(is_featured) = changes.is_featured {
            self.is_featured = is_featured;
        }
        if let Some(read_time) = changes.read_time {
            self.read_time = read_time;
        }
        if let Some(published_at) = changes.published_at {
            self.published_at = published_at;
        }
        self.updated_at = changes.updated_at;
    }
}

/// 本文の語数から読了時間（分）を見積もる
///
/// 空白区切りの語数を200語/分で割って切り上げる。最小値は1分。
pub fn estimate_read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

// 記事作成リクエスト
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 255, message = "タイトルは1〜255文字で指定してください"))]
    pub title: String,
    #[validate(length(min = 1, message = "概要は必須です"))]
    pub excerpt: String,
    #[validate(length(min = 1, message = "本文は必須です"))]
    pub content: String,
    #[validate(length(min = 1, max = 100, message = "著者は1〜100文字で指定してください"))]
    pub author: String,
    #[validate(length(min = 1, max = 100, message = "カテゴリは1〜100文字で指定してください"))]
    pub category: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[validate(range(min = 1, message = "読了時間は1以上を指定してください"))]
    pub read_time: Option<i32>,
}

// 記事更新リクエスト（部分更新）
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 255, message = "タイトルは1〜255文字で指定してください"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "概要は空にできません"))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, message = "本文は空にできません"))]
    pub content: Option<String>,
    #[validate(length(min = 1, max = 100, message = "著者は1〜100文字で指定してください"))]
    pub author: Option<String>,
    #[validate(length(min = 1, max = 100, message = "カテゴリは1〜100文字で指定してください"))]
    pub category: Option<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    #[validate(range(min = 1, message = "読了時間は1以上を指定してください"))]
    pub read_time: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
}

/// ストアに渡す部分更新の内容
///
/// `None`のフィールドは変更しない。`published_at`は`Some(None)`でNULLに戻す。
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    pub read_time: Option<i32>,
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: DateTime<Utc>,
}

impl ArticleChanges {
    /// 何も変更しない（更新日時のみ）変更内容を作成
    pub fn touch(now: DateTime<Utc>) -> Self {
        Self {
            title: None,
            excerpt: None,
            content: None,
            author: None,
            category: None,
            is_published: None,
            is_featured: None,
            read_time: None,
            published_at: None,
            updated_at: now,
        }
    }

    /// 公開操作: 公開日時は常に`now`で上書きする
    pub fn publish(now: DateTime<Utc>) -> Self {
        Self {
            is_published: Some(true),
            published_at: Some(Some(now)),
            ..Self::touch(now)
        }
    }

    /// 非公開操作: 公開日時をクリアする
    pub fn unpublish(now: DateTime<Utc>) -> Self {
        Self {
            is_published: Some(false),
            published_at: Some(None),
            ..Self::touch(now)
        }
    }

    /// 更新リクエストと既存記事から変更内容を導出する
    ///
    /// - 本文が変わり読了時間の指定がなければ再計算する
    /// - 未公開→公開の遷移時のみ公開日時を設定する（既に公開済みなら据え置き）
    /// - 公開→非公開の遷移では公開日時をクリアする
    /// - 更新後も公開状態なら、明示された公開日時を優先する
    /// - 更新後が非公開なら公開日時は常にNULL（明示された値は無視する）
    pub fn from_update(
        request: UpdateArticleRequest,
        existing: &Article,
        now: DateTime<Utc>,
    ) -> Self {
        let read_time = match (request.read_time, request.content.as_deref()) {
            (Some(read_time), _) => Some(read_time),
            (None, Some(content)) => Some(estimate_read_time(content)),
            (None, None) => None,
        };

        let touches_publication = request.is_published.is_some() || request.published_at.is_some();
        let published_at = match (
            request.is_published.unwrap_or(existing.is_published),
            request.published_at,
        ) {
            (false, _) if touches_publication => Some(None),
            (false, _) => None,
            (true, Some(explicit)) => Some(Some(explicit)),
            (true, None) if !existing.is_published => Some(Some(now)),
            (true, None) => None,
        };
        if published_at == Some(None) && request.published_at.is_some() {
            tracing::debug!(id = %existing.id, "非公開記事のため指定された公開日時を無視");
        }

        Self {
            title: request.title,
            excerpt: request.excerpt,
            content: request.content,
            author: request.author,
            category: request.category,
            is_published: request.is_published,
            is_featured: request.is_featured,
            read_time,
            published_at,
            updated_at: now,
        }
    }
}
