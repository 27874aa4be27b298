use super::model::Article;
use crate::types::{FieldErrors, NewsError, NewsResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 一覧取得のページサイズ上限
pub const MAX_PAGE_LIMIT: u32 = 100;
/// 一覧取得の既定ページサイズ
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

// 記事検索のフィルター条件を表す構造体
// 指定された条件はすべてANDで結合される
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    pub published: Option<bool>,
    pub featured: Option<bool>,
    /// タイトル・概要・本文のいずれかに部分一致
    pub search: Option<String>,
    /// 完全一致
    pub category: Option<String>,
    /// 部分一致
    pub author: Option<String>,
    /// `views > min_views`
    pub min_views: Option<i64>,
}

impl ArticleFilter {
    /// 公開記事のみを対象とするフィルター
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Default::default()
        }
    }

    /// インメモリで同じ条件を評価する
    ///
    /// 部分一致はILIKEと同様に大文字小文字を区別しない。
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(published) = self.published {
            if article.is_published != published {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if article.is_featured != featured {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let hit = contains_ignore_case(&article.title, search)
                || contains_ignore_case(&article.excerpt, search)
                || contains_ignore_case(&article.content, search);
            if !hit {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if article.category != *category {
                return false;
            }
        }
        if let Some(ref author) = self.author {
            if !contains_ignore_case(&article.author, author) {
                return false;
            }
        }
        if let Some(min_views) = self.min_views {
            if article.views <= min_views {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// LIKE/ILIKE用の部分一致パターンを作成する
///
/// 入力中の`%`・`_`・`\`はエスケープされ、文字どおりに照合される。
pub fn like_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// 並び替えに使用できる列（許可リスト）
///
/// 呼び出し元の文字列から列名を動的に組み立てることはせず、
/// 必ずこの列挙型を経由して固定の列名に対応付ける。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    Title,
    #[default]
    PublishedAt,
    Views,
    Author,
    Category,
}

impl SortKey {
    /// クエリパラメータの値から並び替え列を決定する
    ///
    /// 未知の値は既定の`publishedAt`にフォールバックする。
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => Self::default(),
            Some("title") => Self::Title,
            Some("publishedAt") => Self::PublishedAt,
            Some("views") => Self::Views,
            Some("author") => Self::Author,
            Some("category") => Self::Category,
            Some(other) => {
                tracing::debug!(sort_by = %other, "未知の並び替え列のため既定値を使用");
                Self::default()
            }
        }
    }

    /// 対応するテーブル列名
    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::PublishedAt => "published_at",
            Self::Views => "views",
            Self::Author => "author",
            Self::Category => "category",
        }
    }

    fn compare(self, a: &Article, b: &Article) -> Ordering {
        match self {
            Self::Title => compare_text(&a.title, &b.title),
            Self::PublishedAt => a.published_at.cmp(&b.published_at),
            Self::Views => a.views.cmp(&b.views),
            Self::Author => compare_text(&a.author, &b.author),
            Self::Category => compare_text(&a.category, &b.category),
        }
    }
}

// 照合順序の近似: 大文字小文字を無視して比較し、同じならバイト順
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc`/`desc`（大文字小文字不問）以外は`desc`
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

// ストアに渡す検索条件（フィルター・並び順・範囲）
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuery {
    pub filter: ArticleFilter,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl ArticleQuery {
    /// 公開日時の新しい順で先頭`limit`件を取得する条件
    pub fn newest(filter: ArticleFilter, limit: i64) -> Self {
        Self {
            filter,
            sort: SortKey::PublishedAt,
            order: SortOrder::Desc,
            limit,
            offset: 0,
        }
    }

    /// インメモリで並び順を比較する
    ///
    /// PostgreSQLと同様に、降順ではNULLを先頭、昇順では末尾に置く。
    /// 同順位はidで並べてページングを安定させる。
    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let primary = match self.sort {
            SortKey::PublishedAt => match (a.published_at, b.published_at) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => x.cmp(&y),
            },
            key => key.compare(a, b),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// 一覧取得APIのクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// 検証済みのページ指定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

impl ListParams {
    /// ページ指定を検証する（page >= 1、0 <= limit <= 100）
    pub fn page_request(&self) -> NewsResult<PageRequest> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

        let mut fields = FieldErrors::new();
        if page < 1 {
            fields
                .entry("page".to_string())
                .or_default()
                .push("1以上を指定してください".to_string());
        }
        if limit > MAX_PAGE_LIMIT {
            fields
                .entry("limit".to_string())
                .or_default()
                .push(format!("{}以下を指定してください", MAX_PAGE_LIMIT));
        }
        if !fields.is_empty() {
            return Err(NewsError::Validation { fields });
        }

        Ok(PageRequest { page, limit })
    }

    /// フィルター条件を組み立てる（公開記事のみ、空文字は未指定扱い）
    pub fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            search: non_blank(&self.search),
            category: non_blank(&self.category),
            author: non_blank(&self.author),
            ..ArticleFilter::published()
        }
    }

    /// 検証済みのストア検索条件に変換する
    pub fn to_query(&self) -> NewsResult<(ArticleQuery, PageRequest)> {
        let page = self.page_request()?;
        let query = ArticleQuery {
            filter: self.filter(),
            sort: SortKey::parse(self.sort_by.as_deref()),
            order: SortOrder::parse(self.sort_order.as_deref()),
            limit: i64::from(page.limit),
            offset: page.offset(),
        };
        Ok((query, page))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 一覧レスポンスのページ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// `total_pages = ceil(total / limit)`、limitが0なら0
    pub fn new(page: PageRequest, total: i64) -> Self {
        let limit = i64::from(page.limit);
        let total_pages = if limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::model::CreateArticleRequest;
    use chrono::{TimeZone, Utc};

    fn article(title: &str, author: &str, category: &str) -> Article {
        let request = CreateArticleRequest {
            title: title.to_string(),
            excerpt: "概要".to_string(),
            content: "本文 テキスト".to_string(),
            author: author.to_string(),
            category: category.to_string(),
            is_published: true,
            is_featured: false,
            read_time: None,
        };
        Article::from_request(request, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    mod filter {
        use super::*;

        #[test]
        fn test_published_filter_excludes_drafts() {
            let mut draft = article("下書き", "佐藤", "tech");
            draft.is_published = false;
            assert!(!ArticleFilter::published().matches(&draft));
            assert!(ArticleFilter::default().matches(&draft));
        }

        #[test]
        fn test_search_covers_title_excerpt_content() {
            let mut a = article("Rust 1.80 released", "佐藤", "tech");
            a.excerpt = "new features".to_string();
            a.content = "LazyLock is stable".to_string();

            for term in ["rust", "FEATURES", "lazylock"] {
                let filter = ArticleFilter {
                    search: Some(term.to_string()),
                    ..Default::default()
                };
                assert!(filter.matches(&a), "検索語 {} で一致するはず", term);
            }
            let filter = ArticleFilter {
                search: Some("python".to_string()),
                ..Default::default()
            };
            assert!(!filter.matches(&a));
        }

        #[test]
        fn test_category_is_exact_author_is_partial() {
            let a = article("t", "John Smith", "tech");
            let partial_category = ArticleFilter {
                category: Some("tec".to_string()),
                ..Default::default()
            };
            assert!(!partial_category.matches(&a), "カテゴリは完全一致");

            let partial_author = ArticleFilter {
                author: Some("smith".to_string()),
                ..Default::default()
            };
            assert!(partial_author.matches(&a), "著者は部分一致");
        }

        #[test]
        fn test_min_views_is_strict() {
            let mut a = article("t", "a", "c");
            let filter = ArticleFilter {
                min_views: Some(0),
                ..Default::default()
            };
            assert!(!filter.matches(&a), "views=0は除外");
            a.views = 1;
            assert!(filter.matches(&a));
        }

        #[test]
        fn test_like_pattern_escapes_wildcards() {
            assert_eq!(like_pattern("abc"), "%abc%");
            assert_eq!(like_pattern("100%"), "%100\\%%");
            assert_eq!(like_pattern("a_b"), "%a\\_b%");
            assert_eq!(like_pattern("c:\\dir"), "%c:\\\\dir%");
        }
    }

    mod sorting {
        use super::*;

        #[test]
        fn test_sort_key_whitelist() {
            assert_eq!(SortKey::parse(Some("title")), SortKey::Title);
            assert_eq!(SortKey::parse(Some("views")), SortKey::Views);
            assert_eq!(SortKey::parse(Some("author")), SortKey::Author);
            assert_eq!(SortKey::parse(Some("category")), SortKey::Category);
            assert_eq!(SortKey::parse(None), SortKey::PublishedAt);
        }

        #[test]
        fn test_unknown_sort_key_falls_back() {
            for input in ["password", "id; DROP TABLE articles", "published_at", "TITLE", ""] {
                let key = SortKey::parse(Some(input));
                assert_eq!(key, SortKey::PublishedAt, "{} は既定値になるべき", input);
                assert_eq!(key.column(), "published_at");
            }
        }

        #[test]
        fn test_sort_order_parse() {
            assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Asc);
            assert_eq!(SortOrder::parse(Some("ASC")), SortOrder::Asc);
            assert_eq!(SortOrder::parse(Some("desc")), SortOrder::Desc);
            assert_eq!(SortOrder::parse(Some("random()")), SortOrder::Desc);
            assert_eq!(SortOrder::parse(None), SortOrder::Desc);
        }

        #[test]
        fn test_text_sort_ignores_case() {
            let lower = article("apple", "x", "c");
            let upper = article("Banana", "x", "c");
            let query = ArticleQuery {
                sort: SortKey::Title,
                order: SortOrder::Asc,
                ..ArticleQuery::newest(ArticleFilter::default(), 10)
            };
            assert_eq!(
                query.compare(&lower, &upper),
                Ordering::Less,
                "大文字小文字を区別せずに並べるべき"
            );
        }

        #[test]
        fn test_desc_puts_null_published_at_first() {
            let a = article("a", "x", "c");
            let mut b = article("b", "x", "c");
            b.published_at = None;
            let query = ArticleQuery::newest(ArticleFilter::default(), 10);
            assert_eq!(query.compare(&b, &a), Ordering::Less);
        }
    }

    mod pagination {
        use super::*;

        #[test]
        fn test_defaults() {
            let params = ListParams::default();
            let (query, page) = params.to_query().unwrap();
            assert_eq!(page, PageRequest { page: 1, limit: 10 });
            assert_eq!(query.offset, 0);
            assert_eq!(query.limit, 10);
            assert_eq!(query.sort, SortKey::PublishedAt);
            assert_eq!(query.order, SortOrder::Desc);
            assert_eq!(query.filter.published, Some(true), "常に公開記事のみ");
        }

        #[test]
        fn test_offset_calculation() {
            let params = ListParams {
                page: Some(3),
                limit: Some(20),
                ..Default::default()
            };
            let (query, _) = params.to_query().unwrap();
            assert_eq!(query.offset, 40);
        }

        #[test]
        fn test_invalid_page_and_limit() {
            let params = ListParams {
                page: Some(0),
                limit: Some(500),
                ..Default::default()
            };
            match params.to_query() {
                Err(NewsError::Validation { fields }) => {
                    assert!(fields.contains_key("page"));
                    assert!(fields.contains_key("limit"));
                }
                other => panic!("検証エラーになるべき: {:?}", other),
            }
        }

        #[test]
        fn test_blank_filters_are_ignored() {
            let params = ListParams {
                search: Some("  ".to_string()),
                category: Some(String::new()),
                author: Some(" 佐藤 ".to_string()),
                ..Default::default()
            };
            let filter = params.filter();
            assert_eq!(filter.search, None);
            assert_eq!(filter.category, None);
            assert_eq!(filter.author.as_deref(), Some("佐藤"));
        }

        #[test]
        fn test_total_pages() {
            let page = PageRequest { page: 1, limit: 10 };
            assert_eq!(Pagination::new(page, 0).total_pages, 0);
            assert_eq!(Pagination::new(page, 10).total_pages, 1);
            assert_eq!(Pagination::new(page, 11).total_pages, 2);
            let zero = PageRequest { page: 1, limit: 0 };
            let p = Pagination::new(zero, 7);
            assert_eq!(p.total, 7);
            assert_eq!(p.total_pages, 0);
        }
    }
}
